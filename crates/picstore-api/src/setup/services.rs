//! Service construction.

use async_trait::async_trait;
use picstore_core::Config;
use picstore_services::{GoogleVisionTagSuggester, TagSuggestError, TagSuggester};
use picstore_storage::ObjectStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::UserRegistry;
use crate::services::media::MediaIndexService;
use crate::state::AppState;

/// Build the shared application state from its collaborators.
pub fn build_state(
    config: Config,
    object_store: Arc<dyn ObjectStore>,
    tag_suggester: Arc<dyn TagSuggester>,
) -> Arc<AppState> {
    let media = MediaIndexService::new(
        object_store,
        tag_suggester,
        config.list_fanout_concurrency(),
        Duration::from_secs(config.storage_op_timeout_secs()),
    );

    Arc::new(AppState {
        config,
        media,
        users: UserRegistry::new(),
    })
}

/// Build the configured tag suggestion provider.
pub fn create_tag_suggester(config: &Config) -> Result<Arc<dyn TagSuggester>, anyhow::Error> {
    match config.vision_api_key() {
        Some(api_key) => {
            let suggester = GoogleVisionTagSuggester::new(
                api_key.to_string(),
                config.vision_min_score(),
                config.vision_max_tags(),
            )?;
            Ok(Arc::new(suggester))
        }
        None => {
            tracing::warn!("VISION_API_KEY not set; tag suggestion endpoint will report 502");
            Ok(Arc::new(DisabledTagSuggester))
        }
    }
}

/// Placeholder provider used when no suggestion backend is configured.
struct DisabledTagSuggester;

#[async_trait]
impl TagSuggester for DisabledTagSuggester {
    async fn suggest(&self, _image_path: &Path) -> Result<Vec<String>, TagSuggestError> {
        Err(TagSuggestError::Api {
            status: 503,
            detail: "Tag suggestion provider not configured".to_string(),
        })
    }
}
