//! Application state shared across handlers.

use picstore_core::Config;

use crate::auth::UserRegistry;
use crate::services::media::MediaIndexService;

/// State handed to every handler via Axum's `State` extractor.
pub struct AppState {
    pub config: Config,
    /// The media index: upload, listing, tag filter, tag suggestion.
    pub media: MediaIndexService,
    /// In-memory user registry backing registration and login.
    pub users: UserRegistry,
}
