//! Google Cloud Vision label detection for tag suggestion

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::time::Duration;

use crate::suggest::{TagSuggestError, TagSuggester};

const VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
const MAX_RESULTS: u32 = 50;

/// Tag suggester backed by the Google Cloud Vision LABEL_DETECTION feature.
pub struct GoogleVisionTagSuggester {
    http_client: reqwest::Client,
    api_key: String,
    min_score: f32,
    max_tags: usize,
}

impl Debug for GoogleVisionTagSuggester {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GoogleVisionTagSuggester").finish()
    }
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    responses: Option<Vec<AnnotateResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResponse {
    label_annotations: Option<Vec<LabelAnnotation>>,
    error: Option<VisionError>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    description: Option<String>,
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct VisionError {
    code: Option<i32>,
    message: Option<String>,
}

impl GoogleVisionTagSuggester {
    pub fn new(api_key: String, min_score: f32, max_tags: usize) -> Result<Self, TagSuggestError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            min_score,
            max_tags,
        })
    }

    async fn annotate(&self, image_data: Vec<u8>) -> Result<VisionResponse, TagSuggestError> {
        let url = format!("{}?key={}", VISION_ENDPOINT, self.api_key);

        use base64::Engine;
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(&image_data);

        let request_body = json!({
            "requests": [{
                "image": {
                    "content": image_base64
                },
                "features": [{
                    "type": "LABEL_DETECTION",
                    "maxResults": MAX_RESULTS
                }]
            }]
        });

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TagSuggestError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let vision_response: VisionResponse = response.json().await?;

        // The API can report per-image errors inside a 200 response
        if let Some(responses) = &vision_response.responses {
            if let Some(first) = responses.first() {
                if let Some(error) = &first.error {
                    return Err(TagSuggestError::Api {
                        status: error.code.unwrap_or(0) as u16,
                        detail: error
                            .message
                            .clone()
                            .unwrap_or_else(|| "Unknown error".to_string()),
                    });
                }
            }
        }

        Ok(vision_response)
    }
}

/// Extract label descriptions ranked by score, best first.
fn ranked_labels(response: &VisionResponse, min_score: f32, max_tags: usize) -> Vec<String> {
    let mut labels: Vec<(String, f32)> = response
        .responses
        .as_deref()
        .and_then(|r| r.first())
        .and_then(|r| r.label_annotations.as_deref())
        .unwrap_or_default()
        .iter()
        .filter_map(|label| {
            let score = label.score.unwrap_or(0.0);
            if score < min_score {
                return None;
            }
            label.description.clone().map(|d| (d, score))
        })
        .collect();

    labels.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    labels.truncate(max_tags);
    labels.into_iter().map(|(description, _)| description).collect()
}

#[async_trait]
impl TagSuggester for GoogleVisionTagSuggester {
    async fn suggest(&self, image_path: &Path) -> Result<Vec<String>, TagSuggestError> {
        let start = std::time::Instant::now();
        let image_data = tokio::fs::read(image_path).await?;
        let size = image_data.len();

        let response = self.annotate(image_data).await?;
        let tags = ranked_labels(&response, self.min_score, self.max_tags);

        tracing::info!(
            path = %image_path.display(),
            size_bytes = size,
            suggestions = tags.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Tag suggestion successful"
        );

        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_from_json(raw: &str) -> VisionResponse {
        serde_json::from_str(raw).expect("parse vision response")
    }

    #[test]
    fn test_ranked_labels_filters_and_ranks_by_score() {
        let response = response_from_json(
            r#"{
                "responses": [{
                    "labelAnnotations": [
                        {"description": "cat", "score": 0.98},
                        {"description": "blur", "score": 0.2},
                        {"description": "outdoor", "score": 0.7},
                        {"description": "sunny", "score": 0.91}
                    ]
                }]
            }"#,
        );

        let tags = ranked_labels(&response, 0.5, 5);
        assert_eq!(tags, vec!["cat", "sunny", "outdoor"]);
    }

    #[test]
    fn test_ranked_labels_caps_at_max_tags() {
        let response = response_from_json(
            r#"{
                "responses": [{
                    "labelAnnotations": [
                        {"description": "a", "score": 0.9},
                        {"description": "b", "score": 0.8},
                        {"description": "c", "score": 0.7}
                    ]
                }]
            }"#,
        );

        let tags = ranked_labels(&response, 0.0, 2);
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_ranked_labels_handles_empty_response() {
        let response = response_from_json(r#"{"responses": []}"#);
        assert!(ranked_labels(&response, 0.5, 5).is_empty());
    }
}
