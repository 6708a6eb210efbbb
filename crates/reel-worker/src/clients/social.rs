use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SocialTarget;
use crate::error::WorkerError;

/// Body of one publish request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPayload {
    pub link_2_post: String,
    pub message: String,
    pub media_url: Option<String>,
    pub pages_ordered_ids: Option<String>,
}

pub struct SocialClient {
    client: Client,
    base_url: String,
}

impl SocialClient {
    pub fn new(base_url: &str) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .user_agent("PuzzleReel/1.0")
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self, platform: &str) -> String {
        format!("{}/{platform}", self.base_url)
    }

    /// POST to one platform and return the response body.
    pub async fn post(&self, platform: &str, payload: &PostPayload) -> Result<String, WorkerError> {
        let url = self.endpoint(platform);
        let resp = self.client.post(&url).json(payload).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(WorkerError::Fetch(format!("{url}: HTTP {status}: {body}")));
        }
        Ok(body)
    }

    /// Publish to every target. Failures are logged and never abort the run.
    /// Returns how many targets accepted the post.
    pub async fn publish_all(
        &self,
        targets: &[SocialTarget],
        link: &str,
        message: &str,
        media_url: Option<&str>,
    ) -> usize {
        let mut accepted = 0;
        for target in targets {
            let payload = PostPayload {
                link_2_post: link.to_string(),
                message: message.to_string(),
                media_url: media_url.map(str::to_string),
                pages_ordered_ids: target.pages.clone(),
            };
            match self.post(&target.platform, &payload).await {
                Ok(body) => {
                    info!(platform = %target.platform, response = %body.trim(), "Published");
                    accepted += 1;
                }
                Err(e) => {
                    warn!(platform = %target.platform, error = %e, "Publish failed");
                }
            }
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = PostPayload {
            link_2_post: "https://example.com/?puzzle=1".into(),
            message: "Find it\n\n#Chess".into(),
            media_url: Some("https://example.com/v.mp4".into()),
            pages_ordered_ids: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["link_2_post"], "https://example.com/?puzzle=1");
        assert_eq!(json["media_url"], "https://example.com/v.mp4");
        assert!(json["pages_ordered_ids"].is_null());
    }

    #[test]
    fn test_endpoint() {
        let client = SocialClient::new("https://example.com/social-media/").unwrap();
        assert_eq!(client.endpoint("x"), "https://example.com/social-media/x");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_not_fatal() {
        // Port 9 on localhost refuses connections
        let client = SocialClient::new("http://127.0.0.1:9").unwrap();
        let targets = vec![SocialTarget {
            platform: "facebook".into(),
            pages: Some("3".into()),
        }];
        let accepted = client.publish_all(&targets, "link", "msg", None).await;
        assert_eq!(accepted, 0);
    }
}
