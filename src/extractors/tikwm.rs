use crate::core::error::{DownloadError, DownloadResult};
use crate::core::{Extractor, RawProviderRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

/// Request body understood by the tikwm API.
#[derive(Debug, Serialize)]
struct ProviderRequest<'a> {
    url: &'a str,
    hd: u8,
}

/// `{code, msg, data}` wrapper around every tikwm response.
#[derive(Debug, Deserialize)]
struct ProviderEnvelope {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Resolves TikTok links through the tikwm.com proxy API, which hands back direct,
/// watermark-free media URLs along with the video's metadata.
pub struct TikwmExtractor {
    client: reqwest::Client,
    endpoint: Url,
}

impl TikwmExtractor {
    pub fn new(client: reqwest::Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    async fn fetch(&self, url: &str) -> DownloadResult<RawProviderRecord> {
        if !self.suitable(url) {
            return Err(DownloadError::InvalidUrl);
        }

        debug!("Requesting {} for {}", self.endpoint, url);
        let body = self
            .client
            .post(self.endpoint.clone())
            .json(&ProviderRequest { url, hd: 1 })
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_envelope(&body)
    }
}

/// Unwraps a provider reply. Anything other than `code == 0`, including a body that is
/// not an envelope at all (an HTML rate-limit page, say), is a provider failure.
fn parse_envelope(body: &str) -> DownloadResult<RawProviderRecord> {
    let envelope: ProviderEnvelope =
        serde_json::from_str(body).map_err(|e| DownloadError::Provider {
            code: None,
            message: Some(format!("unexpected response body: {}", e)),
        })?;

    match envelope.code {
        Some(0) => RawProviderRecord::from_value(envelope.data),
        code => Err(DownloadError::Provider {
            code,
            message: envelope.msg,
        }),
    }
}

#[async_trait]
impl Extractor for TikwmExtractor {
    fn name(&self) -> &'static str {
        "tikwm"
    }

    async fn extract(&self, url: &str) -> DownloadResult<RawProviderRecord> {
        self.fetch(url).await.map_err(|e| {
            match &e {
                DownloadError::Provider {
                    code,
                    message: Some(msg),
                } => error!("Error fetching data: {} (code {:?}: {})", e, code, msg),
                _ => error!("Error fetching data: {}", e),
            }
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(ProviderRequest {
            url: "https://www.tiktok.com/@a/video/1",
            hd: 1,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"url": "https://www.tiktok.com/@a/video/1", "hd": 1}));
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: ProviderEnvelope =
            serde_json::from_str(r#"{"code": -1, "msg": "Url parsing is failed!"}"#).unwrap();
        assert_eq!(envelope.code, Some(-1));
        assert_eq!(envelope.msg.as_deref(), Some("Url parsing is failed!"));
        assert!(envelope.data.is_null());
    }

    #[test]
    fn test_parse_envelope_success() {
        let raw = parse_envelope(r#"{"code": 0, "msg": "success", "data": {"id": "7", "play": "https://a/p.mp4"}}"#)
            .unwrap();
        assert_eq!(raw.id(), "7");
        assert_eq!(raw.play_url().as_deref(), Some("https://a/p.mp4"));
    }

    #[test]
    fn test_parse_envelope_rejections_are_provider_errors() {
        let cases = [
            ("<html>Too many requests</html>", None),
            (r#"{"msg": "no code here"}"#, None),
            (r#""just a string""#, None),
            (r#"{"code": -1, "msg": "Url parsing is failed!"}"#, Some(-1)),
        ];

        for (body, expected) in cases {
            match parse_envelope(body) {
                Err(DownloadError::Provider { code, .. }) => assert_eq!(code, expected, "{}", body),
                other => panic!("expected provider error for {}, got {:?}", body, other),
            }
        }
    }

    #[tokio::test]
    async fn test_rejects_link_without_video_id_before_network() {
        // Port 9 (discard) is never contacted: the link is rejected up front.
        let extractor = TikwmExtractor::new(
            reqwest::Client::new(),
            Url::parse("http://127.0.0.1:9/api/").unwrap(),
        );
        let err = extractor.extract("https://vm.tiktok.com/ZMabc/").await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl));
    }
}
