//! Telegram Bot API sinks
//!
//! Posts reports to the operational group and downloads photos sent to the
//! bot. Photo handles are Telegram file ids.

use super::{Notifier, PhotoSource};
use crate::submission::PhotoHandle;
use crate::{IntakeError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org/";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct InputMediaPhoto<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    file_path: Option<String>,
}

/// Thin Bot API client shared by the notifier and the photo source
#[derive(Clone)]
struct BotApi {
    client: Client,
    api_base: Url,
    token: String,
}

impl BotApi {
    fn new(token: &str, api_base: &str) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(IntakeError::configuration("Telegram bot token is empty"));
        }
        let api_base = if api_base.ends_with('/') {
            Url::parse(api_base)?
        } else {
            Url::parse(&format!("{api_base}/"))?
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                IntakeError::configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            api_base,
            token: token.trim().to_string(),
        })
    }

    /// Resolve a path under the API base. The `./` prefix keeps the
    /// `botID:secret` segment from being read as a URL scheme.
    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.api_base.join(&format!("./{path}"))?)
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        self.endpoint(&format!("bot{}/{}", self.token, method))
    }

    /// Call a Bot API method with a JSON body
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        debug!("Telegram API call: {}", method);
        let response = self
            .client
            .post(self.method_url(method)?)
            .json(body)
            .send()
            .await
            .map_err(|e| IntakeError::Http(e.without_url()))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| IntakeError::Http(e.without_url()))?;

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(IntakeError::transport(
                "telegram",
                format!(
                    "{method} failed ({status}): {}",
                    parsed
                        .description
                        .unwrap_or_else(|| "no description".to_string())
                ),
            )),
        }
    }
}

/// Posts to one group chat
pub struct TelegramNotifier {
    api: BotApi,
    chat_id: i64,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: i64, api_base: &str) -> Result<Self> {
        Ok(Self {
            api: BotApi::new(token, api_base)?,
            chat_id,
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_album(&self, photos: &[PhotoHandle], caption: Option<&str>) -> Result<()> {
        match photos {
            [] => Ok(()),
            // sendMediaGroup needs at least two items
            [single] => {
                let body = serde_json::json!({
                    "chat_id": self.chat_id,
                    "photo": single.as_str(),
                    "caption": caption,
                });
                self.api
                    .call::<_, serde_json::Value>("sendPhoto", &body)
                    .await?;
                Ok(())
            }
            many => {
                let media: Vec<InputMediaPhoto<'_>> = many
                    .iter()
                    .enumerate()
                    .map(|(i, photo)| InputMediaPhoto {
                        kind: "photo",
                        media: photo.as_str(),
                        caption: if i == 0 { caption } else { None },
                    })
                    .collect();
                let body = serde_json::json!({
                    "chat_id": self.chat_id,
                    "media": media,
                });
                self.api
                    .call::<_, serde_json::Value>("sendMediaGroup", &body)
                    .await?;
                Ok(())
            }
        }
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        self.api
            .call::<_, serde_json::Value>("sendMessage", &body)
            .await?;
        Ok(())
    }
}

/// Downloads photos by file id
pub struct TelegramPhotoSource {
    api: BotApi,
}

impl TelegramPhotoSource {
    pub fn new(token: &str, api_base: &str) -> Result<Self> {
        Ok(Self {
            api: BotApi::new(token, api_base)?,
        })
    }
}

#[async_trait]
impl PhotoSource for TelegramPhotoSource {
    async fn fetch(&self, photo: &PhotoHandle) -> Result<Vec<u8>> {
        let file: TelegramFile = self
            .api
            .call("getFile", &serde_json::json!({ "file_id": photo.as_str() }))
            .await?;
        let file_path = file.file_path.ok_or_else(|| {
            IntakeError::transport("telegram", format!("photo {photo} has no download path"))
        })?;

        let url = self
            .api
            .endpoint(&format!("file/bot{}/{}", self.api.token, file_path))?;
        let response = self
            .api
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| IntakeError::Http(e.without_url()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| IntakeError::Http(e.without_url()))?;
        Ok(bytes.to_vec())
    }
}
