use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use snafu::ResultExt;

use crate::config::{Secrets, TelegramCredentials};
use crate::notify::{
    Channel, DisabledSnafu, Notifier, NotifyError, RejectedSnafu, RequestSnafu, split_message,
};

const API_BASE: &str = "https://api.telegram.org";
/// Bot API limit for `sendMessage` text.
pub const MESSAGE_LIMIT: usize = 4096;
/// Bot API limit for photo captions.
pub const CAPTION_LIMIT: usize = 1024;

#[derive(Debug, Deserialize)]
struct ApiReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends alerts through the Telegram Bot API, one bot per channel.
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    us: Option<TelegramCredentials>,
    korea: Option<TelegramCredentials>,
}

impl TelegramNotifier {
    pub fn new(secrets: Secrets) -> Result<Self, NotifyError> {
        Self::with_api_base(secrets, API_BASE)
    }

    pub fn with_api_base(secrets: Secrets, api_base: &str) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(reqwest::Error::without_url)
            .context(RequestSnafu)?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            us: secrets.us,
            korea: secrets.korea,
        })
    }

    pub fn is_enabled(&self, channel: Channel) -> bool {
        self.credentials(channel).is_some()
    }

    fn credentials(&self, channel: Channel) -> Option<&TelegramCredentials> {
        match channel {
            Channel::Us => self.us.as_ref(),
            Channel::Korea => self.korea.as_ref(),
        }
    }

    /// The token is part of the path, so request errors must drop the URL.
    fn method_url(&self, creds: &TelegramCredentials, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.api_base,
            creds.bot_token.expose_secret(),
            method
        )
    }

    async fn send_text(&self, creds: &TelegramCredentials, text: &str) -> Result<(), NotifyError> {
        let body = json!({ "chat_id": creds.chat_id, "text": text });
        let resp = self
            .client
            .post(self.method_url(creds, "sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context(RequestSnafu)?;
        check_reply(resp).await
    }

    async fn send_photo(
        &self,
        creds: &TelegramCredentials,
        image: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<(), NotifyError> {
        let mut form = Form::new()
            .text("chat_id", creds.chat_id.clone())
            .part("photo", Part::bytes(image).file_name("chart.png"));
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }
        let resp = self
            .client
            .post(self.method_url(creds, "sendPhoto"))
            .multipart(form)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context(RequestSnafu)?;
        check_reply(resp).await
    }
}

async fn check_reply(resp: reqwest::Response) -> Result<(), NotifyError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(reqwest::Error::without_url)
        .context(RequestSnafu)?;
    let reply: Option<ApiReply> = serde_json::from_str(&text).ok();
    match reply {
        Some(r) if status.is_success() && r.ok => Ok(()),
        Some(r) => RejectedSnafu {
            status: status.as_u16(),
            description: r.description.unwrap_or_default(),
        }
        .fail(),
        None => RejectedSnafu {
            status: status.as_u16(),
            description: text.chars().take(200).collect::<String>(),
        }
        .fail(),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        channel: Channel,
        message: &str,
        image: Option<Vec<u8>>,
    ) -> Result<(), NotifyError> {
        let Some(creds) = self.credentials(channel) else {
            return DisabledSnafu { channel }.fail();
        };

        let mut text = Some(message);
        if let Some(image) = image {
            // the message rides along as caption when it fits
            let fits = message.chars().count() <= CAPTION_LIMIT;
            self.send_photo(creds, image, fits.then_some(message)).await?;
            if fits {
                text = None;
            }
        }

        if let Some(text) = text {
            for chunk in split_message(text, MESSAGE_LIMIT) {
                self.send_text(creds, &chunk).await?;
            }
        }
        tracing::debug!(%channel, chars = message.chars().count(), "telegram message sent");
        Ok(())
    }
}
