//! Outbound Slack Web API client.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::NotifyError;

/// The relay's outbound side: post a text message or upload a file
/// attachment to a channel. Implemented by [`SlackNotifier`] in production
/// and by mocks in tests.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), NotifyError>;

    async fn upload_file(
        &self,
        channel: &str,
        title: &str,
        content: &str,
        filetype: &str,
    ) -> Result<(), NotifyError>;
}

pub struct SlackNotifier {
    http: reqwest::Client,
    bot_token: String,
    api_base: String,
}

impl SlackNotifier {
    pub fn new(
        http: reqwest::Client,
        bot_token: impl Into<String>,
        api_base: Option<String>,
    ) -> Self {
        Self {
            http,
            bot_token: bot_token.into(),
            api_base: api_base.unwrap_or_else(|| "https://slack.com/api".into()),
        }
    }

    fn build_url(&self, method: &str) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            method.trim_start_matches('/')
        )
    }

    /// Slack wraps errors in a 200 with `{"ok": false, "error": "..."}`, so
    /// both the HTTP status and the `ok` field have to be checked.
    async fn finish(&self, response: reqwest::Response) -> Result<(), NotifyError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NotifyError::Api(format!(
                "status={} body={body}",
                status.as_u16()
            )));
        }
        let raw: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        check_ok(&raw)
    }
}

fn check_ok(raw: &Value) -> Result<(), NotifyError> {
    if raw.get("ok").and_then(Value::as_bool).unwrap_or(false) {
        Ok(())
    } else {
        let error = raw
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        Err(NotifyError::Api(error.to_string()))
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn post_message(&self, channel: &str, text: &str) -> Result<(), NotifyError> {
        let payload = json!({ "channel": channel, "text": text });
        let response = self
            .http
            .post(self.build_url("chat.postMessage"))
            .bearer_auth(&self.bot_token)
            .json(&payload)
            .send()
            .await?;
        self.finish(response).await
    }

    async fn upload_file(
        &self,
        channel: &str,
        title: &str,
        content: &str,
        filetype: &str,
    ) -> Result<(), NotifyError> {
        let form = [
            ("channels", channel),
            ("title", title),
            ("content", content),
            ("filetype", filetype),
        ];
        let response = self
            .http
            .post(self.build_url("files.upload"))
            .bearer_auth(&self.bot_token)
            .form(&form)
            .send()
            .await?;
        self.finish(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_joins_base_and_method() {
        let notifier = SlackNotifier::new(reqwest::Client::new(), "xoxb-1", None);
        assert_eq!(
            notifier.build_url("chat.postMessage"),
            "https://slack.com/api/chat.postMessage"
        );

        let proxied = SlackNotifier::new(
            reqwest::Client::new(),
            "xoxb-1",
            Some("http://127.0.0.1:9082/api/".into()),
        );
        assert_eq!(
            proxied.build_url("/files.upload"),
            "http://127.0.0.1:9082/api/files.upload"
        );
    }

    #[test]
    fn check_ok_accepts_ok_true() {
        assert!(check_ok(&json!({"ok": true, "ts": "1.2"})).is_ok());
    }

    #[test]
    fn check_ok_surfaces_slack_error_code() {
        let err = check_ok(&json!({"ok": false, "error": "channel_not_found"})).unwrap_err();
        assert_eq!(err.to_string(), "slack api: channel_not_found");
    }

    #[test]
    fn check_ok_rejects_missing_ok_field() {
        let err = check_ok(&Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "slack api: unknown");
    }
}
