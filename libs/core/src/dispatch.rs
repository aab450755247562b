//! Event dispatch: one verified delivery in, one HTTP-shaped result out,
//! at most one synchronous outbound side effect.

use std::sync::Arc;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::task::JoinHandle;

use crate::config::RelayConfig;
use crate::docbase::{extract_post_id, DocumentStore};
use crate::error::AuthError;
use crate::event::{parse_event, CallbackEvent, EventEnvelope};
use crate::signature;
use crate::slack::Notifier;

/// Outcome of one webhook invocation: the response shape both entry-point
/// adapters translate into their own response type.
///
/// A mention that triggered a DocBase forward also carries the handle of
/// that detached task. The local listener can drop it (the task keeps
/// running behind the response), but the Lambda adapter must [`settle`]
/// first: the execution environment freezes once the response is returned,
/// which would suspend or lose the forward.
///
/// [`settle`]: DispatchResult::settle
#[derive(Debug)]
pub struct DispatchResult {
    pub status: StatusCode,
    pub body: String,
    pub headers: HeaderMap,
    background: Option<JoinHandle<()>>,
}

impl DispatchResult {
    fn ok() -> Self {
        Self {
            status: StatusCode::OK,
            body: String::new(),
            headers: HeaderMap::new(),
            background: None,
        }
    }

    fn text(body: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        Self {
            status: StatusCode::OK,
            body,
            headers,
            background: None,
        }
    }

    // Response bodies stay generic; detail goes to the logs only.
    fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: message.into(),
            headers: HeaderMap::new(),
            background: None,
        }
    }

    fn with_background(mut self, handle: JoinHandle<()>) -> Self {
        self.background = Some(handle);
        self
    }

    /// Drive any detached follow-up work to completion. Its outcome never
    /// changes the response; the task logs its own failures.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.background.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "background forward aborted");
            }
        }
    }
}

impl IntoResponse for DispatchResult {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Routes parsed envelopes to their side effects. One instance per process,
/// shared across requests; it holds only read-only state.
pub struct Dispatcher {
    config: Arc<RelayConfig>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn DocumentStore>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<RelayConfig>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            config,
            notifier,
            store,
        }
    }

    /// The shared `(headers, body)` contract of both entry points:
    /// verify, parse, dispatch.
    pub async fn handle(&self, headers: &HeaderMap, body: &[u8]) -> DispatchResult {
        let verified = match signature::verify(&self.config.signing_secret, headers, body) {
            Ok(verified) => verified,
            // Requests we cannot even attempt to verify read as our problem;
            // a failed check reads as the caller's.
            Err(
                err @ (AuthError::MissingHeader(_)
                | AuthError::BadTimestamp
                | AuthError::BadSignature),
            ) => {
                tracing::warn!(error = %err, "unverifiable request");
                return DispatchResult::error(StatusCode::INTERNAL_SERVER_ERROR, "verify error");
            }
            Err(err) => {
                tracing::warn!(error = %err, "signature verification failed");
                return DispatchResult::error(StatusCode::BAD_REQUEST, "verify error");
            }
        };

        let envelope = match parse_event(verified) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, "failed to decode event payload");
                return DispatchResult::error(StatusCode::INTERNAL_SERVER_ERROR, "parse error");
            }
        };

        self.dispatch(envelope).await
    }

    pub async fn dispatch(&self, envelope: EventEnvelope) -> DispatchResult {
        match envelope {
            EventEnvelope::Handshake { challenge } => DispatchResult::text(challenge),
            EventEnvelope::Callback(event) => self.dispatch_callback(event).await,
        }
    }

    async fn dispatch_callback(&self, event: CallbackEvent) -> DispatchResult {
        match event {
            CallbackEvent::Mention { text, channel } => self.on_mention(&text, channel).await,
            CallbackEvent::EmojiAdded { name } => {
                let message = format!("{name} :{name}: was added!");
                self.announce(&message).await
            }
            CallbackEvent::ChannelCreated { channel_id } => {
                let message = format!("A new channel <{channel_id}> was added!");
                self.announce(&message).await
            }
            CallbackEvent::Unsupported => DispatchResult::ok(),
        }
    }

    async fn on_mention(&self, text: &str, channel: String) -> DispatchResult {
        let command = normalize_mention(text);

        if command == "ping" {
            return self.post(&channel, "pong").await;
        }

        if let Some(post_id) = extract_post_id(&self.config.docbase_domain, &command) {
            // Best effort: the response is decided before this finishes, so
            // the forward runs detached and reports only through logs.
            return DispatchResult::ok().with_background(self.spawn_forward(post_id, channel));
        }

        DispatchResult::ok()
    }

    async fn announce(&self, message: &str) -> DispatchResult {
        let channel = self.config.notify_channel.clone();
        self.post(&channel, message).await
    }

    async fn post(&self, channel: &str, text: &str) -> DispatchResult {
        match self.notifier.post_message(channel, text).await {
            Ok(()) => DispatchResult::ok(),
            Err(err) => {
                tracing::error!(channel = %channel, error = %err, "post message failed");
                DispatchResult::error(StatusCode::INTERNAL_SERVER_ERROR, "dispatch error")
            }
        }
    }

    fn spawn_forward(&self, post_id: u64, channel: String) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(err) = forward_post(store.as_ref(), notifier.as_ref(), post_id, &channel).await
            {
                tracing::warn!(post_id, channel = %channel, error = %err, "post forward failed");
            }
        })
    }
}

/// Fetch a DocBase post and upload it to `channel` as a markdown attachment.
async fn forward_post(
    store: &dyn DocumentStore,
    notifier: &dyn Notifier,
    post_id: u64,
    channel: &str,
) -> anyhow::Result<()> {
    let post = store.get_post(post_id).await?;
    notifier
        .upload_file(channel, &post.title, &post.body, "markdown")
        .await?;
    tracing::info!(post_id, channel = %channel, title = %post.title, "forwarded docbase post");
    Ok(())
}

/// Flatten a mention into a command: collapse line breaks to spaces, strip
/// the leading bot-mention token Slack prefixes `app_mention` text with,
/// and trim.
fn normalize_mention(text: &str) -> String {
    let collapsed = text.replace("\r\n", " ").replace(['\r', '\n'], " ");
    let trimmed = collapsed.trim();

    let rest = if let Some(tail) = trimmed.strip_prefix("<@") {
        tail.split_once('>').map(|(_, tail)| tail).unwrap_or("")
    } else if trimmed.starts_with('@') {
        trimmed
            .split_once(char::is_whitespace)
            .map(|(_, tail)| tail)
            .unwrap_or("")
    } else {
        trimmed
    };

    rest.trim().to_string()
}
