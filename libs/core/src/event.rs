//! Events API payload decoding.
//!
//! The raw JSON is decoded exactly once, at this boundary, into a tagged
//! union; handlers never inspect JSON again. Unknown inner event types are
//! a successful no-op, not an error, because Slack adds event types over
//! time and an unrecognized one must not fail the webhook.

use serde::Deserialize;

use crate::error::RelayError;
use crate::signature::VerifiedBody;

/// Top-level envelope of an Events API delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventEnvelope {
    /// One-time URL verification handshake; the challenge is echoed back.
    Handshake { challenge: String },
    Callback(CallbackEvent),
}

/// The inner event of an `event_callback` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    Mention { text: String, channel: String },
    EmojiAdded { name: String },
    ChannelCreated { channel_id: String },
    /// Any event type the relay does not act on.
    Unsupported,
}

/// Decode verified body bytes into an [`EventEnvelope`].
///
/// Fails when the body is not JSON or the top-level `type` is absent or
/// unrecognized. Only verified bytes can reach this point.
pub fn parse_event(body: VerifiedBody<'_>) -> Result<EventEnvelope, RelayError> {
    let raw: RawEnvelope = serde_json::from_slice(body.as_bytes())?;
    Ok(match raw {
        RawEnvelope::UrlVerification { challenge } => EventEnvelope::Handshake { challenge },
        RawEnvelope::EventCallback { event } => EventEnvelope::Callback(event.into()),
    })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawEnvelope {
    #[serde(rename = "url_verification")]
    UrlVerification { challenge: String },
    #[serde(rename = "event_callback")]
    EventCallback { event: RawEvent },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawEvent {
    #[serde(rename = "app_mention")]
    AppMention {
        #[serde(default)]
        text: String,
        channel: String,
    },
    #[serde(rename = "emoji_changed")]
    EmojiChanged {
        #[serde(default)]
        subtype: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(rename = "channel_created")]
    ChannelCreated { channel: RawChannel },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: String,
}

impl From<RawEvent> for CallbackEvent {
    fn from(event: RawEvent) -> Self {
        match event {
            RawEvent::AppMention { text, channel } => CallbackEvent::Mention { text, channel },
            // `emoji_changed` covers add/remove/rename; only additions carry
            // a single `name` and get announced.
            RawEvent::EmojiChanged { subtype, name } => match (subtype.as_deref(), name) {
                (Some("add") | None, Some(name)) => CallbackEvent::EmojiAdded { name },
                _ => CallbackEvent::Unsupported,
            },
            RawEvent::ChannelCreated { channel } => CallbackEvent::ChannelCreated {
                channel_id: channel.id,
            },
            RawEvent::Unknown => CallbackEvent::Unsupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{verify_at, SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use axum::http::HeaderMap;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use time::OffsetDateTime;

    // Tests need verified bytes; sign them for real rather than poking at
    // the newtype.
    fn verified(body: &[u8]) -> VerifiedBody<'_> {
        const SECRET: &str = "test-secret";
        let timestamp = 1_700_000_000i64;
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("v0:{timestamp}:").as_bytes());
        mac.update(body);
        let signature = format!("v0={}", hex::encode(mac.finalize().into_bytes()));

        let mut headers = HeaderMap::new();
        headers.insert(TIMESTAMP_HEADER, timestamp.to_string().parse().unwrap());
        headers.insert(SIGNATURE_HEADER, signature.parse().unwrap());
        verify_at(
            SECRET,
            &headers,
            body,
            OffsetDateTime::from_unix_timestamp(timestamp).unwrap(),
        )
        .unwrap()
    }

    fn parse(body: &[u8]) -> Result<EventEnvelope, RelayError> {
        parse_event(verified(body))
    }

    #[test]
    fn decodes_url_verification() {
        let envelope = parse(br#"{"type":"url_verification","challenge":"abc123"}"#).unwrap();
        assert_eq!(
            envelope,
            EventEnvelope::Handshake {
                challenge: "abc123".into()
            }
        );
    }

    #[test]
    fn decodes_app_mention() {
        let envelope = parse(
            br#"{"type":"event_callback","event":{"type":"app_mention","text":"<@U1> ping","channel":"C42"}}"#,
        )
        .unwrap();
        assert_eq!(
            envelope,
            EventEnvelope::Callback(CallbackEvent::Mention {
                text: "<@U1> ping".into(),
                channel: "C42".into()
            })
        );
    }

    #[test]
    fn decodes_emoji_addition() {
        let envelope = parse(
            br#"{"type":"event_callback","event":{"type":"emoji_changed","subtype":"add","name":"tada2"}}"#,
        )
        .unwrap();
        assert_eq!(
            envelope,
            EventEnvelope::Callback(CallbackEvent::EmojiAdded {
                name: "tada2".into()
            })
        );
    }

    #[test]
    fn emoji_removal_is_unsupported() {
        let envelope = parse(
            br#"{"type":"event_callback","event":{"type":"emoji_changed","subtype":"remove","names":["tada2"]}}"#,
        )
        .unwrap();
        assert_eq!(envelope, EventEnvelope::Callback(CallbackEvent::Unsupported));
    }

    #[test]
    fn decodes_channel_created() {
        let envelope = parse(
            br#"{"type":"event_callback","event":{"type":"channel_created","channel":{"id":"C0NEW","name":"general"}}}"#,
        )
        .unwrap();
        assert_eq!(
            envelope,
            EventEnvelope::Callback(CallbackEvent::ChannelCreated {
                channel_id: "C0NEW".into()
            })
        );
    }

    #[test]
    fn unknown_inner_type_is_unsupported() {
        let envelope = parse(
            br#"{"type":"event_callback","event":{"type":"reaction_added","reaction":"thumbsup"}}"#,
        )
        .unwrap();
        assert_eq!(envelope, EventEnvelope::Callback(CallbackEvent::Unsupported));
    }

    #[test]
    fn unknown_top_level_type_is_an_error() {
        assert!(matches!(
            parse(br#"{"type":"app_rate_limited"}"#),
            Err(RelayError::Parse(_))
        ));
    }

    #[test]
    fn missing_top_level_type_is_an_error() {
        assert!(matches!(
            parse(br#"{"challenge":"abc123"}"#),
            Err(RelayError::Parse(_))
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse(b"not json"), Err(RelayError::Parse(_))));
    }
}
