//! Core of the Slack webhook relay.
//!
//! Everything between the raw `(headers, body)` of an Events API delivery
//! and the HTTP-shaped [`DispatchResult`] lives here: signing-secret
//! verification, envelope decoding, and dispatch to the two outbound
//! collaborators (Slack itself and DocBase). The entry-point adapters in
//! `apps/relay` are thin translations on top of [`Dispatcher::handle`].

pub mod config;
pub mod dispatch;
pub mod docbase;
pub mod error;
pub mod event;
pub mod signature;
pub mod slack;

pub use config::RelayConfig;
pub use dispatch::{DispatchResult, Dispatcher};
pub use docbase::{extract_post_id, DocbaseClient, DocumentStore, Post};
pub use error::{AuthError, NotifyError, RelayError, StoreError};
pub use event::{parse_event, CallbackEvent, EventEnvelope};
pub use signature::{verify, verify_at, VerifiedBody};
pub use slack::{Notifier, SlackNotifier};
