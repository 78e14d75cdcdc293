//! Dispatch table: message kind → handler, wired once at construction.

use std::collections::HashMap;

use tracing::warn;

use credo_core::errors::CredoResult;
use credo_core::models::peer::PeerId;

use crate::envelope::{Envelope, MessageKind};

/// Handler invoked with the decoded sender and opaque payload.
pub type Handler = Box<dyn Fn(PeerId, serde_json::Value) -> CredoResult<()> + Send + Sync>;

/// Hook for envelopes whose kind has no registered handler.
pub type UnknownHook = Box<dyn Fn(&Envelope) + Send + Sync>;

/// Hook for raw messages that failed to decode.
pub type ErrorHook = Box<dyn Fn(&str) + Send + Sync>;

/// Routes decoded envelopes to their protocol handlers.
///
/// Absent hooks are no-ops; neither a decode failure nor a handler error
/// ever takes down the listen loop.
#[derive(Default)]
pub struct DispatchTable {
    handlers: HashMap<MessageKind, Handler>,
    on_unknown: Option<UnknownHook>,
    on_error: Option<ErrorHook>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for a message kind.
    pub fn with_handler<F>(mut self, kind: MessageKind, handler: F) -> Self
    where
        F: Fn(PeerId, serde_json::Value) -> CredoResult<()> + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
        self
    }

    /// Register the unknown-message hook.
    pub fn with_unknown_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.on_unknown = Some(Box::new(hook));
        self
    }

    /// Register the decode-failure hook.
    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Decode one raw message and route it.
    pub fn dispatch(&self, raw: &str) {
        let envelope = match Envelope::decode(raw) {
            Ok(env) => env,
            Err(e) => {
                warn!(error = %e, "dropping undecodable message");
                if let Some(hook) = &self.on_error {
                    hook(raw);
                }
                return;
            }
        };

        match self.handlers.get(&envelope.kind) {
            Some(handler) => {
                if let Err(e) = handler(envelope.sender.clone(), envelope.payload.clone()) {
                    warn!(
                        kind = envelope.kind.as_str(),
                        sender = %envelope.sender,
                        error = %e,
                        "message handler failed"
                    );
                }
            }
            None => {
                if let Some(hook) = &self.on_unknown {
                    hook(&envelope);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_pair() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)))
    }

    #[test]
    fn routes_by_kind() {
        let (alerts, intel) = counter_pair();
        let a = alerts.clone();
        let i = intel.clone();
        let table = DispatchTable::new()
            .with_handler(MessageKind::Alert, move |_, _| {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .with_handler(MessageKind::IntelligenceRequest, move |_, _| {
                i.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        table.dispatch(r#"{"type":"alert","sender":"p","payload":null}"#);
        table.dispatch(r#"{"type":"alert","sender":"p","payload":null}"#);
        table.dispatch(r#"{"type":"intelligence_request","sender":"p","payload":null}"#);

        assert_eq!(alerts.load(Ordering::SeqCst), 2);
        assert_eq!(intel.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_kind_goes_to_hook() {
        let (unknowns, _) = counter_pair();
        let u = unknowns.clone();
        let table = DispatchTable::new().with_unknown_hook(move |_| {
            u.fetch_add(1, Ordering::SeqCst);
        });

        table.dispatch(r#"{"type":"gossip_v2","sender":"p","payload":null}"#);
        assert_eq!(unknowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_kind_without_hook_is_silently_dropped() {
        let table = DispatchTable::new();
        table.dispatch(r#"{"type":"gossip_v2","sender":"p","payload":null}"#);
    }

    #[test]
    fn decode_failure_goes_to_error_hook_and_loop_survives() {
        let (errors, handled) = counter_pair();
        let e = errors.clone();
        let h = handled.clone();
        let table = DispatchTable::new()
            .with_handler(MessageKind::Alert, move |_, _| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .with_error_hook(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            });

        table.dispatch("{broken");
        table.dispatch(r#"{"type":"alert","sender":"p","payload":null}"#);

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(handled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_error_does_not_poison_the_table() {
        let (handled, _) = counter_pair();
        let h = handled.clone();
        let table = DispatchTable::new().with_handler(MessageKind::Alert, move |_, _| {
            h.fetch_add(1, Ordering::SeqCst);
            Err(credo_core::errors::CredoError::Config {
                message: "boom".to_string(),
            })
        });

        table.dispatch(r#"{"type":"alert","sender":"p","payload":null}"#);
        table.dispatch(r#"{"type":"alert","sender":"p","payload":null}"#);
        assert_eq!(handled.load(Ordering::SeqCst), 2);
    }
}
