//! Uncaught-error channel and its observer.

use std::sync::Arc;

use conan_protocol::{Envelope, ErrorPayload, Value};

use crate::format::MessageFormatter;
use crate::host::Globals;
use crate::sink::MessageSink;

/// An uncaught script error, as delivered to the host's error handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEvent {
    pub message: String,
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub error: Value,
}

/// What a listener wants the host to do after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Continue with the host's default error reporting.
    Propagate,
    /// Suppress the host's default error reporting.
    Suppress,
}

/// A handler registered on the error channel.
pub trait ErrorListener: Send + Sync {
    fn on_error(&self, event: &ErrorEvent) -> Disposition;
}

/// Handle returned by [`ErrorChannel::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// The host's uncaught-error notification slot.
#[derive(Default)]
pub struct ErrorChannel {
    listeners: Vec<(ListenerId, Arc<dyn ErrorListener>)>,
    next_id: u64,
}

impl ErrorChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn ErrorListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Runs every listener in registration order.
    ///
    /// Default reporting is suppressed if any listener asks for it.
    pub fn dispatch(&self, event: &ErrorEvent) -> Disposition {
        let mut disposition = Disposition::Propagate;
        for (_, listener) in &self.listeners {
            if listener.on_error(event) == Disposition::Suppress {
                disposition = Disposition::Suppress;
            }
        }
        disposition
    }
}

/// Renders the position of an error in the source.
pub fn position(line: u32, column: u32) -> String {
    format!("line {line} column {column} / 第{line}行 第{column}列")
}

/// Mirrors uncaught errors as `JSError` envelopes.
///
/// Never suppresses the host's own error reporting.
pub struct ErrorObserver {
    sink: Arc<dyn MessageSink>,
    formatter: MessageFormatter,
}

impl ErrorObserver {
    pub fn new(sink: Arc<dyn MessageSink>, formatter: MessageFormatter) -> Self {
        Self { sink, formatter }
    }
}

impl ErrorListener for ErrorObserver {
    fn on_error(&self, event: &ErrorEvent) -> Disposition {
        let payload = ErrorPayload {
            msg: event.message.clone(),
            url: event.source.clone(),
            position: position(event.line, event.column),
            error: self.formatter.format(&event.error),
        };
        self.sink.send(Envelope::js_error(payload));
        Disposition::Propagate
    }
}

/// Registers an [`ErrorObserver`] on the host's error channel.
pub fn install(
    globals: &mut Globals,
    sink: Arc<dyn MessageSink>,
    formatter: MessageFormatter,
) -> ListenerId {
    let id = globals
        .errors
        .add_listener(Arc::new(ErrorObserver::new(sink, formatter)));
    tracing::debug!(?id, "error observer installed");
    id
}
