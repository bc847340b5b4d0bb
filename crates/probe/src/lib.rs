//! Diagnostic probe for script hosts.
//!
//! Wraps a host's console, uncaught-error channel and request APIs with
//! observers that forward every event to a [`MessageSink`] as an
//! [`Envelope`](conan_protocol::Envelope), leaving the wrapped behaviour
//! intact. Observers are decorators over capability traits, so installation
//! is an explicit and reversible step performed by the [`Installer`].

pub mod config;
pub mod console;
pub mod error;
pub mod errors;
pub mod format;
pub mod host;
pub mod installer;
pub mod network;
pub mod serializer;
pub mod sink;

pub use config::ProbeConfig;
pub use console::{Console, ObservedConsole, TimerRegistry};
pub use error::ProbeError;
pub use errors::{Disposition, ErrorChannel, ErrorEvent, ErrorListener, ErrorObserver, ListenerId};
pub use format::MessageFormatter;
pub use host::Globals;
pub use installer::{InstallReport, Installation, Installer};
pub use network::{
    Completion, CompletionListener, Fetch, FetchArg, FetchCall, FetchError, Headers,
    LegacyRequest, ObservedFetch, ObservedRequest, ObservedRequestFactory, OpenOptions, Request,
    RequestError, RequestFactory, Response,
};
pub use serializer::{JsonSerializer, ValueSerializer};
pub use sink::{ChannelSink, MemorySink, MessageSink};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Milliseconds since the Unix epoch, `0` if the clock is before it.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
