//! Console observer.
//!
//! Wraps a host console so that `log`, `error`, `warn`, `time` and `timeEnd`
//! are mirrored as `Console` envelopes. The wrapped console is always called
//! with the original arguments after the envelope is emitted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use conan_protocol::constants::{DEFAULT_TIMER_LABEL, INNER_LOG_SENTINEL};
use conan_protocol::{ConsoleTag, Envelope, Formatted, Value};

use crate::format::MessageFormatter;
use crate::host::Globals;
use crate::lock;
use crate::sink::MessageSink;

/// Logging and timer surface of a host console.
pub trait Console: Send + Sync {
    fn log(&self, args: &[Value]);
    fn error(&self, args: &[Value]);
    fn warn(&self, args: &[Value]);
    /// Starts a timer; `None` means the default label.
    fn time(&self, label: Option<&str>);
    /// Stops a timer; `None` means the default label.
    fn time_end(&self, label: Option<&str>);
}

/// Start instants of running console timers, keyed by label.
///
/// Starting a label that is already running restarts it.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: HashMap<String, Instant>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `at` as the start of `label`, replacing any running timer.
    pub fn start(&mut self, label: &str, at: Instant) {
        self.timers.insert(label.to_owned(), at);
    }

    /// Removes `label` and returns the time elapsed since it started.
    pub fn finish(&mut self, label: &str, at: Instant) -> Option<Duration> {
        self.timers
            .remove(label)
            .map(|started| at.saturating_duration_since(started))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.timers.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

/// Console decorator that mirrors calls to a message sink.
///
/// Owns its timer registry: timers started through one observed console are
/// invisible to any other.
pub struct ObservedConsole {
    inner: Arc<dyn Console>,
    sink: Arc<dyn MessageSink>,
    formatter: MessageFormatter,
    timers: Mutex<TimerRegistry>,
}

impl ObservedConsole {
    pub fn new(
        inner: Arc<dyn Console>,
        sink: Arc<dyn MessageSink>,
        formatter: MessageFormatter,
    ) -> Self {
        Self {
            inner,
            sink,
            formatter,
            timers: Mutex::new(TimerRegistry::new()),
        }
    }

    /// The wrapped console.
    pub fn inner(&self) -> &Arc<dyn Console> {
        &self.inner
    }

    /// Returns `true` if a timer with `label` is running.
    pub fn has_timer(&self, label: &str) -> bool {
        lock(&self.timers).contains(label)
    }

    fn emit(&self, args: &[Value], tag: ConsoleTag) {
        let formatted = self.formatter.format_all(args);
        self.sink.send(Envelope::console(formatted, tag));
    }

    fn emit_text(&self, text: String, tag: ConsoleTag) {
        self.sink
            .send(Envelope::console(vec![Formatted::from(text)], tag));
    }
}

impl Console for ObservedConsole {
    fn log(&self, args: &[Value]) {
        if is_inner_log(args) {
            tracing::trace!("skipping probe-internal log");
        } else {
            self.emit(args, ConsoleTag::Log);
        }
        self.inner.log(args);
    }

    fn error(&self, args: &[Value]) {
        self.emit(args, ConsoleTag::Error);
        self.inner.error(args);
    }

    fn warn(&self, args: &[Value]) {
        self.emit(args, ConsoleTag::Warn);
        self.inner.warn(args);
    }

    fn time(&self, label: Option<&str>) {
        let id = label.unwrap_or(DEFAULT_TIMER_LABEL);
        lock(&self.timers).start(id, Instant::now());
        self.emit_text(format!("{id}: timer started"), ConsoleTag::Log);
        self.inner.time(label);
    }

    fn time_end(&self, label: Option<&str>) {
        let id = label.unwrap_or(DEFAULT_TIMER_LABEL);
        let elapsed = lock(&self.timers).finish(id, Instant::now());
        match elapsed {
            Some(elapsed) => self.emit_text(
                format!("{id}: {:.3}ms", elapsed.as_secs_f64() * 1000.0),
                ConsoleTag::Log,
            ),
            None => self.emit_text(format!("Timer '{id}' does not exist"), ConsoleTag::Error),
        }
        self.inner.time_end(label);
    }
}

fn is_inner_log(args: &[Value]) -> bool {
    matches!(args.first(), Some(Value::String(s)) if s == INNER_LOG_SENTINEL)
}

/// Replaces the host console with an observed one.
///
/// Returns the replaced console, or `None` if the host has no console.
pub fn install(
    globals: &mut Globals,
    sink: Arc<dyn MessageSink>,
    formatter: MessageFormatter,
) -> Option<Arc<dyn Console>> {
    let original = globals.console.take()?;
    let observed = ObservedConsole::new(Arc::clone(&original), sink, formatter);
    globals.console = Some(Arc::new(observed));
    tracing::debug!("console observer installed");
    Some(original)
}
