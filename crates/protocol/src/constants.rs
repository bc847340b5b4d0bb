use serde::{Deserialize, Serialize};

/// First `console.log` argument reserved for the probe's own diagnostics.
///
/// Calls starting with this token reach the original console but are never
/// mirrored, so the probe can print without feeding back into itself.
pub const INNER_LOG_SENTINEL: &str = "conan-inner-log";

/// Hint prepended to rendered plain objects.
pub const OBJECT_HINT: &str = "an object can only print its non-callable properties";

/// Visual placeholder substituted for spaces in rendered blocks.
pub const NBSP: char = '\u{a0}';

/// Timer label used when `time`/`timeEnd` are called without one.
pub const DEFAULT_TIMER_LABEL: &str = "default";

/// Method reported when a request never specified one.
pub const DEFAULT_METHOD: &str = "GET";

/// Method reported for a fetch called with a bare URL.
pub const BARE_URL_METHOD: &str = "get";

/// Envelope type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "JSError")]
    JsError,
    #[serde(rename = "Console")]
    Console,
    #[serde(rename = "NetWork")]
    Network,
}

/// Console level carried by `Console` envelopes.
///
/// `Log` is never written on the wire: untagged envelopes are plain logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTag {
    Log,
    Error,
    Warn,
}
