//! Host globals the observers are installed into.

use std::sync::Arc;

use crate::console::Console;
use crate::errors::ErrorChannel;
use crate::network::{Fetch, RequestFactory};

/// The slots of a host runtime that the probe wraps.
///
/// Each slot is optional because hosts differ in what they expose. The
/// installers are the only writers of these slots.
#[derive(Default)]
pub struct Globals {
    pub console: Option<Arc<dyn Console>>,
    pub errors: ErrorChannel,
    /// Constructor of legacy request objects.
    pub requests: Option<Arc<dyn RequestFactory>>,
    /// The fetch-style function.
    pub fetch: Option<Arc<dyn Fetch>>,
    /// Whether the request-descriptor constructor that accompanies `fetch`
    /// is available.
    pub request_constructor: bool,
}
