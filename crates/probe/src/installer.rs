//! Installation of the observers into host globals.
//!
//! Installing is a registration step: every replaced slot is remembered in
//! the returned [`Installation`], which puts the originals back on
//! [`Installation::uninstall`]. Installing twice without uninstalling wraps
//! the already-wrapped slots again and duplicates every envelope.

use std::sync::Arc;

use crate::config::ProbeConfig;
use crate::console::{self, Console};
use crate::errors::{self, ListenerId};
use crate::format::MessageFormatter;
use crate::host::Globals;
use crate::network::{self, Fetch, RequestFactory};
use crate::serializer::ValueSerializer;
use crate::sink::MessageSink;

/// Which observers ended up installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub errors: bool,
    pub console: bool,
    pub requests: bool,
    pub fetch: bool,
}

/// Installs the observers selected by a [`ProbeConfig`].
pub struct Installer {
    config: ProbeConfig,
    sink: Arc<dyn MessageSink>,
    formatter: MessageFormatter,
}

impl Installer {
    /// Creates an installer using the default JSON serializer.
    pub fn new(config: ProbeConfig, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            config,
            sink,
            formatter: MessageFormatter::default(),
        }
    }

    /// Replaces the serializer used for formatted values and headers.
    pub fn with_serializer(mut self, serializer: Arc<dyn ValueSerializer>) -> Self {
        self.formatter = MessageFormatter::new(serializer);
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Wraps the enabled host slots.
    pub fn install(&self, globals: &mut Globals) -> Installation {
        let mut installation = Installation::default();

        if self.config.errors {
            let id = errors::install(globals, Arc::clone(&self.sink), self.formatter.clone());
            installation.error_listener = Some(id);
        }

        if self.config.console {
            installation.console =
                console::install(globals, Arc::clone(&self.sink), self.formatter.clone());
        }

        if self.config.requests_enabled() {
            installation.requests = network::install_requests(
                globals,
                Arc::clone(&self.sink),
                Arc::clone(self.formatter.serializer()),
            );
        }

        if self.config.fetch_enabled() {
            installation.fetch = network::install_fetch(
                globals,
                Arc::clone(&self.sink),
                Arc::clone(self.formatter.serializer()),
            );
        }

        let report = installation.report();
        tracing::info!(
            errors = report.errors,
            console = report.console,
            requests = report.requests,
            fetch = report.fetch,
            "probe installed"
        );
        installation
    }
}

/// Originals replaced by an [`Installer`], kept for uninstalling.
#[derive(Default)]
pub struct Installation {
    error_listener: Option<ListenerId>,
    console: Option<Arc<dyn Console>>,
    requests: Option<Arc<dyn RequestFactory>>,
    fetch: Option<Arc<dyn Fetch>>,
}

impl Installation {
    pub fn report(&self) -> InstallReport {
        InstallReport {
            errors: self.error_listener.is_some(),
            console: self.console.is_some(),
            requests: self.requests.is_some(),
            fetch: self.fetch.is_some(),
        }
    }

    /// Restores the original host slots.
    pub fn uninstall(self, globals: &mut Globals) {
        if let Some(id) = self.error_listener {
            globals.errors.remove_listener(id);
        }
        if let Some(console) = self.console {
            globals.console = Some(console);
        }
        if let Some(requests) = self.requests {
            globals.requests = Some(requests);
        }
        if let Some(fetch) = self.fetch {
            globals.fetch = Some(fetch);
        }
        tracing::info!("probe uninstalled");
    }
}
