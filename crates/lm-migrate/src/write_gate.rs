//! Write gate
//!
//! A per-invocation switch deciding whether the driver persists rows. It is
//! passed to [`Migrator::run`](crate::Migrator::run) by value and never stored
//! globally.

use serde::Serialize;

/// Whether a run commits writes or only reports what it would do
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteGate {
    enabled: bool,
}

impl WriteGate {
    /// A gate that lets writes through
    pub fn enabled() -> Self {
        Self { enabled: true }
    }

    /// A closed gate; the run is a dry run
    pub fn dry_run() -> Self {
        Self::default()
    }

    pub fn from_flag(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Read a request-style value. `true`, `1`, `yes` and `on` open the gate,
    /// ignoring case and surrounding whitespace. Anything else keeps it closed.
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        Self::from_flag(matches!(value.as_str(), "true" | "1" | "yes" | "on"))
    }

    pub fn is_write_enabled(&self) -> bool {
        self.enabled
    }
}
