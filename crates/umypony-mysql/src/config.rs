//! Adapter behaviour switches.

use serde::Deserialize;

/// What to do with a parameter no converter claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeMode {
    /// Write the value's plain text into the statement and warn
    #[default]
    PassThrough,
    /// Reject the statement with a parameter error
    Strict,
}

/// Adapter configuration shared by a provider and its connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Log every statement sent to the transport
    pub debug: bool,
    /// Handling of values without a matching converter
    pub escape_mode: EscapeMode,
}

impl AdapterConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable statement logging.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the handling of unmatched parameter values.
    pub fn escape_mode(mut self, mode: EscapeMode) -> Self {
        self.escape_mode = mode;
        self
    }

    /// Shorthand for `escape_mode(EscapeMode::Strict)`.
    pub fn strict(self) -> Self {
        self.escape_mode(EscapeMode::Strict)
    }
}
