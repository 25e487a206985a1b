//! Control messages sent by controlled contexts.

use serde_json::Value;

/// Message `type` that requests immediate takeover.
pub const SKIP_WAITING: &str = "SKIP_WAITING";

/// A recognized control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Take control now instead of waiting for old contexts to close.
    SkipWaiting,
}

impl ControlCommand {
    /// Parse a posted message. Anything that is not an object with a known
    /// string `type` is not a command.
    pub fn parse(message: &Value) -> Option<Self> {
        match message.get("type").and_then(Value::as_str) {
            Some(SKIP_WAITING) => Some(ControlCommand::SkipWaiting),
            _ => None,
        }
    }
}
