//! Observable events emitted by the marshalling engine.
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Schema registry
    /// A model definition was registered
    SchemaRegistered,
    /// A model definition was read from disk
    SchemaFileLoaded,
    /// A model's descriptor set was resolved and memoized
    SchemaResolved,

    // Configuration
    /// A marshaller was given a config whose registry settings differ from its registry
    ConfigRegistryMismatch,

    // Deserialization
    /// Leftover document keys were dropped under the `ignore` policy
    UnknownKeysIgnored,

    // Serialization
    /// A cascaded relation pointed at a record the store does not have
    CascadeTargetMissing,
    /// A cascade hop was refused because the depth ceiling was reached
    CascadeDepthLimit,
}

impl Event {
    /// Returns the event name written to the log
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::SchemaRegistered => "SCHEMA_REGISTERED",
            Event::SchemaFileLoaded => "SCHEMA_FILE_LOADED",
            Event::SchemaResolved => "SCHEMA_RESOLVED",
            Event::ConfigRegistryMismatch => "CONFIG_REGISTRY_MISMATCH",
            Event::UnknownKeysIgnored => "UNKNOWN_KEYS_IGNORED",
            Event::CascadeTargetMissing => "CASCADE_TARGET_MISSING",
            Event::CascadeDepthLimit => "CASCADE_DEPTH_LIMIT",
        }
    }

    /// Returns the severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::SchemaRegistered | Event::SchemaFileLoaded => Severity::Info,
            Event::SchemaResolved | Event::UnknownKeysIgnored => Severity::Trace,
            Event::ConfigRegistryMismatch
            | Event::CascadeTargetMissing
            | Event::CascadeDepthLimit => Severity::Warn,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake_case() {
        let events = [
            Event::SchemaRegistered,
            Event::SchemaFileLoaded,
            Event::SchemaResolved,
            Event::ConfigRegistryMismatch,
            Event::UnknownKeysIgnored,
            Event::CascadeTargetMissing,
            Event::CascadeDepthLimit,
        ];

        for event in events {
            assert!(event
                .as_str()
                .chars()
                .all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_cascade_events_warn() {
        assert_eq!(Event::CascadeTargetMissing.severity(), Severity::Warn);
        assert_eq!(Event::CascadeDepthLimit.severity(), Severity::Warn);
        assert_eq!(Event::SchemaResolved.severity(), Severity::Trace);
    }
}
