//! Observability for the marshalling engine
//!
//! Structured one-line JSON logging of typed events.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. Logging never changes the outcome of a call
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use recordjson::observability::{log_event_with_fields, Event, Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! log_event_with_fields(Event::SchemaResolved, &[("model", "user")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity, DEFAULT_MIN_SEVERITY};

/// Log a typed event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a typed event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        // Verifies no panic
        log_event(Event::SchemaRegistered);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::CascadeTargetMissing, &[("model", "company"), ("id", "7")]);
    }
}
