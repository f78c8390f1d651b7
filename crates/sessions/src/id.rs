//! Session identifier generation.
//!
//! Session ids share the shape of W3C trace ids (128 random bits, 32
//! lowercase hex characters) so both can be handled by the same tooling.
//! Uniqueness is probabilistic; the ids are fine for correlation and must
//! not be used as security tokens.

use opentelemetry::trace::TraceId;
use opentelemetry_sdk::trace::{IdGenerator, RandomIdGenerator};

/// Produces fresh session identifiers.
pub trait SessionIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator backed by the OpenTelemetry SDK's random trace ids.
#[derive(Debug, Clone, Default)]
pub struct RandomSessionIds {
    inner: RandomIdGenerator,
}

impl RandomSessionIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionIdGenerator for RandomSessionIds {
    fn generate(&self) -> String {
        loop {
            let id = self.inner.new_trace_id();
            // The all-zero id is reserved as "invalid" by W3C Trace Context.
            if id != TraceId::INVALID {
                return id.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_32_lowercase_hex() {
        let id = RandomSessionIds::new().generate();
        assert_eq!(id.len(), 32);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn ids_are_distinct() {
        let ids = RandomSessionIds::new();
        let seen: HashSet<String> = (0..1_000).map(|_| ids.generate()).collect();
        assert_eq!(seen.len(), 1_000);
    }

    #[test]
    fn ids_parse_as_valid_trace_ids() {
        let id = RandomSessionIds::new().generate();
        let parsed = TraceId::from_hex(&id).unwrap();
        assert_ne!(parsed, TraceId::INVALID);
    }
}
