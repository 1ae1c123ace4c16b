#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Idempotency gate for "wave completed" notifications.
//!
//! Several producers report the same fact under different names, sometimes
//! more than once. The gate admits at most one notification per wave from any
//! single source, plus one upgrade when the canonical name arrives after an
//! alias already fired for that wave.

use std::{collections::BTreeMap, fmt};

use arena_waves_core::{Timestamp, WaveNumber, CANONICAL_WAVE_COMPLETE};
use tracing::debug;

/// Key under which a completion is remembered.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GateKey {
    /// The producer named the wave.
    Wave(WaveNumber),
    /// The producer did not know the wave; keyed by source name.
    Unknown(String),
}

impl GateKey {
    /// Resolves the key for a notification.
    #[must_use]
    pub fn resolve(wave: Option<WaveNumber>, source: &str) -> Self {
        match wave {
            Some(wave) => Self::Wave(wave),
            None => Self::Unknown(source.to_owned()),
        }
    }
}

impl fmt::Display for GateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wave(wave) => write!(f, "{}", wave.get()),
            Self::Unknown(source) => write!(f, "unknown:{source}"),
        }
    }
}

/// The last admitted notification for a key.
#[derive(Clone, Debug, PartialEq)]
pub struct DedupRecord {
    /// Source name of the admitted notification.
    pub source_event_name: String,
    /// Time the notification was admitted.
    pub recorded_at: Timestamp,
}

/// Outcome of checking a notification against the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateDecision {
    /// Nothing was recorded for the key yet.
    FirstSeen,
    /// The canonical name arrived after an alias; admitted once more.
    CanonicalUpgrade,
    /// The canonical name already fired; aliases are dropped.
    CanonicalAlreadyHeld,
    /// The same source already fired for the key.
    ExactRepeat,
    /// A second alias for a key an alias already claimed.
    AliasAfterOther,
}

impl GateDecision {
    /// Whether the notification is passed on.
    #[must_use]
    pub const fn admits(self) -> bool {
        matches!(self, Self::FirstSeen | Self::CanonicalUpgrade)
    }
}

/// Deduplication table keyed by wave.
#[derive(Debug)]
pub struct CompletionGate {
    canonical: String,
    records: BTreeMap<GateKey, DedupRecord>,
}

impl Default for CompletionGate {
    fn default() -> Self {
        Self::new(CANONICAL_WAVE_COMPLETE)
    }
}

impl CompletionGate {
    /// Creates an empty gate that treats `canonical` as the preferred name.
    #[must_use]
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            records: BTreeMap::new(),
        }
    }

    /// The preferred source name.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Classifies a notification without touching the table.
    #[must_use]
    pub fn decide(&self, wave: Option<WaveNumber>, source: &str) -> GateDecision {
        let key = GateKey::resolve(wave, source);
        let Some(record) = self.records.get(&key) else {
            return GateDecision::FirstSeen;
        };

        let incoming_canonical = source == self.canonical;
        if record.source_event_name == self.canonical && !incoming_canonical {
            GateDecision::CanonicalAlreadyHeld
        } else if record.source_event_name == source {
            GateDecision::ExactRepeat
        } else if !incoming_canonical {
            GateDecision::AliasAfterOther
        } else {
            GateDecision::CanonicalUpgrade
        }
    }

    /// Decides whether a notification passes and records it when it does.
    pub fn admit(&mut self, wave: Option<WaveNumber>, source: &str, now: Timestamp) -> bool {
        let decision = self.decide(wave, source);
        let key = GateKey::resolve(wave, source);
        debug!(%key, source, ?decision, "wave completion checked");

        if !decision.admits() {
            return false;
        }

        let _ = self.records.insert(
            key,
            DedupRecord {
                source_event_name: source.to_owned(),
                recorded_at: now,
            },
        );
        true
    }

    /// Record currently held for `key`.
    #[must_use]
    pub fn record(&self, key: &GateKey) -> Option<&DedupRecord> {
        self.records.get(key)
    }

    /// Number of keys with a record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Purges every record.
    pub fn clear(&mut self) {
        if !self.records.is_empty() {
            debug!(records = self.records.len(), "completion gate cleared");
        }
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(value: u32) -> Option<WaveNumber> {
        WaveNumber::new(value)
    }

    #[test]
    fn decisions_follow_table_order() {
        let mut gate = CompletionGate::new("wave-complete");
        let now = Timestamp::ZERO;
        assert_eq!(gate.decide(wave(1), "alias-a"), GateDecision::FirstSeen);
        assert!(gate.admit(wave(1), "alias-a", now));

        assert_eq!(gate.decide(wave(1), "alias-a"), GateDecision::ExactRepeat);
        assert_eq!(gate.decide(wave(1), "alias-b"), GateDecision::AliasAfterOther);
        assert_eq!(
            gate.decide(wave(1), "wave-complete"),
            GateDecision::CanonicalUpgrade
        );

        assert!(gate.admit(wave(1), "wave-complete", now));
        assert_eq!(
            gate.decide(wave(1), "alias-b"),
            GateDecision::CanonicalAlreadyHeld
        );
        assert_eq!(
            gate.decide(wave(1), "wave-complete"),
            GateDecision::ExactRepeat
        );
    }

    #[test]
    fn key_display_matches_record_naming() {
        assert_eq!(GateKey::resolve(wave(12), "x").to_string(), "12");
        assert_eq!(
            GateKey::resolve(None, "wave-completed").to_string(),
            "unknown:wave-completed"
        );
    }
}
