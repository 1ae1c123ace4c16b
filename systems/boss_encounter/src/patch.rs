//! Typed boss events and validation of raw combat controller payloads.

use arena_waves_core::{
    sanitize_count, sanitize_seconds, BossEventKind, BossId, BossPayload, TimerPayload, Timestamp,
    WaveNumber,
};
use tracing::warn;

use crate::timer::TimerPatch;

/// Validated partial boss state. `None` leaves the current value untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BossPatch {
    /// Identifier of the boss.
    pub boss_id: Option<BossId>,
    /// Display name.
    pub name: Option<String>,
    /// Current health, clamped to the maximum on merge.
    pub health: Option<u32>,
    /// Maximum health.
    pub max_health: Option<u32>,
    /// Zero-based phase index, clamped to the phase count on merge.
    pub phase_index: Option<u32>,
    /// Number of phases.
    pub phase_count: Option<u32>,
    /// Wave hosting the encounter.
    pub wave: Option<WaveNumber>,
    /// Primary display color.
    pub color_primary: Option<String>,
    /// Per-phase colors; replaces the current list wholesale after blanks are dropped.
    pub phase_colors: Option<Vec<String>>,
    /// Update for the phase-shift countdown.
    pub phase_timer: Option<TimerPatch>,
    /// Update for the enrage countdown.
    pub enrage_timer: Option<TimerPatch>,
    /// Invulnerability flag.
    pub invulnerable: Option<bool>,
    /// Seconds of invulnerability left.
    pub invulnerability_seconds: Option<f64>,
}

impl BossPatch {
    /// Validates a raw payload. Malformed numbers are dropped so the merge keeps
    /// the previous value.
    #[must_use]
    pub fn from_payload(payload: &BossPayload) -> Self {
        Self {
            boss_id: count("bossId", payload.boss_id).map(BossId::new),
            name: payload.name.clone(),
            health: count("health", payload.health),
            max_health: count("maxHealth", payload.max_health),
            phase_index: count("phase", payload.phase),
            phase_count: count("phaseCount", payload.phase_count),
            wave: count("wave", payload.wave).and_then(WaveNumber::new),
            color_primary: payload.color_primary.clone(),
            phase_colors: payload.phase_colors.clone(),
            phase_timer: payload.timers.phase.as_ref().map(timer_patch),
            enrage_timer: payload.timers.enrage.as_ref().map(timer_patch),
            invulnerable: payload.invulnerable,
            invulnerability_seconds: seconds("invulnerabilityTimer", payload.invulnerability_timer),
        }
    }
}

/// Boss lifecycle event carrying the patch merged onto the current state.
#[derive(Clone, Debug, PartialEq)]
pub enum BossEvent {
    /// A wave started.
    WaveStarted {
        /// Whether the wave hosts a boss encounter.
        boss_wave: bool,
        /// Fields to merge.
        patch: BossPatch,
    },
    /// The boss entered the arena.
    Spawned(BossPatch),
    /// The boss moved to another phase.
    PhaseChanged(BossPatch),
    /// The boss gained or lost invulnerability.
    InvulnerabilityChanged(BossPatch),
    /// The boss was defeated.
    Defeated(BossPatch),
    /// Generic refresh of display fields.
    HudUpdate(BossPatch),
}

impl BossEvent {
    /// Builds a typed event from a producer's event name and raw payload.
    ///
    /// Unrecognized names become [`BossEvent::HudUpdate`].
    #[must_use]
    pub fn from_named(name: &str, payload: &BossPayload) -> Self {
        let patch = BossPatch::from_payload(payload);
        match BossEventKind::from_name(name) {
            BossEventKind::WaveStarted => Self::WaveStarted {
                boss_wave: payload.boss_wave.unwrap_or(false),
                patch,
            },
            BossEventKind::Spawned => Self::Spawned(patch),
            BossEventKind::PhaseChanged => Self::PhaseChanged(patch),
            BossEventKind::InvulnerabilityChanged => Self::InvulnerabilityChanged(patch),
            BossEventKind::Defeated => Self::Defeated(patch),
            BossEventKind::HudUpdate => Self::HudUpdate(patch),
        }
    }

    /// Kind of the event.
    #[must_use]
    pub const fn kind(&self) -> BossEventKind {
        match self {
            Self::WaveStarted { .. } => BossEventKind::WaveStarted,
            Self::Spawned(_) => BossEventKind::Spawned,
            Self::PhaseChanged(_) => BossEventKind::PhaseChanged,
            Self::InvulnerabilityChanged(_) => BossEventKind::InvulnerabilityChanged,
            Self::Defeated(_) => BossEventKind::Defeated,
            Self::HudUpdate(_) => BossEventKind::HudUpdate,
        }
    }

    /// Patch carried by the event.
    #[must_use]
    pub const fn patch(&self) -> &BossPatch {
        match self {
            Self::WaveStarted { patch, .. }
            | Self::Spawned(patch)
            | Self::PhaseChanged(patch)
            | Self::InvulnerabilityChanged(patch)
            | Self::Defeated(patch)
            | Self::HudUpdate(patch) => patch,
        }
    }
}

fn timer_patch(payload: &TimerPayload) -> TimerPatch {
    TimerPatch {
        label: payload.label.clone(),
        total: seconds("timer.total", payload.total),
        remaining: seconds("timer.remaining", payload.remaining),
        deadline: payload.deadline.and_then(|value| {
            if value.is_finite() && value >= 0.0 {
                Some(Timestamp::from_millis(value))
            } else {
                warn!(value, "dropping malformed timer deadline");
                None
            }
        }),
    }
}

fn count(field: &'static str, value: Option<f64>) -> Option<u32> {
    let value = value?;
    let sanitized = sanitize_count(value);
    if sanitized.is_none() {
        warn!(field, value, "dropping malformed boss field");
    }
    sanitized
}

fn seconds(field: &'static str, value: Option<f64>) -> Option<f64> {
    let value = value?;
    let sanitized = sanitize_seconds(value);
    if sanitized.is_none() {
        warn!(field, value, "dropping malformed boss field");
    }
    sanitized
}
