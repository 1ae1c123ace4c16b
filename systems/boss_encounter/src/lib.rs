#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Boss encounter state machine.
//!
//! The machine moves through `Dormant → Upcoming → Active → Defeated` and
//! back to `Dormant` once the post-defeat cooldown elapses. Every
//! [`BossEvent`] carries a [`BossPatch`] that is merged onto the current state
//! before the event's lifecycle effect is applied. Timers are stored as
//! absolute deadlines and resolved against the caller's `now` on every read,
//! so presentation never drifts with frame-rate irregularities. The machine
//! never touches a rendering surface; it hands out [`BossSnapshot`] values.

mod patch;
mod timer;

pub use patch::{BossEvent, BossPatch};
pub use timer::{TimerPatch, TimerState};

use arena_waves_core::{
    sanitize_seconds, BossEventKind, BossId, BossLifecycle, BossSnapshot, Event, EventSink,
    Timestamp, WaveNumber,
};
use tracing::debug;

const DEFAULT_COOLDOWN_SECONDS: f64 = 4.0;
const DEFAULT_PHASE_LABEL: &str = "Next phase";
const DEFAULT_ENRAGE_LABEL: &str = "Enrage";

/// Configuration parameters required to construct the boss machine.
#[derive(Clone, Debug)]
pub struct Config {
    cooldown_seconds: f64,
    phase_label: String,
    enrage_label: String,
}

impl Config {
    /// Creates a configuration. A malformed cooldown counts as zero.
    #[must_use]
    pub fn new(
        cooldown_seconds: f64,
        phase_label: impl Into<String>,
        enrage_label: impl Into<String>,
    ) -> Self {
        Self {
            cooldown_seconds: sanitize_seconds(cooldown_seconds).unwrap_or(0.0),
            phase_label: phase_label.into(),
            enrage_label: enrage_label.into(),
        }
    }

    /// Seconds between defeat and the reset to dormant.
    #[must_use]
    pub const fn cooldown_seconds(&self) -> f64 {
        self.cooldown_seconds
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_COOLDOWN_SECONDS,
            DEFAULT_PHASE_LABEL,
            DEFAULT_ENRAGE_LABEL,
        )
    }
}

#[derive(Clone, Debug)]
struct BossState {
    boss_id: Option<BossId>,
    name: Option<String>,
    lifecycle: BossLifecycle,
    wave: Option<WaveNumber>,
    phase_index: u32,
    phase_count: u32,
    health: u32,
    max_health: u32,
    color_primary: Option<String>,
    phase_colors: Vec<String>,
    invulnerable: bool,
    invulnerable_until: Option<Timestamp>,
    phase_timer: TimerState,
    enrage_timer: TimerState,
    last_event: Option<BossEventKind>,
    last_update_at: Option<Timestamp>,
}

impl BossState {
    fn dormant(config: &Config) -> Self {
        Self {
            boss_id: None,
            name: None,
            lifecycle: BossLifecycle::Dormant,
            wave: None,
            phase_index: 0,
            phase_count: 0,
            health: 0,
            max_health: 0,
            color_primary: None,
            phase_colors: Vec::new(),
            invulnerable: false,
            invulnerable_until: None,
            phase_timer: TimerState::new(config.phase_label.as_str()),
            enrage_timer: TimerState::new(config.enrage_label.as_str()),
            last_event: None,
            last_update_at: None,
        }
    }

    fn merge(&mut self, patch: &BossPatch, now: Timestamp) {
        if let Some(boss_id) = patch.boss_id {
            self.boss_id = Some(boss_id);
        }
        if let Some(name) = non_blank(patch.name.as_deref()) {
            self.name = Some(name);
        }
        if let Some(wave) = patch.wave {
            self.wave = Some(wave);
        }

        if let Some(max_health) = patch.max_health {
            self.max_health = max_health;
        }
        if let Some(health) = patch.health {
            if self.max_health == 0 {
                self.max_health = health;
            }
            self.health = health;
        }
        self.health = self.health.min(self.max_health);

        if let Some(phase_count) = patch.phase_count {
            self.phase_count = phase_count;
        }
        if let Some(phase_index) = patch.phase_index {
            self.phase_index = phase_index;
        }
        if self.phase_count > 0 {
            self.phase_index = self.phase_index.min(self.phase_count - 1);
        }

        if let Some(color) = non_blank(patch.color_primary.as_deref()) {
            self.color_primary = Some(color);
        }
        if let Some(colors) = &patch.phase_colors {
            self.phase_colors = colors
                .iter()
                .filter_map(|color| non_blank(Some(color.as_str())))
                .collect();
        }

        if let Some(invulnerable) = patch.invulnerable {
            self.invulnerable = invulnerable;
            if !invulnerable {
                self.invulnerable_until = None;
            }
        }
        if let Some(seconds) = patch.invulnerability_seconds {
            self.invulnerable_until = Some(now.after_seconds(seconds));
        }

        if let Some(timer) = &patch.phase_timer {
            self.phase_timer.apply(timer, now);
        }
        if let Some(timer) = &patch.enrage_timer {
            self.enrage_timer.apply(timer, now);
        }
    }

    fn snapshot(&self, now: Timestamp) -> BossSnapshot {
        BossSnapshot {
            boss_id: self.boss_id,
            name: self.name.clone(),
            lifecycle: self.lifecycle,
            wave: self.wave,
            phase_index: self.phase_index,
            phase_count: self.phase_count,
            health: self.health,
            max_health: self.max_health,
            color_primary: self.color_primary.clone(),
            phase_colors: self.phase_colors.clone(),
            invulnerable: self.invulnerable,
            invulnerability_remaining: self
                .invulnerable_until
                .map(|deadline| now.seconds_until(deadline)),
            phase_timer: self.phase_timer.snapshot(now),
            enrage_timer: self.enrage_timer.snapshot(now),
            last_event: self.last_event,
            last_update_at: self.last_update_at,
        }
    }
}

/// Finite-state machine tracking the periodic boss encounter.
#[derive(Debug)]
pub struct BossEncounter {
    config: Config,
    state: BossState,
    reset_at: Option<Timestamp>,
}

impl BossEncounter {
    /// Creates a dormant machine.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let state = BossState::dormant(&config);
        Self {
            config,
            state,
            reset_at: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn lifecycle(&self) -> BossLifecycle {
        self.state.lifecycle
    }

    /// Time at which the post-defeat reset fires, if one is scheduled.
    #[must_use]
    pub const fn pending_reset(&self) -> Option<Timestamp> {
        self.reset_at
    }

    /// Immutable copy of the state with timers resolved at `now`.
    #[must_use]
    pub fn snapshot(&self, now: Timestamp) -> BossSnapshot {
        self.state.snapshot(now)
    }

    /// Merges `event` into the state and applies its lifecycle effect.
    ///
    /// Emits [`Event::BossLifecycleChanged`] when the lifecycle moves.
    pub fn apply(&mut self, event: &BossEvent, now: Timestamp, out: &mut impl EventSink) {
        let before = self.state.lifecycle;
        self.state.merge(event.patch(), now);

        match event {
            BossEvent::WaveStarted { boss_wave, .. } => {
                if *boss_wave {
                    self.state.lifecycle = BossLifecycle::Upcoming;
                    self.state.health = 0;
                    self.reset_at = None;
                }
            }
            BossEvent::Spawned(_)
            | BossEvent::PhaseChanged(_)
            | BossEvent::InvulnerabilityChanged(_) => {
                self.state.lifecycle = BossLifecycle::Active;
                self.reset_at = None;
            }
            BossEvent::Defeated(_) => {
                self.state.lifecycle = BossLifecycle::Defeated;
                self.state.health = 0;
                self.state.invulnerable = false;
                self.state.invulnerable_until = None;
                self.state.phase_timer.clear();
                self.state.enrage_timer.clear();
                let reset_at = now.after_seconds(self.config.cooldown_seconds);
                debug!(reset_at = reset_at.as_millis(), "boss cooldown scheduled");
                self.reset_at = Some(reset_at);
            }
            BossEvent::HudUpdate(_) => {}
        }

        // Health on a boss that has not fallen means the fight is live.
        if self.state.health > 0 && self.state.lifecycle != BossLifecycle::Defeated {
            self.state.lifecycle = BossLifecycle::Active;
        }

        self.state.last_event = Some(event.kind());
        self.state.last_update_at = Some(now);
        self.announce_if_changed(before, now, out);
    }

    /// Reacts to an admitted wave completion.
    ///
    /// A boss wave that ends before its boss ever spawned abandons the encounter.
    pub fn on_wave_completed(
        &mut self,
        wave: Option<WaveNumber>,
        boss_wave: bool,
        now: Timestamp,
        out: &mut impl EventSink,
    ) {
        if !boss_wave || self.state.lifecycle != BossLifecycle::Upcoming {
            return;
        }
        if wave.is_some() && self.state.wave.is_some() && wave != self.state.wave {
            return;
        }
        debug!(?wave, "boss never spawned");
        self.go_dormant(now, out);
    }

    /// Fires the scheduled post-defeat reset once `now` reaches it.
    pub fn tick(&mut self, now: Timestamp, out: &mut impl EventSink) {
        let Some(reset_at) = self.reset_at else {
            return;
        };
        if now.has_reached(reset_at) {
            self.go_dormant(now, out);
        }
    }

    /// Hard cancellation: drops any scheduled reset and returns to dormant now.
    pub fn reset(&mut self, now: Timestamp, out: &mut impl EventSink) {
        self.go_dormant(now, out);
    }

    fn go_dormant(&mut self, now: Timestamp, out: &mut impl EventSink) {
        let before = self.state.lifecycle;
        self.reset_at = None;
        self.state = BossState::dormant(&self.config);
        self.announce_if_changed(before, now, out);
    }

    fn announce_if_changed(
        &self,
        before: BossLifecycle,
        now: Timestamp,
        out: &mut impl EventSink,
    ) {
        let after = self.state.lifecycle;
        if before == after {
            return;
        }
        debug!(?before, ?after, "boss lifecycle changed");
        out.emit(Event::BossLifecycleChanged {
            snapshot: self.state.snapshot(now),
        });
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
