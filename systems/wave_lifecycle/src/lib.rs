#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave lifecycle coordinator that owns the current wave snapshot.
//!
//! The coordinator keeps raw counters under both accounting conventions and
//! only chooses between them when a snapshot is read, so flipping the
//! [`AccountingMode`] never loses data. It also performs edge detection on the
//! Active to Break transition and emits exactly one [`Event::WaveCompleted`]
//! per wave.

use std::{collections::BTreeSet, num::NonZeroU32};

use arena_waves_core::{
    sanitize_count, sanitize_seconds, AccountingMode, CounterPair, Event, EventSink, ManagerState,
    RawCounts, WaveNumber, WavePhase, WaveSnapshot, WaveTotals, CANONICAL_WAVE_COMPLETE,
};
use tracing::{debug, warn};

const DEFAULT_BOSS_INTERVAL: u32 = 5;
const DEFAULT_ACTIVE_SECONDS: f64 = 60.0;
const DEFAULT_BREAK_SECONDS: f64 = 10.0;

/// Configuration parameters required to construct the coordinator.
#[derive(Clone, Debug)]
pub struct Config {
    boss_interval: NonZeroU32,
    accounting_mode: AccountingMode,
    active_seconds: f64,
    break_seconds: f64,
    completion_source: String,
}

impl Config {
    /// Creates a configuration. Durations that are negative or not finite count as zero.
    ///
    /// An active duration of zero leaves waves untimed: they only end when cleared
    /// or when the engine reports a break.
    #[must_use]
    pub fn new(
        boss_interval: NonZeroU32,
        accounting_mode: AccountingMode,
        active_seconds: f64,
        break_seconds: f64,
    ) -> Self {
        Self {
            boss_interval,
            accounting_mode,
            active_seconds: sanitize_seconds(active_seconds).unwrap_or(0.0),
            break_seconds: sanitize_seconds(break_seconds).unwrap_or(0.0),
            completion_source: CANONICAL_WAVE_COMPLETE.to_owned(),
        }
    }

    /// Overrides the source name attached to emitted completions.
    #[must_use]
    pub fn with_completion_source(mut self, source: impl Into<String>) -> Self {
        self.completion_source = source.into();
        self
    }

    /// Interval between boss waves.
    #[must_use]
    pub const fn boss_interval(&self) -> NonZeroU32 {
        self.boss_interval
    }
}

impl Default for Config {
    fn default() -> Self {
        let interval = NonZeroU32::new(DEFAULT_BOSS_INTERVAL).unwrap_or(NonZeroU32::MIN);
        Self::new(
            interval,
            AccountingMode::default(),
            DEFAULT_ACTIVE_SECONDS,
            DEFAULT_BREAK_SECONDS,
        )
    }
}

/// Coordinator that tracks wave progression and normalizes wave totals.
#[derive(Debug)]
pub struct WaveLifecycle {
    config: Config,
    mode: AccountingMode,
    wave: WaveNumber,
    phase: WavePhase,
    raw: WaveTotals,
    active_time_remaining: f64,
    active_timer_running: bool,
    break_time_remaining: f64,
    boss_wave: bool,
    upstream_boss_waves: BTreeSet<WaveNumber>,
    completion_emitted: bool,
}

impl WaveLifecycle {
    /// Creates a coordinator positioned at the start of the first wave.
    ///
    /// No event is emitted; call [`WaveLifecycle::reset`] to announce the first wave.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mode = config.accounting_mode;
        let mut lifecycle = Self {
            config,
            mode,
            wave: WaveNumber::FIRST,
            phase: WavePhase::Active,
            raw: WaveTotals::default(),
            active_time_remaining: 0.0,
            active_timer_running: false,
            break_time_remaining: 0.0,
            boss_wave: false,
            upstream_boss_waves: BTreeSet::new(),
            completion_emitted: false,
        };
        lifecycle.begin_wave(WaveNumber::FIRST, None);
        lifecycle
    }

    /// Returns the read-only snapshot of the current wave.
    #[must_use]
    pub fn snapshot(&self) -> WaveSnapshot {
        WaveSnapshot {
            wave: self.wave,
            phase: self.phase,
            accounting_mode: self.mode,
            raw: self.raw,
            active_time_remaining: self.active_time_remaining,
            break_time_remaining: self.break_time_remaining,
            boss_wave: self.boss_wave,
        }
    }

    /// Accounting convention currently exposed by snapshots.
    #[must_use]
    pub const fn accounting_mode(&self) -> AccountingMode {
        self.mode
    }

    /// Selects the accounting convention exposed by snapshots.
    pub fn set_accounting_mode(&mut self, mode: AccountingMode) {
        if self.mode != mode {
            debug!(?mode, "accounting mode changed");
        }
        self.mode = mode;
    }

    /// Reports whether `wave` hosts a boss encounter.
    ///
    /// Waves the engine flagged as boss waves keep that flag after the
    /// coordinator has moved past them.
    #[must_use]
    pub fn is_boss_wave(&self, wave: WaveNumber) -> bool {
        if wave == self.wave {
            self.boss_wave
        } else {
            wave.is_multiple_of(self.config.boss_interval)
                || self.upstream_boss_waves.contains(&wave)
        }
    }

    /// Merges counters and flags reported by the spawn/kill tracker.
    ///
    /// Malformed numbers keep their previous value. A larger wave number starts
    /// that wave, and a break flag while active ends the current wave.
    pub fn apply_manager_state(&mut self, state: &ManagerState, out: &mut impl EventSink) {
        if let Some(raw_wave) = state.wave {
            match sanitize_count(raw_wave).and_then(WaveNumber::new) {
                Some(wave) if wave > self.wave => self.start_wave(wave, state.boss_wave, out),
                Some(wave) if wave < self.wave => {
                    warn!(
                        reported = wave.get(),
                        current = self.wave.get(),
                        "ignoring stale wave number"
                    );
                }
                Some(_) => {}
                None => warn!(value = raw_wave, "ignoring malformed wave number"),
            }
        }

        self.raw.spawned = merge_pair(self.raw.spawned, state.spawned, "spawned");
        self.raw.killed = merge_pair(self.raw.killed, state.killed, "killed");
        self.raw.targets = merge_pair(self.raw.targets, state.totals, "totals");

        if let Some(value) = state.active_time_remaining {
            self.active_time_remaining = merge_seconds(self.active_time_remaining, value, "active");
            if self.active_time_remaining > 0.0 {
                self.active_timer_running = true;
            }
        }
        if let Some(value) = state.break_time_remaining {
            self.break_time_remaining = merge_seconds(self.break_time_remaining, value, "break");
        }

        if state.in_break == Some(true) && self.phase == WavePhase::Active {
            self.enter_break(out);
        }
    }

    /// Advances whichever timer is running by `delta_seconds`.
    ///
    /// The active phase ends when its timer runs out or every target of the wave
    /// is killed. A running timer that the engine pushes to zero counts as run
    /// out. The break ends when its timer runs out, starting the next wave.
    pub fn advance(&mut self, delta_seconds: f64, out: &mut impl EventSink) {
        let delta = match sanitize_seconds(delta_seconds) {
            Some(delta) => delta,
            None => {
                warn!(value = delta_seconds, "ignoring malformed tick delta");
                0.0
            }
        };

        match self.phase {
            WavePhase::Active => {
                self.active_time_remaining = (self.active_time_remaining - delta).max(0.0);
                let timed_out = self.active_timer_running && self.active_time_remaining == 0.0;
                if timed_out || self.is_cleared() {
                    self.enter_break(out);
                }
            }
            WavePhase::Break => {
                self.break_time_remaining = (self.break_time_remaining - delta).max(0.0);
                if self.break_time_remaining == 0.0 {
                    self.start_wave(self.wave.next(), None, out);
                }
            }
        }
    }

    /// Returns to the first wave and announces it.
    ///
    /// The accounting mode is a presentation setting and survives the reset.
    pub fn reset(&mut self, out: &mut impl EventSink) {
        self.upstream_boss_waves.clear();
        self.begin_wave(WaveNumber::FIRST, None);
        out.emit(Event::WaveStarted {
            wave: self.wave,
            boss_wave: self.boss_wave,
        });
    }

    fn is_cleared(&self) -> bool {
        self.raw.targets.all > 0 && self.raw.killed.all >= self.raw.targets.all
    }

    fn start_wave(
        &mut self,
        wave: WaveNumber,
        upstream_boss: Option<bool>,
        out: &mut impl EventSink,
    ) {
        if self.phase == WavePhase::Active {
            // The engine skipped the break; the wave still completed.
            self.emit_completion(out);
        }
        self.begin_wave(wave, upstream_boss);
        debug!(wave = wave.get(), boss_wave = self.boss_wave, "wave started");
        out.emit(Event::WaveStarted {
            wave,
            boss_wave: self.boss_wave,
        });
    }

    fn begin_wave(&mut self, wave: WaveNumber, upstream_boss: Option<bool>) {
        self.wave = wave;
        self.phase = WavePhase::Active;
        self.raw = WaveTotals::default();
        self.active_time_remaining = self.config.active_seconds;
        self.active_timer_running = self.config.active_seconds > 0.0;
        self.break_time_remaining = 0.0;
        let scheduled = wave.is_multiple_of(self.config.boss_interval);
        self.boss_wave = scheduled || upstream_boss.unwrap_or(false);
        if self.boss_wave && !scheduled {
            let _ = self.upstream_boss_waves.insert(wave);
        }
        self.completion_emitted = false;
    }

    fn enter_break(&mut self, out: &mut impl EventSink) {
        self.phase = WavePhase::Break;
        self.active_time_remaining = 0.0;
        self.active_timer_running = false;
        self.break_time_remaining = self.config.break_seconds;
        self.emit_completion(out);
    }

    fn emit_completion(&mut self, out: &mut impl EventSink) {
        if self.completion_emitted {
            return;
        }
        self.completion_emitted = true;
        debug!(wave = self.wave.get(), "wave completed");
        out.emit(Event::WaveCompleted {
            wave: Some(self.wave),
            source: self.config.completion_source.clone(),
        });
    }
}

fn merge_pair(previous: CounterPair, incoming: RawCounts, metric: &'static str) -> CounterPair {
    CounterPair {
        primary: merge_count(previous.primary, incoming.primary, metric),
        all: merge_count(previous.all, incoming.all, metric),
    }
}

fn merge_count(previous: u32, incoming: Option<f64>, metric: &'static str) -> u32 {
    let Some(value) = incoming else {
        return previous;
    };
    sanitize_count(value).unwrap_or_else(|| {
        warn!(metric, value, "keeping previous count for malformed input");
        previous
    })
}

fn merge_seconds(previous: f64, incoming: f64, timer: &'static str) -> f64 {
    sanitize_seconds(incoming).unwrap_or_else(|| {
        warn!(timer, value = incoming, "keeping previous timer for malformed input");
        previous
    })
}
