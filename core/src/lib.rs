#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Arena Waves coordination layer.
//!
//! This crate defines the message surface that connects the enemy/wave engine,
//! the pure systems, and the presentation layer. Producers submit [`Command`]
//! values describing what they observed, the session executes those commands
//! via its `apply` entry point, and then broadcasts [`Event`] values through an
//! [`EventSink`]. Presentation reads immutable snapshots and never mutates
//! state.

use std::{cell::Cell, num::NonZeroU32, rc::Rc, time::Duration};

use serde::{Deserialize, Serialize};

/// Canonical source name for "wave completed" notifications.
pub const CANONICAL_WAVE_COMPLETE: &str = "wave-complete";

/// Commands that express every input the coordination layer accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances wave timers and scheduled boss transitions.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Pushes the latest raw counters reported by the spawn/kill tracker.
    ApplyManagerState {
        /// Counters and flags as reported by the engine.
        state: ManagerState,
    },
    /// Delivers a named boss lifecycle event and its payload.
    BossEvent {
        /// Name the producer used for the event.
        name: String,
        /// Loosely-typed payload merged onto the boss state after validation.
        payload: BossPayload,
    },
    /// Reports that a producer observed a wave completing.
    ReportWaveCompleted {
        /// Wave the producer believes completed, if it knows.
        wave: Option<WaveNumber>,
        /// Name under which the producer emitted the notification.
        source: String,
    },
    /// Switches the accounting convention used for exposed wave totals.
    SetAccountingMode {
        /// Convention to expose from now on.
        mode: AccountingMode,
    },
    /// Discards all run state and starts over from the first wave.
    ResetRun,
}

/// Notifications broadcast to the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Announces that a new wave became active.
    WaveStarted {
        /// Wave that started.
        wave: WaveNumber,
        /// Whether the wave hosts a boss encounter.
        boss_wave: bool,
    },
    /// Announces that a wave completed.
    WaveCompleted {
        /// Wave that completed, when the producer knew it.
        wave: Option<WaveNumber>,
        /// Source name of the notification that was admitted.
        source: String,
    },
    /// Announces that the boss encounter moved to a new lifecycle state.
    BossLifecycleChanged {
        /// Fully-resolved boss state at the time of the transition.
        snapshot: BossSnapshot,
    },
}

/// Destination for outbound [`Event`] values.
pub trait EventSink {
    /// Accepts a single event.
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

/// Absolute point in time expressed in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Timestamp(f64);

impl Timestamp {
    /// The origin of the timeline.
    pub const ZERO: Self = Self(0.0);

    /// Creates a timestamp from a millisecond value.
    #[must_use]
    pub const fn from_millis(millis: f64) -> Self {
        Self(millis)
    }

    /// Millisecond value of the timestamp.
    #[must_use]
    pub const fn as_millis(self) -> f64 {
        self.0
    }

    /// Timestamp lying `seconds` after `self`.
    #[must_use]
    pub fn after_seconds(self, seconds: f64) -> Self {
        Self(self.0 + seconds * 1000.0)
    }

    /// Timestamp lying `duration` after `self`.
    #[must_use]
    pub fn after(self, duration: Duration) -> Self {
        self.after_seconds(duration.as_secs_f64())
    }

    /// Seconds left from `self` until `deadline`, never negative.
    #[must_use]
    pub fn seconds_until(self, deadline: Timestamp) -> f64 {
        (deadline.0 - self.0).max(0.0) / 1000.0
    }

    /// Reports whether `self` is at or past `deadline`.
    #[must_use]
    pub fn has_reached(self, deadline: Timestamp) -> bool {
        self.0 >= deadline.0
    }
}

/// Source of the current time.
pub trait Clock {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Timestamp>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: Timestamp) {
        self.now.set(now);
    }

    /// Moves the clock forward by `dt`.
    pub fn advance(&self, dt: Duration) {
        self.now.set(self.now.get().after(dt));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

/// One-based index of a wave within a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaveNumber(u32);

impl WaveNumber {
    /// The wave every run starts with.
    pub const FIRST: Self = Self(1);

    /// Creates a wave number, rejecting zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Retrieves the numeric representation of the wave.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Wave that follows `self`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Reports whether the wave lands on a multiple of `interval`.
    #[must_use]
    pub const fn is_multiple_of(self, interval: NonZeroU32) -> bool {
        self.0 % interval.get() == 0
    }
}

/// Identifier assigned to a boss by the combat controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BossId(u32);

impl BossId {
    /// Creates a new boss identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Convention used to report wave totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountingMode {
    /// Counts only the primary size class.
    Legacy,
    /// Counts every enemy category spawned for the wave, boss included.
    #[default]
    Unified,
}

/// Whether a wave is being fought or the arena is resting between waves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WavePhase {
    /// Enemies are spawning and the active timer runs.
    Active,
    /// The wave is over and the break timer runs.
    Break,
}

/// Enemy size classes rolled by the spawn composition sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeClass {
    /// Largest, slowest enemies.
    Large,
    /// Mid-sized enemies.
    Medium,
    /// Smallest, most numerous enemies.
    Small,
}

/// Relative weights for each size class. The weights need not sum to one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnWeights {
    /// Weight of [`SizeClass::Large`].
    pub large: f64,
    /// Weight of [`SizeClass::Medium`].
    pub medium: f64,
    /// Weight of [`SizeClass::Small`].
    pub small: f64,
}

impl SpawnWeights {
    /// Historical distribution skewed toward large enemies.
    pub const LEGACY: Self = Self::new(0.5, 0.3, 0.2);
    /// Distribution skewed toward the middle size class.
    pub const UNIFIED: Self = Self::new(0.3, 0.4, 0.3);

    /// Creates a weight triple.
    #[must_use]
    pub const fn new(large: f64, medium: f64, small: f64) -> Self {
        Self {
            large,
            medium,
            small,
        }
    }

    /// Weight assigned to the provided size class.
    #[must_use]
    pub const fn weight(&self, class: SizeClass) -> f64 {
        match class {
            SizeClass::Large => self.large,
            SizeClass::Medium => self.medium,
            SizeClass::Small => self.small,
        }
    }
}

/// The two named weight presets selectable at the call site.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightPresets {
    /// Preset used while the run uses [`AccountingMode::Legacy`].
    pub legacy: SpawnWeights,
    /// Preset used while the run uses [`AccountingMode::Unified`].
    pub unified: SpawnWeights,
}

impl Default for WeightPresets {
    fn default() -> Self {
        Self {
            legacy: SpawnWeights::LEGACY,
            unified: SpawnWeights::UNIFIED,
        }
    }
}

impl WeightPresets {
    /// Preset associated with the provided accounting mode.
    #[must_use]
    pub const fn for_mode(&self, mode: AccountingMode) -> SpawnWeights {
        match mode {
            AccountingMode::Legacy => self.legacy,
            AccountingMode::Unified => self.unified,
        }
    }
}

/// Concrete per-size-class enemy counts generated for a wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SpawnComposition {
    /// Number of large enemies.
    pub large: u32,
    /// Number of medium enemies.
    pub medium: u32,
    /// Number of small enemies.
    pub small: u32,
}

impl SpawnComposition {
    /// Count for the provided size class.
    #[must_use]
    pub const fn count(&self, class: SizeClass) -> u32 {
        match class {
            SizeClass::Large => self.large,
            SizeClass::Medium => self.medium,
            SizeClass::Small => self.small,
        }
    }

    /// Sum of every size class.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.large as u64 + self.medium as u64 + self.small as u64
    }
}

/// A metric counted under both accounting conventions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CounterPair {
    /// Count restricted to the primary size class.
    pub primary: u32,
    /// Count covering every enemy category, escorts and boss included.
    pub all: u32,
}

impl CounterPair {
    /// Creates a counter pair.
    #[must_use]
    pub const fn new(primary: u32, all: u32) -> Self {
        Self { primary, all }
    }

    /// Value exposed under the provided accounting mode.
    #[must_use]
    pub const fn select(&self, mode: AccountingMode) -> u32 {
        match mode {
            AccountingMode::Legacy => self.primary,
            AccountingMode::Unified => self.all,
        }
    }
}

/// Raw wave counters retained under both conventions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct WaveTotals {
    /// Enemies spawned so far this wave.
    pub spawned: CounterPair,
    /// Enemies killed so far this wave.
    pub killed: CounterPair,
    /// Enemies the wave is expected to field.
    pub targets: CounterPair,
}

/// Read-only snapshot of the current wave.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveSnapshot {
    /// Wave the snapshot describes.
    pub wave: WaveNumber,
    /// Current phase of the wave.
    pub phase: WavePhase,
    /// Convention used by the derived accessors.
    pub accounting_mode: AccountingMode,
    /// Unmodified counters under both conventions.
    pub raw: WaveTotals,
    /// Seconds left before the active phase times out.
    pub active_time_remaining: f64,
    /// Seconds left before the next wave starts.
    pub break_time_remaining: f64,
    /// Whether the wave hosts a boss encounter.
    pub boss_wave: bool,
}

impl WaveSnapshot {
    /// Target count under the snapshot's accounting mode.
    #[must_use]
    pub const fn total_targets(&self) -> u32 {
        self.raw.targets.select(self.accounting_mode)
    }

    /// Spawned count under the snapshot's accounting mode.
    #[must_use]
    pub const fn spawned_count(&self) -> u32 {
        self.raw.spawned.select(self.accounting_mode)
    }

    /// Killed count under the snapshot's accounting mode.
    #[must_use]
    pub const fn killed_count(&self) -> u32 {
        self.raw.killed.select(self.accounting_mode)
    }

    /// Enemies still standing under the snapshot's accounting mode.
    #[must_use]
    pub const fn remaining_targets(&self) -> u32 {
        self.total_targets().saturating_sub(self.killed_count())
    }
}

/// Lifecycle of a boss encounter. Exactly one state holds at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BossLifecycle {
    /// No encounter is scheduled.
    #[default]
    Dormant,
    /// A boss wave started but the boss has not spawned yet.
    Upcoming,
    /// The boss is on the field.
    Active,
    /// The boss fell and the cooldown window is running.
    Defeated,
}

/// Kinds of named boss lifecycle events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BossEventKind {
    /// A wave started; carries the boss-wave flag.
    WaveStarted,
    /// The boss entered the arena.
    Spawned,
    /// The boss moved to another phase.
    PhaseChanged,
    /// The boss gained or lost invulnerability.
    InvulnerabilityChanged,
    /// The boss was defeated.
    Defeated,
    /// Generic state sync that never changes the lifecycle.
    HudUpdate,
}

impl BossEventKind {
    /// Resolves an event name. Unknown names are treated as [`BossEventKind::HudUpdate`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "wave-started" => Self::WaveStarted,
            "boss-spawned" => Self::Spawned,
            "boss-phase-changed" => Self::PhaseChanged,
            "boss-invulnerability-changed" => Self::InvulnerabilityChanged,
            "boss-defeated" => Self::Defeated,
            _ => Self::HudUpdate,
        }
    }

    /// Canonical name of the event kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WaveStarted => "wave-started",
            Self::Spawned => "boss-spawned",
            Self::PhaseChanged => "boss-phase-changed",
            Self::InvulnerabilityChanged => "boss-invulnerability-changed",
            Self::Defeated => "boss-defeated",
            Self::HudUpdate => "hud-update",
        }
    }
}

/// Presentation view of a boss timer.
#[derive(Clone, Debug, PartialEq)]
pub struct TimerSnapshot {
    /// Label shown next to the countdown.
    pub label: String,
    /// Full length of the countdown in seconds, if known.
    pub total_duration: Option<f64>,
    /// Seconds left, or `None` when the timer is not running.
    pub remaining: Option<f64>,
}

/// Immutable, fully-resolved copy of the boss state for presentation.
#[derive(Clone, Debug, PartialEq)]
pub struct BossSnapshot {
    /// Identifier of the boss, if one is known.
    pub boss_id: Option<BossId>,
    /// Display name of the boss.
    pub name: Option<String>,
    /// Current lifecycle state.
    pub lifecycle: BossLifecycle,
    /// Wave hosting the encounter.
    pub wave: Option<WaveNumber>,
    /// Zero-based index of the current phase.
    pub phase_index: u32,
    /// Number of phases in the fight.
    pub phase_count: u32,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Primary display color.
    pub color_primary: Option<String>,
    /// Display color for each phase in order.
    pub phase_colors: Vec<String>,
    /// Whether the boss currently ignores damage.
    pub invulnerable: bool,
    /// Seconds of invulnerability left, if a window is running.
    pub invulnerability_remaining: Option<f64>,
    /// Countdown to the next phase shift.
    pub phase_timer: TimerSnapshot,
    /// Countdown to enrage.
    pub enrage_timer: TimerSnapshot,
    /// Most recent event merged into the state.
    pub last_event: Option<BossEventKind>,
    /// Time of the most recent merge.
    pub last_update_at: Option<Timestamp>,
}

impl BossSnapshot {
    /// Whether the boss wave started but the boss has not spawned.
    #[must_use]
    pub fn upcoming(&self) -> bool {
        self.lifecycle == BossLifecycle::Upcoming
    }

    /// Whether the fight is live.
    #[must_use]
    pub fn active(&self) -> bool {
        self.lifecycle == BossLifecycle::Active
    }

    /// Whether the boss was defeated and the cooldown is running.
    #[must_use]
    pub fn defeated(&self) -> bool {
        self.lifecycle == BossLifecycle::Defeated
    }

    /// Health as a fraction of maximum health, zero when unknown.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.max_health == 0 {
            return 0.0;
        }
        f64::from(self.health) / f64::from(self.max_health)
    }

    /// Display color for the current phase, falling back to the primary color.
    #[must_use]
    pub fn current_color(&self) -> Option<&str> {
        usize::try_from(self.phase_index)
            .ok()
            .and_then(|index| self.phase_colors.get(index))
            .or(self.color_primary.as_ref())
            .map(String::as_str)
    }
}

/// Converts an engine-reported count to a whole number.
///
/// Returns `None` for NaN, infinite, or negative values so callers can keep the
/// previous value. Fractions are truncated and values beyond `u32::MAX` saturate.
#[must_use]
pub fn sanitize_count(value: f64) -> Option<u32> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.min(f64::from(u32::MAX)) as u32)
}

/// Converts an engine-reported duration in seconds, rejecting NaN, infinite, and
/// negative values.
#[must_use]
pub fn sanitize_seconds(value: f64) -> Option<f64> {
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Raw `{primary, all}` pair as reported by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCounts {
    /// Primary size class only.
    pub primary: Option<f64>,
    /// Every enemy category.
    pub all: Option<f64>,
}

impl RawCounts {
    /// Creates a pair with both values present.
    #[must_use]
    pub const fn new(primary: f64, all: f64) -> Self {
        Self {
            primary: Some(primary),
            all: Some(all),
        }
    }
}

/// Per-tick counters pushed by the spawn/kill tracker.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ManagerState {
    /// Wave the tracker is on.
    pub wave: Option<f64>,
    /// Whether the tracker considers the arena to be in a break.
    pub in_break: Option<bool>,
    /// Enemies spawned this wave.
    pub spawned: RawCounts,
    /// Enemies killed this wave.
    pub killed: RawCounts,
    /// Enemies the wave will field.
    pub totals: RawCounts,
    /// Seconds left in the active phase.
    pub active_time_remaining: Option<f64>,
    /// Seconds left in the break.
    pub break_time_remaining: Option<f64>,
    /// Explicit boss-wave flag from upstream.
    pub boss_wave: Option<bool>,
}

/// Raw timer fields as reported by the boss combat controller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerPayload {
    /// Seconds left.
    pub remaining: Option<f64>,
    /// Absolute deadline in milliseconds; wins over `remaining`.
    pub deadline: Option<f64>,
    /// Full countdown length in seconds.
    pub total: Option<f64>,
    /// Display label.
    pub label: Option<String>,
}

/// Raw timers block of a boss payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimersPayload {
    /// Phase-shift countdown.
    pub phase: Option<TimerPayload>,
    /// Enrage countdown.
    pub enrage: Option<TimerPayload>,
}

/// Loosely-typed boss payload as reported by the boss combat controller.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BossPayload {
    /// Identifier of the boss.
    pub boss_id: Option<f64>,
    /// Display name.
    pub name: Option<String>,
    /// Current health.
    pub health: Option<f64>,
    /// Maximum health.
    pub max_health: Option<f64>,
    /// Zero-based phase index.
    pub phase: Option<f64>,
    /// Number of phases.
    pub phase_count: Option<f64>,
    /// Wave hosting the encounter.
    pub wave: Option<f64>,
    /// Boss-wave flag carried by `wave-started`.
    pub boss_wave: Option<bool>,
    /// Primary display color.
    pub color_primary: Option<String>,
    /// Per-phase display colors.
    pub phase_colors: Option<Vec<String>>,
    /// Phase and enrage timers.
    pub timers: TimersPayload,
    /// Invulnerability flag.
    pub invulnerable: Option<bool>,
    /// Seconds of invulnerability left.
    pub invulnerability_timer: Option<f64>,
}
