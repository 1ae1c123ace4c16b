#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative owner of the wave, boss and completion state for one run.
//!
//! Adapters mutate a [`Session`] only through [`apply`] and observe it through
//! the [`query`] module. Internally the wave coordinator's announcements are
//! routed to the boss machine and the completion gate before they reach the
//! adapter, so every outbound completion has passed deduplication.

mod config;

pub use config::{BossSettings, CompletionSettings, SessionConfig, WaveSettings};

use arena_waves_core::{Clock, Command, Event, EventSink, SpawnComposition, Timestamp, WaveNumber};
use arena_waves_system_boss_encounter::{BossEncounter, BossEvent, BossPatch};
use arena_waves_system_completion_gate::CompletionGate;
use arena_waves_system_spawn_composition::{SampleError, SpawnCompositionSampler};
use arena_waves_system_wave_lifecycle::WaveLifecycle;
use rand::Rng;
use tracing::{debug, info};

/// Coordination state for a single run.
#[derive(Debug)]
pub struct Session<C: Clock> {
    clock: C,
    waves: WaveLifecycle,
    boss: BossEncounter,
    gate: CompletionGate,
    sampler: SpawnCompositionSampler,
    internal: Vec<Event>,
    backlog: Vec<Event>,
}

impl<C: Clock> Session<C> {
    /// Creates a session positioned at the start of the first wave.
    ///
    /// The announcement of the first wave is held back and delivered with the
    /// events of the first applied command.
    #[must_use]
    pub fn new(config: &SessionConfig, clock: C) -> Self {
        let mut session = Self {
            clock,
            waves: WaveLifecycle::new(config.wave_config()),
            boss: BossEncounter::new(config.boss_config()),
            gate: CompletionGate::new(config.completion.canonical.clone()),
            sampler: SpawnCompositionSampler::new(config.presets),
            internal: Vec::new(),
            backlog: Vec::new(),
        };

        let mut backlog = Vec::new();
        session.waves.reset(&mut session.internal);
        session.route(&mut backlog);
        session.backlog = backlog;
        session
    }

    /// Samples the roster for a wave of `total_count` enemies using the preset
    /// for the current accounting mode.
    ///
    /// # Errors
    ///
    /// Returns [`SampleError`] when the count is out of range or the configured
    /// preset is unusable.
    pub fn compose_wave<R>(
        &self,
        total_count: i64,
        rng: &mut R,
    ) -> Result<SpawnComposition, SampleError>
    where
        R: Rng + ?Sized,
    {
        self.sampler
            .compose(total_count, self.waves.accounting_mode(), rng)
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Drains the coordinator's pending announcements into the boss machine,
    /// the completion gate and finally `out`.
    fn route(&mut self, out: &mut impl EventSink) {
        let now = self.now();
        let mut pending = std::mem::take(&mut self.internal);
        for event in pending.drain(..) {
            match event {
                Event::WaveStarted { wave, boss_wave } => {
                    info!(wave = wave.get(), boss_wave, "wave started");
                    out.emit(event);
                    if boss_wave {
                        let started = BossEvent::WaveStarted {
                            boss_wave,
                            patch: BossPatch {
                                wave: Some(wave),
                                ..BossPatch::default()
                            },
                        };
                        self.boss.apply(&started, now, out);
                    }
                }
                Event::WaveCompleted { wave, source } => {
                    self.complete(wave, &source, now, out);
                }
                Event::BossLifecycleChanged { .. } => out.emit(event),
            }
        }
        self.internal = pending;
    }

    fn complete(
        &mut self,
        wave: Option<WaveNumber>,
        source: &str,
        now: Timestamp,
        out: &mut impl EventSink,
    ) {
        if !self.gate.admit(wave, source, now) {
            return;
        }

        info!(wave = wave.map_or(0, |wave| wave.get()), source, "wave completed");
        out.emit(Event::WaveCompleted {
            wave,
            source: source.to_owned(),
        });

        let boss_wave = wave.is_some_and(|wave| self.waves.is_boss_wave(wave));
        self.boss.on_wave_completed(wave, boss_wave, now, out);
    }
}

/// Applies the provided command to the session, mutating state deterministically.
pub fn apply<C: Clock>(session: &mut Session<C>, command: Command, out: &mut impl EventSink) {
    for event in session.backlog.drain(..) {
        out.emit(event);
    }

    match command {
        Command::Tick { dt } => {
            session
                .waves
                .advance(dt.as_secs_f64(), &mut session.internal);
            session.route(out);
            let now = session.now();
            session.boss.tick(now, out);
        }
        Command::ApplyManagerState { state } => {
            session
                .waves
                .apply_manager_state(&state, &mut session.internal);
            session.route(out);
        }
        Command::BossEvent { name, payload } => {
            let event = BossEvent::from_named(&name, &payload);
            debug!(name = %name, kind = ?event.kind(), "boss event received");
            let now = session.now();
            session.boss.apply(&event, now, out);
        }
        Command::ReportWaveCompleted { wave, source } => {
            let now = session.now();
            session.complete(wave, &source, now, out);
        }
        Command::SetAccountingMode { mode } => {
            session.waves.set_accounting_mode(mode);
        }
        Command::ResetRun => {
            info!("run reset");
            let now = session.now();
            session.gate.clear();
            session.boss.reset(now, out);
            session.waves.reset(&mut session.internal);
            session.route(out);
        }
    }
}

/// Read-only views over a [`Session`].
pub mod query {
    use arena_waves_core::{
        AccountingMode, BossLifecycle, BossSnapshot, Clock, Timestamp, WaveSnapshot,
        WeightPresets,
    };
    use arena_waves_system_completion_gate::{DedupRecord, GateKey};

    use super::Session;

    /// Snapshot of the current wave with totals in the active accounting mode.
    #[must_use]
    pub fn wave_snapshot<C: Clock>(session: &Session<C>) -> WaveSnapshot {
        session.waves.snapshot()
    }

    /// Accounting convention currently exposed.
    #[must_use]
    pub fn accounting_mode<C: Clock>(session: &Session<C>) -> AccountingMode {
        session.waves.accounting_mode()
    }

    /// Boss state with timers resolved against the session clock.
    #[must_use]
    pub fn boss_snapshot<C: Clock>(session: &Session<C>) -> BossSnapshot {
        session.boss.snapshot(session.now())
    }

    /// Current boss lifecycle state.
    #[must_use]
    pub fn boss_lifecycle<C: Clock>(session: &Session<C>) -> BossLifecycle {
        session.boss.lifecycle()
    }

    /// Time at which a defeated boss returns to dormant, if scheduled.
    #[must_use]
    pub fn pending_boss_reset<C: Clock>(session: &Session<C>) -> Option<Timestamp> {
        session.boss.pending_reset()
    }

    /// Completion record held for `key`.
    #[must_use]
    pub fn completion_record<'a, C: Clock>(
        session: &'a Session<C>,
        key: &GateKey,
    ) -> Option<&'a DedupRecord> {
        session.gate.record(key)
    }

    /// Number of waves the completion gate remembers.
    #[must_use]
    pub fn completion_records<C: Clock>(session: &Session<C>) -> usize {
        session.gate.len()
    }

    /// Spawn weight presets used by [`Session::compose_wave`].
    #[must_use]
    pub fn spawn_presets<C: Clock>(session: &Session<C>) -> &WeightPresets {
        session.sampler.presets()
    }
}
