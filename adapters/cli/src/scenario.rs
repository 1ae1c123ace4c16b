//! Scripted producers that drive a session through a seeded run.
//!
//! The script stands in for the engine's spawn tracker, the boss combat
//! controller and the assorted listeners that report wave completions under
//! their own names.

use std::{rc::Rc, time::Duration};

use anyhow::{bail, Context, Result};
use arena_waves_core::{
    BossPayload, Command, EventSink, ManagerState, ManualClock, RawCounts, SpawnComposition,
    TimerPayload, TimersPayload, WaveNumber, WavePhase,
};
use arena_waves_session::{apply, query, Session};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

const MIN_ROSTER: i64 = 8;
const MAX_ROSTER: i64 = 16;
const ROSTER_GROWTH: i64 = 2;
const MAX_TICKS_PER_WAVE: u32 = 100_000;
const COMPLETION_ALIASES: [&str; 2] = ["wave-completed", "waveComplete"];

const BOSS_HEALTH_PER_WAVE: u32 = 40;
const BOSS_PHASES: u32 = 3;
const BOSS_ENRAGE_SECONDS: f64 = 90.0;
const BOSS_INVULNERABILITY_SECONDS: f64 = 1.0;
const BOSS_COLORS: [&str; 3] = ["#d94f30", "#e8a33d", "#7a2fc2"];

/// Aggregate figures describing a finished run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    /// Waves the script played to completion.
    pub(crate) waves_played: u32,
    /// Enemies sampled across every wave.
    pub(crate) enemies: u64,
    /// Boss fights the script started.
    pub(crate) boss_fights: u32,
    /// Completion reports sent on behalf of listeners other than the coordinator.
    pub(crate) duplicate_reports: u32,
}

/// Seeded driver owning the session it feeds.
#[derive(Debug)]
pub(crate) struct Scenario {
    session: Session<Rc<ManualClock>>,
    clock: Rc<ManualClock>,
    rng: ChaCha8Rng,
    tick: Duration,
}

impl Scenario {
    /// Creates a driver; `clock` must be the clock the session reads.
    pub(crate) fn new(
        session: Session<Rc<ManualClock>>,
        clock: Rc<ManualClock>,
        seed: u64,
        tick: Duration,
    ) -> Self {
        Self {
            session,
            clock,
            rng: ChaCha8Rng::seed_from_u64(seed),
            tick,
        }
    }

    /// Session being driven.
    pub(crate) fn session(&self) -> &Session<Rc<ManualClock>> {
        &self.session
    }

    /// Plays `waves` waves, delivering every session event to `out`.
    pub(crate) fn run(&mut self, waves: u32, out: &mut impl EventSink) -> Result<Summary> {
        let mut summary = Summary::default();
        for _ in 0..waves {
            self.play_wave(out, &mut summary)?;
        }
        Ok(summary)
    }

    fn play_wave(&mut self, out: &mut impl EventSink, summary: &mut Summary) -> Result<()> {
        let snapshot = query::wave_snapshot(&self.session);
        let wave = snapshot.wave;

        let count =
            self.rng.gen_range(MIN_ROSTER..=MAX_ROSTER) + i64::from(wave.get()) * ROSTER_GROWTH;
        let roster = self
            .session
            .compose_wave(count, &mut self.rng)
            .with_context(|| format!("failed to compose wave {}", wave.get()))?;
        debug!(
            wave = wave.get(),
            large = roster.large,
            medium = roster.medium,
            small = roster.small,
            "roster sampled"
        );

        let mut horde = Horde::new(&roster);
        let mut boss = snapshot.boss_wave.then(|| BossFight::new(wave));
        if let Some(fight) = &boss {
            self.boss_event("boss-spawned", fight.spawn_payload(wave), out);
            summary.boss_fights += 1;
        }

        let mut ticks = 0_u32;
        loop {
            let current = query::wave_snapshot(&self.session);
            let wave_over = current.wave != wave || current.phase == WavePhase::Break;
            if wave_over && boss.is_none() {
                break;
            }
            ticks += 1;
            if ticks > MAX_TICKS_PER_WAVE {
                bail!("wave {} stalled after {MAX_TICKS_PER_WAVE} ticks", wave.get());
            }

            if !wave_over {
                horde.step(&mut self.rng);
                let state = horde.manager_state(wave);
                apply(&mut self.session, Command::ApplyManagerState { state }, out);
            }
            if let Some(fight) = boss.as_mut() {
                for (name, payload) in fight.step(&mut self.rng) {
                    self.boss_event(name, payload, out);
                }
            }
            if boss.as_ref().is_some_and(BossFight::is_over) {
                boss = None;
            }
            self.advance(out);
        }

        for alias in COMPLETION_ALIASES {
            if self.rng.gen_bool(0.5) {
                self.report(Some(wave), alias, out);
                summary.duplicate_reports += 1;
            }
        }

        while query::wave_snapshot(&self.session).wave == wave {
            ticks += 1;
            if ticks > MAX_TICKS_PER_WAVE {
                bail!("break after wave {} never ended", wave.get());
            }
            self.advance(out);
        }

        summary.waves_played += 1;
        summary.enemies += roster.total();
        Ok(())
    }

    fn advance(&mut self, out: &mut impl EventSink) {
        self.clock.advance(self.tick);
        apply(&mut self.session, Command::Tick { dt: self.tick }, out);
    }

    fn boss_event(&mut self, name: &str, payload: BossPayload, out: &mut impl EventSink) {
        apply(
            &mut self.session,
            Command::BossEvent {
                name: name.to_owned(),
                payload,
            },
            out,
        );
    }

    fn report(&mut self, wave: Option<WaveNumber>, source: &str, out: &mut impl EventSink) {
        apply(
            &mut self.session,
            Command::ReportWaveCompleted {
                wave,
                source: source.to_owned(),
            },
            out,
        );
    }
}

/// Spawn and kill progress for one wave.
///
/// Every large enemy brings an escort that only unified accounting counts.
#[derive(Debug)]
struct Horde {
    primary_total: u32,
    all_total: u32,
    large: u32,
    spawned_primary: u32,
    spawned_all: u32,
    killed_all: u32,
}

impl Horde {
    fn new(roster: &SpawnComposition) -> Self {
        let primary_total = roster.large + roster.medium + roster.small;
        Self {
            primary_total,
            all_total: primary_total + roster.large,
            large: roster.large,
            spawned_primary: 0,
            spawned_all: 0,
            killed_all: 0,
        }
    }

    fn step<R: Rng>(&mut self, rng: &mut R) {
        for _ in 0..rng.gen_range(1..=4_u32) {
            if self.spawned_primary == self.primary_total {
                break;
            }
            let escort = u32::from(self.spawned_primary < self.large);
            self.spawned_primary += 1;
            self.spawned_all += 1 + escort;
        }

        let alive = self.spawned_all - self.killed_all;
        self.killed_all += rng.gen_range(0..=3_u32).min(alive);
    }

    fn killed_primary(&self) -> u32 {
        if self.all_total == 0 {
            return 0;
        }
        let scaled = u64::from(self.killed_all) * u64::from(self.primary_total)
            / u64::from(self.all_total);
        u32::try_from(scaled).unwrap_or(self.primary_total)
    }

    fn manager_state(&self, wave: WaveNumber) -> ManagerState {
        ManagerState {
            wave: Some(f64::from(wave.get())),
            spawned: RawCounts::new(f64::from(self.spawned_primary), f64::from(self.spawned_all)),
            killed: RawCounts::new(f64::from(self.killed_primary()), f64::from(self.killed_all)),
            totals: RawCounts::new(f64::from(self.primary_total), f64::from(self.all_total)),
            ..ManagerState::default()
        }
    }
}

/// Scripted boss combat controller.
#[derive(Debug)]
struct BossFight {
    max_health: u32,
    health: u32,
    phase: u32,
    invulnerable: bool,
    over: bool,
}

impl BossFight {
    fn new(wave: WaveNumber) -> Self {
        let max_health = BOSS_HEALTH_PER_WAVE.saturating_mul(wave.get());
        Self {
            max_health,
            health: max_health,
            phase: 0,
            invulnerable: false,
            over: false,
        }
    }

    fn is_over(&self) -> bool {
        self.over
    }

    fn spawn_payload(&self, wave: WaveNumber) -> BossPayload {
        BossPayload {
            boss_id: Some(f64::from(wave.get())),
            name: Some(format!("Warden of wave {}", wave.get())),
            health: Some(f64::from(self.health)),
            max_health: Some(f64::from(self.max_health)),
            phase: Some(0.0),
            phase_count: Some(f64::from(BOSS_PHASES)),
            wave: Some(f64::from(wave.get())),
            color_primary: Some(BOSS_COLORS[0].to_owned()),
            phase_colors: Some(BOSS_COLORS.iter().map(|color| (*color).to_owned()).collect()),
            timers: TimersPayload {
                phase: None,
                enrage: Some(TimerPayload {
                    remaining: Some(BOSS_ENRAGE_SECONDS),
                    total: Some(BOSS_ENRAGE_SECONDS),
                    ..TimerPayload::default()
                }),
            },
            ..BossPayload::default()
        }
    }

    /// Lands one round of damage and returns the events the controller reports.
    fn step<R: Rng>(&mut self, rng: &mut R) -> Vec<(&'static str, BossPayload)> {
        if self.over {
            return Vec::new();
        }
        if self.invulnerable {
            self.invulnerable = false;
            return vec![(
                "boss-invulnerability-changed",
                BossPayload {
                    invulnerable: Some(false),
                    ..BossPayload::default()
                },
            )];
        }

        self.health = self.health.saturating_sub(rng.gen_range(5..=25_u32));
        if self.health == 0 {
            self.over = true;
            return vec![(
                "boss-defeated",
                BossPayload {
                    health: Some(0.0),
                    ..BossPayload::default()
                },
            )];
        }

        let lost = u64::from(self.max_health - self.health);
        let reached = lost * u64::from(BOSS_PHASES) / u64::from(self.max_health.max(1));
        let reached = u32::try_from(reached)
            .unwrap_or(BOSS_PHASES)
            .min(BOSS_PHASES - 1);
        if reached > self.phase {
            self.phase = reached;
            self.invulnerable = true;
            return vec![
                (
                    "boss-phase-changed",
                    BossPayload {
                        phase: Some(f64::from(self.phase)),
                        health: Some(f64::from(self.health)),
                        ..BossPayload::default()
                    },
                ),
                (
                    "boss-invulnerability-changed",
                    BossPayload {
                        invulnerable: Some(true),
                        invulnerability_timer: Some(BOSS_INVULNERABILITY_SECONDS),
                        ..BossPayload::default()
                    },
                ),
            ];
        }

        vec![(
            "boss-health",
            BossPayload {
                health: Some(f64::from(self.health)),
                ..BossPayload::default()
            },
        )]
    }
}
