use arena_waves_core::{
    BossEventKind, BossLifecycle, BossPayload, Event, TimerPayload, TimersPayload, Timestamp,
    WaveNumber,
};
use arena_waves_system_boss_encounter::{BossEncounter, BossEvent, BossPatch, Config, TimerPatch};

const COOLDOWN_SECONDS: f64 = 3.0;

fn at(millis: f64) -> Timestamp {
    Timestamp::from_millis(millis)
}

fn machine() -> BossEncounter {
    BossEncounter::new(Config::new(COOLDOWN_SECONDS, "Next phase", "Enrage"))
}

fn wave_started(boss_wave: bool, wave: u32) -> BossEvent {
    BossEvent::WaveStarted {
        boss_wave,
        patch: BossPatch {
            wave: WaveNumber::new(wave),
            ..BossPatch::default()
        },
    }
}

fn spawned() -> BossEvent {
    BossEvent::Spawned(BossPatch {
        name: Some("Hive Warden".to_owned()),
        health: Some(1_000),
        max_health: Some(1_000),
        phase_count: Some(3),
        enrage_timer: Some(TimerPatch {
            remaining: Some(90.0),
            total: Some(90.0),
            ..TimerPatch::default()
        }),
        ..BossPatch::default()
    })
}

fn lifecycles(events: &[Event]) -> Vec<BossLifecycle> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::BossLifecycleChanged { snapshot } => Some(snapshot.lifecycle),
            _ => None,
        })
        .collect()
}

#[test]
fn encounter_runs_full_lifecycle() {
    let mut boss = machine();
    let mut events = Vec::new();

    boss.apply(&wave_started(true, 5), at(0.0), &mut events);
    let snapshot = boss.snapshot(at(0.0));
    assert!(snapshot.upcoming());
    assert!(!snapshot.active());

    boss.apply(&spawned(), at(1_000.0), &mut events);
    let snapshot = boss.snapshot(at(1_000.0));
    assert!(snapshot.active());
    assert!(!snapshot.upcoming());

    boss.apply(
        &BossEvent::Defeated(BossPatch::default()),
        at(20_000.0),
        &mut events,
    );
    let snapshot = boss.snapshot(at(20_000.0));
    assert!(snapshot.defeated());
    assert!(!snapshot.active());
    assert_eq!(snapshot.health, 0);
    assert_eq!(snapshot.enrage_timer.remaining, None, "timers are cleared");

    boss.tick(at(22_999.0), &mut events);
    assert!(boss.snapshot(at(22_999.0)).defeated(), "cooldown still running");

    boss.tick(at(23_000.0), &mut events);
    let snapshot = boss.snapshot(at(23_000.0));
    assert_eq!(snapshot.lifecycle, BossLifecycle::Dormant);
    assert_eq!(snapshot.boss_id, None);
    assert_eq!(snapshot.name, None);
    assert!(!snapshot.active() && !snapshot.upcoming() && !snapshot.defeated());

    assert_eq!(
        lifecycles(&events),
        vec![
            BossLifecycle::Upcoming,
            BossLifecycle::Active,
            BossLifecycle::Defeated,
            BossLifecycle::Dormant,
        ]
    );
}

#[test]
fn non_boss_wave_start_leaves_machine_dormant() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(&wave_started(false, 2), at(0.0), &mut events);

    assert_eq!(boss.lifecycle(), BossLifecycle::Dormant);
    assert!(events.is_empty());
}

#[test]
fn phase_timer_is_drift_free() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(
        &BossEvent::HudUpdate(BossPatch {
            phase_timer: Some(TimerPatch {
                remaining: Some(10.0),
                ..TimerPatch::default()
            }),
            ..BossPatch::default()
        }),
        at(1_000.0),
        &mut events,
    );

    for millis in [1_001.0, 1_001.5, 1_003.0, 1_004.2] {
        let _ = boss.snapshot(at(millis));
    }

    let remaining = boss
        .snapshot(at(1_005.0))
        .phase_timer
        .remaining
        .expect("phase timer is running");
    assert!((remaining - 9.995).abs() < 1e-9, "remaining drifted: {remaining}");
}

#[test]
fn health_alone_reactivates_dormant_boss() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(
        &BossEvent::HudUpdate(BossPatch {
            max_health: Some(100),
            ..BossPatch::default()
        }),
        at(0.0),
        &mut events,
    );
    assert_eq!(boss.lifecycle(), BossLifecycle::Dormant);

    boss.apply(
        &BossEvent::HudUpdate(BossPatch {
            health: Some(50),
            ..BossPatch::default()
        }),
        at(16.0),
        &mut events,
    );

    let snapshot = boss.snapshot(at(16.0));
    assert!(snapshot.active());
    assert!(!snapshot.upcoming());
    assert_eq!(snapshot.health, 50);
    assert_eq!(snapshot.max_health, 100);
}

#[test]
fn hud_updates_during_cooldown_refresh_without_cancelling_reset() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(&spawned(), at(0.0), &mut events);
    boss.apply(
        &BossEvent::Defeated(BossPatch::default()),
        at(1_000.0),
        &mut events,
    );

    boss.apply(
        &BossEvent::HudUpdate(BossPatch {
            name: Some("Hive Warden (slain)".to_owned()),
            health: Some(400),
            ..BossPatch::default()
        }),
        at(2_000.0),
        &mut events,
    );

    let snapshot = boss.snapshot(at(2_000.0));
    assert!(snapshot.defeated(), "health never revives a defeated boss");
    assert_eq!(snapshot.name.as_deref(), Some("Hive Warden (slain)"));
    assert_eq!(boss.pending_reset(), Some(at(4_000.0)));

    boss.tick(at(4_000.0), &mut events);
    assert_eq!(boss.lifecycle(), BossLifecycle::Dormant);
}

#[test]
fn new_encounter_cancels_pending_reset() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(&spawned(), at(0.0), &mut events);
    boss.apply(
        &BossEvent::Defeated(BossPatch::default()),
        at(1_000.0),
        &mut events,
    );

    boss.apply(&wave_started(true, 10), at(2_000.0), &mut events);
    assert_eq!(boss.pending_reset(), None);

    boss.tick(at(10_000.0), &mut events);
    assert_eq!(boss.lifecycle(), BossLifecycle::Upcoming);
}

#[test]
fn phase_change_clamps_and_activates() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(&wave_started(true, 5), at(0.0), &mut events);
    boss.apply(
        &BossEvent::PhaseChanged(BossPatch {
            phase_count: Some(3),
            phase_index: Some(7),
            phase_colors: Some(vec!["#a00".to_owned(), "#0a0".to_owned(), "#00a".to_owned()]),
            ..BossPatch::default()
        }),
        at(500.0),
        &mut events,
    );

    let snapshot = boss.snapshot(at(500.0));
    assert!(snapshot.active());
    assert_eq!(snapshot.phase_index, 2);
    assert_eq!(snapshot.current_color(), Some("#00a"));
}

#[test]
fn invulnerability_window_counts_down() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(
        &BossEvent::InvulnerabilityChanged(BossPatch {
            invulnerable: Some(true),
            invulnerability_seconds: Some(2.0),
            ..BossPatch::default()
        }),
        at(1_000.0),
        &mut events,
    );

    let snapshot = boss.snapshot(at(1_500.0));
    assert!(snapshot.active());
    assert!(snapshot.invulnerable);
    assert_eq!(snapshot.invulnerability_remaining, Some(1.5));

    boss.apply(
        &BossEvent::Defeated(BossPatch::default()),
        at(2_000.0),
        &mut events,
    );
    let snapshot = boss.snapshot(at(2_000.0));
    assert!(!snapshot.invulnerable);
    assert_eq!(snapshot.invulnerability_remaining, None);
}

#[test]
fn unknown_event_names_only_refresh_fields() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(&wave_started(true, 5), at(0.0), &mut events);
    events.clear();

    let payload = BossPayload {
        name: Some("Hive Warden".to_owned()),
        timers: TimersPayload {
            phase: None,
            enrage: Some(TimerPayload {
                deadline: Some(61_000.0),
                remaining: Some(5.0),
                total: Some(60.0),
                label: Some("Frenzy".to_owned()),
            }),
        },
        ..BossPayload::default()
    };
    boss.apply(
        &BossEvent::from_named("boss-telemetry", &payload),
        at(1_000.0),
        &mut events,
    );

    let snapshot = boss.snapshot(at(1_000.0));
    assert!(snapshot.upcoming(), "unknown events never transition");
    assert!(events.is_empty());
    assert_eq!(snapshot.last_event, Some(BossEventKind::HudUpdate));
    assert_eq!(snapshot.enrage_timer.label, "Frenzy");
    assert_eq!(snapshot.enrage_timer.remaining, Some(60.0));
}

#[test]
fn boss_wave_ending_before_spawn_abandons_encounter() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(&wave_started(true, 5), at(0.0), &mut events);

    boss.on_wave_completed(WaveNumber::new(4), true, at(10.0), &mut events);
    assert_eq!(boss.lifecycle(), BossLifecycle::Upcoming, "other waves are ignored");

    boss.on_wave_completed(WaveNumber::new(5), false, at(10.0), &mut events);
    assert_eq!(boss.lifecycle(), BossLifecycle::Upcoming);

    boss.on_wave_completed(WaveNumber::new(5), true, at(20.0), &mut events);
    assert_eq!(boss.lifecycle(), BossLifecycle::Dormant);
}

#[test]
fn live_boss_survives_wave_completion() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(&wave_started(true, 5), at(0.0), &mut events);
    boss.apply(&spawned(), at(10.0), &mut events);

    boss.on_wave_completed(WaveNumber::new(5), true, at(20.0), &mut events);
    assert_eq!(boss.lifecycle(), BossLifecycle::Active);
}

#[test]
fn hard_reset_drops_scheduled_cooldown() {
    let mut boss = machine();
    let mut events = Vec::new();
    boss.apply(&spawned(), at(0.0), &mut events);
    boss.apply(
        &BossEvent::Defeated(BossPatch::default()),
        at(1_000.0),
        &mut events,
    );
    events.clear();

    boss.reset(at(1_500.0), &mut events);
    assert_eq!(boss.pending_reset(), None);
    assert_eq!(lifecycles(&events), vec![BossLifecycle::Dormant]);

    events.clear();
    boss.tick(at(10_000.0), &mut events);
    assert!(events.is_empty(), "cancelled cooldown must never fire");
}
