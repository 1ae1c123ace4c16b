use std::num::NonZeroU32;

use arena_waves_core::{
    AccountingMode, Event, ManagerState, RawCounts, WaveNumber, WavePhase, CANONICAL_WAVE_COMPLETE,
};
use arena_waves_system_wave_lifecycle::{Config, WaveLifecycle};

fn wave(value: u32) -> WaveNumber {
    WaveNumber::new(value).expect("wave numbers start at one")
}

fn config(boss_interval: u32, mode: AccountingMode) -> Config {
    let interval = NonZeroU32::new(boss_interval).expect("interval must be non-zero");
    Config::new(interval, mode, 30.0, 5.0)
}

fn dual_state() -> ManagerState {
    ManagerState {
        spawned: RawCounts::new(5.0, 6.0),
        killed: RawCounts::new(4.0, 5.0),
        totals: RawCounts::new(7.0, 9.0),
        ..ManagerState::default()
    }
}

fn completions(events: &[Event]) -> Vec<Option<WaveNumber>> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::WaveCompleted { wave, .. } => Some(*wave),
            _ => None,
        })
        .collect()
}

#[test]
fn legacy_accounting_exposes_primary_counters() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Legacy));
    let mut events = Vec::new();
    lifecycle.apply_manager_state(&dual_state(), &mut events);

    let snapshot = lifecycle.snapshot();
    assert_eq!(snapshot.total_targets(), 7);
    assert_eq!(snapshot.spawned_count(), 5);
    assert_eq!(snapshot.killed_count(), 4);
}

#[test]
fn unified_accounting_exposes_all_counters() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Unified));
    let mut events = Vec::new();
    lifecycle.apply_manager_state(&dual_state(), &mut events);

    let snapshot = lifecycle.snapshot();
    assert_eq!(snapshot.total_targets(), 9);
    assert_eq!(snapshot.spawned_count(), 6);
    assert_eq!(snapshot.killed_count(), 5);
}

#[test]
fn flipping_accounting_mode_preserves_raw_counters() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Legacy));
    let mut events = Vec::new();
    lifecycle.apply_manager_state(&dual_state(), &mut events);

    lifecycle.set_accounting_mode(AccountingMode::Unified);
    assert_eq!(lifecycle.snapshot().total_targets(), 9);

    lifecycle.set_accounting_mode(AccountingMode::Legacy);
    let snapshot = lifecycle.snapshot();
    assert_eq!(snapshot.total_targets(), 7);
    assert_eq!(snapshot.raw.targets.all, 9, "raw totals must survive flips");
}

#[test]
fn malformed_counters_keep_previous_values() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Unified));
    let mut events = Vec::new();
    lifecycle.apply_manager_state(&dual_state(), &mut events);

    lifecycle.apply_manager_state(
        &ManagerState {
            killed: RawCounts {
                primary: Some(f64::NAN),
                all: Some(-3.0),
            },
            active_time_remaining: Some(f64::INFINITY),
            ..ManagerState::default()
        },
        &mut events,
    );

    let snapshot = lifecycle.snapshot();
    assert_eq!(snapshot.raw.killed.primary, 4);
    assert_eq!(snapshot.raw.killed.all, 5);
    assert!((snapshot.active_time_remaining - 30.0).abs() < f64::EPSILON);
}

#[test]
fn completion_fires_once_on_active_to_break_edge() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Unified));
    let mut events = Vec::new();

    lifecycle.advance(29.0, &mut events);
    assert!(events.is_empty(), "wave must still be active");

    lifecycle.advance(1.5, &mut events);
    assert_eq!(completions(&events), vec![Some(wave(1))]);
    assert_eq!(lifecycle.snapshot().phase, WavePhase::Break);

    lifecycle.advance(1.0, &mut events);
    lifecycle.advance(1.0, &mut events);
    assert_eq!(completions(&events).len(), 1, "break ticks must stay silent");

    match &events[0] {
        Event::WaveCompleted { source, .. } => assert_eq!(source, CANONICAL_WAVE_COMPLETE),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn clearing_every_target_ends_the_wave() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Legacy));
    let mut events = Vec::new();
    lifecycle.apply_manager_state(
        &ManagerState {
            spawned: RawCounts::new(3.0, 4.0),
            killed: RawCounts::new(3.0, 4.0),
            totals: RawCounts::new(3.0, 4.0),
            ..ManagerState::default()
        },
        &mut events,
    );
    assert!(events.is_empty(), "clearing is detected on advance");

    lifecycle.advance(0.016, &mut events);
    assert_eq!(completions(&events), vec![Some(wave(1))]);
}

#[test]
fn upstream_break_flag_completes_once() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Unified));
    let mut events = Vec::new();
    let state = ManagerState {
        in_break: Some(true),
        ..ManagerState::default()
    };

    lifecycle.apply_manager_state(&state, &mut events);
    lifecycle.apply_manager_state(&state, &mut events);
    lifecycle.advance(0.5, &mut events);

    assert_eq!(completions(&events), vec![Some(wave(1))]);
}

#[test]
fn break_expiry_starts_next_wave_with_fresh_counters() {
    let mut lifecycle = WaveLifecycle::new(config(2, AccountingMode::Unified));
    let mut events = Vec::new();
    lifecycle.apply_manager_state(&dual_state(), &mut events);

    lifecycle.advance(30.0, &mut events);
    lifecycle.advance(5.0, &mut events);

    let snapshot = lifecycle.snapshot();
    assert_eq!(snapshot.wave, wave(2));
    assert_eq!(snapshot.phase, WavePhase::Active);
    assert_eq!(snapshot.total_targets(), 0);
    assert!(snapshot.boss_wave, "wave 2 lands on the boss interval");
    assert!((snapshot.active_time_remaining - 30.0).abs() < f64::EPSILON);
    assert_eq!(
        events.last(),
        Some(&Event::WaveStarted {
            wave: wave(2),
            boss_wave: true,
        })
    );
}

#[test]
fn boss_predicate_follows_interval_and_upstream_flag() {
    let mut lifecycle = WaveLifecycle::new(config(3, AccountingMode::Unified));
    let mut events = Vec::new();

    assert!(!lifecycle.is_boss_wave(wave(2)));
    assert!(lifecycle.is_boss_wave(wave(6)));

    lifecycle.apply_manager_state(
        &ManagerState {
            wave: Some(4.0),
            boss_wave: Some(true),
            ..ManagerState::default()
        },
        &mut events,
    );

    assert!(lifecycle.snapshot().boss_wave);
    assert!(lifecycle.is_boss_wave(wave(4)), "upstream flag is cached");
}

#[test]
fn wave_jump_completes_the_skipped_wave() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Unified));
    let mut events = Vec::new();

    lifecycle.apply_manager_state(
        &ManagerState {
            wave: Some(2.0),
            ..ManagerState::default()
        },
        &mut events,
    );

    assert_eq!(
        events,
        vec![
            Event::WaveCompleted {
                wave: Some(wave(1)),
                source: CANONICAL_WAVE_COMPLETE.to_owned(),
            },
            Event::WaveStarted {
                wave: wave(2),
                boss_wave: false,
            },
        ]
    );
}

#[test]
fn stale_or_malformed_wave_numbers_are_ignored() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Unified));
    let mut events = Vec::new();
    lifecycle.apply_manager_state(
        &ManagerState {
            wave: Some(3.0),
            ..ManagerState::default()
        },
        &mut events,
    );
    events.clear();

    for value in [1.0, 0.0, f64::NAN, -4.0] {
        lifecycle.apply_manager_state(
            &ManagerState {
                wave: Some(value),
                ..ManagerState::default()
            },
            &mut events,
        );
    }

    assert!(events.is_empty());
    assert_eq!(lifecycle.snapshot().wave, wave(3));
}

#[test]
fn reset_returns_to_first_wave_and_keeps_mode() {
    let mut lifecycle = WaveLifecycle::new(config(1, AccountingMode::Legacy));
    let mut events = Vec::new();
    lifecycle.set_accounting_mode(AccountingMode::Unified);
    lifecycle.apply_manager_state(
        &ManagerState {
            wave: Some(7.0),
            ..ManagerState::default()
        },
        &mut events,
    );
    events.clear();

    lifecycle.reset(&mut events);

    let snapshot = lifecycle.snapshot();
    assert_eq!(snapshot.wave, WaveNumber::FIRST);
    assert_eq!(snapshot.accounting_mode, AccountingMode::Unified);
    assert_eq!(
        events,
        vec![Event::WaveStarted {
            wave: WaveNumber::FIRST,
            boss_wave: true,
        }]
    );
}

#[test]
fn engine_pushing_zero_active_time_ends_the_wave() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Unified));
    let mut events = Vec::new();

    lifecycle.apply_manager_state(
        &ManagerState {
            active_time_remaining: Some(0.0),
            ..ManagerState::default()
        },
        &mut events,
    );
    lifecycle.advance(0.25, &mut events);

    assert_eq!(lifecycle.snapshot().phase, WavePhase::Break);
    assert_eq!(completions(&events), vec![Some(wave(1))]);
}

#[test]
fn untimed_wave_starts_its_timer_when_the_engine_reports_one() {
    let interval = NonZeroU32::new(5).expect("interval must be non-zero");
    let untimed = Config::new(interval, AccountingMode::Unified, 0.0, 5.0);
    let mut lifecycle = WaveLifecycle::new(untimed);
    let mut events = Vec::new();

    lifecycle.advance(100.0, &mut events);
    assert_eq!(lifecycle.snapshot().phase, WavePhase::Active);

    lifecycle.apply_manager_state(
        &ManagerState {
            active_time_remaining: Some(2.0),
            ..ManagerState::default()
        },
        &mut events,
    );
    lifecycle.advance(1.0, &mut events);
    assert_eq!(lifecycle.snapshot().phase, WavePhase::Active);
    lifecycle.advance(1.0, &mut events);

    assert_eq!(lifecycle.snapshot().phase, WavePhase::Break);
    assert_eq!(completions(&events), vec![Some(wave(1))]);
}

#[test]
fn upstream_boss_flag_outlives_the_wave() {
    let mut lifecycle = WaveLifecycle::new(config(5, AccountingMode::Unified));
    let mut events = Vec::new();

    for (number, boss_wave) in [(3.0, Some(true)), (4.0, None)] {
        lifecycle.apply_manager_state(
            &ManagerState {
                wave: Some(number),
                boss_wave,
                ..ManagerState::default()
            },
            &mut events,
        );
    }

    assert_eq!(lifecycle.snapshot().wave, wave(4));
    assert!(lifecycle.is_boss_wave(wave(3)));
    assert!(!lifecycle.is_boss_wave(wave(2)));

    lifecycle.reset(&mut events);
    assert!(!lifecycle.is_boss_wave(wave(3)));
}
