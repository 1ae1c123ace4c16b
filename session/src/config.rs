//! Run-wide settings deserialized from the adapter's configuration file.

use std::num::NonZeroU32;

use arena_waves_core::{AccountingMode, WeightPresets, CANONICAL_WAVE_COMPLETE};
use serde::Deserialize;

const DEFAULT_BOSS_INTERVAL: u32 = 5;

/// Aggregated configuration for every component owned by a session.
///
/// Every table and field is optional; omitted values fall back to defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Wave pacing and accounting.
    pub waves: WaveSettings,
    /// Boss encounter tuning.
    pub boss: BossSettings,
    /// Completion deduplication.
    pub completion: CompletionSettings,
    /// Spawn weights per accounting mode.
    pub presets: WeightPresets,
}

/// Wave pacing and accounting settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaveSettings {
    /// Every wave whose number is a multiple of this hosts a boss.
    pub boss_interval: NonZeroU32,
    /// Convention used for exposed totals at startup.
    pub accounting_mode: AccountingMode,
    /// Seconds an active wave lasts; zero leaves waves untimed.
    pub active_seconds: f64,
    /// Seconds of break between waves.
    pub break_seconds: f64,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            boss_interval: NonZeroU32::new(DEFAULT_BOSS_INTERVAL).unwrap_or(NonZeroU32::MIN),
            accounting_mode: AccountingMode::default(),
            active_seconds: 60.0,
            break_seconds: 10.0,
        }
    }
}

/// Boss encounter settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BossSettings {
    /// Seconds a defeated boss stays on screen before the machine resets.
    pub cooldown_seconds: f64,
    /// Label shown for the phase timer when the producer supplies none.
    pub phase_label: String,
    /// Label shown for the enrage timer when the producer supplies none.
    pub enrage_label: String,
}

impl Default for BossSettings {
    fn default() -> Self {
        Self {
            cooldown_seconds: 4.0,
            phase_label: "Next phase".to_owned(),
            enrage_label: "Enrage".to_owned(),
        }
    }
}

/// Completion deduplication settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionSettings {
    /// Source name preferred over every alias.
    pub canonical: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            canonical: CANONICAL_WAVE_COMPLETE.to_owned(),
        }
    }
}

impl SessionConfig {
    /// Configuration for the wave coordinator.
    #[must_use]
    pub fn wave_config(&self) -> arena_waves_system_wave_lifecycle::Config {
        arena_waves_system_wave_lifecycle::Config::new(
            self.waves.boss_interval,
            self.waves.accounting_mode,
            self.waves.active_seconds,
            self.waves.break_seconds,
        )
        .with_completion_source(self.completion.canonical.clone())
    }

    /// Configuration for the boss state machine.
    #[must_use]
    pub fn boss_config(&self) -> arena_waves_system_boss_encounter::Config {
        arena_waves_system_boss_encounter::Config::new(
            self.boss.cooldown_seconds,
            self.boss.phase_label.clone(),
            self.boss.enrage_label.clone(),
        )
    }
}
