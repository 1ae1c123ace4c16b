//! Line-oriented rendering of session events.

use std::rc::Rc;

use arena_waves_core::{BossSnapshot, Clock, Event, EventSink, ManualClock};
use arena_waves_session::{query, Session};

use crate::scenario::Summary;

/// Event sink that prints one line per event and keeps running tallies.
#[derive(Debug)]
pub(crate) struct Printer {
    clock: Rc<ManualClock>,
    events: usize,
    completions: usize,
    bosses_defeated: usize,
}

impl Printer {
    /// Creates a printer stamping lines with the provided clock.
    pub(crate) fn new(clock: Rc<ManualClock>) -> Self {
        Self {
            clock,
            events: 0,
            completions: 0,
            bosses_defeated: 0,
        }
    }

    /// Prints the end-of-run summary.
    pub(crate) fn print_summary(&self, summary: &Summary, session: &Session<Rc<ManualClock>>) {
        let wave = query::wave_snapshot(session);
        println!("---");
        println!(
            "waves played: {}  enemies sampled: {}  boss fights: {}",
            summary.waves_played, summary.enemies, summary.boss_fights
        );
        println!(
            "events: {}  completions admitted: {}  duplicate reports sent: {}  bosses defeated: {}",
            self.events, self.completions, summary.duplicate_reports, self.bosses_defeated
        );
        println!(
            "final wave: {} ({:?})  accounting: {:?}  killed {}/{}",
            wave.wave.get(),
            wave.phase,
            wave.accounting_mode,
            wave.killed_count(),
            wave.total_targets()
        );
    }
}

impl EventSink for Printer {
    fn emit(&mut self, event: Event) {
        self.events += 1;
        let seconds = self.clock.now().as_millis() / 1_000.0;
        match &event {
            Event::WaveCompleted { .. } => self.completions += 1,
            Event::BossLifecycleChanged { snapshot } if snapshot.defeated() => {
                self.bosses_defeated += 1;
            }
            _ => {}
        }
        println!("[{seconds:>8.2}s] {}", describe(&event));
    }
}

/// Renders a single event as a human-readable line.
pub(crate) fn describe(event: &Event) -> String {
    match event {
        Event::WaveStarted { wave, boss_wave } => {
            let suffix = if *boss_wave { " (boss wave)" } else { "" };
            format!("wave {} started{suffix}", wave.get())
        }
        Event::WaveCompleted { wave, source } => match wave {
            Some(wave) => format!("wave {} completed via {source}", wave.get()),
            None => format!("unnumbered wave completed via {source}"),
        },
        Event::BossLifecycleChanged { snapshot } => describe_boss(snapshot),
    }
}

fn describe_boss(snapshot: &BossSnapshot) -> String {
    let name = snapshot.name.as_deref().unwrap_or("boss");
    let mut line = format!("{name} is now {:?}", snapshot.lifecycle);
    if snapshot.active() {
        line.push_str(&format!(
            " at {}/{} hp, phase {}/{}",
            snapshot.health,
            snapshot.max_health,
            snapshot.phase_index + 1,
            snapshot.phase_count.max(1)
        ));
    }
    if let Some(wave) = snapshot.wave {
        line.push_str(&format!(" [wave {}]", wave.get()));
    }
    line
}

#[cfg(test)]
mod tests {
    use arena_waves_core::WaveNumber;

    use super::*;

    #[test]
    fn wave_lines_mention_boss_waves() {
        let line = describe(&Event::WaveStarted {
            wave: WaveNumber::new(5).expect("non-zero"),
            boss_wave: true,
        });
        assert_eq!(line, "wave 5 started (boss wave)");
    }

    #[test]
    fn completion_lines_name_the_source() {
        let line = describe(&Event::WaveCompleted {
            wave: None,
            source: "wave-completed".to_owned(),
        });
        assert_eq!(line, "unnumbered wave completed via wave-completed");
    }
}
