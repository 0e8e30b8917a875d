use std::time::Duration;

use log::info;

use crate::timers::{RepeatingTimer, TimerState};

/// Signals when a new enemy should be admitted.
///
/// The interval is captured when the scheduler is armed. Changing the round's
/// spawn interval afterwards only takes effect on the next `start`.
#[derive(Clone, Debug, Default)]
pub struct SpawnScheduler {
    timer: RepeatingTimer,
}

impl SpawnScheduler {
    pub fn new() -> Self {
        SpawnScheduler {
            timer: RepeatingTimer::new(),
        }
    }

    /// Arms the scheduler; the first spawn signal is delivered right away.
    pub fn start(&mut self, interval_secs: f64) {
        let interval = Duration::from_secs_f64(interval_secs.max(0.0));
        self.timer.start(interval, true);
        info!("Spawn timer armed every {:?}", self.timer.interval());
    }

    pub fn pause(&mut self) {
        self.timer.pause();
    }

    pub fn resume(&mut self) {
        self.timer.resume();
    }

    pub fn stop(&mut self) {
        self.timer.stop();
    }

    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn interval(&self) -> Duration {
        self.timer.interval()
    }

    /// True when a spawn is due in this slice of time.
    pub fn poll(&mut self, dt: Duration) -> bool {
        self.timer.advance(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_spawn_is_immediate() {
        let mut spawner = SpawnScheduler::new();
        spawner.start(1.0);
        assert!(spawner.poll(Duration::ZERO));
        assert!(!spawner.poll(Duration::from_millis(999)));
        assert!(spawner.poll(Duration::from_millis(1)));
    }

    #[test]
    fn test_interval_is_fixed_until_rearmed() {
        let mut spawner = SpawnScheduler::new();
        spawner.start(1.0);
        assert_eq!(spawner.interval(), Duration::from_secs(1));
        spawner.start(1.5);
        assert_eq!(spawner.interval(), Duration::from_millis(1500));
    }

    #[test]
    fn test_paused_and_stopped_scheduler_is_silent() {
        let mut spawner = SpawnScheduler::new();
        spawner.start(1.0);
        spawner.pause();
        assert!(!spawner.poll(Duration::from_secs(5)));
        spawner.resume();
        assert!(spawner.poll(Duration::ZERO));
        spawner.stop();
        spawner.stop();
        assert!(!spawner.poll(Duration::from_secs(5)));
        assert_eq!(spawner.state(), TimerState::Stopped);
    }
}
