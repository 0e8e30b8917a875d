//! Cancellable repeating timers driven by explicit elapsed time.
//!
//! Nothing here sleeps or spawns threads. The owner feeds wall-clock (or
//! scripted) durations through `advance`, which keeps delivery cooperative:
//! a callback only runs when its owner asks and never overlaps another one.

use std::time::Duration;

use log::debug;

use crate::constants::FRAME_PERIOD;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
}

#[derive(Clone, Debug)]
pub struct RepeatingTimer {
    interval: Duration,
    elapsed: Duration,
    state: TimerState,
    fire_pending: bool,
}

impl RepeatingTimer {
    pub fn new() -> Self {
        RepeatingTimer {
            interval: FRAME_PERIOD,
            elapsed: Duration::ZERO,
            state: TimerState::Stopped,
            fire_pending: false,
        }
    }

    /// Arms the timer from zero. With `fire_now` the next `advance` delivers
    /// one extra fire up front without shifting the schedule.
    pub fn start(&mut self, interval: Duration, fire_now: bool) {
        self.interval = interval.max(MIN_INTERVAL);
        self.elapsed = Duration::ZERO;
        self.state = TimerState::Running;
        self.fire_pending = fire_now;
    }

    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
        }
    }

    /// Cancels the timer, dropping any fire that was due but not yet delivered.
    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
        self.elapsed = Duration::ZERO;
        self.fire_pending = false;
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true when the timer is due. Missed periods coalesce into a
    /// single fire rather than queueing up.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if !self.is_running() {
            return false;
        }

        let mut due = std::mem::take(&mut self.fire_pending);
        self.elapsed += dt;
        if self.elapsed >= self.interval {
            due = true;
            let remainder = self.elapsed.as_nanos() % self.interval.as_nanos();
            self.elapsed = Duration::from_nanos(remainder as u64);
        }
        due
    }
}

impl Default for RepeatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

// --- GameLoop: the per-frame tick source ---
#[derive(Clone, Debug)]
pub struct GameLoop {
    timer: RepeatingTimer,
    frame_period: Duration,
    pub frames_delivered: u64,
}

impl GameLoop {
    pub fn new(frame_period: Duration) -> Self {
        GameLoop {
            timer: RepeatingTimer::new(),
            frame_period,
            frames_delivered: 0,
        }
    }

    pub fn start(&mut self) {
        self.timer.start(self.frame_period, false);
        debug!("Game loop started at {:?} per frame.", self.frame_period);
    }

    pub fn pause(&mut self) {
        self.timer.pause();
    }

    /// Resumes after `pause`. Does nothing once the loop has been invalidated.
    pub fn restart(&mut self) {
        self.timer.resume();
    }

    pub fn invalidate(&mut self) {
        if self.timer.state() != TimerState::Stopped {
            debug!("Game loop invalidated after {} frames.", self.frames_delivered);
        }
        self.timer.stop();
    }

    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    /// True when a frame tick should be delivered for this slice of time.
    pub fn poll(&mut self, dt: Duration) -> bool {
        let due = self.timer.advance(dt);
        if due {
            self.frames_delivered += 1;
        }
        due
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new(FRAME_PERIOD)
    }
}
