//! Couples the round with its two periodic drivers.
//!
//! The frame loop and the spawn timer are independent handles owned here, and
//! every exit path (crash, restart, quit, shutdown, drop) releases them so no
//! stray tick can touch a round that is gone.

use std::time::Duration;

use log::info;
use rand::Rng;

use crate::constants::FRAME_PERIOD;
use crate::round::{RoundConfig, RoundController, RoundEvent, RoundPhase, TickOutcome};
use crate::spawner::SpawnScheduler;
use crate::timers::{GameLoop, TimerState};
use crate::types::Size;

pub struct Session {
    round: RoundController,
    game_loop: GameLoop,
    spawner: SpawnScheduler,
}

impl Session {
    pub fn new(config: RoundConfig, container: Size) -> Self {
        Session {
            round: RoundController::new(config, container),
            game_loop: GameLoop::new(FRAME_PERIOD),
            spawner: SpawnScheduler::new(),
        }
    }

    pub fn round(&self) -> &RoundController {
        &self.round
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase()
    }

    pub fn loop_state(&self) -> TimerState {
        self.game_loop.state()
    }

    pub fn spawner_state(&self) -> TimerState {
        self.spawner.state()
    }

    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        self.round.drain_events()
    }

    fn arm_timers(&mut self) {
        self.game_loop.start();
        self.spawner.start(self.round.spawn_interval());
    }

    fn halt_timers(&mut self) {
        self.game_loop.invalidate();
        self.spawner.stop();
    }

    /// Puts up the start prompt with traffic running behind it.
    pub fn open(&mut self) {
        if self.round.phase() != RoundPhase::AwaitingStart {
            return;
        }
        self.arm_timers();
        info!("Start prompt open. Traffic every {:?}", self.spawner.interval());
    }

    pub fn start(&mut self) {
        if !self.round.start() {
            return;
        }
        if self.game_loop.state() == TimerState::Stopped {
            self.game_loop.start();
        }
        let interval = Duration::from_secs_f64(self.round.spawn_interval());
        if self.spawner.state() == TimerState::Stopped || self.spawner.interval() != interval {
            self.spawner.start(self.round.spawn_interval());
        }
    }

    pub fn pause(&mut self) {
        if self.round.pause() {
            self.game_loop.pause();
            self.spawner.pause();
        }
    }

    pub fn resume(&mut self) {
        if self.round.resume() {
            self.game_loop.restart();
            self.spawner.resume();
        }
    }

    pub fn restart(&mut self) {
        if self.round.restart() {
            self.arm_timers();
        }
    }

    pub fn quit(&mut self) {
        if self.round.quit() {
            self.halt_timers();
            self.open();
        }
    }

    /// Releases both timers and clears the road. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        self.halt_timers();
        self.round.teardown();
    }

    pub fn steer_to(&mut self, center_x: f64) {
        self.round.steer_to(center_x);
    }

    pub fn steer_by(&mut self, dx: f64) {
        self.round.steer_by(dx);
    }

    pub fn resize(&mut self, container: Size) -> bool {
        let resized = self.round.resize(container);
        if resized {
            info!("Road resized to {:?}", self.round.container());
        }
        resized
    }

    /// Delivers whatever frame and spawn ticks fall due in `dt`, one at a time.
    pub fn advance(&mut self, dt: Duration, rng: &mut impl Rng) {
        if self.game_loop.poll(dt) && self.round.update() == TickOutcome::Collision {
            self.halt_timers();
        }

        // Checked after the frame tick: a crash above must cancel this spawn.
        if self.spawner.poll(dt) {
            self.round.admit_enemy(rng);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::entities::Enemy;
    use crate::types::Vector2D;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session() -> Session {
        Session::new(RoundConfig::default(), Size::new(400.0, 800.0))
    }

    fn run_frames(session: &mut Session, rng: &mut StdRng, frames: usize) {
        for _ in 0..frames {
            session.advance(FRAME_PERIOD, rng);
        }
    }

    #[test]
    fn test_nothing_runs_before_open() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(1);
        run_frames(&mut session, &mut rng, 120);
        assert!(session.round().enemies().is_empty());
        assert_eq!(session.loop_state(), TimerState::Stopped);
    }

    #[test]
    fn test_open_runs_traffic_without_scoring() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(1);
        session.open();
        session.advance(Duration::ZERO, &mut rng);
        assert_eq!(session.round().enemies().len(), 1);

        run_frames(&mut session, &mut rng, 600);
        assert_eq!(session.round().score(), 0);
        assert!(session.round().enemies().len() <= MAX_LIVE_ENEMIES);
        assert_eq!(session.phase(), RoundPhase::AwaitingStart);
    }

    #[test]
    fn test_start_without_open_arms_timers() {
        let mut session = session();
        session.start();
        assert_eq!(session.phase(), RoundPhase::Active);
        assert_eq!(session.loop_state(), TimerState::Running);
        assert_eq!(session.spawner_state(), TimerState::Running);
        assert_eq!(
            session.drain_events(),
            vec![RoundEvent::ScoreChanged(0), RoundEvent::Started]
        );
    }

    #[test]
    fn test_pause_and_resume_both_timers() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(4);
        session.open();
        session.start();
        session.pause();
        assert_eq!(session.loop_state(), TimerState::Paused);
        assert_eq!(session.spawner_state(), TimerState::Paused);

        run_frames(&mut session, &mut rng, 120);
        assert!(session.round().enemies().is_empty());

        session.resume();
        assert_eq!(session.loop_state(), TimerState::Running);
        assert_eq!(session.spawner_state(), TimerState::Running);
        session.advance(Duration::ZERO, &mut rng);
        assert_eq!(session.round().enemies().len(), 1);
    }

    #[test]
    fn test_collision_halts_loop_and_spawner() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(9);
        // A one-lane road puts every enemy on the player's path.
        assert!(session.resize(Size::new(CAR_WIDTH, 800.0)));
        session.start();
        session.drain_events();

        let mut frames = 0;
        while session.phase() != RoundPhase::RoundOver && frames < 1000 {
            session.advance(FRAME_PERIOD, &mut rng);
            frames += 1;
        }
        assert_eq!(session.phase(), RoundPhase::RoundOver);
        assert_eq!(session.loop_state(), TimerState::Stopped);
        assert_eq!(session.spawner_state(), TimerState::Stopped);
        assert!(session.drain_events().contains(&RoundEvent::Over { score: 0 }));

        let live = session.round().enemies().len();
        run_frames(&mut session, &mut rng, 300);
        assert_eq!(session.round().enemies().len(), live);
    }

    #[test]
    fn test_restart_rearms_with_base_interval() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(9);
        session.resize(Size::new(CAR_WIDTH, 800.0));
        session.start();
        while session.phase() != RoundPhase::RoundOver {
            session.advance(FRAME_PERIOD, &mut rng);
        }

        session.restart();
        assert_eq!(session.phase(), RoundPhase::Active);
        assert_eq!(session.loop_state(), TimerState::Running);
        assert_eq!(session.spawner_state(), TimerState::Running);
        assert!(session.round().enemies().is_empty());
        assert_eq!(session.round().score(), 0);
        assert_eq!(session.round().speed(), BASE_SPEED);
        assert_eq!(session.round().spawn_interval(), BASE_SPAWN_INTERVAL);
    }

    #[test]
    fn test_quit_during_round_over_returns_to_prompt() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(9);
        session.resize(Size::new(CAR_WIDTH, 800.0));
        session.start();
        while session.phase() != RoundPhase::RoundOver {
            session.advance(FRAME_PERIOD, &mut rng);
        }

        session.quit();
        assert_eq!(session.phase(), RoundPhase::AwaitingStart);
        assert!(session.round().enemies().is_empty());
        assert!(!session.round().player().is_placed());
        assert_eq!(session.loop_state(), TimerState::Running);

        session.start();
        assert_eq!(session.round().score(), 0);
        assert_eq!(session.round().speed(), BASE_SPEED);
        assert_eq!(session.round().spawn_interval(), BASE_SPAWN_INTERVAL);
    }

    /// Plays an active round until its score reaches `target`.
    fn score_to(session: &mut Session, target: u32) {
        while session.round().score() < target {
            let mut enemy = Enemy::new(0, Size::new(CAR_WIDTH, CAR_HEIGHT));
            enemy.place(session.round().container(), &mut StdRng::seed_from_u64(0));
            enemy.entity.set_origin(Vector2D::new(0.0, 799.0));
            session.round.enemies_mut().push(enemy);
            assert_eq!(session.round.update(), TickOutcome::Continue);
        }
    }

    #[test]
    fn test_quit_after_tier_arms_spawner_at_base() {
        let mut session = session();
        session.open();
        session.start();
        score_to(&mut session, 25);
        assert_eq!(session.round().spawn_interval(), 1.5);

        session.pause();
        session.quit();
        assert_eq!(session.phase(), RoundPhase::AwaitingStart);
        assert_eq!(session.round().spawn_interval(), BASE_SPAWN_INTERVAL);
        assert_eq!(session.spawner.interval(), Duration::from_secs_f64(BASE_SPAWN_INTERVAL));

        session.start();
        assert_eq!(session.round().spawn_interval(), BASE_SPAWN_INTERVAL);
        assert_eq!(session.spawner.interval(), Duration::from_secs_f64(BASE_SPAWN_INTERVAL));
        assert_eq!(session.spawner_state(), TimerState::Running);
    }

    #[test]
    fn test_quit_after_tier_from_round_over_arms_spawner_at_base() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(9);
        session.start();
        score_to(&mut session, 30);
        let player_y = session.round().player().frame().min_y();
        let mut blocker = Enemy::new(0, Size::new(CAR_WIDTH, CAR_HEIGHT));
        blocker.place(session.round().container(), &mut rng);
        let player_x = session.round().player().frame().min_x();
        blocker.entity.set_origin(Vector2D::new(player_x, player_y - 7.0));
        session.round.enemies_mut().push(blocker);
        session.advance(FRAME_PERIOD, &mut rng);
        assert_eq!(session.phase(), RoundPhase::RoundOver);

        session.quit();
        session.start();
        assert_eq!(session.round().score(), 0);
        assert_eq!(session.round().speed(), BASE_SPEED);
        assert_eq!(session.round().spawn_interval(), BASE_SPAWN_INTERVAL);
        assert_eq!(session.spawner.interval(), Duration::from_secs_f64(BASE_SPAWN_INTERVAL));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut session = session();
        let mut rng = StdRng::seed_from_u64(3);
        session.open();
        session.start();
        session.advance(Duration::ZERO, &mut rng);

        session.shutdown();
        session.shutdown();
        assert_eq!(session.loop_state(), TimerState::Stopped);
        assert_eq!(session.spawner_state(), TimerState::Stopped);
        assert!(session.round().enemies().is_empty());

        run_frames(&mut session, &mut rng, 120);
        assert!(session.round().enemies().is_empty());
    }

    #[test]
    fn test_invalid_transitions_are_ignored() {
        let mut session = session();
        session.pause();
        session.resume();
        session.restart();
        session.quit();
        assert_eq!(session.phase(), RoundPhase::AwaitingStart);
        assert_eq!(session.loop_state(), TimerState::Stopped);
        assert!(session.drain_events().is_empty());
    }
}
