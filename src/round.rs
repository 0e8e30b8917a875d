use log::{debug, info};
use rand::Rng;

use crate::constants::*;
use crate::entities::{Background, Enemy, Motion, Player};
use crate::types::Size;

#[derive(Clone, Debug)]
pub struct RoundConfig {
    pub base_speed: f64,
    pub speed_step: f64,
    pub base_spawn_interval: f64,
    pub spawn_interval_step: f64,
    pub tier_score_step: u32,
    pub max_live_enemies: usize,
    pub hitbox_inset: f64,
    pub enemy_size: Size,
    pub player_size: Size,
    pub lane_dash_period: f64,
}

impl Default for RoundConfig {
    fn default() -> Self {
        RoundConfig {
            base_speed: BASE_SPEED,
            speed_step: SPEED_STEP,
            base_spawn_interval: BASE_SPAWN_INTERVAL,
            spawn_interval_step: SPAWN_INTERVAL_STEP,
            tier_score_step: TIER_SCORE_STEP,
            max_live_enemies: MAX_LIVE_ENEMIES,
            hitbox_inset: HITBOX_INSET,
            enemy_size: Size::new(CAR_WIDTH, CAR_HEIGHT),
            player_size: Size::new(CAR_WIDTH, CAR_HEIGHT),
            lane_dash_period: LANE_DASH_PERIOD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    /// Start prompt is up; traffic may scroll past but nothing scores.
    AwaitingStart,
    Active,
    Paused,
    RoundOver,
}

/// Signals for the presentation layer, queued in the order they happen.
#[derive(Clone, Debug, PartialEq)]
pub enum RoundEvent {
    Started,
    Paused { score: u32 },
    Resumed,
    Over { score: u32 },
    Reset,
    ScoreChanged(u32),
    TierUp { speed: f64, spawn_interval: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Collision,
}

pub struct RoundController {
    config: RoundConfig,
    container: Size,
    phase: RoundPhase,
    speed: f64,
    score: u32,
    spawn_interval: f64,
    is_active: bool,
    background: Background,
    player: Player,
    enemies: Vec<Enemy>,
    next_enemy_id: u64,
    events: Vec<RoundEvent>,
}

impl RoundController {
    pub fn new(config: RoundConfig, container: Size) -> Self {
        RoundController {
            speed: config.base_speed,
            score: 0,
            spawn_interval: config.base_spawn_interval,
            is_active: false,
            background: Background::new(config.lane_dash_period),
            player: Player::new(config.player_size),
            enemies: Vec::new(),
            next_enemy_id: 0,
            events: Vec::new(),
            phase: RoundPhase::AwaitingStart,
            container,
            config,
        }
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn container(&self) -> Size {
        self.container
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn spawn_interval(&self) -> f64 {
        self.spawn_interval
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        self.events.drain(..).collect()
    }

    fn reset_tuning(&mut self) {
        self.speed = self.config.base_speed;
        self.score = 0;
        self.spawn_interval = self.config.base_spawn_interval;
    }

    fn reset(&mut self) {
        self.reset_tuning();
        self.events.push(RoundEvent::ScoreChanged(0));
    }

    fn clear_enemies(&mut self) {
        for enemy in &mut self.enemies {
            enemy.detach();
        }
        self.enemies.clear();
    }

    fn begin(&mut self) {
        self.reset();
        self.player.place(self.container);
        self.is_active = true;
        self.phase = RoundPhase::Active;
        self.events.push(RoundEvent::Started);
    }

    /// Begins a round from the start prompt. Traffic already on the road stays.
    pub fn start(&mut self) -> bool {
        if self.phase != RoundPhase::AwaitingStart {
            return false;
        }
        self.begin();
        info!("Round started.");
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.phase != RoundPhase::Active {
            return false;
        }
        self.phase = RoundPhase::Paused;
        self.events.push(RoundEvent::Paused { score: self.score });
        info!("Round paused at score {}", self.score);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != RoundPhase::Paused {
            return false;
        }
        self.phase = RoundPhase::Active;
        self.events.push(RoundEvent::Resumed);
        info!("Round resumed.");
        true
    }

    /// Starts over after a crash with a clean road and base tuning.
    pub fn restart(&mut self) -> bool {
        if self.phase != RoundPhase::RoundOver {
            return false;
        }
        self.clear_enemies();
        self.begin();
        info!("Round restarted.");
        true
    }

    /// Leaves a paused or finished round for the start prompt.
    pub fn quit(&mut self) -> bool {
        if !matches!(self.phase, RoundPhase::Paused | RoundPhase::RoundOver) {
            return false;
        }
        self.teardown();
        self.events.push(RoundEvent::Reset);
        info!("Round quit. Back to the start prompt.");
        true
    }

    /// Clears the road and drops back to base tuning for the start prompt.
    pub fn teardown(&mut self) {
        self.clear_enemies();
        self.player.remove();
        self.reset_tuning();
        self.is_active = false;
        self.phase = RoundPhase::AwaitingStart;
    }

    /// Container bounds only change between rounds.
    pub fn resize(&mut self, container: Size) -> bool {
        if !matches!(self.phase, RoundPhase::AwaitingStart | RoundPhase::RoundOver) {
            debug!("Ignoring resize to {:?} mid-round.", container);
            return false;
        }
        self.container = container;
        for enemy in &mut self.enemies {
            enemy.set_container(container);
        }
        true
    }

    pub fn steer_to(&mut self, center_x: f64) {
        if self.phase == RoundPhase::Active {
            self.player.steer_to(center_x);
        }
    }

    pub fn steer_by(&mut self, dx: f64) {
        if self.phase == RoundPhase::Active {
            self.player.steer_by(dx);
        }
    }

    /// Places a new enemy above the road unless the cap is reached.
    pub fn admit_enemy(&mut self, rng: &mut impl Rng) -> bool {
        if !matches!(self.phase, RoundPhase::AwaitingStart | RoundPhase::Active) {
            return false;
        }
        if self.enemies.len() >= self.config.max_live_enemies {
            debug!("Spawn skipped: {} enemies already live.", self.enemies.len());
            return false;
        }

        self.next_enemy_id += 1;
        let mut enemy = Enemy::new(self.next_enemy_id, self.config.enemy_size);
        enemy.place(self.container, rng);
        info!("Enemy {} spawned at x: {}", enemy.id, enemy.frame().min_x());
        self.enemies.push(enemy);
        true
    }

    fn record_exit(&mut self) {
        if !self.is_active {
            return;
        }

        self.score += 1;
        self.events.push(RoundEvent::ScoreChanged(self.score));

        if self.score % self.config.tier_score_step == 0 {
            self.speed += self.config.speed_step;
            self.spawn_interval += self.config.spawn_interval_step;
            self.events.push(RoundEvent::TierUp {
                speed: self.speed,
                spawn_interval: self.spawn_interval,
            });
            info!(
                "Tier up at score {}. Speed: {}, spawn interval: {}",
                self.score, self.speed, self.spawn_interval
            );
        }
    }

    fn end_round(&mut self) {
        self.is_active = false;
        self.phase = RoundPhase::RoundOver;
        self.events.push(RoundEvent::Over { score: self.score });
        info!("Collision. Round over with score {}", self.score);
    }

    /// Advances one frame. Paused and finished rounds are frozen.
    pub fn update(&mut self) -> TickOutcome {
        if !matches!(self.phase, RoundPhase::AwaitingStart | RoundPhase::Active) {
            return TickOutcome::Continue;
        }

        let speed = self.speed;
        self.background.move_by(speed);
        self.player.move_by(speed);

        let check_collisions = self.is_active && self.player.is_placed();
        let player_hitbox = self.player.entity.hitbox(self.config.hitbox_inset);

        let mut index = 0;
        while index < self.enemies.len() {
            match self.enemies[index].move_by(speed) {
                Motion::Moved => {}
                Motion::Exited => {
                    self.enemies.remove(index);
                    self.record_exit();
                    continue;
                }
                Motion::Detached => {
                    self.enemies.remove(index);
                    continue;
                }
            }

            if check_collisions
                && self.enemies[index]
                    .entity
                    .hitbox(self.config.hitbox_inset)
                    .intersects(&player_hitbox)
            {
                self.end_round();
                return TickOutcome::Collision;
            }
            index += 1;
        }

        TickOutcome::Continue
    }

    #[cfg(test)]
    pub(crate) fn enemies_mut(&mut self) -> &mut Vec<Enemy> {
        &mut self.enemies
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }
}
