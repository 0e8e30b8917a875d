use std::io::{self, Write};
use std::time::{Duration, Instant};
use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, MouseEventKind},
};
use log::{debug, error, info};

use crate::constants::*;
use crate::rendering::{GameGrid, OutputTarget, cells_to_points, column_center_in_points, style_for};
use crate::round::{RoundConfig, RoundEvent, RoundPhase};
use crate::session::Session;
use crate::terminal_io::SimulatedInput;

pub struct Game {
    pub terminal_width: u16,
    pub terminal_height: u16,
    pub stdout_target: OutputTarget,
    simulated_input: Option<SimulatedInput>,
    debug_mode_active: bool,
    max_frames: Option<u64>,
    session: Session,
    displayed_score: u32,
    banner: Option<(String, u64)>,
    pending_resize: Option<(u16, u16)>,
    running: bool,
}

impl Game {
    pub fn new(
        terminal_width: u16,
        terminal_height: u16,
        stdout_target: OutputTarget,
        simulated_input: Option<SimulatedInput>,
        debug_mode_active: bool,
        max_frames: Option<u64>,
    ) -> Self {
        Game {
            terminal_width,
            terminal_height,
            stdout_target,
            simulated_input,
            debug_mode_active,
            max_frames,
            session: Session::new(RoundConfig::default(), cells_to_points(terminal_width, terminal_height)),
            displayed_score: 0,
            banner: None,
            pending_resize: None,
            running: true,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        let mut rng = rand::thread_rng();
        let mut game_grid = GameGrid::new(self.terminal_width, self.terminal_height);
        let mut frame_count: u64 = 0;
        let mut last_frame = Instant::now();

        self.session.open();

        while self.running && self.max_frames.is_none_or(|max| frame_count < max) {
            let frame_start = Instant::now();

            self.handle_input(frame_count)?;
            self.apply_pending_resize(&mut game_grid);

            // Headless runs advance by exactly one frame so replays are repeatable.
            let dt = if self.debug_mode_active {
                FRAME_PERIOD
            } else {
                frame_start.duration_since(last_frame)
            };
            last_frame = frame_start;

            self.session.advance(dt, &mut rng);
            self.present_events(frame_count);
            self.render(&mut game_grid, frame_count)?;

            frame_count += 1;

            if !self.debug_mode_active {
                let elapsed = frame_start.elapsed();
                if elapsed < FRAME_PERIOD {
                    std::thread::sleep(FRAME_PERIOD - elapsed);
                }
            }
        }

        info!("Game loop ended after {} frames with score {}.", frame_count, self.session.round().score());
        self.session.shutdown();
        debug!(
            "Timers after shutdown: loop {:?}, spawner {:?}",
            self.session.loop_state(),
            self.session.spawner_state()
        );
        Ok(())
    }

    fn next_events(&mut self, frame_count: u64) -> io::Result<Vec<Event>> {
        if self.debug_mode_active {
            return Ok(self
                .simulated_input
                .as_mut()
                .map(|input| input.take(frame_count))
                .unwrap_or_default());
        }

        let mut events = Vec::new();
        while event::poll(Duration::ZERO).map_err(|e| { error!("Failed to poll event: {}", e); e })? {
            events.push(event::read().map_err(|e| { error!("Failed to read event: {}", e); e })?);
        }
        Ok(events)
    }

    fn handle_input(&mut self, frame_count: u64) -> io::Result<()> {
        for event in self.next_events(frame_count)? {
            match event {
                Event::Key(key_event) => self.handle_key(key_event.code),
                Event::Mouse(mouse_event) => {
                    if matches!(mouse_event.kind, MouseEventKind::Down(_) | MouseEventKind::Drag(_)) {
                        self.session.steer_to(column_center_in_points(mouse_event.column));
                    }
                }
                Event::Resize(new_width, new_height) => {
                    info!("Terminal resized to {}x{}", new_width, new_height);
                    self.pending_resize = Some((new_width, new_height));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) {
        let phase = self.session.phase();
        match code {
            KeyCode::Left => self.session.steer_by(-STEER_STEP),
            KeyCode::Right => self.session.steer_by(STEER_STEP),
            KeyCode::Enter | KeyCode::Char(' ') => match phase {
                RoundPhase::AwaitingStart => self.session.start(),
                RoundPhase::Paused => self.session.resume(),
                RoundPhase::RoundOver => self.session.restart(),
                RoundPhase::Active => {}
            },
            KeyCode::Char('p') => match phase {
                RoundPhase::Active => self.session.pause(),
                RoundPhase::Paused => self.session.resume(),
                _ => {}
            },
            KeyCode::Char('q') => {
                if phase == RoundPhase::AwaitingStart {
                    info!("Quit key 'q' pressed at the start prompt. Exiting.");
                    self.running = false;
                } else {
                    self.session.quit();
                }
            }
            KeyCode::Esc => {
                info!("Escape pressed. Exiting.");
                self.running = false;
            }
            _ => {}
        }
    }

    /// Terminal size changes are held back until the round allows new bounds.
    fn apply_pending_resize(&mut self, game_grid: &mut GameGrid) {
        let Some((width, height)) = self.pending_resize else {
            return;
        };
        if self.session.resize(cells_to_points(width, height)) {
            self.terminal_width = width;
            self.terminal_height = height;
            *game_grid = GameGrid::new(width, height);
            self.pending_resize = None;
        }
    }

    fn present_events(&mut self, frame_count: u64) {
        for round_event in self.session.drain_events() {
            match round_event {
                RoundEvent::ScoreChanged(score) => self.displayed_score = score,
                RoundEvent::TierUp { speed, spawn_interval } => {
                    info!("Speed now {}, traffic every {}s", speed, spawn_interval);
                    self.banner = Some((format!("Speed up! {}", speed), frame_count + BANNER_FRAMES));
                }
                RoundEvent::Started => {
                    self.banner = Some(("GO!".to_string(), frame_count + BANNER_FRAMES));
                }
                RoundEvent::Over { score } => {
                    info!("Round over. Final score: {}", score);
                    self.banner = None;
                }
                RoundEvent::Paused { score } => {
                    info!("Paused with score {}", score);
                    self.banner = None;
                }
                RoundEvent::Resumed | RoundEvent::Reset => {
                    self.banner = None;
                }
            }
        }
    }

    fn render(&mut self, game_grid: &mut GameGrid, frame_count: u64) -> io::Result<()> {
        let round = self.session.round();
        game_grid.clear();
        game_grid.draw_lanes(
            round.config().enemy_size.width * 1.5,
            round.background().offset,
            round.config().lane_dash_period,
        );
        for enemy in round.enemies() {
            game_grid.draw_car(enemy.frame(), style_for(enemy.entity.kind));
        }
        let player = round.player();
        if player.is_placed() {
            game_grid.draw_car(player.frame(), style_for(player.entity.kind));
        }

        let hud = if round.is_active() {
            format!(
                "Score: {}  Speed: {}  Distance: {}",
                self.displayed_score,
                round.speed(),
                (player.odometer / CAR_HEIGHT) as u64
            )
        } else {
            format!("Score: {}", self.displayed_score)
        };
        let phase = round.phase();

        game_grid.render(&mut self.stdout_target).map_err(|e| { error!("Failed to render game grid: {}", e); e })?;

        self.stdout_target.execute_move_to(MoveTo(0, 0))?;
        write!(self.stdout_target, "{}", hud)?;

        let middle = self.terminal_height / 2;
        let width = self.terminal_width;
        match phase {
            RoundPhase::AwaitingStart => {
                self.stdout_target.write_centered(width, middle.saturating_sub(1), "TRAFFIC RACER")?;
                self.stdout_target.write_centered(width, middle + 1, "Enter: start   q: exit")?;
            }
            RoundPhase::Paused => {
                let score_msg = format!("PAUSED   Score: {}", self.displayed_score);
                self.stdout_target.write_centered(width, middle.saturating_sub(1), &score_msg)?;
                self.stdout_target.write_centered(width, middle + 1, "p: continue   q: quit")?;
            }
            RoundPhase::RoundOver => {
                let score_msg = format!("GAME OVER   Score: {}", self.displayed_score);
                self.stdout_target.write_centered(width, middle.saturating_sub(1), &score_msg)?;
                self.stdout_target.write_centered(width, middle + 1, "Enter: restart   q: quit")?;
            }
            RoundPhase::Active => {
                if let Some((message, display_until_frame)) = &self.banner {
                    if frame_count < *display_until_frame {
                        let message = message.clone();
                        self.stdout_target.write_centered(width, middle.saturating_sub(3), &message)?;
                    }
                }
            }
        }

        self.stdout_target.flush().map_err(|e| { error!("Failed to flush stdout during game loop: {}", e); e })?;

        if self.debug_mode_active {
            if let OutputTarget::ScreenBuffer(sb) = &self.stdout_target {
                sb.print_to_log();
            }
        }
        Ok(())
    }

    pub fn clear_screen(&mut self) -> io::Result<()> {
        let game_grid = GameGrid::new(self.terminal_width, self.terminal_height);
        game_grid.clear_screen_manual(&mut self.stdout_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::ScreenBuffer;

    fn headless(keys: &[(u64, KeyCode)], max_frames: u64) -> Game {
        Game::new(
            40,
            30,
            OutputTarget::ScreenBuffer(ScreenBuffer::new(40, 30)),
            Some(SimulatedInput::new(keys)),
            true,
            Some(max_frames),
        )
    }

    fn screen(game: &Game) -> Vec<String> {
        match &game.stdout_target {
            OutputTarget::ScreenBuffer(sb) => (0..sb.height).map(|y| sb.row(y)).collect(),
            OutputTarget::Stdout(_) => Vec::new(),
        }
    }

    #[test]
    fn test_start_prompt_is_shown() {
        let mut game = headless(&[], 3);
        game.run().unwrap();
        assert!(screen(&game).iter().any(|row| row.contains("TRAFFIC RACER")));
    }

    #[test]
    fn test_enter_starts_and_p_pauses() {
        let mut game = headless(&[(1, KeyCode::Enter), (5, KeyCode::Char('p'))], 10);
        game.run().unwrap();
        assert!(screen(&game).iter().any(|row| row.contains("PAUSED   Score: 0")));
        assert!(screen(&game).iter().any(|row| row.contains("|AAAA|")));
    }

    #[test]
    fn test_q_at_prompt_exits() {
        let mut game = headless(&[(2, KeyCode::Char('q'))], 1000);
        game.run().unwrap();
        assert!(!game.running);
        assert_eq!(game.session.loop_state(), crate::timers::TimerState::Stopped);
    }

    #[test]
    fn test_quit_from_pause_returns_to_prompt() {
        let mut game = headless(
            &[(1, KeyCode::Enter), (3, KeyCode::Char('p')), (4, KeyCode::Char('q'))],
            6,
        );
        game.run().unwrap();
        assert!(screen(&game).iter().any(|row| row.contains("TRAFFIC RACER")));
        assert!(game.running);
    }

    #[test]
    fn test_resize_waits_for_round_to_end() {
        let mut game = headless(&[], 0);
        game.session.start();
        game.pending_resize = Some((60, 20));
        let mut grid = GameGrid::new(40, 30);
        game.apply_pending_resize(&mut grid);
        assert_eq!(game.terminal_width, 40);
        assert!(game.pending_resize.is_some());

        game.session.pause();
        game.session.quit();
        game.apply_pending_resize(&mut grid);
        assert_eq!(game.terminal_width, 60);
        assert_eq!(grid.height, 20);
        assert!(game.pending_resize.is_none());
    }
}
