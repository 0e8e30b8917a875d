use std::io::{self, Write};
use std::env;
use crossterm::{
    terminal::{enable_raw_mode, disable_raw_mode, size},
    cursor::{Hide, Show},
    event::{DisableMouseCapture, EnableMouseCapture},
};
use log::{info, error};

mod constants;
mod entities;
mod game;
mod rendering;
mod round;
mod session;
mod spawner;
mod terminal_io;
mod timers;
mod types;

use game::Game;
use rendering::{OutputTarget, ScreenBuffer};
use terminal_io::SimulatedInput;

const DEFAULT_DEBUG_WIDTH: u16 = 40;
const DEFAULT_DEBUG_HEIGHT: u16 = 30;

fn parse_frames(arg: Option<&String>) -> Option<u64> {
    arg.and_then(|value| value.parse::<u64>().ok())
}

/// Every step is attempted; the first failure is reported.
fn restore_terminal(stdout_target: &mut OutputTarget) -> io::Result<()> {
    let mouse = stdout_target.execute_other_command(DisableMouseCapture).map_err(|e| { error!("Failed to disable mouse capture: {}", e); e });
    let cursor = stdout_target.execute_other_command(Show).map_err(|e| { error!("Failed to show cursor on exit: {}", e); e });
    let raw = disable_raw_mode().map_err(|e| { error!("Failed to disable raw mode on exit: {}", e); e });
    mouse.and(cursor).and(raw)
}

/// Reads the terminal size and switches on cursor hiding and mouse capture.
fn prepare_terminal(stdout_target: &mut OutputTarget) -> io::Result<(u16, u16)> {
    let (terminal_width, terminal_height) = size().map_err(|e| { error!("Failed to get terminal size: {}", e); e })?;
    info!("Terminal size: {}x{}", terminal_width, terminal_height);
    stdout_target.execute_other_command(Hide).map_err(|e| { error!("Failed to hide cursor: {}", e); e })?;
    stdout_target.execute_other_command(EnableMouseCapture).map_err(|e| { error!("Failed to enable mouse capture: {}", e); e })?;
    Ok((terminal_width, terminal_height))
}

/// Runs a setup step once raw mode is on. A failed step puts the terminal
/// back before its error is returned.
fn setup_or_restore<T>(
    stdout_target: &mut OutputTarget,
    setup: impl FnOnce(&mut OutputTarget) -> io::Result<T>,
    restore: impl FnOnce(&mut OutputTarget) -> io::Result<()>,
) -> io::Result<T> {
    match setup(stdout_target) {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Err(restore_error) = restore(stdout_target) {
                error!("Terminal restore after failed setup also failed: {}", restore_error);
            }
            Err(e)
        }
    }
}

fn main() -> io::Result<()> {
    simple_logging::log_to_file("traffic-racer.log", log::LevelFilter::Info)?;
    info!("Starting traffic-racer.");

    // Usage: traffic-racer [MAX_FRAMES] | traffic-racer --debug [WIDTH HEIGHT [MAX_FRAMES]]
    let args: Vec<String> = env::args().collect();
    let debug_mode_active = args.get(1).is_some_and(|arg| arg == "--debug");

    if debug_mode_active {
        let terminal_width = args.get(2).and_then(|w| w.parse::<u16>().ok()).unwrap_or(DEFAULT_DEBUG_WIDTH);
        let terminal_height = args.get(3).and_then(|h| h.parse::<u16>().ok()).unwrap_or(DEFAULT_DEBUG_HEIGHT);
        let max_frames = parse_frames(args.get(4));
        info!("Debug mode enabled at {}x{}, max frames {:?}", terminal_width, terminal_height, max_frames);

        let stdout_target = OutputTarget::ScreenBuffer(ScreenBuffer::new(terminal_width, terminal_height));
        let mut game = Game::new(
            terminal_width,
            terminal_height,
            stdout_target,
            Some(SimulatedInput::demo_script()),
            true,
            max_frames,
        );
        return game.run();
    }

    let max_frames = parse_frames(args.get(1));

    info!("Attempting to enable raw mode.");
    let mut stdout_target = OutputTarget::Stdout(io::stdout());
    enable_raw_mode().map_err(|e| { error!("Failed to enable raw mode: {}", e); e })?;
    let (terminal_width, terminal_height) = setup_or_restore(&mut stdout_target, prepare_terminal, restore_terminal)?;

    let mut game = Game::new(terminal_width, terminal_height, stdout_target, None, false, max_frames);
    let result = game.clear_screen().and_then(|_| game.run());
    if let Err(e) = &result {
        error!("Game loop failed: {}", e);
    }

    // The terminal comes back even when the loop bailed out with an error.
    let cleared = game.clear_screen().and_then(|_| game.stdout_target.flush());
    restore_terminal(&mut game.stdout_target)?;
    cleared?;
    info!("Exiting traffic-racer.");

    result
}
