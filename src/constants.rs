use std::time::Duration;

// --- Round Tuning ---
pub const BASE_SPEED: f64 = 6.0; // Points per frame
pub const SPEED_STEP: f64 = 1.0;
pub const BASE_SPAWN_INTERVAL: f64 = 1.0; // Seconds between enemy spawns
pub const SPAWN_INTERVAL_STEP: f64 = 0.5;
pub const TIER_SCORE_STEP: u32 = 25; // Speed and spawn interval step together every 25 points
pub const MAX_LIVE_ENEMIES: usize = 5;
pub const HITBOX_INSET: f64 = 4.0; // Shaved off every side before collision tests

// --- Car Geometry (logical points) ---
pub const CAR_WIDTH: f64 = 48.0;
pub const CAR_HEIGHT: f64 = 80.0;
pub const PLAYER_BOTTOM_MARGIN: f64 = 32.0;
pub const STEER_STEP: f64 = 24.0; // Horizontal nudge per arrow key press

// --- Background ---
pub const LANE_DASH_PERIOD: f64 = 64.0; // Scroll offset wraps at this length

// --- Frame Pacing ---
pub const FRAME_PERIOD: Duration = Duration::from_micros(16_667); // ~60 FPS

// --- Terminal Projection ---
pub const POINTS_PER_CELL_X: f64 = 8.0;
pub const POINTS_PER_CELL_Y: f64 = 16.0;
pub const BANNER_FRAMES: u64 = 90; // 1.5 seconds at 60 FPS
