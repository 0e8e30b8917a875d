use std::io::{self, Write};
use log::info;
use crossterm::{
    cursor::MoveTo,
    execute,
};

use crate::constants::{POINTS_PER_CELL_X, POINTS_PER_CELL_Y};
use crate::entities::EntityKind;
use crate::types::{Rect, Size, wrap_coordinate};

// --- ScreenBuffer for headless rendering ---
pub struct ScreenBuffer {
    pub buffer: Vec<Vec<char>>,
    pub width: u16,
    pub height: u16,
    pub cursor_x: u16,
    pub cursor_y: u16,
}

impl ScreenBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        ScreenBuffer {
            buffer: vec![vec![' '; width as usize]; height as usize],
            width,
            height,
            cursor_x: 0,
            cursor_y: 0,
        }
    }

    pub fn move_to(&mut self, x: u16, y: u16) {
        self.cursor_x = x;
        self.cursor_y = y;
    }

    pub fn write_str(&mut self, s: &str) {
        for c in s.chars() {
            self.set_char(self.cursor_x, self.cursor_y, c);
            self.cursor_x = self.cursor_x.saturating_add(1);
        }
    }

    pub fn set_char(&mut self, x: u16, y: u16, c: char) {
        if y < self.height && x < self.width {
            self.buffer[y as usize][x as usize] = c;
        }
    }

    pub fn row(&self, y: u16) -> String {
        self.buffer
            .get(y as usize)
            .map(|row| row.iter().collect())
            .unwrap_or_default()
    }

    pub fn print_to_log(&self) {
        info!("--- Screen Buffer ---");
        for y in 0..self.height {
            info!("{}", self.row(y));
        }
        info!("---------------------");
    }
}

// --- OutputTarget: a real terminal or the headless buffer ---
pub enum OutputTarget {
    Stdout(io::Stdout),
    ScreenBuffer(ScreenBuffer),
}

impl OutputTarget {
    pub fn execute_move_to(&mut self, command: MoveTo) -> io::Result<()> {
        match self {
            OutputTarget::Stdout(s) => execute!(s, command),
            OutputTarget::ScreenBuffer(sb) => {
                sb.move_to(command.0, command.1);
                Ok(())
            }
        }
    }

    pub fn execute_other_command(&mut self, command: impl crossterm::Command) -> io::Result<()> {
        match self {
            OutputTarget::Stdout(s) => execute!(s, command),
            OutputTarget::ScreenBuffer(_) => Ok(()), // No terminal to configure
        }
    }

    /// Writes `text` horizontally centered on row `y`.
    pub fn write_centered(&mut self, width: u16, y: u16, text: &str) -> io::Result<()> {
        let x = (width / 2).saturating_sub(text.chars().count() as u16 / 2);
        self.execute_move_to(MoveTo(x, y))?;
        write!(self, "{}", text)
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputTarget::Stdout(s) => s.write(buf),
            OutputTarget::ScreenBuffer(sb) => {
                let s = String::from_utf8_lossy(buf);
                sb.write_str(&s);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputTarget::Stdout(s) => s.flush(),
            OutputTarget::ScreenBuffer(_) => Ok(()),
        }
    }
}

/// Converts between terminal cells and the logical points the round works in.
pub fn cells_to_points(width: u16, height: u16) -> Size {
    Size::new(width as f64 * POINTS_PER_CELL_X, height as f64 * POINTS_PER_CELL_Y)
}

pub fn column_center_in_points(column: u16) -> f64 {
    (column as f64 + 0.5) * POINTS_PER_CELL_X
}

#[derive(Clone, Copy, Debug)]
pub struct CarStyle {
    pub roof: char,
    pub body: char,
    pub side: char,
}

pub const PLAYER_STYLE: CarStyle = CarStyle { roof: '^', body: 'A', side: '|' };
pub const ENEMY_STYLE: CarStyle = CarStyle { roof: '=', body: '#', side: '[' };

pub fn style_for(kind: EntityKind) -> CarStyle {
    match kind {
        EntityKind::Player => PLAYER_STYLE,
        EntityKind::Enemy => ENEMY_STYLE,
    }
}

// --- GameGrid: the road projected onto terminal cells ---
pub struct GameGrid {
    pub grid: Vec<Vec<char>>,
    pub width: u16,
    pub height: u16,
}

impl GameGrid {
    pub fn new(width: u16, height: u16) -> Self {
        GameGrid {
            grid: vec![vec![' '; width as usize]; height as usize],
            width,
            height,
        }
    }

    pub fn set_char(&mut self, x: i32, y: i32, c: char) {
        if x >= 0 && y >= 0 && (y as u16) < self.height && (x as u16) < self.width {
            self.grid[y as usize][x as usize] = c;
        }
    }

    pub fn clear(&mut self) {
        self.grid = vec![vec![' '; self.width as usize]; self.height as usize];
    }

    /// Dashed lane dividers that slide down by the background scroll offset.
    pub fn draw_lanes(&mut self, lane_width: f64, offset: f64, period: f64) {
        let lane_cells = (lane_width / POINTS_PER_CELL_X).round().max(1.0) as u16;
        for x in (lane_cells..self.width).step_by(lane_cells as usize) {
            for y in 0..self.height {
                let phase = wrap_coordinate(y as f64 * POINTS_PER_CELL_Y - offset, period);
                if phase < period / 2.0 {
                    self.set_char(x as i32, y as i32, ':');
                }
            }
        }
    }

    /// Draws a car frame given in points; parts above or below the screen are clipped.
    pub fn draw_car(&mut self, frame: Rect, style: CarStyle) {
        let left = (frame.min_x() / POINTS_PER_CELL_X).floor() as i32;
        let right = (frame.max_x() / POINTS_PER_CELL_X).ceil() as i32 - 1;
        let top = (frame.min_y() / POINTS_PER_CELL_Y).floor() as i32;
        let bottom = (frame.max_y() / POINTS_PER_CELL_Y).ceil() as i32 - 1;

        for y in top..=bottom {
            for x in left..=right {
                let c = if y == top || y == bottom {
                    style.roof
                } else if x == left || x == right {
                    style.side
                } else {
                    style.body
                };
                self.set_char(x, y, c);
            }
        }
    }

    pub fn render(&self, stdout: &mut OutputTarget) -> io::Result<()> {
        for y in 0..self.height {
            stdout.execute_move_to(MoveTo(0, y))?;
            write!(stdout, "{}", self.grid[y as usize].iter().collect::<String>())?;
        }
        Ok(())
    }

    pub fn clear_screen_manual(&self, stdout: &mut OutputTarget) -> io::Result<()> {
        for y in 0..self.height {
            stdout.execute_move_to(MoveTo(0, y))?;
            write!(stdout, "{}", " ".repeat(self.width as usize))?;
        }
        stdout.execute_move_to(MoveTo(0, 0))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vector2D;

    fn rows(grid: &GameGrid) -> Vec<String> {
        grid.grid.iter().map(|row| row.iter().collect()).collect()
    }

    #[test]
    fn test_car_projects_onto_cells() {
        let mut grid = GameGrid::new(10, 8);
        let frame = Rect::new(Vector2D::new(16.0, 16.0), Size::new(48.0, 80.0));
        grid.draw_car(frame, ENEMY_STYLE);
        let rows = rows(&grid);
        assert_eq!(rows[0], "          ");
        assert_eq!(rows[1], "  ======  ");
        assert_eq!(rows[2], "  [####[  ");
        assert_eq!(rows[5], "  ======  ");
        assert_eq!(rows[6], "          ");
    }

    #[test]
    fn test_car_above_screen_is_clipped() {
        let mut grid = GameGrid::new(10, 8);
        let frame = Rect::new(Vector2D::new(0.0, -80.0), Size::new(48.0, 80.0));
        grid.draw_car(frame, PLAYER_STYLE);
        assert!(rows(&grid).iter().all(|row| row.trim().is_empty()));
    }

    #[test]
    fn test_lane_dashes_scroll_with_offset() {
        let mut still = GameGrid::new(12, 4);
        still.draw_lanes(48.0, 0.0, 64.0);
        assert_eq!(rows(&still)[0].chars().nth(6), Some(':'));
        assert_eq!(rows(&still)[2].chars().nth(6), Some(' '));

        let mut scrolled = GameGrid::new(12, 4);
        scrolled.draw_lanes(48.0, 32.0, 64.0);
        assert_eq!(rows(&scrolled)[0].chars().nth(6), Some(' '));
        assert_eq!(rows(&scrolled)[2].chars().nth(6), Some(':'));
    }

    #[test]
    fn test_screen_buffer_captures_writes() {
        let mut target = OutputTarget::ScreenBuffer(ScreenBuffer::new(20, 3));
        target.write_centered(20, 1, "GAME OVER").unwrap();
        match target {
            OutputTarget::ScreenBuffer(sb) => assert_eq!(sb.row(1), "      GAME OVER     "),
            OutputTarget::Stdout(_) => unreachable!(),
        }
    }

    #[test]
    fn test_cell_projection() {
        assert_eq!(cells_to_points(80, 24), Size::new(640.0, 384.0));
        assert_eq!(column_center_in_points(2), 20.0);
    }
}
