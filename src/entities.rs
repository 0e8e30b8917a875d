use crate::constants::*;
use crate::types::{Rect, Size, Vector2D, wrap_coordinate};
use log::{debug, info};
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Enemy,
}

// --- Entity: a moving rectangle shared by every car ---
#[derive(Clone, Debug)]
pub struct Entity {
    pub kind: EntityKind,
    frame: Rect,
}

impl Entity {
    pub fn new(kind: EntityKind, size: Size) -> Self {
        Entity {
            kind,
            frame: Rect::new(Vector2D::new(0.0, 0.0), size),
        }
    }

    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn position(&self) -> Vector2D {
        self.frame.origin
    }

    pub fn size(&self) -> Size {
        self.frame.size
    }

    pub fn set_origin(&mut self, origin: Vector2D) {
        self.frame.origin = origin;
    }

    pub fn set_center_x(&mut self, center_x: f64) {
        self.frame.origin.x = center_x - self.frame.size.width / 2.0;
    }

    /// Translates the entity vertically; positive distances move it down the screen.
    pub fn move_by(&mut self, distance: f64) {
        self.frame.origin = self.frame.origin.add(Vector2D::new(0.0, distance));
    }

    pub fn has_exited_bottom(&self, container_height: f64) -> bool {
        self.frame.origin.y > container_height
    }

    pub fn hitbox(&self, inset: f64) -> Rect {
        self.frame.inset(inset, inset)
    }
}

/// Clamped horizontal range for a car center so the car never straddles an edge.
fn center_range(width: f64, container_width: f64) -> (f64, f64) {
    let min_x = width / 2.0;
    let max_x = container_width - width / 2.0;
    if max_x < min_x {
        // Container narrower than the car: pin to the middle.
        (container_width / 2.0, container_width / 2.0)
    } else {
        (min_x, max_x)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Motion {
    Moved,
    /// Passed the bottom edge without colliding; the enemy is now detached.
    Exited,
    /// The enemy has no container and ignored the move.
    Detached,
}

// --- Enemy car ---
#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: u64,
    pub entity: Entity,
    container: Option<Size>,
}

impl Enemy {
    pub fn new(id: u64, size: Size) -> Self {
        Enemy {
            id,
            entity: Entity::new(EntityKind::Enemy, size),
            container: None,
        }
    }

    /// Puts the enemy just above the visible area at a random lane offset.
    pub fn place(&mut self, container: Size, rng: &mut impl Rng) {
        let size = self.entity.size();
        let (min_x, max_x) = center_range(size.width, container.width);
        let center_x = rng.gen_range(min_x..=max_x);

        self.entity.set_origin(Vector2D::new(center_x - size.width / 2.0, -size.height));
        self.container = Some(container);
        debug!("Enemy {} placed with center x {}", self.id, center_x);
    }

    pub fn detach(&mut self) {
        self.container = None;
    }

    /// New bounds for an attached enemy; a detached one stays detached.
    pub fn set_container(&mut self, container: Size) {
        if self.container.is_some() {
            self.container = Some(container);
        }
    }

    pub fn move_by(&mut self, speed: f64) -> Motion {
        let Some(container) = self.container else {
            return Motion::Detached;
        };

        self.entity.move_by(speed);

        if self.entity.has_exited_bottom(container.height) {
            self.detach();
            info!("Enemy {} finished without crashing.", self.id);
            Motion::Exited
        } else {
            Motion::Moved
        }
    }

    pub fn frame(&self) -> Rect {
        self.entity.frame()
    }
}

// --- Player car ---
#[derive(Clone, Debug)]
pub struct Player {
    pub entity: Entity,
    container: Option<Size>,
    pub odometer: f64,
}

impl Player {
    pub fn new(size: Size) -> Self {
        Player {
            entity: Entity::new(EntityKind::Player, size),
            container: None,
            odometer: 0.0,
        }
    }

    /// Centers the car horizontally on its fixed row near the bottom edge.
    pub fn place(&mut self, container: Size) {
        let size = self.entity.size();
        let row_y = (container.height - size.height - PLAYER_BOTTOM_MARGIN).max(0.0);
        self.entity.set_origin(Vector2D::new(0.0, row_y));
        self.entity.set_center_x(container.width / 2.0);
        self.container = Some(container);
        self.odometer = 0.0;
        info!("Player placed at ({}, {})", self.entity.position().x, row_y);
    }

    pub fn remove(&mut self) {
        self.container = None;
    }

    pub fn is_placed(&self) -> bool {
        self.container.is_some()
    }

    /// Sets the car center; input outside the road is clamped back onto it.
    pub fn steer_to(&mut self, center_x: f64) {
        let Some(container) = self.container else {
            return;
        };
        let (min_x, max_x) = center_range(self.entity.size().width, container.width);
        self.entity.set_center_x(center_x.clamp(min_x, max_x));
    }

    pub fn steer_by(&mut self, dx: f64) {
        let center_x = self.entity.frame().center().x;
        self.steer_to(center_x + dx);
    }

    /// Forward motion is an illusion: the row never changes, only the distance travelled.
    pub fn move_by(&mut self, speed: f64) {
        if self.is_placed() {
            self.odometer += speed;
        }
    }

    pub fn frame(&self) -> Rect {
        self.entity.frame()
    }
}

// --- Scrolling road ---
#[derive(Clone, Debug)]
pub struct Background {
    pub offset: f64,
    period: f64,
}

impl Background {
    pub fn new(period: f64) -> Self {
        Background { offset: 0.0, period }
    }

    pub fn move_by(&mut self, speed: f64) {
        self.offset = wrap_coordinate(self.offset + speed, self.period);
    }
}
