#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector2D {
    pub x: f64,
    pub y: f64,
}

impl Vector2D {
    pub fn new(x: f64, y: f64) -> Self {
        Vector2D { x, y }
    }

    pub fn add(&self, other: Vector2D) -> Self {
        Vector2D::new(self.x + other.x, self.y + other.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }
}

/// Axis-aligned rectangle, `origin` is the top-left corner and y grows downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub origin: Vector2D,
    pub size: Size,
}

impl Rect {
    pub fn new(origin: Vector2D, size: Size) -> Self {
        Rect { origin, size }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn center(&self) -> Vector2D {
        Vector2D::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// Shrinks the rectangle by `dx` on the left and right and `dy` on the top and bottom.
    pub fn inset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            Vector2D::new(self.origin.x + dx, self.origin.y + dy),
            Size::new(
                (self.size.width - 2.0 * dx).max(0.0),
                (self.size.height - 2.0 * dy).max(0.0),
            ),
        )
    }

    /// True when the two rectangles share a region of positive area.
    /// Rectangles that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }
}

pub fn wrap_coordinate(value: f64, max: f64) -> f64 {
    let wrapped = value % max;
    if wrapped < 0.0 {
        wrapped + max
    } else {
        wrapped
    }
}
