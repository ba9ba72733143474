//! Simulated service positions

use rand::Rng;

/// Position source owned by a geo service
pub trait Locator: Send + 'static {
    fn coordinates(&self) -> (f64, f64);

    /// Euclidean distance from the current position to (x, y)
    fn distance(&self, x: f64, y: f64) -> f64 {
        let (sx, sy) = self.coordinates();
        let dx = sx - x;
        let dy = sy - y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Move to a new position
    fn update(&mut self);
}

/// Jumps to a random integer grid point in [-max, max] on every update
#[derive(Debug, Clone)]
pub struct RandomLocator {
    x: f64,
    y: f64,
    max_coordinate: i64,
}

impl RandomLocator {
    pub fn new(max_coordinate: i64) -> Self {
        let max_coordinate = max_coordinate.abs();
        Self {
            x: random_coordinate(max_coordinate),
            y: random_coordinate(max_coordinate),
            max_coordinate,
        }
    }
}

impl Locator for RandomLocator {
    fn coordinates(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn update(&mut self) {
        self.x = random_coordinate(self.max_coordinate);
        self.y = random_coordinate(self.max_coordinate);
    }
}

fn random_coordinate(limit: i64) -> f64 {
    rand::rng().random_range(-limit..=limit) as f64
}

/// Stays where it was put; updates are ignored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedLocator {
    x: f64,
    y: f64,
}

impl FixedLocator {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Locator for FixedLocator {
    fn coordinates(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    fn update(&mut self) {}
}
