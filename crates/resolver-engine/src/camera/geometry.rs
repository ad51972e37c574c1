pub use glam::{DAffine2, DVec2};

/// Axis-aligned box; `min` is the component-wise minimum corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec2,
    pub max: DVec2,
}

impl Aabb {
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn around(center: DVec2, size: DVec2) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    /// Smallest box holding both `self` and `p`.
    pub fn including(self, p: DVec2) -> Self {
        Self {
            min: self.min.min(p),
            max: self.max.max(p),
        }
    }

    pub fn size(&self) -> DVec2 {
        self.max - self.min
    }

    pub fn width(&self) -> f64 {
        self.size().x
    }

    pub fn height(&self) -> f64 {
        self.size().y
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Touching edges count as intersecting.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }
}
