/// A closed range of scalar values, used for depth windows and value ranges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    /// Create a new interval given min and max values.
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Returns the size of the interval (max - min).
    pub fn size(&self) -> f32 {
        self.max - self.min
    }

    /// Returns true if the interval contains no values.
    pub fn is_empty(&self) -> bool {
        !(self.min <= self.max)
    }

    /// Returns true if x is within the interval [min, max] (inclusive).
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Grow the interval so that it contains x. Non-finite values are ignored.
    pub fn include(&mut self, x: f32) {
        if x.is_finite() {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
    }

    /// Map x into [0, 1] relative to this interval.
    ///
    /// A zero-width interval maps everything to 0.
    pub fn normalize(&self, x: f32) -> f32 {
        let size = self.size();
        if size > 0.0 {
            ((x - self.min) / size).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// An empty interval (min > max, contains nothing).
    pub const EMPTY: Interval = Interval {
        min: f32::INFINITY,
        max: f32::NEG_INFINITY,
    };

    /// The full normalized-device-coordinate range.
    pub const NDC: Interval = Interval { min: -1.0, max: 1.0 };
}
