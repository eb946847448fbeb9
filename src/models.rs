/// Raw segment reported by the line detector, in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl LineSegment {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn is_vertical(&self) -> bool {
        self.x1 == self.x2
    }
}

/// Slope/intercept of `y = slope * x + intercept` in image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParams {
    pub slope: f64,
    pub intercept: f64,
}

impl FitParams {
    /// Degree-1 fit through the two endpoints. Vertical segments have no fit.
    pub fn from_segment(segment: &LineSegment) -> Option<Self> {
        if segment.is_vertical() {
            return None;
        }
        let slope = (segment.y2 - segment.y1) / (segment.x2 - segment.x1);
        let intercept = segment.y1 - slope * segment.x1;
        Some(Self { slope, intercept })
    }

    pub fn is_finite(&self) -> bool {
        self.slope.is_finite() && self.intercept.is_finite()
    }

    /// Solve for x at the given row
    pub fn x_at(&self, y: f64) -> f64 {
        (y - self.intercept) / self.slope
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneSide {
    Left,
    Right,
}

impl LaneSide {
    /// Image y grows downward, so a left lane marking has negative slope
    pub fn classify(fit: &FitParams) -> Self {
        if fit.slope < 0.0 {
            LaneSide::Left
        } else {
            LaneSide::Right
        }
    }
}

/// Endpoints of one averaged lane line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl LaneLine {
    /// Integer endpoints, or None if any coordinate is non-finite or
    /// outside the `i32` range
    pub fn to_pixels(&self) -> Option<[i32; 4]> {
        let mut out = [0i32; 4];
        for (slot, v) in out.iter_mut().zip([self.x1, self.y1, self.x2, self.y2]) {
            if !v.is_finite() || v < i32::MIN as f64 || v > i32::MAX as f64 {
                return None;
            }
            *slot = v.trunc() as i32;
        }
        Some(out)
    }
}

/// Up to one averaged line per side
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LaneLines {
    pub left: Option<LaneLine>,
    pub right: Option<LaneLine>,
}

impl LaneLines {
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn count(&self) -> usize {
        self.left.is_some() as usize + self.right.is_some() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = &LaneLine> {
        self.left.iter().chain(self.right.iter())
    }
}
