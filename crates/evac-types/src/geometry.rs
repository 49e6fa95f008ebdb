//! Spatial primitives shared by the region graph, the interest point index,
//! and the movement executor.
//!
//! Coordinates follow the building's engine convention: `y` is the vertical
//! axis, and the horizontal plane is `x`/`z`. Headings are measured on the
//! horizontal plane only, with 0 degrees pointing east (+x) and angles
//! increasing counter-clockwise towards north (+z).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Point3
// ---------------------------------------------------------------------------

/// A position in world space, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point3 {
    /// East-west axis.
    pub x: f64,
    /// Vertical axis.
    pub y: f64,
    /// North-south axis.
    pub z: f64,
}

impl Point3 {
    /// The world origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Construct a point from its three coordinates.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in all three axes.
    pub fn distance(self, other: Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
    }

    /// Distance on the horizontal plane, ignoring height.
    pub fn horizontal_distance(self, other: Self) -> f64 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        dx.hypot(dz)
    }

    /// Move towards `target` on the horizontal plane by at most `step`
    /// meters, keeping the current height. Never overshoots.
    pub fn step_towards(self, target: Self, step: f64) -> Self {
        let remaining = self.horizontal_distance(target);
        if remaining <= step || remaining <= f64::EPSILON {
            return Self::new(target.x, self.y, target.z);
        }
        let ratio = step / remaining;
        Self::new(
            (target.x - self.x).mul_add(ratio, self.x),
            self.y,
            (target.z - self.z).mul_add(ratio, self.z),
        )
    }
}

impl core::fmt::Display for Point3 {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bounds {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Bounds {
    /// Build a box from a center point and full extents along each axis.
    pub fn from_center_size(center: Point3, size: Point3) -> Self {
        let half = Point3::new(size.x.abs() / 2.0, size.y.abs() / 2.0, size.z.abs() / 2.0);
        Self {
            min: Point3::new(center.x - half.x, center.y - half.y, center.z - half.z),
            max: Point3::new(center.x + half.x, center.y + half.y, center.z + half.z),
        }
    }

    /// Geometric center of the box.
    pub fn center(&self) -> Point3 {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    /// Full extents along each axis.
    pub fn size(&self) -> Point3 {
        Point3::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }

    /// Whether `point` lies inside the box. Faces count as inside.
    pub fn contains(&self, point: Point3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Shrink the box inward by `padding` on every face.
    ///
    /// An axis narrower than twice the padding collapses to its midpoint
    /// rather than inverting.
    pub fn padded(&self, padding: f64) -> Self {
        let center = self.center();
        let shrink = |lo: f64, hi: f64, mid: f64| {
            let (a, b) = (lo + padding, hi - padding);
            if a > b { (mid, mid) } else { (a, b) }
        };
        let (min_x, max_x) = shrink(self.min.x, self.max.x, center.x);
        let (min_y, max_y) = shrink(self.min.y, self.max.y, center.y);
        let (min_z, max_z) = shrink(self.min.z, self.max.z, center.z);
        Self {
            min: Point3::new(min_x, min_y, min_z),
            max: Point3::new(max_x, max_y, max_z),
        }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of eight compass sectors, each 45 degrees wide and centered on its
/// heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Direction {
    /// 337.5 to 22.5 degrees.
    East,
    /// 22.5 to 67.5 degrees.
    Northeast,
    /// 67.5 to 112.5 degrees.
    North,
    /// 112.5 to 157.5 degrees.
    Northwest,
    /// 157.5 to 202.5 degrees.
    West,
    /// 202.5 to 247.5 degrees.
    Southwest,
    /// 247.5 to 292.5 degrees.
    South,
    /// 292.5 to 337.5 degrees.
    Southeast,
}

impl Direction {
    /// Compass sector of the horizontal vector from `from` to `to`.
    ///
    /// A zero-length vector reads as east.
    pub fn between(from: Point3, to: Point3) -> Self {
        Self::from_heading(to.x - from.x, to.z - from.z)
    }

    /// Compass sector of a horizontal vector given by its `x` and `z`
    /// components.
    pub fn from_heading(dx: f64, dz: f64) -> Self {
        let mut angle = dz.atan2(dx).to_degrees();
        if angle < 0.0 {
            angle += 360.0;
        }
        if !(22.5..337.5).contains(&angle) {
            Self::East
        } else if angle < 67.5 {
            Self::Northeast
        } else if angle < 112.5 {
            Self::North
        } else if angle < 157.5 {
            Self::Northwest
        } else if angle < 202.5 {
            Self::West
        } else if angle < 247.5 {
            Self::Southwest
        } else if angle < 292.5 {
            Self::South
        } else {
            Self::Southeast
        }
    }

    /// Lowercase label used in observations.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::East => "east",
            Self::Northeast => "northeast",
            Self::North => "north",
            Self::Northwest => "northwest",
            Self::West => "west",
            Self::Southwest => "southwest",
            Self::South => "south",
            Self::Southeast => "southeast",
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
