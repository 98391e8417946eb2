//! Cube Hex Coordinates
//!
//! Pure math over a cube/axial hex grid. Every coordinate satisfies
//! `q + r + s == 0`; constructors derive `s` so the invariant cannot be broken
//! from outside this module.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cube coordinate on the hex grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HexCoord {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
    /// Derived axis, always `-q - r`.
    pub s: i32,
}

/// The six neighbour offsets, clockwise starting east.
pub const HEX_DIRECTIONS: [HexCoord; 6] = [
    HexCoord { q: 1, r: 0, s: -1 },
    HexCoord { q: 1, r: -1, s: 0 },
    HexCoord { q: 0, r: -1, s: 1 },
    HexCoord { q: -1, r: 0, s: 1 },
    HexCoord { q: -1, r: 1, s: 0 },
    HexCoord { q: 0, r: 1, s: -1 },
];

impl HexCoord {
    /// The origin tile.
    pub const ORIGIN: HexCoord = HexCoord { q: 0, r: 0, s: 0 };

    /// Create from axial components.
    #[inline]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r, s: -q - r }
    }

    /// Create from all three components, rejecting off-plane triples.
    pub fn from_cube(q: i32, r: i32, s: i32) -> Option<Self> {
        (q + r + s == 0).then_some(Self { q, r, s })
    }

    /// Check the cube invariant (only false for hand-built structs).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.q + self.r + self.s == 0
    }

    /// Component-wise sum.
    #[inline]
    pub fn add(self, other: HexCoord) -> HexCoord {
        HexCoord::new(self.q + other.q, self.r + other.r)
    }

    /// Hex distance (number of steps).
    #[inline]
    pub fn distance(self, other: HexCoord) -> u32 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = (self.s - other.s).unsigned_abs();
        dq.max(dr).max(ds)
    }

    /// The six adjacent coordinates.
    pub fn adjacent(self) -> [HexCoord; 6] {
        HEX_DIRECTIONS.map(|d| self.add(d))
    }

    /// Check whether two coordinates are neighbours.
    #[inline]
    pub fn is_adjacent(self, other: HexCoord) -> bool {
        self.distance(other) == 1
    }

    /// Canonical string key, `"q,r,s"`.
    pub fn to_key(self) -> String {
        format!("{},{},{}", self.q, self.r, self.s)
    }

    /// Parse a key produced by [`HexCoord::to_key`].
    pub fn from_key(key: &str) -> Option<HexCoord> {
        let mut parts = key.split(',').map(|p| p.trim().parse::<i32>());
        let q = parts.next()?.ok()?;
        let r = parts.next()?.ok()?;
        let s = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        HexCoord::from_cube(q, r, s)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.q, self.r, self.s)
    }
}

/// Hex distance between two coordinates.
#[inline]
pub fn distance(a: HexCoord, b: HexCoord) -> u32 {
    a.distance(b)
}

/// Every coordinate within `radius` steps of `center`, in ascending
/// `(q, r)` order.
pub fn coordinates_in_range(center: HexCoord, radius: u32) -> Vec<HexCoord> {
    let n = radius as i32;
    let mut out = Vec::with_capacity((3 * n * (n + 1) + 1) as usize);
    for dq in -n..=n {
        let r_min = (-n).max(-dq - n);
        let r_max = n.min(-dq + n);
        for dr in r_min..=r_max {
            out.push(center.add(HexCoord::new(dq, dr)));
        }
    }
    out
}

/// Coordinates exactly `radius` steps from `center`.
pub fn ring(center: HexCoord, radius: u32) -> Vec<HexCoord> {
    coordinates_in_range(center, radius)
        .into_iter()
        .filter(|c| c.distance(center) == radius)
        .collect()
}

/// Round fractional cube components to the nearest valid hex.
///
/// The axis with the largest rounding error is recomputed as the negative sum
/// of the other two. The q error is checked first, then r; s is the fallback.
pub fn hex_round(fq: f64, fr: f64, fs: f64) -> HexCoord {
    let mut q = fq.round();
    let mut r = fr.round();
    let mut s = fs.round();

    let q_diff = (q - fq).abs();
    let r_diff = (r - fr).abs();
    let s_diff = (s - fs).abs();

    if q_diff > r_diff && q_diff > s_diff {
        q = -r - s;
    } else if r_diff > s_diff {
        r = -q - s;
    } else {
        s = -q - r;
    }

    HexCoord { q: q as i32, r: r as i32, s: s as i32 }
}

/// Straight-line path from `a` to `b`, inclusive of both ends.
///
/// Samples `distance + 1` points by linear interpolation of the cube
/// components and rounds each one with [`hex_round`]. Samples that land
/// exactly on a tile edge follow its tie-break.
pub fn path_between(a: HexCoord, b: HexCoord) -> Vec<HexCoord> {
    let n = a.distance(b);
    if n == 0 {
        return vec![a];
    }

    let lerp = |from: i32, to: i32, t: f64| from as f64 + (to - from) as f64 * t;
    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            hex_round(lerp(a.q, b.q, t), lerp(a.r, b.r, t), lerp(a.s, b.s, t))
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
