//! # Spatial Cells
//!
//! Geohash-style cell codes over the base-32 alphabet
//! `0123456789bcdefghjkmnpqrstuvwxyz`. Each character adds five bits of
//! alternating longitude/latitude bisection, longitude first, so a prefix
//! always names a cell that contains the longer code's cell.
//!
//! ```text
//! precision 5  "9q8yy"       ~4.9 km × 4.9 km
//! precision 6  "9q8yyx"      ~1.2 km × 0.6 km
//! precision 10 "9q8yyx1d6x"  ~1.2 m  × 0.6 m
//! ```
//!
//! Neighbour lookup is table-driven. Moving one cell in a direction swaps
//! the last character through a transition table keyed by direction and
//! the parity of the code length; a character on the table's border
//! carries the move into the parent prefix. A carry past the first
//! character means the move would leave the world and the cell is
//! returned unchanged (no wrap-around).
//!
//! ## Query precision
//!
//! A range query over the 3×3 neighbourhood of the observer's cell finds
//! every post within `r` meters as long as the cell is at least `r` tall
//! and `r` wide. [`query_precision_for_radius`] picks the finest such
//! precision. For the 1000 m feed radius that is precision 5 anywhere
//! below roughly 75° latitude; precision 6 is only 0.6 km tall and would
//! miss posts to the north and south.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::warn;

use super::distance::EARTH_RADIUS_M;
use crate::model::Coordinate;
use crate::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Cell alphabet. A character's position is its 5-bit value.
pub const ALPHABET: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Precision at which posts are stored.
pub const STORAGE_PRECISION: usize = 10;

/// Query precision for the default 1000 m feed radius.
pub const DEFAULT_QUERY_PRECISION: usize = 5;

/// Finest precision considered by [`query_precision_for_radius`].
pub const MAX_QUERY_PRECISION: usize = 12;

/// Upper-bound sentinel for prefix range scans; sorts after every
/// alphabet character.
pub const RANGE_SENTINEL: char = '~';

// Transition tables, indexed `[direction][parity]` where parity 0 means
// the code prefix has even length.
const NEIGHBORS: [[&[u8; 32]; 2]; 4] = [
    // North
    [b"p0r21436x8zb9dcf5h7kjnmqesgutwvy", b"bc01fg45238967deuvhjyznpkmstqrwx"],
    // South
    [b"14365h7k9dcfesgujnmqp0r2twvyx8zb", b"238967debc01fg45kmstqrwxuvhjyznp"],
    // East
    [b"bc01fg45238967deuvhjyznpkmstqrwx", b"p0r21436x8zb9dcf5h7kjnmqesgutwvy"],
    // West
    [b"238967debc01fg45kmstqrwxuvhjyznp", b"14365h7k9dcfesgujnmqp0r2twvyx8zb"],
];

const BORDERS: [[&[u8]; 2]; 4] = [
    [b"prxz", b"bcfguvyz"],
    [b"028b", b"0145hjnp"],
    [b"bcfguvyz", b"prxz"],
    [b"0145hjnp", b"028b"],
];

fn char_value(c: u8) -> Option<usize> {
    ALPHABET.iter().position(|&a| a == c)
}

// ============================================================================
// SpatialCell
// ============================================================================

/// A validated cell code. Its length is its precision.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpatialCell(String);

/// Compass direction for a single-cell move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellDirection {
    North,
    South,
    East,
    West,
}

impl CellDirection {
    fn table_index(self) -> usize {
        match self {
            CellDirection::North => 0,
            CellDirection::South => 1,
            CellDirection::East => 2,
            CellDirection::West => 3,
        }
    }
}

impl SpatialCell {
    /// Validate a code. Fails with `InvalidCellCode` for an empty code or a
    /// character outside the alphabet.
    pub fn parse(code: &str) -> Result<Self> {
        if code.is_empty() {
            return Err(Error::InvalidCellCode {
                code: String::new(),
                reason: "empty code".into(),
            });
        }
        if let Some(bad) = code.chars().find(|c| !c.is_ascii() || char_value(*c as u8).is_none()) {
            return Err(Error::InvalidCellCode {
                code: code.to_string(),
                reason: format!("character {bad:?} is outside the cell alphabet"),
            });
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn precision(&self) -> usize {
        self.0.len()
    }

    /// The enclosing cell one character coarser, if any.
    pub fn parent(&self) -> Option<SpatialCell> {
        (self.0.len() > 1).then(|| Self(self.0[..self.0.len() - 1].to_string()))
    }

    /// The enclosing cell at `precision`. Returns `self` unchanged when the
    /// cell is already at or above that precision.
    pub fn truncate(&self, precision: usize) -> Result<SpatialCell> {
        if precision == 0 {
            return Err(Error::InvalidPrecision(precision));
        }
        Ok(Self(self.0[..precision.min(self.0.len())].to_string()))
    }

    /// True if `other` lies inside this cell (prefix relation).
    pub fn contains(&self, other: &SpatialCell) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn bounds(&self) -> CellBounds {
        decode_bounds(self)
    }

    /// The cell one step away in `direction`, or `self` at the world edge.
    pub fn adjacent(&self, direction: CellDirection) -> SpatialCell {
        let dir = direction.table_index();
        let mut code = self.0.clone().into_bytes();
        let mut pos = code.len();

        loop {
            if pos == 0 {
                return self.clone();
            }
            pos -= 1;
            let parity = (pos + 1) % 2;
            let c = code[pos];
            let on_border = BORDERS[dir][parity].contains(&c);
            if let Some(i) = NEIGHBORS[dir][parity].iter().position(|&t| t == c) {
                code[pos] = ALPHABET[i];
            }
            if !on_border {
                break;
            }
        }

        Self(code.into_iter().map(char::from).collect())
    }

    /// Self plus the eight surrounding cells, ordered
    /// self, N, S, E, W, NE, NW, SE, SW.
    pub fn neighbors(&self) -> [SpatialCell; 9] {
        let n = self.adjacent(CellDirection::North);
        let s = self.adjacent(CellDirection::South);
        let e = self.adjacent(CellDirection::East);
        let w = self.adjacent(CellDirection::West);
        let ne = n.adjacent(CellDirection::East);
        let nw = n.adjacent(CellDirection::West);
        let se = s.adjacent(CellDirection::East);
        let sw = s.adjacent(CellDirection::West);
        [self.clone(), n, s, e, w, ne, nw, se, sw]
    }
}

impl fmt::Display for SpatialCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SpatialCell {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SpatialCell {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<SpatialCell> for String {
    fn from(cell: SpatialCell) -> String {
        cell.0
    }
}

impl AsRef<str> for SpatialCell {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Encode / decode
// ============================================================================

/// Encode a coordinate at `precision` characters.
pub fn encode(coord: Coordinate, precision: usize) -> Result<SpatialCell> {
    if precision == 0 {
        return Err(Error::InvalidPrecision(precision));
    }

    let (mut lat_lo, mut lat_hi) = (-90.0_f64, 90.0_f64);
    let (mut lng_lo, mut lng_hi) = (-180.0_f64, 180.0_f64);
    let mut code = String::with_capacity(precision);
    let mut value = 0usize;
    let mut bits = 0u8;
    let mut lng_turn = true;

    while code.len() < precision {
        if lng_turn {
            let mid = (lng_lo + lng_hi) / 2.0;
            if coord.longitude >= mid {
                value = value * 2 + 1;
                lng_lo = mid;
            } else {
                value *= 2;
                lng_hi = mid;
            }
        } else {
            let mid = (lat_lo + lat_hi) / 2.0;
            if coord.latitude >= mid {
                value = value * 2 + 1;
                lat_lo = mid;
            } else {
                value *= 2;
                lat_hi = mid;
            }
        }
        lng_turn = !lng_turn;

        bits += 1;
        if bits == 5 {
            code.push(ALPHABET[value] as char);
            bits = 0;
            value = 0;
        }
    }

    Ok(SpatialCell(code))
}

/// Bounding box of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl CellBounds {
    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.south + self.north) / 2.0,
            longitude: (self.west + self.east) / 2.0,
        }
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, coord: Coordinate) -> bool {
        (self.south..=self.north).contains(&coord.latitude)
            && (self.west..=self.east).contains(&coord.longitude)
    }
}

pub fn decode_bounds(cell: &SpatialCell) -> CellBounds {
    let (mut south, mut north) = (-90.0_f64, 90.0_f64);
    let (mut west, mut east) = (-180.0_f64, 180.0_f64);
    let mut lng_turn = true;

    for c in cell.0.bytes() {
        let value = char_value(c).unwrap_or(0);
        for shift in (0..5).rev() {
            let bit = (value >> shift) & 1;
            if lng_turn {
                let mid = (west + east) / 2.0;
                if bit == 1 { west = mid } else { east = mid }
            } else {
                let mid = (south + north) / 2.0;
                if bit == 1 { south = mid } else { north = mid }
            }
            lng_turn = !lng_turn;
        }
    }

    CellBounds { south, west, north, east }
}

/// 9-cell neighbourhood of a raw code.
pub fn neighbors_of(code: &str) -> Result<[SpatialCell; 9]> {
    Ok(SpatialCell::parse(code)?.neighbors())
}

// ============================================================================
// Precision selection
// ============================================================================

/// Cell `(width, height)` in meters at `precision`, measured at `latitude`.
pub fn cell_dimensions(precision: usize, latitude: f64) -> (f64, f64) {
    let bits = 5 * precision as i32;
    let lng_bits = (bits + 1) / 2;
    let lat_bits = bits / 2;
    let width_deg = 360.0 / 2f64.powi(lng_bits);
    let height_deg = 180.0 / 2f64.powi(lat_bits);
    let meters_per_deg = EARTH_RADIUS_M.to_radians();
    let width = width_deg * meters_per_deg * latitude.to_radians().cos().max(0.0);
    (width, height_deg * meters_per_deg)
}

/// Finest precision whose 3×3 neighbourhood covers a circle of `radius_m`
/// centred anywhere in the middle cell. Width is taken at the poleward
/// edge of the neighbourhood. Falls back to precision 1.
pub fn query_precision_for_radius(radius_m: f64, latitude: f64) -> usize {
    (1..=MAX_QUERY_PRECISION)
        .rev()
        .find(|&p| {
            let (_, height) = cell_dimensions(p, 0.0);
            let height_deg = height / EARTH_RADIUS_M.to_radians();
            let edge_lat = (latitude.abs() + 1.5 * height_deg).min(90.0);
            let (width, _) = cell_dimensions(p, edge_lat);
            width >= radius_m && height >= radius_m
        })
        .unwrap_or(1)
}

// ============================================================================
// Range fan-out
// ============================================================================

/// Half-open key range `[start, end)` matching every code that has the
/// cell as a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: String,
    pub end: String,
}

impl CellRange {
    pub fn for_cell(cell: &SpatialCell) -> Self {
        let mut end = cell.0.clone();
        end.push(RANGE_SENTINEL);
        Self { start: cell.0.clone(), end }
    }

    pub fn contains(&self, code: &str) -> bool {
        code >= self.start.as_str() && code < self.end.as_str()
    }

    /// One range per valid, distinct code. Invalid codes are logged and
    /// skipped so a single bad cell cannot fail the whole query.
    pub fn fan_out<I, S>(codes: I) -> SmallVec<[CellRange; 9]>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranges: SmallVec<[CellRange; 9]> = SmallVec::new();
        for code in codes {
            match SpatialCell::parse(code.as_ref()) {
                Ok(cell) => {
                    let range = Self::for_cell(&cell);
                    if !ranges.contains(&range) {
                        ranges.push(range);
                    }
                }
                Err(e) => warn!(error = %e, "dropping cell from range fan-out"),
            }
        }
        ranges
    }
}

/// Range scans covering the 9-cell neighbourhood of `center` at `precision`.
pub fn query_ranges(center: Coordinate, precision: usize) -> Result<SmallVec<[CellRange; 9]>> {
    let cell = encode(center, precision)?;
    Ok(CellRange::fan_out(cell.neighbors().iter().map(SpatialCell::as_str)))
}
