//! Open Location Code ("plus code") labels.
//!
//! Human-readable place labels such as `849VQHQV+52`, shown next to a
//! post's coordinate. Only the pair section is produced (at most ten
//! digits, roughly 14 m × 14 m); the refinement grid is never needed for
//! display.

use crate::model::Coordinate;
use crate::{Error, Result};

const ALPHABET: &[u8; 20] = b"23456789CFGHJMPQRVWX";
const SEPARATOR: char = '+';
const SEPARATOR_POSITION: usize = 8;
const PADDING: char = '0';

/// Digits in a full-precision pair code.
pub const PLUS_CODE_LENGTH: usize = 10;

/// Pair resolution in 1/8000ths of a degree.
const PAIR_PRECISION: i64 = 8_000;
/// Full-code resolutions (pairs refined by a 5×4 grid five times).
const LAT_GRID: i64 = PAIR_PRECISION * 3_125;
const LNG_GRID: i64 = PAIR_PRECISION * 1_024;
const BASE: i64 = 20;
const PAIRS: usize = PLUS_CODE_LENGTH / 2;

/// Encode at `length` digits: an even number from 2 to 10.
///
/// Codes shorter than eight digits are padded with `0` up to the separator,
/// e.g. `849V0000+`.
pub fn encode_plus_code(coord: Coordinate, length: usize) -> Result<String> {
    if length < 2 || length > PLUS_CODE_LENGTH || length % 2 != 0 {
        return Err(Error::InvalidPrecision(length));
    }

    // Round at grid resolution first so values like 57.592499999 land on
    // the pair boundary they denote.
    let lat_grid = ((coord.latitude + 90.0) * LAT_GRID as f64).round() as i64;
    let lng_grid = ((coord.longitude + 180.0) * LNG_GRID as f64).round() as i64;
    let mut lat = lat_grid.clamp(0, 180 * LAT_GRID - 1) / (LAT_GRID / PAIR_PRECISION);
    let mut lng = lng_grid.rem_euclid(360 * LNG_GRID) / (LNG_GRID / PAIR_PRECISION);

    // Least significant pair first
    let mut digits = [0u8; PLUS_CODE_LENGTH];
    for pair in (0..PAIRS).rev() {
        digits[pair * 2] = ALPHABET[(lat % BASE) as usize];
        digits[pair * 2 + 1] = ALPHABET[(lng % BASE) as usize];
        lat /= BASE;
        lng /= BASE;
    }

    let mut code = String::with_capacity(PLUS_CODE_LENGTH + 1);
    for (i, &d) in digits.iter().enumerate().take(length) {
        if i == SEPARATOR_POSITION {
            code.push(SEPARATOR);
        }
        code.push(char::from(d));
    }
    while code.len() < SEPARATOR_POSITION {
        code.push(PADDING);
    }
    if length <= SEPARATOR_POSITION {
        code.push(SEPARATOR);
    }

    Ok(code)
}

/// Ten-digit plus code of `coord`.
pub fn plus_code(coord: Coordinate) -> String {
    // Every valid coordinate encodes at the fixed length
    encode_plus_code(coord, PLUS_CODE_LENGTH).unwrap_or_default()
}
