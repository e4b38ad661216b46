//! Geospatial primitives: great-circle distance, spatial cell codes and
//! plus-code labels.

pub mod distance;
pub mod cell;
pub mod plus_code;

pub use distance::{distance, EARTH_RADIUS_M};
pub use plus_code::{encode_plus_code, plus_code, PLUS_CODE_LENGTH};
pub use cell::{
    encode, decode_bounds, neighbors_of, cell_dimensions, query_precision_for_radius,
    query_ranges, CellBounds, CellDirection, CellRange, SpatialCell,
    ALPHABET, DEFAULT_QUERY_PRECISION, STORAGE_PRECISION,
};
