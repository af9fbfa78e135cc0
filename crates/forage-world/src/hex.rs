//! Hex coordinate math.
//!
//! Cells use the odd-row-shifted offset layout of [`Coord`]. Pixel space is
//! the renderer's: cells are [`HEX_RADIUS`] pixels apart along a row and rows
//! are `HEX_RADIUS - 4` pixels apart, so horizontally adjacent cells are 44
//! pixels apart and diagonal neighbours 45. The same metric drives the path
//! heuristic and the knowledge-sharing radius.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use forage_types::Coord;

/// Pixel spacing between two cells of a row (`ceil(sqrt(3) * 25)`).
pub const HEX_RADIUS: f64 = 44.0;

/// Vertical overlap between rows, in pixels.
const ROW_OVERLAP: f64 = 4.0;

/// Tolerance used when comparing belief values.
pub const FLOAT_TOLERANCE: f64 = 1e-7;

/// Fraction of the source value carried by each cell of a distributed place.
pub const DISTRIBUTED_SHARE: f64 = 0.1;

/// A point in renderer pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

/// The six neighbours of `coord`, without bounds filtering.
///
/// Order: west, east, the two cells of the row above, the two cells of the
/// row below.
pub const fn hex_offsets(coord: Coord) -> [Coord; 6] {
    let shift = coord.parity();
    [
        coord.offset(0, -1),
        coord.offset(0, 1),
        coord.offset(-1, shift - 1),
        coord.offset(-1, shift),
        coord.offset(1, shift - 1),
        coord.offset(1, shift),
    ]
}

/// Whether `a` and `b` are hex neighbours.
pub fn are_adjacent(a: Coord, b: Coord) -> bool {
    hex_offsets(a).contains(&b)
}

/// Top-left pixel position of a cell for a renderer using `radius`.
pub fn hex_to_pixel(radius: f64, coord: Coord) -> PixelPoint {
    PixelPoint {
        x: (f64::from(coord.col) + 0.5 * f64::from(coord.parity())) * radius,
        y: f64::from(coord.row) * (radius - ROW_OVERLAP),
    }
}

/// Cell under a pixel position for a renderer using `radius`.
#[allow(clippy::cast_possible_truncation)]
pub fn pixel_to_hex(radius: f64, point: PixelPoint) -> Coord {
    let row = (point.y / (radius - ROW_OVERLAP)).floor() as i32;
    let shift = f64::from(row.rem_euclid(2));
    let col = (point.x / radius - 0.5 * shift).floor() as i32;
    Coord::new(row, col)
}

/// Euclidean pixel distance between the centres of two cells.
pub fn pixel_distance(a: Coord, b: Coord) -> f64 {
    let pa = hex_to_pixel(HEX_RADIUS, a);
    let pb = hex_to_pixel(HEX_RADIUS, b);
    (pa.x - pb.x).hypot(pa.y - pb.y)
}

/// Truncated pixel distance; the heuristic of the path search.
#[allow(clippy::cast_possible_truncation)]
pub fn straight_line_distance(a: Coord, b: Coord) -> i32 {
    pixel_distance(a, b) as i32
}

/// Cells sampled along the straight line from `from` toward `to`.
///
/// One sample per unit of grid distance, starting at `from` and stopping
/// short of `to`. Samples are truncated to whole cells and deduplicated;
/// the result is sorted. Identical endpoints yield an empty line.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn line_between(from: Coord, to: Coord) -> Vec<Coord> {
    let d_row = f64::from(to.row) - f64::from(from.row);
    let d_col = f64::from(to.col) - f64::from(from.col);
    let length = d_row.hypot(d_col);
    if length < FLOAT_TOLERANCE {
        return Vec::new();
    }
    let step_row = d_row / length;
    let step_col = d_col / length;
    let samples = length as u32;

    let mut cells = BTreeSet::new();
    for i in 0..samples {
        let t = f64::from(i);
        cells.insert(from.offset((step_row * t) as i32, (step_col * t) as i32));
    }
    cells.into_iter().collect()
}

/// Spread `value` over every cell within `radius - 1` hex steps of `center`.
///
/// Each reached cell (the centre included) receives a tenth of `value`. A
/// radius of zero reaches nothing. Cells are not bounds-checked; callers
/// that care filter them against the map.
pub fn distribute_point(center: Coord, radius: u32, value: f64) -> Vec<(Coord, f64)> {
    let share = value * DISTRIBUTED_SHARE;
    let mut reached: BTreeMap<Coord, f64> = BTreeMap::new();
    let mut queue = VecDeque::new();
    queue.push_back((center, 0_u32));

    while let Some((cell, depth)) = queue.pop_front() {
        if depth >= radius || reached.contains_key(&cell) {
            continue;
        }
        reached.insert(cell, share);
        for next in hex_offsets(cell) {
            queue.push_back((next, depth.saturating_add(1)));
        }
    }

    reached.into_iter().collect()
}

/// Float comparison with [`FLOAT_TOLERANCE`].
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < FLOAT_TOLERANCE
}
