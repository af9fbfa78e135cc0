//! The terrain grid and the knowledge-conditioned path search.
//!
//! A [`Map`] is a rectangular hex grid of [`Field`] values stored row-major
//! in a flat vector. Every access goes through a bounds check that returns
//! [`WorldError::OutOfBounds`] instead of indexing blindly.
//!
//! [`Map::search_path`] plans a route for an agent using only what that
//! agent believes (its [`Knowledge`]), never the true terrain. When the
//! requested end is not reachable through believed-safe territory the search
//! falls back to the best exploration frontier, and failing that to the
//! deepest cell it managed to reach.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use forage_types::{Coord, Dimensions, Field};
use tracing::debug;

use crate::error::WorldError;
use crate::hex;
use crate::knowledge::Knowledge;

/// Edge cost of stepping onto a cell that is not known-positive.
pub const STEP_COST: i64 = 50;

/// Extra edge cost of stepping onto a known-negative cell.
pub const NEGATIVE_PENALTY: i64 = 100_000_000;

/// Routes costing more than this are considered risky by agents.
pub const RISK_COST_THRESHOLD: i64 = 1_000_000;

/// Which candidate goal a [`PathPlan`] leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathTier {
    /// The requested end cell.
    Target,
    /// The cheapest reached cell the agent has no belief about.
    Frontier,
    /// The cell reached in the deepest expansion wave.
    Farthest,
}

/// The result of [`Map::search_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPlan {
    /// Hops from the goal back toward the start; the start is excluded, so
    /// the next hop is the *last* element.
    pub path: Vec<Coord>,
    /// Accumulated edge cost from the start to the goal.
    pub total_cost: i64,
    /// Which candidate the path leads to.
    pub tier: PathTier,
}

impl PathPlan {
    /// Whether the route is expensive enough to be refused.
    pub const fn is_risky(&self) -> bool {
        self.total_cost > RISK_COST_THRESHOLD
    }
}

/// Priority queue entry; ordered by priority, then expansion wave, then
/// insertion sequence so that equal entries pop in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    priority: i64,
    wave: u32,
    seq: u64,
    coord: Coord,
}

/// A goal candidate seen while the queue drained.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    coord: Coord,
    priority: i64,
    wave: u32,
}

/// Rectangular hex grid of terrain cells with a single home cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    cells: Vec<Field>,
    dimensions: Dimensions,
    home: Coord,
}

impl Map {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Parse a map from its text form: one line per row, one character per
    /// cell (`.` empty, `F` food, `W` water, `T` danger, `X` blocked,
    /// `P` population).
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyMap`] when there are no cells,
    /// [`WorldError::MalformedSource`] for unknown characters,
    /// [`WorldError::RaggedRow`] when rows differ in width,
    /// [`WorldError::MissingHome`] / [`WorldError::DuplicateHome`] unless
    /// exactly one `P` is present, and [`WorldError::Oversized`] when the
    /// grid cannot be addressed with `i32` coordinates.
    pub fn load(source: &str) -> Result<Self, WorldError> {
        let mut lines: Vec<&str> = source
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }

        let width = lines.first().map_or(0, |line| line.chars().count());
        if width == 0 {
            return Err(WorldError::EmptyMap);
        }
        let (Ok(rows), Ok(cols)) = (i32::try_from(lines.len()), i32::try_from(width)) else {
            return Err(WorldError::Oversized {
                rows: lines.len(),
                cols: width,
            });
        };

        let dimensions = Dimensions::new(rows, cols);
        let mut cells = Vec::with_capacity(dimensions.area());
        let mut home: Option<Coord> = None;

        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(WorldError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for (col, symbol) in line.chars().enumerate() {
                let field = Field::from_symbol(symbol).ok_or(WorldError::MalformedSource {
                    row,
                    col,
                    found: symbol,
                })?;
                if field == Field::Population {
                    // Both indices were bounded by the i32 check above.
                    let here = Coord::new(
                        i32::try_from(row).unwrap_or(i32::MAX),
                        i32::try_from(col).unwrap_or(i32::MAX),
                    );
                    if let Some(first) = home {
                        return Err(WorldError::DuplicateHome {
                            first,
                            second: here,
                        });
                    }
                    home = Some(here);
                }
                cells.push(field);
            }
        }

        let home = home.ok_or(WorldError::MissingHome)?;
        debug!(%dimensions, %home, "map loaded");

        Ok(Self {
            cells,
            dimensions,
            home,
        })
    }

    /// Read and parse a map file.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] if the file cannot be read, otherwise any
    /// error of [`Map::load`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&source)
    }

    // -----------------------------------------------------------------------
    // Cell access
    // -----------------------------------------------------------------------

    fn index(&self, coord: Coord) -> Result<usize, WorldError> {
        let out_of_bounds = || WorldError::OutOfBounds {
            coord,
            dimensions: self.dimensions,
        };
        if !self.dimensions.contains(coord) {
            return Err(out_of_bounds());
        }
        let row = usize::try_from(coord.row).map_err(|_| out_of_bounds())?;
        let col = usize::try_from(coord.col).map_err(|_| out_of_bounds())?;
        let cols = usize::try_from(self.dimensions.cols).map_err(|_| out_of_bounds())?;
        Ok(row.saturating_mul(cols).saturating_add(col))
    }

    /// Terrain at `coord`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] outside the grid.
    pub fn get_field(&self, coord: Coord) -> Result<Field, WorldError> {
        let idx = self.index(coord)?;
        self.cells.get(idx).copied().ok_or(WorldError::OutOfBounds {
            coord,
            dimensions: self.dimensions,
        })
    }

    /// Overwrite the terrain at `coord`, returning the previous kind.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] outside the grid and
    /// [`WorldError::HomeImmutable`] when the change would alter the home
    /// cell or create a second one.
    pub fn change_field(&mut self, coord: Coord, field: Field) -> Result<Field, WorldError> {
        let is_home = coord == self.home;
        if is_home != (field == Field::Population) {
            return Err(WorldError::HomeImmutable(coord));
        }
        let idx = self.index(coord)?;
        let dimensions = self.dimensions;
        let slot = self
            .cells
            .get_mut(idx)
            .ok_or(WorldError::OutOfBounds { coord, dimensions })?;
        Ok(std::mem::replace(slot, field))
    }

    /// Whether `coord` lies on the grid.
    pub const fn in_bounds(&self, coord: Coord) -> bool {
        self.dimensions.contains(coord)
    }

    /// In-bounds hex neighbours of `coord` (up to six).
    pub fn neighbors(&self, coord: Coord) -> Vec<Coord> {
        hex::hex_offsets(coord)
            .into_iter()
            .filter(|c| self.in_bounds(*c))
            .collect()
    }

    /// Grid extent.
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// The home (population) cell.
    pub const fn start(&self) -> Coord {
        self.home
    }

    /// Number of cells.
    pub const fn area(&self) -> usize {
        self.cells.len()
    }

    /// Every cell with its terrain, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, Field)> + '_ {
        let cols = self.dimensions.cols.max(1);
        (0_i32..).zip(self.cells.iter()).map(move |(i, field)| {
            (Coord::new(i.wrapping_div(cols), i.wrapping_rem(cols)), *field)
        })
    }

    /// Number of cells of kind `field`.
    pub fn count(&self, field: Field) -> usize {
        self.cells.iter().filter(|f| **f == field).count()
    }

    // -----------------------------------------------------------------------
    // Path search
    // -----------------------------------------------------------------------

    /// Whether the search may step onto `coord`: not known-blocked, and
    /// either known itself or next to a known cell.
    fn is_expandable(&self, coord: Coord, knowledge: &Knowledge) -> bool {
        !knowledge.is_blocked(coord)
            && (knowledge.is_known(coord)
                || self
                    .neighbors(coord)
                    .into_iter()
                    .any(|near| knowledge.is_known(near)))
    }

    /// Cost of stepping onto `coord`.
    fn edge_cost(coord: Coord, knowledge: &Knowledge) -> i64 {
        let mut cost: i64 = 0;
        if !knowledge.is_positive(coord) {
            cost = cost.saturating_add(STEP_COST);
        }
        if knowledge.is_negative(coord) {
            cost = cost.saturating_add(NEGATIVE_PENALTY);
        }
        cost
    }

    /// Plan a route from `start` to `end` through the territory `knowledge`
    /// believes in.
    ///
    /// Best-first search ordered by accumulated cost plus the straight-line
    /// distance to `end`. Three goals are tracked while the queue drains:
    /// `end` itself, the cheapest popped cell without a known value, and the
    /// cell popped in the deepest wave. The first of these that was reached
    /// becomes the destination. Never fails for in-bounds endpoints; an
    /// empty path means "stay".
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if either endpoint is off the grid.
    pub fn search_path(
        &self,
        start: Coord,
        end: Coord,
        knowledge: &Knowledge,
    ) -> Result<PathPlan, WorldError> {
        for endpoint in [start, end] {
            if !self.in_bounds(endpoint) {
                return Err(WorldError::OutOfBounds {
                    coord: endpoint,
                    dimensions: self.dimensions,
                });
            }
        }

        let mut costs: BTreeMap<Coord, i64> = BTreeMap::new();
        let mut parent: BTreeMap<Coord, Coord> = BTreeMap::new();
        let mut queue: BTreeSet<QueueEntry> = BTreeSet::new();
        let mut seq: u64 = 0;

        costs.insert(start, 0);
        queue.insert(QueueEntry {
            priority: 0,
            wave: 0,
            seq,
            coord: start,
        });

        let mut target: Option<Coord> = None;
        let mut frontier: Option<Candidate> = None;
        let mut farthest: Option<Candidate> = None;

        while let Some(top) = queue.pop_first() {
            if top.coord == end {
                target = Some(top.coord);
                break;
            }
            let seen = Candidate {
                coord: top.coord,
                priority: top.priority,
                wave: top.wave,
            };
            if !knowledge.is_known(top.coord)
                && frontier.is_none_or(|best| top.priority < best.priority)
            {
                frontier = Some(seen);
            }
            if farthest.is_none_or(|best| {
                best.wave < top.wave || (best.wave == top.wave && top.priority < best.priority)
            }) {
                farthest = Some(seen);
            }

            let Some(&base) = costs.get(&top.coord) else {
                continue;
            };
            for next in self.neighbors(top.coord) {
                if !self.is_expandable(next, knowledge) {
                    continue;
                }
                let cost = base.saturating_add(Self::edge_cost(next, knowledge));
                if costs.get(&next).is_some_and(|&known| known <= cost) {
                    continue;
                }
                costs.insert(next, cost);
                parent.insert(next, top.coord);
                seq = seq.saturating_add(1);
                queue.insert(QueueEntry {
                    priority: cost.saturating_add(i64::from(hex::straight_line_distance(next, end))),
                    wave: top.wave.saturating_add(1),
                    seq,
                    coord: next,
                });
            }
        }

        let (goal, tier) = if let Some(coord) = target {
            (coord, PathTier::Target)
        } else if let Some(best) = frontier {
            (best.coord, PathTier::Frontier)
        } else if let Some(best) = farthest {
            (best.coord, PathTier::Farthest)
        } else {
            (start, PathTier::Farthest)
        };

        let total_cost = costs.get(&goal).copied().unwrap_or(0);
        let path = Self::reconstruct(&parent, start, goal, self.area());
        debug!(%start, %end, %goal, ?tier, total_cost, hops = path.len(), "path planned");

        Ok(PathPlan {
            path,
            total_cost,
            tier,
        })
    }

    /// Follow back-pointers from `goal` to `start`, goal first.
    fn reconstruct(
        parent: &BTreeMap<Coord, Coord>,
        start: Coord,
        goal: Coord,
        limit: usize,
    ) -> Vec<Coord> {
        let mut path = Vec::new();
        let mut cursor = goal;
        while cursor != start && path.len() <= limit {
            path.push(cursor);
            match parent.get(&cursor) {
                Some(&prev) => cursor = prev,
                None => break,
            }
        }
        path
    }
}

impl core::fmt::Display for Map {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let cols = usize::try_from(self.dimensions.cols).unwrap_or(1).max(1);
        for row in self.cells.chunks(cols) {
            for field in row {
                write!(f, "{}", field.symbol())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
