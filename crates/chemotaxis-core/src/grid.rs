//! 2D concentration grid with fixed cell classification and precomputed
//! 4-connected adjacency between non-wall cells.
//!
//! Every lookup is fail-closed: coordinates outside the active set read as
//! `CellKind::Wall` with concentration `WALL_SENTINEL`.

use crate::cell::{CellKind, WALL_SENTINEL};
use crate::map::TileMap;
use std::{error::Error, fmt};

/// Integer cell coordinate. Signed so that off-grid neighbors can be expressed.
pub type CellCoord = [i64; 2];

const NEIGHBOR_OFFSETS: [[i64; 2]; 4] = [[1, 0], [0, 1], [-1, 0], [0, -1]];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    EmptyMap,
    TileCountMismatch { expected: usize, actual: usize },
    TooLarge { max: usize, actual: usize },
    UnknownTile { row: usize, column: usize, symbol: char },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::EmptyMap => write!(f, "map must have non-zero width and height"),
            GridError::TileCountMismatch { expected, actual } => write!(
                f,
                "tile count ({actual}) must match width * height ({expected})"
            ),
            GridError::TooLarge { max, actual } => {
                write!(f, "cell count ({actual}) exceeds supported maximum ({max})")
            }
            GridError::UnknownTile {
                row,
                column,
                symbol,
            } => write!(f, "unknown tile symbol {symbol:?} at row {row}, column {column}"),
        }
    }
}

impl Error for GridError {}

/// Up to four non-wall neighbors, stored inline as flat cell indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpenNeighbors {
    cells: [usize; 4],
    len: u8,
}

impl OpenNeighbors {
    fn push(&mut self, index: usize) {
        self.cells[self.len as usize] = index;
        self.len += 1;
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.cells[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A non-wall cell participating in diffusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveCell {
    pub index: usize,
    pub kind: CellKind,
    pub neighbors: OpenNeighbors,
}

#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    kinds: Vec<CellKind>,
    concentration: Vec<f32>,
    active: Vec<ActiveCell>,
    active_slot: Vec<Option<usize>>,
}

impl Grid {
    pub const MAX_CELLS: usize = 1 << 24;

    pub fn new(map: &TileMap) -> Result<Self, GridError> {
        let (width, height) = (map.width(), map.height());
        if width == 0 || height == 0 {
            return Err(GridError::EmptyMap);
        }
        let len = width * height;
        if len > Self::MAX_CELLS {
            return Err(GridError::TooLarge {
                max: Self::MAX_CELLS,
                actual: len,
            });
        }

        let mut kinds = vec![CellKind::Wall; len];
        let mut concentration = vec![WALL_SENTINEL; len];
        for y in 0..height {
            for x in 0..width {
                if let Some(tile) = map.get(x, y) {
                    let idx = y * width + x;
                    kinds[idx] = tile.kind();
                    concentration[idx] = tile.seed_concentration();
                }
            }
        }

        let mut grid = Self {
            width,
            height,
            kinds,
            concentration,
            active: Vec::new(),
            active_slot: vec![None; len],
        };

        for idx in 0..len {
            let kind = grid.kinds[idx];
            if kind.is_wall() {
                continue;
            }
            let [x, y] = grid.coord_of(idx);
            let mut neighbors = OpenNeighbors::default();
            for [dx, dy] in NEIGHBOR_OFFSETS {
                let coord = [x + dx, y + dy];
                if !grid.classification_at(coord).is_wall() {
                    if let Some(n) = grid.index_of(coord) {
                        neighbors.push(n);
                    }
                }
            }
            grid.active_slot[idx] = Some(grid.active.len());
            grid.active.push(ActiveCell {
                index: idx,
                kind,
                neighbors,
            });
        }

        Ok(grid)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Flat row-major index for an in-bounds coordinate.
    pub fn index_of(&self, coord: CellCoord) -> Option<usize> {
        let [x, y] = coord;
        if x < 0 || y < 0 || x as u64 >= self.width as u64 || y as u64 >= self.height as u64 {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn coord_of(&self, index: usize) -> CellCoord {
        [(index % self.width) as i64, (index / self.width) as i64]
    }

    /// Cell containing a continuous point. Cell `(i, j)` covers `[i, i+1) x [j, j+1)`.
    ///
    /// Far points saturate at the `i64` bounds; NaN maps to `i64::MIN` so it never
    /// lands on the grid.
    pub fn cell_of(&self, point: [f64; 2]) -> CellCoord {
        let axis = |v: f64| if v.is_nan() { i64::MIN } else { v.floor() as i64 };
        [axis(point[0]), axis(point[1])]
    }

    pub fn cell_center(&self, coord: CellCoord) -> [f64; 2] {
        [coord[0] as f64 + 0.5, coord[1] as f64 + 0.5]
    }

    /// `Wall` for anything outside the active set.
    pub fn classification_at(&self, coord: CellCoord) -> CellKind {
        self.index_of(coord)
            .map(|idx| self.kinds[idx])
            .unwrap_or(CellKind::Wall)
    }

    /// `WALL_SENTINEL` for walls and out-of-range coordinates.
    pub fn concentration_at(&self, coord: CellCoord) -> f32 {
        match self.index_of(coord) {
            Some(idx) if !self.kinds[idx].is_wall() => self.concentration[idx],
            _ => WALL_SENTINEL,
        }
    }

    /// Remove `rate` of the concentration at `coord`. Walls and off-grid cells are untouched.
    pub fn deplete(&mut self, coord: CellCoord, rate: f32) {
        if rate == 0.0 {
            return;
        }
        if let Some(idx) = self.index_of(coord) {
            if !self.kinds[idx].is_wall() {
                let c = self.concentration[idx];
                self.concentration[idx] = c - c * rate;
            }
        }
    }

    /// Overwrite the concentration of an active cell. Returns `false` for walls and
    /// off-grid coordinates, which keep the sentinel.
    pub fn set_concentration(&mut self, coord: CellCoord, value: f32) -> bool {
        match self.index_of(coord) {
            Some(idx) if !self.kinds[idx].is_wall() => {
                self.concentration[idx] = value;
                true
            }
            _ => false,
        }
    }

    /// Non-wall cells in row-major order. Diffusion visits exactly these.
    pub fn active_cells(&self) -> &[ActiveCell] {
        &self.active
    }

    pub fn open_neighbors(&self, coord: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        self.index_of(coord)
            .and_then(|idx| self.active_slot[idx])
            .map(|slot| self.active[slot].neighbors.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&n| self.coord_of(n))
    }

    pub fn cells_of_kind(&self, kind: CellKind) -> impl Iterator<Item = CellCoord> + '_ {
        self.active
            .iter()
            .filter(move |cell| cell.kind == kind)
            .map(|cell| self.coord_of(cell.index))
    }

    pub fn source_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells_of_kind(CellKind::Source)
    }

    /// Raw row-major field, walls included as `WALL_SENTINEL`.
    pub fn concentrations(&self) -> &[f32] {
        &self.concentration
    }

    pub fn kinds(&self) -> &[CellKind] {
        &self.kinds
    }

    /// Sum over active cells.
    pub fn total_concentration(&self) -> f64 {
        self.active
            .iter()
            .map(|cell| self.concentration[cell.index] as f64)
            .sum()
    }

    pub(crate) fn field_mut(&mut self) -> &mut Vec<f32> {
        &mut self.concentration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Tile;

    fn grid(text: &str) -> Grid {
        Grid::new(&TileMap::from_ascii(text).unwrap()).unwrap()
    }

    #[test]
    fn seeds_concentration_by_tile() {
        let g = grid("#S*\n.K \n");
        assert_eq!(g.concentration_at([0, 0]), WALL_SENTINEL);
        assert!((g.concentration_at([1, 0]) - 1.0).abs() < f32::EPSILON);
        assert!((g.concentration_at([2, 0]) - 1.0).abs() < f32::EPSILON);
        assert!((g.concentration_at([0, 1]) - 0.0).abs() < f32::EPSILON);
        assert!((g.concentration_at([1, 1]) - 0.0).abs() < f32::EPSILON);
        // Missing tile is a wall.
        assert_eq!(g.concentration_at([2, 1]), WALL_SENTINEL);
        assert_eq!(g.classification_at([2, 1]), CellKind::Wall);
    }

    #[test]
    fn lookups_outside_bounds_fail_closed() {
        let g = grid("..\n..\n");
        for coord in [[-1, 0], [0, -1], [2, 0], [0, 2], [i64::MAX, i64::MIN]] {
            assert_eq!(g.classification_at(coord), CellKind::Wall);
            assert_eq!(g.concentration_at(coord), WALL_SENTINEL);
        }
    }

    #[test]
    fn open_neighbors_skip_walls_and_edges() {
        let g = grid("...\n.#.\n...\n");
        let mut corner: Vec<_> = g.open_neighbors([0, 0]).collect();
        corner.sort();
        assert_eq!(corner, vec![[0, 1], [1, 0]]);

        let mut edge: Vec<_> = g.open_neighbors([1, 0]).collect();
        edge.sort();
        assert_eq!(edge, vec![[0, 0], [2, 0]]);

        assert_eq!(g.open_neighbors([1, 1]).count(), 0);
        assert_eq!(g.open_neighbors([7, 7]).count(), 0);
    }

    #[test]
    fn adjacency_never_references_a_wall() {
        let g = grid("#.#.#\n..S..\n#K#.#\n. . .\n");
        for cell in g.active_cells() {
            assert!(!cell.kind.is_wall());
            for &n in cell.neighbors.as_slice() {
                assert!(!g.kinds()[n].is_wall());
            }
        }
    }

    #[test]
    fn active_cells_are_exactly_the_non_walls() {
        let g = grid("#.#\nS#K\n");
        let active: Vec<_> = g.active_cells().iter().map(|c| g.coord_of(c.index)).collect();
        assert_eq!(active, vec![[1, 0], [0, 1], [2, 1]]);
    }

    #[test]
    fn deplete_removes_fraction_and_spares_walls() {
        let mut g = grid("*#\n");
        g.deplete([0, 0], 0.25);
        assert!((g.concentration_at([0, 0]) - 0.75).abs() < f32::EPSILON);
        g.deplete([0, 0], 0.0);
        assert!((g.concentration_at([0, 0]) - 0.75).abs() < f32::EPSILON);
        g.deplete([1, 0], 0.5);
        g.deplete([-3, 0], 0.5);
        assert_eq!(g.concentrations()[1], WALL_SENTINEL);
    }

    #[test]
    fn set_concentration_refuses_walls() {
        let mut g = grid(".#\n");
        assert!(g.set_concentration([0, 0], 0.5));
        assert!(!g.set_concentration([1, 0], 0.5));
        assert!(!g.set_concentration([5, 0], 0.5));
        assert_eq!(g.concentration_at([1, 0]), WALL_SENTINEL);
    }

    #[test]
    fn cell_of_floors_and_center_is_half_offset() {
        let g = grid("..\n");
        assert_eq!(g.cell_of([1.99, 0.0]), [1, 0]);
        assert_eq!(g.cell_of([-0.1, 0.5]), [-1, 0]);
        assert_eq!(g.cell_center([1, 0]), [1.5, 0.5]);
    }

    #[test]
    fn cell_of_keeps_far_and_nan_points_off_grid() {
        let g = grid("..\n");
        assert_eq!(g.cell_of([1e30, -1e30]), [i64::MAX, i64::MIN]);
        assert_eq!(g.cell_of([f64::NAN, 0.5]), [i64::MIN, 0]);
        assert_eq!(g.classification_at(g.cell_of([f64::NAN, 0.5])), CellKind::Wall);
    }

    #[test]
    fn total_ignores_wall_sentinels() {
        let g = Grid::new(&TileMap::filled(3, 3, Tile::Full).unwrap()).unwrap();
        assert!((g.total_concentration() - 9.0).abs() < 1e-9);
        let walled = grid("*#*\n");
        assert!((walled.total_concentration() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn lists_sources() {
        let g = grid("S.S\n.K.\n");
        let sources: Vec<_> = g.source_cells().collect();
        assert_eq!(sources, vec![[0, 0], [2, 0]]);
        assert_eq!(g.cells_of_kind(CellKind::Sink).count(), 1);
    }
}
