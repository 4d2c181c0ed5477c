use crate::cell::Tile;
use crate::grid::GridError;

/// Per-cell tile layout covering the full grid bounds, row-major with `y` as the row.
///
/// `None` means no tile was placed there; the grid treats it as a wall.
#[derive(Clone, Debug, PartialEq)]
pub struct TileMap {
    width: usize,
    height: usize,
    tiles: Vec<Option<Tile>>,
}

impl TileMap {
    pub fn new(width: usize, height: usize, tiles: Vec<Option<Tile>>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyMap);
        }
        let expected = width.checked_mul(height).ok_or(GridError::TooLarge {
            max: crate::grid::Grid::MAX_CELLS,
            actual: usize::MAX,
        })?;
        if expected > crate::grid::Grid::MAX_CELLS {
            return Err(GridError::TooLarge {
                max: crate::grid::Grid::MAX_CELLS,
                actual: expected,
            });
        }
        if tiles.len() != expected {
            return Err(GridError::TileCountMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Map where every cell carries the same tile.
    pub fn filled(width: usize, height: usize, tile: Tile) -> Result<Self, GridError> {
        Self::new(width, height, vec![Some(tile); width.saturating_mul(height)])
    }

    /// Parse the text layout: one line per row, first line is `y = 0`.
    ///
    /// `#` wall, `.` empty, `*` full, `S` source, `K` sink, space for no tile.
    /// Short rows are padded with no tile.
    pub fn from_ascii(text: &str) -> Result<Self, GridError> {
        let rows: Vec<&str> = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .collect();
        // Trailing blank lines carry no tiles.
        let height = rows
            .iter()
            .rposition(|row| !row.trim().is_empty())
            .map(|last| last + 1)
            .unwrap_or(0);
        let width = rows[..height]
            .iter()
            .map(|row| row.chars().count())
            .max()
            .unwrap_or(0);
        if width == 0 || height == 0 {
            return Err(GridError::EmptyMap);
        }

        let mut tiles = vec![None; width.saturating_mul(height)];
        for (y, row) in rows[..height].iter().enumerate() {
            for (x, symbol) in row.chars().enumerate() {
                let tile = Tile::from_char(symbol).ok_or(GridError::UnknownTile {
                    row: y,
                    column: x,
                    symbol,
                })?;
                tiles[y * width + x] = tile;
            }
        }
        Self::new(width, height, tiles)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, tile: Option<Tile>) {
        if x < self.width && y < self.height {
            self.tiles[y * self.width + x] = tile;
        }
    }

    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for row in self.tiles.chunks(self.width) {
            out.extend(row.iter().map(|&t| Tile::to_char(t)));
            out.push('\n');
        }
        out
    }
}
