use serde::{Deserialize, Serialize};

/// Concentration stored for wall cells and returned for any lookup outside the active set.
pub const WALL_SENTINEL: f32 = -1.0;

/// Classification of a grid cell. Fixed once the grid is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Wall,
    Open,
    Source,
    Sink,
}

impl CellKind {
    pub fn is_wall(self) -> bool {
        self == CellKind::Wall
    }
}

/// A tile as handed over by the map loader.
///
/// `Empty` and `Full` both become `Open` cells; they differ only in the seed
/// concentration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    Wall,
    Empty,
    Full,
    Source,
    Sink,
}

impl Tile {
    pub fn kind(self) -> CellKind {
        match self {
            Tile::Wall => CellKind::Wall,
            Tile::Empty | Tile::Full => CellKind::Open,
            Tile::Source => CellKind::Source,
            Tile::Sink => CellKind::Sink,
        }
    }

    /// Initial concentration for a cell built from this tile.
    pub fn seed_concentration(self) -> f32 {
        match self {
            Tile::Wall => WALL_SENTINEL,
            Tile::Empty | Tile::Sink => 0.0,
            Tile::Full | Tile::Source => 1.0,
        }
    }

    pub fn from_char(c: char) -> Option<Option<Tile>> {
        match c {
            '#' => Some(Some(Tile::Wall)),
            '.' => Some(Some(Tile::Empty)),
            '*' => Some(Some(Tile::Full)),
            'S' => Some(Some(Tile::Source)),
            'K' => Some(Some(Tile::Sink)),
            ' ' => Some(None),
            _ => None,
        }
    }

    pub fn to_char(tile: Option<Tile>) -> char {
        match tile {
            Some(Tile::Wall) => '#',
            Some(Tile::Empty) => '.',
            Some(Tile::Full) => '*',
            Some(Tile::Source) => 'S',
            Some(Tile::Sink) => 'K',
            None => ' ',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_tiles_share_a_kind_but_not_a_seed() {
        assert_eq!(Tile::Empty.kind(), CellKind::Open);
        assert_eq!(Tile::Full.kind(), CellKind::Open);
        assert!((Tile::Empty.seed_concentration() - 0.0).abs() < f32::EPSILON);
        assert!((Tile::Full.seed_concentration() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn wall_seed_is_sentinel() {
        assert_eq!(Tile::Wall.seed_concentration(), WALL_SENTINEL);
        assert!(Tile::Wall.kind().is_wall());
    }

    #[test]
    fn char_mapping_round_trips_known_symbols() {
        for c in ['#', '.', '*', 'S', 'K', ' '] {
            let tile = Tile::from_char(c).expect("known symbol");
            assert_eq!(Tile::to_char(tile), c);
        }
        assert!(Tile::from_char('?').is_none());
    }
}
