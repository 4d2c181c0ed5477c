use crate::grid::Grid;
use rstar::RTree;

/// Build an R*-tree over the centers of all source cells via bulk_load.
pub fn build_source_index(grid: &Grid) -> RTree<[f64; 2]> {
    let centers: Vec<[f64; 2]> = grid
        .source_cells()
        .map(|cell| grid.cell_center(cell))
        .collect();
    RTree::bulk_load(centers)
}

/// Euclidean distance from `point` to the closest source center, if any source exists.
pub fn nearest_source_distance(tree: &RTree<[f64; 2]>, point: [f64; 2]) -> Option<f64> {
    tree.nearest_neighbor(&point).map(|source| {
        let dx = source[0] - point[0];
        let dy = source[1] - point[1];
        (dx * dx + dy * dy).sqrt()
    })
}

/// Mean nearest-source distance over `points`. `None` without sources or points.
pub fn mean_nearest_source_distance(
    tree: &RTree<[f64; 2]>,
    points: impl IntoIterator<Item = [f64; 2]>,
) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for point in points {
        sum += nearest_source_distance(tree, point)?;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TileMap;

    #[test]
    fn finds_closest_source_center() {
        let grid = Grid::new(&TileMap::from_ascii("S....\n.....\n....S\n").unwrap()).unwrap();
        let tree = build_source_index(&grid);
        assert_eq!(tree.size(), 2);
        let d = nearest_source_distance(&tree, [0.5, 2.5]).unwrap();
        assert!((d - 2.0).abs() < 1e-12);
        let d = nearest_source_distance(&tree, [4.5, 1.5]).unwrap();
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn no_sources_means_no_distance() {
        let grid = Grid::new(&TileMap::from_ascii("...\n").unwrap()).unwrap();
        let tree = build_source_index(&grid);
        assert!(nearest_source_distance(&tree, [0.0, 0.0]).is_none());
        assert!(mean_nearest_source_distance(&tree, [[0.0, 0.0]]).is_none());
    }

    #[test]
    fn mean_distance_averages_points() {
        let grid = Grid::new(&TileMap::from_ascii("S..\n").unwrap()).unwrap();
        let tree = build_source_index(&grid);
        let mean = mean_nearest_source_distance(&tree, [[1.5, 0.5], [2.5, 0.5]]).unwrap();
        assert!((mean - 1.5).abs() < 1e-12);
        assert!(mean_nearest_source_distance(&tree, std::iter::empty()).is_none());
    }
}
