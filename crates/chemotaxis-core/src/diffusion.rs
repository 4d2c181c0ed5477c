//! Discrete diffusion over the active cells of a [`Grid`].
//!
//! Each step reads the field as it stood before the step and writes into a
//! separate buffer, which is swapped in once the pass is complete.

use crate::cell::CellKind;
use crate::grid::{ActiveCell, Grid};
use rayon::prelude::*;

#[derive(Clone, Debug, Default)]
pub struct DiffusionSolver {
    back: Vec<f32>,
    parallel: bool,
}

#[inline]
fn transfer(rate: f32, from: f32, to: f32, from_degree: usize) -> f32 {
    rate * (from - to) / (from_degree as f32 + 1.0)
}

impl DiffusionSolver {
    pub fn new(parallel: bool) -> Self {
        Self {
            back: Vec::new(),
            parallel,
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn advance(&mut self, grid: &mut Grid, rate: f32, steps: usize) {
        for _ in 0..steps {
            self.advance_one_step(grid, rate);
        }
    }

    pub fn advance_one_step(&mut self, grid: &mut Grid, rate: f32) {
        self.back.clear();
        self.back.extend_from_slice(grid.concentrations());
        if self.parallel {
            self.gather_pass(grid, rate);
        } else {
            self.scatter_pass(grid, rate);
        }
        std::mem::swap(grid.field_mut(), &mut self.back);
    }

    /// Each open cell pushes `transfer` to every open neighbor.
    fn scatter_pass(&mut self, grid: &Grid, rate: f32) {
        let front = grid.concentrations();
        let back = &mut self.back;
        for cell in grid.active_cells().iter().filter(|c| c.kind == CellKind::Open) {
            let c = front[cell.index];
            let degree = cell.neighbors.len();
            for &n in cell.neighbors.as_slice() {
                let amount = transfer(rate, c, front[n], degree);
                back[cell.index] -= amount;
                back[n] += amount;
            }
        }
        // Clamps override any transfer pushed into sinks and sources this step.
        // Walls are not active and keep the sentinel from the copy.
        for cell in grid.active_cells() {
            match cell.kind {
                CellKind::Sink => back[cell.index] = 0.0,
                CellKind::Source => back[cell.index] = 1.0,
                _ => {}
            }
        }
    }

    /// Same update computed per cell from inbound and outbound flows, so cells are
    /// independent and can be evaluated in parallel.
    fn gather_pass(&mut self, grid: &Grid, rate: f32) {
        let front = grid.concentrations();
        let active = grid.active_cells();
        let degree_of = |idx: usize| -> Option<usize> {
            active
                .binary_search_by_key(&idx, |cell| cell.index)
                .ok()
                .map(|slot| active[slot].neighbors.len())
        };
        let updated: Vec<f32> = active
            .par_iter()
            .map(|cell: &ActiveCell| match cell.kind {
                CellKind::Sink => 0.0,
                CellKind::Source => 1.0,
                CellKind::Wall => front[cell.index],
                CellKind::Open => {
                    let c = front[cell.index];
                    let degree = cell.neighbors.len();
                    let mut value = c;
                    for &n in cell.neighbors.as_slice() {
                        value -= transfer(rate, c, front[n], degree);
                        if grid.kinds()[n] == CellKind::Open {
                            let n_degree = degree_of(n).unwrap_or(0);
                            value += transfer(rate, front[n], c, n_degree);
                        }
                    }
                    value
                }
            })
            .collect();
        for (cell, value) in active.iter().zip(updated) {
            self.back[cell.index] = value;
        }
    }

    /// Largest rate for which every open cell's update stays a convex combination
    /// of pre-step values, so open concentrations starting in `[0, 1]` stay there.
    pub fn stable_rate_limit(grid: &Grid) -> f32 {
        let active = grid.active_cells();
        let degree_of = |idx: usize| {
            active
                .binary_search_by_key(&idx, |cell| cell.index)
                .map(|slot| active[slot].neighbors.len())
                .unwrap_or(0)
        };
        let mut limit = 1.0f32;
        for cell in active.iter().filter(|c| c.kind == CellKind::Open) {
            let degree = cell.neighbors.len();
            if degree == 0 {
                continue;
            }
            let mut outflow = degree as f32 / (degree as f32 + 1.0);
            for &n in cell.neighbors.as_slice() {
                if grid.kinds()[n] == CellKind::Open {
                    outflow += 1.0 / (degree_of(n) as f32 + 1.0);
                }
            }
            limit = limit.min(1.0 / outflow);
        }
        limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::WALL_SENTINEL;
    use crate::map::TileMap;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha12Rng;

    fn grid(text: &str) -> Grid {
        Grid::new(&TileMap::from_ascii(text).unwrap()).unwrap()
    }

    fn random_map(rng: &mut ChaCha12Rng, width: usize, height: usize) -> TileMap {
        let mut text = String::new();
        for _ in 0..height {
            for _ in 0..width {
                let r = rng.random::<f32>();
                text.push(match r {
                    r if r < 0.15 => '#',
                    r if r < 0.20 => 'S',
                    r if r < 0.25 => 'K',
                    r if r < 0.60 => '*',
                    _ => '.',
                });
            }
            text.push('\n');
        }
        TileMap::from_ascii(&text).unwrap()
    }

    #[test]
    fn three_by_three_center_pulse_matches_transfer_formula() {
        let mut g = grid("...\n.*.\n...\n");
        let mut solver = DiffusionSolver::new(false);
        solver.advance_one_step(&mut g, 0.5);

        // Center pushes 0.5 * 1 / 5 to each of 4 neighbors; each edge cell (3 neighbors)
        // pulls 0.5 * 1 / 4 from the center.
        let out_center = 0.5 / 5.0;
        let in_edge = 0.5 / 4.0;
        let center = 1.0 - 4.0 * out_center - 4.0 * in_edge;
        assert!((g.concentration_at([1, 1]) - center).abs() < 1e-6);
        assert!((g.concentration_at([1, 1]) - 0.1).abs() < 1e-6);
        for edge in [[0, 1], [2, 1], [1, 0], [1, 2]] {
            assert!((g.concentration_at(edge) - (out_center + in_edge)).abs() < 1e-6);
            assert!((g.concentration_at(edge) - 0.225).abs() < 1e-6);
        }
        for corner in [[0, 0], [2, 0], [0, 2], [2, 2]] {
            assert!(g.concentration_at(corner).abs() < 1e-6);
        }
    }

    #[test]
    fn reads_observe_pre_step_values() {
        // With an aliased buffer the right cell would see the already-updated middle
        // cell and end up with a different value.
        let mut g = grid("*..\n");
        DiffusionSolver::new(false).advance_one_step(&mut g, 1.0);
        // Left (1 neighbor) pushes 1/2 to middle; middle (2 neighbors) pushes -1/3 back.
        assert!((g.concentration_at([0, 0]) - (1.0 - 0.5 - 1.0 / 3.0)).abs() < 1e-6);
        assert!((g.concentration_at([1, 0]) - (0.5 + 1.0 / 3.0)).abs() < 1e-6);
        assert!(g.concentration_at([2, 0]).abs() < 1e-6);
    }

    #[test]
    fn open_only_step_conserves_total() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let mut g = grid("......\n.#..#.\n......\n");
        for cell in g.active_cells().to_vec() {
            let coord = g.coord_of(cell.index);
            g.set_concentration(coord, rng.random::<f32>());
        }
        let before = g.total_concentration();
        let mut solver = DiffusionSolver::new(false);
        for _ in 0..20 {
            solver.advance_one_step(&mut g, 0.3);
        }
        assert!((g.total_concentration() - before).abs() < 1e-4);
    }

    #[test]
    fn clamps_hold_after_every_step() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let map = random_map(&mut rng, 12, 9);
        let mut g = Grid::new(&map).unwrap();
        let mut solver = DiffusionSolver::new(false);
        for _ in 0..25 {
            solver.advance_one_step(&mut g, 0.9);
            for (idx, kind) in g.kinds().iter().enumerate() {
                let c = g.concentrations()[idx];
                match kind {
                    CellKind::Sink => assert_eq!(c, 0.0),
                    CellKind::Source => assert_eq!(c, 1.0),
                    CellKind::Wall => assert_eq!(c, WALL_SENTINEL),
                    CellKind::Open => {}
                }
            }
        }
    }

    #[test]
    fn open_cells_stay_bounded_below_stable_limit() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        for _ in 0..20 {
            let map = random_map(&mut rng, 10, 10);
            let mut g = Grid::new(&map).unwrap();
            let limit = DiffusionSolver::stable_rate_limit(&g);
            assert!(limit > 0.0 && limit <= 1.0);
            let rate = limit * rng.random_range(0.05f32..1.0);
            let mut solver = DiffusionSolver::new(false);
            for _ in 0..50 {
                solver.advance_one_step(&mut g, rate);
            }
            for cell in g.active_cells() {
                let c = g.concentrations()[cell.index];
                assert!((-1e-5..=1.0 + 1e-5).contains(&c), "concentration {c} left [0, 1]");
            }
        }
    }

    #[test]
    fn stable_limit_for_three_by_three() {
        let g = grid("...\n...\n...\n");
        // Center: 4/5 + 4 * 1/4 = 1.8 is the largest outflow factor.
        assert!((DiffusionSolver::stable_rate_limit(&g) - 1.0 / 1.8).abs() < 1e-6);
    }

    #[test]
    fn isolated_open_cell_does_not_change() {
        let mut g = grid("#*#\n");
        DiffusionSolver::new(false).advance(&mut g, 1.0, 5);
        assert!((g.concentration_at([1, 0]) - 1.0).abs() < f32::EPSILON);
        assert!((DiffusionSolver::stable_rate_limit(&g) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn sink_absorbs_and_source_emits() {
        let mut g = grid("S...K\n");
        DiffusionSolver::new(false).advance(&mut g, 0.5, 200);
        let values: Vec<f32> = (0..5).map(|x| g.concentration_at([x, 0])).collect();
        assert_eq!(values[0], 1.0);
        assert_eq!(values[4], 0.0);
        assert!(values.windows(2).all(|w| w[0] >= w[1]), "{values:?}");
        assert!(values[2] > 0.0 && values[2] < 1.0);
    }

    #[test]
    fn parallel_gather_matches_sequential_scatter() {
        let mut rng = ChaCha12Rng::seed_from_u64(99);
        let map = random_map(&mut rng, 24, 17);
        let mut a = Grid::new(&map).unwrap();
        let mut b = a.clone();
        let mut seq = DiffusionSolver::new(false);
        let mut par = DiffusionSolver::new(true);
        assert!(par.is_parallel());
        for _ in 0..30 {
            seq.advance_one_step(&mut a, 0.25);
            par.advance_one_step(&mut b, 0.25);
        }
        for (x, y) in a.concentrations().iter().zip(b.concentrations()) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }
}
