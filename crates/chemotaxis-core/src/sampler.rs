//! Continuous-space concentration queries over a [`Grid`].
//!
//! Cell values live at cell centers. A query blends the four centers around the
//! point bilinearly, leaving wall corners out of the blend, then subtracts a
//! repulsion term for every wall corner that scales with `1 / manhattan distance`.

use crate::cell::{CellKind, WALL_SENTINEL};
use crate::grid::{CellCoord, Grid};

/// Floor on the corner distance used by the wall penalty.
pub const MIN_WALL_DISTANCE: f64 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CornerSample {
    pub cell: CellCoord,
    pub kind: CellKind,
    pub concentration: f32,
    /// Bilinear weight before wall corners are dropped.
    pub weight: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Interpolated concentration minus the wall penalty.
    pub value: f64,
    pub interpolated: f64,
    pub wall_penalty: f64,
    /// `(x1, y1), (x1, y2), (x2, y1), (x2, y2)`.
    pub corners: [CornerSample; 4],
}

impl Sample {
    fn off_grid() -> Self {
        let corner = CornerSample {
            cell: [i64::MIN, i64::MIN],
            kind: CellKind::Wall,
            concentration: WALL_SENTINEL,
            weight: 0.0,
        };
        Self {
            value: WALL_SENTINEL as f64,
            interpolated: WALL_SENTINEL as f64,
            wall_penalty: 0.0,
            corners: [corner; 4],
        }
    }
}

/// Partner cell along one axis and the point's fractional distance toward it.
///
/// A point exactly on the base center has no partner: the axis is coincident and
/// its interpolation is skipped. Partners past the `i64` range saturate onto the
/// base, which is already off the grid there.
fn axis_partner(p: f64, base: i64) -> (i64, f64) {
    let center = base as f64 + 0.5;
    if p > center {
        (base.saturating_add(1), p - center)
    } else if p < center {
        (base.saturating_sub(1), center - p)
    } else {
        (base, 0.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldSampler {
    pub wall_avoidance_rate: f64,
}

impl FieldSampler {
    pub fn new(wall_avoidance_rate: f64) -> Self {
        Self {
            wall_avoidance_rate,
        }
    }

    pub fn value(&self, grid: &Grid, point: [f64; 2]) -> f64 {
        self.sample(grid, point).value
    }

    pub fn sample(&self, grid: &Grid, point: [f64; 2]) -> Sample {
        if !(point[0].is_finite() && point[1].is_finite()) {
            return Sample::off_grid();
        }
        let [x1, y1] = grid.cell_of(point);
        let (x2, tx) = axis_partner(point[0], x1);
        let (y2, ty) = axis_partner(point[1], y1);

        let corner = |cell: CellCoord, weight: f64| CornerSample {
            cell,
            kind: grid.classification_at(cell),
            concentration: grid.concentration_at(cell),
            weight,
        };
        let corners = [
            corner([x1, y1], (1.0 - tx) * (1.0 - ty)),
            corner([x1, y2], (1.0 - tx) * ty),
            corner([x2, y1], tx * (1.0 - ty)),
            corner([x2, y2], tx * ty),
        ];

        let mut weight_sum = 0.0;
        let mut weighted = 0.0;
        for c in corners.iter().filter(|c| !c.kind.is_wall()) {
            weight_sum += c.weight;
            weighted += c.weight * c.concentration as f64;
        }
        let interpolated = if weight_sum > 0.0 {
            weighted / weight_sum
        } else {
            WALL_SENTINEL as f64
        };

        let mut wall_penalty = 0.0;
        if self.wall_avoidance_rate != 0.0 {
            for (i, c) in corners.iter().enumerate() {
                // Coincident axes repeat a cell; count each wall once.
                if !c.kind.is_wall() || corners[..i].iter().any(|prev| prev.cell == c.cell) {
                    continue;
                }
                let [cx, cy] = grid.cell_center(c.cell);
                let distance = (point[0] - cx).abs() + (point[1] - cy).abs();
                wall_penalty += self.wall_avoidance_rate / distance.max(MIN_WALL_DISTANCE);
            }
        }

        Sample {
            value: interpolated - wall_penalty,
            interpolated,
            wall_penalty,
            corners,
        }
    }
}
