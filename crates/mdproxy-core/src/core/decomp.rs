//! Sizing and ownership rules for the domain decomposition.
//!
//! The box is split into a grid of nodes (one per worker rank), and each node is split
//! further into cells whose edge is no shorter than the interaction range.

use super::models::grid::Int3D;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum DecompositionError {
    #[error("The {which} grid {grid} has an empty axis")]
    EmptyGrid { which: &'static str, grid: Int3D },
}

/// Largest number of cells `n` along one axis such that
/// `size / (n * nodes) >= cutoff`.
///
/// Returns 1 when no subdivision satisfies the bound, and for degenerate input
/// (zero nodes, non-finite size, or a cutoff that is not a positive finite number).
pub fn calc_number_cells(size: f64, nodes: usize, cutoff: f64) -> usize {
    if nodes == 0 || !size.is_finite() || !(cutoff.is_finite() && cutoff > 0.0) {
        return 1;
    }
    let nodes = nodes as f64;
    let fits = |ncells: usize| size / (ncells as f64 * nodes) >= cutoff;

    // `as` saturates, so a huge ratio lands on usize::MAX rather than wrapping.
    let mut ncells = (size / (nodes * cutoff)).floor().max(0.0) as usize;
    while ncells > 0 && !fits(ncells) {
        ncells -= 1;
    }
    while let Some(next) = ncells.checked_add(1) {
        if !fits(next) {
            break;
        }
        ncells = next;
    }
    ncells.max(1)
}

/// Node grid used by the driver: every rank gets a slab along `z`.
pub fn node_grid(workers: usize) -> Int3D {
    Int3D::new(1, 1, workers.max(1))
}

/// Cell grid per node, applying [`calc_number_cells`] along each axis.
pub fn cell_grid(box_l: &Vector3<f64>, node_grid: &Int3D, range: f64) -> Int3D {
    Int3D::new(
        calc_number_cells(box_l.x, node_grid.x(), range),
        calc_number_cells(box_l.y, node_grid.y(), range),
        calc_number_cells(box_l.z, node_grid.z(), range),
    )
}

/// The geometry shared by every rank: which node owns which region of the box.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainLayout {
    box_l: Vector3<f64>,
    node_grid: Int3D,
    cell_grid: Int3D,
}

impl DomainLayout {
    pub fn new(
        box_l: Vector3<f64>,
        node_grid: Int3D,
        cell_grid: Int3D,
    ) -> Result<Self, DecompositionError> {
        if node_grid.product() == 0 {
            return Err(DecompositionError::EmptyGrid {
                which: "node",
                grid: node_grid,
            });
        }
        if cell_grid.product() == 0 {
            return Err(DecompositionError::EmptyGrid {
                which: "cell",
                grid: cell_grid,
            });
        }
        Ok(Self {
            box_l,
            node_grid,
            cell_grid,
        })
    }

    pub fn node_grid(&self) -> Int3D {
        self.node_grid
    }

    pub fn cell_grid(&self) -> Int3D {
        self.cell_grid
    }

    /// Grid coordinate of the node containing a folded position.
    pub fn node_coord(&self, pos: &Point3<f64>) -> [usize; 3] {
        let mut coord = [0; 3];
        for (axis, slot) in coord.iter_mut().enumerate() {
            let n = self.node_grid[axis];
            let width = self.box_l[axis] / n as f64;
            let idx = (pos[axis] / width).floor();
            *slot = if idx <= 0.0 {
                0
            } else {
                (idx as usize).min(n - 1)
            };
        }
        coord
    }

    /// Rank owning a folded position.
    pub fn owner_of(&self, pos: &Point3<f64>) -> usize {
        self.node_grid.linear_index(self.node_coord(pos))
    }

    /// Edge lengths of a single cell.
    pub fn cell_size(&self) -> Vector3<f64> {
        Vector3::new(
            self.box_l.x / (self.node_grid.x() * self.cell_grid.x()) as f64,
            self.box_l.y / (self.node_grid.y() * self.cell_grid.y()) as f64,
            self.box_l.z / (self.node_grid.z() * self.cell_grid.z()) as f64,
        )
    }

    /// Whether every cell edge is at least `range`.
    pub fn supports_range(&self, range: f64) -> bool {
        self.cell_size().iter().all(|&edge| edge >= range)
    }
}
