use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// A triple of positive integers describing a 3-D grid (node grid or cell grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Int3D(pub [usize; 3]);

impl Int3D {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self([x, y, z])
    }

    /// Total number of grid points.
    #[inline]
    pub fn product(&self) -> usize {
        self.0.iter().product()
    }

    /// Flattens a grid coordinate into a linear index, `x` running fastest.
    #[inline]
    pub fn linear_index(&self, coord: [usize; 3]) -> usize {
        coord[0] + self.0[0] * (coord[1] + self.0[1] * coord[2])
    }

    pub fn x(&self) -> usize {
        self.0[0]
    }

    pub fn y(&self) -> usize {
        self.0[1]
    }

    pub fn z(&self) -> usize {
        self.0[2]
    }
}

impl Index<usize> for Int3D {
    type Output = usize;

    fn index(&self, axis: usize) -> &Self::Output {
        &self.0[axis]
    }
}

impl fmt::Display for Int3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}
