use nalgebra::{Point3, Vector3};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum BoundaryError {
    #[error("Box length along axis {axis} must be positive and finite, got {value}")]
    InvalidBoxLength { axis: usize, value: f64 },
}

/// Periodic boundary conditions for a rectangular box anchored at the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthorhombicBC {
    box_l: Vector3<f64>,
    inv_box_l: Vector3<f64>,
}

impl OrthorhombicBC {
    pub fn new(box_l: Vector3<f64>) -> Result<Self, BoundaryError> {
        Self::validate(&box_l)?;
        Ok(Self {
            box_l,
            inv_box_l: box_l.map(|l| 1.0 / l),
        })
    }

    /// Replaces the box lengths. The previous lengths are kept on error.
    pub fn set_box_l(&mut self, box_l: Vector3<f64>) -> Result<(), BoundaryError> {
        Self::validate(&box_l)?;
        self.box_l = box_l;
        self.inv_box_l = box_l.map(|l| 1.0 / l);
        Ok(())
    }

    fn validate(box_l: &Vector3<f64>) -> Result<(), BoundaryError> {
        for (axis, &value) in box_l.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(BoundaryError::InvalidBoxLength { axis, value });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn box_l(&self) -> Vector3<f64> {
        self.box_l
    }

    /// Shortest periodic image of `pos1 - pos2`.
    #[inline]
    pub fn minimum_image_vector(&self, pos1: &Point3<f64>, pos2: &Point3<f64>) -> Vector3<f64> {
        let mut dist = pos1 - pos2;
        for i in 0..3 {
            dist[i] -= (dist[i] * self.inv_box_l[i]).round() * self.box_l[i];
        }
        dist
    }

    /// Folds one coordinate into `[0, L)`, recording the shift in `image`.
    ///
    /// Already folded positions are left untouched, so folding is idempotent.
    pub fn fold_coordinate(&self, pos: &mut Point3<f64>, image: &mut Vector3<i32>, dir: usize) {
        let shift = (pos[dir] * self.inv_box_l[dir]).floor();
        if shift != 0.0 {
            pos[dir] -= shift * self.box_l[dir];
            image[dir] += shift as i32;
        }
        if pos[dir] >= self.box_l[dir] {
            pos[dir] -= self.box_l[dir];
            image[dir] += 1;
        }
    }

    pub fn fold_position(&self, pos: &mut Point3<f64>, image: &mut Vector3<i32>) {
        for dir in 0..3 {
            self.fold_coordinate(pos, image, dir);
        }
    }

    /// Restores the physical coordinate and resets its image counter.
    pub fn unfold_coordinate(&self, pos: &mut Point3<f64>, image: &mut Vector3<i32>, dir: usize) {
        pos[dir] += f64::from(image[dir]) * self.box_l[dir];
        image[dir] = 0;
    }

    pub fn unfolded_position(&self, pos: &Point3<f64>, image: &Vector3<i32>) -> Point3<f64> {
        pos + image.map(f64::from).component_mul(&self.box_l)
    }

    /// Uniformly distributed position inside the primary box.
    pub fn random_position(&self, rng: &mut impl Rng) -> Point3<f64> {
        Point3::new(
            rng.r#gen::<f64>() * self.box_l.x,
            rng.r#gen::<f64>() * self.box_l.y,
            rng.r#gen::<f64>() * self.box_l.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const TOLERANCE: f64 = 1e-12;

    fn cube(l: f64) -> OrthorhombicBC {
        OrthorhombicBC::new(Vector3::new(l, l, l)).unwrap()
    }

    #[test]
    fn new_rejects_non_positive_box_length() {
        let result = OrthorhombicBC::new(Vector3::new(10.0, 0.0, 10.0));
        assert_eq!(
            result,
            Err(BoundaryError::InvalidBoxLength {
                axis: 1,
                value: 0.0
            })
        );
    }

    #[test]
    fn set_box_l_keeps_previous_lengths_on_error() {
        let mut bc = cube(10.0);
        assert!(bc.set_box_l(Vector3::new(f64::NAN, 1.0, 1.0)).is_err());
        assert_eq!(bc.box_l(), Vector3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn minimum_image_wraps_across_the_boundary() {
        let bc = cube(10.0);
        let d = bc.minimum_image_vector(&Point3::new(9.5, 0.0, 0.0), &Point3::new(0.5, 0.0, 0.0));
        assert!((d.x + 1.0).abs() < TOLERANCE);
        assert!(d.y.abs() < TOLERANCE);
    }

    #[test]
    fn minimum_image_keeps_short_vectors() {
        let bc = cube(10.0);
        let d = bc.minimum_image_vector(&Point3::new(3.0, 4.0, 5.0), &Point3::new(1.0, 1.0, 1.0));
        assert_eq!(d, Vector3::new(2.0, 3.0, 4.0));
    }

    #[test]
    fn fold_then_unfold_restores_original_position() {
        let bc = cube(10.0);
        let original = Point3::new(23.5, -4.0, 9.0);
        let mut pos = original;
        let mut image = Vector3::zeros();
        bc.fold_position(&mut pos, &mut image);

        assert!((pos.x - 3.5).abs() < TOLERANCE);
        assert!((pos.y - 6.0).abs() < TOLERANCE);
        assert_eq!(image, Vector3::new(2, -1, 0));
        assert_eq!(bc.unfolded_position(&pos, &image), original);

        for dir in 0..3 {
            bc.unfold_coordinate(&mut pos, &mut image, dir);
        }
        assert!((pos - original).norm() < TOLERANCE);
        assert_eq!(image, Vector3::zeros());
    }

    #[test]
    fn folding_is_idempotent() {
        let bc = cube(10.0);
        let mut pos = Point3::new(12.0, 5.0, -0.5);
        let mut image = Vector3::zeros();
        bc.fold_position(&mut pos, &mut image);
        let (once_pos, once_image) = (pos, image);
        bc.fold_position(&mut pos, &mut image);
        assert_eq!(pos, once_pos);
        assert_eq!(image, once_image);
    }

    #[test]
    fn random_positions_lie_inside_the_box() {
        let bc = OrthorhombicBC::new(Vector3::new(1.0, 2.0, 3.0)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let p = bc.random_position(&mut rng);
            assert!((0.0..1.0).contains(&p.x));
            assert!((0.0..2.0).contains(&p.y));
            assert!((0.0..3.0).contains(&p.z));
        }
    }
}
