use super::bc::OrthorhombicBC;
use super::models::particle::Particle;
use nalgebra::{Point3, Vector3};
use rand::Rng;

/// Fills the box with `per_side³` particles on a slightly perturbed cubic lattice.
///
/// Each site is offset by `r = 0.45 + 0.01 * ((i + 2j + 3k) mod 11)` lattice spacings, so no
/// two neighbours sit at the same relative offset. Ids start at 0 and increase with `k`
/// running fastest.
pub fn perturbed_lattice(per_side: usize, box_l: &Vector3<f64>) -> Vec<Particle> {
    let n = per_side as f64;
    let mut particles = Vec::with_capacity(per_side.pow(3));
    let mut pid = 0;
    for i in 0..per_side {
        for j in 0..per_side {
            for k in 0..per_side {
                let m = (i + 2 * j + 3 * k) % 11;
                let r = 0.45 + m as f64 * 0.01;
                let position = Point3::new(
                    (i as f64 + r) / n * box_l.x,
                    (j as f64 + r) / n * box_l.y,
                    (k as f64 + r) / n * box_l.z,
                );
                particles.push(Particle::new(pid, position));
                pid += 1;
            }
        }
    }
    particles
}

/// Places `count` particles uniformly at random inside the box, ids starting at `first_id`.
pub fn random_particles(
    count: usize,
    first_id: usize,
    bc: &OrthorhombicBC,
    rng: &mut impl Rng,
) -> Vec<Particle> {
    (0..count)
        .map(|offset| Particle::new(first_id + offset, bc.random_position(rng)))
        .collect()
}
