use super::models::particle::Particle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Rank-local kinetic sums; reduce across ranks with `+` before deriving a temperature.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KineticSums {
    /// Σ m v² over the particles.
    pub mv2: f64,
    pub count: usize,
}

impl KineticSums {
    pub fn new(mv2: f64, count: usize) -> Self {
        Self { mv2, count }
    }

    pub fn from_particles<'a>(particles: impl IntoIterator<Item = &'a Particle>) -> Self {
        particles
            .into_iter()
            .fold(Self::default(), |acc, p| acc + Self::new(p.mv2(), 1))
    }

    /// Temperature in reduced units (k_B = 1), three degrees of freedom per particle.
    pub fn temperature(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.mv2 / (3.0 * self.count as f64)
    }
}

impl Add for KineticSums {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            mv2: self.mv2 + rhs.mv2,
            count: self.count + rhs.count,
        }
    }
}

impl AddAssign for KineticSums {
    fn add_assign(&mut self, rhs: Self) {
        self.mv2 += rhs.mv2;
        self.count += rhs.count;
    }
}

impl Sum for KineticSums {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, sums| acc + sums)
    }
}

/// One row of the energy report printed while the simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySample {
    pub step: u64,
    pub potential: f64,
    pub temperature: f64,
    pub particle_count: usize,
}

impl EnergySample {
    /// Kinetic energy implied by the temperature, `T * 3N / 2`.
    pub fn kinetic(&self) -> f64 {
        0.5 * self.temperature * (3 * self.particle_count) as f64
    }

    pub fn total(&self) -> f64 {
        self.kinetic() + self.potential
    }

    /// The opening line, printed before the first integration step.
    pub fn start_line(&self) -> String {
        format!(
            "Start: tot energy = {:10.6} pot = {:10.6} kin = {:10.6} temp = {:10.6}",
            self.total(),
            self.potential,
            self.kinetic(),
            self.temperature
        )
    }
}

impl fmt::Display for EnergySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Step {:6}: tot energy = {:10.6} pot = {:10.6} kin = {:10.6} temp = {:.6}",
            self.step,
            self.total(),
            self.potential,
            self.kinetic(),
            self.temperature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn from_particles_accumulates_mass_weighted_squared_speeds() {
        let particles = vec![
            Particle::new(0, Point3::origin()).with_velocity(Vector3::new(1.0, 0.0, 0.0)),
            Particle::new(1, Point3::origin())
                .with_mass(2.0)
                .with_velocity(Vector3::new(0.0, 1.0, 1.0)),
        ];
        let sums = KineticSums::from_particles(&particles);
        assert_eq!(sums, KineticSums::new(5.0, 2));
    }

    #[test]
    fn temperature_divides_by_three_degrees_of_freedom_per_particle() {
        assert_eq!(KineticSums::new(6.0, 2).temperature(), 1.0);
    }

    #[test]
    fn empty_sums_have_zero_temperature() {
        assert_eq!(KineticSums::default().temperature(), 0.0);
    }

    #[test]
    fn partial_sums_reduce_by_addition() {
        let total: KineticSums = vec![KineticSums::new(1.0, 1), KineticSums::new(2.0, 3)]
            .into_iter()
            .sum();
        assert_eq!(total, KineticSums::new(3.0, 4));

        let mut acc = KineticSums::default();
        acc += KineticSums::new(4.0, 1);
        assert_eq!(acc, KineticSums::new(4.0, 1));
    }

    #[test]
    fn sample_kinetic_energy_follows_equipartition() {
        let sample = EnergySample {
            step: 20,
            potential: -1.5,
            temperature: 2.0,
            particle_count: 1000,
        };
        assert_eq!(sample.kinetic(), 3000.0);
        assert_eq!(sample.total(), 2998.5);
    }

    #[test]
    fn sample_formats_match_report_layout() {
        let sample = EnergySample {
            step: 20,
            potential: -1.5,
            temperature: 0.0,
            particle_count: 10,
        };
        assert_eq!(
            sample.to_string(),
            "Step     20: tot energy =  -1.500000 pot =  -1.500000 kin =   0.000000 temp = 0.000000"
        );
        assert_eq!(
            sample.start_line(),
            "Start: tot energy =  -1.500000 pot =  -1.500000 kin =   0.000000 temp =   0.000000"
        );
    }
}
