// Azimuth sampling around the Cherenkov cone
use nalgebra::{Point3, Vector3};
use rand::{Rng, RngCore};
use std::f64::consts::PI;
use std::fmt;

/// What an azimuth sampler may look at for one photon.
#[derive(Debug, Clone, Copy)]
pub struct AzimuthContext {
    /// Unit direction of the charged particle (cone axis)
    pub axis: Vector3<f64>,
    /// Global emission point
    pub emission_point: Point3<f64>,
    /// Photon energy (eV)
    pub photon_energy: f64,
    /// Cosine of the cone half-angle
    pub cos_theta: f64,
}

/// Hook deciding the azimuth of each photon on its cone.
///
/// The default is uniform in [0, 2π). A detector-biasing collaborator can
/// plug in its own implementation; it must return an angle in radians and
/// is responsible for any weight bookkeeping its bias implies.
pub trait AzimuthSampler: Send + Sync + fmt::Debug {
    fn sample_azimuth(&self, context: &AzimuthContext, rng: &mut dyn RngCore) -> f64;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Unbiased azimuth, uniform in [0, 2π).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UniformAzimuth;

impl AzimuthSampler for UniformAzimuth {
    fn sample_azimuth(&self, _context: &AzimuthContext, rng: &mut dyn RngCore) -> f64 {
        2.0 * PI * rng.gen::<f64>()
    }

    fn name(&self) -> &str {
        "uniform"
    }
}

/// Always the same azimuth. Useful for checking cone geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedAzimuth(pub f64);

impl AzimuthSampler for FixedAzimuth {
    fn sample_azimuth(&self, _context: &AzimuthContext, _rng: &mut dyn RngCore) -> f64 {
        self.0
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context() -> AzimuthContext {
        AzimuthContext {
            axis: Vector3::z(),
            emission_point: Point3::origin(),
            photon_energy: 3.0,
            cos_theta: 0.75,
        }
    }

    #[test]
    fn test_uniform_azimuth_range_and_spread() {
        let sampler = UniformAzimuth;
        let mut rng = StdRng::seed_from_u64(5);
        let mut quadrants = [0usize; 4];
        for _ in 0..40_000 {
            let phi = sampler.sample_azimuth(&context(), &mut rng);
            assert!((0.0..2.0 * PI).contains(&phi));
            quadrants[(phi / (0.5 * PI)) as usize] += 1;
        }
        for q in quadrants {
            assert!((q as f64 - 10_000.0).abs() < 500.0, "quadrant count {}", q);
        }
    }

    #[test]
    fn test_fixed_azimuth() {
        let sampler = FixedAzimuth(1.25);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..10 {
            assert_eq!(sampler.sample_azimuth(&context(), &mut rng), 1.25);
        }
        assert_eq!(sampler.name(), "fixed");
    }

    #[test]
    fn test_send_sync_bounds() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<UniformAzimuth>();
        assert_sync::<UniformAzimuth>();
        assert_send::<Box<dyn AzimuthSampler>>();
        assert_sync::<Box<dyn AzimuthSampler>>();
    }
}
