// Path length and emission window inside a finite radiator
use crate::binding::MaterialModelBinding;
use crate::config::{Config, SmearingPolicy};
use crate::error::{CherenkovError, CherenkovResult};
use crate::particle::ParticleState;
use crate::sampler::EmissionWindow;
use crate::solid::RadiatorSolid;
use nalgebra::{UnitQuaternion, Vector3};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicU64, Ordering};

// Ambiguity diagnostics: the first few are logged, then one in every N.
const AMBIGUITY_LOG_FIRST: u64 = 10;
const AMBIGUITY_LOG_EVERY: u64 = 1000;

/// Where a step crosses a thin radiator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThinTargetPath {
    pub window: EmissionWindow,
    /// True when the exact intersection failed and the path was smeared
    pub smeared: bool,
}

impl ThinTargetPath {
    pub fn path_length(&self) -> f64 {
        self.window.path_length
    }
}

/// Replaces the step length by the true chord through a finite radiator.
#[derive(Debug, Default)]
pub struct ThinTargetGeometryModel {
    smearing: SmearingPolicy,
    ambiguities: AtomicU64,
}

impl ThinTargetGeometryModel {
    pub fn new(smearing: SmearingPolicy) -> Self {
        ThinTargetGeometryModel {
            smearing,
            ambiguities: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.smearing)
    }

    pub fn smearing(&self) -> SmearingPolicy {
        self.smearing
    }

    /// Number of steps that needed the smeared fallback so far.
    pub fn ambiguity_count(&self) -> u64 {
        self.ambiguities.load(Ordering::Relaxed)
    }

    /// Path through the radiator a binding describes.
    ///
    /// Fails only when the binding itself is inconsistent (no finite solid).
    /// Geometry that cannot be resolved exactly is smeared instead.
    pub fn path_for_binding<R: Rng + ?Sized>(
        &self,
        particle: &ParticleState,
        step_length: f64,
        binding: &MaterialModelBinding,
        material: &str,
        rng: &mut R,
    ) -> CherenkovResult<ThinTargetPath> {
        let (solid, rotation) = binding.radiator(material)?;
        Ok(self.effective_path(particle, step_length, &solid, &rotation, binding.half_thickness, rng))
    }

    /// The path a binding would give, without drawing random numbers or
    /// counting ambiguities.
    ///
    /// An ambiguous intersection reports the unsmeared nominal length with
    /// `smeared` set, which is the centre of what sampling would draw.
    pub fn preview_for_binding(
        &self,
        particle: &ParticleState,
        step_length: f64,
        binding: &MaterialModelBinding,
        material: &str,
    ) -> CherenkovResult<ThinTargetPath> {
        let (solid, rotation) = binding.radiator(material)?;
        if !(step_length > 0.0) {
            return Ok(ThinTargetPath {
                window: EmissionWindow::full_step(0.0),
                smeared: false,
            });
        }
        let path = match self.locate(particle, step_length, &solid, &rotation) {
            Ok(window) => ThinTargetPath {
                window,
                smeared: false,
            },
            Err(_) => {
                let local_direction = local_direction(particle, step_length, &rotation);
                ThinTargetPath {
                    window: EmissionWindow::full_step(nominal_length(
                        step_length,
                        &local_direction,
                        binding.half_thickness,
                    )),
                    smeared: true,
                }
            }
        };
        Ok(path)
    }

    /// Intersect the step with `solid` in the volume's local frame.
    ///
    /// `rotation` takes volume-local coordinates into the solid's frame.
    /// `half_thickness`, when known, gives a better nominal length for the
    /// smeared fallback.
    pub fn effective_path<R: Rng + ?Sized>(
        &self,
        particle: &ParticleState,
        step_length: f64,
        solid: &RadiatorSolid,
        rotation: &UnitQuaternion<f64>,
        half_thickness: Option<f64>,
        rng: &mut R,
    ) -> ThinTargetPath {
        if !(step_length > 0.0) {
            return ThinTargetPath {
                window: EmissionWindow::full_step(0.0),
                smeared: false,
            };
        }

        match self.locate(particle, step_length, solid, rotation) {
            Ok(window) => ThinTargetPath {
                window,
                smeared: false,
            },
            Err(err) => {
                let local_direction = local_direction(particle, step_length, rotation);
                let nominal = nominal_length(step_length, &local_direction, half_thickness);
                self.report_ambiguity(&err);
                ThinTargetPath {
                    window: EmissionWindow::full_step(self.smeared_length(nominal, step_length, rng)),
                    smeared: true,
                }
            }
        }
    }

    /// Exact emission window of the step inside `solid`; a zero window on a miss.
    ///
    /// When the step crosses a bore the window keeps the empty stretch as
    /// its gap, so no photon is placed there.
    pub fn locate(
        &self,
        particle: &ParticleState,
        step_length: f64,
        solid: &RadiatorSolid,
        rotation: &UnitQuaternion<f64>,
    ) -> CherenkovResult<EmissionWindow> {
        let global_end = particle.pre.position + particle.direction * step_length;
        let start = rotation * particle.to_local.transform_point(&particle.pre.position);
        let end = rotation * particle.to_local.transform_point(&global_end);

        let window = match solid.intersect_segment(&start, &end)? {
            Some(chord) => EmissionWindow {
                start: chord.t_enter,
                end: chord.t_exit,
                path_length: chord.inside_fraction * step_length,
                gap: chord.gap,
            },
            None => EmissionWindow {
                start: 0.0,
                end: 0.0,
                path_length: 0.0,
                gap: None,
            },
        };
        Ok(window)
    }

    /// Gaussian-smeared path length around `nominal`, clamped to `[0, step_length]`.
    pub fn smeared_length<R: Rng + ?Sized>(&self, nominal: f64, step_length: f64, rng: &mut R) -> f64 {
        let sigma = self.smearing.sigma_for(nominal);
        let value = match Normal::new(nominal, sigma) {
            Ok(normal) => normal.sample(rng),
            Err(_) => nominal,
        };
        value.clamp(0.0, step_length)
    }

    fn report_ambiguity(&self, err: &CherenkovError) {
        let count = self.ambiguities.fetch_add(1, Ordering::Relaxed) + 1;
        if count <= AMBIGUITY_LOG_FIRST || count % AMBIGUITY_LOG_EVERY == 0 {
            log::debug!("{} (occurrence {}), smearing path length", err, count);
        }
    }
}

fn local_direction(
    particle: &ParticleState,
    step_length: f64,
    rotation: &UnitQuaternion<f64>,
) -> Vector3<f64> {
    let global_end = particle.pre.position + particle.direction * step_length;
    let start = rotation * particle.to_local.transform_point(&particle.pre.position);
    let end = rotation * particle.to_local.transform_point(&global_end);
    (end - start) / step_length
}

// Best guess at the chord when the exact one is unavailable: the slab
// crossing length if a half-thickness is known, else the whole step.
fn nominal_length(step_length: f64, local_direction: &Vector3<f64>, half_thickness: Option<f64>) -> f64 {
    match half_thickness {
        Some(h) if h > 0.0 => {
            let cos = local_direction.z.abs();
            if cos > 1e-12 {
                (2.0 * h / cos).min(step_length)
            } else {
                step_length
            }
        }
        _ => step_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Isometry3, Translation3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn particle_through_origin(direction: [f64; 3], step: f64) -> ParticleState {
        let d = Vector3::new(direction[0], direction[1], direction[2]).normalize();
        let start = -d * (step / 2.0);
        ParticleState::new(1.0, 0.99, [start.x, start.y, start.z], direction).with_step(step, 0.99)
    }

    #[test]
    fn test_slab_normal_incidence_gives_full_thickness() {
        let model = ThinTargetGeometryModel::default();
        let mut rng = StdRng::seed_from_u64(1);
        let particle = particle_through_origin([0.0, 0.0, 1.0], 2.0);
        let binding = MaterialModelBinding::thin_slab(0.05);
        let path = model
            .path_for_binding(&particle, 2.0, &binding, "Foil", &mut rng)
            .unwrap();
        assert!(!path.smeared);
        assert_relative_eq!(path.path_length(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(path.window.start, 0.475, epsilon = 1e-12);
        assert_relative_eq!(path.window.end, 0.525, epsilon = 1e-12);
    }

    #[test]
    fn test_oblique_slab_uses_slab_normal() {
        let model = ThinTargetGeometryModel::default();
        let mut rng = StdRng::seed_from_u64(1);
        // slab normal along x, particle at 60 degrees to it
        let dir = [0.5, 3f64.sqrt() / 2.0, 0.0];
        let particle = particle_through_origin(dir, 4.0);
        let binding = MaterialModelBinding::thin_slab(0.05).with_slab_normal([1.0, 0.0, 0.0]);
        let path = model
            .path_for_binding(&particle, 4.0, &binding, "Foil", &mut rng)
            .unwrap();
        assert_relative_eq!(path.path_length(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_local_transform_is_applied() {
        let model = ThinTargetGeometryModel::default();
        let mut rng = StdRng::seed_from_u64(1);
        // slab centred at global z = 10
        let to_local = Isometry3::from_parts(Translation3::new(0.0, 0.0, -10.0), UnitQuaternion::identity());
        let particle = ParticleState::new(1.0, 0.99, [0.0, 0.0, 9.0], [0.0, 0.0, 1.0])
            .with_step(2.0, 0.99)
            .with_transform(to_local);
        let path = model.effective_path(
            &particle,
            2.0,
            &RadiatorSolid::slab(0.05),
            &UnitQuaternion::identity(),
            Some(0.05),
            &mut rng,
        );
        assert_relative_eq!(path.path_length(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_step_missing_radiator_has_zero_path() {
        let model = ThinTargetGeometryModel::default();
        let mut rng = StdRng::seed_from_u64(1);
        let particle = ParticleState::new(1.0, 0.99, [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]).with_step(1.0, 0.99);
        let path = model
            .path_for_binding(&particle, 1.0, &MaterialModelBinding::thin_slab(0.05), "Foil", &mut rng)
            .unwrap();
        assert_eq!(path.path_length(), 0.0);
        assert!(!path.smeared);
    }

    #[test]
    fn test_unsupported_solid_is_smeared_within_step() {
        let model = ThinTargetGeometryModel::new(SmearingPolicy::Relative { fraction: 0.5 });
        let mut rng = StdRng::seed_from_u64(5);
        let particle = particle_through_origin([0.0, 0.0, 1.0], 1.0);
        let binding = MaterialModelBinding::thin_solid(RadiatorSolid::Other {
            name: "Polycone".to_string(),
        });
        for _ in 0..200 {
            let path = model
                .path_for_binding(&particle, 1.0, &binding, "Foil", &mut rng)
                .unwrap();
            assert!(path.smeared);
            assert!(path.path_length() >= 0.0 && path.path_length() <= 1.0);
            assert_eq!(path.window.start, 0.0);
            assert_eq!(path.window.end, 1.0);
        }
        assert_eq!(model.ambiguity_count(), 200);
    }

    #[test]
    fn test_grazing_slab_is_smeared_around_nominal() {
        let model = ThinTargetGeometryModel::new(SmearingPolicy::Absolute { sigma_mm: 0.0 });
        let mut rng = StdRng::seed_from_u64(5);
        // runs along the upper face of the slab
        let particle = ParticleState::new(1.0, 0.99, [-1.0, 0.0, 0.05], [1.0, 0.0, 0.0]).with_step(2.0, 0.99);
        let path = model
            .path_for_binding(&particle, 2.0, &MaterialModelBinding::thin_slab(0.05), "Foil", &mut rng)
            .unwrap();
        assert!(path.smeared);
        assert_relative_eq!(path.path_length(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tube_bore_crossing_window_has_gap() {
        let model = ThinTargetGeometryModel::default();
        let mut rng = StdRng::seed_from_u64(2);
        let particle = ParticleState::new(1.0, 0.99, [-4.0, 0.0, 0.0], [1.0, 0.0, 0.0]).with_step(8.0, 0.99);
        let binding = MaterialModelBinding::thin_solid(RadiatorSolid::Tube {
            inner_radius: 1.0,
            outer_radius: 2.0,
            half_length: 5.0,
        });
        let path = model
            .path_for_binding(&particle, 8.0, &binding, "Pipe", &mut rng)
            .unwrap();
        assert!(!path.smeared);
        assert_relative_eq!(path.path_length(), 2.0, epsilon = 1e-12);
        let (g0, g1) = path.window.gap.unwrap();
        assert_relative_eq!(g0, 0.375, epsilon = 1e-12);
        assert_relative_eq!(g1, 0.625, epsilon = 1e-12);
    }

    #[test]
    fn test_preview_leaves_counters_alone() {
        let model = ThinTargetGeometryModel::new(SmearingPolicy::Relative { fraction: 0.5 });
        let particle = particle_through_origin([0.0, 0.0, 1.0], 1.0);
        let binding = MaterialModelBinding::thin_solid(RadiatorSolid::Other {
            name: "Polycone".to_string(),
        });
        let path = model
            .preview_for_binding(&particle, 1.0, &binding, "Foil")
            .unwrap();
        assert!(path.smeared);
        assert_eq!(path.path_length(), 1.0);
        assert_eq!(model.ambiguity_count(), 0);

        let slab = model
            .preview_for_binding(&particle, 1.0, &MaterialModelBinding::thin_slab(0.05), "Foil")
            .unwrap();
        assert_relative_eq!(slab.path_length(), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_inconsistent_binding_is_an_error() {
        let model = ThinTargetGeometryModel::default();
        let mut rng = StdRng::seed_from_u64(5);
        let particle = particle_through_origin([0.0, 0.0, 1.0], 1.0);
        let binding = MaterialModelBinding::thin_solid(RadiatorSolid::Unbounded);
        assert!(model
            .path_for_binding(&particle, 1.0, &binding, "Foil", &mut rng)
            .is_err());
    }
}
