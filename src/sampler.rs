// Per-step photon count, energy and direction sampling
use crate::cdf::frank_tamm_integrand;
use crate::config::Config;
use crate::constants::FRANK_TAMM_FACTOR;
use crate::error::internal_inconsistency;
use crate::particle::ParticleState;
use crate::physics::{cherenkov_cos_theta, cherenkov_polarization, cone_direction};
use crate::physics_table::PhysicsTable;
use crate::spectrum::RefractiveIndexSpectrum;
use crate::stats::{AzimuthContext, AzimuthSampler, UniformAzimuth};
use nalgebra::{Point3, Vector3};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, Poisson};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Give up on an energy draw after this many rejected candidates.
const MAX_REJECTION_TRIALS: usize = 10_000;

/// Energy draws attempted for one photon before it is given up.
const MAX_ENERGY_ATTEMPTS: usize = 8;

/// One Cherenkov photon.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedPhoton {
    /// Photon energy (eV)
    pub energy: f64,
    /// Unit direction (global frame)
    pub direction: Vector3<f64>,
    /// Unit linear polarisation
    pub polarization: Vector3<f64>,
    /// Global emission point (mm)
    pub position: Point3<f64>,
    /// Global emission time (ns)
    pub time: f64,
    /// Cosine of the cone half-angle
    pub cos_theta: f64,
}

/// Photons produced by one step, plus the bookkeeping the transport loop
/// needs to apply the step's outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedPhotonBatch {
    pub material_id: u32,
    pub photons: Vec<EmittedPhoton>,
    /// Poisson mean the count was drawn from
    pub mean_count: f64,
    /// Path length (mm) the yield was integrated over
    pub path_length: f64,
    /// Sum of photon energies (eV)
    pub radiated_energy: f64,
    /// Kinetic energy after the step when energy loss is enabled
    pub kinetic_energy_after: Option<f64>,
    /// Photons of the Poisson draw that got no valid energy
    pub dropped: usize,
}

impl EmittedPhotonBatch {
    /// A step that produced nothing.
    pub fn empty(material_id: u32) -> Self {
        EmittedPhotonBatch {
            material_id,
            photons: Vec::new(),
            mean_count: 0.0,
            path_length: 0.0,
            radiated_energy: 0.0,
            kinetic_energy_after: None,
            dropped: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.photons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photons.is_empty()
    }
}

/// Part of a step over which photons may be emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionWindow {
    /// Start, as a fraction of the step
    pub start: f64,
    /// End, as a fraction of the step
    pub end: f64,
    /// Path length (mm) inside the radiator
    pub path_length: f64,
    /// Stretch of the window outside material, such as a tube bore
    pub gap: Option<(f64, f64)>,
}

impl EmissionWindow {
    /// The whole step radiates over `path_length`.
    pub fn full_step(path_length: f64) -> Self {
        EmissionWindow {
            start: 0.0,
            end: 1.0,
            path_length,
            gap: None,
        }
    }

    /// True if a photon may be emitted at `fraction` of the step.
    pub fn contains(&self, fraction: f64) -> bool {
        if fraction < self.start.min(self.end) || fraction > self.start.max(self.end) {
            return false;
        }
        match self.gap {
            Some((g0, g1)) => !(fraction > g0 && fraction < g1),
            None => true,
        }
    }
}

/// Optional step-limit criteria.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepLimits {
    pub max_photons_per_step: Option<f64>,
    pub max_beta_change: Option<f64>,
}

impl From<&Config> for StepLimits {
    fn from(config: &Config) -> Self {
        StepLimits {
            max_photons_per_step: config.max_photons_per_step,
            max_beta_change: config.max_beta_change,
        }
    }
}

/// Draws photon counts, energies and directions from a material's table.
///
/// Mean yield follows Frank–Tamm,
/// dN/dl = α z²/(ħc) · (∫dE − ∫dE/n² / β²), with the integrals interpolated
/// from the table. Counts are Poisson. Energies come from the nearest node's
/// inverse CDF when it has one, otherwise from a uniform draw over the
/// qualifying window with rejection on 1 − 1/(β²n²).
#[derive(Debug)]
pub struct PhotonYieldSampler {
    energy_loss: bool,
    azimuth: Arc<dyn AzimuthSampler>,
    warned_materials: Mutex<HashSet<u32>>,
}

impl Default for PhotonYieldSampler {
    fn default() -> Self {
        Self::new(false)
    }
}

impl PhotonYieldSampler {
    pub fn new(energy_loss: bool) -> Self {
        PhotonYieldSampler {
            energy_loss,
            azimuth: Arc::new(UniformAzimuth),
            warned_materials: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.energy_loss)
    }

    /// Replace the azimuth hook.
    pub fn with_azimuth_sampler(mut self, azimuth: Arc<dyn AzimuthSampler>) -> Self {
        self.azimuth = azimuth;
        self
    }

    pub fn azimuth_sampler(&self) -> &dyn AzimuthSampler {
        self.azimuth.as_ref()
    }

    pub fn energy_loss(&self) -> bool {
        self.energy_loss
    }

    /// Mean number of photons per mm at `beta` for a particle of `charge`.
    ///
    /// Out-of-range betas are clamped to the table and reported once per
    /// material. The result is never negative.
    pub fn mean_yield_per_length(&self, table: &PhysicsTable, beta: f64, charge: f64) -> f64 {
        if !(beta > 0.0) || !table.radiating() {
            return 0.0;
        }
        let lookup = table.integrals_at(beta);
        if lookup.clamped {
            self.warn_clamped(table, beta);
        }
        if beta < table.beta_min {
            return 0.0;
        }
        let value = FRANK_TAMM_FACTOR * charge * charge * lookup.yield_integral();
        if value < 0.0 || value.is_nan() {
            internal_inconsistency(
                &table.material_name,
                "mean yield",
                &format!("yield {} at beta {}", value, beta),
            );
        }
        value
    }

    /// Poisson draw with mean `mean`; zero for non-positive means.
    pub fn sample_count<R: Rng + ?Sized>(&self, mean: f64, rng: &mut R) -> usize {
        if !(mean > 0.0) || !mean.is_finite() {
            return 0;
        }
        match Poisson::new(mean) {
            Ok(poisson) => {
                let n: f64 = poisson.sample(rng);
                n as usize
            }
            Err(_) => 0,
        }
    }

    /// Draw one photon energy (eV) at `beta`, or `None` if nothing radiates.
    pub fn sample_energy<R: Rng + ?Sized>(
        &self,
        table: &PhysicsTable,
        beta: f64,
        rng: &mut R,
    ) -> Option<f64> {
        if !table.radiating() || !(beta >= table.beta_min) {
            return None;
        }
        let beta = beta.min(1.0);
        if beta >= table.beta_max {
            if let Some(big) = &table.big_beta {
                if table.exotic {
                    return big.sample(beta, rng, &table.material_name);
                }
                return sample_by_rejection(table.spectrum(), beta, rng);
            }
        }
        let beta = beta.clamp(table.beta_min, table.beta_max);
        if let Some(cdf) = table.nearest_node(beta).and_then(|node| node.cdf()) {
            return Some(cdf.sample(rng, &table.material_name));
        }
        sample_by_rejection(table.spectrum(), beta, rng)
    }

    /// Sample every photon of one step over `window`.
    pub fn sample_photons<R: RngCore + ?Sized>(
        &self,
        table: &PhysicsTable,
        particle: &ParticleState,
        window: EmissionWindow,
        rng: &mut R,
    ) -> EmittedPhotonBatch {
        self.sample_photons_with(table, particle, window, rng, |table, beta, rng| {
            self.sample_energy(table, beta, rng)
        })
    }

    /// Like [`sample_photons`](Self::sample_photons), with photon energies
    /// drawn by `draw_energy(table, beta, rng)`.
    ///
    /// A photon whose energy draw fails, or lands where β·n(E) < 1, is
    /// redrawn a few times before it is counted in `dropped`.
    pub fn sample_photons_with<R, F>(
        &self,
        table: &PhysicsTable,
        particle: &ParticleState,
        window: EmissionWindow,
        rng: &mut R,
        mut draw_energy: F,
    ) -> EmittedPhotonBatch
    where
        R: RngCore + ?Sized,
        F: FnMut(&PhysicsTable, f64, &mut R) -> Option<f64>,
    {
        let mut batch = EmittedPhotonBatch::empty(table.material_id);
        batch.path_length = window.path_length;
        if self.energy_loss {
            batch.kinetic_energy_after = Some(particle.kinetic_energy);
        }
        if !(window.path_length > 0.0) || particle.charge == 0.0 {
            return batch;
        }

        let beta_start = particle.beta_at(window.start);
        let beta_end = particle.beta_at(window.end);
        let yield_start = self.mean_yield_per_length(table, beta_start, particle.charge);
        let yield_end = self.mean_yield_per_length(table, beta_end, particle.charge);
        let yield_max = yield_start.max(yield_end);
        batch.mean_count = 0.5 * (yield_start + yield_end) * window.path_length;

        let count = self.sample_count(batch.mean_count, rng);
        if count == 0 || yield_max <= 0.0 {
            return batch;
        }
        batch.photons.reserve(count);

        for _ in 0..count {
            // emission point: density falls linearly with the yield along the
            // window, and nothing is emitted across a gap
            let fraction = loop {
                let delta: f64 = rng.gen();
                let local_yield = yield_start - delta * (yield_start - yield_end);
                if rng.gen::<f64>() * yield_max > local_yield {
                    continue;
                }
                let fraction = window.start + delta * (window.end - window.start);
                if window.contains(fraction) {
                    break fraction;
                }
            };
            let beta = particle.beta_at(fraction);

            let mut drawn = None;
            for _ in 0..MAX_ENERGY_ATTEMPTS {
                let Some(energy) = draw_energy(table, beta, &mut *rng) else {
                    continue;
                };
                let n = table.spectrum().index_at(energy);
                let cos_theta = cherenkov_cos_theta(beta, n);
                // rounding at the threshold energy
                if cos_theta <= 1.0 + 1e-12 {
                    drawn = Some((energy, cos_theta.min(1.0)));
                    break;
                }
            }
            let Some((energy, cos_theta)) = drawn else {
                batch.dropped += 1;
                continue;
            };

            let position = particle.position_at(fraction);
            let context = AzimuthContext {
                axis: particle.direction,
                emission_point: position,
                photon_energy: energy,
                cos_theta,
            };
            let phi = self.azimuth.sample_azimuth(&context, &mut AsDynRng(&mut *rng));
            let direction = cone_direction(&particle.direction, cos_theta, phi);
            let polarization = cherenkov_polarization(&particle.direction, &direction, cos_theta);

            batch.radiated_energy += energy;
            batch.photons.push(EmittedPhoton {
                energy,
                direction,
                polarization,
                position,
                time: particle.time_at(fraction),
                cos_theta,
            });
        }

        if batch.dropped > 0 {
            log::debug!(
                "{}: dropped {} of {} photons with no valid energy after {} draws each",
                table.material_name,
                batch.dropped,
                count,
                MAX_ENERGY_ATTEMPTS
            );
        }
        if self.energy_loss {
            batch.kinetic_energy_after = Some((particle.kinetic_energy - batch.radiated_energy).max(0.0));
        }
        log::trace!(
            "{}: {} photons (mean {:.3}) over {:.4} mm",
            table.material_name,
            batch.count(),
            batch.mean_count,
            batch.path_length
        );
        batch
    }

    /// Longest step (mm) allowed by the optional limits.
    ///
    /// `dbeta_dl` is the host's estimate of |dβ/dl| per mm; without it the
    /// beta-change criterion is skipped. Returns infinity when nothing
    /// limits the step.
    pub fn step_limit(
        &self,
        table: &PhysicsTable,
        beta: f64,
        charge: f64,
        dbeta_dl: Option<f64>,
        limits: &StepLimits,
    ) -> f64 {
        let mut limit = f64::INFINITY;
        let per_mm = self.mean_yield_per_length(table, beta, charge);
        if per_mm <= 0.0 {
            return limit;
        }
        if let Some(max_photons) = limits.max_photons_per_step {
            limit = limit.min(max_photons / per_mm);
        }
        if let (Some(max_change), Some(rate)) = (limits.max_beta_change, dbeta_dl) {
            if rate > 0.0 {
                limit = limit.min(max_change * beta / rate);
            }
        }
        limit
    }

    fn warn_clamped(&self, table: &PhysicsTable, beta: f64) {
        let mut warned = self
            .warned_materials
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if warned.insert(table.material_id) {
            log::warn!(
                "{}: beta {:.6} outside table range [{:.6}, {:.6}], clamping (reported once)",
                table.material_name,
                beta,
                table.beta_min,
                table.beta_max
            );
        }
    }
}

/// Uniform draw over the envelope of the qualifying windows at `beta`,
/// accepted with probability g(E)/g_max where g = 1 − 1/(β²n²).
pub fn sample_by_rejection<R: Rng + ?Sized>(
    spectrum: &RefractiveIndexSpectrum,
    beta: f64,
    rng: &mut R,
) -> Option<f64> {
    let ranges = spectrum.qualifying_ranges(beta);
    let (lo, hi) = (ranges.first()?.0, ranges.last()?.1);
    let g_max = frank_tamm_integrand(beta, spectrum.n_max_between(lo, hi));
    if g_max <= 0.0 {
        return None;
    }
    for _ in 0..MAX_REJECTION_TRIALS {
        let e = lo + (hi - lo) * rng.gen::<f64>();
        if rng.gen::<f64>() * g_max <= frank_tamm_integrand(beta, spectrum.index_at(e)) {
            return Some(e);
        }
    }
    log::debug!(
        "energy rejection gave up after {} trials at beta {:.6}",
        MAX_REJECTION_TRIALS,
        beta
    );
    None
}

/// Lets a generic RNG be handed to the object-safe azimuth hook.
struct AsDynRng<'a, R: RngCore + ?Sized>(&'a mut R);

impl<R: RngCore + ?Sized> RngCore for AsDynRng<'_, R> {
    fn next_u32(&mut self) -> u32 {
        self.0.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.0.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.0.try_fill_bytes(dest)
    }
}
