// Routes each transport step to the sampling model bound to its material
use crate::binding::{BindingRegistry, ModelKind};
use crate::config::Config;
use crate::error::{CherenkovError, CherenkovResult};
use crate::material::OpticalMaterial;
use crate::particle::ParticleState;
use crate::physics_table::PhysicsTable;
use crate::sampler::{EmissionWindow, EmittedPhotonBatch, PhotonYieldSampler, StepLimits};
use crate::stats::AzimuthSampler;
use crate::table_registry::{shared_global_registry, TableRegistry};
use crate::thin_target::{ThinTargetGeometryModel, ThinTargetPath};
use rand::{Rng, RngCore};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A binding as the dispatcher tracks it: the material, plus the volume
/// when a volume binding overrides the material's own.
type BindingKey = (u32, Option<String>);

#[derive(Debug, Clone)]
struct BindingState {
    state: ModelState,
    /// Error text of the current fault, if faulted
    fault: Option<String>,
}

/// Where a material stands in the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    StandardModel,
    ThinTargetModel,
    /// Thin-target binding without a usable radiator; no photons until fixed
    Faulted,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelState::Uninitialized => "uninitialized",
            ModelState::StandardModel => "standard",
            ModelState::ThinTargetModel => "thin-target",
            ModelState::Faulted => "faulted",
        };
        f.write_str(name)
    }
}

/// The sampling model chosen for one step, with the geometry it needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingModel {
    /// Infinite radiator: the whole step radiates
    Standard { step_length: f64 },
    /// Finite radiator: only the chord through the solid radiates
    ThinTarget { path: ThinTargetPath },
}

impl SamplingModel {
    pub fn state(&self) -> ModelState {
        match self {
            SamplingModel::Standard { .. } => ModelState::StandardModel,
            SamplingModel::ThinTarget { .. } => ModelState::ThinTargetModel,
        }
    }

    pub fn window(&self) -> EmissionWindow {
        match self {
            SamplingModel::Standard { step_length } => EmissionWindow::full_step(*step_length),
            SamplingModel::ThinTarget { path } => path.window,
        }
    }

    /// Expected photon count for this step.
    pub fn compute_mean_yield(
        &self,
        sampler: &PhotonYieldSampler,
        table: &PhysicsTable,
        particle: &ParticleState,
    ) -> f64 {
        let window = self.window();
        if !(window.path_length > 0.0) {
            return 0.0;
        }
        let start = sampler.mean_yield_per_length(table, particle.beta_at(window.start), particle.charge);
        let end = sampler.mean_yield_per_length(table, particle.beta_at(window.end), particle.charge);
        0.5 * (start + end) * window.path_length
    }

    /// Every photon of one step, with energies drawn through
    /// [`sample_energy`](Self::sample_energy).
    pub fn sample_photons<R: RngCore + ?Sized>(
        &self,
        sampler: &PhotonYieldSampler,
        table: &PhysicsTable,
        particle: &ParticleState,
        rng: &mut R,
    ) -> EmittedPhotonBatch {
        sampler.sample_photons_with(table, particle, self.window(), rng, |table, beta, rng| {
            self.sample_energy(sampler, table, beta, rng)
        })
    }

    /// One photon energy at `beta`.
    pub fn sample_energy<R: Rng + ?Sized>(
        &self,
        sampler: &PhotonYieldSampler,
        table: &PhysicsTable,
        beta: f64,
        rng: &mut R,
    ) -> Option<f64> {
        match self {
            SamplingModel::Standard { .. } => sampler.sample_energy(table, beta, rng),
            SamplingModel::ThinTarget { path } if path.window.path_length > 0.0 => {
                sampler.sample_energy(table, beta, rng)
            }
            SamplingModel::ThinTarget { .. } => None,
        }
    }

    pub fn dump_info(&self, table: &PhysicsTable) -> String {
        let kind = match self {
            SamplingModel::Standard { step_length } => format!("standard model, step {:.6} mm", step_length),
            SamplingModel::ThinTarget { path } => format!(
                "thin-target model, path {:.6} mm over step fraction [{:.4}, {:.4}]{}{}",
                path.window.path_length,
                path.window.start,
                path.window.end,
                path.window
                    .gap
                    .map_or(String::new(), |(g0, g1)| format!(" minus [{:.4}, {:.4}]", g0, g1)),
                if path.smeared { " (smeared)" } else { "" }
            ),
        };
        format!(
            "{} (id {}): {}; beta range [{:.6}, {:.6}], {} nodes{}",
            table.material_name,
            table.material_id,
            kind,
            table.beta_min,
            table.beta_max,
            table.nodes.len(),
            if table.exotic { ", exotic spectrum" } else { "" }
        )
    }
}

/// Per-step entry point for the transport loop.
///
/// Shared by reference across worker threads. Tables are built on first
/// contact with a material and bindings are read on every step. Model state
/// is tracked per binding (material, or material inside an overriding
/// volume), so a broken thin-target binding is reported once while it
/// stays broken, however the steps alternate between volumes.
#[derive(Debug)]
pub struct ModelDispatcher {
    tables: Arc<TableRegistry>,
    bindings: Arc<BindingRegistry>,
    sampler: PhotonYieldSampler,
    thin_target: ThinTargetGeometryModel,
    limits: StepLimits,
    verbosity: u8,
    states: RwLock<HashMap<BindingKey, BindingState>>,
    fault_reports: AtomicU64,
}

impl ModelDispatcher {
    pub fn new(tables: Arc<TableRegistry>, bindings: Arc<BindingRegistry>, config: &Config) -> Self {
        ModelDispatcher {
            tables,
            bindings,
            sampler: PhotonYieldSampler::from_config(config),
            thin_target: ThinTargetGeometryModel::from_config(config),
            limits: StepLimits::from(config),
            verbosity: config.verbosity,
            states: RwLock::new(HashMap::new()),
            fault_reports: AtomicU64::new(0),
        }
    }

    /// Dispatcher on the global table registry and global configuration.
    pub fn from_global_config(bindings: Arc<BindingRegistry>) -> Self {
        let config = Config::snapshot();
        Self::new(shared_global_registry(), bindings, &config)
    }

    pub fn with_azimuth_sampler(mut self, azimuth: Arc<dyn AzimuthSampler>) -> Self {
        self.sampler = self.sampler.with_azimuth_sampler(azimuth);
        self
    }

    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    pub fn sampler(&self) -> &PhotonYieldSampler {
        &self.sampler
    }

    pub fn thin_target(&self) -> &ThinTargetGeometryModel {
        &self.thin_target
    }

    /// State of a material's own binding.
    pub fn state(&self, material_id: u32) -> ModelState {
        self.state_in(material_id, None)
    }

    /// State of the binding that serves `material_id` inside `volume`.
    pub fn state_in(&self, material_id: u32, volume: Option<&str>) -> ModelState {
        let (_, source) = self.bindings.peek(material_id, volume);
        self.key_state(&(material_id, source))
    }

    /// Number of faults reported so far. A binding that stays broken is
    /// reported once.
    pub fn fault_reports(&self) -> u64 {
        self.fault_reports.load(Ordering::Relaxed)
    }

    fn key_state(&self, key: &BindingKey) -> ModelState {
        self.states
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(key)
            .map_or(ModelState::Uninitialized, |entry| entry.state)
    }

    /// Sample the Cherenkov photons of one step.
    ///
    /// Never fails: materials without a usable table, faulted bindings and
    /// neutral particles all give an empty batch.
    pub fn sample_step<R: RngCore + ?Sized>(
        &self,
        particle: &ParticleState,
        material: &OpticalMaterial,
        step_length: f64,
        rng: &mut R,
    ) -> EmittedPhotonBatch {
        let id = material.material_id;
        if particle.charge == 0.0 || !(step_length > 0.0) {
            return EmittedPhotonBatch::empty(id);
        }
        let Ok(table) = self.tables.build_or_get(material) else {
            return EmittedPhotonBatch::empty(id);
        };
        let Some(model) = self.resolve_model(particle, material, &table, step_length, rng) else {
            return EmittedPhotonBatch::empty(id);
        };
        if !table.radiating() {
            return EmittedPhotonBatch::empty(id);
        }
        model.sample_photons(&self.sampler, &table, particle, rng)
    }

    /// Expected photon count for a step, without drawing photons.
    pub fn mean_yield<R: Rng + ?Sized>(
        &self,
        particle: &ParticleState,
        material: &OpticalMaterial,
        step_length: f64,
        rng: &mut R,
    ) -> f64 {
        let Ok(table) = self.tables.build_or_get(material) else {
            return 0.0;
        };
        self.resolve_model(particle, material, &table, step_length, rng)
            .map_or(0.0, |model| model.compute_mean_yield(&self.sampler, &table, particle))
    }

    /// Longest step (mm) keeping the configured photon count and beta change
    /// limits. `INFINITY` when neither limit is set or nothing radiates.
    pub fn step_limit(&self, particle: &ParticleState, material: &OpticalMaterial) -> f64 {
        let Ok(table) = self.tables.build_or_get(material) else {
            return f64::INFINITY;
        };
        let length = particle.segment_length();
        let dbeta_dl = if length > 0.0 {
            Some((particle.post.beta - particle.pre.beta).abs() / length)
        } else {
            None
        };
        self.sampler
            .step_limit(&table, particle.pre.beta, particle.charge, dbeta_dl, &self.limits)
    }

    /// Describe the model that would serve a material for this step.
    ///
    /// Read-only: no state transition, no smearing draw and no ambiguity is
    /// counted. The table is built if this is the first contact.
    pub fn dump_info(&self, particle: &ParticleState, material: &OpticalMaterial, step_length: f64) -> String {
        let Ok(table) = self.tables.build_or_get(material) else {
            return format!("{}: non-radiating (no usable refractive index)", material.label());
        };
        match self.preview_model(particle, material, &table, step_length) {
            Ok(model) => model.dump_info(&table),
            Err(err) => format!("{}: faulted ({}), no photons until the binding is corrected", material.label(), err),
        }
    }

    fn preview_model(
        &self,
        particle: &ParticleState,
        material: &OpticalMaterial,
        table: &PhysicsTable,
        step_length: f64,
    ) -> CherenkovResult<SamplingModel> {
        let (binding, _) = self.bindings.peek(material.material_id, particle.volume.as_deref());
        match binding.model {
            ModelKind::Default | ModelKind::Standard => Ok(SamplingModel::Standard { step_length }),
            ModelKind::ThinTarget => self
                .thin_target
                .preview_for_binding(particle, step_length, &binding, &table.material_name)
                .map(|path| SamplingModel::ThinTarget { path }),
        }
    }

    fn resolve_model<R: Rng + ?Sized>(
        &self,
        particle: &ParticleState,
        material: &OpticalMaterial,
        table: &PhysicsTable,
        step_length: f64,
        rng: &mut R,
    ) -> Option<SamplingModel> {
        let id = material.material_id;
        if table.exotic && !self.bindings.is_exotic(id) {
            self.bindings.mark_exotic(id);
        }
        let (binding, source) = self.bindings.resolve(id, particle.volume.as_deref());
        let key = (id, source);
        let model = match binding.model {
            ModelKind::Default | ModelKind::Standard => SamplingModel::Standard { step_length },
            ModelKind::ThinTarget => {
                match self
                    .thin_target
                    .path_for_binding(particle, step_length, &binding, &table.material_name, rng)
                {
                    Ok(path) => SamplingModel::ThinTarget { path },
                    Err(err) => {
                        self.enter_faulted(&key, &err);
                        return None;
                    }
                }
            }
        };
        self.transition(&key, model.state(), &table.material_name);
        Some(model)
    }

    fn transition(&self, key: &BindingKey, next: ModelState, name: &str) {
        let previous = self.key_state(key);
        if previous == next {
            return;
        }
        self.states.write().unwrap_or_else(|p| p.into_inner()).insert(
            key.clone(),
            BindingState {
                state: next,
                fault: None,
            },
        );
        if previous == ModelState::Faulted {
            if self.verbosity >= 1 {
                log::info!(
                    "{}{}: binding corrected, leaving faulted state for {} model",
                    name,
                    volume_suffix(key),
                    next
                );
            }
        } else if self.verbosity >= 2 {
            log::info!("{}{}: {} -> {} model", name, volume_suffix(key), previous, next);
        }
    }

    fn enter_faulted(&self, key: &BindingKey, err: &CherenkovError) {
        let message = err.to_string();
        let mut states = self.states.write().unwrap_or_else(|p| p.into_inner());
        let entry = states.entry(key.clone()).or_insert(BindingState {
            state: ModelState::Uninitialized,
            fault: None,
        });
        let repeated = entry.state == ModelState::Faulted && entry.fault.as_deref() == Some(message.as_str());
        entry.state = ModelState::Faulted;
        entry.fault = Some(message);
        drop(states);
        if repeated {
            return;
        }
        self.fault_reports.fetch_add(1, Ordering::Relaxed);
        if self.verbosity >= 1 {
            log::warn!(
                "{}{}; no Cherenkov photons from this binding until corrected",
                err,
                volume_suffix(key)
            );
        }
    }
}

fn volume_suffix(key: &BindingKey) -> String {
    key.1
        .as_ref()
        .map_or(String::new(), |volume| format!(" in volume {}", volume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::MaterialModelBinding;
    use crate::constants::FRANK_TAMM_FACTOR;
    use crate::spectrum::RefractiveIndexSpectrum;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dispatcher(bindings: BindingRegistry) -> ModelDispatcher {
        let tables = Arc::new(TableRegistry::new(20).unwrap());
        ModelDispatcher::new(tables, Arc::new(bindings), &Config::new())
    }

    fn flat(id: u32, n: f64) -> OpticalMaterial {
        OpticalMaterial::with_spectrum(id, "Flat", RefractiveIndexSpectrum::new(vec![2.0, 4.0], vec![n, n]))
    }

    fn muon(step: f64) -> ParticleState {
        ParticleState::new(1.0, 0.99, [0.0, 0.0, -step / 2.0], [0.0, 0.0, 1.0]).with_step(step, 0.99)
    }

    #[test]
    fn test_standard_step_mean_count() {
        let d = dispatcher(BindingRegistry::new());
        let material = flat(1, 1.5);
        let mut rng = StdRng::seed_from_u64(1);
        let batch = d.sample_step(&muon(10.0), &material, 10.0, &mut rng);
        let expected = FRANK_TAMM_FACTOR * 2.0 * (1.0 - 1.0 / (0.99 * 0.99 * 2.25)) * 10.0;
        assert_relative_eq!(batch.mean_count, expected, max_relative = 1e-3);
        assert!(batch.count() > 0);
        assert_eq!(d.state(1), ModelState::StandardModel);
    }

    #[test]
    fn test_thin_target_uses_chord_length() {
        let bindings = BindingRegistry::new();
        bindings.bind_material(2, MaterialModelBinding::thin_slab(0.05));
        let d = dispatcher(bindings);
        let material = flat(2, 1.5);
        let mut rng = StdRng::seed_from_u64(2);
        let particle = muon(2.0);
        let batch = d.sample_step(&particle, &material, 2.0, &mut rng);
        assert_relative_eq!(batch.path_length, 0.1, epsilon = 1e-12);
        let per_mm = FRANK_TAMM_FACTOR * 2.0 * (1.0 - 1.0 / (0.99 * 0.99 * 2.25));
        assert_relative_eq!(batch.mean_count, per_mm * 0.1, max_relative = 1e-3);
        for photon in &batch.photons {
            assert!(photon.position.z.abs() <= 0.05 + 1e-12);
        }
        assert_eq!(d.state(2), ModelState::ThinTargetModel);
        assert_relative_eq!(d.mean_yield(&particle, &material, 2.0, &mut rng), batch.mean_count);
    }

    #[test]
    fn test_faulted_binding_reports_once_and_recovers() {
        let bindings = Arc::new(BindingRegistry::new());
        bindings.bind_material(
            3,
            MaterialModelBinding {
                model: ModelKind::ThinTarget,
                ..Default::default()
            },
        );
        let tables = Arc::new(TableRegistry::new(20).unwrap());
        let d = ModelDispatcher::new(tables, Arc::clone(&bindings), &Config::new());
        let material = flat(3, 1.5);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..5 {
            let batch = d.sample_step(&muon(2.0), &material, 2.0, &mut rng);
            assert!(batch.is_empty());
            assert_eq!(d.state(3), ModelState::Faulted);
        }
        assert_eq!(d.fault_reports(), 1);
        assert!(d.dump_info(&muon(2.0), &material, 2.0).contains("faulted"));

        bindings.bind_material(3, MaterialModelBinding::thin_slab(0.05));
        let batch = d.sample_step(&muon(2.0), &material, 2.0, &mut rng);
        assert!(batch.mean_count > 0.0);
        assert_eq!(d.state(3), ModelState::ThinTargetModel);
    }

    #[test]
    fn test_broken_volume_binding_reported_once_across_volumes() {
        let bindings = Arc::new(BindingRegistry::new());
        bindings.bind_material(3, MaterialModelBinding::standard());
        bindings.bind_volume(
            "Foil",
            MaterialModelBinding {
                model: ModelKind::ThinTarget,
                ..Default::default()
            },
        );
        let tables = Arc::new(TableRegistry::new(20).unwrap());
        let d = ModelDispatcher::new(tables, Arc::clone(&bindings), &Config::new());
        let material = flat(3, 1.5);
        let mut rng = StdRng::seed_from_u64(12);
        for i in 0..20 {
            let volume = if i % 2 == 0 { "Foil" } else { "World" };
            let batch = d.sample_step(&muon(2.0).with_volume(volume), &material, 2.0, &mut rng);
            assert_eq!(batch.is_empty() && batch.mean_count == 0.0, volume == "Foil");
        }
        assert_eq!(d.fault_reports(), 1);
        assert_eq!(d.state_in(3, Some("Foil")), ModelState::Faulted);
        assert_eq!(d.state_in(3, Some("World")), ModelState::StandardModel);
        assert_eq!(d.state(3), ModelState::StandardModel);

        bindings.bind_volume("Foil", MaterialModelBinding::thin_slab(0.05));
        let batch = d.sample_step(&muon(2.0).with_volume("Foil"), &material, 2.0, &mut rng);
        assert!(batch.mean_count > 0.0);
        assert_eq!(d.state_in(3, Some("Foil")), ModelState::ThinTargetModel);
        assert_eq!(d.fault_reports(), 1);
    }

    #[test]
    fn test_dump_info_has_no_side_effects() {
        let bindings = BindingRegistry::new();
        bindings.bind_material(
            13,
            MaterialModelBinding::thin_solid(crate::solid::RadiatorSolid::Other {
                name: "Polycone".to_string(),
            }),
        );
        bindings.bind_material(
            14,
            MaterialModelBinding {
                model: ModelKind::ThinTarget,
                ..Default::default()
            },
        );
        let d = dispatcher(bindings);
        let info = d.dump_info(&muon(2.0), &flat(13, 1.5), 2.0);
        assert!(info.contains("thin-target model"));
        assert!(info.contains("smeared"));
        assert_eq!(d.thin_target().ambiguity_count(), 0);
        assert_eq!(d.state(13), ModelState::Uninitialized);

        assert!(d.dump_info(&muon(2.0), &flat(14, 1.5), 2.0).contains("faulted"));
        assert_eq!(d.state(14), ModelState::Uninitialized);
        assert_eq!(d.fault_reports(), 0);

        assert!(d.dump_info(&muon(2.0), &flat(15, 1.5), 2.0).contains("standard model"));
        assert!(!d.bindings().to_table().materials.contains_key(&15));
    }

    #[test]
    fn test_volume_binding_selects_model() {
        let bindings = BindingRegistry::new();
        bindings.bind_volume("Foil", MaterialModelBinding::thin_slab(0.05));
        let d = dispatcher(bindings);
        let material = flat(4, 1.5);
        let mut rng = StdRng::seed_from_u64(4);
        let in_foil = d.sample_step(&muon(2.0).with_volume("Foil"), &material, 2.0, &mut rng);
        let elsewhere = d.sample_step(&muon(2.0).with_volume("Tank"), &material, 2.0, &mut rng);
        assert_relative_eq!(in_foil.path_length, 0.1, epsilon = 1e-12);
        assert_relative_eq!(elsewhere.path_length, 2.0);
    }

    #[test]
    fn test_sub_threshold_and_broken_materials_emit_nothing() {
        let d = dispatcher(BindingRegistry::new());
        let mut rng = StdRng::seed_from_u64(5);
        let slow = ParticleState::new(1.0, 0.5, [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]).with_step(5.0, 0.5);
        let batch = d.sample_step(&slow, &flat(5, 1.5), 5.0, &mut rng);
        assert!(batch.is_empty());
        assert_eq!(batch.mean_count, 0.0);

        let broken = OpticalMaterial::with_spectrum(6, "Broken", RefractiveIndexSpectrum::new(vec![], vec![]));
        assert!(d.sample_step(&muon(5.0), &broken, 5.0, &mut rng).is_empty());
        assert!(d.tables().is_non_radiating(6));

        let no_spectrum = OpticalMaterial::new(7);
        assert!(d.sample_step(&muon(5.0), &no_spectrum, 5.0, &mut rng).is_empty());
    }

    #[test]
    fn test_exotic_table_marks_binding() {
        let d = dispatcher(BindingRegistry::new());
        let material = OpticalMaterial::with_spectrum(
            8,
            "Bumpy",
            RefractiveIndexSpectrum::new(vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![1.1, 1.5, 1.1, 1.5, 1.1]),
        );
        let mut rng = StdRng::seed_from_u64(8);
        let particle = ParticleState::new(1.0, 1.0 / 1.3, [0.0; 3], [0.0, 0.0, 1.0]).with_step(1.0, 1.0 / 1.3);
        d.sample_step(&particle, &material, 1.0, &mut rng);
        assert!(d.bindings().is_exotic(8));
    }

    #[test]
    fn test_step_limit_from_config() {
        let config = Config {
            max_photons_per_step: Some(10.0),
            ..Config::new()
        };
        let d = ModelDispatcher::new(
            Arc::new(TableRegistry::new(20).unwrap()),
            Arc::new(BindingRegistry::new()),
            &config,
        );
        let material = flat(9, 1.5);
        let particle = muon(1.0);
        let per_mm = FRANK_TAMM_FACTOR * 2.0 * (1.0 - 1.0 / (0.99 * 0.99 * 2.25));
        assert_relative_eq!(d.step_limit(&particle, &material), 10.0 / per_mm, max_relative = 1e-3);
    }

    #[test]
    fn test_neutral_particle_and_zero_step() {
        let d = dispatcher(BindingRegistry::new());
        let mut rng = StdRng::seed_from_u64(10);
        let neutral = ParticleState::new(0.0, 0.99, [0.0; 3], [0.0, 0.0, 1.0]).with_step(1.0, 0.99);
        assert!(d.sample_step(&neutral, &flat(10, 1.5), 1.0, &mut rng).is_empty());
        assert!(d.sample_step(&muon(1.0), &flat(10, 1.5), 0.0, &mut rng).is_empty());
        assert_eq!(d.state(10), ModelState::Uninitialized);
    }

    #[test]
    fn test_sampling_model_variants() {
        use crate::physics_table::PhysicsTableBuilder;
        let table = PhysicsTableBuilder::new(20).unwrap().build(&flat(11, 1.5)).unwrap();
        let sampler = PhotonYieldSampler::default();
        let particle = muon(1.0);
        let mut rng = StdRng::seed_from_u64(11);

        let standard = SamplingModel::Standard { step_length: 1.0 };
        let missed = SamplingModel::ThinTarget {
            path: ThinTargetPath {
                window: EmissionWindow {
                    start: 0.0,
                    end: 0.0,
                    path_length: 0.0,
                    gap: None,
                },
                smeared: false,
            },
        };
        assert!(standard.compute_mean_yield(&sampler, &table, &particle) > 0.0);
        assert_eq!(missed.compute_mean_yield(&sampler, &table, &particle), 0.0);
        assert!(standard.sample_energy(&sampler, &table, 0.99, &mut rng).is_some());
        assert!(missed.sample_energy(&sampler, &table, 0.99, &mut rng).is_none());
        assert!(!standard.sample_photons(&sampler, &table, &particle, &mut rng).is_empty());
        assert!(missed.sample_photons(&sampler, &table, &particle, &mut rng).is_empty());
        assert!(standard.dump_info(&table).contains("standard model"));
        assert!(missed.dump_info(&table).contains("thin-target model"));
        assert_eq!(missed.state(), ModelState::ThinTargetModel);
    }
}
