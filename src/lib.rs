// Core modules; the common types are re-exported at the crate root
pub mod binding;
pub mod cdf;
pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod fast_rng;
pub mod material;
pub mod particle;
pub mod physics;
pub mod physics_table;
pub mod sampler;
pub mod solid;
pub mod spectrum;
pub mod stats;
pub mod table_registry;
pub mod thin_target;
pub mod utilities;

pub use binding::{BindingRegistry, MaterialModelBinding, ModelKind};
pub use cdf::{BigBetaCdf, EnergyCdf};
pub use config::{Config, SmearingPolicy};
pub use diagnostics::{dump_table_diagnostics, DiagnosticsTarget};
pub use dispatcher::{ModelDispatcher, ModelState, SamplingModel};
pub use error::{CherenkovError, CherenkovResult};
pub use fast_rng::TrackRng;
pub use material::OpticalMaterial;
pub use particle::{ParticleState, StepPoint};
pub use physics_table::{BetaNode, NodeSampling, PhysicsTable, PhysicsTableBuilder};
pub use sampler::{EmissionWindow, EmittedPhoton, EmittedPhotonBatch, PhotonYieldSampler, StepLimits};
pub use solid::RadiatorSolid;
pub use spectrum::RefractiveIndexSpectrum;
pub use stats::{AzimuthContext, AzimuthSampler, UniformAzimuth};
pub use table_registry::{build_or_get_physics_table, global_registry, set_global_beta_steps, TableRegistry};
pub use thin_target::{ThinTargetGeometryModel, ThinTargetPath};
