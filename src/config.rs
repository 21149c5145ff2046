// Global configuration for Cherenkov table construction and sampling
use crate::error::{CherenkovError, CherenkovResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Inclusive bounds on the number of beta discretisation steps.
pub const MIN_BETA_STEPS: usize = 2;
pub const MAX_BETA_STEPS: usize = 255;
pub const DEFAULT_BETA_STEPS: usize = 20;

// Global configuration consulted when tables are built and steps are sampled
pub static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::new()));

/// How the thin-target fallback smears the nominal path length when the
/// exact intersection cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmearingPolicy {
    /// Fixed Gaussian width in mm.
    Absolute { sigma_mm: f64 },
    /// Gaussian width as a fraction of the nominal path length.
    Relative { fraction: f64 },
}

impl SmearingPolicy {
    /// Gaussian width (mm) to use around a nominal path length.
    pub fn sigma_for(&self, nominal_length: f64) -> f64 {
        match *self {
            SmearingPolicy::Absolute { sigma_mm } => sigma_mm,
            SmearingPolicy::Relative { fraction } => fraction * nominal_length.abs(),
        }
    }
}

impl Default for SmearingPolicy {
    fn default() -> Self {
        SmearingPolicy::Absolute { sigma_mm: 1.0e-3 }
    }
}

/// Global configuration container for the Cherenkov core.
///
/// Plain scalar settings: the beta discretisation used by every physics
/// table, the energy-loss switch, the diagnostic verbosity, the thin-target
/// smearing policy and two optional step-limit criteria.
///
/// A single global instance lives in the `CONFIG` static. Code should obtain
/// a guard with [`Config::global`] rather than locking the mutex directly.
/// Changing `beta_steps` here does not touch existing tables; call
/// [`crate::table_registry::TableRegistry::set_beta_steps`] to rebuild them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of beta intervals N (the table holds N+1 nodes).
    pub beta_steps: usize,
    /// Subtract the radiated energy from the particle's kinetic energy.
    pub energy_loss: bool,
    /// 0 = silent, 1 = warnings, 2 = per-material info, 3+ = per-step debug.
    pub verbosity: u8,
    /// Thin-target fallback smearing.
    pub smearing: SmearingPolicy,
    /// Optional cap on the expected number of photons in one step.
    pub max_photons_per_step: Option<f64>,
    /// Optional cap on the fractional change of beta within one step.
    pub max_beta_change: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Config {
            beta_steps: DEFAULT_BETA_STEPS,
            energy_loss: false,
            verbosity: 1,
            smearing: SmearingPolicy::default(),
            max_photons_per_step: None,
            max_beta_change: None,
        }
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> CherenkovResult<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| CherenkovError::configuration("<config>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its valid range.
    pub fn validate(&self) -> CherenkovResult<()> {
        validate_beta_steps(self.beta_steps)?;
        let sigma = match self.smearing {
            SmearingPolicy::Absolute { sigma_mm } => sigma_mm,
            SmearingPolicy::Relative { fraction } => fraction,
        };
        if !(sigma >= 0.0 && sigma.is_finite()) {
            return Err(CherenkovError::InvalidParameter {
                name: "smearing",
                value: sigma,
                message: String::from("smearing width must be finite and non-negative"),
            });
        }
        if let Some(max) = self.max_photons_per_step {
            if !(max > 0.0) {
                return Err(CherenkovError::InvalidParameter {
                    name: "max_photons_per_step",
                    value: max,
                    message: String::from("must be positive"),
                });
            }
        }
        if let Some(max) = self.max_beta_change {
            if !(max > 0.0 && max < 1.0) {
                return Err(CherenkovError::InvalidParameter {
                    name: "max_beta_change",
                    value: max,
                    message: String::from("must lie in (0, 1)"),
                });
            }
        }
        Ok(())
    }

    /// Set the number of beta steps, rejecting values outside [2, 255]
    pub fn set_beta_steps(&mut self, steps: usize) -> CherenkovResult<()> {
        validate_beta_steps(steps)?;
        self.beta_steps = steps;
        Ok(())
    }

    pub fn set_smearing(&mut self, policy: SmearingPolicy) -> CherenkovResult<()> {
        let previous = self.smearing;
        self.smearing = policy;
        if let Err(e) = self.validate() {
            self.smearing = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Restore all defaults
    pub fn clear(&mut self) {
        *self = Config::new();
    }
}

impl Config {
    /// Get the global configuration instance
    pub fn global() -> std::sync::MutexGuard<'static, Self> {
        CONFIG
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the global configuration, so callers do not hold the lock.
    pub fn snapshot() -> Self {
        Self::global().clone()
    }
}

pub fn validate_beta_steps(steps: usize) -> CherenkovResult<()> {
    if !(MIN_BETA_STEPS..=MAX_BETA_STEPS).contains(&steps) {
        return Err(CherenkovError::InvalidParameter {
            name: "beta_steps",
            value: steps as f64,
            message: format!(
                "number of beta steps must lie in [{}, {}]",
                MIN_BETA_STEPS, MAX_BETA_STEPS
            ),
        });
    }
    Ok(())
}
