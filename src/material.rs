// Optical description of a radiator material
use crate::error::{CherenkovError, CherenkovResult};
use crate::spectrum::RefractiveIndexSpectrum;
use serde::{Deserialize, Serialize};

/// The optical properties this core needs from a material description.
///
/// The material (and its spectrum) is owned by the geometry collaborator and
/// read here only. `material_id` is the registry key for the material's
/// physics table, so two materials with the same id must describe the same
/// medium.
///
/// A material without a refractive index spectrum never radiates. The
/// table registry records a configuration error for it on first contact,
/// logs one warning, and treats the material as non-radiating from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticalMaterial {
    /// Unique identifier for the material
    pub material_id: u32,
    /// Optional name of the material
    #[serde(default)]
    pub name: Option<String>,
    /// Refractive index as a function of photon energy
    #[serde(default, rename = "refractive_index")]
    pub spectrum: Option<RefractiveIndexSpectrum>,
}

impl OpticalMaterial {
    pub fn new(material_id: u32) -> Self {
        OpticalMaterial {
            material_id,
            name: None,
            spectrum: None,
        }
    }

    /// Create a named material with a refractive index spectrum
    pub fn with_spectrum(
        material_id: u32,
        name: impl Into<String>,
        spectrum: RefractiveIndexSpectrum,
    ) -> Self {
        OpticalMaterial {
            material_id,
            name: Some(name.into()),
            spectrum: Some(spectrum),
        }
    }

    /// Set the name of the material
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Get the name of the material
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for diagnostics: the given name, or `material <id>`.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("material {}", self.material_id),
        }
    }

    /// Attach a refractive index table given as parallel energy / index arrays.
    pub fn set_refractive_index(&mut self, energies: Vec<f64>, indices: Vec<f64>) {
        self.spectrum = Some(RefractiveIndexSpectrum::new(energies, indices));
    }

    /// Read a material from a JSON object such as
    /// `{"material_id": 1, "name": "Water", "refractive_index": {"energies": [...], "indices": [...]}}`.
    pub fn from_json_str(json: &str) -> CherenkovResult<Self> {
        serde_json::from_str(json).map_err(|e| CherenkovError::configuration("<json>", e.to_string()))
    }
}
