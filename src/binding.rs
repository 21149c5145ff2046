// Per-material and per-volume selection of the sampling model
use crate::error::{CherenkovError, CherenkovResult};
use crate::solid::RadiatorSolid;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Sampling model requested for a material or volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Nothing chosen; resolves to the standard model
    #[default]
    Default,
    Standard,
    ThinTarget,
}

/// How one material (or one logical volume) is sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialModelBinding {
    pub model: ModelKind,
    /// Half-thickness (mm) of a thin slab radiator
    pub half_thickness: Option<f64>,
    /// Slab normal in the volume's local frame
    pub slab_normal: [f64; 3],
    /// Set once table construction finds disjoint emission windows
    pub exotic: bool,
    /// Explicit radiator shape; overrides the slab description
    pub solid: Option<RadiatorSolid>,
}

impl Default for MaterialModelBinding {
    fn default() -> Self {
        MaterialModelBinding {
            model: ModelKind::Default,
            half_thickness: None,
            slab_normal: [0.0, 0.0, 1.0],
            exotic: false,
            solid: None,
        }
    }
}

impl MaterialModelBinding {
    pub fn standard() -> Self {
        MaterialModelBinding {
            model: ModelKind::Standard,
            ..Default::default()
        }
    }

    /// Thin slab of the given half-thickness, normal along local z.
    pub fn thin_slab(half_thickness: f64) -> Self {
        MaterialModelBinding {
            model: ModelKind::ThinTarget,
            half_thickness: Some(half_thickness),
            ..Default::default()
        }
    }

    /// Thin-target radiator with an explicit solid.
    pub fn thin_solid(solid: RadiatorSolid) -> Self {
        MaterialModelBinding {
            model: ModelKind::ThinTarget,
            solid: Some(solid),
            ..Default::default()
        }
    }

    pub fn with_slab_normal(mut self, normal: [f64; 3]) -> Self {
        self.slab_normal = normal;
        self
    }

    pub fn is_thin_target(&self) -> bool {
        self.model == ModelKind::ThinTarget
    }

    /// Resolve the finite radiator a thin-target binding describes.
    ///
    /// # Returns
    /// * The solid and the rotation taking volume-local coordinates into the
    ///   solid's own frame
    /// * `Configuration` error when the binding has no usable finite solid
    pub fn radiator(&self, material: &str) -> CherenkovResult<(RadiatorSolid, UnitQuaternion<f64>)> {
        if let Some(solid) = &self.solid {
            if !solid.is_finite() {
                return Err(CherenkovError::configuration(
                    material,
                    format!("thin-target binding refers to unbounded solid {}", solid.name()),
                ));
            }
            solid.validate()?;
            return Ok((solid.clone(), UnitQuaternion::identity()));
        }

        let half_thickness = match self.half_thickness {
            Some(h) if h > 0.0 && h.is_finite() => h,
            Some(h) => {
                return Err(CherenkovError::configuration(
                    material,
                    format!("thin-target half-thickness must be positive and finite, got {}", h),
                ))
            }
            None => {
                return Err(CherenkovError::configuration(
                    material,
                    "thin-target binding without a finite solid or half-thickness",
                ))
            }
        };

        let normal = Vector3::new(self.slab_normal[0], self.slab_normal[1], self.slab_normal[2]);
        if !(normal.norm() > 0.0) {
            return Err(CherenkovError::configuration(material, "slab normal has zero length"));
        }
        // the slab is symmetric, so an antiparallel normal needs no rotation
        let rotation = UnitQuaternion::rotation_between(&normal, &Vector3::z()).unwrap_or_else(UnitQuaternion::identity);
        Ok((RadiatorSolid::slab(half_thickness), rotation))
    }
}

/// Serialised form of a [`BindingRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingTable {
    pub materials: HashMap<u32, MaterialModelBinding>,
    pub volumes: HashMap<String, MaterialModelBinding>,
}

/// Bindings supplied by the geometry/optics configuration.
///
/// Volume bindings win over material bindings. A material seen without any
/// binding gets a default (standard) one on first lookup.
#[derive(Debug, Default)]
pub struct BindingRegistry {
    materials: RwLock<HashMap<u32, MaterialModelBinding>>,
    volumes: RwLock<HashMap<String, MaterialModelBinding>>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_table(table: BindingTable) -> Self {
        BindingRegistry {
            materials: RwLock::new(table.materials),
            volumes: RwLock::new(table.volumes),
        }
    }

    /// Parse `{"materials": {"<id>": {...}}, "volumes": {"<name>": {...}}}`.
    pub fn from_json_str(json: &str) -> CherenkovResult<Self> {
        let table: BindingTable = serde_json::from_str(json)
            .map_err(|e| CherenkovError::configuration("bindings", format!("invalid JSON: {}", e)))?;
        Ok(Self::from_table(table))
    }

    pub fn bind_material(&self, material_id: u32, binding: MaterialModelBinding) {
        let mut materials = self.materials.write().unwrap_or_else(|p| p.into_inner());
        // keep an exotic flag discovered earlier
        let exotic = materials.get(&material_id).map_or(false, |b| b.exotic);
        materials.insert(
            material_id,
            MaterialModelBinding {
                exotic: binding.exotic || exotic,
                ..binding
            },
        );
    }

    pub fn bind_volume(&self, volume: impl Into<String>, binding: MaterialModelBinding) {
        self.volumes
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .insert(volume.into(), binding);
    }

    pub fn unbind_material(&self, material_id: u32) -> Option<MaterialModelBinding> {
        self.materials
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&material_id)
    }

    pub fn unbind_volume(&self, volume: &str) -> Option<MaterialModelBinding> {
        self.volumes
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .remove(volume)
    }

    /// Binding that applies to `material_id` inside `volume`.
    ///
    /// # Returns
    /// * The volume binding if one exists (carrying the material's exotic flag)
    /// * Otherwise the material binding, created as a default one if absent
    pub fn lookup(&self, material_id: u32, volume: Option<&str>) -> MaterialModelBinding {
        self.resolve(material_id, volume).0
    }

    /// Like [`lookup`](Self::lookup), also naming the volume whose binding
    /// won, or `None` when the material's own binding applies.
    pub fn resolve(&self, material_id: u32, volume: Option<&str>) -> (MaterialModelBinding, Option<String>) {
        let material_binding = self.material_binding(material_id);
        self.with_volume_override(material_binding, volume)
    }

    /// Like [`resolve`](Self::resolve) but never records a default binding.
    pub fn peek(&self, material_id: u32, volume: Option<&str>) -> (MaterialModelBinding, Option<String>) {
        let material_binding = self
            .materials
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&material_id)
            .cloned()
            .unwrap_or_default();
        self.with_volume_override(material_binding, volume)
    }

    fn with_volume_override(
        &self,
        material_binding: MaterialModelBinding,
        volume: Option<&str>,
    ) -> (MaterialModelBinding, Option<String>) {
        if let Some(name) = volume {
            let volumes = self.volumes.read().unwrap_or_else(|p| p.into_inner());
            if let Some(binding) = volumes.get(name) {
                let mut binding = binding.clone();
                binding.exotic |= material_binding.exotic;
                return (binding, Some(name.to_string()));
            }
        }
        (material_binding, None)
    }

    fn material_binding(&self, material_id: u32) -> MaterialModelBinding {
        if let Some(binding) = self
            .materials
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&material_id)
        {
            return binding.clone();
        }
        let mut materials = self.materials.write().unwrap_or_else(|p| p.into_inner());
        materials.entry(material_id).or_default().clone()
    }

    /// Record that a material's spectrum is exotic.
    pub fn mark_exotic(&self, material_id: u32) {
        let mut materials = self.materials.write().unwrap_or_else(|p| p.into_inner());
        materials.entry(material_id).or_default().exotic = true;
    }

    pub fn is_exotic(&self, material_id: u32) -> bool {
        self.materials
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&material_id)
            .map_or(false, |b| b.exotic)
    }

    /// Snapshot of every binding, e.g. for writing back to JSON.
    pub fn to_table(&self) -> BindingTable {
        BindingTable {
            materials: self.materials.read().unwrap_or_else(|p| p.into_inner()).clone(),
            volumes: self.volumes.read().unwrap_or_else(|p| p.into_inner()).clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_creates_default_binding() {
        let registry = BindingRegistry::new();
        let binding = registry.lookup(7, None);
        assert_eq!(binding.model, ModelKind::Default);
        assert!(registry.to_table().materials.contains_key(&7));
    }

    #[test]
    fn test_volume_binding_wins() {
        let registry = BindingRegistry::new();
        registry.bind_material(1, MaterialModelBinding::standard());
        registry.bind_volume("Foil", MaterialModelBinding::thin_slab(0.05));
        assert_eq!(registry.lookup(1, Some("Foil")).model, ModelKind::ThinTarget);
        assert_eq!(registry.lookup(1, Some("World")).model, ModelKind::Standard);
        assert_eq!(registry.lookup(1, None).model, ModelKind::Standard);
    }

    #[test]
    fn test_resolve_names_the_winning_volume() {
        let registry = BindingRegistry::new();
        registry.bind_volume("Foil", MaterialModelBinding::thin_slab(0.05));
        assert_eq!(registry.resolve(1, Some("Foil")).1.as_deref(), Some("Foil"));
        assert_eq!(registry.resolve(1, Some("World")).1, None);
        assert_eq!(registry.resolve(1, None).1, None);
    }

    #[test]
    fn test_peek_does_not_create_bindings() {
        let registry = BindingRegistry::new();
        let (binding, source) = registry.peek(7, Some("World"));
        assert_eq!(binding.model, ModelKind::Default);
        assert!(source.is_none());
        assert!(registry.to_table().materials.is_empty());
    }

    #[test]
    fn test_exotic_flag_survives_rebinding_and_reaches_volume() {
        let registry = BindingRegistry::new();
        registry.mark_exotic(3);
        registry.bind_material(3, MaterialModelBinding::standard());
        assert!(registry.is_exotic(3));
        registry.bind_volume("Foil", MaterialModelBinding::thin_slab(0.05));
        assert!(registry.lookup(3, Some("Foil")).exotic);
    }

    #[test]
    fn test_slab_radiator_and_rotation() {
        let binding = MaterialModelBinding::thin_slab(0.05).with_slab_normal([1.0, 0.0, 0.0]);
        let (solid, rotation) = binding.radiator("Foil").unwrap();
        assert_eq!(solid, RadiatorSolid::slab(0.05));
        let mapped = rotation * Vector3::x();
        assert!((mapped - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_antiparallel_normal_is_accepted() {
        let binding = MaterialModelBinding::thin_slab(0.05).with_slab_normal([0.0, 0.0, -1.0]);
        assert!(binding.radiator("Foil").is_ok());
    }

    #[test]
    fn test_inconsistent_thin_target_bindings() {
        let no_extent = MaterialModelBinding {
            model: ModelKind::ThinTarget,
            ..Default::default()
        };
        assert!(no_extent.radiator("Foil").is_err());
        assert!(MaterialModelBinding::thin_slab(-1.0).radiator("Foil").is_err());
        assert!(MaterialModelBinding::thin_solid(RadiatorSolid::Unbounded)
            .radiator("Foil")
            .is_err());
    }

    #[test]
    fn test_bindings_from_json() {
        let registry = BindingRegistry::from_json_str(
            r#"{
                "materials": {"2": {"model": "thin_target", "half_thickness": 0.05}},
                "volumes": {"Aerogel": {"model": "standard"}}
            }"#,
        )
        .unwrap();
        assert!(registry.lookup(2, None).is_thin_target());
        assert_eq!(registry.lookup(2, Some("Aerogel")).model, ModelKind::Standard);
        assert!(BindingRegistry::from_json_str("{not json").is_err());
    }
}
