// Process-wide cache of physics tables, keyed by material id
use crate::config::{validate_beta_steps, Config};
use crate::error::CherenkovResult;
use crate::material::OpticalMaterial;
use crate::physics_table::{PhysicsTable, PhysicsTableBuilder};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

// Global registry shared by every worker thread
static GLOBAL_TABLES: Lazy<Arc<TableRegistry>> = Lazy::new(|| Arc::new(TableRegistry::from_global_config()));

type BuildOutcome = CherenkovResult<Arc<PhysicsTable>>;

/// One material's entry: the material it was registered with and a
/// write-once cell holding the build outcome.
struct TableSlot {
    material: OpticalMaterial,
    outcome: OnceCell<BuildOutcome>,
}

impl TableSlot {
    fn new(material: OpticalMaterial) -> Arc<Self> {
        Arc::new(TableSlot {
            material,
            outcome: OnceCell::new(),
        })
    }
}

struct RegistryState {
    beta_steps: usize,
    slots: HashMap<u32, Arc<TableSlot>>,
}

/// Read-mostly cache of [`PhysicsTable`]s.
///
/// The map itself sits behind an `RwLock` that is only taken for writing
/// to insert a new slot or to rebuild everything. Each slot carries its own
/// `OnceCell`, so the first thread to reach a material builds its table
/// while other threads asking for the same material wait on that cell
/// alone. Once published a table is never mutated.
///
/// Build failures are cached as well: a material with a bad spectrum is
/// reported once and then treated as non-radiating.
pub struct TableRegistry {
    state: RwLock<RegistryState>,
}

impl TableRegistry {
    /// Empty registry building tables with `beta_steps` intervals.
    pub fn new(beta_steps: usize) -> CherenkovResult<Self> {
        validate_beta_steps(beta_steps)?;
        Ok(TableRegistry {
            state: RwLock::new(RegistryState {
                beta_steps,
                slots: HashMap::new(),
            }),
        })
    }

    /// Empty registry using the global configuration's beta step count.
    pub fn from_global_config() -> Self {
        let beta_steps = Config::global().beta_steps;
        TableRegistry {
            state: RwLock::new(RegistryState {
                beta_steps,
                slots: HashMap::new(),
            }),
        }
    }

    pub fn beta_steps(&self) -> usize {
        self.read_state().beta_steps
    }

    /// Return the table for `material`, building it on first request.
    ///
    /// Idempotent: repeated calls without a beta-step change return the
    /// same `Arc`. A configuration error is returned (and logged once) for
    /// materials without a usable spectrum.
    pub fn build_or_get(&self, material: &OpticalMaterial) -> CherenkovResult<Arc<PhysicsTable>> {
        let (slot, beta_steps) = self.slot_for(material);
        slot.outcome
            .get_or_init(|| build_table(&slot.material, beta_steps))
            .clone()
    }

    /// Table for a material id if it has been built successfully.
    pub fn get(&self, material_id: u32) -> Option<Arc<PhysicsTable>> {
        let state = self.read_state();
        state
            .slots
            .get(&material_id)
            .and_then(|slot| slot.outcome.get())
            .and_then(|outcome| outcome.as_ref().ok().cloned())
    }

    /// Whether a material's table build failed.
    pub fn is_non_radiating(&self, material_id: u32) -> bool {
        let state = self.read_state();
        matches!(
            state.slots.get(&material_id).and_then(|slot| slot.outcome.get()),
            Some(Err(_))
        )
    }

    /// Every successfully built table, ordered by material id.
    pub fn tables(&self) -> Vec<Arc<PhysicsTable>> {
        let state = self.read_state();
        let mut tables: Vec<Arc<PhysicsTable>> = state
            .slots
            .values()
            .filter_map(|slot| slot.outcome.get())
            .filter_map(|outcome| outcome.as_ref().ok().cloned())
            .collect();
        tables.sort_by_key(|t| t.material_id);
        tables
    }

    /// Registered material ids, sorted.
    pub fn material_ids(&self) -> Vec<u32> {
        let state = self.read_state();
        let mut ids: Vec<u32> = state.slots.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.read_state().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Change the number of beta steps and rebuild every registered table.
    ///
    /// Holds the registry write lock for the whole rebuild, so no thread can
    /// fetch a table built with the old discretisation. The host must still
    /// call this from a single coordinating thread with workers quiesced.
    pub fn set_beta_steps(&self, beta_steps: usize) -> CherenkovResult<()> {
        validate_beta_steps(beta_steps)?;
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.beta_steps == beta_steps {
            return Ok(());
        }
        log::info!(
            "Rebuilding {} physics tables with {} beta steps (was {})",
            state.slots.len(),
            beta_steps,
            state.beta_steps
        );
        state.beta_steps = beta_steps;
        let rebuilt: HashMap<u32, Arc<TableSlot>> = state
            .slots
            .iter()
            .map(|(&id, old)| {
                let slot = TableSlot::new(old.material.clone());
                let _ = slot
                    .outcome
                    .get_or_init(|| build_table(&slot.material, beta_steps));
                (id, slot)
            })
            .collect();
        state.slots = rebuilt;
        Ok(())
    }

    /// Drop every cached table.
    pub fn clear(&self) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.slots.clear();
    }

    fn slot_for(&self, material: &OpticalMaterial) -> (Arc<TableSlot>, usize) {
        {
            let state = self.read_state();
            if let Some(slot) = state.slots.get(&material.material_id) {
                return (slot.clone(), state.beta_steps);
            }
        }
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let beta_steps = state.beta_steps;
        let slot = state
            .slots
            .entry(material.material_id)
            .or_insert_with(|| TableSlot::new(material.clone()))
            .clone();
        (slot, beta_steps)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for TableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("TableRegistry")
            .field("beta_steps", &state.beta_steps)
            .field("materials", &state.slots.len())
            .finish()
    }
}

fn build_table(material: &OpticalMaterial, beta_steps: usize) -> BuildOutcome {
    let outcome = PhysicsTableBuilder::new(beta_steps).and_then(|builder| builder.build(material));
    match outcome {
        Ok(table) => Ok(Arc::new(table)),
        Err(e) => {
            log::warn!("{}; {} will not emit Cherenkov photons", e, material.label());
            Err(e)
        }
    }
}

/// The process-wide registry.
pub fn global_registry() -> &'static TableRegistry {
    &GLOBAL_TABLES
}

/// Shared handle on the process-wide registry, for a dispatcher to hold.
pub fn shared_global_registry() -> Arc<TableRegistry> {
    Arc::clone(&GLOBAL_TABLES)
}

/// Build (or fetch) a material's table in the process-wide registry.
pub fn build_or_get_physics_table(material: &OpticalMaterial) -> CherenkovResult<Arc<PhysicsTable>> {
    GLOBAL_TABLES.build_or_get(material)
}

/// Change the global beta step count and rebuild the global tables.
pub fn set_global_beta_steps(beta_steps: usize) -> CherenkovResult<()> {
    Config::global().set_beta_steps(beta_steps)?;
    GLOBAL_TABLES.set_beta_steps(beta_steps)
}
