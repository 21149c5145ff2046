// Human-readable dumps of the cached physics tables
use crate::constants::{energy_to_wavelength_nm, FRANK_TAMM_FACTOR};
use crate::physics_table::{NodeSampling, PhysicsTable};
use crate::table_registry::TableRegistry;
use std::fmt::Write;

/// Which tables to dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticsTarget {
    Material(u32),
    All,
}

/// Describe cached tables.
///
/// Verbosity 0 gives one line per material, 1 adds the integral totals,
/// 2 adds a row per beta node and 3 also prints the energy CDFs.
pub fn dump_table_diagnostics(registry: &TableRegistry, target: DiagnosticsTarget, verbosity: u8) -> String {
    let ids = match target {
        DiagnosticsTarget::Material(id) => vec![id],
        DiagnosticsTarget::All => registry.material_ids(),
    };
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Cherenkov physics tables ({} registered, {} beta steps)",
        registry.len(),
        registry.beta_steps()
    );
    for id in ids {
        match registry.get(id) {
            Some(table) => write_table(&mut out, &table, verbosity),
            None if registry.is_non_radiating(id) => {
                let _ = writeln!(out, "material {}: non-radiating (configuration error)", id);
            }
            None => {
                let _ = writeln!(out, "material {}: no table built", id);
            }
        }
    }
    out
}

fn write_table(out: &mut String, table: &PhysicsTable, verbosity: u8) {
    if !table.radiating() {
        let _ = writeln!(
            out,
            "{} (id {}): index never exceeds 1, no emission",
            table.material_name, table.material_id
        );
        return;
    }
    let _ = writeln!(
        out,
        "{} (id {}): beta [{:.6}, {:.6}], {} nodes, {}",
        table.material_name,
        table.material_id,
        table.beta_min,
        table.beta_max,
        table.nodes.len(),
        if table.exotic { "exotic" } else { "standard" }
    );
    if verbosity == 0 {
        return;
    }

    let spectrum = table.spectrum();
    let _ = writeln!(
        out,
        "  spectrum: {} samples, E [{:.4}, {:.4}] eV ({:.1}-{:.1} nm), n [{:.5}, {:.5}]",
        spectrum.len(),
        spectrum.e_min(),
        spectrum.e_max(),
        energy_to_wavelength_nm(spectrum.e_max()),
        energy_to_wavelength_nm(spectrum.e_min()),
        spectrum.n_min(),
        spectrum.n_max()
    );
    if let Some(big) = &table.big_beta {
        let (left, right) = big.totals();
        let _ = writeln!(
            out,
            "  big beta: {} segments, left {:.6} eV, right {:.6} eV, yield at beta=1 {:.4} /mm",
            big.segments().len(),
            left,
            right,
            FRANK_TAMM_FACTOR * (left - right).max(0.0)
        );
    }
    let cdf_nodes = table.nodes.iter().filter(|n| n.cdf().is_some()).count();
    if cdf_nodes > 0 {
        let _ = writeln!(out, "  {} nodes sample from an energy CDF", cdf_nodes);
    }
    if verbosity < 2 {
        return;
    }

    let _ = writeln!(
        out,
        "  {:>4} {:>10} {:>12} {:>12} {:>8} {:>12} {:>8}",
        "node", "beta", "left", "right", "windows", "dN/dx [/mm]", "sampling"
    );
    for (i, node) in table.nodes.iter().enumerate() {
        let sampling = match &node.sampling {
            NodeSampling::ClosedForm => "closed",
            NodeSampling::Cdf(_) => "cdf",
        };
        let _ = writeln!(
            out,
            "  {:>4} {:>10.6} {:>12.6} {:>12.6} {:>8} {:>12.4} {:>8}",
            i,
            node.beta,
            node.left_integral,
            node.right_integral,
            node.windows,
            FRANK_TAMM_FACTOR * node.yield_integral(),
            sampling
        );
        if verbosity >= 3 {
            if let Some(cdf) = node.cdf() {
                for (e, c) in cdf.energies().iter().zip(cdf.cumulative()) {
                    let _ = writeln!(out, "         E {:>10.5} eV  F {:>8.6}", e, c);
                }
            }
        }
    }
}
