// Per-material Frank–Tamm tables indexed by particle velocity
use crate::cdf::{BigBetaCdf, EnergyCdf, CDF_SUBDIVISIONS};
use crate::config::{validate_beta_steps, Config};
use crate::error::{CherenkovError, CherenkovResult};
use crate::material::OpticalMaterial;
use crate::spectrum::RefractiveIndexSpectrum;
use crate::utilities::lerp;

/// How photon energies are drawn at one beta node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeSampling {
    /// Uniform draw over the qualifying window with rejection on the
    /// Frank–Tamm integrand.
    ClosedForm,
    /// Inverse-CDF draw; present where the qualifying energies are disjoint.
    Cdf(EnergyCdf),
}

/// One beta sample of a material's physics table.
#[derive(Debug, Clone, PartialEq)]
pub struct BetaNode {
    pub beta: f64,
    /// ∫dE over the energies with β·n(E) > 1
    pub left_integral: f64,
    /// ∫dE/n(E)² over the same energies
    pub right_integral: f64,
    /// Number of disjoint qualifying windows at this beta
    pub windows: usize,
    pub sampling: NodeSampling,
}

impl BetaNode {
    pub fn cdf(&self) -> Option<&EnergyCdf> {
        match &self.sampling {
            NodeSampling::Cdf(cdf) => Some(cdf),
            NodeSampling::ClosedForm => None,
        }
    }

    /// The bracket (left - right/β²) at the node's own beta.
    pub fn yield_integral(&self) -> f64 {
        (self.left_integral - self.right_integral / (self.beta * self.beta)).max(0.0)
    }
}

/// Result of looking a beta up in a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegralLookup {
    /// Beta the integrals were evaluated at (after clamping).
    pub beta: f64,
    pub left: f64,
    pub right: f64,
    /// (left - right/β²) at `beta`, interpolated on its own between nodes.
    pub bracket: f64,
    /// True when the requested beta lay outside the table and was clamped.
    pub clamped: bool,
}

impl IntegralLookup {
    fn exact(beta: f64, left: f64, right: f64, clamped: bool) -> Self {
        let bracket = if beta > 0.0 {
            left - right / (beta * beta)
        } else {
            0.0
        };
        IntegralLookup {
            beta,
            left,
            right,
            bracket,
            clamped,
        }
    }

    /// (left - right/β²) at the beta actually used, never negative.
    pub fn yield_integral(&self) -> f64 {
        if self.beta <= 0.0 {
            return 0.0;
        }
        self.bracket.max(0.0)
    }
}

/// Beta-indexed Frank–Tamm integrals for one material.
///
/// Nodes run from `beta_min = 1/n_max` (the emission threshold) to
/// `beta_max = 1/n_min` (above which the whole spectrum radiates and the
/// beta-independent `big_beta` data take over). A table is immutable once
/// built and is shared between threads behind an `Arc`.
///
/// Two degenerate shapes exist: a material that never radiates (n ≤ 1
/// everywhere) has no nodes and no big-beta data, and a constant-index
/// material has no nodes because nothing varies between threshold and
/// saturation.
#[derive(Debug, Clone)]
pub struct PhysicsTable {
    pub material_id: u32,
    pub material_name: String,
    /// Number of beta intervals the table was built with.
    pub beta_steps: usize,
    pub beta_min: f64,
    pub beta_max: f64,
    pub nodes: Vec<BetaNode>,
    /// Segment integrals used above `beta_max`.
    pub big_beta: Option<BigBetaCdf>,
    /// True if some beta sees disjoint qualifying windows.
    pub exotic: bool,
    spectrum: RefractiveIndexSpectrum,
}

impl PhysicsTable {
    pub fn spectrum(&self) -> &RefractiveIndexSpectrum {
        &self.spectrum
    }

    /// False for materials whose index never exceeds one.
    pub fn radiating(&self) -> bool {
        !self.nodes.is_empty() || self.big_beta.is_some()
    }

    /// Interpolated (∫dE, ∫dE/n²) at `beta`.
    ///
    /// Inside [beta_min, beta_max] the lookup works in u = 1/β. With n(E)
    /// linear between samples, `left` is linear in u and `right` is linear
    /// in β across any interval where the threshold stays in one segment,
    /// so both are interpolated in those variables. The bracket
    /// Y(u) = left - u²·right is piecewise quadratic in u with
    /// dY/du = -2u·right, and is interpolated by a cubic Hermite through
    /// the node values and slopes. That is exact while the threshold stays
    /// inside one spectrum segment and only loses accuracy in the intervals
    /// where it crosses a sample energy.
    ///
    /// Above `beta_max` the big-beta totals apply exactly. Anything else is
    /// clamped to the nearest covered beta and flagged.
    pub fn integrals_at(&self, beta: f64) -> IntegralLookup {
        if !self.radiating() {
            return IntegralLookup::exact(beta, 0.0, 0.0, false);
        }

        let mut clamped = false;
        let mut beta_used = beta;
        if !(beta_used < 1.0) {
            beta_used = 1.0;
            clamped = true;
        }

        if beta_used >= self.beta_max {
            if let Some(big) = &self.big_beta {
                let (left, right) = big.totals();
                return IntegralLookup::exact(beta_used, left, right, clamped);
            }
            if beta_used > self.beta_max {
                beta_used = self.beta_max;
                clamped = true;
            }
        }
        if beta_used < self.beta_min {
            beta_used = self.beta_min;
            clamped = true;
        }

        if self.nodes.is_empty() {
            // constant index below saturation: nothing radiates
            return IntegralLookup::exact(beta_used, 0.0, 0.0, clamped);
        }

        let (i, t) = self.bracket(beta_used);
        let (a, b) = (&self.nodes[i], &self.nodes[i + 1]);
        if t == 0.0 || t == 1.0 {
            let node = if t == 0.0 { a } else { b };
            return IntegralLookup::exact(
                beta_used,
                node.left_integral,
                node.right_integral,
                clamped,
            );
        }

        let (ua, ub, u) = (1.0 / a.beta, 1.0 / b.beta, 1.0 / beta_used);
        let h = ub - ua;
        let s = (u - ua) / h;
        let bracket = hermite(
            s,
            a.left_integral - ua * ua * a.right_integral,
            -2.0 * ua * a.right_integral * h,
            b.left_integral - ub * ub * b.right_integral,
            -2.0 * ub * b.right_integral * h,
        );
        IntegralLookup {
            beta: beta_used,
            left: a.left_integral + s * (b.left_integral - a.left_integral),
            right: a.right_integral + t * (b.right_integral - a.right_integral),
            bracket,
            clamped,
        }
    }

    /// Node closest in beta, if the table has nodes.
    pub fn nearest_node(&self, beta: f64) -> Option<&BetaNode> {
        if self.nodes.len() < 2 {
            return self.nodes.first();
        }
        let (i, t) = self.bracket(beta.clamp(self.beta_min, self.beta_max));
        if t < 0.5 {
            self.nodes.get(i)
        } else {
            self.nodes.get(i + 1)
        }
    }

    /// Left node index and fractional position of `beta` between it and the next.
    fn bracket(&self, beta: f64) -> (usize, f64) {
        let last = self.nodes.len() - 1;
        let step = (self.beta_max - self.beta_min) / last as f64;
        let x = ((beta - self.beta_min) / step).max(0.0);
        let i = (x.floor() as usize).min(last - 1);
        let t = lerp(
            self.nodes[i].beta,
            self.nodes[i + 1].beta,
            0.0,
            1.0,
            beta,
        )
        .clamp(0.0, 1.0);
        (i, t)
    }
}

/// Cubic Hermite on [0, 1] through (0, y0) and (1, y1) with end slopes
/// `d0`, `d1` already scaled to the unit interval.
fn hermite(s: f64, y0: f64, d0: f64, y1: f64, d1: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    (2.0 * s3 - 3.0 * s2 + 1.0) * y0
        + (s3 - 2.0 * s2 + s) * d0
        + (-2.0 * s3 + 3.0 * s2) * y1
        + (s3 - s2) * d1
}

/// Builds [`PhysicsTable`]s for materials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsTableBuilder {
    beta_steps: usize,
    cdf_subdivisions: usize,
}

impl PhysicsTableBuilder {
    /// Builder with `beta_steps` intervals (N+1 nodes), N in [2, 255].
    pub fn new(beta_steps: usize) -> CherenkovResult<Self> {
        validate_beta_steps(beta_steps)?;
        Ok(PhysicsTableBuilder {
            beta_steps,
            cdf_subdivisions: CDF_SUBDIVISIONS,
        })
    }

    /// Builder using the global configuration.
    pub fn from_global_config() -> CherenkovResult<Self> {
        let steps = Config::global().beta_steps;
        Self::new(steps)
    }

    pub fn with_cdf_subdivisions(mut self, subdivisions: usize) -> Self {
        self.cdf_subdivisions = subdivisions.max(1);
        self
    }

    pub fn beta_steps(&self) -> usize {
        self.beta_steps
    }

    /// Build the table for one material.
    ///
    /// Fails with a configuration error when the material has no usable
    /// spectrum; the caller treats the material as non-radiating.
    pub fn build(&self, material: &OpticalMaterial) -> CherenkovResult<PhysicsTable> {
        let label = material.label();
        let spectrum = match &material.spectrum {
            Some(s) => s.clone(),
            None => {
                return Err(CherenkovError::configuration(
                    &label,
                    "refractive index spectrum has no entries",
                ))
            }
        };
        spectrum.validate(&label)?;

        let n_max = spectrum.n_max();
        let n_min = spectrum.n_min();
        let mut table = PhysicsTable {
            material_id: material.material_id,
            material_name: label.clone(),
            beta_steps: self.beta_steps,
            beta_min: 1.0,
            beta_max: 1.0,
            nodes: Vec::new(),
            big_beta: None,
            exotic: false,
            spectrum,
        };

        if n_max <= 1.0 {
            log::debug!("{}: refractive index never exceeds 1, no Cherenkov emission", label);
            return Ok(table);
        }

        table.beta_min = 1.0 / n_max;
        table.beta_max = if n_min > 1.0 { 1.0 / n_min } else { 1.0 };
        if table.beta_max < 1.0 {
            table.big_beta = Some(BigBetaCdf::from_spectrum(&table.spectrum));
        }

        if table.beta_max - table.beta_min <= 1e-12 * table.beta_max {
            log::debug!(
                "{}: constant refractive index, threshold beta {:.6}",
                label,
                table.beta_min
            );
            return Ok(table);
        }

        let step = (table.beta_max - table.beta_min) / self.beta_steps as f64;
        let mut any_disjoint = false;
        table.nodes = (0..=self.beta_steps)
            .map(|k| {
                let beta = if k == self.beta_steps {
                    table.beta_max
                } else {
                    table.beta_min + k as f64 * step
                };
                let (left_integral, right_integral) = table.spectrum.frank_tamm_integrals(beta);
                let windows = table.spectrum.qualifying_ranges(beta).len();
                let sampling = if windows > 1 {
                    any_disjoint = true;
                    EnergyCdf::build(&table.spectrum, beta, self.cdf_subdivisions)
                        .map(NodeSampling::Cdf)
                        .unwrap_or(NodeSampling::ClosedForm)
                } else {
                    NodeSampling::ClosedForm
                };
                BetaNode {
                    beta,
                    left_integral,
                    right_integral,
                    windows,
                    sampling,
                }
            })
            .collect();
        table.exotic = any_disjoint || table.spectrum.has_interior_dip();

        log::debug!(
            "{}: built {} beta nodes in [{:.6}, {:.6}]{}",
            label,
            table.nodes.len(),
            table.beta_min,
            table.beta_max,
            if table.exotic { " (exotic spectrum)" } else { "" }
        );
        Ok(table)
    }
}
