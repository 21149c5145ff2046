// Inverse-CDF tables for photon energies
use crate::error::internal_inconsistency;
use crate::spectrum::RefractiveIndexSpectrum;
use crate::utilities::{integrate_inverse_square_linear, lerp};
use rand::Rng;

/// Refinement of each spectrum segment when tabulating the energy CDF.
pub const CDF_SUBDIVISIONS: usize = 32;

/// Frank–Tamm integrand 1 - 1/(β²n²), clamped at zero below threshold.
#[inline]
pub fn frank_tamm_integrand(beta: f64, n: f64) -> f64 {
    (1.0 - 1.0 / (beta * beta * n * n)).max(0.0)
}

/// Normalised cumulative distribution of photon energy at one beta.
///
/// `cumulative[0] == 0`, `cumulative[last] == 1` and the sequence never
/// decreases. Gaps between disjoint qualifying windows appear as flat steps
/// (two consecutive points with equal probability), so no energy inside a
/// gap is ever returned.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyCdf {
    cumulative: Vec<f64>,
    energies: Vec<f64>,
}

impl EnergyCdf {
    /// Tabulate the CDF over every qualifying window of `spectrum` at `beta`.
    ///
    /// Returns `None` when nothing radiates at this beta.
    pub fn build(spectrum: &RefractiveIndexSpectrum, beta: f64, subdivisions: usize) -> Option<Self> {
        let subdivisions = subdivisions.max(1);
        let mut energies: Vec<f64> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        let mut cumulative: Vec<f64> = Vec::new();
        let mut running = 0.0;

        for (lo, hi) in spectrum.qualifying_ranges(beta) {
            let mut breaks = vec![lo];
            breaks.extend(spectrum.energies.iter().copied().filter(|&e| e > lo && e < hi));
            breaks.push(hi);

            // the window opens with zero added probability
            energies.push(lo);
            weights.push(frank_tamm_integrand(beta, spectrum.index_at(lo)));
            cumulative.push(running);

            for pair in breaks.windows(2) {
                for k in 1..=subdivisions {
                    let e = pair[0] + (pair[1] - pair[0]) * k as f64 / subdivisions as f64;
                    let w = frank_tamm_integrand(beta, spectrum.index_at(e));
                    let prev_e = energies[energies.len() - 1];
                    let prev_w = weights[weights.len() - 1];
                    running += 0.5 * (w + prev_w) * (e - prev_e);
                    energies.push(e);
                    weights.push(w);
                    cumulative.push(running);
                }
            }
        }

        if energies.len() < 2 || running <= 0.0 {
            return None;
        }
        for c in cumulative.iter_mut() {
            *c /= running;
        }
        let last = cumulative.len() - 1;
        cumulative[0] = 0.0;
        cumulative[last] = 1.0;
        Some(EnergyCdf {
            cumulative,
            energies,
        })
    }

    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Lowest and highest energy the table can return.
    pub fn energy_span(&self) -> (f64, f64) {
        (self.energies[0], self.energies[self.energies.len() - 1])
    }

    /// Invert the CDF at probability `u` in [0, 1].
    ///
    /// `material` only labels the panic raised if the lookup walks off the
    /// table.
    pub fn invert(&self, u: f64, material: &str) -> f64 {
        let u = u.clamp(0.0, 1.0);
        // first point with cumulative strictly above u
        let j = self.cumulative.partition_point(|&c| c <= u);
        if j == 0 {
            internal_inconsistency(
                material,
                "cdf inversion",
                &format!("probability {} below first cumulative value {}", u, self.cumulative[0]),
            );
        }
        if j >= self.cumulative.len() {
            // only u == 1 can land here
            return self.energies[self.energies.len() - 1];
        }
        let i = j - 1;
        lerp(
            self.cumulative[i],
            self.cumulative[i + 1],
            self.energies[i],
            self.energies[i + 1],
            u,
        )
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, material: &str) -> f64 {
        self.invert(rng.gen::<f64>(), material)
    }

    /// Forward lookup: probability of emitting below `energy`.
    pub fn probability_below(&self, energy: f64) -> f64 {
        if energy <= self.energies[0] {
            return 0.0;
        }
        if energy >= self.energies[self.energies.len() - 1] {
            return 1.0;
        }
        let j = self.energies.partition_point(|&e| e <= energy);
        let i = j - 1;
        lerp(
            self.energies[i],
            self.energies[i + 1],
            self.cumulative[i],
            self.cumulative[i + 1],
            energy,
        )
    }
}

/// Frank–Tamm integrals of one spectrum segment over its full width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentIntegral {
    pub e_lo: f64,
    pub e_hi: f64,
    pub n_lo: f64,
    pub n_hi: f64,
    /// ∫dE over the segment
    pub left: f64,
    /// ∫dE/n² over the segment
    pub right: f64,
}

/// Beta-independent description of the spectrum above `beta_max`.
///
/// Above `beta_max` every energy radiates, so the per-segment integrals no
/// longer change with beta. Only the segment weights `left - right/β²` do,
/// and [`BigBetaCdf::triples`] evaluates them for a given beta.
#[derive(Debug, Clone, PartialEq)]
pub struct BigBetaCdf {
    segments: Vec<SegmentIntegral>,
}

impl BigBetaCdf {
    pub fn from_spectrum(spectrum: &RefractiveIndexSpectrum) -> Self {
        let segments = spectrum
            .energies
            .windows(2)
            .zip(spectrum.indices.windows(2))
            .map(|(e, n)| SegmentIntegral {
                e_lo: e[0],
                e_hi: e[1],
                n_lo: n[0],
                n_hi: n[1],
                left: e[1] - e[0],
                right: integrate_inverse_square_linear(e[0], e[1], n[0], n[1]),
            })
            .collect();
        BigBetaCdf { segments }
    }

    pub fn segments(&self) -> &[SegmentIntegral] {
        &self.segments
    }

    /// Total (∫dE, ∫dE/n²) over the whole spectrum.
    pub fn totals(&self) -> (f64, f64) {
        self.segments
            .iter()
            .fold((0.0, 0.0), |(l, r), s| (l + s.left, r + s.right))
    }

    /// (left, right, cumulative weight) per segment at `beta`; the last
    /// weight is 1 whenever anything radiates.
    pub fn triples(&self, beta: f64) -> Vec<(f64, f64, f64)> {
        let inv_b2 = 1.0 / (beta * beta);
        let mut running = 0.0;
        let mut out: Vec<(f64, f64, f64)> = self
            .segments
            .iter()
            .map(|s| {
                running += (s.left - s.right * inv_b2).max(0.0);
                (s.left, s.right, running)
            })
            .collect();
        if running > 0.0 {
            for t in out.iter_mut() {
                t.2 /= running;
            }
        }
        out
    }

    /// Draw a photon energy at `beta`: pick a segment by weight, then reject
    /// inside it against the integrand's segment maximum.
    pub fn sample<R: Rng + ?Sized>(&self, beta: f64, rng: &mut R, material: &str) -> Option<f64> {
        let triples = self.triples(beta);
        let total = triples.last().map(|t| t.2)?;
        if total <= 0.0 {
            return None;
        }
        let u: f64 = rng.gen();
        let idx = triples.partition_point(|t| t.2 <= u).min(triples.len() - 1);
        let segment = match self.segments.get(idx) {
            Some(s) => s,
            None => internal_inconsistency(material, "big-beta sampling", "segment index past end"),
        };
        let g_max = frank_tamm_integrand(beta, segment.n_lo.max(segment.n_hi));
        if g_max <= 0.0 {
            return None;
        }
        loop {
            let e = segment.e_lo + (segment.e_hi - segment.e_lo) * rng.gen::<f64>();
            let n = lerp(segment.e_lo, segment.e_hi, segment.n_lo, segment.n_hi, e);
            if rng.gen::<f64>() * g_max <= frank_tamm_integrand(beta, n) {
                return Some(e);
            }
        }
    }
}
