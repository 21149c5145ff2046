// Tabulated refractive index n(E) of one material
use crate::error::{CherenkovError, CherenkovResult};
use crate::utilities::{integrate_inverse_square_linear, interpolate_linear, lerp};
use serde::{Deserialize, Serialize};

/// Ordered (photon energy, refractive index) samples for one material.
///
/// Energies are in eV and must be strictly increasing. Between samples the
/// index is taken to vary linearly with energy; every quantity derived here
/// (qualifying ranges, Frank–Tamm integrals) is exact for that interpolant.
///
/// The spectrum belongs to the material description and is only read by the
/// table builder and the samplers. Validation is deferred to
/// [`RefractiveIndexSpectrum::validate`] so that a bad spectrum can be
/// reported against the material that carries it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefractiveIndexSpectrum {
    /// Photon energies in eV.
    pub energies: Vec<f64>,
    /// Refractive index at each energy.
    pub indices: Vec<f64>,
}

impl RefractiveIndexSpectrum {
    pub fn new(energies: Vec<f64>, indices: Vec<f64>) -> Self {
        RefractiveIndexSpectrum { energies, indices }
    }

    /// Build a spectrum from (wavelength in nm, index) pairs in any order.
    pub fn from_wavelengths_nm(pairs: &[(f64, f64)]) -> Self {
        let mut samples: Vec<(f64, f64)> = pairs
            .iter()
            .map(|&(lambda, n)| (crate::constants::HC_EV_NM / lambda, n))
            .collect();
        samples.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (energies, indices) = samples.into_iter().unzip();
        RefractiveIndexSpectrum { energies, indices }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Reject spectra the builder cannot integrate.
    pub fn validate(&self, material: &str) -> CherenkovResult<()> {
        if self.energies.is_empty() {
            return Err(CherenkovError::configuration(
                material,
                "refractive index spectrum has no entries",
            ));
        }
        if self.energies.len() != self.indices.len() {
            return Err(CherenkovError::configuration(
                material,
                format!(
                    "spectrum has {} energies but {} indices",
                    self.energies.len(),
                    self.indices.len()
                ),
            ));
        }
        if self.energies.len() < 2 {
            return Err(CherenkovError::configuration(
                material,
                "refractive index spectrum needs at least two samples",
            ));
        }
        for (i, (&e, &n)) in self.energies.iter().zip(&self.indices).enumerate() {
            if !(e.is_finite() && e > 0.0) {
                return Err(CherenkovError::configuration(
                    material,
                    format!("photon energy {} at sample {} is not a positive number", e, i),
                ));
            }
            if !(n.is_finite() && n > 0.0) {
                return Err(CherenkovError::configuration(
                    material,
                    format!("refractive index {} at sample {} is not a positive number", n, i),
                ));
            }
        }
        if self.energies.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CherenkovError::configuration(
                material,
                "photon energies must be strictly increasing",
            ));
        }
        Ok(())
    }

    pub fn e_min(&self) -> f64 {
        self.energies[0]
    }

    pub fn e_max(&self) -> f64 {
        self.energies[self.energies.len() - 1]
    }

    pub fn n_min(&self) -> f64 {
        self.indices.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn n_max(&self) -> f64 {
        self.indices.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Refractive index at a photon energy (clamped outside the table).
    pub fn index_at(&self, energy: f64) -> f64 {
        interpolate_linear(&self.energies, &self.indices, energy)
    }

    /// True if n(E) never changes direction.
    pub fn is_monotonic(&self) -> bool {
        let rising = self.indices.windows(2).all(|w| w[1] >= w[0]);
        let falling = self.indices.windows(2).all(|w| w[1] <= w[0]);
        rising || falling
    }

    /// True if n(E) falls and later rises again. Exactly then some beta sees
    /// two or more disjoint qualifying windows.
    pub fn has_interior_dip(&self) -> bool {
        let mut seen_fall = false;
        for w in self.indices.windows(2) {
            if w[1] < w[0] {
                seen_fall = true;
            } else if w[1] > w[0] && seen_fall {
                return true;
            }
        }
        false
    }

    /// Largest index over the samples inside [lo, hi], including the
    /// interpolated end points.
    pub fn n_max_between(&self, lo: f64, hi: f64) -> f64 {
        let mut n_max = self.index_at(lo).max(self.index_at(hi));
        for (&e, &n) in self.energies.iter().zip(&self.indices) {
            if e > lo && e < hi {
                n_max = n_max.max(n);
            }
        }
        n_max
    }

    /// Disjoint energy ranges where the Cherenkov condition β·n(E) > 1 holds.
    ///
    /// Within one segment n is linear, so the condition holds on at most one
    /// sub-interval. Touching sub-intervals of neighbouring segments are
    /// merged, so the length of the result counts the disjoint windows.
    pub fn qualifying_ranges(&self, beta: f64) -> Vec<(f64, f64)> {
        let mut ranges: Vec<(f64, f64)> = Vec::new();
        if beta <= 0.0 {
            return ranges;
        }
        let n_threshold = 1.0 / beta;
        for i in 0..self.energies.len().saturating_sub(1) {
            let Some((lo, hi)) = self.segment_window(i, n_threshold) else {
                continue;
            };
            match ranges.last_mut() {
                Some(last) if last.1 >= lo => last.1 = hi,
                _ => ranges.push((lo, hi)),
            }
        }
        ranges
    }

    /// Frank–Tamm integrals (∫dE, ∫dE/n²) over the qualifying ranges at beta.
    pub fn frank_tamm_integrals(&self, beta: f64) -> (f64, f64) {
        if beta <= 0.0 {
            return (0.0, 0.0);
        }
        let n_threshold = 1.0 / beta;
        let mut left = 0.0;
        let mut right = 0.0;
        for i in 0..self.energies.len().saturating_sub(1) {
            if let Some((lo, hi)) = self.segment_window(i, n_threshold) {
                let (n_lo, n_hi) = (self.segment_index(i, lo), self.segment_index(i, hi));
                left += hi - lo;
                right += integrate_inverse_square_linear(lo, hi, n_lo, n_hi);
            }
        }
        (left, right)
    }

    /// Part of segment i where n > n_threshold, if it has non-zero width.
    fn segment_window(&self, i: usize, n_threshold: f64) -> Option<(f64, f64)> {
        let (e1, e2) = (self.energies[i], self.energies[i + 1]);
        let (n1, n2) = (self.indices[i], self.indices[i + 1]);
        let window = match (n1 > n_threshold, n2 > n_threshold) {
            (true, true) => (e1, e2),
            (false, false) => return None,
            (true, false) => (e1, lerp(n1, n2, e1, e2, n_threshold)),
            (false, true) => (lerp(n1, n2, e1, e2, n_threshold), e2),
        };
        if window.1 > window.0 {
            Some(window)
        } else {
            None
        }
    }

    fn segment_index(&self, i: usize, energy: f64) -> f64 {
        lerp(
            self.energies[i],
            self.energies[i + 1],
            self.indices[i],
            self.indices[i + 1],
            energy,
        )
    }
}
