// Finite radiator solids and straight-segment intersection in local coordinates
use crate::error::{CherenkovError, CherenkovResult};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Distances (mm) closer than this to a face count as lying on it.
pub const GEOMETRY_TOLERANCE: f64 = 1.0e-9;

/// Radiator shape in its own local frame, centred on the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum RadiatorSolid {
    /// Axis-aligned box, half extents along x, y, z (mm).
    Box { half_extents: [f64; 3] },
    /// Tube along local z with an optional bore.
    Tube {
        inner_radius: f64,
        outer_radius: f64,
        half_length: f64,
    },
    /// A finite shape this core cannot intersect exactly.
    Other { name: String },
    /// No finite extent.
    Unbounded,
}

/// Part of a segment inside a solid, in fractions of the segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chord {
    /// First entry into the solid
    pub t_enter: f64,
    /// Last exit from the solid
    pub t_exit: f64,
    /// Total fraction of the segment inside material. Smaller than
    /// `t_exit - t_enter` when the segment crosses a bore.
    pub inside_fraction: f64,
    /// Empty stretch between entry and exit, when the segment crosses a bore.
    pub gap: Option<(f64, f64)>,
}

impl Chord {
    fn from_pieces(pieces: &[(f64, f64)]) -> Option<Self> {
        let first = pieces.first()?;
        let last = pieces.last()?;
        let gap = match pieces {
            [a, b] if b.0 > a.1 => Some((a.1, b.0)),
            _ => None,
        };
        Some(Chord {
            t_enter: first.0,
            t_exit: last.1,
            inside_fraction: pieces.iter().map(|(a, b)| b - a).sum(),
            gap,
        })
    }

    /// True if fraction `t` of the segment lies inside material.
    pub fn contains(&self, t: f64) -> bool {
        let in_envelope = t >= self.t_enter && t <= self.t_exit;
        match self.gap {
            Some((g0, g1)) => in_envelope && !(t > g0 && t < g1),
            None => in_envelope,
        }
    }
}

impl RadiatorSolid {
    pub fn slab(half_thickness: f64) -> Self {
        RadiatorSolid::Box {
            half_extents: [f64::INFINITY, f64::INFINITY, half_thickness],
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RadiatorSolid::Box { .. } => "Box",
            RadiatorSolid::Tube { .. } => "Tube",
            RadiatorSolid::Other { name } => name,
            RadiatorSolid::Unbounded => "Unbounded",
        }
    }

    /// True for shapes with a finite extent, supported or not.
    pub fn is_finite(&self) -> bool {
        match self {
            RadiatorSolid::Box { half_extents } => half_extents.iter().any(|h| h.is_finite()),
            RadiatorSolid::Tube {
                outer_radius,
                half_length,
                ..
            } => outer_radius.is_finite() || half_length.is_finite(),
            RadiatorSolid::Other { .. } => true,
            RadiatorSolid::Unbounded => false,
        }
    }

    /// Check the dimensions make sense.
    pub fn validate(&self) -> CherenkovResult<()> {
        match self {
            RadiatorSolid::Box { half_extents } => {
                if half_extents.iter().any(|h| !(*h > 0.0)) {
                    return Err(CherenkovError::configuration(
                        self.name(),
                        format!("box half extents must be positive, got {:?}", half_extents),
                    ));
                }
            }
            RadiatorSolid::Tube {
                inner_radius,
                outer_radius,
                half_length,
            } => {
                if !(*inner_radius >= 0.0) || !(outer_radius > inner_radius) || !(*half_length > 0.0) {
                    return Err(CherenkovError::configuration(
                        self.name(),
                        format!(
                            "tube needs 0 <= inner < outer radius and positive half length, got ({}, {}, {})",
                            inner_radius, outer_radius, half_length
                        ),
                    ));
                }
            }
            RadiatorSolid::Other { .. } | RadiatorSolid::Unbounded => {}
        }
        Ok(())
    }

    /// Intersect the segment `start -> end` with the solid.
    ///
    /// `Ok(None)` means the segment misses. `Err(GeometryAmbiguity)` is
    /// returned for unsupported shapes and for grazing or degenerate
    /// intersections; callers fall back to a smeared estimate.
    pub fn intersect_segment(&self, start: &Point3<f64>, end: &Point3<f64>) -> CherenkovResult<Option<Chord>> {
        let d = end - start;
        let length = d.norm();
        if length < GEOMETRY_TOLERANCE {
            return Ok(None);
        }
        // tolerance expressed as a fraction of the segment
        let tol = GEOMETRY_TOLERANCE / length;
        let p = start.coords;

        match self {
            RadiatorSolid::Box { half_extents } => {
                let Some((lo, hi)) = self.box_interval(&p, &d, half_extents, tol)? else {
                    return Ok(None);
                };
                Ok(clip_unit(lo, hi).and_then(|piece| Chord::from_pieces(&[piece])))
            }
            RadiatorSolid::Tube {
                inner_radius,
                outer_radius,
                half_length,
            } => self.tube_chord(&p, &d, *inner_radius, *outer_radius, *half_length, tol),
            RadiatorSolid::Other { name } => Err(CherenkovError::ambiguity(
                name.as_str(),
                "no exact intersection for this solid",
            )),
            RadiatorSolid::Unbounded => Ok(Some(Chord {
                t_enter: 0.0,
                t_exit: 1.0,
                inside_fraction: 1.0,
                gap: None,
            })),
        }
    }

    // Slab method over the whole line p + t d.
    fn box_interval(
        &self,
        p: &Vector3<f64>,
        d: &Vector3<f64>,
        half: &[f64; 3],
        tol: f64,
    ) -> CherenkovResult<Option<(f64, f64)>> {
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;
        for axis in 0..3 {
            let h = half[axis];
            if !h.is_finite() {
                continue;
            }
            if d[axis].abs() < 1e-12 {
                let offset = p[axis].abs() - h;
                if offset.abs() <= GEOMETRY_TOLERANCE {
                    return Err(CherenkovError::ambiguity(
                        self.name(),
                        format!("segment runs along face on axis {}", axis),
                    ));
                }
                if offset > 0.0 {
                    return Ok(None);
                }
                continue;
            }
            let t1 = (-h - p[axis]) / d[axis];
            let t2 = (h - p[axis]) / d[axis];
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }
        if t_max < t_min - tol {
            return Ok(None);
        }
        if t_max - t_min <= tol && t_max >= 0.0 && t_min <= 1.0 {
            return Err(CherenkovError::ambiguity(self.name(), "segment grazes an edge"));
        }
        Ok(Some((t_min, t_max)))
    }

    fn tube_chord(
        &self,
        p: &Vector3<f64>,
        d: &Vector3<f64>,
        inner: f64,
        outer: f64,
        half_length: f64,
        tol: f64,
    ) -> CherenkovResult<Option<Chord>> {
        let z_interval = if d.z.abs() < 1e-12 {
            let offset = p.z.abs() - half_length;
            if offset.abs() <= GEOMETRY_TOLERANCE {
                return Err(CherenkovError::ambiguity(self.name(), "segment runs along an end cap"));
            }
            if offset > 0.0 {
                return Ok(None);
            }
            (f64::NEG_INFINITY, f64::INFINITY)
        } else {
            let t1 = (-half_length - p.z) / d.z;
            let t2 = (half_length - p.z) / d.z;
            (t1.min(t2), t1.max(t2))
        };

        let Some(outer_interval) = self.cylinder_interval(p, d, outer, z_interval, tol)? else {
            return Ok(None);
        };
        let lo = outer_interval.0.max(z_interval.0);
        let hi = outer_interval.1.min(z_interval.1);
        if hi <= lo {
            return Ok(None);
        }

        let bore = if inner > 0.0 {
            self.cylinder_interval(p, d, inner, z_interval, tol)?
        } else {
            None
        };
        let mut pieces = Vec::with_capacity(2);
        match bore {
            Some((s1, s2)) => {
                pieces.extend(clip_unit(lo, hi.min(s1)));
                pieces.extend(clip_unit(lo.max(s2), hi));
            }
            None => pieces.extend(clip_unit(lo, hi)),
        }
        Ok(Chord::from_pieces(&pieces))
    }

    // Interval of the line inside x² + y² < r².
    fn cylinder_interval(
        &self,
        p: &Vector3<f64>,
        d: &Vector3<f64>,
        radius: f64,
        z_interval: (f64, f64),
        tol: f64,
    ) -> CherenkovResult<Option<(f64, f64)>> {
        let a = d.x * d.x + d.y * d.y;
        let b = 2.0 * (p.x * d.x + p.y * d.y);
        let c = p.x * p.x + p.y * p.y - radius * radius;

        if a < 1e-12 {
            // parallel to the axis
            let offset = (p.x * p.x + p.y * p.y).sqrt() - radius;
            if offset.abs() <= GEOMETRY_TOLERANCE {
                return Err(CherenkovError::ambiguity(self.name(), "segment runs along a curved wall"));
            }
            return Ok(if offset < 0.0 {
                Some((f64::NEG_INFINITY, f64::INFINITY))
            } else {
                None
            });
        }

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return Ok(None);
        }
        let sqrt_disc = disc.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);
        if t2 - t1 <= tol {
            let t_touch = 0.5 * (t1 + t2);
            let touches = t_touch >= 0.0
                && t_touch <= 1.0
                && t_touch >= z_interval.0 - tol
                && t_touch <= z_interval.1 + tol;
            if touches {
                return Err(CherenkovError::ambiguity(self.name(), "segment is tangent to a curved wall"));
            }
            return Ok(None);
        }
        Ok(Some((t1, t2)))
    }
}

// Clip [lo, hi] to the segment [0, 1]; None when nothing is left.
fn clip_unit(lo: f64, hi: f64) -> Option<(f64, f64)> {
    let lo = lo.max(0.0);
    let hi = hi.min(1.0);
    if hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}
