// Error taxonomy for table construction, geometry and sampling
use thiserror::Error;

/// Errors surfaced by the Cherenkov core.
///
/// Only `Configuration` ever reaches a caller of the public table API. The
/// other variants are produced internally, logged, and resolved with a local
/// fallback before a step result is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CherenkovError {
    /// Bad material data or bad global parameters. Fatal for the affected
    /// material only: it is marked non-radiating.
    #[error("Configuration error for material {material}: {message}")]
    Configuration { material: String, message: String },

    /// The thin-target intersection could not be resolved exactly.
    #[error("Geometry ambiguity in {solid}: {message}")]
    GeometryAmbiguity { solid: String, message: String },

    /// A parameter outside its valid range.
    #[error("Invalid parameter {name} = {value}: {message}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        message: String,
    },
}

impl CherenkovError {
    pub fn configuration(material: impl Into<String>, message: impl Into<String>) -> Self {
        CherenkovError::Configuration {
            material: material.into(),
            message: message.into(),
        }
    }

    pub fn ambiguity(solid: impl Into<String>, message: impl Into<String>) -> Self {
        CherenkovError::GeometryAmbiguity {
            solid: solid.into(),
            message: message.into(),
        }
    }
}

pub type CherenkovResult<T> = Result<T, CherenkovError>;

/// Abort on a broken internal invariant (an index walked past a table end,
/// a negative count). These are programming defects, never data problems.
#[track_caller]
pub fn internal_inconsistency(material: &str, operation: &str, detail: &str) -> ! {
    log::error!(
        "Internal inconsistency in {} for material {}: {}",
        operation,
        material,
        detail
    );
    panic!(
        "Fatal internal inconsistency in {} for material {}: {}",
        operation, material, detail
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message() {
        let err = CherenkovError::configuration("Water", "empty refractive index spectrum");
        assert_eq!(
            err.to_string(),
            "Configuration error for material Water: empty refractive index spectrum"
        );
    }

    #[test]
    fn test_ambiguity_error_message() {
        let err = CherenkovError::ambiguity("Box", "segment lies on face");
        assert!(err.to_string().contains("Box"));
        assert!(err.to_string().contains("segment lies on face"));
    }

    #[test]
    #[should_panic(expected = "Fatal internal inconsistency in cdf inversion for material Glass")]
    fn test_internal_inconsistency_panics() {
        internal_inconsistency("Glass", "cdf inversion", "index 12 past end 10");
    }
}
