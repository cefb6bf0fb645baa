//! Fehlertypen fuer spatialphone-core

use thiserror::Error;

/// Result-Alias fuer Core-Operationen
pub type Result<T> = std::result::Result<T, CoreError>;

/// Fehler beim Erzeugen von Core-Werten
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Mindestens eine Komponente ist NaN oder unendlich
    #[error("Koordinate nicht endlich: ({x}, {y}, {z})")]
    NonFiniteCoordinate { x: f64, y: f64, z: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige_enthaelt_komponenten() {
        let e = CoreError::NonFiniteCoordinate {
            x: 1.0,
            y: f64::NAN,
            z: 3.0,
        };
        let text = e.to_string();
        assert!(text.starts_with("Koordinate nicht endlich"));
        assert!(text.contains("NaN"));
    }
}
