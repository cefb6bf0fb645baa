//! Fehler beim Dekodieren eingehender Frames

use thiserror::Error;

/// Ein einzelner eingehender Frame ist unbrauchbar
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// Deklarierte Laenge ueberschreitet die tatsaechlichen Nutzdaten
    #[error("Frame fehlerhaft: deklarierte Laenge {declared} > Nutzdaten {actual} Bytes")]
    Malformed { declared: u64, actual: usize },

    /// Absender-Position enthaelt NaN oder Unendlich
    #[error("Frame fehlerhaft: Koordinate nicht endlich ({x}, {y}, {z})")]
    NonFiniteCoordinate { x: f64, y: f64, z: f64 },
}

impl From<spatialphone_core::CoreError> for FrameError {
    fn from(e: spatialphone_core::CoreError) -> Self {
        match e {
            spatialphone_core::CoreError::NonFiniteCoordinate { x, y, z } => {
                Self::NonFiniteCoordinate { x, y, z }
            }
        }
    }
}
