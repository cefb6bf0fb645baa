//! spatialphone-core – Gemeinsame Typen fuer den Raum-Anruf
//!
//! Dieses Crate stellt die Bausteine bereit, die Protokoll und Client
//! gemeinsam nutzen: Teilnehmer-IDs, 3D-Koordinaten und die zugehoerigen
//! Fehlertypen.

pub mod coordinate;
pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use coordinate::Coordinate;
pub use error::{CoreError, Result};
pub use types::ParticipantId;
