//! 3D-Koordinaten der Gespraechsteilnehmer
//!
//! Jeder Audio-Frame traegt die Position seines Absenders. Die Koordinate ist
//! ein reiner Wert (`Copy`) ohne eigene Identitaet.
//!
//! ## Endlichkeit
//!
//! `Coordinate::new` nimmt beliebige Werte an (lokale Position, vertrauenswuerdig).
//! Werte von der Gegenseite laufen ueber `Coordinate::try_new`, das NaN und
//! Unendlich ablehnt. `distance` selbst validiert nicht: nicht-endliche
//! Eingaben propagieren nach IEEE-754 als NaN/Inf ins Ergebnis.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Punkt im dreidimensionalen Raum
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinate {
    /// Ursprung (0, 0, 0)
    pub const ORIGIN: Coordinate = Coordinate {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Erstellt eine Koordinate ohne Validierung
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Erstellt eine Koordinate und lehnt NaN/Unendlich ab
    pub fn try_new(x: f64, y: f64, z: f64) -> Result<Self> {
        let c = Self { x, y, z };
        c.validieren()?;
        Ok(c)
    }

    /// Prueft ob alle drei Komponenten endlich sind
    pub fn ist_endlich(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Gibt `NonFiniteCoordinate` zurueck wenn eine Komponente nicht endlich ist
    pub fn validieren(&self) -> Result<()> {
        if self.ist_endlich() {
            Ok(())
        } else {
            Err(CoreError::NonFiniteCoordinate {
                x: self.x,
                y: self.y,
                z: self.z,
            })
        }
    }

    /// Euklidischer Abstand zu `other`
    pub fn distance(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl From<(f64, f64, f64)> for Coordinate {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
