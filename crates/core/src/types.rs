//! Identifikationstypen fuer spatialphone
//!
//! Teilnehmer werden ueber eine nicht-negative Ganzzahl identifiziert. Das
//! Newtype-Pattern verhindert Verwechslungen mit Laengen oder Zaehlern.

use serde::{Deserialize, Serialize};

/// Kennung eines Gespraechsteilnehmers (Anrufer oder Absender eines Frames)
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl ParticipantId {
    /// Erstellt eine ParticipantId aus einem Rohwert
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Gibt den inneren Wert zurueck
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ParticipantId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ParticipantId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_dezimal_anzeige() {
        assert_eq!(ParticipantId::new(42).to_string(), "42");
        assert_eq!(ParticipantId::default().to_string(), "0");
    }

    #[test]
    fn participant_id_parse_round_trip() {
        let id: ParticipantId = "1337".parse().unwrap();
        assert_eq!(id, ParticipantId(1337));
        assert!("-1".parse::<ParticipantId>().is_err());
    }

    #[test]
    fn participant_id_ist_serde_transparent() {
        let json = serde_json::to_string(&ParticipantId(7)).unwrap();
        assert_eq!(json, "7");
        let id: ParticipantId = serde_json::from_str(&json).unwrap();
        assert_eq!(id.get(), 7);
    }
}
