//! Audio-Codec-Bezeichner und Chunk-Grenzen
//!
//! Der Raum-Anruf handelt keinen Codec aus. Der Bezeichner ist ein opaker
//! String, der pro Session konfiguriert und unveraendert in jedem Frame
//! mitgeschickt wird. Der Client interpretiert ihn nicht.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Chunk-Grenzen
// ---------------------------------------------------------------------------

/// Kleinste erlaubte Chunk-Groesse (1 KiB)
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Standard-Chunk-Groesse (16 KiB)
///
/// 16–64 KiB ist der Bereich zwischen Overhead pro Nachricht und Latenz.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Groesste erlaubte Chunk-Groesse (64 KiB)
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

/// Prueft ob eine Chunk-Groesse im erlaubten Bereich liegt
pub fn chunk_groesse_gueltig(groesse: usize) -> bool {
    (MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&groesse)
}

// ---------------------------------------------------------------------------
// AudioEncoding
// ---------------------------------------------------------------------------

/// Opaker Bezeichner fuer die Audio-Darstellung (z.B. PCM-Variante)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioEncoding(String);

impl AudioEncoding {
    /// 16 bit signed PCM, little-endian
    pub const PCM_S16LE: &'static str = "pcm_s16le";

    /// 32 bit float PCM, little-endian
    pub const PCM_F32LE: &'static str = "pcm_f32le";

    /// Erstellt einen Bezeichner aus einem beliebigen Tag
    pub fn neu(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Gibt den Tag zurueck wie er auf dem Wire steht
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leere Tags sind auf dem Wire nicht von "nicht gesetzt" unterscheidbar
    pub fn ist_leer(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AudioEncoding {
    fn default() -> Self {
        Self::neu(Self::PCM_S16LE)
    }
}

impl From<&str> for AudioEncoding {
    fn from(tag: &str) -> Self {
        Self::neu(tag)
    }
}

impl From<String> for AudioEncoding {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl std::fmt::Display for AudioEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
