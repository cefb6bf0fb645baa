//! Client-Konfiguration
//!
//! Wird optional aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte, sodass der Client ohne Konfigurationsdatei lauffaehig ist.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use spatialphone_core::Coordinate;
use spatialphone_protocol::codec::{self, AudioEncoding};

use crate::error::CallError;
use crate::logging;

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Audio-Einstellungen (Chunk-Groesse, Codec-Bezeichner)
    pub audio: AudioEinstellungen,
    /// Session-Einstellungen (Fehlerpolitik, Shutdown)
    pub session: SessionEinstellungen,
    /// Startposition des lokalen Teilnehmers
    pub position: Coordinate,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Audio-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioEinstellungen {
    /// Maximale Bytes pro Frame (1–64 KiB)
    pub chunk_size: usize,
    /// Codec-Bezeichner der in jeden Frame geschrieben wird
    pub encoding: AudioEncoding,
}

impl Default for AudioEinstellungen {
    fn default() -> Self {
        Self {
            chunk_size: codec::DEFAULT_CHUNK_SIZE,
            encoding: AudioEncoding::default(),
        }
    }
}

/// Umgang mit einem einzelnen fehlerhaften eingehenden Frame
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedFramePolicy {
    /// Empfangs-Pumpe beenden
    #[default]
    Abort,
    /// Frame verwerfen, melden und weiter empfangen
    Skip,
}

/// Standardgroesse der Sende-Queue (Frames)
pub const DEFAULT_SEND_QUEUE: usize = 32;

/// Session-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionEinstellungen {
    /// Politik fuer fehlerhafte eingehende Frames
    pub malformed_frames: MalformedFramePolicy,
    /// Wartezeit nach Abbruch bevor haengende Pumpen hart beendet werden
    pub shutdown_grace_ms: u64,
    /// Puffer zwischen Sende-Pumpe und Transport (Frames)
    pub send_queue: usize,
}

impl Default for SessionEinstellungen {
    fn default() -> Self {
        Self {
            malformed_frames: MalformedFramePolicy::Abort,
            shutdown_grace_ms: 2000,
            send_queue: DEFAULT_SEND_QUEUE,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl CallConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.validieren()?;
        Ok(config)
    }

    /// Parst die Konfiguration aus einem TOML-String (ohne Validierung)
    pub fn aus_toml(inhalt: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(inhalt)
    }

    /// Validiert die Konfiguration
    pub fn validieren(&self) -> Result<(), CallError> {
        if !codec::chunk_groesse_gueltig(self.audio.chunk_size) {
            return Err(CallError::Config(format!(
                "chunk_size muss zwischen {} und {} Bytes liegen (war: {})",
                codec::MIN_CHUNK_SIZE,
                codec::MAX_CHUNK_SIZE,
                self.audio.chunk_size
            )));
        }
        if self.audio.encoding.ist_leer() {
            return Err(CallError::Config("encoding darf nicht leer sein".into()));
        }
        if self.session.send_queue == 0 {
            return Err(CallError::Config("send_queue muss > 0 sein".into()));
        }
        self.position
            .validieren()
            .map_err(|e| CallError::Config(format!("position: {e}")))?;
        if !logging::log_level_gueltig(&self.logging.level) {
            return Err(CallError::Config(format!(
                "Unbekanntes Log-Level: {}",
                self.logging.level
            )));
        }
        if !logging::log_format_gueltig(&self.logging.format) {
            return Err(CallError::Config(format!(
                "Unbekanntes Log-Format: {}",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Wartezeit nach Abbruch als `Duration`
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.session.shutdown_grace_ms)
    }
}
