//! Fehlertypen des Call-Clients
//!
//! `TransportError` beschreibt Fehler einer Stream-Haelfte, `CallError` das
//! was beim Aufrufer von `CallClient` ankommt.

use thiserror::Error;

/// Fehler auf dem Transport (eine Stream-Haelfte oder die Verbindung)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Gegenseite hat ihre Empfangsseite geschlossen (regulaer beim Auflegen)
    #[error("Gegenseite nimmt keine Frames mehr an")]
    PeerClosed,

    /// Verbindung oder Stream-Haelfte wurde lokal bereits geschlossen
    #[error("Transport bereits geschlossen")]
    Closed,

    /// Stream konnte nicht aufgebaut werden
    #[error("Stream-Aufbau fehlgeschlagen: {0}")]
    Establish(String),

    /// Fehlerstatus der Gegenseite (z.B. gRPC-Status)
    #[error("Status {code}: {message}")]
    Status { code: String, message: String },
}

impl TransportError {
    /// Gibt true zurueck wenn der Fehler ein regulaeres Ende bedeutet
    pub fn ist_regulaeres_ende(&self) -> bool {
        matches!(self, Self::PeerClosed)
    }
}

/// Fehler die `CallClient::call` und `CallClient::close` zurueckgeben
#[derive(Debug, Error)]
pub enum CallError {
    /// Stream-Aufbau fehlgeschlagen (synchron an den Aufrufer)
    #[error("Anruf konnte nicht aufgebaut werden: {0}")]
    Establish(#[source] TransportError),

    /// Es laeuft bereits ein Anruf auf diesem Client
    #[error("Es laeuft bereits ein Anruf")]
    CallInProgress,

    /// Client wurde bereits geschlossen
    #[error("Client bereits geschlossen")]
    AlreadyClosed,

    /// Transportfehler ausserhalb des Stream-Aufbaus
    #[error("Transportfehler: {0}")]
    Transport(#[from] TransportError),

    /// Session-Task endete ohne Ergebnis (Panik oder Runtime-Shutdown)
    #[error("Session-Task fehlgeschlagen: {0}")]
    Session(String),

    /// Ungueltige Konfiguration
    #[error("Konfigurationsfehler: {0}")]
    Config(String),
}
