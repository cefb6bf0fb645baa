//! Structured Logging Setup via tracing-subscriber
//!
//! Die Bibliothek selbst loggt nur ueber `tracing`. Anwendungen koennen mit
//! `logging_initialisieren` einen Subscriber passend zur `CallConfig`
//! installieren. Die Umgebungsvariable `SPATIALPHONE_LOG` ueberschreibt das
//! konfigurierte Level (EnvFilter-Syntax, z.B. `spatialphone_client=debug`).

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingEinstellungen;

/// Umgebungsvariable fuer den Log-Filter
pub const LOG_ENV: &str = "SPATIALPHONE_LOG";

/// Installiert den globalen Subscriber.
///
/// Gibt einen Fehler zurueck wenn bereits ein Subscriber gesetzt ist.
pub fn logging_initialisieren(einstellungen: &LoggingEinstellungen) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&einstellungen.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let ergebnis = match einstellungen.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_current_span(true)
            .try_init(),
        _ => fmt().with_env_filter(filter).with_target(true).try_init(),
    };

    ergebnis.map_err(|e| anyhow::anyhow!("Logging konnte nicht initialisiert werden: {e}"))
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}
