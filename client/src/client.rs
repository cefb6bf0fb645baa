//! CallClient – Einstiegspunkt fuer Anwendungen
//!
//! Haelt die bereits verbundene Transportverbindung, die Anrufer-ID und die
//! aktuelle Position. Pro `call` wird genau ein Stream geoeffnet und eine
//! `CallSession` darueber betrieben. Es laeuft immer hoechstens ein Anruf.

use std::sync::Arc;

use parking_lot::Mutex;
use spatialphone_core::{Coordinate, ParticipantId};
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::config::CallConfig;
use crate::error::CallError;
use crate::session::{CallSession, CallSummary, FailureReporter, SessionConfig, SessionState};
use crate::sink::AudioSink;
use crate::transport::{CallMetadata, CallTransport};

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientZustand {
    Bereit,
    ImAnruf,
    Geschlossen,
}

/// Setzt den Client beim Drop von `ImAnruf` zurueck auf `Bereit`
struct AnrufGuard {
    zustand: Arc<Mutex<ClientZustand>>,
}

impl Drop for AnrufGuard {
    fn drop(&mut self) {
        let mut zustand = self.zustand.lock();
        if *zustand == ClientZustand::ImAnruf {
            *zustand = ClientZustand::Bereit;
        }
    }
}

// ---------------------------------------------------------------------------
// CallClient
// ---------------------------------------------------------------------------

/// Raum-Anruf-Client ueber einer Transportverbindung
pub struct CallClient<T: CallTransport> {
    id: ParticipantId,
    transport: T,
    config: CallConfig,
    position: watch::Sender<Coordinate>,
    zustand: Arc<Mutex<ClientZustand>>,
    session_state: Arc<watch::Sender<SessionState>>,
    reporter: Option<FailureReporter>,
}

impl<T: CallTransport> CallClient<T> {
    /// Erstellt einen Client; die Konfiguration wird dabei validiert
    pub fn new(id: ParticipantId, transport: T, config: CallConfig) -> Result<Self, CallError> {
        config.validieren()?;
        let (position, _) = watch::channel(config.position);
        Ok(Self {
            id,
            transport,
            config,
            position,
            zustand: Arc::new(Mutex::new(ClientZustand::Bereit)),
            session_state: Arc::new(watch::Sender::new(SessionState::Idle)),
            reporter: None,
        })
    }

    /// Meldet Pumpenfehler aller folgenden Anrufe an `reporter`
    pub fn with_failure_reporter(mut self, reporter: FailureReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Anrufer-ID
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    /// Zugrunde liegender Transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Aktive Konfiguration
    pub fn config(&self) -> &CallConfig {
        &self.config
    }

    /// Aktualisiert die eigene Position; gilt ab dem naechsten gesendeten Frame
    pub fn set_position(&self, position: Coordinate) {
        self.position.send_replace(position);
        tracing::debug!(client_id = %self.id, position = %position, "Position aktualisiert");
    }

    /// Aktuelle eigene Position
    pub fn position(&self) -> Coordinate {
        *self.position.borrow()
    }

    /// Zustand der laufenden bzw. letzten Session
    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.session_state.subscribe()
    }

    /// Fuehrt einen Anruf durch.
    ///
    /// Oeffnet einen Stream mit `client-id`-Metadaten, sendet `audio` in
    /// Chunks und liefert empfangene Frames an `sink`. Kehrt zurueck sobald
    /// beide Richtungen beendet sind.
    ///
    /// # Fehler
    /// - `Establish` wenn der Stream nicht geoeffnet werden kann
    /// - `CallInProgress` wenn bereits ein Anruf laeuft
    /// - `AlreadyClosed` nach `close`
    ///
    /// Fehler waehrend des Anrufs beenden nur die betroffene Richtung und
    /// werden geloggt bzw. an den Reporter gemeldet.
    ///
    /// Wird der zurueckgegebene Future verworfen, gilt das als Abbruch. Der
    /// Client bleibt im Anruf bis beide Pumpen beendet sind und der Half-Close
    /// gelaufen ist; bis dahin liefert ein weiterer `call` `CallInProgress`.
    pub async fn call<R, S>(
        &self,
        cancel: CancellationToken,
        audio: R,
        sink: S,
    ) -> Result<CallSummary, CallError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        S: AudioSink + 'static,
    {
        let guard = self.anruf_beginnen()?;
        let span = tracing::info_span!("call", client_id = %self.id);

        async move {
            let metadata = CallMetadata::neu(self.id);
            let stream = self.transport.open_call(&metadata).await.map_err(|e| {
                tracing::warn!(fehler = %e, "Stream-Aufbau fehlgeschlagen");
                CallError::Establish(e)
            })?;
            tracing::info!("Stream geoeffnet");

            let session = CallSession::neu(
                self.id,
                SessionConfig::from(&self.config),
                self.position.subscribe(),
            )
            .with_failure_reporter(self.reporter.clone())
            .with_state_channel(Arc::clone(&self.session_state));

            // Session laeuft in eigenem Task und haelt den Guard bis zum Ende
            let cancel = cancel.child_token();
            let _abbruch = cancel.clone().drop_guard();
            let aufsicht = tokio::spawn(
                async move {
                    let _guard = guard;
                    session.run(stream, audio, sink, cancel).await
                }
                .in_current_span(),
            );

            aufsicht.await.map_err(|e| {
                tracing::error!(fehler = %e, "Session-Task fehlgeschlagen");
                CallError::Session(e.to_string())
            })
        }
        .instrument(span)
        .await
    }

    /// Gibt die Transportverbindung frei
    ///
    /// `CallInProgress` solange ein Anruf laeuft, `AlreadyClosed` beim zweiten Aufruf.
    pub async fn close(&self) -> Result<(), CallError> {
        {
            let mut zustand = self.zustand.lock();
            match *zustand {
                ClientZustand::ImAnruf => return Err(CallError::CallInProgress),
                ClientZustand::Geschlossen => return Err(CallError::AlreadyClosed),
                ClientZustand::Bereit => *zustand = ClientZustand::Geschlossen,
            }
        }
        tracing::info!(client_id = %self.id, "Client wird geschlossen");
        self.transport.close().await?;
        Ok(())
    }

    fn anruf_beginnen(&self) -> Result<AnrufGuard, CallError> {
        let mut zustand = self.zustand.lock();
        match *zustand {
            ClientZustand::ImAnruf => Err(CallError::CallInProgress),
            ClientZustand::Geschlossen => Err(CallError::AlreadyClosed),
            ClientZustand::Bereit => {
                *zustand = ClientZustand::ImAnruf;
                Ok(AnrufGuard {
                    zustand: Arc::clone(&self.zustand),
                })
            }
        }
    }
}

impl<T: CallTransport> std::fmt::Debug for CallClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallClient")
            .field("id", &self.id)
            .field("position", &self.position())
            .field("zustand", &*self.zustand.lock())
            .finish_non_exhaustive()
    }
}
