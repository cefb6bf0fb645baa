//! Duplex-Session: zwei Pumpen ueber einem Call-Stream
//!
//! ```text
//!                 ┌──────────── Sende-Pumpe (Task) ────────────┐
//! AsyncRead ──read(chunk_size)──> encode_outbound ──> CallSender ──> 1x close_send
//!                 └────────────────────────────────────────────┘
//!                 ┌─────────── Empfangs-Pumpe (Task) ──────────┐
//! CallReceiver ──recv──> decode_inbound ──> AudioSink
//!                 └────────────────────────────────────────────┘
//!                              │
//!                              v
//!              Barriere: beide Tasks beendet -> CallSummary
//! ```
//!
//! ## Zustaende
//!
//! `Idle -> Active -> Draining -> Closed`, veroeffentlicht ueber einen
//! `watch`-Kanal. `Draining` sobald die erste Pumpe endet, `Closed` wenn beide
//! beendet sind und der Half-Close gelaufen ist.
//!
//! ## Abbruch
//!
//! Das `CancellationToken` wird an jedem Wartepunkt beider Pumpen
//! beruecksichtigt. Ab dem Abbruch gilt fuer beide Pumpen zusammen eine Frist
//! von `shutdown_grace`; wer danach noch laeuft, wird hart beendet
//! (`PumpFailureKind::Aborted`).
//!
//! Wird der `run`-Future verworfen, loest das den Abbruch aus und beide
//! Pumpen-Tasks werden beendet. Sie laufen nie losgeloest weiter.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use spatialphone_core::{Coordinate, ParticipantId};
use spatialphone_protocol::{decode_inbound, encode_outbound, AudioEncoding};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

use crate::config::{CallConfig, MalformedFramePolicy};
use crate::sink::AudioSink;
use crate::transport::{CallReceiver, CallSender, CallStream};

// ---------------------------------------------------------------------------
// Oeffentliche Typen
// ---------------------------------------------------------------------------

/// Lebenszyklus einer Session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Noch kein Stream
    #[default]
    Idle,
    /// Beide Pumpen laufen
    Active,
    /// Eine Pumpe ist beendet, die andere laeuft noch
    Draining,
    /// Beide Pumpen beendet, Half-Close erledigt
    Closed,
}

/// Welche Pumpe einen Fehler meldet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pump {
    Send,
    Receive,
}

impl fmt::Display for Pump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pump::Send => f.write_str("send"),
            Pump::Receive => f.write_str("receive"),
        }
    }
}

/// Art eines Pumpenfehlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PumpFailureKind {
    /// Lesefehler der lokalen Audio-Quelle
    LocalIo,
    /// Schreib- oder Lesefehler auf dem Stream (ausser `PeerClosed`)
    Transport,
    /// Half-Close der Senderichtung fehlgeschlagen
    HalfClose,
    /// Eingehender Frame nicht dekodierbar
    MalformedFrame,
    /// Audio-Senke nimmt nichts mehr an
    SinkClosed,
    /// Pumpe hat nicht auf Abbruch reagiert und wurde hart beendet
    Aborted,
}

/// Gemeldeter Pumpenfehler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PumpFailure {
    pub pump: Pump,
    pub kind: PumpFailureKind,
    pub message: String,
}

impl fmt::Display for PumpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pump, {:?}: {}", self.pump, self.kind, self.message)
    }
}

/// Kanal ueber den Pumpenfehler an die Anwendung gemeldet werden
pub type FailureReporter = mpsc::UnboundedSender<PumpFailure>;

/// Ergebnis eines beendeten Anrufs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CallSummary {
    /// Erfolgreich geschriebene Frames
    pub frames_sent: u64,
    /// An die Senke uebergebene Frames
    pub frames_received: u64,
    /// Wegen Dekodierfehler verworfene Frames (nur bei `Skip`)
    pub frames_skipped: u64,
    /// Anruf wurde ueber das Token abgebrochen
    pub cancelled: bool,
}

/// Laufzeit-Parameter einer Session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub chunk_size: usize,
    pub encoding: AudioEncoding,
    pub malformed_frames: MalformedFramePolicy,
    pub shutdown_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&CallConfig::default())
    }
}

impl From<&CallConfig> for SessionConfig {
    fn from(config: &CallConfig) -> Self {
        Self {
            chunk_size: config.audio.chunk_size,
            encoding: config.audio.encoding.clone(),
            malformed_frames: config.session.malformed_frames,
            shutdown_grace: config.shutdown_grace(),
        }
    }
}

// ---------------------------------------------------------------------------
// Interne Hilfen
// ---------------------------------------------------------------------------

/// Loggt Pumpenfehler und leitet sie optional an den Reporter weiter
#[derive(Clone)]
struct Melder {
    reporter: Option<FailureReporter>,
}

impl Melder {
    fn melden(&self, pump: Pump, kind: PumpFailureKind, message: impl Into<String>) {
        let fehler = PumpFailure {
            pump,
            kind,
            message: message.into(),
        };
        tracing::warn!(pumpe = %pump, art = ?kind, fehler = %fehler.message, "Pumpenfehler");
        if let Some(reporter) = &self.reporter {
            // Reporter ohne Empfaenger ist kein Fehler der Session
            let _ = reporter.send(fehler);
        }
    }
}

#[derive(Default)]
struct Zaehler {
    gesendet: AtomicU64,
    empfangen: AtomicU64,
    verworfen: AtomicU64,
}

/// Setzt beim Drop `Active -> Draining`; laeuft auch wenn der Task abgebrochen wird
struct AustrittsMelder(Arc<watch::Sender<SessionState>>);

impl Drop for AustrittsMelder {
    fn drop(&mut self) {
        self.0.send_if_modified(|zustand| {
            if *zustand == SessionState::Active {
                *zustand = SessionState::Draining;
                true
            } else {
                false
            }
        });
    }
}

/// Gemeinsam genutzte Sendehaelfte; der Half-Close laeuft genau einmal
struct Sendehaelfte {
    sender: Mutex<Box<dyn CallSender>>,
    halb_geschlossen: AtomicBool,
}

impl Sendehaelfte {
    async fn half_close(&self, melder: &Melder) {
        if self.halb_geschlossen.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.sender.lock().await.close_send().await {
            melder.melden(Pump::Send, PumpFailureKind::HalfClose, e.to_string());
        } else {
            tracing::debug!("Senderichtung geschlossen");
        }
    }
}

// ---------------------------------------------------------------------------
// CallSession
// ---------------------------------------------------------------------------

/// Eine einzelne Duplex-Session ueber genau einem Stream
pub struct CallSession {
    caller: ParticipantId,
    config: SessionConfig,
    position: watch::Receiver<Coordinate>,
    melder: Melder,
    state: Arc<watch::Sender<SessionState>>,
}

impl CallSession {
    /// Erstellt eine Session; `position` liefert die jeweils aktuelle Position
    pub fn neu(
        caller: ParticipantId,
        config: SessionConfig,
        position: watch::Receiver<Coordinate>,
    ) -> Self {
        Self {
            caller,
            config,
            position,
            melder: Melder { reporter: None },
            state: Arc::new(watch::Sender::new(SessionState::Idle)),
        }
    }

    /// Meldet Pumpenfehler zusaetzlich an `reporter`
    pub fn with_failure_reporter(mut self, reporter: Option<FailureReporter>) -> Self {
        self.melder.reporter = reporter;
        self
    }

    /// Veroeffentlicht die Zustaende ueber einen bestehenden Kanal
    pub fn with_state_channel(mut self, state: Arc<watch::Sender<SessionState>>) -> Self {
        state.send_replace(SessionState::Idle);
        self.state = state;
        self
    }

    /// Beobachter fuer den Session-Zustand
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Startet beide Pumpen und wartet bis beide beendet sind
    ///
    /// Pumpenfehler beenden nur die jeweilige Pumpe und landen im Log bzw.
    /// beim Reporter. Das Ergebnis ist immer eine `CallSummary`.
    pub async fn run<R, S>(
        self,
        stream: CallStream,
        audio: R,
        sink: S,
        cancel: CancellationToken,
    ) -> CallSummary
    where
        R: AsyncRead + Send + Unpin + 'static,
        S: AudioSink + 'static,
    {
        let CallStream { sender, receiver } = stream;
        // Verwerfen von `run` bricht die Pumpen ab
        let cancel = cancel.child_token();
        let _abbruch = cancel.clone().drop_guard();
        let zaehler = Arc::new(Zaehler::default());
        let sendehaelfte = Arc::new(Sendehaelfte {
            sender: Mutex::new(sender),
            halb_geschlossen: AtomicBool::new(false),
        });

        self.state.send_replace(SessionState::Active);
        tracing::info!(client_id = %self.caller, "Session aktiv");

        let sende_task = AbortOnDropHandle::new(tokio::spawn(sende_pumpe(
            SendeKontext {
                caller: self.caller,
                chunk_size: self.config.chunk_size,
                encoding: self.config.encoding.clone(),
                position: self.position.clone(),
                sendehaelfte: Arc::clone(&sendehaelfte),
                melder: self.melder.clone(),
                zaehler: Arc::clone(&zaehler),
                cancel: cancel.clone(),
                _austritt: AustrittsMelder(Arc::clone(&self.state)),
            },
            audio,
        )));

        let empfangs_task = AbortOnDropHandle::new(tokio::spawn(empfangs_pumpe(
            EmpfangsKontext {
                policy: self.config.malformed_frames,
                melder: self.melder.clone(),
                zaehler: Arc::clone(&zaehler),
                cancel: cancel.clone(),
                _austritt: AustrittsMelder(Arc::clone(&self.state)),
            },
            receiver,
            sink,
        )));

        let mut frist = Frist::neu(self.config.shutdown_grace);
        pumpe_abwarten(sende_task, Pump::Send, &cancel, &mut frist, &self.melder).await;
        pumpe_abwarten(empfangs_task, Pump::Receive, &cancel, &mut frist, &self.melder).await;

        // Falls die Sende-Pumpe vor dem Half-Close abgebrochen wurde
        sendehaelfte.half_close(&self.melder).await;

        let summary = CallSummary {
            frames_sent: zaehler.gesendet.load(Ordering::Acquire),
            frames_received: zaehler.empfangen.load(Ordering::Acquire),
            frames_skipped: zaehler.verworfen.load(Ordering::Acquire),
            cancelled: cancel.is_cancelled(),
        };

        self.state.send_replace(SessionState::Closed);
        tracing::info!(
            client_id = %self.caller,
            gesendet = summary.frames_sent,
            empfangen = summary.frames_received,
            verworfen = summary.frames_skipped,
            abgebrochen = summary.cancelled,
            "Session beendet"
        );
        summary
    }
}

/// Gemeinsame Nachlauffrist beider Pumpen, beginnt beim ersten Abbruch
struct Frist {
    grace: Duration,
    ende: Option<Instant>,
}

impl Frist {
    fn neu(grace: Duration) -> Self {
        Self { grace, ende: None }
    }

    fn ende(&mut self) -> Instant {
        let grace = self.grace;
        *self.ende.get_or_insert_with(|| Instant::now() + grace)
    }
}

/// Wartet auf eine Pumpe; nach Abbruch hoechstens bis zum Ende der Frist
async fn pumpe_abwarten(
    mut handle: AbortOnDropHandle<()>,
    pump: Pump,
    cancel: &CancellationToken,
    frist: &mut Frist,
    melder: &Melder,
) {
    let ergebnis = tokio::select! {
        res = &mut handle => res,
        _ = cancel.cancelled() => {
            match tokio::time::timeout_at(frist.ende(), &mut handle).await {
                Ok(res) => res,
                Err(_) => {
                    handle.abort();
                    melder.melden(
                        pump,
                        PumpFailureKind::Aborted,
                        format!("keine Reaktion auf Abbruch innerhalb von {:?}", frist.grace),
                    );
                    handle.await
                }
            }
        }
    };

    if let Err(e) = ergebnis {
        if e.is_panic() {
            melder.melden(pump, PumpFailureKind::Aborted, format!("Pumpe abgestuerzt: {e}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Sende-Pumpe
// ---------------------------------------------------------------------------

struct SendeKontext {
    caller: ParticipantId,
    chunk_size: usize,
    encoding: AudioEncoding,
    position: watch::Receiver<Coordinate>,
    sendehaelfte: Arc<Sendehaelfte>,
    melder: Melder,
    zaehler: Arc<Zaehler>,
    cancel: CancellationToken,
    _austritt: AustrittsMelder,
}

async fn sende_pumpe<R: AsyncRead + Unpin>(ctx: SendeKontext, mut audio: R) {
    // Ein Puffer fuer die ganze Session, pro Frame werden nur n Bytes kopiert
    let mut puffer = vec![0u8; ctx.chunk_size];

    loop {
        let n = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!("Sende-Pumpe: Abbruch");
                break;
            }
            res = audio.read(&mut puffer) => match res {
                Ok(0) => {
                    tracing::debug!("Audio-Quelle erschoepft");
                    break;
                }
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    ctx.melder.melden(Pump::Send, PumpFailureKind::LocalIo, e.to_string());
                    break;
                }
            }
        };

        let position = *ctx.position.borrow();
        let frame = encode_outbound(
            Bytes::copy_from_slice(&puffer[..n]),
            ctx.caller,
            position,
            &ctx.encoding,
        );

        let mut haelfte = ctx.sendehaelfte.sender.lock().await;
        let res = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!("Sende-Pumpe: Abbruch waehrend Schreiben");
                break;
            }
            res = haelfte.send(frame) => res,
        };

        match res {
            Ok(()) => {
                ctx.zaehler.gesendet.fetch_add(1, Ordering::AcqRel);
                tracing::trace!(bytes = n, "Frame gesendet");
            }
            Err(e) if e.ist_regulaeres_ende() => {
                tracing::debug!("Gegenseite nimmt keine Frames mehr an");
                break;
            }
            Err(e) => {
                ctx.melder.melden(Pump::Send, PumpFailureKind::Transport, e.to_string());
                break;
            }
        }
    }

    ctx.sendehaelfte.half_close(&ctx.melder).await;
}

// ---------------------------------------------------------------------------
// Empfangs-Pumpe
// ---------------------------------------------------------------------------

struct EmpfangsKontext {
    policy: MalformedFramePolicy,
    melder: Melder,
    zaehler: Arc<Zaehler>,
    cancel: CancellationToken,
    _austritt: AustrittsMelder,
}

async fn empfangs_pumpe<S: AudioSink>(
    ctx: EmpfangsKontext,
    mut receiver: Box<dyn CallReceiver>,
    mut sink: S,
) {
    loop {
        let nachricht = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!("Empfangs-Pumpe: Abbruch");
                break;
            }
            res = receiver.recv() => res,
        };

        let daten = match nachricht {
            Ok(Some(daten)) => daten,
            Ok(None) => {
                tracing::debug!("Gegenseite hat Senderichtung beendet");
                break;
            }
            Err(e) => {
                ctx.melder.melden(Pump::Receive, PumpFailureKind::Transport, e.to_string());
                break;
            }
        };

        let frame = match decode_inbound(daten) {
            Ok(frame) => frame,
            Err(e) => {
                ctx.melder.melden(Pump::Receive, PumpFailureKind::MalformedFrame, e.to_string());
                match ctx.policy {
                    MalformedFramePolicy::Skip => {
                        ctx.zaehler.verworfen.fetch_add(1, Ordering::AcqRel);
                        continue;
                    }
                    MalformedFramePolicy::Abort => break,
                }
            }
        };

        let res = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                tracing::debug!("Empfangs-Pumpe: Abbruch waehrend Zustellung");
                break;
            }
            res = sink.deliver(frame) => res,
        };

        match res {
            Ok(()) => {
                ctx.zaehler.empfangen.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => {
                ctx.melder.melden(Pump::Receive, PumpFailureKind::SinkClosed, e.to_string());
                break;
            }
        }
    }
}
