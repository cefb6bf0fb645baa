//! In-Process-Transport
//!
//! `memory::pair()` liefert einen `MemoryTransport` fuer den Client und einen
//! `MemoryPeer`, der die Gegenstelle spielt. Jeder `open_call` erzeugt auf der
//! Gegenseite einen `MemoryCall`, ueber den Frames geschickt, empfangen,
//! Fehler injiziert und die Half-Closes des Clients gezaehlt werden koennen.
//!
//! ```text
//! MemorySender  ──mpsc(kapazitaet)──>  MemoryCall::recv()
//! MemoryReceiver <──mpsc(kapazitaet)──  MemoryCall::send() / send_error() / finish()
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use spatialphone_protocol::CallData;
use tokio::sync::mpsc;

use super::{CallMetadata, CallReceiver, CallSender, CallStream, CallTransport};
use crate::error::TransportError;

/// Standard-Kapazitaet beider Richtungen (Frames)
pub const DEFAULT_KAPAZITAET: usize = 32;

/// Erstellt ein verbundenes Paar mit Standard-Kapazitaet
pub fn pair() -> (MemoryTransport, MemoryPeer) {
    pair_mit_kapazitaet(DEFAULT_KAPAZITAET)
}

/// Erstellt ein verbundenes Paar; `kapazitaet` gilt pro Richtung und Anruf
pub fn pair_mit_kapazitaet(kapazitaet: usize) -> (MemoryTransport, MemoryPeer) {
    let (anrufe_tx, anrufe_rx) = mpsc::unbounded_channel();
    let geschlossen = Arc::new(AtomicBool::new(false));
    (
        MemoryTransport {
            anrufe: anrufe_tx,
            kapazitaet: kapazitaet.max(1),
            geschlossen: Arc::clone(&geschlossen),
        },
        MemoryPeer {
            anrufe: anrufe_rx,
            transport_geschlossen: geschlossen,
        },
    )
}

// ---------------------------------------------------------------------------
// Client-Seite
// ---------------------------------------------------------------------------

/// Client-Seite des In-Process-Transports
pub struct MemoryTransport {
    anrufe: mpsc::UnboundedSender<MemoryCall>,
    kapazitaet: usize,
    geschlossen: Arc<AtomicBool>,
}

#[async_trait]
impl CallTransport for MemoryTransport {
    async fn open_call(&self, metadata: &CallMetadata) -> Result<CallStream, TransportError> {
        if self.geschlossen.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let (ausgehend_tx, ausgehend_rx) = mpsc::channel(self.kapazitaet);
        let (eingehend_tx, eingehend_rx) = mpsc::channel(self.kapazitaet);
        let half_closes = Arc::new(AtomicUsize::new(0));

        let anruf = MemoryCall {
            metadata: metadata.clone(),
            vom_client: Some(ausgehend_rx),
            zum_client: Some(eingehend_tx),
            half_closes: Arc::clone(&half_closes),
        };
        self.anrufe
            .send(anruf)
            .map_err(|_| TransportError::Establish("Gegenstelle nicht erreichbar".into()))?;

        Ok(CallStream::neu(
            MemorySender {
                tx: Some(ausgehend_tx),
                half_closes,
            },
            MemoryReceiver { rx: eingehend_rx },
        ))
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.geschlossen.swap(true, Ordering::AcqRel) {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

struct MemorySender {
    tx: Option<mpsc::Sender<CallData>>,
    half_closes: Arc<AtomicUsize>,
}

#[async_trait]
impl CallSender for MemorySender {
    async fn send(&mut self, frame: CallData) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).await.map_err(|_| TransportError::PeerClosed)
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        self.half_closes.fetch_add(1, Ordering::AcqRel);
        self.tx.take().map(drop).ok_or(TransportError::Closed)
    }
}

struct MemoryReceiver {
    rx: mpsc::Receiver<Result<CallData, TransportError>>,
}

#[async_trait]
impl CallReceiver for MemoryReceiver {
    async fn recv(&mut self) -> Result<Option<CallData>, TransportError> {
        self.rx.recv().await.transpose()
    }
}

// ---------------------------------------------------------------------------
// Gegenstelle
// ---------------------------------------------------------------------------

/// Gegenstelle: nimmt die vom Client geoeffneten Anrufe entgegen
pub struct MemoryPeer {
    anrufe: mpsc::UnboundedReceiver<MemoryCall>,
    transport_geschlossen: Arc<AtomicBool>,
}

impl MemoryPeer {
    /// Wartet auf den naechsten vom Client geoeffneten Anruf
    pub async fn accept(&mut self) -> Option<MemoryCall> {
        self.anrufe.recv().await
    }

    /// Prueft ob der Client den Transport freigegeben hat
    pub fn transport_geschlossen(&self) -> bool {
        self.transport_geschlossen.load(Ordering::Acquire)
    }
}

/// Gegenseite eines einzelnen Anrufs
pub struct MemoryCall {
    metadata: CallMetadata,
    vom_client: Option<mpsc::Receiver<CallData>>,
    zum_client: Option<mpsc::Sender<Result<CallData, TransportError>>>,
    half_closes: Arc<AtomicUsize>,
}

impl MemoryCall {
    /// Beim Aufbau uebergebene Metadaten
    pub fn metadata(&self) -> &CallMetadata {
        &self.metadata
    }

    /// Naechster Frame vom Client; `None` nach dessen Half-Close
    pub async fn recv(&mut self) -> Option<CallData> {
        match self.vom_client.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Liest alle Frames bis zum Half-Close des Clients
    pub async fn recv_bis_half_close(&mut self) -> Vec<CallData> {
        let mut frames = Vec::new();
        while let Some(frame) = self.recv().await {
            frames.push(frame);
        }
        frames
    }

    /// Schickt einen Frame an den Client
    pub async fn send(&self, frame: CallData) -> Result<(), TransportError> {
        self.zum_client_senden(Ok(frame)).await
    }

    /// Laesst den naechsten `recv` des Clients mit `fehler` scheitern
    pub async fn send_error(&self, fehler: TransportError) -> Result<(), TransportError> {
        self.zum_client_senden(Err(fehler)).await
    }

    /// Beendet die Senderichtung zum Client (regulaeres Stream-Ende)
    pub fn finish(&mut self) {
        self.zum_client = None;
    }

    /// Schliesst die Empfangsseite: weitere Client-Frames scheitern mit `PeerClosed`
    pub fn close_receive(&mut self) {
        self.vom_client = None;
    }

    /// Wie oft der Client `close_send` aufgerufen hat
    pub fn half_closes(&self) -> usize {
        self.half_closes.load(Ordering::Acquire)
    }

    async fn zum_client_senden(
        &self,
        item: Result<CallData, TransportError>,
    ) -> Result<(), TransportError> {
        let tx = self.zum_client.as_ref().ok_or(TransportError::Closed)?;
        tx.send(item).await.map_err(|_| TransportError::PeerClosed)
    }
}
