//! Transport-Schnittstelle fuer den bidirektionalen Call-Stream
//!
//! Der Verbindungsaufbau liegt ausserhalb des Clients: eine bereits
//! verbundene `CallTransport`-Implementierung wird uebergeben. Pro Anruf
//! oeffnet sie genau einen Stream, dessen Sende- und Empfangshaelfte
//! unabhaengig voneinander (und nebenlaeufig) benutzt werden.
//!
//! Implementierungen:
//! - [`grpc::GrpcTransport`] – tonic-Channel, Methode `/call.Phone/Call`
//! - [`memory::MemoryTransport`] – In-Process-Gegenstelle (Tests, Loopback)

pub mod grpc;
pub mod memory;

use async_trait::async_trait;
use spatialphone_core::ParticipantId;
use spatialphone_protocol::wire::{client_id_metadata_wert, CLIENT_ID_METADATA_KEY};
use spatialphone_protocol::CallData;

use crate::error::TransportError;

pub use grpc::GrpcTransport;
pub use memory::{MemoryCall, MemoryPeer, MemoryTransport};

/// Metadaten die einmal beim Stream-Aufbau mitgeschickt werden
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMetadata {
    /// Anrufer-ID
    pub client_id: ParticipantId,
}

impl CallMetadata {
    pub fn neu(client_id: ParticipantId) -> Self {
        Self { client_id }
    }

    /// Schluessel-Wert-Paare wie sie auf dem Transport landen
    pub fn paare(&self) -> Vec<(&'static str, String)> {
        vec![(
            CLIENT_ID_METADATA_KEY,
            client_id_metadata_wert(self.client_id),
        )]
    }
}

/// Sendehaelfte eines Call-Streams
#[async_trait]
pub trait CallSender: Send {
    /// Schreibt einen Frame.
    ///
    /// `TransportError::PeerClosed` wenn die Gegenseite nicht mehr annimmt.
    async fn send(&mut self, frame: CallData) -> Result<(), TransportError>;

    /// Half-Close: keine weiteren Frames in Senderichtung
    async fn close_send(&mut self) -> Result<(), TransportError>;
}

/// Empfangshaelfte eines Call-Streams
#[async_trait]
pub trait CallReceiver: Send {
    /// Naechster Frame; `Ok(None)` bei regulaerem Stream-Ende
    async fn recv(&mut self) -> Result<Option<CallData>, TransportError>;
}

/// Ein geoeffneter Stream, aufgeteilt in zwei unabhaengige Haelften
pub struct CallStream {
    pub sender: Box<dyn CallSender>,
    pub receiver: Box<dyn CallReceiver>,
}

impl CallStream {
    pub fn neu(sender: impl CallSender + 'static, receiver: impl CallReceiver + 'static) -> Self {
        Self {
            sender: Box::new(sender),
            receiver: Box::new(receiver),
        }
    }
}

impl std::fmt::Debug for CallStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallStream").finish_non_exhaustive()
    }
}

/// Bereits verbundene Transportverbindung
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Oeffnet einen neuen bidirektionalen Stream mit den gegebenen Metadaten
    async fn open_call(&self, metadata: &CallMetadata) -> Result<CallStream, TransportError>;

    /// Gibt die Verbindung frei
    async fn close(&self) -> Result<(), TransportError>;
}
