//! gRPC-Transport ueber einen tonic-`Channel`
//!
//! ```text
//! GrpcSender ──mpsc(send_queue)──> Request-Stream ──> /call.Phone/Call ──> Streaming<CallData> ──> GrpcReceiver
//! ```
//!
//! Half-Close = Sender der mpsc-Queue droppen; tonic beendet daraufhin den
//! Request-Body. Hat die Gegenseite den Aufruf beendet, wird die Queue
//! verworfen und `send` liefert `TransportError::PeerClosed`.

use async_trait::async_trait;
use parking_lot::Mutex;
use spatialphone_protocol::proto::PHONE_CALL_PATH;
use spatialphone_protocol::CallData;
use tokio::sync::mpsc;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, Endpoint};

use super::{CallMetadata, CallReceiver, CallSender, CallStream, CallTransport};
use crate::config::{CallConfig, DEFAULT_SEND_QUEUE};
use crate::error::TransportError;

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        TransportError::Status {
            code: format!("{:?}", status.code()),
            message: status.message().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// GrpcTransport
// ---------------------------------------------------------------------------

/// Verbindung zu einem `call.Phone`-Dienst
pub struct GrpcTransport {
    /// `None` nach `close()`
    channel: Mutex<Option<Channel>>,
    send_queue: usize,
}

impl GrpcTransport {
    /// Uebernimmt einen bereits aufgebauten Channel
    pub fn neu(channel: Channel) -> Self {
        Self {
            channel: Mutex::new(Some(channel)),
            send_queue: DEFAULT_SEND_QUEUE,
        }
    }

    /// Setzt die Groesse der Sende-Queue (mindestens 1)
    pub fn with_send_queue(mut self, frames: usize) -> Self {
        self.send_queue = frames.max(1);
        self
    }

    /// Baut eine Verbindung zu `uri` auf (z.B. "http://127.0.0.1:50051")
    pub async fn verbinden(uri: impl Into<String>) -> Result<Self, TransportError> {
        let uri = uri.into();
        tracing::info!(uri = %uri, "Verbinde mit Call-Dienst");
        let endpoint = Endpoint::from_shared(uri)
            .map_err(|e| TransportError::Establish(format!("Ungueltige URI: {e}")))?;
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| TransportError::Establish(format!("Verbindung fehlgeschlagen: {e}")))?;
        Ok(Self::neu(channel))
    }

    /// Verbindet und uebernimmt die Queue-Groesse aus `[session] send_queue`
    pub async fn aus_config(
        uri: impl Into<String>,
        config: &CallConfig,
    ) -> Result<Self, TransportError> {
        Ok(Self::verbinden(uri)
            .await?
            .with_send_queue(config.session.send_queue))
    }

    /// Prueft ob `close()` bereits aufgerufen wurde
    pub fn ist_geschlossen(&self) -> bool {
        self.channel.lock().is_none()
    }
}

#[async_trait]
impl CallTransport for GrpcTransport {
    async fn open_call(&self, metadata: &CallMetadata) -> Result<CallStream, TransportError> {
        let channel = self.channel.lock().clone().ok_or(TransportError::Closed)?;

        let mut grpc = tonic::client::Grpc::new(channel);
        grpc.ready()
            .await
            .map_err(|e| TransportError::Establish(format!("Dienst nicht bereit: {e}")))?;

        let (tx, rx) = mpsc::channel::<CallData>(self.send_queue);
        let ausgehend = Box::pin(futures_util::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|frame| (frame, rx))
        }));

        let mut request = tonic::Request::new(ausgehend);
        for (schluessel, wert) in metadata.paare() {
            let wert: MetadataValue<Ascii> = wert.parse().map_err(|e| {
                TransportError::Establish(format!("Ungueltiger Metadaten-Wert: {e}"))
            })?;
            request.metadata_mut().insert(schluessel, wert);
        }

        let codec = tonic::codec::ProstCodec::<CallData, CallData>::default();
        let pfad = PathAndQuery::from_static(PHONE_CALL_PATH);
        let antwort = grpc.streaming(request, pfad, codec).await?;

        tracing::debug!(client_id = %metadata.client_id, "gRPC-Call-Stream geoeffnet");

        Ok(CallStream::neu(
            GrpcSender { tx: Some(tx) },
            GrpcReceiver {
                eingehend: antwort.into_inner(),
            },
        ))
    }

    async fn close(&self) -> Result<(), TransportError> {
        match self.channel.lock().take() {
            Some(_) => {
                tracing::debug!("gRPC-Channel freigegeben");
                Ok(())
            }
            None => Err(TransportError::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// Stream-Haelften
// ---------------------------------------------------------------------------

/// Sendehaelfte: speist die Request-Queue
pub struct GrpcSender {
    tx: Option<mpsc::Sender<CallData>>,
}

#[async_trait]
impl CallSender for GrpcSender {
    async fn send(&mut self, frame: CallData) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).await.map_err(|_| TransportError::PeerClosed)
    }

    async fn close_send(&mut self) -> Result<(), TransportError> {
        self.tx.take().map(drop).ok_or(TransportError::Closed)
    }
}

/// Empfangshaelfte: liest die Response-Nachrichten
pub struct GrpcReceiver {
    eingehend: tonic::Streaming<CallData>,
}

#[async_trait]
impl CallReceiver for GrpcReceiver {
    async fn recv(&mut self) -> Result<Option<CallData>, TransportError> {
        Ok(self.eingehend.message().await?)
    }
}
