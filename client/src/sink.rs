//! Audio-Senke fuer empfangene Frames
//!
//! Die Empfangs-Pumpe uebergibt jeden dekodierten Frame in Eingangsreihenfolge
//! an eine `AudioSink`. Liefert die Senke `SinkClosed`, beendet sich die
//! Pumpe; der Stream selbst bleibt davon unberuehrt.

use async_trait::async_trait;
use spatialphone_protocol::InboundFrame;
use thiserror::Error;
use tokio::sync::mpsc;

/// Senke nimmt keine Frames mehr an
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Audio-Senke geschlossen")]
pub struct SinkClosed;

/// Ziel fuer empfangene Frames (Wiedergabe, Mischer, Test-Kanal ...)
#[async_trait]
pub trait AudioSink: Send {
    /// Uebernimmt einen Frame; darf bei Backpressure warten
    async fn deliver(&mut self, frame: InboundFrame) -> Result<(), SinkClosed>;
}

#[async_trait]
impl AudioSink for mpsc::Sender<InboundFrame> {
    async fn deliver(&mut self, frame: InboundFrame) -> Result<(), SinkClosed> {
        self.send(frame).await.map_err(|_| SinkClosed)
    }
}

#[async_trait]
impl AudioSink for mpsc::UnboundedSender<InboundFrame> {
    async fn deliver(&mut self, frame: InboundFrame) -> Result<(), SinkClosed> {
        self.send(frame).map_err(|_| SinkClosed)
    }
}

#[async_trait]
impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    async fn deliver(&mut self, frame: InboundFrame) -> Result<(), SinkClosed> {
        (**self).deliver(frame).await
    }
}

/// Senke die Frames nur protokolliert und verwirft
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink {
    empfangen: u64,
}

impl TracingSink {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Anzahl bisher uebergebener Frames
    pub fn empfangen(&self) -> u64 {
        self.empfangen
    }
}

#[async_trait]
impl AudioSink for TracingSink {
    async fn deliver(&mut self, frame: InboundFrame) -> Result<(), SinkClosed> {
        self.empfangen += 1;
        tracing::trace!(
            absender = %frame.sender,
            position = %frame.position,
            encoding = %frame.encoding,
            bytes = frame.audio.len(),
            "Frame empfangen"
        );
        Ok(())
    }
}
