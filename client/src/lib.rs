//! spatialphone-client – Raum-Anruf ueber einen bidirektionalen Stream
//!
//! Der Client sendet lokal aufgenommene Audio-Chunks, jeweils mit Anrufer-ID
//! und aktueller 3D-Position, und empfaengt gleichzeitig die Frames der
//! anderen Teilnehmer.
//!
//! ## Aufbau
//!
//! ```text
//! CallClient::call(cancel, audio, sink)
//!     -> CallTransport::open_call(client-id)        <- Stream-Aufbau (Fehler synchron)
//!     -> CallSession::run
//!          ├── Sende-Pumpe:    AsyncRead -> encode_outbound -> CallSender   (+ 1x close_send)
//!          └── Empfangs-Pumpe: CallReceiver -> decode_inbound -> AudioSink
//!     -> Barriere: beide Pumpen beendet -> CallSummary
//! ```
//!
//! Fehler der Pumpen werden geloggt und optional an einen `FailureReporter`
//! gemeldet; `call` selbst liefert nach dem Aufbau immer `Ok`.

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod sink;
pub mod transport;

pub use client::CallClient;
pub use config::{CallConfig, MalformedFramePolicy};
pub use error::{CallError, TransportError};
pub use session::{
    CallSession, CallSummary, FailureReporter, Pump, PumpFailure, PumpFailureKind, SessionConfig,
    SessionState,
};
pub use sink::{AudioSink, SinkClosed, TracingSink};
pub use transport::{
    CallMetadata, CallReceiver, CallSender, CallStream, CallTransport, GrpcTransport,
};

pub use spatialphone_core::{Coordinate, ParticipantId};
pub use spatialphone_protocol::{AudioEncoding, InboundFrame};
