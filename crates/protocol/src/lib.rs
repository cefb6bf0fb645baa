//! spatialphone-protocol – Wire-Format des Raum-Anrufs
//!
//! Dieses Crate definiert die protobuf-Nachrichten die ueber den
//! bidirektionalen Stream laufen, den opaken Codec-Bezeichner und den
//! Frame-Codec, der rohe Audio-Chunks mit Absender und Position verpackt.

pub mod codec;
pub mod error;
pub mod proto;
pub mod wire;

pub use codec::AudioEncoding;
pub use error::FrameError;
pub use proto::CallData;
pub use wire::{decode_inbound, encode_outbound, InboundFrame};
