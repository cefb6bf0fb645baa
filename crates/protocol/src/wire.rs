//! Frame-Codec: Audio-Chunk + Absender <-> `CallData`
//!
//! ## Laengen-Vertrag
//!
//! ```text
//! audio_data: [ gueltige Bytes (length) | evtl. Rest aus ueberdimensioniertem Puffer ]
//! ```
//!
//! Der Empfaenger vertraut nie der physischen Puffergroesse, sondern kuerzt
//! immer auf `length`. Ist `length` groesser als der Puffer, wird der Frame
//! als `FrameError::Malformed` abgelehnt.

use bytes::Bytes;
use spatialphone_core::{Coordinate, ParticipantId};

use crate::codec::AudioEncoding;
use crate::error::FrameError;
use crate::proto::{self, AudioData, CallData, UserMetaData};

// ---------------------------------------------------------------------------
// Stream-Metadaten
// ---------------------------------------------------------------------------

/// Metadaten-Schluessel fuer die Anrufer-ID (einmal pro Stream)
pub const CLIENT_ID_METADATA_KEY: &str = "client-id";

/// Metadaten-Wert fuer die Anrufer-ID: Dezimaldarstellung
pub fn client_id_metadata_wert(id: ParticipantId) -> String {
    id.get().to_string()
}

// ---------------------------------------------------------------------------
// InboundFrame
// ---------------------------------------------------------------------------

/// Dekodierter eingehender Frame
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    /// Absender
    pub sender: ParticipantId,
    /// Position des Absenders zum Sendezeitpunkt
    pub position: Coordinate,
    /// Codec-Bezeichner wie vom Absender gesetzt
    pub encoding: AudioEncoding,
    /// Gueltige Audio-Bytes (bereits auf `length` gekuerzt)
    pub audio: Bytes,
}

// ---------------------------------------------------------------------------
// Kodieren / Dekodieren
// ---------------------------------------------------------------------------

/// Verpackt einen rohen Audio-Chunk mit Absender und aktueller Position
///
/// `chunk` darf nur die gueltigen Bytes enthalten; `length` wird daraus gesetzt.
pub fn encode_outbound(
    chunk: Bytes,
    sender: ParticipantId,
    position: Coordinate,
    encoding: &AudioEncoding,
) -> CallData {
    let length = chunk.len() as u64;
    CallData {
        audio_data: Some(AudioData {
            audio_data: chunk,
            audio_encoding: encoding.as_str().to_owned(),
            length,
        }),
        user_meta_data: Some(UserMetaData {
            id: sender.get(),
            coordinates: Some(proto::to_wire(position)),
        }),
    }
}

/// Entpackt einen empfangenen Frame und kuerzt die Nutzdaten auf `length`
///
/// Fehlende Untermeldungen gelten als ihr proto3-Standardwert: kein Audio-Block
/// ergibt einen leeren Chunk, keine Metadaten Absender 0, keine Koordinaten
/// den Ursprung.
///
/// # Fehler
/// - `Malformed` wenn `length` die Nutzdaten ueberschreitet
/// - `NonFiniteCoordinate` bei NaN/Unendlich in der Absender-Position
pub fn decode_inbound(msg: CallData) -> Result<InboundFrame, FrameError> {
    let audio = msg.audio_data.unwrap_or_default();
    let meta = msg.user_meta_data.unwrap_or_default();
    let coordinates = meta.coordinates.unwrap_or_default();

    let actual = audio.audio_data.len();
    let declared = audio.length;
    let gueltig = usize::try_from(declared)
        .ok()
        .filter(|&n| n <= actual)
        .ok_or(FrameError::Malformed { declared, actual })?;

    let position = proto::from_wire(&coordinates)?;

    Ok(InboundFrame {
        sender: ParticipantId::new(meta.id),
        position,
        encoding: AudioEncoding::from(audio.audio_encoding),
        audio: audio.audio_data.slice(..gueltig),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_mit_laenge(payload: Vec<u8>, length: u64) -> CallData {
        let mut msg = encode_outbound(
            Bytes::from(payload),
            ParticipantId::new(3),
            Coordinate::new(1.0, 2.0, 3.0),
            &AudioEncoding::default(),
        );
        if let Some(audio) = msg.audio_data.as_mut() {
            audio.length = length;
        }
        msg
    }

    #[test]
    fn encode_setzt_laenge_absender_und_position() {
        let msg = encode_outbound(
            Bytes::from_static(b"hallo"),
            ParticipantId::new(9),
            Coordinate::new(-1.5, 0.0, 2.25),
            &AudioEncoding::neu("opus"),
        );
        let audio = msg.audio_data.as_ref().unwrap();
        assert_eq!(audio.length, 5);
        assert_eq!(audio.audio_encoding, "opus");
        let meta = msg.user_meta_data.as_ref().unwrap();
        assert_eq!(meta.id, 9);
        let c = meta.coordinates.unwrap();
        assert_eq!((c.x, c.y, c.z), (-1.5, 0.0, 2.25));
    }

    #[test]
    fn decode_kuerzt_auf_deklarierte_laenge() {
        let payload: Vec<u8> = (0..100u8).collect();
        let frame = decode_inbound(frame_mit_laenge(payload.clone(), 40)).unwrap();
        assert_eq!(frame.audio.len(), 40);
        assert_eq!(&frame.audio[..], &payload[..40]);
        assert_eq!(frame.sender, ParticipantId::new(3));
        assert_eq!(frame.position, Coordinate::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn decode_lehnt_zu_grosse_laenge_ab() {
        let err = decode_inbound(frame_mit_laenge(vec![0u8; 100], 200)).unwrap_err();
        assert_eq!(
            err,
            FrameError::Malformed {
                declared: 200,
                actual: 100
            }
        );
    }

    #[test]
    fn decode_laenge_null_ergibt_leeren_chunk() {
        let frame = decode_inbound(frame_mit_laenge(vec![1, 2, 3], 0)).unwrap();
        assert!(frame.audio.is_empty());
    }

    #[test]
    fn decode_riesige_laenge_ist_malformed() {
        let err = decode_inbound(frame_mit_laenge(vec![0u8; 4], u64::MAX)).unwrap_err();
        assert!(matches!(err, FrameError::Malformed { actual: 4, .. }));
    }

    #[test]
    fn decode_fehlende_koordinaten_ergeben_ursprung() {
        let mut msg = frame_mit_laenge(vec![7u8; 4], 4);
        if let Some(meta) = msg.user_meta_data.as_mut() {
            meta.coordinates = None;
        }
        let frame = decode_inbound(msg).unwrap();
        assert_eq!(frame.position, Coordinate::ORIGIN);
        assert_eq!(frame.sender, ParticipantId::new(3));
        assert_eq!(&frame.audio[..], &[7u8; 4]);
    }

    #[test]
    fn decode_fehlende_metadaten_ergeben_absender_null() {
        let mut msg = frame_mit_laenge(vec![0u8; 4], 4);
        msg.user_meta_data = None;
        let frame = decode_inbound(msg).unwrap();
        assert_eq!(frame.sender, ParticipantId::new(0));
        assert_eq!(frame.position, Coordinate::ORIGIN);
        assert_eq!(frame.audio.len(), 4);
    }

    #[test]
    fn decode_fehlender_audio_block_ergibt_leeren_chunk() {
        let mut msg = frame_mit_laenge(vec![0u8; 4], 4);
        msg.audio_data = None;
        let frame = decode_inbound(msg).unwrap();
        assert!(frame.audio.is_empty());
        assert!(frame.encoding.as_str().is_empty());
        assert_eq!(frame.position, Coordinate::new(1.0, 2.0, 3.0));

        // Ganz leerer Envelope ist ebenfalls gueltig
        let frame = decode_inbound(CallData::default()).unwrap();
        assert_eq!(frame.sender, ParticipantId::new(0));
        assert!(frame.audio.is_empty());
    }

    #[test]
    fn decode_lehnt_nicht_endliche_position_ab() {
        let mut msg = frame_mit_laenge(vec![0u8; 4], 4);
        if let Some(meta) = msg.user_meta_data.as_mut() {
            meta.coordinates = Some(proto::Coordinates {
                x: f64::INFINITY,
                y: 0.0,
                z: 0.0,
            });
        }
        assert!(matches!(
            decode_inbound(msg),
            Err(FrameError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn client_id_metadaten() {
        assert_eq!(CLIENT_ID_METADATA_KEY, "client-id");
        assert_eq!(client_id_metadata_wert(ParticipantId::new(4711)), "4711");
    }
}
