//! protobuf-Nachrichten des `call.Phone`-Dienstes
//!
//! Von Hand mit prost-Attributen deklariert (kein protoc beim Build noetig).
//! Feldnummern und Typen muessen exakt `proto/phone.proto` entsprechen, sonst
//! bricht die Interoperabilitaet mit anderen Implementierungen.
//!
//! ```text
//! CallData
//! ├── audio_data      (1) AudioData    { audio_data(1) bytes, audio_encoding(2) string, length(3) uint64 }
//! └── user_meta_data  (2) UserMetaData { id(1) uint64, coordinates(2) Coordinates { x(1) y(2) z(3) double } }
//! ```

use spatialphone_core::Coordinate;

use crate::error::FrameError;

/// gRPC-Pfad der bidirektionalen Call-Methode
pub const PHONE_CALL_PATH: &str = "/call.Phone/Call";

/// Ein Frame: Audio-Chunk plus Absender-Metadaten
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CallData {
    #[prost(message, optional, tag = "1")]
    pub audio_data: ::core::option::Option<AudioData>,
    #[prost(message, optional, tag = "2")]
    pub user_meta_data: ::core::option::Option<UserMetaData>,
}

/// Audio-Nutzdaten mit deklarierter gueltiger Laenge
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AudioData {
    #[prost(bytes = "bytes", tag = "1")]
    pub audio_data: ::prost::bytes::Bytes,
    #[prost(string, tag = "2")]
    pub audio_encoding: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub length: u64,
}

/// Absender eines Frames
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UserMetaData {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(message, optional, tag = "2")]
    pub coordinates: ::core::option::Option<Coordinates>,
}

/// Wire-Darstellung einer `Coordinate`
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Coordinates {
    #[prost(double, tag = "1")]
    pub x: f64,
    #[prost(double, tag = "2")]
    pub y: f64,
    #[prost(double, tag = "3")]
    pub z: f64,
}

// ---------------------------------------------------------------------------
// Koordinaten-Abbildung
// ---------------------------------------------------------------------------

/// Verlustfreie Abbildung auf das Wire-Format
pub fn to_wire(c: Coordinate) -> Coordinates {
    Coordinates {
        x: c.x,
        y: c.y,
        z: c.z,
    }
}

/// Abbildung vom Wire-Format; lehnt NaN/Unendlich der Gegenseite ab
pub fn from_wire(w: &Coordinates) -> Result<Coordinate, FrameError> {
    Ok(Coordinate::try_new(w.x, w.y, w.z)?)
}

impl From<Coordinate> for Coordinates {
    fn from(c: Coordinate) -> Self {
        to_wire(c)
    }
}

impl TryFrom<Coordinates> for Coordinate {
    type Error = FrameError;

    fn try_from(w: Coordinates) -> Result<Self, Self::Error> {
        from_wire(&w)
    }
}

impl TryFrom<&Coordinates> for Coordinate {
    type Error = FrameError;

    fn try_from(w: &Coordinates) -> Result<Self, Self::Error> {
        from_wire(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn koordinate_wire_round_trip() {
        let punkte = [
            Coordinate::new(-1.5, 0.0, 2.25),
            Coordinate::ORIGIN,
            Coordinate::new(-0.0, -1e-300, 1e300),
            Coordinate::new(f64::MAX, f64::MIN, f64::MIN_POSITIVE),
        ];
        for c in punkte {
            let zurueck = from_wire(&to_wire(c)).expect("endliche Koordinate");
            assert_eq!(zurueck, c);
        }
    }

    #[test]
    fn koordinate_ueber_protobuf_bytes_round_trip() {
        let c = Coordinate::new(-1.5, 0.0, 2.25);
        let bytes = to_wire(c).encode_to_vec();
        let w = Coordinates::decode(bytes.as_slice()).unwrap();
        assert_eq!(Coordinate::try_from(&w).unwrap(), c);
        assert_eq!(Coordinate::try_from(w).unwrap(), c);
    }

    #[test]
    fn from_wire_lehnt_nan_ab() {
        let w = Coordinates {
            x: f64::NAN,
            y: 0.0,
            z: 0.0,
        };
        assert!(matches!(
            from_wire(&w),
            Err(FrameError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn coordinates_feldnummern_bit_exakt() {
        // x = 1.0 -> Tag 1, Wire-Typ 1 (64 bit): 0x09 + 8 Bytes little-endian
        let bytes = Coordinates {
            x: 1.0,
            y: 0.0,
            z: 0.0,
        }
        .encode_to_vec();
        let mut erwartet = vec![0x09];
        erwartet.extend_from_slice(&1.0f64.to_le_bytes());
        assert_eq!(bytes, erwartet);
    }

    #[test]
    fn audio_data_feldnummern_bit_exakt() {
        let msg = AudioData {
            audio_data: ::prost::bytes::Bytes::from_static(&[0xAB, 0xCD]),
            audio_encoding: "x".to_string(),
            length: 2,
        };
        let bytes = msg.encode_to_vec();
        // Tag 1 (len-delim) 0x0A, Tag 2 (len-delim) 0x12, Tag 3 (varint) 0x18
        assert_eq!(
            bytes,
            vec![0x0A, 0x02, 0xAB, 0xCD, 0x12, 0x01, b'x', 0x18, 0x02]
        );
    }

    #[test]
    fn user_meta_data_feldnummern_bit_exakt() {
        let msg = UserMetaData {
            id: 5,
            coordinates: None,
        };
        assert_eq!(msg.encode_to_vec(), vec![0x08, 0x05]);
    }

    #[test]
    fn call_path_entspricht_schema() {
        assert_eq!(PHONE_CALL_PATH, "/call.Phone/Call");
    }
}
