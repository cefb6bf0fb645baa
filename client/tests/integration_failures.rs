//! Integration-Tests fuer Pumpenfehler, Fehlerpolitik und Reporter

use std::time::Duration;

use bytes::Bytes;
use futures_util::stream;
use spatialphone_client::config::MalformedFramePolicy;
use spatialphone_client::transport::memory::{self, MemoryPeer, MemoryTransport};
use spatialphone_client::{
    AudioEncoding, CallClient, CallConfig, Coordinate, InboundFrame, ParticipantId, Pump,
    PumpFailure, PumpFailureKind, TransportError,
};
use spatialphone_protocol::{encode_outbound, CallData};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

const FRIST: Duration = Duration::from_secs(5);

fn client_mit_reporter(
    policy: MalformedFramePolicy,
) -> (
    CallClient<MemoryTransport>,
    MemoryPeer,
    mpsc::UnboundedReceiver<PumpFailure>,
) {
    let (transport, peer) = memory::pair();
    let mut config = CallConfig::default();
    config.session.malformed_frames = policy;
    let (reporter, fehler) = mpsc::unbounded_channel();
    let client = CallClient::new(ParticipantId::new(10), transport, config)
        .expect("Konfiguration muss gueltig sein")
        .with_failure_reporter(reporter);
    (client, peer, fehler)
}

fn gueltiger_frame(id: u64) -> CallData {
    encode_outbound(
        Bytes::from_static(b"audio"),
        ParticipantId::new(id),
        Coordinate::new(1.0, 1.0, 1.0),
        &AudioEncoding::default(),
    )
}

/// Frame dessen `length` die Nutzdaten ueberschreitet
fn kaputter_frame() -> CallData {
    let mut frame = gueltiger_frame(99);
    if let Some(audio) = frame.audio_data.as_mut() {
        audio.length = 200;
    }
    frame
}

fn alle_fehler(rx: &mut mpsc::UnboundedReceiver<PumpFailure>) -> Vec<PumpFailure> {
    let mut fehler = Vec::new();
    while let Ok(f) = rx.try_recv() {
        fehler.push(f);
    }
    fehler
}

#[tokio::test]
async fn kaputter_frame_wird_bei_skip_uebersprungen() {
    let (client, mut peer, mut fehler) = client_mit_reporter(MalformedFramePolicy::Skip);
    let (sink, mut rx) = mpsc::unbounded_channel::<InboundFrame>();

    let gegenstelle = async {
        let mut anruf = peer.accept().await.unwrap();
        anruf.send(gueltiger_frame(1)).await.unwrap();
        anruf.send(kaputter_frame()).await.unwrap();
        anruf.send(gueltiger_frame(2)).await.unwrap();
        anruf.finish();
        anruf.recv_bis_half_close().await
    };

    let (ergebnis, _) = tokio::time::timeout(FRIST, async {
        tokio::join!(
            client.call(CancellationToken::new(), tokio::io::empty(), sink),
            gegenstelle
        )
    })
    .await
    .unwrap();

    let summary = ergebnis.unwrap();
    assert_eq!(summary.frames_received, 2);
    assert_eq!(summary.frames_skipped, 1);

    assert_eq!(rx.try_recv().unwrap().sender, ParticipantId::new(1));
    assert_eq!(rx.try_recv().unwrap().sender, ParticipantId::new(2));

    let fehler = alle_fehler(&mut fehler);
    assert_eq!(fehler.len(), 1);
    assert_eq!(fehler[0].pump, Pump::Receive);
    assert_eq!(fehler[0].kind, PumpFailureKind::MalformedFrame);
}

#[tokio::test]
async fn kaputter_frame_beendet_empfang_bei_abort() {
    let (client, mut peer, mut fehler) = client_mit_reporter(MalformedFramePolicy::Abort);
    let (sink, mut rx) = mpsc::unbounded_channel::<InboundFrame>();

    let gegenstelle = async {
        let mut anruf = peer.accept().await.unwrap();
        anruf.send(gueltiger_frame(1)).await.unwrap();
        anruf.send(kaputter_frame()).await.unwrap();
        // Kann scheitern wenn die Empfangs-Pumpe schon beendet ist
        let _ = anruf.send(gueltiger_frame(2)).await;
        anruf.finish();
        anruf.recv_bis_half_close().await
    };

    let (ergebnis, _) = tokio::time::timeout(FRIST, async {
        tokio::join!(
            client.call(CancellationToken::new(), tokio::io::empty(), sink),
            gegenstelle
        )
    })
    .await
    .unwrap();

    let summary = ergebnis.unwrap();
    assert_eq!(summary.frames_received, 1);
    assert_eq!(summary.frames_skipped, 0);
    assert_eq!(rx.try_recv().unwrap().sender, ParticipantId::new(1));
    assert!(rx.try_recv().is_err());

    let fehler = alle_fehler(&mut fehler);
    assert_eq!(fehler.len(), 1);
    assert_eq!(fehler[0].kind, PumpFailureKind::MalformedFrame);
}

#[tokio::test]
async fn lesefehler_der_audio_quelle_wird_gemeldet() {
    let (client, mut peer, mut fehler) = client_mit_reporter(MalformedFramePolicy::Abort);
    let audio = StreamReader::new(stream::iter(vec![
        Ok(Bytes::from_static(b"erster chunk")),
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "Mikrofon getrennt",
        )),
    ]));
    let (sink, _rx) = mpsc::unbounded_channel::<InboundFrame>();

    let gegenstelle = async {
        let mut anruf = peer.accept().await.unwrap();
        anruf.finish();
        let frames = anruf.recv_bis_half_close().await;
        (frames.len(), anruf.half_closes())
    };

    let (ergebnis, (frames, half_closes)) = tokio::time::timeout(FRIST, async {
        tokio::join!(client.call(CancellationToken::new(), audio, sink), gegenstelle)
    })
    .await
    .unwrap();

    // Der Anruf selbst gilt trotzdem als erfolgreich
    assert_eq!(ergebnis.unwrap().frames_sent, 1);
    assert_eq!(frames, 1);
    assert_eq!(half_closes, 1);

    let fehler = alle_fehler(&mut fehler);
    assert_eq!(fehler.len(), 1);
    assert_eq!(fehler[0].pump, Pump::Send);
    assert_eq!(fehler[0].kind, PumpFailureKind::LocalIo);
    assert!(fehler[0].message.contains("Mikrofon getrennt"));
}

#[tokio::test]
async fn empfangsfehler_beendet_nur_empfangs_pumpe() {
    let (client, mut peer, mut fehler) = client_mit_reporter(MalformedFramePolicy::Abort);
    let audio = StreamReader::new(stream::iter(vec![
        Ok::<_, std::io::Error>(Bytes::from_static(b"a")),
        Ok(Bytes::from_static(b"b")),
    ]));
    let (sink, _rx) = mpsc::unbounded_channel::<InboundFrame>();

    let gegenstelle = async {
        let mut anruf = peer.accept().await.unwrap();
        anruf
            .send_error(TransportError::Status {
                code: "Internal".into(),
                message: "Server-Fehler".into(),
            })
            .await
            .unwrap();
        anruf.recv_bis_half_close().await.len()
    };

    let (ergebnis, frames) = tokio::time::timeout(FRIST, async {
        tokio::join!(client.call(CancellationToken::new(), audio, sink), gegenstelle)
    })
    .await
    .unwrap();

    // Senderichtung laeuft unabhaengig weiter
    assert_eq!(ergebnis.unwrap().frames_sent, 2);
    assert_eq!(frames, 2);

    let fehler = alle_fehler(&mut fehler);
    assert_eq!(fehler.len(), 1);
    assert_eq!(fehler[0].pump, Pump::Receive);
    assert_eq!(fehler[0].kind, PumpFailureKind::Transport);
}

#[tokio::test]
async fn geschlossene_gegenstelle_ist_regulaeres_ende() {
    let (client, mut peer, mut fehler) = client_mit_reporter(MalformedFramePolicy::Abort);
    let audio = StreamReader::new(stream::iter(vec![Ok::<_, std::io::Error>(
        Bytes::from_static(b"niemand hoert zu"),
    )]));
    let (sink, _rx) = mpsc::unbounded_channel::<InboundFrame>();

    let gegenstelle = async {
        let mut anruf = peer.accept().await.unwrap();
        anruf.close_receive();
        anruf.finish();
        anruf
    };

    let (ergebnis, anruf) = tokio::time::timeout(FRIST, async {
        tokio::join!(client.call(CancellationToken::new(), audio, sink), gegenstelle)
    })
    .await
    .unwrap();

    let summary = ergebnis.unwrap();
    assert_eq!(summary.frames_sent, 0);
    assert_eq!(anruf.half_closes(), 1);
    assert!(alle_fehler(&mut fehler).is_empty());
}

#[tokio::test]
async fn geschlossene_senke_wird_gemeldet() {
    let (client, mut peer, mut fehler) = client_mit_reporter(MalformedFramePolicy::Abort);
    let (sink, rx) = mpsc::unbounded_channel::<InboundFrame>();
    drop(rx);

    let gegenstelle = async {
        let mut anruf = peer.accept().await.unwrap();
        anruf.send(gueltiger_frame(1)).await.unwrap();
        anruf.recv_bis_half_close().await.len()
    };

    let (ergebnis, frames) = tokio::time::timeout(FRIST, async {
        tokio::join!(
            client.call(CancellationToken::new(), tokio::io::empty(), sink),
            gegenstelle
        )
    })
    .await
    .unwrap();

    assert_eq!(ergebnis.unwrap().frames_received, 0);
    assert_eq!(frames, 0);

    let fehler = alle_fehler(&mut fehler);
    assert_eq!(fehler.len(), 1);
    assert_eq!(fehler[0].kind, PumpFailureKind::SinkClosed);
}
