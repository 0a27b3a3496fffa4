use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use headput_actuator::{ActuationCommand, RecordingActuator};
use headput_common::config::{EngineConfig, ListenerConfig};
use headput_face_model::{Direction, GestureRule, MeasurementSample};
use headput_gesture_engine::{GestureEngine, GestureHandle, StaticSettings};
use headput_ingest::codec::MAX_LINE_LEN;
use headput_ingest::{encode_sample, SampleListener};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

fn handle_with_recorder() -> (GestureHandle, RecordingActuator) {
    let recorder = RecordingActuator::new();
    let rule = GestureRule::key("Open", "MouthHeight", Direction::Positive, 0.5, 1.0, "A")
        .continuous(true);
    let engine = GestureEngine::new(
        EngineConfig::default(),
        Box::new(recorder.clone()),
        Box::new(StaticSettings::new(std::iter::once(rule).collect())),
    );
    (GestureHandle::new(engine), recorder)
}

fn mouth(height: f64) -> MeasurementSample {
    MeasurementSample {
        mouth_bottom_y: height,
        ..Default::default()
    }
}

async fn start_listener(
    handle: GestureHandle,
) -> (
    std::net::SocketAddr,
    Arc<AtomicBool>,
    tokio::task::JoinHandle<headput_common::error::HeadputResult<headput_ingest::ListenerStats>>,
) {
    let config = ListenerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        diagnostics_hz: 2,
    };
    let stop_flag = Arc::new(AtomicBool::new(false));
    let listener = SampleListener::bind(&config, handle, stop_flag.clone())
        .await
        .unwrap()
        .with_reconnect_delay(Duration::from_millis(10));
    let addr = listener.local_addr().unwrap();
    (addr, stop_flag, tokio::spawn(listener.run()))
}

#[tokio::test]
async fn listener_feeds_samples_into_engine() {
    let (handle, recorder) = handle_with_recorder();
    let (addr, stop_flag, task) = start_listener(handle.clone()).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(encode_sample(&mouth(0.0)).unwrap().as_bytes())
        .await
        .unwrap();
    client.write_all(b"IMAGE:4\n\x00\x01\x02\x03").await.unwrap();
    client.write_all(b"not a sample\n").await.unwrap();
    client
        .write_all(encode_sample(&mouth(1.0)).unwrap().as_bytes())
        .await
        .unwrap();
    client.write_all(b"{\"MouthBotY\": 2.0}\n").await.unwrap();
    client.shutdown().await.unwrap();
    drop(client);

    tokio::time::sleep(Duration::from_millis(300)).await;
    stop_flag.store(true, Ordering::Relaxed);
    let stats = task.await.unwrap().unwrap();

    assert_eq!(stats.clients, 1);
    assert_eq!(stats.samples, 3);
    assert_eq!(stats.images, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(recorder.count(&ActuationCommand::key_down("A", "Open")), 2);
    assert_eq!(handle.with_engine(|engine| engine.frames_processed()), 2);
}

#[tokio::test]
async fn listener_accepts_a_new_client_after_disconnect() {
    let (handle, _recorder) = handle_with_recorder();
    let (addr, stop_flag, task) = start_listener(handle.clone()).await;

    for _ in 0..2 {
        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(encode_sample(&mouth(0.0)).unwrap().as_bytes())
            .await
            .unwrap();
        client.shutdown().await.unwrap();
        drop(client);
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    stop_flag.store(true, Ordering::Relaxed);
    let stats = task.await.unwrap().unwrap();
    assert_eq!(stats.clients, 2);
    assert_eq!(stats.samples, 2);
}

#[tokio::test]
async fn listener_drops_client_sending_unterminated_line() {
    let (handle, _recorder) = handle_with_recorder();
    let (addr, stop_flag, task) = start_listener(handle).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let chunk = vec![b'x'; 16 * 1024];
    for _ in 0..(MAX_LINE_LEN / chunk.len() + 2) {
        if client.write_all(&chunk).await.is_err() {
            break;
        }
    }

    let mut buf = [0u8; 16];
    let closed = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("listener kept the oversized client open");
    assert!(matches!(closed, Ok(0) | Err(_)));

    stop_flag.store(true, Ordering::Relaxed);
    let stats = task.await.unwrap().unwrap();
    assert_eq!(stats.clients, 1);
    assert_eq!(stats.samples, 0);
}

#[tokio::test]
async fn listener_stops_without_clients() {
    let (handle, _recorder) = handle_with_recorder();
    let (_addr, stop_flag, task) = start_listener(handle).await;

    stop_flag.store(true, Ordering::Relaxed);
    let stats = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(stats.clients, 0);
}
