//! End-to-end protocol tests without HTTP
//!
//! Tests the full pipeline in-process: device seal -> server ingest -> ledger

use std::sync::Arc;

use qiot_core::{encapsulate, mask, KemAlgorithm, MetricsState, ServerConfig};
use qiot_device::DeviceClient;
use qiot_server::{ingest, ServerState};

fn sealed_hex(state: &ServerState, plaintext: &[u8]) -> (String, String) {
    let kp = state.keypair();
    let (ct, masked) = encapsulate(kp.algorithm(), kp.public_key()).unwrap().seal(plaintext);
    (hex::encode(ct), hex::encode(masked))
}

/// Every parameter set completes the device -> server pipeline
#[test]
fn test_pipeline_all_parameter_sets() {
    for algorithm in [KemAlgorithm::MlKem512, KemAlgorithm::MlKem768, KemAlgorithm::MlKem1024] {
        let state = ServerState::new(ServerConfig::default().with_algorithm(algorithm)).unwrap();
        let (ct, masked) = sealed_hex(&state, b"Patient Heartbeat: 72 BPM");

        let out = ingest(&state, "sensor1", &ct, &masked).unwrap();
        assert_eq!(out.decoded_text, "Patient Heartbeat: 72 BPM", "{algorithm}");
    }
}

/// Device client output is accepted by the server ingest path
#[test]
fn test_device_seal_feeds_ingest() {
    let state = ServerState::new(ServerConfig::default()).unwrap();
    let device = DeviceClient::new("http://unused", "sensor2");

    let req = device.seal(state.keypair().public_key(), b"Body Temperature: 36.8 C").unwrap();
    let out = ingest(&state, req.device_type_or_default(), &req.ciphertext, &req.encrypted_message).unwrap();

    assert_eq!(out.decoded_text, "Body Temperature: 36.8 C");
    assert_eq!(state.latest().unwrap().device_id, "sensor2");
}

/// Two servers fed the same number of messages report identical metrics
#[test]
fn test_metrics_trace_reproducible() {
    let trace = |n: usize| {
        let state = ServerState::new(ServerConfig::default()).unwrap();
        (0..n)
            .map(|i| {
                let (ct, masked) = sealed_hex(&state, format!("reading {i}").as_bytes());
                ingest(&state, "sensor1", &ct, &masked).unwrap();
                state.metrics()
            })
            .collect::<Vec<_>>()
    };

    let a = trace(20);
    let b = trace(20);
    assert_eq!(a, b);
    assert_eq!(a[6], MetricsState::at(7, 5));
}

/// Failed messages leave the ledger untouched
#[test]
fn test_failures_do_not_advance_ledger() {
    let state = ServerState::new(ServerConfig::default()).unwrap();
    let (ct, masked) = sealed_hex(&state, b"ok");
    ingest(&state, "sensor1", &ct, &masked).unwrap();
    let before = state.snapshot();

    assert!(ingest(&state, "sensor1", "xyz", &masked).is_err());
    assert!(ingest(&state, "sensor1", &ct, "0").is_err());
    assert!(ingest(&state, "sensor1", "00", &masked).is_err());

    assert_eq!(*state.snapshot(), *before);
}

/// Unmasking with the wrong secret never restores the plaintext
#[test]
fn test_mask_needs_matching_secret() {
    let state = ServerState::new(ServerConfig::default()).unwrap();
    let kp = state.keypair();

    let (ct_a, secret_a) = encapsulate(kp.algorithm(), kp.public_key()).unwrap().into_parts();
    let (_, secret_b) = encapsulate(kp.algorithm(), kp.public_key()).unwrap().into_parts();

    let masked = mask(b"HELLO", secret_a.as_bytes()).unwrap();
    assert_ne!(mask(&masked, secret_b.as_bytes()).unwrap(), b"HELLO");
    assert_eq!(kp.decapsulate(&ct_a).unwrap().unmask(&masked), b"HELLO");
}

/// Concurrent ingestions from many tasks count exactly once each
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingest_tasks() {
    let state = Arc::new(ServerState::new(ServerConfig::default()).unwrap());
    let n = 64u64;

    let mut handles = vec![];
    for i in 0..n {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            let (ct, masked) = sealed_hex(&state, format!("reading {i}").as_bytes());
            ingest(&state, "sensor1", &ct, &masked).map(|out| out.sequence_number)
        }));
    }

    let mut sequences: Vec<u64> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|h| h.unwrap().unwrap())
        .collect();
    sequences.sort_unstable();

    assert_eq!(sequences, (1..=n).collect::<Vec<_>>(), "no duplicate or skipped counts");
    assert_eq!(state.metrics().message_count, n);
}
