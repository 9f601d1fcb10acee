//! Full decode → register → publish flow over a realistic frame and
//! pressure sample, against a recording sink.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use heatlink_core::{Pipeline, PublishError, PublishSink, Qos, RegistryConfig};
use heatlink_decoder::{analog, frame};

#[derive(Debug, Clone)]
struct Recorded {
    topic: String,
    payload: Vec<u8>,
    retain: bool,
}

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<Recorded>>,
}

#[async_trait]
impl PublishSink for RecordingSink {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        _qos: Qos,
        retain: bool,
    ) -> Result<(), PublishError> {
        self.messages.lock().await.push(Recorded {
            topic: topic.to_string(),
            payload,
            retain,
        });
        Ok(())
    }
}

/// A frame as the controller writes it during full firing: status 14,
/// feed screw forward, ignition fan and circuit-1 pump on, return pump on,
/// fire damper open with the grate contact bit set.
const FRAME: &str = "pm 32.1 71.2 7.5 68.0 141.0 4.6 3.9 41.6 38.9 42.0 40.0 48.2 58.6 26.2 70.0 \
                     0 0 0 0 0 0 0 0 0 0 0 0 0 14 0.8 0.3 0.0 1 22 8 180 0 0 0 0";

#[tokio::test]
async fn test_full_cycle_publishes_discovery_then_state() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::new(RegistryConfig::default(), sink.clone());

    let mut values = frame::decode(FRAME).unwrap();
    values.extend(analog::decode(2.1).unwrap());
    assert_eq!(values.len(), 45);

    pipeline
        .run_cycle("HSV30", "Lambdatronic", &values)
        .await
        .unwrap();

    let messages = sink.messages.lock().await.clone();
    // One retained config document per measurement, then the state document.
    assert_eq!(messages.len(), 46);
    assert!(messages[..45].iter().all(|m| m.topic.ends_with("/config")));
    assert!(messages[..45].iter().all(|m| m.retain));

    let state = messages.last().unwrap();
    assert_eq!(state.topic, "hargassner/hsv30/lambdatronic/data");
    assert!(!state.retain);

    let document: serde_json::Value = serde_json::from_slice(&state.payload).unwrap();
    assert_eq!(document["temperatur_kessel"], "68");
    assert_eq!(document["status"], "14");
    assert_eq!(document["statusnachricht"], "Leistungsbrand");
    assert_eq!(document["einschubschnecke_vorwaerts"], "True");
    assert_eq!(document["zuendung_geblaese"], "True");
    assert_eq!(document["pumpe_heizkreis_1"], "True");
    assert_eq!(document["stoerung"], "False");
    assert_eq!(document["pumpe_ruecklauf"], "True");
    assert_eq!(document["brandschutzklappe"], "True");
    // Grate contact bit is set, so the active-low flag reads closed.
    assert_eq!(document["rost"], "False");
    assert_eq!(document["heizungsdruck"], "2");
    assert_eq!(document["heizungsdruck_stoerung"], "False");
    assert_eq!(document["heizungsdruck_statusnachricht"], "Ok");
}

#[tokio::test]
async fn test_repeat_cycles_only_publish_state() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::new(RegistryConfig::default(), sink.clone());

    let mut values = frame::decode(FRAME).unwrap();
    values.extend(analog::decode(2.1).unwrap());

    for _ in 0..3 {
        pipeline
            .run_cycle("HSV30", "Lambdatronic", &values)
            .await
            .unwrap();
    }

    let messages = sink.messages.lock().await.clone();
    let configs = messages.iter().filter(|m| m.topic.ends_with("/config"));
    let states = messages.iter().filter(|m| m.topic.ends_with("/data"));
    assert_eq!(configs.count(), 45);
    assert_eq!(states.count(), 3);
}

#[tokio::test]
async fn test_discovery_document_for_binary_flag() {
    let sink = Arc::new(RecordingSink::default());
    let mut pipeline = Pipeline::new(RegistryConfig::default(), sink.clone());

    let values = frame::decode(FRAME).unwrap();
    pipeline
        .run_cycle("HSV30", "Lambdatronic", &values)
        .await
        .unwrap();

    let messages = sink.messages.lock().await.clone();
    let stoerung = messages
        .iter()
        .find(|m| m.topic == "homeassistant/binary_sensor/hsv30/lambdatronic_stoerung/config")
        .expect("fault flag announced");

    let document: serde_json::Value = serde_json::from_slice(&stoerung.payload).unwrap();
    assert_eq!(document["name"], "Störung");
    assert_eq!(document["platform"], "binary_sensor");
    assert_eq!(document["device_class"], "problem");
    assert_eq!(document["state_topic"], "hargassner/hsv30/lambdatronic/data");
    assert_eq!(document["value_template"], "{{ value_json.stoerung }}");
    assert_eq!(document["payload_on"], "True");
    assert_eq!(document["payload_off"], "False");
    assert_eq!(
        document["unique_id"],
        "hargassner.hsv30_lambdatronic_stoerung"
    );
}
