use casa_storage::{DeviceStore, InMemoryDeviceStore};
use domain::{
    Channel, DEFAULT_ROOM, DeviceKind, DeviceRecord, Mac, PowerState, RainState, TelemetryState,
    TelemetryUpdate, now_epoch_ms,
};

const MAC: &str = "AA:BB:CC:DD:EE:FF";

fn sample_device(device_id: &str) -> DeviceRecord {
    let now = now_epoch_ms();
    DeviceRecord {
        device_id: device_id.to_string(),
        mac: Some(Mac::parse(MAC).expect("mac")),
        ip: None,
        name: format!("Device {device_id}"),
        kind: DeviceKind::Sensor,
        room: DEFAULT_ROOM.to_string(),
        owner_id: None,
        status: PowerState::Off,
        channels: Vec::new(),
        telemetry: TelemetryState::default(),
        firmware_version: None,
        settings_password: None,
        created_at_ms: now,
        updated_at_ms: now,
    }
}

#[tokio::test]
async fn merge_report_applies_reported_fields_and_channels() {
    let store = InMemoryDeviceStore::new();
    store.insert(sample_device("dev-1")).await.expect("insert");

    let mac = Mac::parse(MAC).expect("mac");
    let merged = store
        .merge_report(
            &mac,
            TelemetryUpdate {
                temperature_c: Some(27.0),
                humidity_pct: Some(60.0),
                rain: Some(RainState::Detected),
                channel_states: vec![(1, PowerState::On)],
                reported_at_ms: 1_700_000_000_000,
                ..Default::default()
            },
        )
        .await
        .expect("merge")
        .expect("device");

    assert_eq!(merged.telemetry.temperature_c, Some(27.0));
    assert_eq!(merged.telemetry.humidity_pct, Some(60.0));
    assert_eq!(merged.telemetry.rain, Some(RainState::Detected));
    assert_eq!(merged.telemetry.last_update_ms, Some(1_700_000_000_000));
    assert_eq!(merged.channels.len(), 1);
    assert_eq!(merged.channels[0].index, 1);
    assert_eq!(merged.channels[0].name, "Channel 1");
    assert_eq!(merged.channels[0].room, "Living Room");
    assert!(merged.channels[0].state.is_on());
}

#[tokio::test]
async fn merge_report_keeps_fields_missing_from_report() {
    let store = InMemoryDeviceStore::new();
    store.insert(sample_device("dev-1")).await.expect("insert");

    let mac = Mac::parse(MAC).expect("mac");
    store
        .merge_report(
            &mac,
            TelemetryUpdate {
                temperature_c: Some(27.0),
                humidity_pct: Some(60.0),
                reported_at_ms: 1_000,
                ..Default::default()
            },
        )
        .await
        .expect("merge");

    let merged = store
        .merge_report(
            &mac,
            TelemetryUpdate {
                gas_level: Some(2500),
                reported_at_ms: 2_000,
                ..Default::default()
            },
        )
        .await
        .expect("merge")
        .expect("device");

    assert_eq!(merged.telemetry.temperature_c, Some(27.0));
    assert_eq!(merged.telemetry.humidity_pct, Some(60.0));
    assert_eq!(merged.telemetry.gas_level, Some(2500));
    assert_eq!(merged.telemetry.last_update_ms, Some(2_000));
}

#[tokio::test]
async fn merge_report_door_state_updates_status() {
    let store = InMemoryDeviceStore::new();
    store.insert(sample_device("dev-1")).await.expect("insert");

    let mac = Mac::parse(MAC).expect("mac");
    let merged = store
        .merge_report(
            &mac,
            TelemetryUpdate {
                door: Some(PowerState::On),
                reported_at_ms: 1_000,
                ..Default::default()
            },
        )
        .await
        .expect("merge")
        .expect("device");
    assert!(merged.status.is_on());
}

#[tokio::test]
async fn merge_report_unknown_mac_creates_nothing() {
    let store = InMemoryDeviceStore::new();

    let mac = Mac::parse("11:22:33:44:55:66").expect("mac");
    let missing = store
        .merge_report(
            &mac,
            TelemetryUpdate {
                temperature_c: Some(21.0),
                reported_at_ms: 1_000,
                ..Default::default()
            },
        )
        .await
        .expect("merge");
    assert!(missing.is_none());
    assert!(store.list_unclaimed().await.expect("list").is_empty());
}

#[tokio::test]
async fn merge_report_updates_existing_channel_in_place() {
    let store = InMemoryDeviceStore::new();
    let mut device = sample_device("dev-1");
    device.channels.push(Channel {
        index: 1,
        name: "Porch Light".to_string(),
        room: "Porch".to_string(),
        state: PowerState::Off,
    });
    store.insert(device).await.expect("insert");

    let mac = Mac::parse(MAC).expect("mac");
    let merged = store
        .merge_report(
            &mac,
            TelemetryUpdate {
                channel_states: vec![(1, PowerState::On)],
                reported_at_ms: 1_000,
                ..Default::default()
            },
        )
        .await
        .expect("merge")
        .expect("device");

    assert_eq!(merged.channels.len(), 1);
    assert_eq!(merged.channels[0].name, "Porch Light");
    assert_eq!(merged.channels[0].room, "Porch");
    assert!(merged.channels[0].state.is_on());
}

#[tokio::test]
async fn set_channel_state_creates_missing_channel() {
    let store = InMemoryDeviceStore::new();
    store.insert(sample_device("dev-1")).await.expect("insert");

    store
        .set_channel_state("dev-1", 3, PowerState::On)
        .await
        .expect("write");

    let record = store.find_by_id("dev-1").await.expect("query").expect("device");
    assert_eq!(record.channels.len(), 1);
    assert_eq!(record.channels[0].index, 3);
    assert_eq!(record.channels[0].name, "Channel 3");
    assert!(record.channels[0].state.is_on());
}

#[tokio::test]
async fn set_latch_status_skips_missing_device() {
    let store = InMemoryDeviceStore::new();
    store
        .set_latch_status("dev-404", PowerState::On)
        .await
        .expect("write");
    store
        .set_channel_state("dev-404", 1, PowerState::On)
        .await
        .expect("write");
}
