use domain::{
    DeviceKind, DeviceRecord, Mac, PowerState, RainState, TelemetryState, TelemetryUpdate,
};

fn sample_record() -> DeviceRecord {
    DeviceRecord {
        device_id: "dev-1".to_string(),
        mac: Some(Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac parses")),
        ip: Some("192.168.1.50".to_string()),
        name: "Hallway".to_string(),
        kind: DeviceKind::Hub,
        room: "Hallway".to_string(),
        owner_id: None,
        status: PowerState::Off,
        channels: Vec::new(),
        telemetry: TelemetryState::default(),
        firmware_version: None,
        settings_password: None,
        created_at_ms: 0,
        updated_at_ms: 0,
    }
}

#[test]
fn kind_parse_is_case_insensitive_and_defaults_to_other() {
    assert_eq!(DeviceKind::parse("Light"), DeviceKind::Light);
    assert_eq!(DeviceKind::parse("SERVO"), DeviceKind::Servo);
    assert_eq!(DeviceKind::parse("fridge"), DeviceKind::Other);
    assert_eq!(DeviceKind::parse(""), DeviceKind::Other);
}

#[test]
fn power_state_wire_round_trip() {
    assert_eq!(PowerState::from_wire("on"), PowerState::On);
    assert_eq!(PowerState::from_wire("ON "), PowerState::On);
    assert_eq!(PowerState::from_wire("off"), PowerState::Off);
    assert_eq!(PowerState::from_wire("anything"), PowerState::Off);
    assert_eq!(PowerState::On.as_str(), "on");
}

#[test]
fn telemetry_apply_merges_only_present_fields() {
    let mut state = TelemetryState::default();
    state.apply(&TelemetryUpdate {
        temperature_c: Some(21.5),
        gas_level: Some(480),
        reported_at_ms: 1_000,
        ..TelemetryUpdate::default()
    });

    // 第二次上报只带湿度：温度与气体读数必须保留。
    state.apply(&TelemetryUpdate {
        humidity_pct: Some(40.0),
        rain: Some(RainState::Dry),
        reported_at_ms: 2_000,
        ..TelemetryUpdate::default()
    });

    assert_eq!(state.temperature_c, Some(21.5));
    assert_eq!(state.gas_level, Some(480));
    assert_eq!(state.humidity_pct, Some(40.0));
    assert_eq!(state.rain, Some(RainState::Dry));
    assert_eq!(state.last_update_ms, Some(2_000));
}

#[test]
fn ownership_helpers() {
    let mut record = sample_record();
    assert!(!record.is_claimed());
    assert!(!record.owned_by("user-1"));

    record.owner_id = Some("user-1".to_string());
    assert!(record.is_claimed());
    assert!(record.owned_by("user-1"));
    assert!(!record.owned_by("user-2"));
}
