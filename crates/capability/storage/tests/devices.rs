use casa_storage::{DeviceStore, DeviceUpdate, InMemoryDeviceStore, RegistrationUpdate};
use domain::{
    Channel, DEFAULT_ROOM, DeviceKind, DeviceRecord, Mac, PowerState, TelemetryState,
    now_epoch_ms,
};

fn sample_device(device_id: &str, mac: Option<&str>, ip: Option<&str>) -> DeviceRecord {
    let now = now_epoch_ms();
    DeviceRecord {
        device_id: device_id.to_string(),
        mac: mac.map(|value| Mac::parse(value).expect("mac")),
        ip: ip.map(str::to_string),
        name: format!("Device {device_id}"),
        kind: DeviceKind::Other,
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
async fn insert_and_find_by_id() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", None, None))
        .await
        .expect("insert");

    let found = store.find_by_id("dev-1").await.expect("query").expect("device");
    assert_eq!(found.device_id, "dev-1");
    assert_eq!(found.room, "Living Room");
    assert!(store.find_by_id("dev-2").await.expect("query").is_none());
}

#[tokio::test]
async fn find_by_mac_matches_any_written_form() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", Some("aa:bb:cc:dd:ee:ff"), None))
        .await
        .expect("insert");

    for written in ["AA:BB:CC:DD:EE:FF", "aa-bb-cc-dd-ee-ff", "aabbccddeeff"] {
        let mac = Mac::parse(written).expect("mac");
        let found = store.find_by_mac(&mac).await.expect("query").expect("device");
        assert_eq!(found.device_id, "dev-1");
    }
}

#[tokio::test]
async fn insert_rejects_duplicate_mac() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", Some("AA:BB:CC:DD:EE:FF"), None))
        .await
        .expect("insert");

    let err = store
        .insert(sample_device("dev-2", Some("aabbccddeeff"), None))
        .await
        .expect_err("duplicate mac");
    assert!(err.to_string().contains("mac"));
}

#[tokio::test]
async fn update_touches_only_present_fields() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", None, Some("192.168.1.30")))
        .await
        .expect("insert");

    let updated = store
        .update(
            "dev-1",
            DeviceUpdate {
                name: Some("Hall Fan".to_string()),
                kind: Some(DeviceKind::Fan),
                room: Some("Hall".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update")
        .expect("device");
    assert_eq!(updated.name, "Hall Fan");
    assert_eq!(updated.kind, DeviceKind::Fan);
    assert_eq!(updated.room, "Hall");
    assert_eq!(updated.ip.as_deref(), Some("192.168.1.30"));
}

#[tokio::test]
async fn update_replaces_channel_topology() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", None, None))
        .await
        .expect("insert");

    let channels = vec![
        Channel {
            index: 2,
            name: "Desk Lamp".to_string(),
            room: "Office".to_string(),
            state: PowerState::On,
        },
        Channel {
            index: 1,
            name: "Ceiling".to_string(),
            room: "Office".to_string(),
            state: PowerState::Off,
        },
    ];
    let updated = store
        .update(
            "dev-1",
            DeviceUpdate {
                channels: Some(channels),
                ..Default::default()
            },
        )
        .await
        .expect("update")
        .expect("device");
    assert_eq!(updated.channels.len(), 2);
    assert_eq!(updated.channels[0].index, 1);
    assert_eq!(updated.channels[1].name, "Desk Lamp");
}

#[tokio::test]
async fn delete_frees_mac_for_reuse() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", Some("AA:BB:CC:DD:EE:FF"), None))
        .await
        .expect("insert");

    assert!(store.delete("dev-1").await.expect("delete"));
    assert!(!store.delete("dev-1").await.expect("delete again"));

    store
        .insert(sample_device("dev-2", Some("AA:BB:CC:DD:EE:FF"), None))
        .await
        .expect("reinsert");
    let mac = Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac");
    let found = store.find_by_mac(&mac).await.expect("query").expect("device");
    assert_eq!(found.device_id, "dev-2");
}

#[tokio::test]
async fn register_heartbeat_always_writes_ip() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", Some("AA:BB:CC:DD:EE:FF"), Some("192.168.1.30")))
        .await
        .expect("insert");

    let mac = Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac");
    let refreshed = store
        .register_heartbeat(
            &mac,
            RegistrationUpdate {
                ip: "192.168.1.77".to_string(),
                name: None,
                firmware_version: Some("1.2.0".to_string()),
            },
        )
        .await
        .expect("heartbeat")
        .expect("device");
    assert_eq!(refreshed.ip.as_deref(), Some("192.168.1.77"));
    assert_eq!(refreshed.name, "Device dev-1");
    assert_eq!(refreshed.firmware_version.as_deref(), Some("1.2.0"));
}

#[tokio::test]
async fn register_heartbeat_unknown_mac_returns_none() {
    let store = InMemoryDeviceStore::new();
    let mac = Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac");
    let missing = store
        .register_heartbeat(
            &mac,
            RegistrationUpdate {
                ip: "192.168.1.77".to_string(),
                name: None,
                firmware_version: None,
            },
        )
        .await
        .expect("heartbeat");
    assert!(missing.is_none());
}

#[tokio::test]
async fn attach_mac_links_ip_only_record() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", None, Some("192.168.1.30")))
        .await
        .expect("insert");

    let mac = Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac");
    let linked = store
        .attach_mac(
            "192.168.1.30",
            &mac,
            RegistrationUpdate {
                ip: "192.168.1.30".to_string(),
                name: None,
                firmware_version: None,
            },
        )
        .await
        .expect("attach")
        .expect("device");
    assert_eq!(linked.device_id, "dev-1");
    assert_eq!(linked.mac.as_ref().map(|m| m.as_str()), Some("AA:BB:CC:DD:EE:FF"));

    let found = store.find_by_mac(&mac).await.expect("query").expect("device");
    assert_eq!(found.device_id, "dev-1");
}

#[tokio::test]
async fn attach_mac_without_candidate_returns_none() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", Some("11:22:33:44:55:66"), Some("192.168.1.30")))
        .await
        .expect("insert");

    let mac = Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac");
    let missing = store
        .attach_mac(
            "192.168.1.30",
            &mac,
            RegistrationUpdate {
                ip: "192.168.1.30".to_string(),
                name: None,
                firmware_version: None,
            },
        )
        .await
        .expect("attach");
    assert!(missing.is_none(), "record with mac must not be re-linked");
}

#[tokio::test]
async fn list_unclaimed_excludes_owned() {
    let store = InMemoryDeviceStore::new();
    store
        .insert(sample_device("dev-1", None, None))
        .await
        .expect("insert");
    let mut owned = sample_device("dev-2", None, None);
    owned.owner_id = Some("user-1".to_string());
    store.insert(owned).await.expect("insert");

    let unclaimed = store.list_unclaimed().await.expect("list");
    assert_eq!(unclaimed.len(), 1);
    assert_eq!(unclaimed[0].device_id, "dev-1");

    let mine = store.list_owned_by("user-1").await.expect("list");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].device_id, "dev-2");
}
