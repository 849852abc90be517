use casa_config::AppConfig;

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("CASA_JWT_SECRET", "secret");
        std::env::set_var("CASA_HTTP_ADDR", "127.0.0.1:5001");
        std::env::set_var("CASA_DEVICE_HTTP_TIMEOUT_MS", "1500");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.http_addr, "127.0.0.1:5001");
    assert_eq!(config.device_http_timeout_ms, 1500);
    // 未设置的项落到默认值
    assert_eq!(config.scan_probe_timeout_ms, 300);
    assert_eq!(config.mqtt_port, 1883);
    assert_eq!(config.mqtt_command_qos, 1);
    assert!(config.ingest_enabled);
    assert!(config.database_url.is_none());
    assert_eq!(config.jwt_access_ttl_seconds, 3600);
}
