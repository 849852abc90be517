//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 未配置时使用内存注册表（单机演示/测试）。
    pub database_url: Option<String>,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_command_qos: u8,
    pub ingest_enabled: bool,
    /// 直连下发 POST /control 的超时（毫秒）。
    pub device_http_timeout_ms: u64,
    /// 子网扫描单地址探测超时（毫秒）。
    pub scan_probe_timeout_ms: u64,
    /// mDNS 名称探测超时（毫秒）。
    pub scan_mdns_timeout_ms: u64,
    /// 手动单地址探测超时（毫秒）。
    pub scan_manual_timeout_ms: u64,
    pub jwt_secret: String,
    pub jwt_access_ttl_seconds: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("CASA_JWT_SECRET")
            .map_err(|_| ConfigError::Missing("CASA_JWT_SECRET".to_string()))?;
        let jwt_access_ttl_seconds = read_u64_with_default("CASA_JWT_ACCESS_TTL_SECONDS", 3600)?;
        let http_addr =
            env::var("CASA_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:5000".to_string());
        let database_url = read_optional("CASA_DATABASE_URL");
        let mqtt_host = env::var("CASA_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("CASA_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("CASA_MQTT_USERNAME");
        let mqtt_password = read_optional("CASA_MQTT_PASSWORD");
        let mqtt_command_qos = read_u8_with_default("CASA_MQTT_COMMAND_QOS", 1)?;
        let ingest_enabled = read_bool_with_default("CASA_INGEST", true);
        let device_http_timeout_ms = read_u64_with_default("CASA_DEVICE_HTTP_TIMEOUT_MS", 2000)?;
        let scan_probe_timeout_ms = read_u64_with_default("CASA_SCAN_PROBE_TIMEOUT_MS", 300)?;
        let scan_mdns_timeout_ms = read_u64_with_default("CASA_SCAN_MDNS_TIMEOUT_MS", 1000)?;
        let scan_manual_timeout_ms = read_u64_with_default("CASA_SCAN_MANUAL_TIMEOUT_MS", 2000)?;

        Ok(Self {
            http_addr,
            database_url,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_command_qos,
            ingest_enabled,
            device_http_timeout_ms,
            scan_probe_timeout_ms,
            scan_mdns_timeout_ms,
            scan_manual_timeout_ms,
            jwt_secret,
            jwt_access_ttl_seconds,
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
