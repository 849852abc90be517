//! 设备发现与 HTTP 直连约定

use domain::Mac;
use serde::Deserialize;

/// 探测应答中标识本设备族的 `id` 取值。
pub const PROBE_IDENTITY: &str = "esp32-smart-home";

/// 设备的 mDNS 主机名，子网扫描前先按名字探测一次。
pub const MDNS_HOST: &str = "esp32-smart-home.local";

/// 设备侧 HTTP 路径。
pub const SCAN_PATH: &str = "/scan";
pub const CONTROL_PATH: &str = "/control";
pub const STATUS_PATH: &str = "/status";

/// 探测应答：设备对 `GET /scan` 的自述。
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeReply {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
}

impl ProbeReply {
    /// 应答是否来自本设备族；其它在 80 端口答话的主机一律忽略。
    pub fn is_smart_home_device(&self) -> bool {
        self.id == PROBE_IDENTITY
    }
}

pub fn scan_url(host: &str) -> String {
    format!("http://{host}{SCAN_PATH}")
}

pub fn control_url(host: &str) -> String {
    format!("http://{host}{CONTROL_PATH}")
}

pub fn status_url(host: &str) -> String {
    format!("http://{host}{STATUS_PATH}")
}

/// 默认设备名：`ESP32-` + MAC 规范形式末 8 字符，与固件自报名一致。
pub fn default_device_name(mac: &Mac) -> String {
    format!("ESP32-{}", mac.name_tail())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_reply_parses_firmware_shape() {
        let payload = r#"{"id":"esp32-smart-home","name":"Smart Home Hub","type":"Hub","ip":"192.168.1.50"}"#;
        let reply: ProbeReply = serde_json::from_str(payload).expect("reply parses");

        assert!(reply.is_smart_home_device());
        assert_eq!(reply.name.as_deref(), Some("Smart Home Hub"));
        assert_eq!(reply.kind.as_deref(), Some("Hub"));
        assert_eq!(reply.ip.as_deref(), Some("192.168.1.50"));
    }

    #[test]
    fn foreign_replies_are_rejected() {
        let reply: ProbeReply =
            serde_json::from_str(r#"{"id":"some-printer"}"#).expect("reply parses");

        assert!(!reply.is_smart_home_device());
    }

    #[test]
    fn urls_and_default_name() {
        let mac = Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac parses");

        assert_eq!(scan_url("192.168.1.7"), "http://192.168.1.7/scan");
        assert_eq!(control_url("192.168.1.7"), "http://192.168.1.7/control");
        assert_eq!(status_url(MDNS_HOST), "http://esp32-smart-home.local/status");
        assert_eq!(default_device_name(&mac), "ESP32-DD:EE:FF");
    }
}
