//! 状态上报报文

use domain::{PowerState, RainState, TelemetryUpdate};
use serde::Deserialize;

/// 气体读数告警阈值，与固件 `/status` 应答里的 `gasAlert` 判定一致。
pub const GAS_ALERT_THRESHOLD: i64 = 2000;

/// 气体读数是否越过告警阈值。
pub fn gas_alert(gas_level: i64) -> bool {
    gas_level > GAS_ALERT_THRESHOLD
}

/// 设备状态上报的线上形式（`device/status/<MAC>` 的 JSON 载荷）。
///
/// 所有字段可缺省：固件按需上报，缺省字段不得清空已缓存的值。
/// 未知字段直接忽略，固件先行升级不影响旧桥接。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusReport {
    /// 温度（摄氏度）。
    pub temp: Option<f64>,
    /// 相对湿度（百分比）。
    pub hum: Option<f64>,
    /// 气体传感器原始读数。
    pub gas: Option<i64>,
    /// 雨滴传感器原始电平：0 表示检测到雨滴（低电平有效）。
    pub rain: Option<i64>,
    /// 光照传感器读数。
    pub light: Option<i64>,
    #[serde(rename = "autoLight")]
    pub auto_light: Option<bool>,
    #[serde(rename = "autoMode")]
    pub auto_mode: Option<bool>,
    /// 屏幕页号，旧固件字段名为 `screenMode`。
    #[serde(alias = "screenMode")]
    pub screen: Option<i64>,
    /// 四路继电器状态，`"on"` / `"off"`。
    pub led1: Option<String>,
    pub led2: Option<String>,
    pub led3: Option<String>,
    pub led4: Option<String>,
    /// 门状态文本：`open`/`opening` 视为开，`closed`/`closing` 视为关。
    pub door: Option<String>,
}

impl StatusReport {
    /// 线上形式 → 领域更新。`reported_at_ms` 由接入侧在收到时打点。
    pub fn into_update(self, reported_at_ms: i64) -> TelemetryUpdate {
        let mut channel_states = Vec::new();
        let leds = [(1, &self.led1), (2, &self.led2), (3, &self.led3), (4, &self.led4)];
        for (index, led) in leds {
            if let Some(text) = led {
                channel_states.push((index, PowerState::from_wire(text)));
            }
        }

        TelemetryUpdate {
            temperature_c: self.temp,
            humidity_pct: self.hum,
            gas_level: self.gas,
            rain: self.rain.map(|raw| {
                if raw == 0 {
                    RainState::Detected
                } else {
                    RainState::Dry
                }
            }),
            light_level: self.light,
            auto_light: self.auto_light,
            auto_mode: self.auto_mode,
            screen_mode: self.screen,
            door: self.door.as_deref().and_then(door_state),
            channel_states,
            reported_at_ms,
        }
    }
}

fn door_state(text: &str) -> Option<PowerState> {
    let text = text.trim().to_ascii_lowercase();
    if text.starts_with("open") {
        Some(PowerState::On)
    } else if text.starts_with("clos") {
        Some(PowerState::Off)
    } else {
        None
    }
}
