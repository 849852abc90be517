use crate::mac::Mac;

/// 未指定房间时的默认值。
pub const DEFAULT_ROOM: &str = "Living Room";

/// 设备类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Light,
    Fan,
    Sensor,
    Switch,
    Servo,
    Buzzer,
    Hub,
    Other,
}

impl DeviceKind {
    /// 线上/存储用小写标识。
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Fan => "fan",
            Self::Sensor => "sensor",
            Self::Switch => "switch",
            Self::Servo => "servo",
            Self::Buzzer => "buzzer",
            Self::Hub => "hub",
            Self::Other => "other",
        }
    }

    /// 宽松解析：未知类别归入 `Other`。
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Self::Light,
            "fan" => Self::Fan,
            "sensor" => Self::Sensor,
            "switch" => Self::Switch,
            "servo" => Self::Servo,
            "buzzer" => Self::Buzzer,
            "hub" => Self::Hub,
            _ => Self::Other,
        }
    }
}

impl Default for DeviceKind {
    fn default() -> Self {
        Self::Other
    }
}

/// 开关状态。设备侧一律以 `"on"` / `"off"` 文本表示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    On,
    #[default]
    Off,
}

impl PowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// 设备上报文本 → 状态；`"on"` 以外的取值一律视为关。
    pub fn from_wire(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("on") {
            Self::On
        } else {
            Self::Off
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

/// 雨滴传感器状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RainState {
    Detected,
    Dry,
}

impl RainState {
    /// 展示文本，与设备 `/status` 应答一致（`"detected"` / `"none"`）。
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detected => "detected",
            Self::Dry => "none",
        }
    }

    /// 展示文本的逆映射，用于存储列的读取。
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "detected" => Some(Self::Detected),
            "none" => Some(Self::Dry),
            _ => None,
        }
    }
}

/// 多路设备的通道（如四路继电器的一路）。
#[derive(Debug, Clone)]
pub struct Channel {
    pub index: i32,
    pub name: String,
    pub room: String,
    pub state: PowerState,
}

/// 设备遥测缓存：仅保留最近一次上报覆盖到的字段。
///
/// 字段为 `None` 表示该设备从未上报过此项，而不是测量值为零。
#[derive(Debug, Clone, Default)]
pub struct TelemetryState {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub gas_level: Option<i64>,
    pub rain: Option<RainState>,
    pub light_level: Option<i64>,
    pub auto_light: Option<bool>,
    pub auto_mode: Option<bool>,
    pub screen_mode: Option<i64>,
    pub last_update_ms: Option<i64>,
}

impl TelemetryState {
    /// 合并一次上报：仅覆盖上报中出现的字段，其余保持原值。
    pub fn apply(&mut self, update: &TelemetryUpdate) {
        if let Some(v) = update.temperature_c {
            self.temperature_c = Some(v);
        }
        if let Some(v) = update.humidity_pct {
            self.humidity_pct = Some(v);
        }
        if let Some(v) = update.gas_level {
            self.gas_level = Some(v);
        }
        if let Some(v) = update.rain {
            self.rain = Some(v);
        }
        if let Some(v) = update.light_level {
            self.light_level = Some(v);
        }
        if let Some(v) = update.auto_light {
            self.auto_light = Some(v);
        }
        if let Some(v) = update.auto_mode {
            self.auto_mode = Some(v);
        }
        if let Some(v) = update.screen_mode {
            self.screen_mode = Some(v);
        }
        self.last_update_ms = Some(update.reported_at_ms);
    }
}

/// 单次状态上报的解析结果。
///
/// `None` 字段表示该次上报未携带此项；通道状态与门锁状态不进入
/// [`TelemetryState`]，由存储层分别写入通道列表与记录粗粒度状态。
#[derive(Debug, Clone, Default)]
pub struct TelemetryUpdate {
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub gas_level: Option<i64>,
    pub rain: Option<RainState>,
    pub light_level: Option<i64>,
    pub auto_light: Option<bool>,
    pub auto_mode: Option<bool>,
    pub screen_mode: Option<i64>,
    pub door: Option<PowerState>,
    pub channel_states: Vec<(i32, PowerState)>,
    pub reported_at_ms: i64,
}

/// 注册表中的设备记录。
///
/// `mac` 与 `ip` 均可缺失：仅有 IP 的设备走 HTTP 直连，仅有 MAC 的设备
/// 走 MQTT；两者都没有的设备无法下发指令。`owner_id` 为 `None` 表示
/// 未认领，等待用户 claim。
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    pub device_id: String,
    pub mac: Option<Mac>,
    pub ip: Option<String>,
    pub name: String,
    pub kind: DeviceKind,
    pub room: String,
    pub owner_id: Option<String>,
    /// 粗粒度开关/门锁状态（door、servo 类设备的乐观缓存）。
    pub status: PowerState,
    pub channels: Vec<Channel>,
    pub telemetry: TelemetryState,
    pub firmware_version: Option<String>,
    pub settings_password: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl DeviceRecord {
    pub fn is_claimed(&self) -> bool {
        self.owner_id.is_some()
    }

    pub fn owned_by(&self, user_id: &str) -> bool {
        self.owner_id.as_deref() == Some(user_id)
    }
}
