use thiserror::Error;

/// MAC 地址解析失败。
#[derive(Debug, Error)]
#[error("invalid mac address: {input}")]
pub struct MacParseError {
    pub input: String,
}

/// 规范化 MAC 地址。
///
/// 内部始终保存注册表规范形式（大写、冒号分隔，如 `AA:BB:CC:DD:EE:FF`）。
/// 所有外部输入（HTTP 请求、MQTT 主题段、设备上报）必须经 [`Mac::parse`]
/// 进入，注册表查询因此不受书写形式差异影响。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mac(String);

impl Mac {
    /// 解析常见书写形式：冒号分隔、连字符分隔或裸十六进制，大小写不限。
    pub fn parse(input: &str) -> Result<Self, MacParseError> {
        let hex: String = input
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if hex.len() != 12 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MacParseError {
                input: input.trim().to_string(),
            });
        }

        let upper = hex.to_ascii_uppercase();
        let mut canonical = String::with_capacity(17);
        for (i, pair) in upper.as_bytes().chunks(2).enumerate() {
            if i > 0 {
                canonical.push(':');
            }
            canonical.push(pair[0] as char);
            canonical.push(pair[1] as char);
        }
        Ok(Self(canonical))
    }

    /// 注册表规范形式：`AA:BB:CC:DD:EE:FF`。
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 主题段形式：无分隔大写十六进制 `AABBCCDDEEFF`。
    ///
    /// MQTT 主题中冒号虽然合法，但固件侧按无分隔形式拼接主题，
    /// 两种渲染都由同一类型导出，避免各处自行拼接产生分歧。
    pub fn topic_segment(&self) -> String {
        self.0.chars().filter(|c| *c != ':').collect()
    }

    /// 规范形式的末尾 8 个字符（如 `DD:EE:FF`），用于默认设备名。
    pub fn name_tail(&self) -> &str {
        &self.0[self.0.len() - 8..]
    }
}

impl std::fmt::Display for Mac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
