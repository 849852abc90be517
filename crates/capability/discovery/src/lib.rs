use casa_protocol::{MDNS_HOST, ProbeReply, scan_url};
use casa_telemetry::{record_scan_hit, record_scan_probe};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;
use tracing::{debug, info};

/// 发现错误。
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("no usable local interface")]
    NoInterface,
    #[error("probe error: {0}")]
    Probe(String),
}

/// 扫描候选：应答了身份探测的设备自述。
///
/// 只是候选，不代表已入册；入册由调用方走注册/手工创建流程。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub ip: String,
    pub name: Option<String>,
    pub kind: Option<String>,
}

/// 扫描配置。
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// 子网横扫中单个地址的探测超时。
    pub probe_timeout: Duration,
    /// mDNS 主机名的预先探测超时。
    pub mdns_timeout: Duration,
    /// 手工指定地址的探测超时。
    pub manual_timeout: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_millis(300),
            mdns_timeout: Duration::from_millis(1000),
            manual_timeout: Duration::from_millis(2000),
        }
    }
}

/// 子网扫描器：按固件 `GET /scan` 的身份应答枚举局域网内的设备。
#[derive(Clone)]
pub struct Scanner {
    http: reqwest::Client,
    config: ScannerConfig,
}

impl Scanner {
    pub fn new() -> Self {
        Self::new_with_config(ScannerConfig::default())
    }

    pub fn new_with_config(config: ScannerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// 扫描本机所在的 /24 子网。
    ///
    /// 先按 mDNS 主机名探测一次（失败吞掉），再并发横扫 `.2..=.254`；
    /// 单个地址的失败一律按未命中处理，结果按 IP 去重、后到覆盖先到。
    pub async fn scan_local_subnet(&self) -> Result<Vec<DiscoveredDevice>, ScanError> {
        let prefix = local_subnet_prefix()?;
        info!(target: "casa.discovery", subnet = format!("{prefix}0/24"), "scan_started");

        let mut replies: Vec<DiscoveredDevice> = Vec::new();
        if let Some(device) = self.probe_host(MDNS_HOST, self.config.mdns_timeout).await {
            replies.push(device);
        }

        let probes = (2u8..=254).map(|octet| {
            let host = format!("{prefix}{octet}");
            async move { self.probe_host(&host, self.config.probe_timeout).await }
        });
        let answers = futures_util::future::join_all(probes).await;
        replies.extend(answers.into_iter().flatten());

        let devices = dedupe_by_ip(replies);
        info!(target: "casa.discovery", hits = devices.len(), "scan_finished");
        Ok(devices)
    }

    /// 对手工指定的地址做同一身份探测，用于人工录入前的验证。
    pub async fn probe_address(&self, host: &str) -> Option<DiscoveredDevice> {
        self.probe_host(host, self.config.manual_timeout).await
    }

    /// 单个主机的身份探测；连接失败、超时、应答不合族一律视为未命中。
    async fn probe_host(&self, host: &str, timeout: Duration) -> Option<DiscoveredDevice> {
        record_scan_probe();
        let response = self
            .http
            .get(scan_url(host))
            .timeout(timeout)
            .send()
            .await
            .ok()?;
        let reply = response.json::<ProbeReply>().await.ok()?;
        if !reply.is_smart_home_device() {
            debug!(target: "casa.discovery", host = %host, "probe_foreign_reply_ignored");
            return None;
        }
        record_scan_hit();
        debug!(target: "casa.discovery", host = %host, "probe_hit");
        Some(DiscoveredDevice {
            ip: reply.ip.unwrap_or_else(|| host.to_string()),
            name: reply.name,
            kind: reply.kind,
        })
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// 按 IP 去重（后到覆盖先到），再按地址数值排序。
fn dedupe_by_ip(replies: impl IntoIterator<Item = DiscoveredDevice>) -> Vec<DiscoveredDevice> {
    let mut found: HashMap<String, DiscoveredDevice> = HashMap::new();
    for device in replies {
        found.insert(device.ip.clone(), device);
    }
    let mut devices: Vec<DiscoveredDevice> = found.into_values().collect();
    devices.sort_by_key(|device| {
        device
            .ip
            .parse::<Ipv4Addr>()
            .map(u32::from)
            .unwrap_or(u32::MAX)
    });
    devices
}

/// 取本机首选出口 IPv4 所在的 /24 前缀（含末尾点号）。
///
/// UDP connect 不发包，只让内核完成选路并填充本端地址。
fn local_subnet_prefix() -> Result<String, ScanError> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).map_err(|_| ScanError::NoInterface)?;
    socket
        .connect(("8.8.8.8", 80))
        .map_err(|_| ScanError::NoInterface)?;
    let local = socket.local_addr().map_err(|_| ScanError::NoInterface)?;
    match local.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => {
            let octets = ip.octets();
            Ok(format!("{}.{}.{}.", octets[0], octets[1], octets[2]))
        }
        _ => Err(ScanError::NoInterface),
    }
}
