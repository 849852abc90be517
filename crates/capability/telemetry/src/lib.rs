//! 追踪与请求 ID 生成。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub reports_ingested: u64,
    pub reports_dropped_unknown: u64,
    pub reports_dropped_invalid: u64,
    pub commands_pubsub: u64,
    pub commands_http: u64,
    pub commands_failed: u64,
    pub command_latency_ms_total: u64,
    pub command_latency_ms_count: u64,
    pub devices_registered: u64,
    pub devices_linked: u64,
    pub heartbeats: u64,
    pub scan_probes: u64,
    pub scan_hits: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    reports_ingested: AtomicU64,
    reports_dropped_unknown: AtomicU64,
    reports_dropped_invalid: AtomicU64,
    commands_pubsub: AtomicU64,
    commands_http: AtomicU64,
    commands_failed: AtomicU64,
    command_latency_ms_total: AtomicU64,
    command_latency_ms_count: AtomicU64,
    devices_registered: AtomicU64,
    devices_linked: AtomicU64,
    heartbeats: AtomicU64,
    scan_probes: AtomicU64,
    scan_hits: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            reports_ingested: AtomicU64::new(0),
            reports_dropped_unknown: AtomicU64::new(0),
            reports_dropped_invalid: AtomicU64::new(0),
            commands_pubsub: AtomicU64::new(0),
            commands_http: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
            command_latency_ms_total: AtomicU64::new(0),
            command_latency_ms_count: AtomicU64::new(0),
            devices_registered: AtomicU64::new(0),
            devices_linked: AtomicU64::new(0),
            heartbeats: AtomicU64::new(0),
            scan_probes: AtomicU64::new(0),
            scan_hits: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_ingested: self.reports_ingested.load(Ordering::Relaxed),
            reports_dropped_unknown: self.reports_dropped_unknown.load(Ordering::Relaxed),
            reports_dropped_invalid: self.reports_dropped_invalid.load(Ordering::Relaxed),
            commands_pubsub: self.commands_pubsub.load(Ordering::Relaxed),
            commands_http: self.commands_http.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            command_latency_ms_total: self.command_latency_ms_total.load(Ordering::Relaxed),
            command_latency_ms_count: self.command_latency_ms_count.load(Ordering::Relaxed),
            devices_registered: self.devices_registered.load(Ordering::Relaxed),
            devices_linked: self.devices_linked.load(Ordering::Relaxed),
            heartbeats: self.heartbeats.load(Ordering::Relaxed),
            scan_probes: self.scan_probes.load(Ordering::Relaxed),
            scan_hits: self.scan_hits.load(Ordering::Relaxed),
        }
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录状态上报合并入库次数。
pub fn record_report_ingested() {
    metrics().reports_ingested.fetch_add(1, Ordering::Relaxed);
}

/// 记录未注册 MAC 上报丢弃次数。
pub fn record_report_dropped_unknown() {
    metrics()
        .reports_dropped_unknown
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录非法上报丢弃次数（主题或报文不可解析）。
pub fn record_report_dropped_invalid() {
    metrics()
        .reports_dropped_invalid
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录经 broker 下发的指令次数。
pub fn record_command_pubsub() {
    metrics().commands_pubsub.fetch_add(1, Ordering::Relaxed);
}

/// 记录经 HTTP 直连下发的指令次数。
pub fn record_command_http() {
    metrics().commands_http.fetch_add(1, Ordering::Relaxed);
}

/// 记录下发失败次数（超时、不可达、无路由）。
pub fn record_command_failed() {
    metrics().commands_failed.fetch_add(1, Ordering::Relaxed);
}

/// 记录指令下发耗时（毫秒）。
pub fn record_command_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .command_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .command_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录新设备注册次数。
pub fn record_device_registered() {
    metrics().devices_registered.fetch_add(1, Ordering::Relaxed);
}

/// 记录 IP 合并挂接 MAC 次数。
pub fn record_device_linked() {
    metrics().devices_linked.fetch_add(1, Ordering::Relaxed);
}

/// 记录已注册设备心跳刷新次数。
pub fn record_heartbeat() {
    metrics().heartbeats.fetch_add(1, Ordering::Relaxed);
}

/// 记录扫描探测请求次数。
pub fn record_scan_probe() {
    metrics().scan_probes.fetch_add(1, Ordering::Relaxed);
}

/// 记录扫描命中次数（确认为受管设备）。
pub fn record_scan_hit() {
    metrics().scan_hits.fetch_add(1, Ordering::Relaxed);
}
