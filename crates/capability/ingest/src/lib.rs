use casa_protocol::{StatusReport, mac_from_status_topic, status_topic_filter};
use casa_storage::DeviceStore;
use casa_telemetry::{
    record_report_dropped_invalid, record_report_dropped_unknown, record_report_ingested,
};
use casa_transport::Transport;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("transport error: {0}")]
    Transport(String),
}

/// 遥测采集服务：订阅状态通配主题，把设备上报合并进注册表缓存。
#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn DeviceStore>,
    transport: Arc<dyn Transport>,
}

impl IngestService {
    pub fn new(store: Arc<dyn DeviceStore>, transport: Arc<dyn Transport>) -> Self {
        Self { store, transport }
    }

    /// 持续消费状态上报，直到订阅通道关闭。
    ///
    /// 按最多一次投递处理：单条消息解析或落库失败只记日志并丢弃，
    /// 循环继续；不回执、不重试。
    pub async fn run(&self) -> Result<(), IngestError> {
        let filter = status_topic_filter();
        let mut inbound = self
            .transport
            .subscribe(&filter)
            .await
            .map_err(|err| IngestError::Transport(err.to_string()))?;
        info!(target: "casa.ingest", filter = %filter, "status_subscription_ready");
        while let Some(message) = inbound.recv().await {
            self.handle_message(&message.topic, &message.payload).await;
        }
        Ok(())
    }

    async fn handle_message(&self, topic: &str, payload: &[u8]) {
        let Some(mac) = mac_from_status_topic(topic) else {
            record_report_dropped_invalid();
            warn!(target: "casa.ingest", topic = %topic, "status_topic_skipped");
            return;
        };
        let report: StatusReport = match serde_json::from_slice(payload) {
            Ok(report) => report,
            Err(err) => {
                record_report_dropped_invalid();
                warn!(
                    target: "casa.ingest",
                    mac = %mac,
                    error = %err,
                    "status_payload_invalid"
                );
                return;
            }
        };
        let update = report.into_update(now_epoch_ms());
        match self.store.merge_report(&mac, update).await {
            Ok(Some(record)) => {
                record_report_ingested();
                debug!(
                    target: "casa.ingest",
                    mac = %mac,
                    device_id = %record.device_id,
                    "status_merged"
                );
            }
            Ok(None) => {
                record_report_dropped_unknown();
                debug!(target: "casa.ingest", mac = %mac, "status_unknown_mac_dropped");
            }
            Err(err) => {
                warn!(
                    target: "casa.ingest",
                    mac = %mac,
                    error = %err,
                    "status_merge_failed"
                );
            }
        }
    }
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
