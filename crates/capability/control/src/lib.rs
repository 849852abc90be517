use casa_protocol::{CommandPayload, channel_update, command_topic, control_url, latch_update};
use casa_storage::DeviceStore;
use casa_telemetry::{
    record_command_failed, record_command_http, record_command_latency_ms, record_command_pubsub,
};
use casa_transport::Transport;
use domain::DeviceRecord;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 控制请求：目标设备 + 固件执行器指令。
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub device_id: String,
    /// 执行器名（door/servo、relay/light、buzzer/alarm、screen/display）。
    pub target: String,
    pub action: String,
    pub value: Option<i64>,
    pub channel: Option<i64>,
}

/// 指令路由：有 MAC 走 MQTT 指令主题，否则按 IP 直连 `/control`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRoute {
    PubSub { topic: String },
    DirectHttp { url: String },
}

impl CommandRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandRoute::PubSub { .. } => "pubsub",
            CommandRoute::DirectHttp { .. } => "http",
        }
    }
}

/// 下发结果。
///
/// `Queued` 只代表 broker 已入队，设备是否执行由后续遥测上报反映；
/// `Delivered` 携带设备对 `/control` 的同步应答原文。
#[derive(Debug, Clone)]
pub enum Dispatched {
    Queued { topic: String },
    Delivered { reply: serde_json::Value },
}

/// 控制链路错误。
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("device not found")]
    NotFound,
    #[error("device has no reachable address")]
    NotConfigured,
    #[error("device reply timed out")]
    Timeout,
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error("payload error: {0}")]
    Payload(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// 挑选下发通道：MAC 在册优先 MQTT，仅有 IP 的手工录入设备退回
/// HTTP 直连，两者皆无视为未配置。
pub fn select_route(record: &DeviceRecord) -> Result<CommandRoute, CommandError> {
    if let Some(mac) = &record.mac {
        return Ok(CommandRoute::PubSub {
            topic: command_topic(mac),
        });
    }
    if let Some(ip) = record.ip.as_deref() {
        return Ok(CommandRoute::DirectHttp {
            url: control_url(ip),
        });
    }
    Err(CommandError::NotConfigured)
}

/// 控制服务配置。
#[derive(Debug, Clone)]
pub struct CommandServiceConfig {
    /// HTTP 直连的单次请求超时。
    pub http_timeout: Duration,
}

impl Default for CommandServiceConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_millis(2000),
        }
    }
}

/// 命令服务（路由决策 + 双通道下发 + 乐观状态回写）。
#[derive(Clone)]
pub struct CommandService {
    store: Arc<dyn DeviceStore>,
    transport: Arc<dyn Transport>,
    http: reqwest::Client,
    config: CommandServiceConfig,
}

impl CommandService {
    pub fn new(store: Arc<dyn DeviceStore>, transport: Arc<dyn Transport>) -> Self {
        Self::new_with_config(store, transport, CommandServiceConfig::default())
    }

    pub fn new_with_config(
        store: Arc<dyn DeviceStore>,
        transport: Arc<dyn Transport>,
        config: CommandServiceConfig,
    ) -> Self {
        Self {
            store,
            transport,
            http: reqwest::Client::new(),
            config,
        }
    }

    /// 下发一条指令。
    ///
    /// 成功路径附带乐观状态回写：门/舵机指令改整机状态，继电器/灯控
    /// 指令改对应通道状态；设备若未执行，由下一次遥测上报纠正缓存。
    pub async fn dispatch(&self, request: CommandRequest) -> Result<Dispatched, CommandError> {
        let started_at = Instant::now();
        let outcome = self.dispatch_inner(&request).await;
        match &outcome {
            Ok(Dispatched::Queued { topic }) => {
                record_command_pubsub();
                info!(
                    target: "casa.control",
                    device_id = %request.device_id,
                    actuator = %request.target,
                    action = %request.action,
                    topic = %topic,
                    "command_queued"
                );
            }
            Ok(Dispatched::Delivered { .. }) => {
                record_command_http();
                info!(
                    target: "casa.control",
                    device_id = %request.device_id,
                    actuator = %request.target,
                    action = %request.action,
                    "command_delivered"
                );
            }
            Err(err) => {
                record_command_failed();
                warn!(
                    target: "casa.control",
                    device_id = %request.device_id,
                    actuator = %request.target,
                    action = %request.action,
                    error = %err,
                    "command_dispatch_failed"
                );
            }
        }
        record_command_latency_ms(started_at.elapsed().as_millis() as u64);
        outcome
    }

    async fn dispatch_inner(&self, request: &CommandRequest) -> Result<Dispatched, CommandError> {
        let record = self
            .store
            .find_by_id(&request.device_id)
            .await
            .map_err(|err| CommandError::Storage(err.to_string()))?
            .ok_or(CommandError::NotFound)?;
        let route = select_route(&record)?;
        let payload = CommandPayload {
            device: request.target.clone(),
            action: request.action.clone(),
            value: request.value,
            channel: request.channel,
        };
        info!(
            target: "casa.control",
            device_id = %record.device_id,
            route = %route.as_str(),
            actuator = %payload.device,
            action = %payload.action,
            "command_requested"
        );
        let dispatched = match &route {
            CommandRoute::PubSub { topic } => self.publish(topic, &payload).await?,
            CommandRoute::DirectHttp { url } => self.deliver(url, &payload).await?,
        };
        self.write_back(&record.device_id, &payload).await?;
        Ok(dispatched)
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &CommandPayload,
    ) -> Result<Dispatched, CommandError> {
        let bytes =
            serde_json::to_vec(payload).map_err(|err| CommandError::Payload(err.to_string()))?;
        self.transport
            .publish(topic, bytes)
            .await
            .map_err(|err| CommandError::Unreachable(err.to_string()))?;
        Ok(Dispatched::Queued {
            topic: topic.to_string(),
        })
    }

    async fn deliver(
        &self,
        url: &str,
        payload: &CommandPayload,
    ) -> Result<Dispatched, CommandError> {
        let response = self
            .http
            .post(url)
            .timeout(self.config.http_timeout)
            .json(payload)
            .send()
            .await
            .map_err(map_http_error)?;
        let reply = response
            .json::<serde_json::Value>()
            .await
            .map_err(map_http_error)?;
        Ok(Dispatched::Delivered { reply })
    }

    async fn write_back(
        &self,
        device_id: &str,
        payload: &CommandPayload,
    ) -> Result<(), CommandError> {
        if let Some(status) = latch_update(payload) {
            self.store
                .set_latch_status(device_id, status)
                .await
                .map_err(|err| CommandError::Storage(err.to_string()))?;
        }
        if let Some((channel, state)) = channel_update(payload) {
            self.store
                .set_channel_state(device_id, channel, state)
                .await
                .map_err(|err| CommandError::Storage(err.to_string()))?;
        }
        Ok(())
    }
}

fn map_http_error(err: reqwest::Error) -> CommandError {
    if err.is_timeout() {
        CommandError::Timeout
    } else {
        CommandError::Unreachable(err.to_string())
    }
}
