use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{info, warn};

/// 订阅通道深度；慢消费者堆满后丢弃新消息（遥测是缓存语义，可丢）。
const INBOUND_QUEUE_DEPTH: usize = 256;

/// 从 broker 收到的一条消息。
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// 传输层错误。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// broker 未连接；发布方快速失败，不做本地排队
    #[error("broker disconnected")]
    Disconnected,
    #[error("broker error: {0}")]
    Broker(String),
}

/// 发布/订阅传输抽象：指令下发与遥测接入共用同一条 broker 连接。
#[async_trait]
pub trait Transport: Send + Sync {
    /// 发布一条消息；broker 未连接时立即返回 [`TransportError::Disconnected`]
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// 订阅一个主题过滤器（支持 `+`/`#`），返回逐条投递的接收端
    async fn subscribe(
        &self,
        filter: &str,
    ) -> Result<mpsc::Receiver<InboundMessage>, TransportError>;

    fn is_connected(&self) -> bool;
}

struct Subscription {
    filter: String,
    sender: mpsc::Sender<InboundMessage>,
}

/// 把一条入站消息分发给所有匹配的订阅者；接收端已关闭的订阅就地清理。
async fn fan_out(table: &Mutex<Vec<Subscription>>, topic: &str, payload: &[u8]) {
    let mut subscriptions = table.lock().await;
    subscriptions.retain(|subscription| {
        if !topic_matches(&subscription.filter, topic) {
            return true;
        }
        let message = InboundMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        };
        match subscription.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(target: "casa.transport", "inbound queue full, message dropped: {}", topic);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    });
}

/// MQTT 主题过滤器匹配（`+` 单层，`#` 任意层）。
fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_parts = filter.split('/');
    let mut topic_parts = topic.split('/');
    loop {
        match (filter_parts.next(), topic_parts.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// MQTT 传输配置。
#[derive(Debug, Clone)]
pub struct MqttTransportConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub qos: u8,
}

struct MqttTransportInner {
    client: AsyncClient,
    qos: QoS,
    connected: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
}

/// 基于 rumqttc 的共享 broker 连接。
///
/// 事件循环任务负责：
/// - 维护连接状态（ConnAck 置位，轮询出错复位并退避重连）
/// - 重连后恢复全部订阅
/// - 把入站 Publish 分发给匹配的订阅者
#[derive(Clone)]
pub struct MqttTransport {
    inner: Arc<MqttTransportInner>,
}

impl MqttTransport {
    pub fn connect(
        config: MqttTransportConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), TransportError> {
        let client_id = format!("casa-transport-{}", uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let inner = Arc::new(MqttTransportInner {
            client,
            qos: qos_from_u8(config.qos),
            connected: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
        });

        let task_inner = Arc::clone(&inner);
        let handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        task_inner.connected.store(true, Ordering::SeqCst);
                        info!(target: "casa.transport", "mqtt connected");
                        resubscribe(&task_inner).await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        fan_out(&task_inner.subscriptions, &publish.topic, &publish.payload)
                            .await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        task_inner.connected.store(false, Ordering::SeqCst);
                        warn!(target: "casa.transport", "mqtt eventloop error: {}", err);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
        Ok((Self { inner }, handle))
    }
}

async fn resubscribe(inner: &MqttTransportInner) {
    let filters: Vec<String> = {
        let subscriptions = inner.subscriptions.lock().await;
        subscriptions
            .iter()
            .map(|subscription| subscription.filter.clone())
            .collect()
    };
    for filter in filters {
        if let Err(err) = inner.client.subscribe(&filter, inner.qos).await {
            warn!(target: "casa.transport", "mqtt resubscribe failed: {} ({})", filter, err);
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.inner.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        self.inner
            .client
            .publish(topic, self.inner.qos, false, payload)
            .await
            .map_err(|err| TransportError::Broker(err.to_string()))
    }

    async fn subscribe(
        &self,
        filter: &str,
    ) -> Result<mpsc::Receiver<InboundMessage>, TransportError> {
        let (sender, receiver) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        {
            let mut subscriptions = self.inner.subscriptions.lock().await;
            subscriptions.push(Subscription {
                filter: filter.to_string(),
                sender,
            });
        }
        // 立即下发订阅请求；失败也无妨，ConnAck 时会统一恢复
        if let Err(err) = self.inner.client.subscribe(filter, self.inner.qos).await {
            warn!(target: "casa.transport", "mqtt subscribe deferred: {} ({})", filter, err);
        }
        Ok(receiver)
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }
}

/// 内存传输：无 broker 的回环实现，发布即投递给匹配订阅者并留痕。
///
/// 用于测试与无 broker 的单机演示。
pub struct MemoryTransport {
    connected: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
    published: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            subscriptions: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
        }
    }

    /// 模拟连接/断开。
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// 已发布消息的历史（topic, payload）。
    pub async fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().await.clone()
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Disconnected);
        }
        {
            let mut published = self.published.lock().await;
            published.push((topic.to_string(), payload.clone()));
        }
        fan_out(&self.subscriptions, topic, &payload).await;
        Ok(())
    }

    async fn subscribe(
        &self,
        filter: &str,
    ) -> Result<mpsc::Receiver<InboundMessage>, TransportError> {
        let (sender, receiver) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        let mut subscriptions = self.subscriptions.lock().await;
        subscriptions.push(Subscription {
            filter: filter.to_string(),
            sender,
        });
        Ok(receiver)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_matches_exact_topic() {
        assert!(topic_matches("cmd/AABBCCDDEEFF", "cmd/AABBCCDDEEFF"));
        assert!(!topic_matches("cmd/AABBCCDDEEFF", "cmd/112233445566"));
    }

    #[test]
    fn filter_hash_matches_any_depth() {
        assert!(topic_matches("device/status/#", "device/status/AABBCCDDEEFF"));
        assert!(topic_matches("device/status/#", "device/status/a/b/c"));
        assert!(topic_matches("device/status/#", "device/status"));
        assert!(!topic_matches("device/status/#", "device/other/AABBCCDDEEFF"));
    }

    #[test]
    fn filter_plus_matches_single_level() {
        assert!(topic_matches("device/+/state", "device/d1/state"));
        assert!(!topic_matches("device/+/state", "device/d1/extra/state"));
        assert!(!topic_matches("device/+/state", "device/state"));
    }

    #[tokio::test]
    async fn memory_transport_delivers_to_matching_subscriber() {
        let transport = MemoryTransport::new();
        let mut inbox = transport
            .subscribe("device/status/#")
            .await
            .expect("subscribe");

        transport
            .publish("device/status/AABBCCDDEEFF", b"{\"temp\":21}".to_vec())
            .await
            .expect("publish");
        transport
            .publish("cmd/AABBCCDDEEFF", b"ignored".to_vec())
            .await
            .expect("publish");

        let message = inbox.recv().await.expect("message");
        assert_eq!(message.topic, "device/status/AABBCCDDEEFF");
        assert_eq!(message.payload, b"{\"temp\":21}");
        assert!(inbox.try_recv().is_err(), "command topic must not be delivered");

        let published = transport.published().await;
        assert_eq!(published.len(), 2);
    }

    #[tokio::test]
    async fn memory_transport_rejects_publish_while_disconnected() {
        let transport = MemoryTransport::new();
        transport.set_connected(false);
        let err = transport
            .publish("cmd/AABBCCDDEEFF", Vec::new())
            .await
            .expect_err("disconnected");
        assert!(matches!(err, TransportError::Disconnected));
        assert!(!transport.is_connected());
    }
}
