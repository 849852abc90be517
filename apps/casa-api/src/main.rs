//! 设备指令与遥测桥接服务入口。
//!
//! 启动顺序：配置 → 日志 → 存储选择 → broker 连接 → 遥测接入任务 → HTTP 服务。

mod handlers;
mod middleware;
mod routes;
mod utils;

use casa_auth::JwtManager;
use casa_config::AppConfig;
use casa_control::{CommandService, CommandServiceConfig};
use casa_discovery::{Scanner, ScannerConfig};
use casa_ingest::IngestService;
use casa_provision::{ClaimService, Registrar};
use casa_storage::{DeviceStore, InMemoryDeviceStore, PgDeviceStore};
use casa_telemetry::init_tracing;
use casa_transport::{MqttTransport, MqttTransportConfig, Transport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 各 handler 共享的应用状态。
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DeviceStore>,
    pub commands: CommandService,
    pub scanner: Scanner,
    pub registrar: Arc<Registrar>,
    pub claims: Arc<ClaimService>,
    pub jwt: Arc<JwtManager>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 存储选择：配置了数据库走 Postgres，否则退回内存注册表（单机演示）
    let store: Arc<dyn DeviceStore> = match &config.database_url {
        Some(url) => Arc::new(PgDeviceStore::connect(url).await?),
        None => {
            warn!(target: "casa.api", "no_database_url_using_memory_registry");
            Arc::new(InMemoryDeviceStore::new())
        }
    };

    // 共享 broker 连接：指令下发与状态订阅走同一条链路
    let (mqtt, _event_loop) = MqttTransport::connect(MqttTransportConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        qos: config.mqtt_command_qos,
    })?;
    let transport: Arc<dyn Transport> = Arc::new(mqtt);

    // 遥测接入任务：订阅状态主题，把设备上报合并进注册表
    if config.ingest_enabled {
        let ingest = IngestService::new(Arc::clone(&store), Arc::clone(&transport));
        tokio::spawn(async move {
            if let Err(err) = ingest.run().await {
                warn!(target: "casa.api", error = %err, "ingest_loop_exited");
            }
        });
    }

    let state = AppState {
        store: Arc::clone(&store),
        commands: CommandService::new_with_config(
            Arc::clone(&store),
            Arc::clone(&transport),
            CommandServiceConfig {
                http_timeout: Duration::from_millis(config.device_http_timeout_ms),
            },
        ),
        scanner: Scanner::new_with_config(ScannerConfig {
            probe_timeout: Duration::from_millis(config.scan_probe_timeout_ms),
            mdns_timeout: Duration::from_millis(config.scan_mdns_timeout_ms),
            manual_timeout: Duration::from_millis(config.scan_manual_timeout_ms),
        }),
        registrar: Arc::new(Registrar::new(Arc::clone(&store))),
        claims: Arc::new(ClaimService::new(Arc::clone(&store))),
        jwt: Arc::new(JwtManager::new(
            config.jwt_secret.clone(),
            config.jwt_access_ttl_seconds,
        )),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(target: "casa.api", addr = %config.http_addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
