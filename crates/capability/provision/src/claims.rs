use crate::ProvisionError;
use casa_storage::{ClaimOutcome, DeviceStore, ReleaseOutcome, StorageError};
use domain::{CallerContext, DeviceRecord, Mac};
use std::sync::Arc;
use tracing::info;

/// 设备认领服务。
///
/// 认领是存储层单条条件更新，并发争抢时恰有一个赢家；
/// 同一用户重复认领幂等成功。
pub struct ClaimService {
    store: Arc<dyn DeviceStore>,
}

impl ClaimService {
    pub fn new(store: Arc<dyn DeviceStore>) -> Self {
        Self { store }
    }

    /// 列出可认领（未归属）的设备。
    pub async fn list_unclaimed(&self) -> Result<Vec<DeviceRecord>, ProvisionError> {
        self.store.list_unclaimed().await.map_err(storage_error)
    }

    /// 按设备 id 认领。
    pub async fn claim(
        &self,
        ctx: &CallerContext,
        device_id: &str,
    ) -> Result<DeviceRecord, ProvisionError> {
        let outcome = self
            .store
            .claim_owner(device_id, &ctx.user_id)
            .await
            .map_err(storage_error)?;
        self.finish_claim(ctx, outcome)
    }

    /// 按 MAC 认领（扫描结果直接认领时设备可能还没有展示 id）。
    pub async fn claim_by_mac(
        &self,
        ctx: &CallerContext,
        mac: &Mac,
    ) -> Result<DeviceRecord, ProvisionError> {
        let outcome = self
            .store
            .claim_owner_by_mac(mac, &ctx.user_id)
            .await
            .map_err(storage_error)?;
        self.finish_claim(ctx, outcome)
    }

    /// 释放归属；仅当前归属用户可释放。
    pub async fn release(
        &self,
        ctx: &CallerContext,
        device_id: &str,
    ) -> Result<(), ProvisionError> {
        let outcome = self
            .store
            .release_owner(device_id, &ctx.user_id)
            .await
            .map_err(storage_error)?;
        match outcome {
            ReleaseOutcome::Released => {
                info!(
                    target: "casa.provision",
                    device_id = %device_id,
                    user_id = %ctx.user_id,
                    "device_released"
                );
                Ok(())
            }
            ReleaseOutcome::NotOwner => Err(ProvisionError::NotOwner),
            ReleaseOutcome::NotFound => Err(ProvisionError::NotFound),
        }
    }

    fn finish_claim(
        &self,
        ctx: &CallerContext,
        outcome: ClaimOutcome,
    ) -> Result<DeviceRecord, ProvisionError> {
        match outcome {
            ClaimOutcome::Claimed(record) => {
                info!(
                    target: "casa.provision",
                    device_id = %record.device_id,
                    user_id = %ctx.user_id,
                    "device_claimed"
                );
                Ok(record)
            }
            ClaimOutcome::AlreadyOwned => Err(ProvisionError::AlreadyOwned),
            ClaimOutcome::NotFound => Err(ProvisionError::NotFound),
        }
    }
}

fn storage_error(err: StorageError) -> ProvisionError {
    ProvisionError::Storage(err.to_string())
}
