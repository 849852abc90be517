use casa_provision::{ClaimService, ProvisionError, RegistrationRequest, Registrar};
use casa_storage::InMemoryDeviceStore;
use domain::{CallerContext, Mac};
use std::sync::Arc;

async fn seeded_service() -> (ClaimService, String) {
    let store = Arc::new(InMemoryDeviceStore::new());
    let registrar = Registrar::new(store.clone());
    let outcome = registrar
        .register_or_update(RegistrationRequest {
            mac: Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac"),
            ip: "192.168.1.50".to_string(),
            name: None,
            firmware_version: None,
        })
        .await
        .expect("register");
    (ClaimService::new(store), outcome.record.device_id)
}

#[tokio::test]
async fn claim_assigns_owner_and_empties_unclaimed() {
    let (service, device_id) = seeded_service().await;
    let ctx = CallerContext::new("user-1");

    let record = service.claim(&ctx, &device_id).await.expect("claim");
    assert_eq!(record.owner_id.as_deref(), Some("user-1"));
    assert!(service.list_unclaimed().await.expect("list").is_empty());
}

#[tokio::test]
async fn claim_conflict_surfaces_already_owned() {
    let (service, device_id) = seeded_service().await;
    service
        .claim(&CallerContext::new("user-1"), &device_id)
        .await
        .expect("claim");

    let err = service
        .claim(&CallerContext::new("user-2"), &device_id)
        .await
        .expect_err("conflict");
    assert!(matches!(err, ProvisionError::AlreadyOwned));
}

#[tokio::test]
async fn claim_unknown_device_surfaces_not_found() {
    let (service, _) = seeded_service().await;
    let err = service
        .claim(&CallerContext::new("user-1"), "dev-404")
        .await
        .expect_err("missing");
    assert!(matches!(err, ProvisionError::NotFound));
}

#[tokio::test]
async fn claim_by_mac_accepts_any_written_form() {
    let (service, device_id) = seeded_service().await;
    let ctx = CallerContext::new("user-1");

    let mac = Mac::parse("aabbccddeeff").expect("mac");
    let record = service.claim_by_mac(&ctx, &mac).await.expect("claim");
    assert_eq!(record.device_id, device_id);
}

#[tokio::test]
async fn release_enforces_ownership_then_allows_reclaim() {
    let (service, device_id) = seeded_service().await;
    service
        .claim(&CallerContext::new("user-1"), &device_id)
        .await
        .expect("claim");

    let err = service
        .release(&CallerContext::new("user-2"), &device_id)
        .await
        .expect_err("not owner");
    assert!(matches!(err, ProvisionError::NotOwner));

    service
        .release(&CallerContext::new("user-1"), &device_id)
        .await
        .expect("release");

    let record = service
        .claim_by_mac(
            &CallerContext::new("user-2"),
            &Mac::parse("AA:BB:CC:DD:EE:FF").expect("mac"),
        )
        .await
        .expect("reclaim");
    assert_eq!(record.device_id, device_id);
    assert_eq!(record.owner_id.as_deref(), Some("user-2"));
}
