//! Integration tests for credential persistence.
//!
//! These tests verify that the CredentialStore, backed by a
//! FileDocumentStore:
//! - Saves, loads, updates and deletes records across reopen
//! - Filters listings by vendor
//! - Writes the discriminator and field tags the backend relies on

use apiforge_core::{
    ApiKeyCredential, ApiforgeError, Credential, CredentialId, CredentialRecord, CredentialStore,
    FileDocumentStore, StoreError, VendorId,
};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> CredentialStore<FileDocumentStore> {
    let store = FileDocumentStore::open(dir.path().join("credentials.json")).unwrap();
    CredentialStore::new(store)
}

fn sharepoint_record(access_token: &str) -> CredentialRecord {
    CredentialRecord::Sharepoint(
        Credential::new(access_token)
            .with_refresh_token("refresh-1")
            .with_id_token("id-1")
            .with_expires_in(3600),
    )
}

#[tokio::test]
async fn test_save_and_load_across_reopen() {
    let dir = TempDir::new().unwrap();

    let id = {
        let store = open_store(&dir);
        store.save(&sharepoint_record("access-1")).await.unwrap()
    };

    let store = open_store(&dir);
    let record = store.load(&id).await.unwrap();

    assert_eq!(record.vendor(), VendorId::new("sharepoint"));
    let credential = record.oauth().unwrap();
    assert_eq!(credential.access_token.expose(), "access-1");
    assert_eq!(credential.refresh_token.as_ref().unwrap().expose(), "refresh-1");
    assert_eq!(credential.expires_in, Some(3600));
}

#[tokio::test]
async fn test_update_after_refresh() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let id = store.save(&sharepoint_record("access-1")).await.unwrap();

    let mut record = store.load(&id).await.unwrap();
    assert!(record.replace_oauth(Credential::new("access-2").with_refresh_token("refresh-2")));
    store.update(&id, &record).await.unwrap();

    let reopened = open_store(&dir);
    let loaded = reopened.load(&id).await.unwrap();
    assert_eq!(loaded.oauth().unwrap().access_token.expose(), "access-2");
}

#[tokio::test]
async fn test_update_missing_record() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let result = store
        .update(&CredentialId::new("missing"), &sharepoint_record("access-1"))
        .await;
    assert!(matches!(
        result,
        Err(ApiforgeError::Store(StoreError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_delete() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let id = store.save(&sharepoint_record("access-1")).await.unwrap();
    store.delete(&id).await.unwrap();

    assert!(matches!(
        store.load(&id).await,
        Err(ApiforgeError::Store(StoreError::NotFound { .. }))
    ));
    assert!(matches!(
        store.delete(&id).await,
        Err(ApiforgeError::Store(StoreError::NotFound { .. }))
    ));

    let reopened = open_store(&dir);
    assert!(reopened.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_by_vendor() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    store.save(&sharepoint_record("access-1")).await.unwrap();
    store
        .save(&CredentialRecord::Slack(Credential::new("xoxb-1")))
        .await
        .unwrap();
    store
        .save(&CredentialRecord::Slack(Credential::new("xoxb-2")))
        .await
        .unwrap();
    store
        .save(&CredentialRecord::Terminus(ApiKeyCredential::new("key-1")))
        .await
        .unwrap();

    assert_eq!(store.list(None).await.unwrap().len(), 4);

    let slack = store.list(Some(&VendorId::new("slack"))).await.unwrap();
    assert_eq!(slack.len(), 2);
    assert!(slack.iter().all(|(_, r)| r.vendor() == VendorId::new("slack")));

    let attentive = store.list(Some(&VendorId::new("attentive"))).await.unwrap();
    assert!(attentive.is_empty());
}

#[tokio::test]
async fn test_unique_api_key_survives_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store = open_store(&dir);
        store
            .save(&CredentialRecord::Terminus(ApiKeyCredential::new("key-1")))
            .await
            .unwrap();
    }

    let store = open_store(&dir);
    let result = store
        .save(&CredentialRecord::Terminus(ApiKeyCredential::new("key-1")))
        .await;
    assert!(matches!(
        result,
        Err(ApiforgeError::Store(StoreError::UniqueViolation { .. }))
    ));

    // A different key is fine.
    store
        .save(&CredentialRecord::Terminus(ApiKeyCredential::new("key-2")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_file_contains_tags() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);

    let id = store
        .save(&CredentialRecord::Attentive(
            Credential::new("access-1").with_id_token("id-1"),
        ))
        .await
        .unwrap();

    let contents = std::fs::read_to_string(dir.path().join("credentials.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let document = &json["documents"][id.as_str()];

    assert_eq!(document["discriminator"], "AttentiveCredentials");
    assert_eq!(document["fields"]["vendor"], "attentive");
    assert_eq!(
        document["encrypted"],
        serde_json::json!(["access_token", "id_token", "refresh_token"])
    );
}
