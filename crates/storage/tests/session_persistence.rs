use chrono::Utc;
use serde_json::json;
use shared::domain::{AccountName, SessionBackend};
use storage::{Storage, StoredSession};

#[tokio::test]
async fn stored_session_survives_reopening_the_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("client").join("sessions.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    {
        let storage = Storage::new(&database_url).await.expect("open");
        storage
            .save_session(&StoredSession {
                backend: SessionBackend::Wallet,
                chain_id: "1064487b3cd1a897ce03ae5b6a865651747e2e152090f99c1d19d44e01aea5a4"
                    .to_string(),
                actor: AccountName::parse("alice.wam").expect("actor"),
                permission: "active".to_string(),
                provider: "cloudwallet".to_string(),
                payload: json!({"autoLogin": true}),
                saved_at: Utc::now(),
            })
            .await
            .expect("save");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let restored = reopened
        .load_session(SessionBackend::Wallet)
        .await
        .expect("load")
        .expect("session should persist across reopen");
    assert_eq!(restored.actor.as_str(), "alice.wam");
    assert_eq!(restored.provider, "cloudwallet");
    assert_eq!(restored.payload, json!({"autoLogin": true}));
}
