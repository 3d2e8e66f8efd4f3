//! PostgreSQL audit repository tests. Run with `DATABASE_URL` set and `--ignored`.

use audit_gateway::application::services::AuditService;
use audit_gateway::domain::chain_signer::ChainSigner;
use audit_gateway::domain::entities::{AuditEvent, NewAuditRecord};
use audit_gateway::domain::repositories::AuditRepository;
use audit_gateway::infrastructure::persistence::PgAuditRepository;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

fn event(path: &str) -> AuditEvent {
    AuditEvent {
        subject_id: Some("user-1".to_string()),
        method: "POST".to_string(),
        path: path.to_string(),
        status_code: 201,
        ip: Some("203.0.113.9".to_string()),
        body: Some(json!({ "monto": 120.5, "password": "***REDACTED***" })),
        error: None,
        duration_ms: 12,
    }
}

fn new_record(signature: &str, previous: Option<&str>) -> NewAuditRecord {
    NewAuditRecord {
        fields: event("/transferencias").into_fields(Utc::now()),
        signature: signature.to_string(),
        previous_signature: previous.map(str::to_string),
    }
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_insert_and_find(pool: PgPool) {
    let repo = PgAuditRepository::new(Arc::new(pool));

    let inserted = repo.insert(new_record("sig-1", None)).await.unwrap();
    let found = repo.find_by_id(inserted.id).await.unwrap().unwrap();

    assert_eq!(found, inserted);
    assert_eq!(found.fields.ip.as_deref(), Some("203.0.113.9"));
    assert_eq!(repo.last_signature().await.unwrap().as_deref(), Some("sig-1"));
    assert!(repo.find_by_id(inserted.id + 100).await.unwrap().is_none());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_second_claim_on_predecessor_conflicts(pool: PgPool) {
    let repo = PgAuditRepository::new(Arc::new(pool));

    repo.insert(new_record("sig-1", None)).await.unwrap();
    repo.insert(new_record("sig-2", Some("sig-1"))).await.unwrap();

    let fork = repo.insert(new_record("sig-3", Some("sig-1"))).await;
    assert!(fork.unwrap_err().is_conflict());

    let second_genesis = repo.insert(new_record("sig-4", None)).await;
    assert!(second_genesis.unwrap_err().is_conflict());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_records_are_append_only(pool: PgPool) {
    let repo = PgAuditRepository::new(Arc::new(pool.clone()));
    let record = repo.insert(new_record("sig-1", None)).await.unwrap();

    let update = sqlx::query("UPDATE audit_records SET status_code = 200 WHERE id = $1")
        .bind(record.id)
        .execute(&pool)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM audit_records WHERE id = $1")
        .bind(record.id)
        .execute(&pool)
        .await;
    assert!(delete.is_err());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_list_count_and_chain_page(pool: PgPool) {
    let repo = PgAuditRepository::new(Arc::new(pool));

    repo.insert(new_record("sig-1", None)).await.unwrap();
    repo.insert(new_record("sig-2", Some("sig-1"))).await.unwrap();
    repo.insert(new_record("sig-3", Some("sig-2"))).await.unwrap();

    assert_eq!(repo.count().await.unwrap(), 3);

    let newest = repo.list(0, 2).await.unwrap();
    assert_eq!(newest[0].signature, "sig-3");
    assert_eq!(newest[1].signature, "sig-2");

    let first = repo.chain_page(0, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].signature, "sig-1");

    let rest = repo.chain_page(first[1].id, 2).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].signature, "sig-3");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_stored_records_verify(pool: PgPool) {
    let repo = Arc::new(PgAuditRepository::new(Arc::new(pool)));
    let service = AuditService::new(repo.clone(), ChainSigner::new("test-log-signing-key"));

    for path in ["/auth/login", "/transferencias", "/cuentas/1"] {
        service.try_record(event(path)).await.unwrap();
    }

    let report = service.verify_chain().await.unwrap();
    assert!(report.is_valid());
    assert_eq!(report.checked, 3);
    assert!(repo.health_check().await);
}
