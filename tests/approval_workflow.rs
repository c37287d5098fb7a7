mod support;

use std::path::Path;
use std::sync::Arc;

use chrono::Duration;

use entrance_permits::models::{EntranceRequestFilter, EntranceRequestPatch, RequestStatus};
use entrance_permits::services::{
    ApprovalWorkflow, Assignees, DocumentComposer, DocumentDispatch, FormatLayout,
};
use entrance_permits::utils::errors::AppError;
use entrance_permits::utils::pagination::PageRequest;

use support::*;

fn workflow(template: &Path, output_dir: &Path, mailer: Arc<RecordingMailer>) -> ApprovalWorkflow {
    let composer = DocumentComposer::new(template, output_dir, FormatLayout::default());
    ApprovalWorkflow::new(composer, mailer)
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: InMemoryRequestStore,
    mailer: Arc<RecordingMailer>,
    workflow: ApprovalWorkflow,
    output_dir: std::path::PathBuf,
}

fn fixture_with(mailer: RecordingMailer, with_template: bool) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("PERMISO.xlsx");
    if with_template {
        write_template(&template);
    }
    let output_dir = dir.path().join("formatos");
    let mailer = Arc::new(mailer);
    Fixture {
        workflow: workflow(&template, &output_dir, mailer.clone()),
        store: InMemoryRequestStore::seeded(),
        mailer,
        output_dir,
        _dir: dir,
    }
}

fn fixture() -> Fixture {
    fixture_with(RecordingMailer::default(), true)
}

/// Crea una solicitud y la deja pendiente por seguridad
async fn pending_security(fx: &Fixture, guest_ids: Vec<i64>) -> i64 {
    let created = fx.workflow.create(&fx.store, new_request(guest_ids)).await.unwrap();
    fx.workflow
        .set_status(
            &fx.store,
            created.id(),
            RequestStatus::SecurityPending,
            Assignees::default(),
        )
        .await
        .unwrap();
    created.id()
}

async fn approve(fx: &Fixture, id: i64, security_id: i64) -> Result<entrance_permits::services::StatusChange, AppError> {
    fx.workflow
        .set_status(
            &fx.store,
            id,
            RequestStatus::Approved,
            Assignees {
                security_id: Some(security_id),
                ..Assignees::default()
            },
        )
        .await
}

#[tokio::test]
async fn test_create_starts_pending_with_guests_in_order() {
    let fx = fixture();

    let created = fx
        .workflow
        .create(&fx.store, new_request(vec![102, 100, 101]))
        .await
        .unwrap();

    assert_eq!(created.request.status, RequestStatus::AuthPending);
    let guest_ids: Vec<i64> = created.guests.iter().map(|g| g.id).collect();
    assert_eq!(guest_ids, vec![102, 100, 101]);
    assert_eq!(created.materials.len(), 2);
    assert_eq!(created.creator.as_ref().map(|p| p.id), Some(CREATOR_ID));
}

#[tokio::test]
async fn test_create_with_unknown_guest_is_not_found() {
    let fx = fixture();

    let result = fx.workflow.create(&fx.store, new_request(vec![100, 999])).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(fx.store.request_count(), 0);
}

#[tokio::test]
async fn test_create_rejects_window_longer_than_thirty_days() {
    let fx = fixture();
    let mut request = new_request(vec![100]);
    request.departure_date = request.entry_date + Duration::days(30) + Duration::minutes(1);

    let result = fx.workflow.create(&fx.store, request).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fx.store.request_count(), 0);
}

#[tokio::test]
async fn test_approval_composes_and_mails_document() {
    let fx = fixture();
    let id = pending_security(&fx, vec![100, 101, 102]).await;

    let change = approve(&fx, id, SECURITY_ID).await.unwrap();

    assert_eq!(change.previous_status, RequestStatus::SecurityPending);
    assert_eq!(change.request.status, RequestStatus::Approved);
    assert_eq!(change.request.security_id, Some(SECURITY_ID));

    let expected = fx.output_dir.join(format!("output_{}.xlsx", id));
    assert_eq!(
        change.dispatch,
        DocumentDispatch::Sent {
            document: expected.clone()
        }
    );
    assert!(expected.is_file());

    let sent = fx.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, expected);
    assert_eq!(
        sent[0].1,
        vec!["user1@empresa.co".to_string(), "user2@empresa.co".to_string()]
    );

    assert_eq!(cell_text(&expected, 2, 6), "CENTRAL NORTE");
    assert_eq!(cell_text(&expected, 9, 5), "x");
    assert_eq!(cell_text(&expected, 12, 6), "01/03/2024");
    assert_eq!(cell_text(&expected, 2, 15), "Invitado 100");
    assert_eq!(cell_text(&expected, 2, 17), "Invitado 102");
    assert_eq!(cell_text(&expected, 14, 16), "08:00");
    assert_eq!(cell_text(&expected, 5, 24), "Router X1");
    assert_eq!(cell_text(&expected, 5, 25), "Switch S2");
    assert_eq!(cell_text(&expected, 15, 31), "Marta Ruiz");
}

#[tokio::test]
async fn test_approval_with_unknown_security_changes_nothing() {
    let fx = fixture();
    let id = pending_security(&fx, vec![100]).await;

    let result = approve(&fx, id, 999).await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(fx.store.status_of(id), Some(RequestStatus::SecurityPending));
    assert!(fx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_approval_with_unknown_authorizer_changes_nothing() {
    let fx = fixture();
    let id = pending_security(&fx, vec![100]).await;

    let result = fx
        .workflow
        .set_status(
            &fx.store,
            id,
            RequestStatus::Approved,
            Assignees {
                authorizer_id: Some(404),
                security_id: Some(SECURITY_ID),
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert_eq!(fx.store.status_of(id), Some(RequestStatus::SecurityPending));
    assert!(fx.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_approval_without_security_is_rejected() {
    let fx = fixture();
    let id = pending_security(&fx, vec![100]).await;

    let result = fx
        .workflow
        .set_status(&fx.store, id, RequestStatus::Approved, Assignees::default())
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(fx.store.status_of(id), Some(RequestStatus::SecurityPending));
}

#[tokio::test]
async fn test_reapproval_does_not_send_again() {
    let fx = fixture();
    let id = pending_security(&fx, vec![100]).await;
    approve(&fx, id, SECURITY_ID).await.unwrap();

    let change = approve(&fx, id, SECURITY_ID).await.unwrap();

    assert_eq!(change.dispatch, DocumentDispatch::NotTriggered);
    assert_eq!(fx.mailer.sent().len(), 1);
}

#[tokio::test]
async fn test_skipping_security_review_is_a_conflict() {
    let fx = fixture();
    let created = fx.workflow.create(&fx.store, new_request(vec![100])).await.unwrap();

    let result = approve(&fx, created.id(), SECURITY_ID).await;

    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(fx.store.status_of(created.id()), Some(RequestStatus::AuthPending));
}

#[tokio::test]
async fn test_missing_template_keeps_approval() {
    let fx = fixture_with(RecordingMailer::default(), false);
    let id = pending_security(&fx, vec![100]).await;

    let change = approve(&fx, id, SECURITY_ID).await.unwrap();

    assert_eq!(change.request.status, RequestStatus::Approved);
    assert!(matches!(change.dispatch, DocumentDispatch::ComposeFailed { .. }));
    assert_eq!(fx.store.status_of(id), Some(RequestStatus::Approved));
    assert!(fx.mailer.sent().is_empty());
    assert!(!fx.output_dir.join(format!("output_{}.xlsx", id)).exists());
}

#[tokio::test]
async fn test_mail_failure_keeps_approval_and_document() {
    let fx = fixture_with(RecordingMailer::failing(), true);
    let id = pending_security(&fx, vec![100, 101]).await;

    let change = approve(&fx, id, SECURITY_ID).await.unwrap();

    assert_eq!(fx.store.status_of(id), Some(RequestStatus::Approved));
    match change.dispatch {
        DocumentDispatch::EmailFailed { document, .. } => assert!(document.is_file()),
        other => panic!("se esperaba EmailFailed, llegó {:?}", other),
    }
}

#[tokio::test]
async fn test_update_rejects_invalid_window_atomically() {
    let fx = fixture();
    let created = fx.workflow.create(&fx.store, new_request(vec![100])).await.unwrap();

    let patch = EntranceRequestPatch {
        reason: Some("Visita técnica".to_string()),
        departure_date: Some(at(1, 8) + Duration::days(31)),
        ..EntranceRequestPatch::default()
    };
    let result = fx.workflow.update(&fx.store, created.id(), patch).await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    let current = fx.workflow.get(&fx.store, created.id()).await.unwrap();
    assert_eq!(current.request.reason, "Cambio de equipos de transmisión");
    assert_eq!(current.request.departure_date, at(1, 17));
}

#[tokio::test]
async fn test_update_replaces_guest_list() {
    let fx = fixture();
    let created = fx.workflow.create(&fx.store, new_request(vec![100])).await.unwrap();

    let patch = EntranceRequestPatch {
        guest_ids: Some(vec![101, 102]),
        ..EntranceRequestPatch::default()
    };
    let change = fx.workflow.update(&fx.store, created.id(), patch).await.unwrap();

    assert_eq!(change.dispatch, DocumentDispatch::NotTriggered);
    let current = fx.workflow.get(&fx.store, created.id()).await.unwrap();
    let guest_ids: Vec<i64> = current.guests.iter().map(|g| g.id).collect();
    assert_eq!(guest_ids, vec![101, 102]);

    let unknown = EntranceRequestPatch {
        guest_ids: Some(vec![555]),
        ..EntranceRequestPatch::default()
    };
    let result = fx.workflow.update(&fx.store, created.id(), unknown).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_get_unknown_request_is_not_found() {
    let fx = fixture();
    let result = fx.workflow.get(&fx.store, 42).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_list_filters_by_status_and_pages() {
    let fx = fixture();
    for _ in 0..3 {
        fx.workflow.create(&fx.store, new_request(vec![100])).await.unwrap();
    }
    let pending = pending_security(&fx, vec![101]).await;

    let filter = EntranceRequestFilter {
        status: Some(RequestStatus::AuthPending),
        ..EntranceRequestFilter::default()
    };
    let page = fx
        .workflow
        .list(&fx.store, &filter, Some(PageRequest::new(0, 2)))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);

    let filter = EntranceRequestFilter {
        status: Some(RequestStatus::SecurityPending),
        ..EntranceRequestFilter::default()
    };
    let page = fx.workflow.list(&fx.store, &filter, None).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, pending);
}
