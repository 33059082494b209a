//! End-to-end session lifecycle tests over a real on-disk store.

use tempfile::TempDir;

use vigil::{
    Database, EventOrder, EventType, NewEvent, SessionController, SessionStatus, Severity,
    VigilError,
};

fn open_controller(dir: &TempDir) -> SessionController {
    let db = Database::new(dir.path().join("vigil.sqlite3")).unwrap();
    SessionController::new(db)
}

#[tokio::test]
async fn new_session_starts_active_at_full_score() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);

    let session = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();

    assert_eq!(session.integrity_score, 100);
    assert_eq!(session.status, SessionStatus::Active);
    assert!(session.ended_at.is_none());

    let events = controller
        .list_events(&session.id, EventOrder::Insertion)
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn deductions_follow_the_severity_schedule() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);
    let session = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();

    let incidents = [
        (EventType::NoFace, Severity::High, 90),
        (EventType::LookingAway, Severity::Medium, 85),
        (EventType::LookingAway, Severity::Medium, 80),
        (EventType::BookDetected, Severity::Low, 78),
    ];

    for (event_type, severity, expected_score) in incidents {
        let (_, score) = controller
            .record_incident(&session.id, NewEvent::new(event_type, severity, "incident"))
            .await
            .unwrap();
        assert_eq!(score, expected_score);
    }

    let report = controller.report(&session.id).await.unwrap();
    assert_eq!(report.integrity_score, 78);
    assert_eq!(report.summary.total_events, 4);
    assert_eq!(report.summary.high_severity_events, 1);
    assert_eq!(report.summary.medium_severity_events, 2);
    assert_eq!(report.summary.low_severity_events, 1);
}

#[tokio::test]
async fn incremental_score_matches_batch_recomputation() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);
    let session = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();

    let severities = [
        Severity::Low,
        Severity::High,
        Severity::Medium,
        Severity::High,
        Severity::Low,
    ];
    let mut last_score = 100;
    for severity in severities {
        let (_, score) = controller
            .record_incident(
                &session.id,
                NewEvent::new(EventType::FocusLost, severity, "incident"),
            )
            .await
            .unwrap();
        last_score = score;
    }

    let total: u32 = severities.iter().map(|s| s.deduction()).sum();
    assert_eq!(last_score, 100u32.saturating_sub(total));
    assert_eq!(
        controller.get_session(&session.id).await.unwrap().integrity_score,
        last_score
    );
}

#[tokio::test]
async fn score_floors_at_zero() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);
    let session = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();

    let mut final_score = 100;
    for _ in 0..12 {
        let (_, score) = controller
            .record_incident(
                &session.id,
                NewEvent::new(EventType::MultipleFaces, Severity::High, "incident"),
            )
            .await
            .unwrap();
        final_score = score;
    }

    assert_eq!(final_score, 0);
    let report = controller.report(&session.id).await.unwrap();
    assert_eq!(report.integrity_score, 0);
    assert_eq!(report.summary.total_events, 12);
}

#[tokio::test]
async fn end_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);
    let session = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();

    controller
        .record_incident(
            &session.id,
            NewEvent::new(EventType::NoFace, Severity::High, "incident"),
        )
        .await
        .unwrap();

    let first = controller.end_session(&session.id, None).await.unwrap();
    let second = controller.end_session(&session.id, None).await.unwrap();

    assert_eq!(first.status, SessionStatus::Ended);
    assert_eq!(first.ended_at, second.ended_at);
    assert_eq!(first.integrity_score, second.integrity_score);
    assert_eq!(second.integrity_score, 90);
}

#[tokio::test]
async fn ended_session_rejects_events_without_mutation() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);
    let session = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();

    controller
        .record_incident(
            &session.id,
            NewEvent::new(EventType::LookingAway, Severity::Medium, "incident"),
        )
        .await
        .unwrap();
    controller.end_session(&session.id, None).await.unwrap();

    let err = controller
        .record_incident(
            &session.id,
            NewEvent::new(EventType::NoFace, Severity::High, "incident"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VigilError::SessionEnded(_)));

    // Neither ledger nor score moved.
    let session = controller.get_session(&session.id).await.unwrap();
    assert_eq!(session.integrity_score, 95);
    let events = controller
        .list_events(&session.id, EventOrder::Insertion)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn client_final_score_override_wins() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);
    let session = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();

    controller
        .record_incident(
            &session.id,
            NewEvent::new(EventType::NoFace, Severity::High, "incident"),
        )
        .await
        .unwrap();

    let ended = controller.end_session(&session.id, Some(85)).await.unwrap();
    assert_eq!(ended.integrity_score, 85);

    // The override from the first end sticks on retry.
    let again = controller.end_session(&session.id, Some(40)).await.unwrap();
    assert_eq!(again.integrity_score, 85);
}

#[tokio::test]
async fn unknown_session_fails_operations_but_not_event_listing() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);

    let err = controller.get_session("nope").await.unwrap_err();
    assert!(matches!(err, VigilError::SessionNotFound(_)));

    let err = controller.report("nope").await.unwrap_err();
    assert!(matches!(err, VigilError::SessionNotFound(_)));

    let err = controller
        .record_incident("nope", NewEvent::new(EventType::NoFace, Severity::High, "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, VigilError::SessionNotFound(_)));

    let err = controller.end_session("nope", None).await.unwrap_err();
    assert!(matches!(err, VigilError::SessionNotFound(_)));

    // Listing an unknown session's ledger is empty, not an error.
    let events = controller
        .list_events("nope", EventOrder::ReverseInsertion)
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn ledger_supports_both_retrieval_orders() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);
    let session = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();

    for description in ["first", "second", "third"] {
        controller
            .record_incident(
                &session.id,
                NewEvent::new(EventType::FocusLost, Severity::Low, description),
            )
            .await
            .unwrap();
    }

    let forward = controller
        .list_events(&session.id, EventOrder::Insertion)
        .await
        .unwrap();
    let descriptions: Vec<_> = forward.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions, vec!["first", "second", "third"]);

    let reverse = controller
        .list_events(&session.id, EventOrder::ReverseInsertion)
        .await
        .unwrap();
    let descriptions: Vec<_> = reverse.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn sessions_list_newest_first() {
    let dir = TempDir::new().unwrap();
    let controller = open_controller(&dir);

    let first = controller
        .create_session("Ada", "Grace", "Engineer")
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let second = controller
        .create_session("Alan", "Grace", "Engineer")
        .await
        .unwrap();

    let sessions = controller.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, second.id);
    assert_eq!(sessions[1].id, first.id);
}

#[tokio::test]
async fn sessions_survive_store_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vigil.sqlite3");

    let session_id = {
        let controller = SessionController::new(Database::new(path.clone()).unwrap());
        let session = controller
            .create_session("Ada", "Grace", "Engineer")
            .await
            .unwrap();
        controller
            .record_incident(
                &session.id,
                NewEvent::new(EventType::PhoneDetected, Severity::Medium, "Phone"),
            )
            .await
            .unwrap();
        session.id
    };

    let controller = SessionController::new(Database::new(path).unwrap());
    let session = controller.get_session(&session_id).await.unwrap();
    assert_eq!(session.integrity_score, 95);
    let events = controller
        .list_events(&session_id, EventOrder::Insertion)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::PhoneDetected);
}
