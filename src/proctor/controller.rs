//! Session lifecycle manager.
//!
//! All ledger and score mutations for a session flow through this
//! controller; it validates incidents before they reach storage and keeps
//! the append + deduction pair atomic by delegating both to a single
//! storage transaction.

use chrono::Utc;
use log::{info, warn};
use uuid::Uuid;

use crate::db::{Database, EventOrder};
use crate::error::{Result, VigilError};
use crate::models::{
    DetectionEvent, NewEvent, Session, SessionStatus, INITIAL_INTEGRITY_SCORE,
};
use crate::report::{build_report, SessionReport};

#[derive(Clone)]
pub struct SessionController {
    db: Database,
}

impl SessionController {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create_session(
        &self,
        candidate_name: &str,
        interviewer_name: &str,
        position: &str,
    ) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            candidate_name: candidate_name.to_string(),
            interviewer_name: interviewer_name.to_string(),
            position: position.to_string(),
            status: SessionStatus::Active,
            integrity_score: INITIAL_INTEGRITY_SCORE,
            started_at: now,
            ended_at: None,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_session(&session).await?;
        info!("Created session {} for {}", session.id, session.candidate_name);
        Ok(session)
    }

    /// Record one incident: validate, append to the ledger, and apply the
    /// severity deduction as one unit. Returns the stored event and the
    /// post-deduction score.
    pub async fn record_incident(
        &self,
        session_id: &str,
        incident: NewEvent,
    ) -> Result<(DetectionEvent, u32)> {
        validate_incident(&incident)?;

        let (event, score) = self.db.append_event(session_id, incident).await?;
        info!(
            "Session {session_id}: {} ({}), score now {score}",
            event.event_type.as_str(),
            event.severity.as_str(),
        );
        Ok((event, score))
    }

    /// End a session. Idempotent: ending an already-ended session returns
    /// its existing final state. A caller-supplied score overwrites the
    /// accumulated one (the live UI tracks its own copy); divergence
    /// between the two is logged, not reconciled.
    pub async fn end_session(
        &self,
        session_id: &str,
        final_score_override: Option<u32>,
    ) -> Result<Session> {
        if let Some(override_score) = final_score_override {
            let current = self.db.get_session(session_id).await?;
            if !current.is_ended() && current.integrity_score != override_score {
                warn!(
                    "Session {session_id}: client final score {override_score} diverges from \
                     accumulated score {}",
                    current.integrity_score
                );
            }
        }

        let session = self
            .db
            .end_session(session_id, Utc::now(), final_score_override)
            .await?;
        info!(
            "Session {session_id} ended with integrity score {}",
            session.integrity_score
        );
        Ok(session)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.db.get_session(session_id).await
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.db.list_sessions().await
    }

    pub async fn list_events(
        &self,
        session_id: &str,
        order: EventOrder,
    ) -> Result<Vec<DetectionEvent>> {
        self.db.list_events(session_id, order).await
    }

    /// Build a report over the session's current ledger snapshot. Works
    /// for live sessions (partial report) and ended ones alike.
    pub async fn report(&self, session_id: &str) -> Result<SessionReport> {
        let session = self.db.get_session(session_id).await?;
        let events = self
            .db
            .list_events(session_id, EventOrder::ReverseInsertion)
            .await?;
        Ok(build_report(&session, &events, Utc::now()))
    }
}

fn validate_incident(incident: &NewEvent) -> Result<()> {
    if incident.description.trim().is_empty() {
        return Err(VigilError::Validation(
            "event description must not be empty".into(),
        ));
    }
    if let Some(confidence) = incident.confidence {
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(VigilError::Validation(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventType, Severity};

    #[test]
    fn incident_with_out_of_range_confidence_is_rejected() {
        let incident = NewEvent::new(EventType::PhoneDetected, Severity::Medium, "Phone")
            .with_confidence(1.5);
        assert!(matches!(
            validate_incident(&incident),
            Err(VigilError::Validation(_))
        ));
    }

    #[test]
    fn incident_with_blank_description_is_rejected() {
        let incident = NewEvent::new(EventType::NoFace, Severity::High, "   ");
        assert!(matches!(
            validate_incident(&incident),
            Err(VigilError::Validation(_))
        ));
    }

    #[test]
    fn well_formed_incident_passes_validation() {
        let incident = NewEvent::new(EventType::NoFace, Severity::High, "No face in frame")
            .with_confidence(0.9);
        assert!(validate_incident(&incident).is_ok());
    }
}
