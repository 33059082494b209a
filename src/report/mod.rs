//! End-of-session report builder.
//!
//! Pure function over a session snapshot and its ledger; repeatable at any
//! point during or after a session. The output shape, field names, and the
//! four recommendation bands are a stable contract consumed by exporters
//! and dashboards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{DetectionEvent, EventType, Session, SessionStatus, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSessionInfo {
    pub id: String,
    pub candidate_name: String,
    pub interviewer_name: String,
    pub position: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Whole minutes, standard rounding (ties round up).
    #[serde(rename = "duration")]
    pub duration_minutes: i64,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_events: u32,
    pub high_severity_events: u32,
    pub medium_severity_events: u32,
    pub low_severity_events: u32,
    /// Always contains every event type; absent categories stay at zero.
    pub events_by_type: BTreeMap<EventType, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_info: ReportSessionInfo,
    pub integrity_score: u32,
    pub summary: ReportSummary,
    /// Latest first, regardless of ledger storage order.
    pub detailed_events: Vec<DetectionEvent>,
    pub recommendations: Vec<String>,
}

pub fn build_report(
    session: &Session,
    events: &[DetectionEvent],
    now: DateTime<Utc>,
) -> SessionReport {
    let duration_ms = (session.ended_at.unwrap_or(now) - session.started_at).num_milliseconds();
    let duration_minutes = (duration_ms as f64 / 1_000.0 / 60.0).round() as i64;

    let mut events_by_type: BTreeMap<EventType, u32> =
        EventType::ALL.iter().map(|t| (*t, 0)).collect();
    let mut high = 0u32;
    let mut medium = 0u32;
    let mut low = 0u32;

    for event in events {
        *events_by_type.entry(event.event_type).or_insert(0) += 1;
        match event.severity {
            Severity::High => high += 1,
            Severity::Medium => medium += 1,
            Severity::Low => low += 1,
        }
    }

    let mut detailed_events = events.to_vec();
    detailed_events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let recommendations =
        generate_recommendations(session.integrity_score, &events_by_type, high);

    SessionReport {
        session_info: ReportSessionInfo {
            id: session.id.clone(),
            candidate_name: session.candidate_name.clone(),
            interviewer_name: session.interviewer_name.clone(),
            position: session.position.clone(),
            start_time: session.started_at,
            end_time: session.ended_at,
            duration_minutes,
            status: session.status,
        },
        integrity_score: session.integrity_score,
        summary: ReportSummary {
            total_events: events.len() as u32,
            high_severity_events: high,
            medium_severity_events: medium,
            low_severity_events: low,
            events_by_type,
        },
        detailed_events,
        recommendations,
    }
}

fn generate_recommendations(
    integrity_score: u32,
    events_by_type: &BTreeMap<EventType, u32>,
    high_severity_events: u32,
) -> Vec<String> {
    let count = |t: EventType| events_by_type.get(&t).copied().unwrap_or(0);
    let mut recommendations = Vec::new();

    // Exactly one score band fires; the bands partition [0, 100].
    if integrity_score < 50 {
        recommendations
            .push("High risk candidate - Multiple integrity violations detected".to_string());
    } else if integrity_score < 70 {
        recommendations
            .push("Medium risk candidate - Some concerning behaviors observed".to_string());
    } else if integrity_score < 90 {
        recommendations.push("Low risk candidate - Minor issues detected".to_string());
    } else {
        recommendations
            .push("Excellent integrity score - No significant issues detected".to_string());
    }

    if count(EventType::LookingAway) > 5 {
        recommendations.push("Candidate frequently looked away from screen".to_string());
    }

    if count(EventType::MultipleFaces) > 0 {
        recommendations.push("Multiple people detected during interview".to_string());
    }

    if count(EventType::ProhibitedObject) > 0
        || count(EventType::PhoneDetected) > 0
        || count(EventType::BookDetected) > 0
    {
        recommendations.push("Prohibited objects detected (phone, books, notes)".to_string());
    }

    if high_severity_events > 3 {
        recommendations
            .push("Multiple high-severity violations - Consider interview validity".to_string());
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventMetadata;
    use chrono::Duration;

    fn session(score: u32, duration_secs: i64) -> Session {
        let started = Utc::now() - Duration::seconds(duration_secs);
        Session {
            id: "s1".into(),
            candidate_name: "Ada".into(),
            interviewer_name: "Grace".into(),
            position: "Engineer".into(),
            status: SessionStatus::Ended,
            integrity_score: score,
            started_at: started,
            ended_at: Some(started + Duration::seconds(duration_secs)),
            created_at: started,
            updated_at: started,
        }
    }

    fn event(event_type: EventType, severity: Severity, offset_secs: i64) -> DetectionEvent {
        DetectionEvent {
            id: format!("e-{event_type:?}-{offset_secs}"),
            session_id: "s1".into(),
            event_type,
            severity,
            description: "test".into(),
            confidence: None,
            timestamp: Utc::now() + Duration::seconds(offset_secs),
            metadata: EventMetadata::new(),
        }
    }

    #[test]
    fn totals_add_up_and_type_universe_is_complete() {
        let events = vec![
            event(EventType::NoFace, Severity::High, 0),
            event(EventType::LookingAway, Severity::Medium, 1),
            event(EventType::LookingAway, Severity::Medium, 2),
            event(EventType::BookDetected, Severity::Low, 3),
        ];
        let report = build_report(&session(78, 600), &events, Utc::now());

        let summary = &report.summary;
        assert_eq!(summary.total_events, 4);
        assert_eq!(
            summary.total_events,
            summary.high_severity_events
                + summary.medium_severity_events
                + summary.low_severity_events
        );
        assert_eq!(summary.events_by_type.len(), EventType::ALL.len());
        assert_eq!(
            summary.events_by_type.values().sum::<u32>(),
            summary.total_events
        );
        assert_eq!(summary.events_by_type[&EventType::LookingAway], 2);
        assert_eq!(summary.events_by_type[&EventType::PhoneDetected], 0);
    }

    #[test]
    fn events_are_sorted_latest_first() {
        let events = vec![
            event(EventType::NoFace, Severity::High, 10),
            event(EventType::LookingAway, Severity::Medium, 30),
            event(EventType::BookDetected, Severity::Low, 20),
        ];
        let report = build_report(&session(80, 600), &events, Utc::now());

        let times: Vec<_> = report
            .detailed_events
            .iter()
            .map(|e| e.timestamp)
            .collect();
        assert!(times.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(report.detailed_events[0].event_type, EventType::LookingAway);
    }

    #[test]
    fn duration_uses_standard_rounding() {
        // 90 seconds is 1.5 minutes; ties round up.
        let report = build_report(&session(100, 90), &[], Utc::now());
        assert_eq!(report.session_info.duration_minutes, 2);

        let report = build_report(&session(100, 80), &[], Utc::now());
        assert_eq!(report.session_info.duration_minutes, 1);
    }

    #[test]
    fn live_session_duration_runs_to_now() {
        let mut live = session(100, 0);
        live.status = SessionStatus::Active;
        live.ended_at = None;
        live.started_at = Utc::now() - Duration::seconds(300);
        let report = build_report(&live, &[], Utc::now());
        assert_eq!(report.session_info.duration_minutes, 5);
    }

    #[test]
    fn exactly_one_score_band_fires() {
        for (score, expected) in [
            (0, "High risk"),
            (49, "High risk"),
            (50, "Medium risk"),
            (69, "Medium risk"),
            (70, "Low risk"),
            (89, "Low risk"),
            (90, "Excellent"),
            (100, "Excellent"),
        ] {
            let report = build_report(&session(score, 60), &[], Utc::now());
            assert_eq!(report.recommendations.len(), 1, "score {score}");
            assert!(
                report.recommendations[0].starts_with(expected),
                "score {score}: got {:?}",
                report.recommendations[0]
            );
        }
    }

    #[test]
    fn band_and_notes_combine() {
        let events = vec![
            event(EventType::MultipleFaces, Severity::High, 0),
            event(EventType::MultipleFaces, Severity::High, 1),
        ];
        let report = build_report(&session(45, 600), &events, Utc::now());

        assert!(report.recommendations[0].starts_with("High risk"));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r == "Multiple people detected during interview"));
    }

    #[test]
    fn prohibited_object_note_covers_all_three_types() {
        for event_type in [
            EventType::PhoneDetected,
            EventType::BookDetected,
            EventType::ProhibitedObject,
        ] {
            let events = vec![event(event_type, Severity::Medium, 0)];
            let report = build_report(&session(95, 60), &events, Utc::now());
            assert!(
                report
                    .recommendations
                    .iter()
                    .any(|r| r.starts_with("Prohibited objects detected")),
                "{event_type:?}"
            );
        }
    }

    #[test]
    fn many_high_severity_events_flag_interview_validity() {
        let events: Vec<_> = (0..4)
            .map(|i| event(EventType::NoFace, Severity::High, i))
            .collect();
        let report = build_report(&session(60, 600), &events, Utc::now());
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("Consider interview validity")));
    }

    #[test]
    fn frequent_looking_away_needs_more_than_five() {
        let events: Vec<_> = (0..5)
            .map(|i| event(EventType::LookingAway, Severity::Medium, i))
            .collect();
        let report = build_report(&session(75, 600), &events, Utc::now());
        assert!(!report
            .recommendations
            .iter()
            .any(|r| r.contains("frequently looked away")));

        let events: Vec<_> = (0..6)
            .map(|i| event(EventType::LookingAway, Severity::Medium, i))
            .collect();
        let report = build_report(&session(70, 600), &events, Utc::now());
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("frequently looked away")));
    }

    #[test]
    fn report_serializes_with_contract_field_names() {
        let report = build_report(&session(78, 120), &[], Utc::now());
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["sessionInfo"]["duration"].is_i64());
        assert!(json["integrityScore"].is_u64());
        assert!(json["summary"]["eventsByType"]["no_face"].is_u64());
        assert!(json["detailedEvents"].is_array());
        assert!(json["recommendations"].is_array());
    }
}
