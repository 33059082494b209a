//! SQLite-backed session and event store.
//!
//! A dedicated worker thread owns the connection; callers submit closures
//! over a channel and await the result on a oneshot. Because every
//! operation runs serialized on that one thread, the check-then-write in
//! [`Database::append_event`] and [`Database::end_session`] is atomic
//! against concurrent session termination without extra locking.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::oneshot;
use uuid::Uuid;

mod migrations;

use migrations::run_migrations;

use crate::error::VigilError;
use crate::models::{
    event_type_from_str, severity_from_str, DetectionEvent, EventMetadata, NewEvent, Session,
    SessionStatus,
};

/// Retrieval order for a session's event ledger. Storage order is append
/// order; live UIs read most-recent-first, statistics consumers must not
/// depend on order at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrder {
    Insertion,
    ReverseInsertion,
}

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn status_from_str(value: &str) -> Result<SessionStatus> {
    match value {
        "Active" => Ok(SessionStatus::Active),
        "Ended" => Ok(SessionStatus::Ended),
        _ => Err(anyhow!("unknown session status '{value}'")),
    }
}

fn score_from_i64(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("integrity score {value} is negative"))
}

fn row_to_session(row: &Row) -> Result<Session> {
    let status: String = row.get("status")?;
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let score: i64 = row.get("integrity_score")?;

    Ok(Session {
        id: row.get("id")?,
        candidate_name: row.get("candidate_name")?,
        interviewer_name: row.get("interviewer_name")?,
        position: row.get("position")?,
        status: status_from_str(&status)?,
        integrity_score: score_from_i64(score)?,
        started_at: parse_datetime(&started_at)?,
        ended_at: ended_at.map(|s| parse_datetime(&s)).transpose()?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

fn row_to_event(row: &Row) -> Result<DetectionEvent> {
    let event_type: String = row.get("event_type")?;
    let severity: String = row.get("severity")?;
    let timestamp: String = row.get("timestamp")?;
    let metadata: Option<String> = row.get("metadata")?;

    Ok(DetectionEvent {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        event_type: event_type_from_str(&event_type)
            .ok_or_else(|| anyhow!("unknown event type '{event_type}'"))?,
        severity: severity_from_str(&severity)
            .ok_or_else(|| anyhow!("unknown severity '{severity}'"))?,
        description: row.get("description")?,
        confidence: row.get("confidence")?,
        timestamp: parse_datetime(&timestamp)?,
        metadata: match metadata {
            Some(raw) => serde_json::from_str::<EventMetadata>(&raw)
                .with_context(|| "invalid event metadata JSON")?,
            None => EventMetadata::new(),
        },
    })
}

const SESSION_COLUMNS: &str = "id, candidate_name, interviewer_name, position, status, \
     integrity_score, started_at, ended_at, created_at, updated_at";

const EVENT_COLUMNS: &str =
    "id, session_id, event_type, severity, description, confidence, timestamp, metadata";

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("vigil-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.as_path().display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_session(&self, session: &Session) -> Result<(), VigilError> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, candidate_name, interviewer_name, position, status,
                                       integrity_score, started_at, ended_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id,
                    record.candidate_name,
                    record.interviewer_name,
                    record.position,
                    record.status.as_str(),
                    record.integrity_score as i64,
                    record.started_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(())
        })
        .await
        .map_err(VigilError::from)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session, VigilError> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;

            let session = stmt
                .query_row(params![session_id.clone()], |row| {
                    Ok(row_to_session(row))
                })
                .optional()?
                .transpose()?;

            session.ok_or_else(|| anyhow::Error::new(VigilError::SessionNotFound(session_id)))
        })
        .await
        .map_err(VigilError::from)
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>, VigilError> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY started_at DESC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }

            Ok(sessions)
        })
        .await
        .map_err(VigilError::from)
    }

    /// Append an event to a session's ledger and apply its score deduction
    /// as one transaction. Fails with `SessionNotFound` / `SessionEnded`
    /// without mutating anything; an ended session accepts no events.
    ///
    /// Returns the stored event and the post-deduction score.
    pub async fn append_event(
        &self,
        session_id: &str,
        event: NewEvent,
    ) -> Result<(DetectionEvent, u32), VigilError> {
        let session_id = session_id.to_string();
        let now = Utc::now();

        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let current: Option<(String, i64)> = tx
                .query_row(
                    "SELECT status, integrity_score FROM sessions WHERE id = ?1",
                    params![session_id.clone()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (status, score) = match current {
                Some(pair) => pair,
                None => {
                    return Err(anyhow::Error::new(VigilError::SessionNotFound(session_id)))
                }
            };

            if status_from_str(&status)? == SessionStatus::Ended {
                return Err(anyhow::Error::new(VigilError::SessionEnded(session_id)));
            }

            let stored = DetectionEvent {
                id: Uuid::new_v4().to_string(),
                session_id: session_id.clone(),
                event_type: event.event_type,
                severity: event.severity,
                description: event.description,
                confidence: event.confidence,
                timestamp: event.timestamp.unwrap_or(now),
                metadata: event.metadata,
            };

            let metadata_json = if stored.metadata.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&stored.metadata)?)
            };

            tx.execute(
                &format!("INSERT INTO events ({EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    stored.id,
                    stored.session_id,
                    stored.event_type.as_str(),
                    stored.severity.as_str(),
                    stored.description,
                    stored.confidence,
                    stored.timestamp.to_rfc3339(),
                    metadata_json,
                ],
            )
            .with_context(|| "failed to insert event")?;

            let new_score = score_from_i64(score)?.saturating_sub(stored.severity.deduction());

            tx.execute(
                "UPDATE sessions SET integrity_score = ?1, updated_at = ?2 WHERE id = ?3",
                params![new_score as i64, now.to_rfc3339(), stored.session_id],
            )
            .with_context(|| "failed to apply score deduction")?;

            tx.commit()?;
            Ok((stored, new_score))
        })
        .await
        .map_err(VigilError::from)
    }

    /// List a session's ledger. An unknown session yields an empty list so
    /// report generation stays idempotent before any events exist.
    pub async fn list_events(
        &self,
        session_id: &str,
        order: EventOrder,
    ) -> Result<Vec<DetectionEvent>, VigilError> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let direction = match order {
                EventOrder::Insertion => "ASC",
                EventOrder::ReverseInsertion => "DESC",
            };
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM events
                 WHERE session_id = ?1
                 ORDER BY rowid {direction}"
            ))?;

            let mut rows = stmt.query(params![session_id])?;
            let mut events = Vec::new();
            while let Some(row) = rows.next()? {
                events.push(row_to_event(row)?);
            }

            Ok(events)
        })
        .await
        .map_err(VigilError::from)
    }

    /// Transition a session to Ended. Idempotent: a session that has
    /// already ended is returned unchanged, so retried end requests settle
    /// on the same final state. A caller-supplied final score overwrites
    /// the accumulated score.
    pub async fn end_session(
        &self,
        session_id: &str,
        ended_at: DateTime<Utc>,
        final_score: Option<u32>,
    ) -> Result<Session, VigilError> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let session = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
                ))?;
                stmt.query_row(params![session_id.clone()], |row| Ok(row_to_session(row)))
                    .optional()?
                    .transpose()?
            };

            let mut session = match session {
                Some(session) => session,
                None => {
                    return Err(anyhow::Error::new(VigilError::SessionNotFound(session_id)))
                }
            };

            if session.is_ended() {
                tx.commit()?;
                return Ok(session);
            }

            let score = final_score.unwrap_or(session.integrity_score).min(100);

            tx.execute(
                "UPDATE sessions
                 SET status = ?1,
                     integrity_score = ?2,
                     ended_at = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    SessionStatus::Ended.as_str(),
                    score as i64,
                    ended_at.to_rfc3339(),
                    ended_at.to_rfc3339(),
                    session_id,
                ],
            )
            .with_context(|| "failed to end session")?;

            tx.commit()?;

            session.status = SessionStatus::Ended;
            session.integrity_score = score;
            session.ended_at = Some(ended_at);
            session.updated_at = ended_at;
            Ok(session)
        })
        .await
        .map_err(VigilError::from)
    }
}
