//! Run a full proctoring session against the mock detector and print the
//! resulting report.
//!
//! Usage: `mock_session [frames]` (default 2000). Set `RUST_LOG=debug` for
//! verbose output; the store lands in a temp directory unless
//! `VIGIL_DB_PATH` points somewhere else.

use anyhow::Result;
use log::info;

use vigil::{
    Database, DetectionConfig, MockDetector, ProctorMonitor, SessionController,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let frames: u64 = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(2_000);

    let db_path = match std::env::var_os("VIGIL_DB_PATH") {
        Some(path) => path.into(),
        None => std::env::temp_dir().join("vigil-mock.sqlite3"),
    };
    let database = Database::new(db_path)?;
    let controller = SessionController::new(database);

    let session = controller
        .create_session("Mock Candidate", "Mock Interviewer", "Software Engineer")
        .await?;
    info!("Monitoring session {} over {frames} mock frames", session.id);

    // 50 ms between frames approximates a 20 fps detection loop.
    let detector = MockDetector::new(frames, 50);
    let mut monitor = ProctorMonitor::new();
    monitor.start_monitoring(
        session.id.clone(),
        detector,
        controller.clone(),
        DetectionConfig::default(),
    )?;
    monitor.wait().await?;

    let alerts = monitor.alerts();
    info!("Raised {} alerts during the session", alerts.lock().await.len());

    controller.end_session(&session.id, None).await?;

    let report = controller.report(&session.id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
