//! Live monitoring loop: drives detector frames through the debouncer and
//! into the session controller.
//!
//! The loop is frame-paced, not tick-paced: it polls the source as frames
//! become available and yields to the scheduler in between. Detector
//! failures are logged and skipped; a frame that fails to produce an
//! observation is simply a frame with nothing observed.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::detection::{DetectionConfig, FrameSource, IncidentDebouncer};
use crate::error::VigilError;
use crate::models::{Alert, AlertFeed};

use super::controller::SessionController;

pub struct ProctorMonitor {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    alerts: Arc<Mutex<AlertFeed>>,
}

impl ProctorMonitor {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            alerts: Arc::new(Mutex::new(AlertFeed::new())),
        }
    }

    /// Live alerts raised by the running monitor, newest first.
    pub fn alerts(&self) -> Arc<Mutex<AlertFeed>> {
        Arc::clone(&self.alerts)
    }

    pub fn start_monitoring<S>(
        &mut self,
        session_id: String,
        source: S,
        controller: SessionController,
        config: DetectionConfig,
    ) -> Result<()>
    where
        S: FrameSource + 'static,
    {
        if self.handle.is_some() {
            bail!("monitoring already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();
        let alerts = Arc::clone(&self.alerts);

        let handle = tokio::spawn(monitor_loop(
            session_id,
            source,
            controller,
            config,
            token_clone,
            alerts,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Wait for the loop to finish on its own (frame source exhausted or
    /// session ended) without cancelling it.
    pub async fn wait(&mut self) -> Result<()> {
        self.cancel_token.take();
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    pub async fn stop_monitoring(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for ProctorMonitor {
    fn default() -> Self {
        Self::new()
    }
}

async fn monitor_loop<S: FrameSource>(
    session_id: String,
    mut source: S,
    controller: SessionController,
    config: DetectionConfig,
    cancel_token: CancellationToken,
    alerts: Arc<Mutex<AlertFeed>>,
) {
    let mut debouncer = IncidentDebouncer::new(config);

    loop {
        if cancel_token.is_cancelled() {
            info!("monitor loop for session {session_id} shutting down");
            break;
        }

        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("frame source exhausted for session {session_id}");
                break;
            }
            Err(err) => {
                // Degrade to "nothing observed this frame"; a flaky
                // detector must not corrupt session bookkeeping.
                warn!("detector failure for session {session_id}, skipping frame: {err:?}");
                tokio::task::yield_now().await;
                continue;
            }
        };

        for incident in debouncer.observe(&frame) {
            match controller.record_incident(&session_id, incident).await {
                Ok((event, _score)) => {
                    alerts.lock().await.push(Alert::from_event(&event));
                }
                Err(VigilError::SessionEnded(_)) => {
                    info!("session {session_id} ended, stopping monitor");
                    return;
                }
                Err(err) => {
                    // Surfaced operationally only; the live session keeps
                    // going without the missed event.
                    error!("failed to record incident for session {session_id}: {err}");
                }
            }
        }

        tokio::task::yield_now().await;
    }
}
