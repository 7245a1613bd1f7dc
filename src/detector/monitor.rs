//! Polling monitor with edge-triggered meeting start/end detection.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::AppCommand;

use super::probe::ActivityProbe;
use super::registry::{match_processes, match_windows, MeetingApp};

/// An observed transition between detection states.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Edge {
    Started(String),
    Ended,
}

/// Tracks the last detected app and reports only transitions.
#[derive(Debug, Default)]
struct EdgeDetector {
    last_detected: Option<String>,
}

impl EdgeDetector {
    /// Compare a tick's detection against the previous one. Emits only on
    /// none-to-name and name-to-none transitions; a name change without a
    /// gap is not an edge. The stored state updates unconditionally.
    fn observe(&mut self, detected: Option<String>) -> Option<Edge> {
        let edge = match (&self.last_detected, &detected) {
            (None, Some(app)) => Some(Edge::Started(app.clone())),
            (Some(_), None) => Some(Edge::Ended),
            _ => None,
        };
        self.last_detected = detected;
        edge
    }
}

/// Runs one detection pass. Probe errors degrade to the process-only
/// fallback, and a fallback error degrades to "no meeting"; nothing here
/// may take down the polling loop.
async fn detect_tick(probe: &dyn ActivityProbe, registry: &[MeetingApp]) -> Option<String> {
    match probe.list_windows().await {
        Ok(windows) => match_windows(registry, &windows),
        Err(e) => {
            debug!("Window probe failed, using process fallback: {e:#}");
            match probe.list_processes().await {
                Ok(processes) => match_processes(registry, &processes),
                Err(e) => {
                    debug!("Process probe failed: {e:#}");
                    None
                }
            }
        }
    }
}

/// Polls the activity probe and reports meeting start/end edges onto the
/// app command channel.
pub struct MeetingActivityMonitor {
    probe: Arc<dyn ActivityProbe>,
    registry: Arc<Vec<MeetingApp>>,
    poll_interval: Duration,
    commands: mpsc::Sender<AppCommand>,
    task: Option<JoinHandle<()>>,
}

impl MeetingActivityMonitor {
    pub fn new(
        probe: Arc<dyn ActivityProbe>,
        registry: Vec<MeetingApp>,
        poll_interval: Duration,
        commands: mpsc::Sender<AppCommand>,
    ) -> Self {
        Self {
            probe,
            registry: Arc::new(registry),
            poll_interval,
            commands,
            task: None,
        }
    }

    /// Begin polling. Calling while already running is a no-op.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let probe = Arc::clone(&self.probe);
        let registry = Arc::clone(&self.registry);
        let commands = self.commands.clone();
        let poll_interval = self.poll_interval;

        info!(
            "Meeting detection polling every {}ms",
            poll_interval.as_millis()
        );

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            let mut edges = EdgeDetector::default();

            loop {
                ticker.tick().await;

                let detected = detect_tick(probe.as_ref(), &registry).await;
                let command = match edges.observe(detected) {
                    Some(Edge::Started(app_name)) => {
                        info!("Meeting activity detected: {app_name}");
                        Some(AppCommand::MeetingDetected { app_name })
                    }
                    Some(Edge::Ended) => {
                        info!("Meeting activity ended");
                        Some(AppCommand::MeetingVanished)
                    }
                    None => None,
                };

                if let Some(command) = command {
                    if commands.send(command).await.is_err() {
                        warn!("App command channel closed, stopping meeting detection");
                        break;
                    }
                }
            }
        }));
    }

    /// Halt polling. Calling while stopped is a no-op.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Meeting detection stopped");
        }
    }
}

impl Drop for MeetingActivityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
