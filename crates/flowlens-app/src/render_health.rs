use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Readiness signal exposed by the rendering host.
pub trait MountObserver: Send + Sync {
    /// Number of graph nodes currently materialized by the host.
    fn mounted_node_count(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RenderHealth {
    #[default]
    Pending,
    Healthy,
    Unhealthy,
}

impl RenderHealth {
    pub fn is_settled(&self) -> bool {
        !matches!(self, RenderHealth::Pending)
    }
}

/// Attempt-bounded mount detection, independent of any timer.
#[derive(Debug, Clone)]
pub struct MountProbe {
    attempts: u32,
    max_attempts: u32,
    state: RenderHealth,
}

impl MountProbe {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts: max_attempts.max(1),
            state: RenderHealth::Pending,
        }
    }

    /// Record one poll result. Once settled, further observations are ignored.
    pub fn observe(&mut self, mounted: usize) -> RenderHealth {
        if self.state.is_settled() {
            return self.state;
        }
        self.attempts += 1;
        if mounted > 0 {
            self.state = RenderHealth::Healthy;
        } else if self.attempts >= self.max_attempts {
            self.state = RenderHealth::Unhealthy;
        }
        self.state
    }

    pub fn state(&self) -> RenderHealth {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Polls a [`MountObserver`] on a tokio timer for one committed node set.
///
/// The polling task is aborted by [`stop`](Self::stop) or on drop, so
/// replacing the monitor for a new node set tears the old one down.
pub struct RenderHealthMonitor {
    epoch: u64,
    rx: watch::Receiver<RenderHealth>,
    handle: JoinHandle<()>,
}

impl RenderHealthMonitor {
    /// Must be called from within a tokio runtime.
    pub fn spawn(observer: Arc<dyn MountObserver>, config: MonitorConfig, epoch: u64) -> Self {
        let (tx, rx) = watch::channel(RenderHealth::Pending);
        let handle = tokio::spawn(async move {
            let mut probe = MountProbe::new(config.max_attempts);
            loop {
                tokio::time::sleep(config.poll_interval).await;
                match probe.observe(observer.mounted_node_count()) {
                    RenderHealth::Pending => continue,
                    RenderHealth::Healthy => {
                        tracing::debug!(
                            "Node set {} mounted after {} attempt(s)",
                            epoch,
                            probe.attempts()
                        );
                        let _ = tx.send(RenderHealth::Healthy);
                        break;
                    }
                    RenderHealth::Unhealthy => {
                        tracing::warn!(
                            "Node set {} did not mount after {} attempts; using fallback view",
                            epoch,
                            probe.attempts()
                        );
                        let _ = tx.send(RenderHealth::Unhealthy);
                        break;
                    }
                }
            }
        });

        Self {
            epoch,
            rx,
            handle,
        }
    }

    /// The view store epoch this monitor reports for.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn status(&self) -> RenderHealth {
        *self.rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RenderHealth> {
        self.rx.clone()
    }

    /// Wait for a verdict. Returns `Pending` if the monitor was stopped first.
    pub async fn settled(&self) -> RenderHealth {
        let mut rx = self.rx.clone();
        let settled = rx
            .wait_for(RenderHealth::is_settled)
            .await
            .map(|state| *state);
        settled.unwrap_or_else(|_| *rx.borrow())
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for RenderHealthMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
