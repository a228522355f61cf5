use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::Config;
use crate::remote::{HttpRemoteClient, RemoteClient, RemoteError, RemoteSession};
use crate::snapshot::SessionSnapshot;
use crate::store::{FileSnapshotStore, SnapshotStore};

/// Messages the sync worker sends back to the event thread. The worker never
/// touches tracker state itself; the tracker drains these on `tick()`.
#[derive(Debug)]
pub enum SyncNotice {
    /// No session was active and the remote side supplied one to load.
    Hydrated(RemoteSession),
    /// The dashboard switched to a different session than the one we track.
    SessionSwitched(RemoteSession),
    /// The tracked session was deleted from the dashboard.
    Deactivated,
}

/// Background persistence/sync gateway.
///
/// Snapshots are handed over through a bounded single-slot channel: at most
/// one job waits while one is in flight, and further triggers are dropped.
/// That is the intended backpressure: sync re-serializes full state each
/// time, so a dropped trigger only means staleness until the next mutation
/// or heartbeat. The worker's receive timeout doubles as the heartbeat
/// timer.
pub struct SyncService {
    tx: Option<SyncSender<SessionSnapshot>>,
    notices: Receiver<SyncNotice>,
    handle: Option<JoinHandle<()>>,
}

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(30);

impl SyncService {
    pub fn start(
        store: Box<dyn SnapshotStore>,
        remote: Box<dyn RemoteClient>,
        heartbeat: Duration,
        upload_enabled: bool,
    ) -> Self {
        let (tx, rx) = mpsc::sync_channel(1);
        let (notice_tx, notices) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            worker_loop(rx, notice_tx, store, remote, heartbeat, upload_enabled)
        });
        Self {
            tx: Some(tx),
            notices,
            handle: Some(handle),
        }
    }

    /// Production wiring: file store under the app data dir, HTTP client
    /// against the configured dashboard, heartbeat and upload toggle from
    /// the user's config.
    pub fn from_config(config: &Config) -> Result<Self, RemoteError> {
        let remote = HttpRemoteClient::new(config.server_url.clone())?;
        Ok(Self::start(
            Box::new(FileSnapshotStore::new()),
            Box::new(remote),
            Duration::from_secs(config.heartbeat_secs),
            config.upload_enabled,
        ))
    }

    /// Fire-and-forget trigger. Returns false when the slot was full and the
    /// snapshot was dropped.
    pub fn push(&self, snapshot: SessionSnapshot) -> bool {
        match self.tx.as_ref().expect("sync sender present").try_send(snapshot) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("sync already in flight, trigger skipped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("sync worker gone, trigger dropped");
                false
            }
        }
    }

    /// Blocking hand-off for the one snapshot that has no later trigger to
    /// fall back on: the final flush when a session ends.
    pub fn push_blocking(&self, snapshot: SessionSnapshot) {
        if self
            .tx
            .as_ref()
            .expect("sync sender present")
            .send(snapshot)
            .is_err()
        {
            log::warn!("sync worker gone, final flush dropped");
        }
    }

    /// Next pending notice from the worker, if any. Non-blocking.
    pub fn poll_notice(&self) -> Option<SyncNotice> {
        self.notices.try_recv().ok()
    }
}

impl Drop for SyncService {
    fn drop(&mut self) {
        // Disconnecting the channel is the shutdown signal.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    rx: Receiver<SessionSnapshot>,
    notices: mpsc::Sender<SyncNotice>,
    store: Box<dyn SnapshotStore>,
    mut remote: Box<dyn RemoteClient>,
    heartbeat: Duration,
    upload_enabled: bool,
) {
    // Last session the worker has seen, for heartbeats between triggers.
    let mut session_id: Option<String> = None;
    let mut session_active = false;

    loop {
        match rx.recv_timeout(heartbeat) {
            Ok(snapshot) => {
                session_id = Some(snapshot.session_id.clone());
                session_active = snapshot.is_active();

                if let Err(err) = store.save(&snapshot) {
                    log::warn!("session file save failed: {err}");
                }
                if !upload_enabled {
                    // Uploads disabled: sessions stay on disk only.
                    continue;
                }
                if !snapshot.is_active() {
                    // Completed sessions are flushed to disk only.
                    continue;
                }

                // The dashboard may have switched or deleted the session
                // behind our back; check before uploading.
                match remote.fetch_active() {
                    Ok(Some(active)) if active.session_id != snapshot.session_id => {
                        log::info!("remote switched to {}", active.session_id);
                        session_active = false;
                        let _ = notices.send(SyncNotice::SessionSwitched(active));
                    }
                    Ok(Some(_)) => {
                        if let Err(err) = remote.upload(&snapshot) {
                            log::warn!("upload failed, will retry on next trigger: {err}");
                        }
                    }
                    Ok(None) => {
                        log::info!("session deleted from dashboard, stopping uploads");
                        session_active = false;
                        let _ = notices.send(SyncNotice::Deactivated);
                    }
                    Err(err) => {
                        log::warn!("active-session check failed: {err}");
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !upload_enabled {
                    continue;
                }
                if let Some(id) = &session_id {
                    if let Err(err) = remote.heartbeat(id) {
                        log::debug!("heartbeat failed: {err}");
                    }
                }
                if !session_active {
                    match remote.fetch_active() {
                        Ok(Some(active)) => {
                            session_id = Some(active.session_id.clone());
                            session_active = true;
                            let _ = notices.send(SyncNotice::Hydrated(active));
                        }
                        Ok(None) => {}
                        Err(err) => log::debug!("active-session retry failed: {err}"),
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
