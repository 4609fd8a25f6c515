//! Single-process browser session with exclusive access, health checks,
//! restart and idle shutdown.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped ──acquire──▶ Starting ──ok──▶ Running ──idle / shutdown──▶ Stopped
//!    ▲                    │               │
//!    └──── launch error ──┘               └─ probe failed: teardown, Starting
//! ```
//!
//! Access to the surface goes through a capacity-1 admission slot
//! ([`Semaphore`]). The permit lives in the [`SessionLease`], so the slot is
//! released on every exit path, including a panic unwinding through the
//! caller's steps. Process, surface and idle watcher live behind a separate
//! [`Mutex`] that is only locked by the slot holder, by [`SessionManager::shutdown`]
//! and by the idle watcher; nobody waits for the slot while holding that lock.

use std::{
    fmt,
    future::Future,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    tokio::{
        sync::{Mutex, OwnedSemaphorePermit, Semaphore},
        task::JoinHandle,
        time::Instant,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    error::BrowserError,
    surface::{BrowserBackend, Surface},
    types::BrowserConfig,
};

/// How long `shutdown` waits for in-flight work before tearing down anyway.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
/// Re-check interval of the idle watcher while the slot is busy.
const IDLE_RECHECK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Stopped,
    Starting,
    Running,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
        })
    }
}

/// Timing knobs of a [`SessionManager`].
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub idle_timeout: Duration,
    pub probe_timeout: Duration,
    /// Bound on the best-effort surface reset after each `run`.
    pub reset_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&BrowserConfig::default())
    }
}

impl From<&BrowserConfig> for SessionSettings {
    fn from(cfg: &BrowserConfig) -> Self {
        Self {
            idle_timeout: cfg.idle_timeout(),
            probe_timeout: cfg.probe_timeout(),
            reset_timeout: cfg.navigation_timeout(),
        }
    }
}

/// Lock-free idle deadline, stored as milliseconds since `origin`.
struct IdleClock {
    origin: Instant,
    deadline_ms: AtomicU64,
    timeout: Duration,
}

impl IdleClock {
    fn new(timeout: Duration) -> Self {
        Self {
            origin: Instant::now(),
            deadline_ms: AtomicU64::new(0),
            timeout,
        }
    }

    fn touch(&self) {
        let deadline = self.origin.elapsed() + self.timeout;
        let millis = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
        self.deadline_ms.store(millis, Ordering::Release);
    }

    /// Time left before the deadline, `None` once it has passed.
    fn remaining(&self) -> Option<Duration> {
        let deadline = Duration::from_millis(self.deadline_ms.load(Ordering::Acquire));
        deadline
            .checked_sub(self.origin.elapsed())
            .filter(|left| !left.is_zero())
    }
}

struct Live<B: BrowserBackend> {
    process: B::Process,
    surface: Arc<B::Surface>,
}

struct State<B: BrowserBackend> {
    phase: SessionPhase,
    live: Option<Live<B>>,
    idle_watcher: Option<JoinHandle<()>>,
    /// Bumped on every start so a stale idle watcher never stops a newer
    /// process.
    epoch: u64,
}

struct Inner<B: BrowserBackend> {
    backend: B,
    settings: SessionSettings,
    slot: Arc<Semaphore>,
    state: Mutex<State<B>>,
    idle: IdleClock,
}

/// Owns the one browser process and hands out exclusive access to its
/// surface.
///
/// Cheap to clone; clones share the same session. Call [`shutdown`] before
/// dropping the last handle to stop the process.
///
/// [`shutdown`]: SessionManager::shutdown
pub struct SessionManager<B: BrowserBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: BrowserBackend> Clone for SessionManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Exclusive, healthy access to the surface.
///
/// Dropping the lease resets the idle timer and releases the admission slot.
/// A lease used by a failed [`SessionManager::run`] releases the slot without
/// resetting the timer.
pub struct SessionLease<B: BrowserBackend> {
    surface: Arc<B::Surface>,
    inner: Arc<Inner<B>>,
    touch_on_release: bool,
    _permit: OwnedSemaphorePermit,
}

impl<B: BrowserBackend> SessionLease<B> {
    pub fn surface(&self) -> &B::Surface {
        &self.surface
    }

    /// Owned handle to the surface, for step futures that must be `'static`.
    pub fn shared_surface(&self) -> Arc<B::Surface> {
        Arc::clone(&self.surface)
    }
}

impl<B: BrowserBackend> Drop for SessionLease<B> {
    fn drop(&mut self) {
        // Runs before the permit field is dropped: the deadline is pushed out
        // before anyone else (including the idle watcher) can take the slot.
        if self.touch_on_release {
            self.inner.idle.touch();
        }
    }
}

impl<B: BrowserBackend> SessionManager<B> {
    pub fn new(backend: B, settings: SessionSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                settings,
                slot: Arc::new(Semaphore::new(1)),
                state: Mutex::new(State {
                    phase: SessionPhase::Stopped,
                    live: None,
                    idle_watcher: None,
                    epoch: 0,
                }),
                idle: IdleClock::new(settings.idle_timeout),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Wait for the admission slot, then make sure a healthy session is
    /// running (starting or restarting it as needed).
    ///
    /// Cancellation while waiting returns [`BrowserError::Cancelled`] without
    /// touching the slot. A failed start returns the startup error and leaves
    /// the session stopped; the next call tries again.
    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SessionLease<B>, BrowserError> {
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(BrowserError::Cancelled),
            permit = Arc::clone(&self.inner.slot).acquire_owned() => permit
                .map_err(|_| BrowserError::ConnectionClosed("session slot closed".into()))?,
        };

        let surface = self.inner.ensure_running().await?;
        let lease = SessionLease {
            surface,
            inner: Arc::clone(&self.inner),
            touch_on_release: true,
            _permit: permit,
        };

        if cancel.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }
        Ok(lease)
    }

    /// Acquire, run `steps` against the surface, reset the surface, then
    /// release.
    ///
    /// The reset is best effort and its failure is ignored. A failing or
    /// panicking step sequence still releases the slot. Failures do not
    /// restart the session here; the probe on the next acquire does. Only a
    /// successful run resets the idle timer.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        steps: F,
    ) -> Result<T, BrowserError>
    where
        F: FnOnce(Arc<B::Surface>) -> Fut,
        Fut: Future<Output = Result<T, BrowserError>>,
    {
        let mut lease = self.acquire(cancel).await?;
        let outcome = steps(lease.shared_surface()).await;

        match tokio::time::timeout(self.inner.settings.reset_timeout, lease.surface().reset()).await
        {
            Ok(Ok(())) => {},
            Ok(Err(e)) => debug!(error = %e, "surface reset failed"),
            Err(_) => debug!("surface reset timed out"),
        }

        lease.touch_on_release = outcome.is_ok();
        drop(lease);
        outcome
    }

    /// Stop the process and the idle watcher. Idempotent.
    ///
    /// Waits (bounded) for in-flight work to release the slot first, so a
    /// running step sequence is not torn down underneath its caller. The
    /// manager stays usable: the next acquire starts a fresh process.
    pub async fn shutdown(&self) {
        let permit = tokio::time::timeout(
            SHUTDOWN_GRACE,
            Arc::clone(&self.inner.slot).acquire_owned(),
        )
        .await;
        if permit.is_err() {
            warn!("browser still busy, shutting down anyway");
        }

        let mut state = self.inner.state.lock().await;
        if state.live.is_some() {
            info!("shutting down browser");
        }
        self.inner.teardown_locked(&mut state).await;
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.state.lock().await.phase
    }

    pub async fn is_running(&self) -> bool {
        self.phase().await == SessionPhase::Running
    }
}

impl<B: BrowserBackend> Inner<B> {
    /// Caller holds the admission slot.
    async fn ensure_running(self: &Arc<Self>) -> Result<Arc<B::Surface>, BrowserError> {
        let mut state = self.state.lock().await;

        if let Some(live) = &state.live {
            let surface = Arc::clone(&live.surface);
            if self.probe(&surface).await {
                return Ok(surface);
            }
            warn!("browser failed liveness probe, restarting");
            self.teardown_locked(&mut state).await;
        }

        self.start_locked(&mut state).await
    }

    async fn probe(&self, surface: &B::Surface) -> bool {
        tokio::time::timeout(self.settings.probe_timeout, surface.probe())
            .await
            .unwrap_or(false)
    }

    async fn start_locked(
        self: &Arc<Self>,
        state: &mut State<B>,
    ) -> Result<Arc<B::Surface>, BrowserError> {
        state.phase = SessionPhase::Starting;
        let started = Instant::now();
        info!("starting browser");

        let mut process = match self.backend.launch().await {
            Ok(process) => process,
            Err(e) => {
                state.phase = SessionPhase::Stopped;
                warn!(error = %e, "browser failed to start");
                return Err(as_startup_error(e));
            },
        };

        let surface = match self.backend.open_surface(&mut process).await {
            Ok(surface) => Arc::new(surface),
            Err(e) => {
                self.backend.terminate(process).await;
                state.phase = SessionPhase::Stopped;
                warn!(error = %e, "browser started but its surface did not open");
                return Err(as_startup_error(e));
            },
        };

        state.epoch += 1;
        state.live = Some(Live {
            process,
            surface: Arc::clone(&surface),
        });
        state.phase = SessionPhase::Running;
        self.idle.touch();
        state.idle_watcher = Some(self.spawn_idle_watcher(state.epoch));

        info!(
            epoch = state.epoch,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "browser running"
        );
        Ok(surface)
    }

    async fn teardown_locked(&self, state: &mut State<B>) {
        if let Some(watcher) = state.idle_watcher.take() {
            watcher.abort();
        }
        if let Some(live) = state.live.take() {
            drop(live.surface);
            self.backend.terminate(live.process).await;
        }
        state.phase = SessionPhase::Stopped;
    }

    fn spawn_idle_watcher(self: &Arc<Self>, epoch: u64) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let Some(wait) = Self::idle_wait(&weak) else {
                    return;
                };
                match wait {
                    Some(left) => tokio::time::sleep(left).await,
                    None => {
                        let Some(inner) = weak.upgrade() else {
                            return;
                        };
                        if inner.stop_if_idle(epoch).await {
                            return;
                        }
                        drop(inner);
                        tokio::time::sleep(IDLE_RECHECK).await;
                    },
                }
            }
        })
    }

    /// `None` once the manager is gone, otherwise the time left until idle.
    fn idle_wait(weak: &Weak<Self>) -> Option<Option<Duration>> {
        weak.upgrade().map(|inner| inner.idle.remaining())
    }

    /// Returns `true` when the watcher is done (stopped, or superseded).
    async fn stop_if_idle(&self, epoch: u64) -> bool {
        // Busy: the holder pushes the deadline out when it releases.
        let Ok(_permit) = Arc::clone(&self.slot).try_acquire_owned() else {
            return false;
        };
        if self.idle.remaining().is_some() {
            return false;
        }

        let mut state = self.state.lock().await;
        if state.epoch != epoch || state.live.is_none() {
            return true;
        }
        info!(
            idle_secs = self.settings.idle_timeout.as_secs(),
            "browser idle, shutting down"
        );
        // Detach our own handle so teardown does not abort this task.
        drop(state.idle_watcher.take());
        self.teardown_locked(&mut state).await;
        true
    }
}

fn as_startup_error(err: BrowserError) -> BrowserError {
    if err.is_startup() {
        err
    } else {
        BrowserError::LaunchFailed(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::testing::{MockBackend, MockSurface},
    };

    fn settings(idle_timeout: Duration) -> SessionSettings {
        SessionSettings {
            idle_timeout,
            probe_timeout: Duration::from_millis(100),
            reset_timeout: Duration::from_millis(100),
        }
    }

    fn manager(backend: MockBackend) -> SessionManager<MockBackend> {
        SessionManager::new(backend, settings(Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn starts_lazily() {
        let backend = MockBackend::default();
        let mgr = manager(backend.clone());
        assert_eq!(mgr.phase().await, SessionPhase::Stopped);
        assert_eq!(backend.launches(), 0);

        let cancel = CancellationToken::new();
        let html = mgr
            .run(&cancel, |surface| async move { surface.capture_html().await })
            .await
            .unwrap();
        assert_eq!(html, "<html></html>");
        assert!(mgr.is_running().await);
        assert_eq!(backend.launches(), 1);

        // Healthy session is reused.
        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        assert_eq!(backend.launches(), 1);
        mgr.shutdown().await;
    }

    #[tokio::test]
    async fn surface_is_reset_after_each_run() {
        let backend = MockBackend::default();
        let mgr = manager(backend.clone());
        let cancel = CancellationToken::new();

        mgr.run(&cancel, |surface| async move {
            surface.navigate("https://x.com/i/status/1").await
        })
        .await
        .unwrap();
        let surface = backend.last_surface().unwrap();
        assert_eq!(surface.visited(), vec!["https://x.com/i/status/1"]);
        assert_eq!(surface.resets(), 1);
    }

    #[tokio::test]
    async fn failed_probe_restarts_before_hand_out() {
        let backend = MockBackend::default();
        let mgr = manager(backend.clone());
        let cancel = CancellationToken::new();

        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        backend.last_surface().unwrap().kill();

        // Probe failure is recovered, never reported.
        mgr.run(&cancel, |surface| async move {
            assert!(surface.probe().await);
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(backend.launches(), 2);
        assert_eq!(backend.terminations(), 1);
    }

    #[tokio::test]
    async fn hung_probe_counts_as_dead() {
        let backend = MockBackend::default();
        let mgr = manager(backend.clone());
        let cancel = CancellationToken::new();

        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        backend.last_surface().unwrap().hang_probe();

        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        assert_eq!(backend.launches(), 2);
    }

    #[tokio::test]
    async fn startup_failure_is_reported_and_recoverable() {
        let backend = MockBackend::default();
        backend.fail_next_launches(1);
        let mgr = manager(backend.clone());
        let cancel = CancellationToken::new();

        let err = mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap_err();
        assert!(err.is_startup(), "{err}");
        assert_eq!(mgr.phase().await, SessionPhase::Stopped);

        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        assert!(mgr.is_running().await);
    }

    #[tokio::test]
    async fn surface_open_failure_terminates_process() {
        let backend = MockBackend::default();
        backend.fail_next_surfaces(1);
        let mgr = manager(backend.clone());

        let err = mgr
            .run(&CancellationToken::new(), |_| async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::LaunchFailed(_)));
        assert_eq!(backend.terminations(), 1);
        assert_eq!(mgr.phase().await, SessionPhase::Stopped);
    }

    #[tokio::test]
    async fn persistent_startup_failure_is_never_masked() {
        let backend = MockBackend::default();
        backend.fail_next_launches(3);
        let mgr = manager(backend.clone());
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            let err = mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap_err();
            assert!(err.is_startup());
        }
        assert_eq!(backend.launches(), 3);
    }

    #[tokio::test]
    async fn step_failure_releases_and_keeps_session() {
        let backend = MockBackend::default();
        let mgr = manager(backend.clone());
        let cancel = CancellationToken::new();

        let err = mgr
            .run(&cancel, |_| async {
                Err::<(), _>(BrowserError::Timeout("forced".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Timeout(_)));

        let lease = tokio::time::timeout(Duration::from_secs(1), mgr.acquire(&cancel))
            .await
            .expect("slot released after failure")
            .unwrap();
        drop(lease);
        assert_eq!(backend.launches(), 1);
    }

    #[tokio::test]
    async fn cancelled_while_waiting_leaves_slot_alone() {
        let mgr = manager(MockBackend::default());
        let holder = mgr.acquire(&CancellationToken::new()).await.unwrap();

        let cancel = CancellationToken::new();
        let waiter = {
            let mgr = mgr.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { mgr.acquire(&cancel).await.map(drop) })
        };
        tokio::task::yield_now().await;
        cancel.cancel();
        let err = waiter.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());

        drop(holder);
        let next = tokio::time::timeout(
            Duration::from_secs(1),
            mgr.acquire(&CancellationToken::new()),
        )
        .await
        .expect("slot free after cancelled waiter");
        assert!(next.is_ok());
    }

    #[tokio::test]
    async fn already_cancelled_token_never_touches_surface() {
        let backend = MockBackend::default();
        let mgr = manager(backend.clone());
        let holder = mgr.acquire(&CancellationToken::new()).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = mgr
            .run(&cancel, |_| async { Ok::<_, BrowserError>("steps ran") })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        drop(holder);
    }

    async fn explode(_: Arc<MockSurface>) -> Result<(), BrowserError> {
        panic!("step fault");
    }

    #[tokio::test]
    async fn panicking_steps_release_the_slot() {
        let mgr = manager(MockBackend::default());
        let task = {
            let mgr = mgr.clone();
            tokio::spawn(async move { mgr.run(&CancellationToken::new(), explode).await })
        };
        assert!(task.await.unwrap_err().is_panic());

        let lease = tokio::time::timeout(
            Duration::from_secs(1),
            mgr.acquire(&CancellationToken::new()),
        )
        .await
        .expect("slot released after panic");
        assert!(lease.is_ok());
    }

    #[tokio::test]
    async fn concurrent_runs_are_serialized() {
        let mgr = manager(MockBackend::default());
        let in_section = Arc::new(AtomicU64::new(0));
        let max_seen = Arc::new(AtomicU64::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let mgr = mgr.clone();
                let in_section = Arc::clone(&in_section);
                let max_seen = Arc::clone(&max_seen);
                tokio::spawn(async move {
                    mgr.run(&CancellationToken::new(), |_| async move {
                        let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_section.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_manager_stays_usable() {
        let backend = MockBackend::default();
        let mgr = manager(backend.clone());
        let cancel = CancellationToken::new();

        mgr.shutdown().await;
        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        mgr.shutdown().await;
        mgr.shutdown().await;
        assert_eq!(mgr.phase().await, SessionPhase::Stopped);
        assert_eq!(backend.terminations(), 1);

        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        assert_eq!(backend.launches(), 2);
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timeout_stops_browser() {
        let backend = MockBackend::default();
        let mgr = SessionManager::new(backend.clone(), settings(Duration::from_secs(60)));
        let cancel = CancellationToken::new();

        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(mgr.is_running().await);

        // Use resets the timer.
        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(mgr.is_running().await);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(mgr.phase().await, SessionPhase::Stopped);
        assert_eq!(backend.terminations(), 1);

        // Recreated transparently.
        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        assert_eq!(backend.launches(), 2);
        mgr.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_runs_do_not_reset_idle_timer() {
        let backend = MockBackend::default();
        let mgr = SessionManager::new(backend.clone(), settings(Duration::from_secs(60)));
        let cancel = CancellationToken::new();

        mgr.run(&cancel, |_| async { Ok(()) }).await.unwrap();
        tokio::time::sleep(Duration::from_secs(50)).await;

        let err = mgr
            .run(&cancel, |_| async {
                Err::<(), _>(BrowserError::Timeout("container".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BrowserError::Timeout(_)));

        // Deadline still counts from the last successful run.
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(mgr.phase().await, SessionPhase::Stopped);
        assert_eq!(backend.terminations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_waits_for_slot_holder() {
        let backend = MockBackend::default();
        let mgr = SessionManager::new(backend.clone(), settings(Duration::from_secs(10)));
        let lease = mgr.acquire(&CancellationToken::new()).await.unwrap();

        // Held past the deadline: the watcher must not stop a busy browser.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(mgr.is_running().await);
        assert!(lease.surface().probe().await);

        drop(lease);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(mgr.is_running().await);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!mgr.is_running().await);
    }

    #[tokio::test]
    async fn lease_exposes_the_live_surface() {
        let mgr = manager(MockBackend::default());
        let lease = mgr.acquire(&CancellationToken::new()).await.unwrap();
        let shared: Arc<MockSurface> = lease.shared_surface();
        assert!(Arc::ptr_eq(&shared, &lease.shared_surface()));
    }
}
