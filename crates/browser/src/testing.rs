//! In-memory browser backend for tests.
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for dependants that want to drive a [`SessionManager`] without Chrome.
//!
//! [`SessionManager`]: crate::SessionManager

use std::{
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    error::BrowserError,
    surface::{BrowserBackend, Surface},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decrement `counter` if positive; `true` when it was.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// How surfaces opened from now on behave.
#[derive(Debug, Clone)]
pub struct PageScript {
    /// Markup returned by `capture_html`.
    pub html: String,
    /// Selectors that never become visible.
    pub hidden: Vec<String>,
    pub fail_navigation: bool,
    pub fail_capture: bool,
    /// Time each visibility wait takes before it succeeds.
    pub wait_delay: Duration,
}

impl Default for PageScript {
    fn default() -> Self {
        Self {
            html: "<html></html>".into(),
            hidden: Vec::new(),
            fail_navigation: false,
            fail_capture: false,
            wait_delay: Duration::ZERO,
        }
    }
}

#[derive(Default)]
struct BackendShared {
    launches: AtomicUsize,
    terminations: AtomicUsize,
    fail_launches: AtomicUsize,
    fail_surfaces: AtomicUsize,
    script: Mutex<PageScript>,
    last_surface: Mutex<Option<MockSurface>>,
}

/// Counts launches and terminations; clones share state.
#[derive(Clone, Default)]
pub struct MockBackend {
    shared: Arc<BackendShared>,
}

impl MockBackend {
    pub fn with_script(script: PageScript) -> Self {
        let backend = Self::default();
        backend.set_script(script);
        backend
    }

    pub fn set_script(&self, script: PageScript) {
        *lock(&self.shared.script) = script;
    }

    pub fn fail_next_launches(&self, count: usize) {
        self.shared.fail_launches.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_surfaces(&self, count: usize) {
        self.shared.fail_surfaces.store(count, Ordering::SeqCst);
    }

    pub fn launches(&self) -> usize {
        self.shared.launches.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> usize {
        self.shared.terminations.load(Ordering::SeqCst)
    }

    /// The most recently opened surface.
    pub fn last_surface(&self) -> Option<MockSurface> {
        lock(&self.shared.last_surface).clone()
    }
}

pub struct MockProcess {
    surfaces: Vec<MockSurface>,
}

#[async_trait]
impl BrowserBackend for MockBackend {
    type Process = MockProcess;
    type Surface = MockSurface;

    async fn launch(&self) -> Result<MockProcess, BrowserError> {
        self.shared.launches.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.shared.fail_launches) {
            return Err(BrowserError::LaunchFailed("mock launch failure".into()));
        }
        Ok(MockProcess {
            surfaces: Vec::new(),
        })
    }

    async fn open_surface(&self, process: &mut MockProcess) -> Result<MockSurface, BrowserError> {
        if take_one(&self.shared.fail_surfaces) {
            return Err(BrowserError::Cdp("mock surface failure".into()));
        }
        let surface = MockSurface::new(lock(&self.shared.script).clone());
        process.surfaces.push(surface.clone());
        *lock(&self.shared.last_surface) = Some(surface.clone());
        Ok(surface)
    }

    async fn terminate(&self, process: MockProcess) {
        for surface in &process.surfaces {
            surface.kill();
        }
        self.shared.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

struct SurfaceState {
    script: PageScript,
    alive: AtomicBool,
    hang_probe: AtomicBool,
    visited: Mutex<Vec<String>>,
    waited: Mutex<Vec<String>>,
    resets: AtomicUsize,
    captures: AtomicUsize,
}

/// Scripted surface; clones observe the same page.
#[derive(Clone)]
pub struct MockSurface {
    state: Arc<SurfaceState>,
}

impl MockSurface {
    pub fn new(script: PageScript) -> Self {
        Self {
            state: Arc::new(SurfaceState {
                script,
                alive: AtomicBool::new(true),
                hang_probe: AtomicBool::new(false),
                visited: Mutex::new(Vec::new()),
                waited: Mutex::new(Vec::new()),
                resets: AtomicUsize::new(0),
                captures: AtomicUsize::new(0),
            }),
        }
    }

    /// Simulate a crashed browser: every call fails from now on.
    pub fn kill(&self) {
        self.state.alive.store(false, Ordering::SeqCst);
    }

    /// Make the liveness probe never answer.
    pub fn hang_probe(&self) {
        self.state.hang_probe.store(true, Ordering::SeqCst);
    }

    pub fn visited(&self) -> Vec<String> {
        lock(&self.state.visited).clone()
    }

    /// Selectors that were waited on successfully, in order.
    pub fn waited(&self) -> Vec<String> {
        lock(&self.state.waited).clone()
    }

    pub fn resets(&self) -> usize {
        self.state.resets.load(Ordering::SeqCst)
    }

    pub fn captures(&self) -> usize {
        self.state.captures.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<(), BrowserError> {
        if self.state.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BrowserError::ConnectionClosed("mock browser gone".into()))
        }
    }
}

#[async_trait]
impl Surface for MockSurface {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.ensure_alive()?;
        if self.state.script.fail_navigation {
            return Err(BrowserError::NavigationFailed(format!("mock: {url}")));
        }
        lock(&self.state.visited).push(url.to_string());
        Ok(())
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.ensure_alive()?;
        let script = &self.state.script;
        let hidden = script.hidden.iter().any(|s| s == selector);
        if hidden || script.wait_delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(BrowserError::Timeout(format!("{selector} not visible")));
        }
        if !script.wait_delay.is_zero() {
            tokio::time::sleep(script.wait_delay).await;
        }
        lock(&self.state.waited).push(selector.to_string());
        Ok(())
    }

    async fn capture_html(&self) -> Result<String, BrowserError> {
        self.ensure_alive()?;
        if self.state.script.fail_capture {
            return Err(BrowserError::CaptureFailed("mock capture failure".into()));
        }
        self.state.captures.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.script.html.clone())
    }

    async fn probe(&self) -> bool {
        if self.state.hang_probe.load(Ordering::SeqCst) {
            return std::future::pending().await;
        }
        self.state.alive.load(Ordering::SeqCst)
    }

    async fn reset(&self) -> Result<(), BrowserError> {
        self.ensure_alive()?;
        self.state.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
