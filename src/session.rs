//! Capture session: one video input, one photo output, and a preview pump.
//!
//! Inputs and outputs are added inside a configuration transaction
//! (`begin_configuration` / `commit`). Dropping a transaction without
//! committing discards whatever was staged.

use crate::errors::CameraError;
use crate::photo::PhotoOutput;
use crate::platform::VideoDevice;
use crate::types::{CameraDeviceInfo, CameraFrame};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

pub(crate) type SharedDevice = Arc<Mutex<Box<dyn VideoDevice>>>;

const DEFAULT_PREVIEW_CAPACITY: usize = 2;
const PUMP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);
const PUMP_IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Unconfigured,
    Ready,
    Running,
}

/// Drop-oldest preview buffer. The pump only pulls frames while a reader
/// is waiting in `pop_latest_timeout`.
struct FrameQueue {
    inner: Mutex<FrameQueueInner>,
    cv: Condvar,
    demand: Condvar,
}

struct FrameQueueInner {
    items: VecDeque<CameraFrame>,
    capacity: usize,
    dropped: u64,
    waiters: usize,
}

impl FrameQueue {
    fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(FrameQueueInner {
                items: VecDeque::with_capacity(capacity.clamp(1, 64)),
                capacity: capacity.max(1),
                dropped: 0,
                waiters: 0,
            }),
            cv: Condvar::new(),
            demand: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrameQueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_drop_oldest(&self, frame: CameraFrame) {
        let mut g = self.lock();
        if g.items.len() >= g.capacity {
            g.items.pop_front();
            g.dropped = g.dropped.saturating_add(1);
        }
        g.items.push_back(frame);
        self.cv.notify_all();
    }

    /// Newest frame, waiting up to `timeout` for one to arrive. Older
    /// buffered frames are discarded. While waiting, the reader counts as
    /// demand for the pump.
    fn pop_latest_timeout(&self, timeout: Duration) -> Option<CameraFrame> {
        let deadline = Instant::now() + timeout;
        let mut g = self.lock();
        if let Some(latest) = g.items.pop_back() {
            g.items.clear();
            return Some(latest);
        }
        g.waiters += 1;
        self.demand.notify_all();
        let latest = loop {
            if let Some(latest) = g.items.pop_back() {
                g.items.clear();
                break Some(latest);
            }
            let now = Instant::now();
            if now >= deadline {
                break None;
            }
            let (ng, _) = self
                .cv
                .wait_timeout(g, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            g = ng;
        };
        g.waiters -= 1;
        latest
    }

    /// Block the pump until a reader is waiting. False once `stop` is set.
    fn wait_for_demand(&self, stop: &AtomicBool) -> bool {
        let mut g = self.lock();
        loop {
            if stop.load(Ordering::Relaxed) {
                return false;
            }
            if g.waiters > 0 {
                return true;
            }
            let (ng, _) = self
                .demand
                .wait_timeout(g, PUMP_IDLE_POLL)
                .unwrap_or_else(PoisonError::into_inner);
            g = ng;
        }
    }

    fn wake_pump(&self) {
        let _g = self.lock();
        self.demand.notify_all();
    }

    fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    fn clear(&self) {
        self.lock().items.clear();
    }
}

/// A video device wrapped for use as a session input
pub struct CaptureDeviceInput {
    device: SharedDevice,
    info: CameraDeviceInfo,
}

impl CaptureDeviceInput {
    pub fn new(device: Box<dyn VideoDevice>) -> Result<Self, CameraError> {
        let info = device.info().clone();
        if !info.is_available {
            return Err(CameraError::DeviceUnavailable(format!(
                "Device {} ({}) cannot be used as an input",
                info.id, info.name
            )));
        }
        Ok(Self {
            device: Arc::new(Mutex::new(device)),
            info,
        })
    }

    pub fn info(&self) -> &CameraDeviceInfo {
        &self.info
    }

    pub(crate) fn device(&self) -> SharedDevice {
        self.device.clone()
    }
}

struct Components {
    input: Option<CaptureDeviceInput>,
    photo_output: Option<PhotoOutput>,
}

struct Inner {
    state: Mutex<SessionState>,
    components: Mutex<Components>,
    configuring: AtomicBool,
    preview: FrameQueue,
    pump_thread: Mutex<Option<JoinHandle<()>>>,
    stop_flag: Arc<AtomicBool>,
}

/// Shared handle onto the capture pipeline
#[derive(Clone)]
pub struct CaptureSession {
    inner: Arc<Inner>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::with_preview_capacity(DEFAULT_PREVIEW_CAPACITY)
    }

    pub fn with_preview_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState::Unconfigured),
                components: Mutex::new(Components {
                    input: None,
                    photo_output: None,
                }),
                configuring: AtomicBool::new(false),
                preview: FrameQueue::new(capacity),
                pump_thread: Mutex::new(None),
                stop_flag: Arc::new(AtomicBool::new(false)),
            }),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, SessionState>, CameraError> {
        self.inner
            .state
            .lock()
            .map_err(|_| CameraError::poisoned("session state"))
    }

    fn components(&self) -> Result<MutexGuard<'_, Components>, CameraError> {
        self.inner
            .components
            .lock()
            .map_err(|_| CameraError::poisoned("session components"))
    }

    /// Open a configuration transaction. Only one may be open at a time.
    pub fn begin_configuration(&self) -> Result<SessionConfiguration<'_>, CameraError> {
        if self.inner.configuring.swap(true, Ordering::AcqRel) {
            return Err(CameraError::ConfigurationError(
                "A configuration transaction is already open".to_string(),
            ));
        }
        log::debug!("Begin session configuration");
        Ok(SessionConfiguration {
            session: self,
            staged_input: None,
            staged_output: None,
            committed: false,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.state()
            .map(|s| *s != SessionState::Unconfigured)
            .unwrap_or(false)
    }

    pub fn is_running(&self) -> bool {
        self.state()
            .map(|s| *s == SessionState::Running)
            .unwrap_or(false)
    }

    pub fn input_info(&self) -> Option<CameraDeviceInfo> {
        self.components()
            .ok()
            .and_then(|c| c.input.as_ref().map(|i| i.info().clone()))
    }

    pub fn photo_output(&self) -> Option<PhotoOutput> {
        self.components().ok().and_then(|c| c.photo_output.clone())
    }

    pub fn start_running(&self) -> Result<(), CameraError> {
        let mut state = self.state()?;
        match *state {
            SessionState::Unconfigured => {
                return Err(CameraError::ConfigurationError(
                    "Session must be configured before it is started".to_string(),
                ))
            }
            SessionState::Running => {
                log::debug!("Session already running");
                return Ok(());
            }
            SessionState::Ready => {}
        }

        let device = self
            .components()?
            .input
            .as_ref()
            .map(CaptureDeviceInput::device)
            .ok_or_else(|| CameraError::ConfigurationError("Session has no input".to_string()))?;

        let interval = {
            let mut guard = device.lock().map_err(|_| CameraError::poisoned("device"))?;
            guard.start_stream()?;
            guard.frame_interval()
        };

        self.inner.preview.clear();
        self.inner.stop_flag.store(false, Ordering::Relaxed);
        let inner = self.inner.clone();
        let handle = std::thread::Builder::new()
            .name("qrsnap-preview-pump".to_string())
            .spawn(move || pump_loop(inner, device, interval))
            .map_err(|e| CameraError::StreamError(format!("spawn failed: {e}")))?;

        *self
            .inner
            .pump_thread
            .lock()
            .map_err(|_| CameraError::poisoned("pump thread"))? = Some(handle);
        *state = SessionState::Running;
        log::info!("Capture session started");
        Ok(())
    }

    pub fn stop_running(&self) -> Result<(), CameraError> {
        let mut state = self.state()?;
        if *state != SessionState::Running {
            log::debug!("Session not running");
            return Ok(());
        }

        self.inner.stop_flag.store(true, Ordering::Relaxed);
        self.inner.preview.wake_pump();
        let handle = self
            .inner
            .pump_thread
            .lock()
            .map_err(|_| CameraError::poisoned("pump thread"))?
            .take();

        if let Some(handle) = handle {
            let start = Instant::now();
            while !handle.is_finished() {
                if start.elapsed() >= PUMP_JOIN_TIMEOUT {
                    log::warn!("Preview pump did not stop within {:?}", PUMP_JOIN_TIMEOUT);
                    break;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() && handle.join().is_err() {
                log::error!("Preview pump panicked");
            }
        }

        if let Some(input) = self.components()?.input.as_ref() {
            let mut device = input
                .device
                .lock()
                .map_err(|_| CameraError::poisoned("device"))?;
            device.stop_stream()?;
        }

        *state = SessionState::Ready;
        log::info!("Capture session stopped");
        Ok(())
    }

    /// Most recent preview frame, waiting up to `timeout`
    pub fn latest_preview_frame(&self, timeout: Duration) -> Option<CameraFrame> {
        if !self.is_running() {
            return None;
        }
        self.inner.preview.pop_latest_timeout(timeout)
    }

    pub fn dropped_preview_frames(&self) -> u64 {
        self.inner.preview.dropped()
    }
}

fn pump_loop(inner: Arc<Inner>, device: SharedDevice, interval: Duration) {
    log::debug!("Preview pump started ({:?} per frame)", interval);
    while inner.preview.wait_for_demand(&inner.stop_flag) {
        let started = Instant::now();
        let result = device
            .lock()
            .map_err(|_| CameraError::poisoned("device"))
            .and_then(|mut d| d.capture_frame());

        match result {
            Ok(frame) => inner.preview.push_drop_oldest(frame),
            Err(e) => {
                log::warn!("Preview frame capture failed: {}", e);
                std::thread::sleep(Duration::from_millis(100));
                continue;
            }
        }

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }
    log::debug!("Preview pump stopped");
}

/// An open configuration transaction on a [`CaptureSession`]
pub struct SessionConfiguration<'a> {
    session: &'a CaptureSession,
    staged_input: Option<CaptureDeviceInput>,
    staged_output: Option<PhotoOutput>,
    committed: bool,
}

impl SessionConfiguration<'_> {
    pub fn can_add_input(&self, input: &CaptureDeviceInput) -> bool {
        let has_input = self
            .session
            .components()
            .map(|c| c.input.is_some())
            .unwrap_or(true);
        input.info.is_available && self.staged_input.is_none() && !has_input
    }

    pub fn add_input(&mut self, input: CaptureDeviceInput) -> Result<(), CameraError> {
        if !self.can_add_input(&input) {
            return Err(CameraError::ConfigurationError(format!(
                "Cannot add input {} to the session",
                input.info.id
            )));
        }
        self.staged_input = Some(input);
        Ok(())
    }

    pub fn can_add_output(&self, output: &PhotoOutput) -> bool {
        let has_output = self
            .session
            .components()
            .map(|c| c.photo_output.is_some())
            .unwrap_or(true);
        self.staged_output.is_none() && !has_output && !output.is_attached()
    }

    pub fn add_output(&mut self, output: PhotoOutput) -> Result<(), CameraError> {
        if !self.can_add_output(&output) {
            return Err(CameraError::ConfigurationError(
                "Cannot add photo output to the session".to_string(),
            ));
        }
        self.staged_output = Some(output);
        Ok(())
    }

    /// Apply staged changes. The session counts as configured once it has an input.
    pub fn commit(mut self) -> Result<(), CameraError> {
        let mut components = self.session.components()?;
        if let Some(input) = self.staged_input.take() {
            log::info!("Added input {} ({})", input.info.id, input.info.name);
            components.input = Some(input);
        }
        if let Some(output) = self.staged_output.take() {
            log::info!("Added photo output");
            components.photo_output = Some(output);
        }

        if let (Some(input), Some(output)) = (&components.input, &components.photo_output) {
            if !output.is_attached() {
                output.attach(input.device())?;
            }
        }

        let has_input = components.input.is_some();
        drop(components);

        let mut state = self.session.state()?;
        if has_input && *state == SessionState::Unconfigured {
            *state = SessionState::Ready;
        } else if !has_input {
            log::warn!("Committed a configuration without an input; session stays unconfigured");
        }
        self.committed = true;
        log::debug!("Committed session configuration");
        Ok(())
    }
}

impl Drop for SessionConfiguration<'_> {
    fn drop(&mut self) {
        if !self.committed && (self.staged_input.is_some() || self.staged_output.is_some()) {
            log::debug!("Discarding uncommitted session configuration");
        }
        self.session.inner.configuring.store(false, Ordering::Release);
    }
}
