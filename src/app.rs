//! The application shell: a single event loop that plays the role of the UI
//! main queue. Taps, orientation changes and quit requests arrive as
//! [`UiEvent`]s; controller calls and alerts only ever happen here.

use crate::config::QrSnapConfig;
use crate::controller::CaptureController;
use crate::errors::CameraError;
use crate::orientation::DeviceOrientation;
use crate::photo::PhotoCaptureDelegate;
use crate::platform::DeviceDiscovery;
use crate::state::StateStore;
use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc::UnboundedReceiver;

pub const FIRST_LAUNCH_TITLE: &str = "Welcome to qrsnap";
pub const FIRST_LAUNCH_MESSAGE: &str =
    "Point the camera at a QR code and press Enter to snap a photo. Results are written to the log.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Tap,
    OrientationChanged(DeviceOrientation),
    Quit,
}

/// Shows modal alerts to the user
pub trait AlertPresenter: Send {
    fn present(&self, title: &str, message: &str);
}

/// Prints alerts to stderr
#[derive(Debug, Default)]
pub struct TerminalAlert;

impl AlertPresenter for TerminalAlert {
    fn present(&self, title: &str, message: &str) {
        eprintln!();
        eprintln!("== {} ==", title);
        eprintln!("{}", message);
        eprintln!();
    }
}

pub struct App {
    controller: CaptureController,
    delegate: Arc<dyn PhotoCaptureDelegate>,
    presenter: Box<dyn AlertPresenter>,
    state: StateStore,
    orientation: DeviceOrientation,
    session_configured: bool,
    in_flight: Vec<JoinHandle<()>>,
}

impl App {
    pub fn new(
        config: &QrSnapConfig,
        discovery: Box<dyn DeviceDiscovery>,
        delegate: Arc<dyn PhotoCaptureDelegate>,
        presenter: Box<dyn AlertPresenter>,
    ) -> Self {
        let state = config
            .state
            .path
            .clone()
            .map(StateStore::new)
            .unwrap_or_else(|| StateStore::new(StateStore::default_path()));

        Self {
            controller: CaptureController::new(discovery, config),
            delegate,
            presenter,
            state,
            orientation: DeviceOrientation::Unknown,
            session_configured: false,
            in_flight: Vec::new(),
        }
    }

    /// Device orientation to assume until the first change event
    pub fn with_orientation(mut self, orientation: DeviceOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn controller(&self) -> &CaptureController {
        &self.controller
    }

    pub fn is_session_configured(&self) -> bool {
        self.session_configured
    }

    /// Configure (once) and start the session, then show the first-launch
    /// alert unless the state file says it was shown. A flag that cannot be
    /// saved means the alert shows again next launch.
    pub fn launch(&mut self) {
        if !self.session_configured {
            match self.controller.configure(self.orientation) {
                Ok(()) => self.session_configured = true,
                Err(e) => log::error!("Session configuration failed: {}", e),
            }
        }

        if self.session_configured {
            if let Err(e) = self.controller.start() {
                log::error!("Could not start capture session: {}", e);
            }
        }

        if !self.state.load().first_launch_alert_shown {
            self.presenter.present(FIRST_LAUNCH_TITLE, FIRST_LAUNCH_MESSAGE);
            if let Err(e) = self.state.record_first_launch_alert() {
                log::warn!("Could not persist first-launch flag: {}", e);
            }
        }
    }

    /// Returns false once the app should exit
    pub fn handle(&mut self, event: UiEvent) -> bool {
        log::debug!("UI event {:?}", event);
        match event {
            UiEvent::Tap => {
                self.in_flight.retain(|h| !h.is_finished());
                if let Ok(handle) = self.controller.snap_photo(self.delegate.clone()) {
                    self.in_flight.push(handle);
                }
                true
            }
            UiEvent::OrientationChanged(orientation) => {
                self.orientation = orientation;
                self.controller.device_orientation_changed(orientation);
                true
            }
            UiEvent::Quit => false,
        }
    }

    /// Wait for in-flight captures and stop the session
    pub fn shutdown(&mut self) {
        for handle in self.in_flight.drain(..) {
            if handle.join().is_err() {
                log::error!("Photo capture thread panicked");
            }
        }
        if let Err(e) = self.controller.stop() {
            log::error!("Could not stop capture session: {}", e);
        }
    }

    /// Drive the app until `Quit` or until every sender is gone
    pub async fn run(mut self, mut events: UnboundedReceiver<UiEvent>) -> Result<(), CameraError> {
        self.launch();

        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                break;
            }
        }

        tokio::task::spawn_blocking(move || self.shutdown())
            .await
            .map_err(|e| CameraError::CaptureError(format!("Shutdown task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::StillImageDiscovery;
    use crate::photo::CapturedPhoto;
    use image::DynamicImage;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Counting(Mutex<Vec<bool>>);

    impl PhotoCaptureDelegate for Counting {
        fn photo_output_did_finish(&self, result: Result<CapturedPhoto, CameraError>) {
            self.0.lock().unwrap().push(result.is_ok());
        }
    }

    struct RecordingAlert(Arc<Mutex<Vec<String>>>);

    impl AlertPresenter for RecordingAlert {
        fn present(&self, title: &str, _message: &str) {
            self.0.lock().unwrap().push(title.to_string());
        }
    }

    fn app(dir: &std::path::Path, delegate: Arc<Counting>, alerts: Arc<Mutex<Vec<String>>>) -> App {
        app_with_state(dir.join("state.toml"), delegate, alerts)
    }

    fn app_with_state(
        state_path: std::path::PathBuf,
        delegate: Arc<Counting>,
        alerts: Arc<Mutex<Vec<String>>>,
    ) -> App {
        let mut config = QrSnapConfig::default();
        config.state.path = Some(state_path);
        let discovery = StillImageDiscovery::new(DynamicImage::new_rgb8(8, 8), "fixture");
        App::new(
            &config,
            Box::new(discovery),
            delegate,
            Box::new(RecordingAlert(alerts)),
        )
        .with_orientation(DeviceOrientation::Portrait)
    }

    #[test]
    fn test_launch_configures_once() {
        let dir = tempfile::tempdir().unwrap();
        let alerts = Arc::new(Mutex::new(Vec::new()));
        let mut app = app(dir.path(), Arc::new(Counting::default()), alerts.clone());

        app.launch();
        assert!(app.is_session_configured());
        assert!(app.controller().session().is_running());

        // Relaunch does not reconfigure or re-alert
        app.launch();
        assert!(app.is_session_configured());
        assert_eq!(alerts.lock().unwrap().len(), 1);
        app.shutdown();
        assert!(!app.controller().session().is_running());
    }

    #[test]
    fn test_alert_shown_once_across_launches() {
        let dir = tempfile::tempdir().unwrap();
        let alerts = Arc::new(Mutex::new(Vec::new()));

        let mut first = app(dir.path(), Arc::new(Counting::default()), alerts.clone());
        first.launch();
        first.shutdown();

        let mut second = app(dir.path(), Arc::new(Counting::default()), alerts.clone());
        second.launch();
        second.shutdown();

        assert_eq!(*alerts.lock().unwrap(), vec![FIRST_LAUNCH_TITLE.to_string()]);
    }

    #[test]
    fn test_alert_shown_when_state_cannot_be_saved() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let alerts = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let mut app = app_with_state(
                blocker.join("state.toml"),
                Arc::new(Counting::default()),
                alerts.clone(),
            );
            app.launch();
            assert!(app.controller().session().is_running());
            app.shutdown();
        }

        // Nothing could be persisted, so every launch still counts as the first
        assert_eq!(alerts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_handles_taps_until_quit() {
        let dir = tempfile::tempdir().unwrap();
        let delegate = Arc::new(Counting::default());
        let alerts = Arc::new(Mutex::new(Vec::new()));
        let app = app(dir.path(), delegate.clone(), alerts);

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tx.send(UiEvent::Tap).unwrap();
        tx.send(UiEvent::OrientationChanged(DeviceOrientation::FaceUp))
            .unwrap();
        tx.send(UiEvent::Tap).unwrap();
        tx.send(UiEvent::Quit).unwrap();
        tx.send(UiEvent::Tap).unwrap();

        app.run(rx).await.unwrap();
        assert_eq!(*delegate.0.lock().unwrap(), vec![true, true]);
    }
}
