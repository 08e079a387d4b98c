#[cfg(test)]
mod error_tests {
    use qrsnap::errors::CameraError;
    use std::error::Error;

    #[test]
    fn test_camera_error_initialization() {
        let error = CameraError::InitializationError("Test init error".to_string());
        assert!(error.to_string().contains("Camera initialization error"));
        assert!(error.to_string().contains("Test init error"));
    }

    #[test]
    fn test_camera_error_display_trait() {
        let error = CameraError::CaptureError("Display test".to_string());
        assert_eq!(format!("{}", error), "Capture error: Display test");
    }

    #[test]
    fn test_camera_error_implements_error_trait() {
        let error = CameraError::DetectionError("Error trait test".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_all_error_variants() {
        let errors = vec![
            CameraError::InitializationError("Init error".to_string()),
            CameraError::DeviceUnavailable("Device error".to_string()),
            CameraError::ConfigurationError("Config error".to_string()),
            CameraError::CaptureError("Capture error".to_string()),
            CameraError::StreamError("Stream error".to_string()),
            CameraError::DetectionError("Detection error".to_string()),
            CameraError::IoError("IO error".to_string()),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
            assert!(!format!("{:?}", error).is_empty());
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
        let error: CameraError = io.into();
        assert!(matches!(error, CameraError::IoError(ref m) if m.contains("missing.png")));
    }

    #[test]
    fn test_error_display_prefixes() {
        let errors = vec![
            ("Device unavailable", CameraError::DeviceUnavailable("x".to_string())),
            ("Session configuration error", CameraError::ConfigurationError("x".to_string())),
            ("Stream error", CameraError::StreamError("x".to_string())),
            ("Detection error", CameraError::DetectionError("x".to_string())),
        ];

        for (expected_prefix, error) in errors {
            let display = error.to_string();
            assert!(
                display.starts_with(expected_prefix),
                "{} should start with {}",
                display,
                expected_prefix
            );
        }
    }
}
