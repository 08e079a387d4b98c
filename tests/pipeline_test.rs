//! End-to-end capture → detect → report runs against a still-image device

use qrsnap::testing::{qr_observation, synthetic_image, CannedDetector, MemorySink};
use qrsnap::{
    BarcodeObservation, CaptureController, DetectionOptions, DetectionReport, DetectionReporter,
    DetectionRequest, DeviceOrientation, QrSnapConfig, StillImageDiscovery, VideoOrientation,
};
use std::sync::Arc;

fn run_pipeline(
    observations: Vec<BarcodeObservation>,
    orientation: DeviceOrientation,
) -> Vec<DetectionReport> {
    let sink = MemorySink::new();
    let request = DetectionRequest::new(
        Arc::new(CannedDetector::new(observations)),
        DetectionOptions::default(),
    );
    let reporter = Arc::new(DetectionReporter::with_sink(request, Box::new(sink.clone())));

    let discovery = StillImageDiscovery::new(synthetic_image(0, 64, 48), "qr-code");
    let mut controller = CaptureController::new(Box::new(discovery), &QrSnapConfig::default());
    controller.configure(orientation).unwrap();
    controller.start().unwrap();

    controller.snap_photo(reporter).unwrap().join().unwrap();
    controller.stop().unwrap();

    sink.reports()
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[test]
    fn test_no_results() {
        let reports = run_pipeline(Vec::new(), DeviceOrientation::Portrait);
        assert_eq!(reports.len(), 1, "One photo should yield one report");
        assert_eq!(reports[0].lines(), vec!["No results found.".to_string()]);
        assert_eq!(reports[0].device_id, "still:qr-code");
    }

    #[test]
    fn test_text_payload_report() {
        let reports = run_pipeline(
            vec![qr_observation(b"https://example.com")],
            DeviceOrientation::LandscapeLeft,
        );
        let lines = reports[0].lines();
        assert_eq!(
            lines,
            vec![
                "Number of results found: 1",
                "Symbology: QR",
                "Payload: https://example.com",
                "Raw-Payload: https://example.com",
                "Error-Correction-Level: M",
                "Symbol-Version: 1",
            ]
        );
    }

    #[test]
    fn test_multiple_results_counted() {
        let reports = run_pipeline(
            vec![qr_observation(b"one"), qr_observation(b"two"), qr_observation(b"three")],
            DeviceOrientation::Portrait,
        );
        let lines = reports[0].lines();
        assert_eq!(lines[0], "Number of results found: 3");
        assert_eq!(lines.iter().filter(|l| l.starts_with("Symbology:")).count(), 3);
    }

    #[test]
    fn test_binary_payload_has_no_value() {
        let reports = run_pipeline(
            vec![qr_observation(&[0xff, 0xfe, 0x00])],
            DeviceOrientation::Portrait,
        );
        let lines = reports[0].lines();
        assert!(lines.contains(&"Raw-Payload: <no value>".to_string()));
        assert!(
            !lines.iter().any(|l| l.starts_with("Payload:")),
            "Binary payloads have no string value"
        );
    }

    #[test]
    fn test_report_ids_are_unique_per_photo() {
        let first = run_pipeline(Vec::new(), DeviceOrientation::Portrait);
        let second = run_pipeline(Vec::new(), DeviceOrientation::Portrait);
        assert_ne!(first[0].photo_id, second[0].photo_id);
    }

    #[test]
    fn test_flat_device_keeps_default_orientation() {
        let discovery = StillImageDiscovery::new(synthetic_image(1, 16, 8), "qr-code");
        let mut controller =
            CaptureController::new(Box::new(discovery), &QrSnapConfig::default());
        controller.configure(DeviceOrientation::FaceUp).unwrap();
        assert_eq!(
            controller.preview().video_orientation(),
            Some(VideoOrientation::default())
        );
    }

    #[test]
    fn test_failed_capture_emits_nothing() {
        let sink = MemorySink::new();
        let reporter = Arc::new(DetectionReporter::with_sink(
            DetectionRequest::new(Arc::new(CannedDetector::default()), DetectionOptions::default()),
            Box::new(sink.clone()),
        ));

        let discovery = StillImageDiscovery::new(synthetic_image(2, 16, 8), "qr-code");
        let mut controller =
            CaptureController::new(Box::new(discovery), &QrSnapConfig::default());
        controller.configure(DeviceOrientation::Portrait).unwrap();

        // Session never started: the capture fails and the reporter only logs it
        if let Ok(handle) = controller.snap_photo(reporter) {
            handle.join().unwrap();
        }
        assert!(sink.reports().is_empty());
    }

    #[test]
    fn test_photos_saved_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        let reporter = Arc::new(
            DetectionReporter::with_sink(
                DetectionRequest::new(
                    Arc::new(CannedDetector::default()),
                    DetectionOptions::default(),
                ),
                Box::new(sink.clone()),
            )
            .save_photos_to(dir.path().join("captures")),
        );

        let discovery = StillImageDiscovery::new(synthetic_image(3, 40, 20), "qr-code");
        let mut controller =
            CaptureController::new(Box::new(discovery), &QrSnapConfig::default());
        controller.configure(DeviceOrientation::LandscapeLeft).unwrap();
        controller.start().unwrap();
        controller.snap_photo(reporter).unwrap().join().unwrap();
        controller.stop().unwrap();

        let report = &sink.reports()[0];
        let expected_name = format!(
            "{}_{}.png",
            report.captured_at.format("%Y%m%d_%H%M%S"),
            report.photo_id.simple()
        );
        let saved: Vec<_> = std::fs::read_dir(dir.path().join("captures"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(saved, vec![expected_name.clone()]);

        let image = image::open(dir.path().join("captures").join(expected_name)).unwrap();
        assert_eq!((image.width(), image.height()), (40, 20));
    }

    #[test]
    fn test_report_json_carries_observations() {
        let reports = run_pipeline(
            vec![qr_observation(b"https://example.com")],
            DeviceOrientation::Portrait,
        );
        let json = serde_json::to_value(&reports[0]).unwrap();

        assert_eq!(json["device_id"], "still:qr-code");
        assert_eq!(json["photo_id"], reports[0].photo_id.to_string());
        let observations = json["observations"].as_array().unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0]["payload"], "https://example.com");
        assert_eq!(observations[0]["symbology"], "qr");
        assert_eq!(observations[0]["descriptor"]["kind"], "qr");
        assert_eq!(observations[0]["descriptor"]["error_correction_level"], "M");
        assert_eq!(observations[0]["descriptor"]["symbol_version"], 1);
    }
}
