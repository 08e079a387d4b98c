//! Device orientation and capture (video) orientation.
//!
//! The device orientation is how the user holds the device; the video
//! orientation is how captured frames are rotated before they reach the
//! preview and photo outputs. The two landscape cases are swapped because
//! a device rotated to the left has its camera sensor rotated to the right.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Physical orientation of the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceOrientation {
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

impl DeviceOrientation {
    pub const ALL: [DeviceOrientation; 7] = [
        DeviceOrientation::Unknown,
        DeviceOrientation::Portrait,
        DeviceOrientation::PortraitUpsideDown,
        DeviceOrientation::LandscapeLeft,
        DeviceOrientation::LandscapeRight,
        DeviceOrientation::FaceUp,
        DeviceOrientation::FaceDown,
    ];

    pub fn is_portrait(&self) -> bool {
        matches!(
            self,
            DeviceOrientation::Portrait | DeviceOrientation::PortraitUpsideDown
        )
    }

    pub fn is_landscape(&self) -> bool {
        matches!(
            self,
            DeviceOrientation::LandscapeLeft | DeviceOrientation::LandscapeRight
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceOrientation::Unknown => "unknown",
            DeviceOrientation::Portrait => "portrait",
            DeviceOrientation::PortraitUpsideDown => "portrait-upside-down",
            DeviceOrientation::LandscapeLeft => "landscape-left",
            DeviceOrientation::LandscapeRight => "landscape-right",
            DeviceOrientation::FaceUp => "face-up",
            DeviceOrientation::FaceDown => "face-down",
        }
    }
}

impl fmt::Display for DeviceOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceOrientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        DeviceOrientation::ALL
            .into_iter()
            .find(|o| o.as_str() == normalized)
            .ok_or_else(|| format!("Unknown device orientation: {}", s))
    }
}

/// Orientation applied to the capture connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeRight,
    LandscapeLeft,
}

impl VideoOrientation {
    /// Fixed device → video mapping. Face up, face down and unknown have no
    /// capture orientation and yield `None`.
    pub fn for_device(device: DeviceOrientation) -> Option<Self> {
        match device {
            DeviceOrientation::Portrait => Some(VideoOrientation::Portrait),
            DeviceOrientation::PortraitUpsideDown => Some(VideoOrientation::PortraitUpsideDown),
            DeviceOrientation::LandscapeLeft => Some(VideoOrientation::LandscapeRight),
            DeviceOrientation::LandscapeRight => Some(VideoOrientation::LandscapeLeft),
            DeviceOrientation::Unknown
            | DeviceOrientation::FaceUp
            | DeviceOrientation::FaceDown => None,
        }
    }

    /// Rotate a sensor-oriented (landscape-right) image into this orientation.
    pub fn apply(&self, image: DynamicImage) -> DynamicImage {
        match self {
            VideoOrientation::LandscapeRight => image,
            VideoOrientation::LandscapeLeft => image.rotate180(),
            VideoOrientation::Portrait => image.rotate90(),
            VideoOrientation::PortraitUpsideDown => image.rotate270(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoOrientation::Portrait => "portrait",
            VideoOrientation::PortraitUpsideDown => "portrait-upside-down",
            VideoOrientation::LandscapeRight => "landscape-right",
            VideoOrientation::LandscapeLeft => "landscape-left",
        }
    }
}

impl Default for VideoOrientation {
    fn default() -> Self {
        VideoOrientation::LandscapeRight
    }
}

impl fmt::Display for VideoOrientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_landscape_is_swapped() {
        assert_eq!(
            VideoOrientation::for_device(DeviceOrientation::LandscapeLeft),
            Some(VideoOrientation::LandscapeRight)
        );
        assert_eq!(
            VideoOrientation::for_device(DeviceOrientation::LandscapeRight),
            Some(VideoOrientation::LandscapeLeft)
        );
    }

    #[test]
    fn test_flat_orientations_unmapped() {
        for o in [
            DeviceOrientation::FaceUp,
            DeviceOrientation::FaceDown,
            DeviceOrientation::Unknown,
        ] {
            assert!(VideoOrientation::for_device(o).is_none(), "{o} should not map");
        }
    }

    #[test]
    fn test_parse_orientation() {
        assert_eq!(
            "landscape_left".parse::<DeviceOrientation>().unwrap(),
            DeviceOrientation::LandscapeLeft
        );
        assert_eq!(
            " Portrait ".parse::<DeviceOrientation>().unwrap(),
            DeviceOrientation::Portrait
        );
        assert!("sideways".parse::<DeviceOrientation>().is_err());
    }

    #[test]
    fn test_apply_rotates_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(4, 2));
        let portrait = VideoOrientation::Portrait.apply(img.clone());
        assert_eq!((portrait.width(), portrait.height()), (2, 4));
        let landscape = VideoOrientation::LandscapeLeft.apply(img);
        assert_eq!((landscape.width(), landscape.height()), (4, 2));
    }
}
