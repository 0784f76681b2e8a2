//! Local capture quality profiles.

use serde::{Deserialize, Serialize};

/// Camera encoder profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "360p")]
    Sd360,
    #[serde(rename = "480p")]
    Sd480,
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
}

impl VideoQuality {
    pub fn width(&self) -> u32 {
        match self {
            Self::Sd360 => 640,
            Self::Sd480 => 640,
            Self::Hd720 => 1280,
            Self::Hd1080 => 1920,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Sd360 => 360,
            Self::Sd480 => 480,
            Self::Hd720 => 720,
            Self::Hd1080 => 1080,
        }
    }

    pub fn frame_rate(&self) -> u32 {
        match self {
            Self::Sd360 | Self::Sd480 => 15,
            Self::Hd720 | Self::Hd1080 => 30,
        }
    }

    /// Target bitrate in kbps.
    pub fn bitrate_kbps(&self) -> u32 {
        match self {
            Self::Sd360 => 400,
            Self::Sd480 => 500,
            Self::Hd720 => 1130,
            Self::Hd1080 => 2080,
        }
    }
}

/// Screen capture preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenQuality {
    /// 720p, 10fps, low bandwidth.
    Low,
    /// 1080p, 15fps.
    #[default]
    Medium,
    /// 1080p, 30fps.
    High,
    /// Native resolution, 30fps.
    Ultra,
}

impl ScreenQuality {
    pub fn max_width(&self) -> u32 {
        match self {
            Self::Low => 1280,
            Self::Medium | Self::High => 1920,
            Self::Ultra => 3840,
        }
    }

    pub fn max_height(&self) -> u32 {
        match self {
            Self::Low => 720,
            Self::Medium | Self::High => 1080,
            Self::Ultra => 2160,
        }
    }

    pub fn max_fps(&self) -> u32 {
        match self {
            Self::Low => 10,
            Self::Medium => 15,
            Self::High | Self::Ultra => 30,
        }
    }
}

/// Local media preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub video_quality: VideoQuality,
    pub screen_quality: ScreenQuality,
    /// Join with the microphone published but disabled.
    pub start_audio_muted: bool,
    /// Join with the camera published but disabled.
    pub start_video_muted: bool,
}
