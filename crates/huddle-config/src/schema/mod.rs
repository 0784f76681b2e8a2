//! Configuration schema types for Huddle.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod call;
mod engine;
mod lifecycle;
mod media;
mod system;

pub use call::*;
pub use engine::*;
pub use lifecycle::*;
pub use media::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for Huddle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HuddleConfig {
    pub engine: EngineConfig,
    pub call: CallConfig,
    pub media: MediaConfig,
    pub lifecycle: LifecycleConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_call_timings() {
        let config = HuddleConfig::default();
        assert_eq!(config.call.join_wait_timeout(), Duration::from_secs(3));
        assert_eq!(config.call.join_timeout(), Duration::from_secs(15));
        assert_eq!(config.call.acquisition_timeout(), Duration::from_secs(10));
        assert_eq!(config.call.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn default_engine_has_no_credentials() {
        let config = HuddleConfig::default();
        assert!(config.engine.app_id.is_empty());
        assert_eq!(config.engine.token(), None);
    }

    #[test]
    fn engine_token_is_optional() {
        let engine = EngineConfig {
            app_id: "abc".into(),
            token: "t0k".into(),
        };
        assert_eq!(engine.token(), Some("t0k"));
    }

    #[test]
    fn default_media_preferences() {
        let config = HuddleConfig::default();
        assert_eq!(config.media.video_quality, VideoQuality::Hd720);
        assert_eq!(config.media.screen_quality, ScreenQuality::Medium);
        assert!(!config.media.start_audio_muted);
        assert!(!config.media.start_video_muted);
    }

    #[test]
    fn video_quality_profiles() {
        assert_eq!(VideoQuality::Hd720.width(), 1280);
        assert_eq!(VideoQuality::Hd720.height(), 720);
        assert_eq!(VideoQuality::Sd360.frame_rate(), 15);
        assert_eq!(VideoQuality::Hd1080.bitrate_kbps(), 2080);
    }

    #[test]
    fn screen_quality_presets() {
        assert_eq!(ScreenQuality::Low.max_fps(), 10);
        assert_eq!(ScreenQuality::Ultra.max_width(), 3840);
        assert_eq!(ScreenQuality::Medium.max_height(), 1080);
    }

    #[test]
    fn video_quality_uses_resolution_names() {
        let toml_str = r#"
[media]
video_quality = "1080p"
screen_quality = "high"
"#;
        let config: HuddleConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.media.video_quality, VideoQuality::Hd1080);
        assert_eq!(config.media.screen_quality, ScreenQuality::High);
    }

    #[test]
    fn log_level_directives() {
        assert_eq!(LogLevel::Debug.as_directive(), "debug");
        assert_eq!(LogLevel::Warning.as_directive(), "warn");
        assert_eq!(LoggingConfig::default().level, LogLevel::Info);
    }

    #[test]
    fn lifecycle_disabled_by_default() {
        let config = HuddleConfig::default();
        assert!(!config.lifecycle.enabled);
        assert_eq!(config.lifecycle.request_timeout_secs, 10);
    }
}
