//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Huddle Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[engine]
# Application identifier issued by the media provider (required to join).
app_id = ""
# token = ""

[call]
# join_wait_timeout_ms = 3000     # 100-30000, wait for an in-flight join
# join_timeout_ms = 15000         # 1000-120000
# acquisition_timeout_ms = 10000  # 1000-60000, camera/mic/screen
# tick_interval_ms = 1000         # 100-10000, call timer

[media]
# video_quality = "720p"          # 360p | 480p | 720p | 1080p
# screen_quality = "medium"       # low | medium | high | ultra
# start_audio_muted = false
# start_video_muted = false

[lifecycle]
# enabled = false
# base_url = "https://api.example.com"
# auth_token = ""
# request_timeout_secs = 10       # 1-120

[logging]
# level = "INFO"                  # DEBUG | INFO | WARNING | ERROR
"##
    .to_string()
}
