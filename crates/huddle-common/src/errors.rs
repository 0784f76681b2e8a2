use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures raised while acquiring local hardware.
///
/// These never abort a call: the session continues with whatever
/// tracks could be opened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("device acquisition timed out after {}ms", .0.as_millis())]
    AcquisitionTimeout(Duration),

    #[error("screen picker dismissed by user")]
    UserCancelled,
}

impl MediaError {
    /// Whether asking again may succeed. A denied permission has to be
    /// granted in system settings first.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::PermissionDenied(_))
    }

    /// A cancelled picker is a user choice, not a failure worth surfacing.
    pub fn is_user_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("another join is still in flight after {}ms", .0.as_millis())]
    JoinTimeout(Duration),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("network error: {0}")]
    Network(String),

    #[error("not joined to a channel")]
    NotJoined,

    #[error("join superseded by a leave request")]
    Superseded,
}

impl CallError {
    /// Whether the caller may simply try the same operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::JoinTimeout(_) | Self::Network(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HuddleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("engine.app_id is empty".into());
        assert_eq!(
            err.to_string(),
            "config validation error: engine.app_id is empty"
        );
    }

    #[test]
    fn media_error_display() {
        let err = MediaError::PermissionDenied("camera".into());
        assert_eq!(err.to_string(), "permission denied: camera");

        let err = MediaError::AcquisitionTimeout(Duration::from_millis(2500));
        assert_eq!(err.to_string(), "device acquisition timed out after 2500ms");

        assert!(MediaError::UserCancelled.is_user_cancelled());
        assert!(!MediaError::DeviceUnavailable("mic".into()).is_user_cancelled());
    }

    #[test]
    fn call_error_wraps_media_error() {
        let err: CallError = MediaError::UserCancelled.into();
        assert!(matches!(err, CallError::Media(MediaError::UserCancelled)));
        assert_eq!(err.to_string(), "screen picker dismissed by user");
    }

    #[test]
    fn media_error_recoverability() {
        assert!(!MediaError::PermissionDenied("camera".into()).is_recoverable());
        assert!(MediaError::DeviceUnavailable("camera".into()).is_recoverable());
        assert!(MediaError::UserCancelled.is_recoverable());
    }

    #[test]
    fn call_error_retryability() {
        assert!(CallError::JoinTimeout(Duration::from_secs(3)).is_retryable());
        assert!(CallError::Network("reset".into()).is_retryable());
        assert!(!CallError::InvalidArgument("empty channel".into()).is_retryable());
        assert!(!CallError::Configuration("no app id".into()).is_retryable());
        assert!(!CallError::Superseded.is_retryable());
    }

    #[test]
    fn huddle_error_from_call() {
        let err: HuddleError = CallError::NotJoined.into();
        assert!(matches!(err, HuddleError::Call(_)));
        assert_eq!(err.to_string(), "not joined to a channel");
    }

    #[test]
    fn huddle_error_from_config() {
        let err: HuddleError = ConfigError::ParseError("bad toml".into()).into();
        assert!(matches!(err, HuddleError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn huddle_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: HuddleError = io_err.into();
        assert!(matches!(err, HuddleError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }
}
