//! Call-lifecycle bookkeeping: start, join, leave, and end notifications.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use huddle_common::ParticipantId;
use huddle_config::schema::LifecycleConfig;
use reqwest::Url;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid lifecycle URL: {0}")]
    InvalidUrl(String),

    #[error("lifecycle request failed: {0}")]
    Http(String),

    #[error("lifecycle service returned HTTP {0}: {1}")]
    Status(u16, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallAction {
    Start,
    Join,
    Leave,
    End,
}

impl CallAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::End => "end",
        }
    }
}

impl fmt::Display for CallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records call start/join/leave/end with the backend.
///
/// Failures are reported to the caller but never abort a call.
#[async_trait]
pub trait CallLifecycle: Send + Sync {
    async fn start_call(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
    ) -> Result<(), LifecycleError>;

    async fn join_call(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
    ) -> Result<(), LifecycleError>;

    async fn leave_call(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
    ) -> Result<(), LifecycleError>;

    async fn end_call(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
    ) -> Result<(), LifecycleError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Posts lifecycle notifications to `{base_url}/calls/{channel}/{action}`.
pub struct HttpCallLifecycle {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpCallLifecycle {
    pub fn from_config(config: &LifecycleConfig) -> Result<Self, LifecycleError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| LifecycleError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(LifecycleError::InvalidUrl(config.base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(u64::from(config.request_timeout_secs)))
            .build()
            .map_err(|e| LifecycleError::Http(e.to_string()))?;
        let auth_token = Some(config.auth_token.clone()).filter(|t| !t.is_empty());
        Ok(Self {
            http,
            base_url,
            auth_token,
        })
    }

    /// URL for `action` on `channel`; the channel name is percent-encoded
    /// as a single path segment.
    pub fn endpoint(&self, channel: &str, action: CallAction) -> Result<Url, LifecycleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LifecycleError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["calls", channel, action.as_str()]);
        Ok(url)
    }

    async fn post(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
        action: CallAction,
    ) -> Result<(), LifecycleError> {
        let url = self.endpoint(channel, action)?;
        let body = serde_json::json!({
            "channel": channel,
            "identity": identity,
            "at": Utc::now().to_rfc3339(),
        });
        debug!(%action, channel, "Lifecycle request");

        let mut request = self.http.post(url).json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| LifecycleError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(LifecycleError::Status(status.as_u16(), text));
        }
        Ok(())
    }
}

#[async_trait]
impl CallLifecycle for HttpCallLifecycle {
    async fn start_call(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
    ) -> Result<(), LifecycleError> {
        self.post(channel, identity, CallAction::Start).await
    }

    async fn join_call(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
    ) -> Result<(), LifecycleError> {
        self.post(channel, identity, CallAction::Join).await
    }

    async fn leave_call(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
    ) -> Result<(), LifecycleError> {
        self.post(channel, identity, CallAction::Leave).await
    }

    async fn end_call(
        &self,
        channel: &str,
        identity: Option<&ParticipantId>,
    ) -> Result<(), LifecycleError> {
        self.post(channel, identity, CallAction::End).await
    }
}
