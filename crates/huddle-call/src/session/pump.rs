//! Engine event pump: turns engine callbacks into registry updates.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::CallEvent;
use crate::media::{EngineEvent, EngineEvents};

use super::client::SessionClient;

/// Drain `events` until the engine closes the stream or the client is dropped.
pub(super) fn spawn(client: Weak<SessionClient>, mut events: EngineEvents) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(client) = client.upgrade() else {
                break;
            };
            handle(&client, event).await;
        }
        debug!("Engine event pump stopped");
    })
}

async fn handle(client: &Arc<SessionClient>, event: EngineEvent) {
    let local_identity = {
        let state = client.lock();
        match state.session.as_ref() {
            Some(session) if session.is_active() => session.local_identity.clone(),
            _ => {
                debug!(?event, "Discarding engine event outside a session");
                return;
            }
        }
    };

    match event {
        EngineEvent::UserPublished { identity, kind } => {
            if local_identity.as_ref() == Some(&identity) {
                return;
            }
            let registry = client.registry();
            let epoch = registry.epoch().await;
            let track = match client.engine().subscribe(&identity, kind).await {
                Ok(track) => track,
                Err(e) => {
                    warn!(identity = identity.as_str(), %kind, error = %e, "Subscribe failed");
                    return;
                }
            };
            if !registry.on_published_in(epoch, &identity, kind, track).await {
                if let Err(e) = client.engine().unsubscribe(&identity, kind).await {
                    debug!(identity = identity.as_str(), %kind, error = %e, "Stale unsubscribe failed");
                }
            }
        }
        EngineEvent::UserUnpublished { identity, kind } => {
            client.registry().on_unpublished(&identity, kind).await;
            if let Err(e) = client.engine().unsubscribe(&identity, kind).await {
                debug!(identity = identity.as_str(), %kind, error = %e, "Unsubscribe failed");
            }
        }
        EngineEvent::UserLeft { identity } => {
            client.registry().on_user_left(&identity).await;
        }
        EngineEvent::ConnectionStateChanged { state, reason } => {
            debug!(?state, ?reason, "Connection state changed");
            client
                .events()
                .publish(CallEvent::Connection { state, reason });
        }
    }
}
