//! Per-connection pose-sync handler.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! Messages on one connection are handled strictly in order; different
//! connections run concurrently. For every inbound message:
//!   1. Parse `key:value` pairs → [`PoseMessage`]
//!   2. Under the registry lock: authenticate, apply the pose, build the
//!      snapshot of everyone else and compute the majority level
//!   3. Encode and send the reply on the same connection
//!
//! Any failure in steps 1–3 answers `"KO"` and the loop carries on. Only
//! the connection going away ends it, and that leaves the registry alone:
//! a player who has synced once stays until the process exits.

use std::sync::Arc;

use saberlink_protocol::{Codec, PoseMessage, ProtocolError, SyncReply, KO};
use saberlink_session::{majority_level_cover, SessionError};
use saberlink_transport::{Connection, WebSocketConnection};
use tokio::time::Instant;

use crate::catalog::MapCatalog;
use crate::server::ServerState;
use crate::SaberlinkError;

/// Why a message was answered with `"KO"`.
///
/// The client can't tell these apart; the logs can.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SyncError {
    /// Malformed message or missing `p` / `auth`.
    #[error("parse error: {0}")]
    Parse(#[source] ProtocolError),

    /// Unknown player or wrong token.
    #[error("auth error: {0}")]
    Auth(#[source] SessionError),

    /// Anything else: a failure that isn't the client's fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    fn kind(&self) -> &'static str {
        match self {
            SyncError::Parse(_) => "parse",
            SyncError::Auth(_) => "auth",
            SyncError::Internal(_) => "internal",
        }
    }
}

impl From<SessionError> for SyncError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AuthFailed(_) => SyncError::Auth(err),
            other => SyncError::Internal(other.to_string()),
        }
    }
}

/// A successfully processed message.
struct Synced {
    username: String,
    reply: String,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<M: MapCatalog>(
    mut conn: WebSocketConnection,
    state: Arc<ServerState<M>>,
) -> Result<(), SaberlinkError> {
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "pose connection opened");

    // Last identity that synced here, for the close log only. Closing a
    // connection never touches the session.
    let mut last_synced: Option<String> = None;

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%conn_id, username = ?last_synced, "pose connection closed");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, username = ?last_synced, error = %e, "recv error");
                break;
            }
        };

        let reply = match process_message(&state, &data).await {
            Ok(synced) => {
                last_synced = Some(synced.username);
                synced.reply
            }
            Err(e) => {
                tracing::debug!(%conn_id, kind = e.kind(), error = %e, "rejecting message");
                KO.to_string()
            }
        };

        conn.send(&reply).await?;
    }

    Ok(())
}

/// Parses, authenticates and applies one message, returning the reply.
async fn process_message<M: MapCatalog>(
    state: &ServerState<M>,
    data: &[u8],
) -> Result<Synced, SyncError> {
    let msg = PoseMessage::from_bytes(data).map_err(SyncError::Parse)?;

    // One lock for update + snapshot + consensus, so the reply reflects a
    // single consistent registry state.
    let reply = {
        let mut registry = state.registry.lock().await;
        registry.apply_pose(&msg, Instant::now())?;
        SyncReply::ok(
            registry.snapshot_excluding(&msg.username),
            majority_level_cover(registry.all()),
        )
    };

    let text = state
        .codec
        .encode(&reply)
        .map_err(|e| SyncError::Internal(e.to_string()))?;

    Ok(Synced {
        username: msg.username,
        reply: text,
    })
}

#[cfg(test)]
mod tests {
    use saberlink_session::{ChosenLevel, SessionConfig};

    use super::*;
    use crate::catalog::CatalogError;

    struct NoCatalog;

    impl MapCatalog for NoCatalog {
        async fn lookup(&self, map_id: &str) -> Result<ChosenLevel, CatalogError> {
            Err(CatalogError::NotFound(map_id.to_string()))
        }
    }

    fn state() -> ServerState<NoCatalog> {
        ServerState::new(NoCatalog, SessionConfig::default())
    }

    async fn sign_in(state: &ServerState<NoCatalog>, name: &str, token: &str) {
        state.registry.lock().await.upsert(name, token, Instant::now());
    }

    fn reply_json(synced: &Synced) -> serde_json::Value {
        serde_json::from_str(&synced.reply).unwrap()
    }

    #[tokio::test]
    async fn test_process_message_alone_returns_empty_others() {
        let state = state();
        sign_in(&state, "alice", "tok1").await;

        let synced = process_message(&state, b"p:alice,auth:tok1,c1x:1,c1y:2,c1z:3")
            .await
            .unwrap();

        assert_eq!(synced.reply, r#"{"status":"OK","others":{}}"#);
        assert!(!state.registry.lock().await.get("alice").unwrap().pending);
    }

    #[tokio::test]
    async fn test_process_message_excludes_sender() {
        let state = state();
        sign_in(&state, "alice", "a").await;
        sign_in(&state, "bob", "b").await;
        process_message(&state, b"p:bob,auth:b,c2x:7").await.unwrap();

        let synced = process_message(&state, b"p:alice,auth:a").await.unwrap();
        let json = reply_json(&synced);

        assert!(json["others"].get("alice").is_none());
        assert_eq!(json["others"]["bob"]["right_controller"], "7,0,0");
        assert_eq!(json["others"]["bob"]["left_controller"], "0,0,0");
    }

    #[tokio::test]
    async fn test_process_message_missing_identity_is_parse_error() {
        let state = state();

        let err = process_message(&state, b"c1x:1,c1y:2").await.err().unwrap();

        assert!(matches!(err, SyncError::Parse(_)));
        assert_eq!(err.kind(), "parse");
    }

    #[tokio::test]
    async fn test_process_message_wrong_token_is_auth_error() {
        let state = state();
        sign_in(&state, "alice", "tok1").await;

        let err = process_message(&state, b"p:alice,auth:bad,c1x:9")
            .await
            .err()
            .unwrap();

        assert!(matches!(err, SyncError::Auth(_)));
        let registry = state.registry.lock().await;
        let alice = registry.get("alice").unwrap();
        assert!(alice.pending);
        assert_eq!(alice.left.x, "0");
    }

    #[tokio::test]
    async fn test_process_message_attaches_majority_cover() {
        let state = state();
        for name in ["a", "b", "c", "d"] {
            sign_in(&state, name, "t").await;
        }
        {
            let mut registry = state.registry.lock().await;
            for (name, url) in [("a", "U"), ("b", "U"), ("c", "U"), ("d", "V")] {
                registry
                    .set_chosen_level(
                        name,
                        "t",
                        ChosenLevel {
                            url: url.to_string(),
                            cover_url: format!("{url}-cover"),
                        },
                    )
                    .unwrap();
            }
        }

        let synced = process_message(&state, b"p:d,auth:t").await.unwrap();
        let json = reply_json(&synced);

        assert_eq!(json["majority_map_cover"], "U-cover");
        assert_eq!(json["others"]["a"]["map_url"], "U");
        assert_eq!(json["others"]["a"]["cover_url"], "U-cover");
    }

    #[test]
    fn test_session_not_found_maps_to_internal() {
        let err: SyncError = SessionError::NotFound("x".into()).into();
        assert_eq!(err.kind(), "internal");
    }
}
