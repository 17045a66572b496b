//! Wire protocol for Saberlink.
//!
//! This crate defines the "language" a player's client and the sync
//! server speak over the persistent connection:
//!
//! - **Inbound** ([`PoseMessage`]): `key:value` pairs joined by `,`,
//!   parsed against an explicit schema.
//! - **Outbound** ([`SyncReply`], [`PlayerView`]): the JSON snapshot sent
//!   back on success, or the literal [`KO`] on any failure.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how replies become text.
//! - **Errors** ([`ProtocolError`]): what can go wrong while parsing or
//!   encoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and session
//! (player records). It knows nothing about connections or the registry.
//!
//! ```text
//! Transport (frames) → Protocol (PoseMessage / SyncReply) → Session (registry)
//! ```

mod codec;
mod error;
mod message;
mod reply;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{Pose, PoseMessage, DEFAULT_COMPONENT};
pub use reply::{PlayerView, SyncReply, KO};
