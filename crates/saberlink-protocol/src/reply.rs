//! Outbound replies.
//!
//! Success is a JSON object:
//!
//! ```json
//! {"status":"OK",
//!  "others":{"bob":{"left_controller":"1,2,3","right_controller":"0,0,0",
//!                   "map_url":"","cover_url":""}},
//!  "majority_map_cover":"https://..."}
//! ```
//!
//! `majority_map_cover` is omitted when no level holds a majority.
//! Every failure is the bare text [`KO`], with no JSON around it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The failure reply, sent verbatim.
pub const KO: &str = "KO";

/// Value of `status` in a success reply.
const STATUS_OK: &str = "OK";

/// What one player sees of another.
///
/// Absent level URLs are sent as empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub left_controller: String,
    pub right_controller: String,
    pub map_url: String,
    pub cover_url: String,
}

/// Successful answer to a pose message.
///
/// `others` is a `BTreeMap` so the JSON lists players in username order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReply {
    pub status: String,
    pub others: BTreeMap<String, PlayerView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub majority_map_cover: Option<String>,
}

impl SyncReply {
    /// Builds an `"OK"` reply.
    pub fn ok(
        others: BTreeMap<String, PlayerView>,
        majority_map_cover: Option<String>,
    ) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            others,
            majority_map_cover,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(left: &str) -> PlayerView {
        PlayerView {
            left_controller: left.into(),
            right_controller: "0,0,0".into(),
            map_url: String::new(),
            cover_url: String::new(),
        }
    }

    #[test]
    fn test_empty_reply_omits_majority_cover() {
        let reply = SyncReply::ok(BTreeMap::new(), None);
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"{"status":"OK","others":{}}"#);
    }

    #[test]
    fn test_reply_with_majority_cover_and_players() {
        let mut others = BTreeMap::new();
        others.insert("bob".to_string(), view("1,2,3"));
        let reply = SyncReply::ok(others, Some("cover.jpg".into()));

        let json: serde_json::Value = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["status"], "OK");
        assert_eq!(json["others"]["bob"]["left_controller"], "1,2,3");
        assert_eq!(json["others"]["bob"]["map_url"], "");
        assert_eq!(json["majority_map_cover"], "cover.jpg");
    }
}
