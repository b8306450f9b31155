// --- File: crates/notifly_common/src/models.rs ---

// Wire models shared by the channel client, the push manager and the
// inbox. They mirror the JSON the social API sends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of notification kinds the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
}

/// The user who caused a notification, as embedded by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub username: String,
}

/// A server-owned notification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    /// Recipient.
    pub user_id: i64,
    pub actor_id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<i64>,
    pub is_read: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Display text precomputed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<serde_json::Value>,
}

impl Notification {
    /// Text shown for this record: the server message when present,
    /// otherwise one derived from the kind and the actor's name.
    pub fn display_message(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            return message.to_string();
        }

        let actor = self
            .actor_username
            .as_deref()
            .or_else(|| self.actor.as_ref().map(|a| a.username.as_str()))
            .unwrap_or("Someone");

        match self.kind {
            NotificationKind::Follow => format!("{} started following you", actor),
            NotificationKind::Like => format!("{} liked your post", actor),
            NotificationKind::Comment => format!("{} commented on your post", actor),
        }
    }
}

/// Body of `GET /notifications/`: a bare list or an envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    List(Vec<Notification>),
    Envelope {
        #[serde(default)]
        unread_count: Option<u64>,
        #[serde(default)]
        notifications: Option<Vec<Notification>>,
        #[serde(default)]
        items: Option<Vec<Notification>>,
    },
}

impl HistoryResponse {
    /// Splits the response into the server's unread count, if it sent one,
    /// and the records. `notifications` wins over `items` in an envelope.
    pub fn into_parts(self) -> (Option<u64>, Vec<Notification>) {
        match self {
            HistoryResponse::List(records) => (None, records),
            HistoryResponse::Envelope {
                unread_count,
                notifications,
                items,
            } => (unread_count, notifications.or(items).unwrap_or_default()),
        }
    }
}

/// Key material of a push subscription, base64url encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// JSON form of a browser push subscription, as sent to
/// `POST`/`DELETE /push-subscriptions/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(rename = "expirationTime", default)]
    pub expiration_time: Option<i64>,
    pub keys: SubscriptionKeys,
}

/// Body of `GET /vapid/public-key`.
#[derive(Debug, Clone, Deserialize)]
pub struct VapidKeyResponse {
    #[serde(default)]
    pub public_key: Option<String>,
}

/// A system notification to render, as handed to the platform.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DisplayNotification {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Notifications sharing a tag replace each other instead of stacking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibrate: Vec<u32>,
    #[serde(default)]
    pub require_interaction: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Accepts RFC 3339 timestamps as well as the naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// form some backends emit, which is read as UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(kind: &str) -> serde_json::Value {
        json!({
            "id": 7,
            "user_id": 1,
            "actor_id": 2,
            "type": kind,
            "post_id": 11,
            "is_read": false,
            "created_at": "2024-05-01T10:20:30.123456"
        })
    }

    #[test]
    fn test_naive_timestamp_is_read_as_utc() {
        let n: Notification = serde_json::from_value(record("like")).unwrap();
        assert_eq!(n.kind, NotificationKind::Like);
        assert_eq!(
            n.created_at.date_naive(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().date_naive()
        );
        assert_eq!(n.post_id, Some(11));
        assert_eq!(n.comment_id, None);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(serde_json::from_value::<Notification>(record("mention")).is_err());
    }

    #[test]
    fn test_display_message_fallbacks() {
        let mut n: Notification = serde_json::from_value(record("follow")).unwrap();
        assert_eq!(n.display_message(), "Someone started following you");

        n.actor = Some(Actor { id: 2, username: "ada".into() });
        assert_eq!(n.display_message(), "ada started following you");

        n.actor_username = Some("grace".into());
        n.kind = NotificationKind::Comment;
        assert_eq!(n.display_message(), "grace commented on your post");

        n.message = Some("grace replied to you".into());
        assert_eq!(n.display_message(), "grace replied to you");
    }

    #[test]
    fn test_history_accepts_both_shapes() {
        let bare: HistoryResponse = serde_json::from_value(json!([record("like")])).unwrap();
        let (count, records) = bare.into_parts();
        assert_eq!(count, None);
        assert_eq!(records.len(), 1);

        let envelope: HistoryResponse =
            serde_json::from_value(json!({"unread_count": 4, "items": [record("like"), record("comment")]}))
                .unwrap();
        let (count, records) = envelope.into_parts();
        assert_eq!(count, Some(4));
        assert_eq!(records.len(), 2);

        let empty: HistoryResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.into_parts(), (None, vec![]));
    }

    #[test]
    fn test_subscription_json_matches_browser_shape() {
        let sub = PushSubscription {
            endpoint: "https://push.example.com/abc".into(),
            expiration_time: None,
            keys: SubscriptionKeys { p256dh: "BPk".into(), auth: "c2VjcmV0".into() },
        };
        let value = serde_json::to_value(&sub).unwrap();
        assert_eq!(
            value,
            json!({
                "endpoint": "https://push.example.com/abc",
                "expirationTime": null,
                "keys": {"p256dh": "BPk", "auth": "c2VjcmV0"}
            })
        );
    }
}
