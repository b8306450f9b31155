use serde::Deserialize;
use serde_json::Value;

/// Events the hosting runtime delivers to the agent.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Install,
    Activate,
    /// Raw push payload, absent for data-less pushes.
    Push { data: Option<Vec<u8>> },
    NotificationClick { notification: ShownNotification },
    NotificationClose { notification: ShownNotification },
    Fetch { url: String },
}

/// A notification the agent displayed earlier, as handed back on click/close.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownNotification {
    pub id: String,
    pub tag: Option<String>,
    pub data: Option<Value>,
}

/// JSON body of a push message sent by the server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl PushPayload {
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// `data.notification_id` as a string, whether sent as number or string.
    pub fn notification_id(&self) -> Option<String> {
        match self.data.as_ref()?.get("notification_id")? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_id_accepts_numbers_and_strings() {
        let numeric = PushPayload::parse(br#"{"title":"t","data":{"notification_id":42}}"#).unwrap();
        assert_eq!(numeric.notification_id().as_deref(), Some("42"));

        let text = PushPayload::parse(br#"{"data":{"notification_id":"n-7"}}"#).unwrap();
        assert_eq!(text.notification_id().as_deref(), Some("n-7"));

        let none = PushPayload::parse(br#"{"title":"t"}"#).unwrap();
        assert_eq!(none.notification_id(), None);
    }

    #[test]
    fn test_non_json_payload_fails_to_parse() {
        assert!(PushPayload::parse(b"plain text push").is_err());
    }
}
