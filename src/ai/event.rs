use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One entry of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A user-visible increment of generated output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    Delta { content: String },
}

impl ConversationEvent {
    pub fn delta(content: impl Into<String>) -> Self {
        Self::Delta {
            content: content.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Delta { content } => content,
        }
    }
}

/// Classification of one raw backend payload.
///
/// `Continue` and `Done` are variants, never strings, so a delta whose text
/// happens to read `[DONE]` is still a delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Event(ConversationEvent),
    Continue,
    Done,
}

impl Parsed {
    pub fn delta(content: impl Into<String>) -> Self {
        Self::Event(ConversationEvent::delta(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ConversationMessage::system("hi")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"hi"}"#);
    }

    #[test]
    fn sentinel_text_is_still_a_delta() {
        let parsed = Parsed::delta("[DONE]");
        assert_ne!(parsed, Parsed::Done);
        assert!(matches!(parsed, Parsed::Event(ref e) if e.text() == "[DONE]"));
    }
}
