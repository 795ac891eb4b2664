//! Transcript entries produced by the conversation engine.
//!
//! A [`Message`] is an immutable log entry in the conversation transcript.
//! Entries are created exclusively by the engine's side-effect dispatch and
//! are never mutated afterwards, with one documented exception: a message
//! carrying an embedded module reference gains the module's completion
//! result once the module finishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::ModuleRef;
use crate::scanner::SensitiveField;
use crate::types::Sender;

/// One entry in the append-only conversation transcript.
///
/// # Examples
///
/// ```
/// use scriptline::message::Message;
/// use scriptline::types::Sender;
///
/// let msg = Message::customer("I'd like to change my contract")
///     .with_response_options(vec!["Sure".into(), "One moment".into()]);
///
/// assert_eq!(msg.sender, Sender::Customer);
/// assert_eq!(msg.response_options.as_deref(), Some(&["Sure".to_string(), "One moment".to_string()][..]));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique id of this entry.
    pub id: String,
    /// Who produced the entry.
    pub sender: Sender,
    /// The display text.
    pub text: String,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
    /// Response options presented alongside this entry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_options: Option<Vec<String>>,
    /// Regulated-data findings attached to customer-originated text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitive_data: Option<Vec<SensitiveField>>,
    /// Embedded interactive module, rendered inline in the transcript.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<ModuleRef>,
    /// Marks entries produced while the state demands identity verification.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_verification: bool,
}

impl Message {
    /// Creates a new message with the given sender and text.
    #[must_use]
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            text: text.into(),
            timestamp: Utc::now(),
            response_options: None,
            sensitive_data: None,
            module: None,
            requires_verification: false,
        }
    }

    /// Creates a system (engine-generated) message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Sender::System, text)
    }

    /// Creates an agent message.
    #[must_use]
    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Sender::Agent, text)
    }

    /// Creates a customer message.
    #[must_use]
    pub fn customer(text: impl Into<String>) -> Self {
        Self::new(Sender::Customer, text)
    }

    /// Attaches response options. Empty vectors are dropped so the view
    /// layer can rely on `Some` meaning "present options".
    #[must_use]
    pub fn with_response_options(mut self, options: Vec<String>) -> Self {
        self.response_options = if options.is_empty() {
            None
        } else {
            Some(options)
        };
        self
    }

    /// Attaches sensitive-data findings.
    #[must_use]
    pub fn with_sensitive_data(mut self, fields: Vec<SensitiveField>) -> Self {
        self.sensitive_data = if fields.is_empty() {
            None
        } else {
            Some(fields)
        };
        self
    }

    /// Embeds a module reference.
    #[must_use]
    pub fn with_module(mut self, module: ModuleRef) -> Self {
        self.module = Some(module);
        self
    }

    /// Flags this entry as requiring verification.
    #[must_use]
    pub fn with_requires_verification(mut self, required: bool) -> Self {
        self.requires_verification = required;
        self
    }

    /// Returns `true` if this message has the given sender.
    #[must_use]
    pub fn has_sender(&self, sender: Sender) -> bool {
        self.sender == sender
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModuleKind;

    #[test]
    fn constructors_set_sender() {
        assert_eq!(Message::system("s").sender, Sender::System);
        assert_eq!(Message::agent("a").sender, Sender::Agent);
        assert_eq!(Message::customer("c").sender, Sender::Customer);
    }

    #[test]
    fn ids_are_unique() {
        let a = Message::system("x");
        let b = Message::system("x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn empty_options_are_dropped() {
        let msg = Message::customer("hi").with_response_options(vec![]);
        assert!(msg.response_options.is_none());

        let msg = Message::customer("hi").with_response_options(vec!["Yes".into()]);
        assert_eq!(msg.response_options.unwrap(), vec!["Yes".to_string()]);
    }

    #[test]
    fn module_attachment_survives_serde() {
        let module = ModuleRef::new("m1", ModuleKind::Verification, "s1", true);
        let msg = Message::system("verify").with_module(module);
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.module.unwrap().id, "m1");
    }

    #[test]
    fn sender_check() {
        let msg = Message::agent("ok");
        assert!(msg.has_sender(Sender::Agent));
        assert!(!msg.has_sender(Sender::Customer));
    }
}
