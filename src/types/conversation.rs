use serde::Serialize;

use crate::types::{Message, Role};

/// The ordered transcript replayed to the model on every call.
///
/// A conversation always starts with exactly one system message carrying the
/// instruction prompt.  Messages are only ever appended; nothing is reordered
/// or pruned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create a conversation seeded with the instruction prompt.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a user message.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    /// Append a system message.
    pub fn push_system(&mut self, content: impl Into<String>) {
        self.push(Message::system(content));
    }

    /// Append an assistant message.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// The transcript in insertion order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The most recently appended message.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The number of messages, including the instruction prompt.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false; the instruction prompt is never removed.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages appended after the instruction prompt.
    pub fn history(&self) -> &[Message] {
        &self.messages[1..]
    }

    /// Count the messages authored by `role`.
    pub fn count(&self, role: Role) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn starts_with_one_system_message() {
        let conversation = Conversation::new("You are Greg");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0], Message::system("You are Greg"));
        assert!(conversation.history().is_empty());
        assert!(!conversation.is_empty());
    }

    #[test]
    fn preserves_insertion_order() {
        let mut conversation = Conversation::new("prompt");
        conversation.push_system("Entering chat mode");
        conversation.push_user("ls");
        conversation.push_assistant("!term");
        assert_eq!(
            conversation.history(),
            &[
                Message::system("Entering chat mode"),
                Message::user("ls"),
                Message::assistant("!term"),
            ]
        );
        assert_eq!(conversation.last(), Some(&Message::assistant("!term")));
        assert_eq!(conversation.count(Role::System), 2);
    }

    #[test]
    fn serializes_as_a_plain_array() {
        let mut conversation = Conversation::new("prompt");
        conversation.push_user("hi");
        assert_eq!(
            serde_json::to_value(&conversation).unwrap(),
            json!([
                {"role": "system", "content": "prompt"},
                {"role": "user", "content": "hi"}
            ])
        );
    }
}
