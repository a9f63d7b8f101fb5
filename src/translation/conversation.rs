/*!
 * Ordered log of typed turns for one group's retry loop.
 */

use crate::providers::ChatMessage;

/// The conversation sent to the model, oldest turn first
///
/// Failed attempts are appended rather than restarted, so the model sees its
/// own previous answer together with the reason it was rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a conversation with the instruction and the input lines
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatMessage::system(system), ChatMessage::user(user)],
        }
    }

    pub fn turns(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Return the conversation extended with `turns`
    pub fn extended<I: IntoIterator<Item = ChatMessage>>(mut self, turns: I) -> Self {
        self.turns.extend(turns);
        self
    }
}
