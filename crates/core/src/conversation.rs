//! Conversation-related types.

use std::collections::HashSet;
use std::slice;

use ticket_agent_model::{ModelMessage, Role};

/// Who produced a piece of transcript reported to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// Text typed by the user.
    User,
    /// Text generated by the model.
    Assistant,
    /// Output of a tool call.
    Tool,
}

/// An append-only log of the messages exchanged in a conversation.
///
/// The conversation is seeded with a system message on creation. Messages
/// can only be appended, earlier entries never change.
#[derive(Clone, Debug)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    /// Creates a conversation that starts with the given system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(prompt: S) -> Self {
        Self {
            messages: vec![ModelMessage::System(prompt.into())],
        }
    }

    /// Appends a message to the end of the conversation.
    #[inline]
    pub fn append(&mut self, msg: ModelMessage) {
        self.messages.push(msg);
    }

    /// Returns an owned copy of all messages.
    #[inline]
    pub fn snapshot(&self) -> Vec<ModelMessage> {
        self.messages.clone()
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if there are no messages.
    ///
    /// A conversation created by [`Conversation::with_system_prompt`] is
    /// never empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns an iterator over the messages in order.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, ModelMessage> {
        self.messages.iter()
    }

    /// Returns the last message.
    #[inline]
    pub fn last(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    /// Returns the messages to send to the model, bounded by `max_messages`.
    ///
    /// The seeded system prompt and the newest user message are always
    /// kept, so the bound is at least two for a conversation that has both.
    /// The rest of the budget goes to the newest other messages, later
    /// system messages included. A tool result whose call was evicted is
    /// dropped as well, so the kept tail never starts with an orphaned tool
    /// message.
    pub fn window(&self, max_messages: Option<usize>) -> Vec<ModelMessage> {
        let Some(max_messages) = max_messages else {
            return self.snapshot();
        };
        if self.messages.len() <= max_messages {
            return self.snapshot();
        }

        let mut pinned = Vec::with_capacity(2);
        if self.messages.first().map(ModelMessage::role) == Some(Role::System) {
            pinned.push(0);
        }
        if let Some(idx) =
            self.messages.iter().rposition(|msg| msg.role() == Role::User)
        {
            if !pinned.contains(&idx) {
                pinned.push(idx);
            }
        }
        let budget = max_messages.saturating_sub(pinned.len());

        let others: Vec<usize> = (0..self.messages.len())
            .filter(|idx| !pinned.contains(idx))
            .collect();
        let mut tail = &others[others.len().saturating_sub(budget)..];
        while let Some((&first, rest)) = tail.split_first() {
            if self.messages[first].role() != Role::Tool {
                break;
            }
            tail = rest;
        }
        let kept: HashSet<usize> =
            tail.iter().chain(&pinned).copied().collect();

        self.messages
            .iter()
            .enumerate()
            .filter(|(idx, _)| kept.contains(idx))
            .map(|(_, msg)| msg.clone())
            .collect()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a ModelMessage;
    type IntoIter = slice::Iter<'a, ModelMessage>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
