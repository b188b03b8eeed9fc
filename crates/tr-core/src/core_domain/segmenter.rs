use serde::Serialize;

use crate::core::Message;

// ---------------------------------------------------------------------------
// TurnUnit: one annotatable exchange, anchored at a user message
// ---------------------------------------------------------------------------

/// An ordered, non-empty run of messages whose first message is from the user.
///
/// Only [`segment`] builds these, so the anchor invariant always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnUnit {
    messages: Vec<Message>,
}

impl TurnUnit {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The user message opening this unit.
    pub fn prompt(&self) -> &Message {
        &self.messages[0]
    }

    /// Everything after the prompt (assistant replies, tool traffic).
    pub fn responses(&self) -> &[Message] {
        &self.messages[1..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// segment: partition a flat message list at user boundaries
// ---------------------------------------------------------------------------

/// Splits `messages` into turn units.
///
/// A unit starts at every user message and absorbs what follows up to the next
/// user message. Messages before the first user message belong to no unit (see
/// [`leading_messages`]). A trailing user message with no reply becomes a
/// one-message unit. Tool-call/response pairing is not checked.
pub fn segment(messages: &[Message]) -> Vec<TurnUnit> {
    let mut units: Vec<TurnUnit> = Vec::new();

    for message in &messages[leading_messages(messages).len()..] {
        match units.last_mut() {
            Some(unit) if !message.is_user() => unit.messages.push(message.clone()),
            _ => units.push(TurnUnit {
                messages: vec![message.clone()],
            }),
        }
    }

    units
}

/// The prefix that precedes the first user message and is left out of segmentation.
pub fn leading_messages(messages: &[Message]) -> &[Message] {
    let first_user = messages
        .iter()
        .position(Message::is_user)
        .unwrap_or(messages.len());
    &messages[..first_user]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
