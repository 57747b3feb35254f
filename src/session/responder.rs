//! Output side of a conversation.
//!
//! The chat transport implements [`Responder`]; the conversation handler
//! only talks to this trait.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use super::types::Button;

/// Handle of a sent message that can later be edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// Errors reported by a transport while delivering output.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to send message: {0}")]
    Send(String),

    #[error("Failed to edit message {id:?}: {message}")]
    Edit { id: MessageId, message: String },

    #[error("Failed to send document {path}: {message}")]
    Document { path: String, message: String },
}

/// Renders bot output to one user.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Sends a text message.
    async fn send_text(&self, text: &str) -> Result<MessageId, DeliveryError>;

    /// Sends a text message with an inline keyboard, one `Vec` per row.
    async fn send_keyboard(
        &self,
        text: &str,
        rows: &[Vec<Button>],
    ) -> Result<MessageId, DeliveryError>;

    /// Replaces the text of a previously sent message.
    async fn edit_text(&self, id: MessageId, text: &str) -> Result<(), DeliveryError>;

    /// Sends a file with a caption.
    async fn send_document(&self, path: &Path, caption: &str) -> Result<(), DeliveryError>;
}
