//! Conversation handling module.
//!
//! Runs each user's chat session as a small state machine:
//! `/start` → channel check → server choice → file upload → token count
//! → batch processing → token file delivery.

mod handler;
mod render;
mod responder;
mod store;
mod throttle;
mod types;

pub use handler::ConversationHandler;
pub use responder::{DeliveryError, MessageId, Responder};
pub use store::{SessionStore, UserSession};
pub use throttle::EditThrottle;
pub use types::{Button, CHECK_CHANNEL, ChatEvent, Rejection, Server, SessionMode, UserId};
