//! Conversation types and definitions.

use std::fmt;

use thiserror::Error;

/// Identifies the user a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a user is in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    #[default]
    Idle,
    AwaitingServerChoice,
    AwaitingFile,
    AwaitingCount,
    Processing,
}

/// Game server the tokens are generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Server {
    Ind,
}

impl Server {
    /// All servers offered to users.
    pub const ALL: [Self; 1] = [Self::Ind];

    /// Short code used in callback data and artifact names.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ind => "ind",
        }
    }

    /// Button label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ind => "🇮🇳 IND Server",
        }
    }

    /// Callback data sent when the server button is pressed.
    #[must_use]
    pub fn callback_data(self) -> String {
        format!("select_{}", self.code())
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code().to_uppercase())
    }
}

/// Callback data of the channel check button.
pub const CHECK_CHANNEL: &str = "check_channel";

/// An inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Button {
    /// Opens a link.
    Url { label: String, url: String },
    /// Sends callback data back to the bot.
    Callback { label: String, data: String },
}

impl Button {
    #[must_use]
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            label: label.into(),
            url: url.into(),
        }
    }

    #[must_use]
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Callback {
            label: label.into(),
            data: data.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Url { label, .. } | Self::Callback { label, .. } => label,
        }
    }
}

/// Something the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The `/start` command.
    Start,
    /// The channel check button.
    CheckChannel,
    /// A server button.
    SelectServer(Server),
    /// An uploaded document.
    Document { file_name: String, bytes: Vec<u8> },
    /// A plain text message.
    Text(String),
}

impl ChatEvent {
    /// Short name for logs. Never includes user content.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::CheckChannel => "check_channel",
            Self::SelectServer(_) => "select_server",
            Self::Document { .. } => "document",
            Self::Text(_) => "text",
        }
    }

    /// Maps button callback data to an event.
    ///
    /// Returns `None` for unknown data.
    #[must_use]
    pub fn from_callback(data: &str) -> Option<Self> {
        if data == CHECK_CHANNEL {
            return Some(Self::CheckChannel);
        }

        Server::ALL
            .into_iter()
            .find(|server| server.callback_data() == data)
            .map(Self::SelectServer)
    }

    /// Maps a text message to an event, recognising `/start`.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        let command = trimmed.split_whitespace().next().unwrap_or_default();

        // Group chats may address the bot as `/start@name`.
        if command == "/start" || command.starts_with("/start@") {
            Self::Start
        } else {
            Self::Text(text.to_owned())
        }
    }
}

/// Why an event was refused. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("⚠️ Please use /start and select a server first.")]
    NoServerSelected,

    #[error("⚠️ Please upload a JSON file first.")]
    NoUpload,

    #[error("⏳ Your previous batch is still running, please wait.")]
    Busy,

    #[error("❌ Invalid file type. Please upload a valid JSON file.")]
    InvalidFileType,

    #[error("❌ No valid accounts found in the JSON file.")]
    NoValidRecords,

    #[error("❌ Please enter a valid number.")]
    NotANumber,

    #[error("❌ Invalid number. Please enter a value between 1 and {max}.")]
    InvalidBound { max: usize },

    #[error("❌ Error: File not found. Please start over with /start.")]
    UploadMissing,

    #[error("❌ Could not store the uploaded file. Please try again.")]
    UploadFailed,
}
