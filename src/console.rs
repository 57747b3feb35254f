//! Terminal transport for local use.
//!
//! Prints bot output to stdout, redraws the progress line in place and
//! keeps the last keyboard's callback buttons so the driver can offer
//! them as choices.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use crossterm::cursor::MoveToColumn;
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use tracing::debug;

use crate::session::{Button, DeliveryError, MessageId, Responder};

/// [`Responder`] that writes to the terminal.
#[derive(Debug)]
pub struct ConsoleResponder {
    /// Directory delivered documents are copied into.
    save_dir: PathBuf,

    /// Callback buttons of the most recent keyboard.
    choices: Mutex<Vec<Button>>,

    /// Whether the cursor sits at the end of a redrawable line.
    inline: AtomicBool,

    next_id: AtomicI32,
}

impl ConsoleResponder {
    /// Creates a console responder saving documents into `save_dir`.
    #[must_use]
    pub fn new(save_dir: impl Into<PathBuf>) -> Self {
        Self {
            save_dir: save_dir.into(),
            choices: Mutex::new(Vec::new()),
            inline: AtomicBool::new(false),
            next_id: AtomicI32::new(1),
        }
    }

    /// Takes the callback buttons of the last keyboard, leaving none behind.
    pub fn take_choices(&self) -> Vec<Button> {
        self.choices
            .lock()
            .map(|mut choices| std::mem::take(&mut *choices))
            .unwrap_or_default()
    }

    fn next_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Prints a block of text on fresh lines.
    fn print_block(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        if self.inline.swap(false, Ordering::Relaxed) {
            writeln!(stdout)?;
        }
        writeln!(stdout, "{text}")?;
        stdout.flush()
    }

    /// Redraws the current line with `text`.
    fn redraw_line(&self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        execute!(stdout, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(text))?;
        self.inline.store(true, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl Responder for ConsoleResponder {
    async fn send_text(&self, text: &str) -> Result<MessageId, DeliveryError> {
        self.print_block(text)
            .map_err(|e| DeliveryError::Send(e.to_string()))?;
        Ok(self.next_id())
    }

    async fn send_keyboard(
        &self,
        text: &str,
        rows: &[Vec<Button>],
    ) -> Result<MessageId, DeliveryError> {
        let mut lines = vec![text.to_owned()];
        let mut callbacks = Vec::new();

        for button in rows.iter().flatten() {
            match button {
                Button::Url { label, url } => lines.push(format!("  {label}: {url}")),
                Button::Callback { .. } => callbacks.push(button.clone()),
            }
        }

        self.print_block(&lines.join("\n"))
            .map_err(|e| DeliveryError::Send(e.to_string()))?;

        if let Ok(mut choices) = self.choices.lock() {
            *choices = callbacks;
        }
        Ok(self.next_id())
    }

    async fn edit_text(&self, id: MessageId, text: &str) -> Result<(), DeliveryError> {
        let result = if text.contains('\n') {
            self.print_block(text)
        } else {
            self.redraw_line(text)
        };

        result.map_err(|e| DeliveryError::Edit {
            id,
            message: e.to_string(),
        })
    }

    async fn send_document(&self, path: &Path, caption: &str) -> Result<(), DeliveryError> {
        let doc_err = |message: String| DeliveryError::Document {
            path: path.display().to_string(),
            message,
        };

        let file_name = path
            .file_name()
            .ok_or_else(|| doc_err("path has no file name".to_owned()))?
            .to_string_lossy();

        // The artifact is removed once delivered, so never copy it onto itself.
        let target = if path.parent().is_some_and(|dir| same_dir(dir, &self.save_dir)) {
            self.save_dir.join(format!("delivered_{file_name}"))
        } else {
            self.save_dir.join(&*file_name)
        };

        std::fs::copy(path, &target).map_err(|e| doc_err(e.to_string()))?;
        debug!("Delivered {} to {}", path.display(), target.display());

        self.print_block(&format!("{caption}: {}", target.display()))
            .map_err(|e| DeliveryError::Send(e.to_string()))
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    let canonical = |dir: &Path| {
        let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
        std::fs::canonicalize(dir).ok()
    };

    matches!((canonical(a), canonical(b)), (Some(a), Some(b)) if a == b)
}
