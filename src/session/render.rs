//! Message texts shown to users.

use super::types::{Button, CHECK_CHANNEL, Server};
use crate::config::ServiceSettings;
use crate::pipeline::{BatchSummary, ProgressSnapshot};

const BAR_WIDTH: usize = 10;

pub const PROCESSING: &str = "🔄 Processing token generation, please wait...";
pub const COMPLETE: &str = "✅ Generation Complete!";
pub const DOCUMENT_CAPTION: &str = "🔑 Your generated tokens file";

/// Welcome text sent on `/start`.
#[must_use]
pub fn welcome(settings: &ServiceSettings) -> String {
    format!(
        "✨ Welcome to Advanced Token Generator Bot ✨\n\
         Version {} by {}",
        settings.bot_version, settings.bot_owner
    )
}

/// Channel prompt with the join link and the check button.
#[must_use]
pub fn channel_gate(settings: &ServiceSettings) -> (String, Vec<Vec<Button>>) {
    let text = "Please join our channel before starting the token generation process:\n\
                Channel link and verification button below:"
        .to_owned();
    let rows = vec![vec![
        Button::url("📢 Join Channel", settings.channel_link.clone()),
        Button::callback("✅ Check", CHECK_CHANNEL),
    ]];
    (text, rows)
}

/// Server selection prompt.
#[must_use]
pub fn server_choice() -> (String, Vec<Vec<Button>>) {
    let text = "🌍 Please choose your server:\n\nOther servers will be available soon!".to_owned();
    let rows = Server::ALL
        .into_iter()
        .map(|server| vec![Button::callback(server.label(), server.callback_data())])
        .collect();
    (text, rows)
}

/// Upload prompt after a server was picked.
#[must_use]
pub fn upload_prompt(server: Server) -> String {
    format!(
        "🔑 Advanced Token Generator Bot - {server} Server\n\n\
         📤 Please send me a JSON file containing UID/password pairs to begin"
    )
}

/// Count prompt after an accepted upload.
#[must_use]
pub fn count_prompt(valid_accounts: usize) -> String {
    format!(
        "🔍 Found {valid_accounts} valid accounts\n\n\
         🔢 How many tokens would you like to generate? (Max {valid_accounts})"
    )
}

/// Progress line with a ten-cell bar, e.g. `📊 Progress: [██████    ] 60%`.
#[must_use]
pub fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    let filled = usize::from(percent) / 10;
    format!(
        "📊 Progress: [{}{}] {percent}%",
        "█".repeat(filled),
        " ".repeat(BAR_WIDTH - filled)
    )
}

/// Progress line for a snapshot.
#[must_use]
pub fn snapshot_line(snapshot: &ProgressSnapshot<'_>) -> String {
    progress_bar(snapshot.percent_complete)
}

/// Final counts of a finished batch.
#[must_use]
pub fn final_results(summary: &BatchSummary) -> String {
    format!(
        "📊 Final Results:\n\
         ✔️ Success: {}\n\
         ✖️ Failed: {}\n\
         ⏱️ Time Taken: {}",
        summary.state.succeeded(),
        summary.state.failed(),
        format_elapsed(summary.elapsed_secs())
    )
}

/// Formats elapsed seconds for the results message.
fn format_elapsed(secs: u64) -> String {
    if secs < 60 {
        format!("{secs} seconds")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
