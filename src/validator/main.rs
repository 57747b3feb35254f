//! Standalone checker for credential files.
//!
//! Reports how many records of a credentials file are usable before the
//! file is uploaded to the bot.

use std::process::ExitCode;

use clap::Parser;
use serde_json::json;

use token_batch_bot::credentials::{CredentialPair, CredentialSource, RecordStatus};

/// Credential file checker.
#[derive(Parser, Debug)]
#[command(name = "check_credentials")]
#[command(about = "Counts usable uid/password records in a credentials file")]
#[command(version)]
struct Args {
    /// Path to the JSON credentials file to check.
    #[arg(short, long, default_value = "accounts.json")]
    file: String,

    /// Generate an example credentials file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// List every record with a masked uid and whether it will be used.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Handle example generation
    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    check_file(&args.file, args.verbose)
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = json!([
        { "uid": "1234567890", "password": "EXAMPLE_PASSWORD_1" },
        { "uid": "2345678901", "password": "EXAMPLE_PASSWORD_2" },
        { "uid": "3456789012", "password": "" },
    ]);

    let content = match serde_json::to_string_pretty(&example) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("✗ Failed to build example file: {e}");
            return ExitCode::FAILURE;
        }
    };

    match std::fs::write(output_path, content) {
        Ok(()) => {
            println!("✓ Example credentials written to: {output_path}");
            println!("\nThe file contains 3 records, 2 of them usable.");
            println!("Records need both a non-empty 'uid' and 'password' to be used.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn check_file(path: &str, verbose: bool) -> ExitCode {
    println!("Checking: {path}\n");

    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("✗ Failed to read file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let summary = match CredentialSource::summarize(&raw) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    if verbose {
        for line in listing(&raw) {
            println!("{line}");
        }
        println!();
    }

    let skipped = summary.total - summary.valid;

    if summary.valid == 0 {
        println!("✗ No usable records among {} entries", summary.total);
        return ExitCode::FAILURE;
    }

    println!("✓ {} of {} records are usable", summary.valid, summary.total);
    if skipped > 0 {
        println!("  ({skipped} record(s) skipped - missing uid or password)");
    }

    ExitCode::SUCCESS
}

/// One entry per record, usable or skipped, in file order.
fn listing(raw: &[u8]) -> Vec<String> {
    CredentialSource::inspect(raw)
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, status)| format!("[{}] {}", i + 1, describe(status)))
        .collect()
}

fn describe(status: &RecordStatus) -> String {
    match status {
        RecordStatus::Usable(pair) => format!("{}\n  ✓ Usable", describe_pair(pair)),
        RecordStatus::Skipped { uid, reason } => format!(
            "uid {}\n  ✗ Skipped: {reason}",
            uid.as_deref().unwrap_or("(none)")
        ),
    }
}

fn describe_pair(pair: &CredentialPair) -> String {
    format!(
        "uid {} ({} char password)",
        pair.masked_identifier(),
        pair.secret().chars().count()
    )
}
