// UI layer: the console flows (smoke test, store, fetch, cleanup).
// Report lines are written to the given writer so the binary can use
// stdout while tests capture them; the spinner draws on stderr and hides
// itself when stderr is not a terminal.

use crate::api::{ApiClient, ApiError, FetchOutcome, Message};
use crate::config::{Command, Config, MessageArgs};
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

/// How a flow ended. Only a failed store, a failed cleanup, or a fetch
/// with no key to use counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Failed,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Outcome::Completed => 0,
            Outcome::Failed => 1,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Dispatch one parsed command.
pub fn run(api: &ApiClient, config: &Config, command: Command, out: &mut impl Write) -> Result<Outcome> {
    match command {
        Command::Smoke(args) => {
            let message = compose(&args)?;
            smoke_test(api, &message, out)
        }
        Command::Store(args) => {
            let message = compose(&args)?;
            store_message(api, &message, &config.key_file, out)
        }
        Command::Fetch { key } => {
            let key = match key {
                Some(key) => key,
                None => match load_key(&config.key_file) {
                    Ok(key) => key,
                    Err(e) => {
                        writeln!(out, "No key given and no stored key found: {e:#}")?;
                        return Ok(Outcome::Failed);
                    }
                },
            };
            fetch_message(api, &key, out)?;
            Ok(Outcome::Completed)
        }
        Command::Cleanup => cleanup(api, out),
    }
}

/// Store `message`, then fetch it back with the returned key. A failed
/// store ends the flow before any GET is issued.
pub fn smoke_test(api: &ApiClient, message: &Message, out: &mut impl Write) -> Result<Outcome> {
    let Some(key) = submit(api, message, out)? else {
        return Ok(Outcome::Failed);
    };
    fetch_message(api, &key, out)?;
    Ok(Outcome::Completed)
}

/// Store `message` and remember its key in `key_file` for a later fetch.
pub fn store_message(
    api: &ApiClient,
    message: &Message,
    key_file: &Path,
    out: &mut impl Write,
) -> Result<Outcome> {
    let Some(key) = submit(api, message, out)? else {
        return Ok(Outcome::Failed);
    };
    // Not being able to remember the key does not undo the store.
    match persist_key(key_file, &key) {
        Ok(()) => info!(path = %key_file.display(), "saved key"),
        Err(e) => warn!(path = %key_file.display(), error = %e, "could not save key"),
    }
    Ok(Outcome::Completed)
}

/// Fetch and print the message stored under `key`. Every failure here is
/// reported and swallowed.
pub fn fetch_message(api: &ApiClient, key: &str, out: &mut impl Write) -> Result<()> {
    let spinner = spinner("Fetching message...");
    let result = api.fetch(key);
    spinner.finish_and_clear();

    match result {
        Ok(outcome) => render_fetch(&outcome, out),
        Err(e) => {
            writeln!(out, "GET failed: {e}")?;
            Ok(())
        }
    }
}

pub fn cleanup(api: &ApiClient, out: &mut impl Write) -> Result<Outcome> {
    let spinner = spinner("Purging expired messages...");
    let result = api.cleanup();
    spinner.finish_and_clear();

    match result {
        Ok(()) => {
            writeln!(out, "Expired messages purged")?;
            Ok(Outcome::Completed)
        }
        Err(e) => {
            writeln!(out, "Cleanup failed: {e}")?;
            Ok(Outcome::Failed)
        }
    }
}

/// Print a fetch result. JSON is pretty-printed with two-space indent and
/// non-ASCII text left as is.
pub fn render_fetch(outcome: &FetchOutcome, out: &mut impl Write) -> Result<()> {
    match outcome {
        FetchOutcome::Found(value) => {
            writeln!(out, "Retrieved message:")?;
            writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
        }
        FetchOutcome::NotJson(body) => {
            writeln!(out, "Retrieved message is not JSON, raw body:")?;
            writeln!(out, "{body}")?;
        }
        FetchOutcome::NotFound => writeln!(out, "Message not found")?,
        FetchOutcome::Failed { status, body } => writeln!(out, "GET failed: {status}, {body}")?,
    }
    Ok(())
}

/// POST the message and print the key, or the failure. Returns the key
/// on success.
fn submit(api: &ApiClient, message: &Message, out: &mut impl Write) -> Result<Option<String>> {
    let spinner = spinner("Storing message...");
    let result = api.store(message);
    spinner.finish_and_clear();

    match result {
        Ok(key) => {
            writeln!(out, "Message stored with key: {key}")?;
            Ok(Some(key))
        }
        Err(ApiError::Status { status, body }) => {
            writeln!(out, "POST failed: {status}, {body}")?;
            Ok(None)
        }
        Err(e) => {
            writeln!(out, "POST failed: {e}")?;
            Ok(None)
        }
    }
}

/// Build the message from flags, or prompt for each field with the flag
/// values as defaults when `--interactive` is set.
fn compose(args: &MessageArgs) -> Result<Message> {
    if !args.interactive {
        return Ok(args.to_message());
    }
    let content: String = Input::new()
        .with_prompt("Content")
        .default(args.content.clone())
        .interact_text()
        .context("Failed to read message content")?;
    let expire_date: String = Input::new()
        .with_prompt("Expire date")
        .default(args.expire_date.clone())
        .interact_text()
        .context("Failed to read expire date")?;
    let burn_after_read = Confirm::new()
        .with_prompt("Burn after read?")
        .default(args.burn_after_read)
        .interact()
        .context("Failed to read burn-after-read choice")?;
    Ok(Message {
        content,
        expire_date,
        burn_after_read,
    })
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Write the key exactly as received so `load_key` returns the same bytes.
pub fn persist_key(path: &Path, key: &str) -> Result<()> {
    std::fs::write(path, key).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn load_key(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
