// Configuration: command-line flags with environment-variable fallbacks.
// `Cli` is what clap parses; `Config` is the validated form the rest of
// the crate uses.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::{parse_base_url, Message};

pub const DEFAULT_WORKER_URL: &str = "http://secret-post.3ns76ymur.workers.dev";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONTENT: &str = "Hello World";
pub const DEFAULT_EXPIRE_DATE: &str = "2025-12-10";
const KEY_FILE_NAME: &str = ".secret_post_last_key";

#[derive(Parser, Debug)]
#[command(
    name = "secret-post",
    version,
    about = "Store and retrieve messages on a secret-post worker"
)]
pub struct Cli {
    /// Base URL of the message store.
    #[arg(long, global = true, env = "WORKER_URL", default_value = DEFAULT_WORKER_URL)]
    pub url: String,
    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "SECRET_POST_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
    /// File holding the last stored key. Defaults to ~/.secret_post_last_key.
    #[arg(long, global = true, env = "SECRET_POST_KEY_FILE")]
    pub key_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a message, then fetch it back with the returned key (default).
    Smoke(MessageArgs),
    /// Store a message and remember its key.
    Store(MessageArgs),
    /// Fetch a message. Uses the last stored key when KEY is omitted.
    Fetch {
        #[arg(allow_hyphen_values = true)]
        key: Option<String>,
    },
    /// Ask the store to purge expired messages.
    Cleanup,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MessageArgs {
    /// Message body.
    #[arg(long, default_value = DEFAULT_CONTENT)]
    pub content: String,
    /// Expiry date, interpreted by the store.
    #[arg(long, default_value = DEFAULT_EXPIRE_DATE)]
    pub expire_date: String,
    /// Ask the store to delete the message after its first read.
    #[arg(long)]
    pub burn_after_read: bool,
    /// Prompt for the message fields instead of using the flags.
    #[arg(long)]
    pub interactive: bool,
}

impl Default for MessageArgs {
    fn default() -> Self {
        MessageArgs {
            content: DEFAULT_CONTENT.into(),
            expire_date: DEFAULT_EXPIRE_DATE.into(),
            burn_after_read: false,
            interactive: false,
        }
    }
}

impl MessageArgs {
    pub fn to_message(&self) -> Message {
        Message {
            content: self.content.clone(),
            expire_date: self.expire_date.clone(),
            burn_after_read: self.burn_after_read,
        }
    }
}

impl Cli {
    /// The subcommand to run; no subcommand means the smoke test.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Smoke(MessageArgs::default()))
    }
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub timeout: Duration,
    pub key_file: PathBuf,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.timeout_secs == 0 {
            bail!("--timeout-secs must be at least 1");
        }
        let base_url = parse_base_url(&cli.url)?;
        let key_file = cli.key_file.clone().unwrap_or_else(default_key_file);
        Ok(Config {
            base_url,
            timeout: Duration::from_secs(cli.timeout_secs),
            key_file,
        })
    }
}

fn default_key_file() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(KEY_FILE_NAME)
}
