//! Outbound alerts.
//!
//! [`Notifier`] is the seam between a run and wherever its messages go. The
//! production implementation is [`telegram::TelegramNotifier`]; dry runs use
//! [`ConsoleNotifier`].

pub mod telegram;

use std::fmt;
use std::io::Write;

use async_trait::async_trait;
use snafu::{Backtrace, Snafu};

/// Destination chat of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// US ETF alerts (tqqq mode).
    Us,
    /// Korean index screens (potential and wave modes).
    Korea,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Us => f.write_str("us"),
            Channel::Korea => f.write_str("korea"),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum NotifyError {
    /// No credentials are configured for the channel.
    #[snafu(display("Channel {channel} is not configured"))]
    Disabled { channel: Channel, backtrace: Backtrace },

    #[snafu(display("Notification request failed: {source}"))]
    Request {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("Notification rejected ({status}): {description}"))]
    Rejected {
        status: u16,
        description: String,
        backtrace: Backtrace,
    },

    #[snafu(display("Failed to write notification: {source}"))]
    Output {
        source: std::io::Error,
        backtrace: Backtrace,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `message` to `channel`, with an optional PNG/JPEG attachment.
    async fn notify(
        &self,
        channel: Channel,
        message: &str,
        image: Option<Vec<u8>>,
    ) -> Result<(), NotifyError>;
}

/// Prints messages to stdout instead of sending them.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(
        &self,
        channel: Channel,
        message: &str,
        image: Option<Vec<u8>>,
    ) -> Result<(), NotifyError> {
        use snafu::ResultExt;

        let mut out = std::io::stdout().lock();
        writeln!(out, "----- [{channel}] -----").context(OutputSnafu)?;
        writeln!(out, "{message}").context(OutputSnafu)?;
        if let Some(bytes) = image {
            writeln!(out, "(image attachment, {} bytes)", bytes.len()).context(OutputSnafu)?;
        }
        Ok(())
    }
}

/// Splits `text` into pieces of at most `limit` characters, breaking at line
/// ends where possible.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            // a single line longer than the limit is cut hard
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
