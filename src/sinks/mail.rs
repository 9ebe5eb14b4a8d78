//! Spool-directory mail transport
//!
//! Writes each message as an RFC 822 style file that a relay (or an
//! operator) picks up. Keeps the bot free of SMTP credentials.

use super::{EmailMessage, Mailer};
use crate::{IntakeError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

pub struct SpoolMailer {
    spool_dir: PathBuf,
}

impl SpoolMailer {
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }

    fn render(message: &EmailMessage) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=utf-8\r\n\r\n{}\r\n",
            header_value(&message.from),
            header_value(&message.to.join(", ")),
            header_value(&message.subject),
            message.html_body
        )
    }
}

/// Fold a value onto a single header line
fn header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

#[async_trait]
impl Mailer for SpoolMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if message.to.is_empty() {
            return Err(IntakeError::configuration("no email recipients configured"));
        }
        fs::create_dir_all(&self.spool_dir).await?;
        let file_name = format!(
            "{}-{}.eml",
            Utc::now().format("%Y%m%dT%H%M%S"),
            Uuid::new_v4()
        );
        fs::write(self.spool_dir.join(file_name), Self::render(message)).await?;
        Ok(())
    }
}
