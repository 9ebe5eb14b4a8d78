//! Line-oriented console driver
//!
//! Drives the dialogue for a single submitter from any line reader. Lines
//! starting with `/` are commands, `photo <path> [caption]` sends a photo
//! and everything else is typed text (which also selects a button with the
//! same label). A literal `\n` inside a line stands for a line break.

use crate::bot::IntakeBot;
use crate::dialogue::{Event, Keyboard, Reply};
use crate::submission::{PhotoHandle, Submitter};
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Turn one console line into an event; blank lines and unknown commands
/// yield `None`
pub fn parse_line(line: &str) -> Option<Event> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    if line.trim_start().starts_with('/') {
        return Event::from_command(line);
    }
    if let Some(rest) = line.strip_prefix("photo ") {
        let rest = rest.trim_start();
        let (path, caption) = match rest.split_once(char::is_whitespace) {
            Some((path, caption)) if !caption.trim().is_empty() => {
                (path, Some(unescape(caption.trim())))
            }
            Some((path, _)) => (path, None),
            None => (rest, None),
        };
        if path.is_empty() {
            return None;
        }
        return Some(Event::PhotoMessage {
            id: PhotoHandle::new(path),
            caption,
        });
    }
    Some(Event::TextMessage {
        body: unescape(line),
    })
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
}

/// Render a reply the way a chat client would show it
pub fn render_reply(reply: &Reply) -> String {
    let mut out = reply.text.clone();
    if let Keyboard::Buttons(rows) = &reply.keyboard {
        for row in rows {
            out.push('\n');
            let buttons: Vec<String> = row.iter().map(|b| format!("[{b}]")).collect();
            out.push_str(&buttons.join(" "));
        }
    }
    out
}

/// Feed every line from `input` to the bot and write the replies to
/// `output` until end of input
pub async fn run_console<R, W>(
    bot: &IntakeBot,
    submitter: &Submitter,
    input: R,
    mut output: W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let Some(event) = parse_line(&line) else {
            if !line.trim().is_empty() {
                output.write_all(b"Unknown command.\n\n").await?;
            }
            continue;
        };
        debug!("Console event: {:?}", event.kind());
        for reply in bot.handle(submitter, event).await {
            output.write_all(render_reply(&reply).as_bytes()).await?;
            output.write_all(b"\n\n").await?;
        }
        output.flush().await?;
    }
    Ok(())
}
