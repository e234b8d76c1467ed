//! CLI channel — stdin/stdout REPL for local testing.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::channels::{Activity, Channel, MessageStream, Reply};
use crate::error::ChannelError;

/// A simple CLI channel that reads from stdin and writes to stdout.
///
/// Every line becomes a message activity from a single configured user.
pub struct CliChannel {
    user_id: String,
}

impl CliChannel {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Render a reply for the terminal. Choices are shown as `[a] [b] [c]`.
pub fn render_reply(reply: &Reply) -> String {
    match reply {
        Reply::Text { text } => text.clone(),
        Reply::SuggestedActions { text, choices } => {
            let buttons: Vec<String> = choices.iter().map(|c| format!("[{c}]")).collect();
            format!("{}\n{}", text, buttons.join(" "))
        }
    }
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user_id = self.user_id.clone();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        // Language codes are matched exactly, so only the
                        // line terminator is stripped.
                        let line = line.trim_end_matches(['\r', '\n']).to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        if line == "/quit" {
                            break;
                        }
                        let activity = Activity::message("cli", &user_id, &line);
                        if tx.send(activity).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(&self, _activity: &Activity, reply: Reply) -> Result<(), ChannelError> {
        let send_failed = |e: std::io::Error| ChannelError::SendFailed {
            name: "cli".to_string(),
            reason: e.to_string(),
        };
        let mut stdout = tokio::io::stdout();
        let out = format!("\n{}\n\n", render_reply(&reply));
        stdout.write_all(out.as_bytes()).await.map_err(send_failed)?;
        stdout.flush().await.map_err(send_failed)?;
        eprint!("> ");
        Ok(())
    }
}
