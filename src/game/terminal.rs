//! Line-oriented player input
//!
//! Standard input is read on one dedicated thread and forwarded over a
//! channel, so the game loop, push-to-talk and narration skip all await the
//! same source of key presses.

use std::io::BufRead;

use tokio::sync::mpsc;

/// Async source of input lines
pub struct Terminal {
    lines: mpsc::UnboundedReceiver<String>,
}

impl Terminal {
    /// Read lines from standard input
    #[must_use]
    pub fn stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let spawned = std::thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "failed to read stdin");
                            break;
                        }
                    }
                }
                tracing::debug!("stdin closed");
            });

        if let Err(e) = spawned {
            tracing::error!(error = %e, "failed to spawn stdin reader");
        }

        Self { lines: rx }
    }

    /// Use an existing channel as the input source
    #[must_use]
    pub const fn from_channel(lines: mpsc::UnboundedReceiver<String>) -> Self {
        Self { lines }
    }

    /// Next line, or `None` once input is closed
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Resolve on the next ENTER
    ///
    /// Never resolves once input is closed, so a closed stdin cannot skip
    /// narration or end a recording by itself.
    pub async fn key_press(&mut self) {
        if self.lines.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_lines_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut terminal = Terminal::from_channel(rx);

        tx.send("list".to_string()).unwrap();
        tx.send("quit".to_string()).unwrap();
        drop(tx);

        assert_eq!(terminal.next_line().await.as_deref(), Some("list"));
        assert_eq!(terminal.next_line().await.as_deref(), Some("quit"));
        assert_eq!(terminal.next_line().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_press_pends_after_close() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let mut terminal = Terminal::from_channel(rx);
        drop(tx);

        let pressed = tokio::time::timeout(Duration::from_secs(5), terminal.key_press()).await;
        assert!(pressed.is_err());
    }
}
