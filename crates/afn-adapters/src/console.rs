//! Operator commands from a line-oriented stream (stdin by default).

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};
use tracing::warn;

use afn_control::CommandSource;

/// Reads one command per line and writes each reply as a line.
pub struct ConsoleCommandSource<R, W> {
    lines: Lines<R>,
    output: W,
}

impl ConsoleCommandSource<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleCommandSource<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            lines: input.lines(),
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[async_trait]
impl<R, W> CommandSource for ConsoleCommandSource<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_command(&mut self) -> Option<String> {
        match self.lines.next_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to read command input");
                None
            }
        }
    }

    async fn reply(&mut self, text: &str) {
        let line = format!("{}\n", text);
        if let Err(e) = self.output.write_all(line.as_bytes()).await {
            warn!(error = %e, "Failed to write command reply");
            return;
        }
        if let Err(e) = self.output.flush().await {
            warn!(error = %e, "Failed to flush command reply");
        }
    }
}
