//! Concurrent line readers for a child's output streams.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::result::{OutputLine, OutputSource};

/// Two reader tasks, one per stream, feeding a shared channel.
///
/// Lines of one stream keep their order; lines of different streams may
/// interleave in any order. Dropping the aggregator aborts both readers.
#[derive(Debug)]
pub struct OutputAggregator {
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
}

impl OutputAggregator {
    /// Start reading both streams into `tx`.
    pub fn start<O, E>(stdout: O, stderr: E, tx: mpsc::UnboundedSender<OutputLine>) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let stdout_task = tokio::spawn(read_lines(stdout, OutputSource::Stdout, tx.clone()));
        let stderr_task = tokio::spawn(read_lines(stderr, OutputSource::Stderr, tx));
        Self {
            stdout_task,
            stderr_task,
        }
    }

    /// Check if both readers reached end of stream.
    pub fn is_finished(&self) -> bool {
        self.stdout_task.is_finished() && self.stderr_task.is_finished()
    }

    /// Stop both readers.
    pub fn abort(&self) {
        self.stdout_task.abort();
        self.stderr_task.abort();
    }
}

impl Drop for OutputAggregator {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Read `reader` line by line until end of stream or until the receiver
/// is gone.
///
/// Line terminators (`\n`, `\r\n`) are removed and invalid UTF-8 is
/// replaced.
pub async fn read_lines<R>(reader: R, source: OutputSource, tx: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => {
                trace!(?source, "stream reader: EOF");
                break;
            }
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let text = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(OutputLine::new(source, text)).is_err() {
                    debug!(?source, "stream reader: channel closed");
                    break;
                }
            }
            Err(e) => {
                debug!(?source, "stream reader error: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        read_lines(input, OutputSource::Stdout, tx).await;

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line.text);
        }
        lines
    }

    #[tokio::test]
    async fn test_read_lines_in_order() {
        let lines = collect(b"one\ntwo\nthree\n").await;
        assert_eq!(lines, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_trailing_partial_line() {
        let lines = collect(b"done\nno newline").await;
        assert_eq!(lines, vec!["done", "no newline"]);
    }

    #[tokio::test]
    async fn test_crlf_and_empty_lines() {
        let lines = collect(b"a\r\n\r\nb\n").await;
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let lines = collect(b"ok \xff\n").await;
        assert_eq!(lines, vec!["ok \u{fffd}"]);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        assert!(collect(b"").await.is_empty());
    }

    #[tokio::test]
    async fn test_stops_when_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        // Must return instead of reading forever.
        read_lines(&b"a\nb\n"[..], OutputSource::Stderr, tx).await;
    }

    #[tokio::test]
    async fn test_aggregator_tags_sources() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let aggregator = OutputAggregator::start(&b"out1\nout2\n"[..], &b"err1\n"[..], tx);

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        while let Some(line) = rx.recv().await {
            match line.source {
                OutputSource::Stdout => stdout.push(line.text),
                OutputSource::Stderr => stderr.push(line.text),
            }
        }

        assert_eq!(stdout, vec!["out1", "out2"]);
        assert_eq!(stderr, vec!["err1"]);
        // Channel closed, so both tasks have returned or are about to.
        drop(aggregator);
    }
}
