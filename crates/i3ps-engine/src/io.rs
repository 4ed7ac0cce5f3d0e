//! Line-oriented byte channels.
//!
//! The bar protocol is one JSON frame per line in both directions. A
//! [`LineChannel`] reads one stripped line at a time and writes one
//! `\n`-terminated line at a time, flushing after every write so the bar sees
//! each tick as soon as it is produced.

use async_trait::async_trait;
use i3ps_core::shutdown::ShutdownSignal;
use i3ps_core::{Result, StatusError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::trace;

/// Trait implemented by every source/sink of protocol lines.
#[async_trait]
pub trait LineChannel: Send {
    /// Read one line with surrounding whitespace stripped.
    ///
    /// Fails with [`StatusError::EndOfStream`] when the stream is closed, the
    /// interrupt signal fires while waiting, or the stripped line is empty.
    async fn read_line(&mut self) -> Result<String>;

    /// Write `line` followed by `\n` and flush.
    async fn write_line(&mut self, line: &str) -> Result<()>;

    /// Next line of the tick sequence; `None` once the stream has ended.
    async fn next_line(&mut self) -> Result<Option<String>> {
        match self.read_line().await {
            Ok(line) => Ok(Some(line)),
            Err(StatusError::EndOfStream) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Write one frame and flush.
pub(crate) async fn write_frame<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut frame = String::with_capacity(line.len() + 1);
    frame.push_str(line);
    frame.push('\n');
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    trace!("wrote {line}");
    Ok(())
}

/// [`LineChannel`] over an arbitrary buffered reader and writer.
pub struct LineIo<R, W> {
    reader: R,
    writer: W,
    shutdown: ShutdownSignal,
    buf: String,
}

impl LineIo<BufReader<Stdin>, Stdout> {
    /// Channel over the process's standard input and output.
    pub fn stdio(shutdown: ShutdownSignal) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).with_shutdown(shutdown)
    }
}

impl<R, W> LineIo<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Channel that is never interrupted.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            shutdown: ShutdownSignal::never(),
            buf: String::new(),
        }
    }

    /// Attach an interrupt signal that ends pending reads.
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<R, W> LineChannel for LineIo<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<String> {
        self.buf.clear();
        let n = tokio::select! {
            res = self.reader.read_line(&mut self.buf) => res?,
            _ = self.shutdown.interrupted() => return Err(StatusError::EndOfStream),
        };
        // i3status signals the end with EOF or an empty line
        let line = self.buf.trim();
        if n == 0 || line.is_empty() {
            return Err(StatusError::EndOfStream);
        }
        trace!("read {line}");
        Ok(line.to_string())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        write_frame(&mut self.writer, line).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn reads_stripped_lines_until_eof() {
        let input: &[u8] = b"  first  \n,[1]\r\n";
        let mut io = LineIo::new(input, Vec::new());
        assert_eq!(io.read_line().await.unwrap(), "first");
        assert_eq!(io.read_line().await.unwrap(), ",[1]");
        assert!(io.read_line().await.unwrap_err().is_end_of_stream());
    }

    #[tokio::test]
    async fn empty_line_ends_stream() {
        let input: &[u8] = b"a\n   \nb\n";
        let mut io = LineIo::new(input, Vec::new());
        assert_eq!(io.next_line().await.unwrap().as_deref(), Some("a"));
        assert_eq!(io.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn write_line_appends_newline() {
        let mut io = LineIo::new(&b""[..], Vec::new());
        io.write_line("[]").await.unwrap();
        io.write_line(",[]").await.unwrap();
        assert_eq!(io.into_writer(), b"[]\n,[]\n");
    }

    #[tokio::test]
    async fn interrupt_while_blocked_is_end_of_stream() {
        // Keep the write half alive so the read genuinely blocks.
        let (_host, engine_side) = tokio::io::duplex(64);
        let (trigger, signal) = ShutdownSignal::new();
        let mut io = LineIo::new(BufReader::new(engine_side), Vec::new()).with_shutdown(signal);

        let reader = tokio::spawn(async move { io.read_line().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();

        let res = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .unwrap()
            .unwrap();
        assert!(res.unwrap_err().is_end_of_stream());
    }

    #[tokio::test]
    async fn invalid_utf8_is_io_error() {
        let input: &[u8] = b"\xff\xfe\n";
        let mut io = LineIo::new(input, Vec::new());
        assert!(matches!(io.read_line().await, Err(StatusError::Io(_))));
    }
}
