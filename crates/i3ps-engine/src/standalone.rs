//! Host simulator for running without i3status.
//!
//! [`StandaloneIo`] answers reads with the i3bar protocol header followed by
//! an endless stream of empty tick arrays, pausing a fixed interval before
//! every tick. Writes go to a real writer (standard output by default).

use std::time::Duration;

use async_trait::async_trait;
use i3ps_core::Result;
use i3ps_core::shutdown::ShutdownSignal;
use tokio::io::{AsyncWrite, Stdout};
use tracing::debug;

use crate::io::{LineChannel, write_frame};

/// Lines served in order; the last one repeats forever.
const PROTOCOL: [&str; 4] = [r#"{"version": 1}"#, "[", "[]", ",[]"];

/// Default pause between simulated ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// [`LineChannel`] that fabricates the host side of the protocol.
pub struct StandaloneIo<W = Stdout> {
    served: usize,
    interval: Duration,
    writer: W,
    shutdown: ShutdownSignal,
}

impl StandaloneIo<Stdout> {
    /// Simulator writing to standard output.
    pub fn new(interval: Duration) -> Self {
        Self::with_writer(interval, tokio::io::stdout())
    }
}

impl<W> StandaloneIo<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn with_writer(interval: Duration, writer: W) -> Self {
        Self {
            served: 0,
            interval,
            writer,
            shutdown: ShutdownSignal::never(),
        }
    }

    /// Attach an interrupt signal that ends the tick sequence.
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl Default for StandaloneIo<Stdout> {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL)
    }
}

#[async_trait]
impl<W> LineChannel for StandaloneIo<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn read_line(&mut self) -> Result<String> {
        let line = PROTOCOL[self.served.min(PROTOCOL.len() - 1)];
        self.served = self.served.saturating_add(1);
        Ok(line.to_string())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        write_frame(&mut self.writer, line).await
    }

    async fn next_line(&mut self) -> Result<Option<String>> {
        tokio::select! {
            _ = tokio::time::sleep(self.interval) => {}
            _ = self.shutdown.interrupted() => {
                debug!("standalone tick source interrupted");
                return Ok(None);
            }
        }
        self.read_line().await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_header_then_empty_ticks() {
        let mut io = StandaloneIo::with_writer(Duration::ZERO, Vec::new());
        let mut lines = Vec::new();
        for _ in 0..6 {
            lines.push(io.read_line().await.unwrap());
        }
        assert_eq!(lines, [r#"{"version": 1}"#, "[", "[]", ",[]", ",[]", ",[]"]);
    }

    #[tokio::test]
    async fn next_line_never_ends_on_its_own() {
        let mut io = StandaloneIo::with_writer(Duration::from_millis(1), Vec::new());
        io.read_line().await.unwrap();
        io.read_line().await.unwrap();
        assert_eq!(io.next_line().await.unwrap().as_deref(), Some("[]"));
        for _ in 0..10 {
            assert_eq!(io.next_line().await.unwrap().as_deref(), Some(",[]"));
        }
    }

    #[tokio::test]
    async fn interrupt_ends_sequence() {
        let (trigger, signal) = ShutdownSignal::new();
        let mut io =
            StandaloneIo::with_writer(Duration::from_secs(60), Vec::new()).with_shutdown(signal);
        trigger.trigger();
        assert_eq!(io.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn writes_reach_the_writer() {
        let mut io = StandaloneIo::with_writer(Duration::ZERO, Vec::new());
        io.write_line(r#"{"version": 1}"#).await.unwrap();
        assert_eq!(io.into_writer(), b"{\"version\": 1}\n");
    }

    #[test]
    fn default_interval_is_one_second() {
        assert_eq!(DEFAULT_INTERVAL, Duration::from_secs(1));
    }
}
