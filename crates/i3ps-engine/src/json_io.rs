//! JSON tick pipeline on top of a [`LineChannel`].
//!
//! ```text
//! host ──► {"version": 1} ──► echo
//!      ──► [              ──► echo
//!      ──► [...]          ──► parse ─► mutate ─► serialize ─► [...]
//!      ──► ,[...]         ──► parse ─► mutate ─► serialize ─► ,[...]
//! ```
//!
//! Every tick after the first carries a leading comma (the bar protocol is
//! one endless JSON array); the comma is stripped before parsing and put back
//! in front of the serialized result.

use i3ps_core::{Result, StatusError};
use serde_json::Value;
use tracing::{debug, info};

use crate::io::LineChannel;

/// One parsed tick: the bar segments produced upstream.
pub type Tick = Vec<Value>;

/// Protocol pipeline that owns the line channel after the handshake.
pub struct JsonIo<C> {
    io: C,
    ticks: u64,
}

impl<C: LineChannel> JsonIo<C> {
    /// Perform the handshake: read the version header and the opening
    /// bracket, echoing each back unchanged.
    pub async fn handshake(mut io: C) -> Result<Self> {
        let header = io.read_line().await?;
        io.write_line(&header).await?;
        let opening = io.read_line().await?;
        io.write_line(&opening).await?;
        info!("protocol handshake complete: {header}");
        Ok(Self { io, ticks: 0 })
    }

    /// Process the next tick from the channel.
    ///
    /// Returns `Ok(false)` once the channel has reached end-of-stream.
    pub async fn next_tick<F>(&mut self, mutate: F) -> Result<bool>
    where
        F: FnOnce(&mut Tick) -> Result<()>,
    {
        let Some(line) = self.io.next_line().await? else {
            info!("end of stream after {} tick(s)", self.ticks);
            return Ok(false);
        };
        self.parse_line(&line, mutate).await?;
        Ok(true)
    }

    /// Parse one tick line, hand the array to `mutate`, then write the
    /// result back with the original separator.
    ///
    /// The write happens even when `mutate` fails; its error is returned
    /// afterwards. A line that is not a JSON array fails before anything is
    /// written.
    pub async fn parse_line<F>(&mut self, line: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Tick) -> Result<()>,
    {
        let (prefix, body) = match line.strip_prefix(',') {
            Some(rest) => (",", rest),
            None => ("", line),
        };

        let mut tick: Tick = serde_json::from_str(body).map_err(|source| StatusError::Protocol {
            line: line.to_string(),
            source,
        })?;

        let outcome = mutate(&mut tick);

        let json = serde_json::to_string(&tick).map_err(StatusError::Serialize)?;
        self.io.write_line(&format!("{prefix}{json}")).await?;
        self.ticks += 1;
        debug!("tick {} written ({} segments)", self.ticks, tick.len());

        outcome
    }

    /// Process ticks until end-of-stream; returns the number written.
    pub async fn run<F>(&mut self, mut mutate: F) -> Result<u64>
    where
        F: FnMut(&mut Tick) -> Result<()>,
    {
        while self.next_tick(&mut mutate).await? {}
        Ok(self.ticks)
    }

    /// Number of ticks written so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn into_channel(self) -> C {
        self.io
    }
}
