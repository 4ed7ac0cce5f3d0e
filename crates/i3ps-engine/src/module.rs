//! Module contract and the reusable scheduling variants.
//!
//! A module is a passive producer of one bar fragment. The engine reads its
//! latest output on every tick, sets its position once at registration, and
//! calls [`Module::registered`] exactly once. Three variants exist:
//!
//! - **synchronous**: implement [`Module`] directly and keep the output
//!   current yourself.
//! - **background, run-once**: implement [`Background`] and wrap it in
//!   [`AsyncModule`]; the main loop gets its own thread.
//! - **background, periodic**: implement [`Periodic`] and wrap it in
//!   [`IntervalModule`]; the compute step runs every interval on its own
//!   thread.
//!
//! Background threads are detached: never joined, never cancelled, they die
//! with the process.

use std::sync::Arc;
use std::time::Duration;

use i3ps_core::Result;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::engine::StatusEngine;

/// Default period between compute steps of an [`IntervalModule`].
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

/// Shortest pause between compute steps. Shorter intervals, zero included,
/// are raised to this.
pub const MIN_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// OutputSlot: single-slot mailbox between a worker and the tick loop
// ---------------------------------------------------------------------------

/// Last-write-wins cell holding a module's current output.
///
/// Cloning shares the slot. Writers overwrite, readers take a copy of the
/// latest value without blocking on the writer.
#[derive(Debug, Clone)]
pub struct OutputSlot {
    tx: Arc<watch::Sender<Value>>,
}

impl OutputSlot {
    /// Empty slot holding `null`.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Value::Null);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the current output.
    pub fn publish(&self, value: Value) {
        self.tx.send_replace(value);
    }

    /// Copy of the current output.
    pub fn latest(&self) -> Value {
        self.tx.borrow().clone()
    }
}

impl Default for OutputSlot {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Module: what the engine needs
// ---------------------------------------------------------------------------

/// Lifecycle of a module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unregistered,
    Registered,
    /// A background thread is producing output.
    Running,
}

/// State every module carries: name, insertion position, output slot and
/// lifecycle phase.
#[derive(Debug, Clone)]
pub struct ModuleState {
    name: String,
    position: i64,
    output: OutputSlot,
    phase: Phase,
}

impl ModuleState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: 0,
            output: OutputSlot::new(),
            phase: Phase::Unregistered,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn set_position(&mut self, position: i64) {
        self.position = position;
    }

    pub fn output(&self) -> &OutputSlot {
        &self.output
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

/// Trait implemented by everything the engine can register.
///
/// Only `Send` is required: the registry lives on the tick loop and modules
/// hand data to their own threads through [`OutputSlot`].
pub trait Module: Send {
    fn state(&self) -> &ModuleState;
    fn state_mut(&mut self) -> &mut ModuleState;

    /// Called once when `engine` registers this module, before it is added:
    /// `engine.modules()` holds the modules registered earlier.
    fn registered(&mut self, _engine: &StatusEngine) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        self.state().name()
    }

    /// Latest output, read by the engine at merge time.
    fn output(&self) -> Value {
        self.state().output().latest()
    }

    fn position(&self) -> i64 {
        self.state().position()
    }

    fn set_position(&mut self, position: i64) {
        self.state_mut().set_position(position);
    }
}

/// Spawn a named, detached thread for a module.
fn spawn_detached<F>(module: &str, f: F) -> Result<()>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(format!("module-{module}"))
        .spawn(f)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// AsyncModule: background, run-once
// ---------------------------------------------------------------------------

/// Work that runs once, on its own thread, for the life of the process.
pub trait Background: Send + 'static {
    /// Publish fragments to `output` at whatever pace suits the module.
    fn mainloop(self, output: OutputSlot);
}

/// [`Module`] that starts a [`Background`] worker at registration.
pub struct AsyncModule<B> {
    state: ModuleState,
    worker: Option<B>,
}

impl<B: Background> AsyncModule<B> {
    pub fn new(name: impl Into<String>, worker: B) -> Self {
        Self {
            state: ModuleState::new(name),
            worker: Some(worker),
        }
    }
}

impl<B: Background> Module for AsyncModule<B> {
    fn state(&self) -> &ModuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModuleState {
        &mut self.state
    }

    fn registered(&mut self, _engine: &StatusEngine) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let output = self.state.output().clone();
        spawn_detached(self.state.name(), move || worker.mainloop(output))?;
        self.state.set_phase(Phase::Running);
        info!("[{}] background loop started", self.state.name());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// IntervalModule: background, periodic
// ---------------------------------------------------------------------------

/// A compute step run at a fixed period.
pub trait Periodic: Send + 'static {
    /// Pause between compute steps, never less than [`MIN_PERIOD`].
    fn interval(&self) -> Duration {
        DEFAULT_PERIOD
    }

    /// Produce the next fragment.
    fn run(&mut self) -> anyhow::Result<Value>;
}

/// [`Module`] that runs a [`Periodic`] step forever on its own thread.
///
/// The first step runs inline during registration so the module has output
/// before the first tick is merged. That step runs on the registering thread:
/// a slow step delays startup, and a panic in it is not contained the way a
/// panic on the worker thread is. Keep `run` short and non-panicking.
pub struct IntervalModule<P> {
    state: ModuleState,
    worker: Option<P>,
}

impl<P: Periodic> IntervalModule<P> {
    pub fn new(name: impl Into<String>, worker: P) -> Self {
        Self {
            state: ModuleState::new(name),
            worker: Some(worker),
        }
    }
}

/// Run one compute step; a failure keeps the previous output.
fn step<P: Periodic>(name: &str, worker: &mut P, output: &OutputSlot) {
    match worker.run() {
        Ok(value) => output.publish(value),
        Err(e) => warn!("[{name}] compute step failed: {e:#}"),
    }
}

impl<P: Periodic> Module for IntervalModule<P> {
    fn state(&self) -> &ModuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ModuleState {
        &mut self.state
    }

    fn registered(&mut self, _engine: &StatusEngine) -> Result<()> {
        let Some(mut worker) = self.worker.take() else {
            return Ok(());
        };
        let name = self.state.name().to_string();
        let output = self.state.output().clone();
        let interval = worker.interval().max(MIN_PERIOD);

        step(&name, &mut worker, &output);

        let thread_name = name.clone();
        spawn_detached(&thread_name, move || {
            loop {
                std::thread::sleep(interval);
                step(&name, &mut worker, &output);
            }
        })?;
        self.state.set_phase(Phase::Running);
        debug!("[{thread_name}] periodic loop started (interval {interval:?})");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Instant;

    use anyhow::anyhow;

    use super::*;

    /// Poll `f` until it returns true or a second passes.
    fn eventually(f: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }

    struct Counter {
        runs: Arc<AtomicU64>,
        interval: Duration,
    }

    impl Periodic for Counter {
        fn interval(&self) -> Duration {
            self.interval
        }

        fn run(&mut self) -> anyhow::Result<Value> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Value::from(n))
        }
    }

    struct FailsAfterFirst {
        calls: u32,
    }

    impl Periodic for FailsAfterFirst {
        fn interval(&self) -> Duration {
            Duration::from_millis(1)
        }

        fn run(&mut self) -> anyhow::Result<Value> {
            self.calls += 1;
            if self.calls == 1 {
                Ok(Value::from("first"))
            } else {
                Err(anyhow!("sensor unavailable"))
            }
        }
    }

    struct Greeter;

    impl Background for Greeter {
        fn mainloop(self, output: OutputSlot) {
            output.publish(Value::from("hello"));
        }
    }

    #[test]
    fn output_slot_last_write_wins() {
        let slot = OutputSlot::new();
        assert_eq!(slot.latest(), Value::Null);
        let writer = slot.clone();
        writer.publish(Value::from(1));
        writer.publish(Value::from(2));
        assert_eq!(slot.latest(), Value::from(2));
    }

    #[test]
    fn interval_module_computes_before_first_tick() {
        let runs = Arc::new(AtomicU64::new(0));
        let mut m = IntervalModule::new(
            "counter",
            Counter {
                runs: runs.clone(),
                interval: Duration::from_secs(3600),
            },
        );
        assert_eq!(m.output(), Value::Null);
        assert_eq!(m.state().phase(), Phase::Unregistered);

        m.registered(&StatusEngine::new()).unwrap();
        assert_eq!(m.output(), Value::from(1));
        assert_eq!(m.state().phase(), Phase::Running);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn interval_module_keeps_running() {
        let runs = Arc::new(AtomicU64::new(0));
        let mut m = IntervalModule::new(
            "counter",
            Counter {
                runs: runs.clone(),
                interval: Duration::from_millis(1),
            },
        );
        m.registered(&StatusEngine::new()).unwrap();
        assert!(eventually(|| runs.load(Ordering::SeqCst) >= 3));
    }

    #[test]
    fn zero_interval_is_paced() {
        let runs = Arc::new(AtomicU64::new(0));
        let mut m = IntervalModule::new(
            "spin",
            Counter {
                runs: runs.clone(),
                interval: Duration::ZERO,
            },
        );
        m.registered(&StatusEngine::new()).unwrap();
        std::thread::sleep(Duration::from_millis(120));
        let steps = runs.load(Ordering::SeqCst);
        assert!((1..=5).contains(&steps), "{steps} steps in 120ms");
    }

    #[test]
    fn failed_step_keeps_previous_output() {
        let mut m = IntervalModule::new("flaky", FailsAfterFirst { calls: 0 });
        m.registered(&StatusEngine::new()).unwrap();
        std::thread::sleep(MIN_PERIOD * 3);
        assert_eq!(m.output(), Value::from("first"));
    }

    #[test]
    fn registered_twice_spawns_once() {
        let runs = Arc::new(AtomicU64::new(0));
        let mut m = IntervalModule::new(
            "counter",
            Counter {
                runs: runs.clone(),
                interval: Duration::from_secs(3600),
            },
        );
        m.registered(&StatusEngine::new()).unwrap();
        m.registered(&StatusEngine::new()).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn async_module_publishes_from_its_thread() {
        let mut m = AsyncModule::new("greeter", Greeter);
        m.registered(&StatusEngine::new()).unwrap();
        assert_eq!(m.state().phase(), Phase::Running);
        assert!(eventually(|| m.output() == Value::from("hello")));
    }

    #[test]
    fn position_defaults_to_zero() {
        let mut m = AsyncModule::new("greeter", Greeter);
        assert_eq!(m.position(), 0);
        m.set_position(3);
        assert_eq!(m.position(), 3);
        assert_eq!(m.name(), "greeter");
    }
}
