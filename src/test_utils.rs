//! Scripted executors for unit and integration tests.
//!
//! [`FakeExecutor`] answers runtime commands from a table of argument
//! prefixes and records every call, so tests can assert exactly which
//! processes would have been spawned. A [`Gate`] can hold calls in flight
//! until the test releases them.
//!
//! Compiled for unit tests, and for integration tests through the
//! `test-utils` feature.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::docker::{CommandOutcome, Executor, RuntimeCommand};

/// Upper bound on how long a gated call waits before giving up.
const GATE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
struct GateState {
    open: bool,
    waiting: usize,
}

/// A latch that blocks executor calls until opened.
#[derive(Debug, Default)]
pub struct Gate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl Gate {
    /// Creates a closed gate.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Releases every current and future waiter.
    pub fn open(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open = true;
        self.changed.notify_all();
    }

    /// Blocks until the gate is opened (or the safety timeout passes).
    pub fn wait(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.waiting += 1;
        self.changed.notify_all();

        let (mut state, _) = self
            .changed
            .wait_timeout_while(state, GATE_TIMEOUT, |s| !s.open)
            .unwrap_or_else(PoisonError::into_inner);
        state.waiting -= 1;
        self.changed.notify_all();
    }

    /// Number of calls currently held at the gate.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .waiting
    }

    /// Blocks until at least `count` calls are held, or `timeout` passes.
    ///
    /// Returns true if the count was reached.
    pub fn wait_for_waiters(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        while state.waiting < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            state = self
                .changed
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

/// Executor that replays canned outcomes.
///
/// A command is answered by the response whose argument prefix is the
/// longest match; commands with no match get exit code 1 and no output.
#[derive(Debug, Default)]
pub struct FakeExecutor {
    responses: Vec<(Vec<String>, CommandOutcome)>,
    calls: Mutex<Vec<Vec<String>>>,
    gate: Option<Arc<Gate>>,
}

impl FakeExecutor {
    /// Creates an executor with no responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers commands starting with `prefix` with the given output and exit code.
    #[must_use]
    pub fn respond(mut self, prefix: &[&str], output: &str, exit_code: i32) -> Self {
        let prefix = prefix.iter().map(|s| (*s).to_string()).collect();
        self.responses
            .push((prefix, CommandOutcome::new(output, exit_code)));
        self
    }

    /// Holds every call at `gate` before answering.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Returns the argument vectors of every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of calls whose arguments start with `prefix`.
    #[must_use]
    pub fn count_calls(&self, prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|args| starts_with(args, prefix))
            .count()
    }

    fn lookup(&self, args: &[String]) -> CommandOutcome {
        self.responses
            .iter()
            .filter(|(prefix, _)| starts_with(args, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| CommandOutcome::new("", 1))
    }
}

fn starts_with<S: AsRef<str>>(args: &[String], prefix: &[S]) -> bool {
    prefix.len() <= args.len()
        && args
            .iter()
            .zip(prefix)
            .all(|(arg, expected)| arg == expected.as_ref())
}

impl Executor for FakeExecutor {
    fn execute(&self, command: &RuntimeCommand) -> CommandOutcome {
        let args = command.arguments().to_vec();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(args.clone());

        if let Some(gate) = &self.gate {
            gate.wait();
        }

        self.lookup(&args)
    }
}
