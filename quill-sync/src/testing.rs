//! Scripted collaborators for exercising the engine without a repository.
//!
//! Compiled unconditionally so downstream crates can drive their scheduler
//! tests with the same doubles; not part of the supported API.

#![doc(hidden)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use quill_core::CommandResult;
use quill_git::{Gateway, GitError};

use crate::notify::{Notice, Notifier};

/// Successful result with the given stdout.
pub fn ok(stdout: &str) -> CommandResult {
    CommandResult {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
        timed_out: false,
    }
}

/// Failed result with the given exit code.
pub fn fail(exit_code: i32) -> CommandResult {
    CommandResult {
        exit_code,
        stdout: String::new(),
        stderr: "scripted failure".to_string(),
        timed_out: false,
    }
}

/// Gateway answering from per-subcommand queues.
///
/// Responses are keyed by the first argument (`"status"`, `"pull"`, …) and
/// consumed FIFO; a drained or unscripted subcommand answers exit 0 with
/// empty stdout. Every call is recorded.
#[derive(Default)]
pub struct ScriptedGateway {
    responses: Mutex<HashMap<String, VecDeque<CommandResult>>>,
    calls: Mutex<Vec<Vec<String>>>,
    holds: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next response for `subcommand`.
    pub fn respond(&self, subcommand: &str, result: CommandResult) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(subcommand.to_string())
            .or_default()
            .push_back(result);
    }

    /// Make the next execution of `subcommand` suspend until the returned
    /// handle is notified. Used to hold a sequence in flight.
    pub fn hold(&self, subcommand: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.holds
            .lock()
            .expect("holds lock")
            .insert(subcommand.to_string(), Arc::clone(&gate));
        gate
    }

    /// Every argument vector executed so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// How many executed calls started with `subcommand`.
    pub fn count(&self, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|args| args.first().map(String::as_str) == Some(subcommand))
            .count()
    }

    /// Argument vectors restricted to mutating subcommands.
    pub fn mutating_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|args| {
                matches!(
                    args.first().map(String::as_str),
                    Some("pull" | "push" | "commit" | "checkout")
                )
            })
            .collect()
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn execute(&self, args: &[&str]) -> Result<CommandResult, GitError> {
        let subcommand = args.first().copied().unwrap_or_default().to_string();

        let gate = self
            .holds
            .lock()
            .expect("holds lock")
            .remove(&subcommand);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.calls
            .lock()
            .expect("calls lock")
            .push(args.iter().map(|s| s.to_string()).collect());

        let scripted = self
            .responses
            .lock()
            .expect("responses lock")
            .get_mut(&subcommand)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or_else(|| ok("")))
    }
}

/// Notifier that records every notice for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("notices lock").clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.text).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("notices lock").push(notice);
    }
}
