//! Mock connector for testing.
//!
//! Provides a scriptable, in-memory `Connector` whose sessions record every
//! call they receive, so cleanup and transaction behavior can be asserted
//! without a database.

use super::{Connector, Session, StatementOutput, Value};
use crate::config::ConnectionDescriptor;
use crate::error::{NimbusError, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// Counters and captured arguments shared by a `MockConnector` and its sessions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockJournal {
    pub connects: usize,
    pub executes: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub closes: usize,
    pub statements: Vec<String>,
    pub params: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, Default)]
struct Script {
    connect_error: Option<String>,
    execute_error: Option<(Option<String>, String)>,
    unexpected_error: Option<String>,
    commit_error: Option<String>,
    rollback_error: Option<String>,
    close_error: Option<String>,
    output: StatementOutput,
}

/// A connector that hands out `MockSession`s following a fixed script.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    script: Script,
    journal: Arc<Mutex<MockJournal>>,
}

impl MockConnector {
    /// Creates a connector whose statements succeed with no result columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements return the given output.
    pub fn with_output(mut self, output: StatementOutput) -> Self {
        self.script.output = output;
        self
    }

    /// Every connection attempt fails with a connection error.
    pub fn failing_connect(mut self, msg: impl Into<String>) -> Self {
        self.script.connect_error = Some(msg.into());
        self
    }

    /// Statements fail with an execution error carrying `code`.
    pub fn failing_execute(mut self, code: Option<&str>, msg: impl Into<String>) -> Self {
        self.script.execute_error = Some((code.map(String::from), msg.into()));
        self
    }

    /// Statements fail with an unexpected error.
    pub fn failing_unexpectedly(mut self, msg: impl Into<String>) -> Self {
        self.script.unexpected_error = Some(msg.into());
        self
    }

    /// Commits fail with an execution error.
    pub fn failing_commit(mut self, msg: impl Into<String>) -> Self {
        self.script.commit_error = Some(msg.into());
        self
    }

    /// Rollbacks fail with an execution error.
    pub fn failing_rollback(mut self, msg: impl Into<String>) -> Self {
        self.script.rollback_error = Some(msg.into());
        self
    }

    /// Closing fails with an execution error.
    pub fn failing_close(mut self, msg: impl Into<String>) -> Self {
        self.script.close_error = Some(msg.into());
        self
    }

    /// Returns a snapshot of everything recorded so far.
    pub fn journal(&self) -> MockJournal {
        lock(&self.journal).clone()
    }
}

fn lock(journal: &Mutex<MockJournal>) -> MutexGuard<'_, MockJournal> {
    // Poisoning is ignored so the journal stays readable.
    journal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Connector for MockConnector {
    async fn acquire(&self, _descriptor: &ConnectionDescriptor) -> Result<Box<dyn Session>> {
        lock(&self.journal).connects += 1;

        if let Some(msg) = &self.script.connect_error {
            return Err(NimbusError::connection(msg.clone()));
        }

        Ok(Box::new(MockSession {
            script: self.script.clone(),
            journal: Arc::clone(&self.journal),
        }))
    }
}

/// A session produced by `MockConnector`.
#[derive(Debug)]
pub struct MockSession {
    script: Script,
    journal: Arc<Mutex<MockJournal>>,
}

#[async_trait]
impl Session for MockSession {
    async fn execute(&mut self, statement: &str, params: &[Value]) -> Result<StatementOutput> {
        {
            let mut journal = lock(&self.journal);
            journal.executes += 1;
            journal.statements.push(statement.to_string());
            journal.params.push(params.to_vec());
        }

        if let Some(msg) = &self.script.unexpected_error {
            return Err(NimbusError::unexpected(msg.clone()));
        }
        match &self.script.execute_error {
            Some((Some(code), msg)) => Err(NimbusError::execution_with_code(code, msg)),
            Some((None, msg)) => Err(NimbusError::execution(msg)),
            None => Ok(self.script.output.clone()),
        }
    }

    async fn commit(&mut self) -> Result<()> {
        lock(&self.journal).commits += 1;
        match &self.script.commit_error {
            Some(msg) => Err(NimbusError::execution(msg)),
            None => Ok(()),
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        lock(&self.journal).rollbacks += 1;
        match &self.script.rollback_error {
            Some(msg) => Err(NimbusError::execution(msg)),
            None => Ok(()),
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        lock(&self.journal).closes += 1;
        match &self.script.close_error {
            Some(msg) => Err(NimbusError::execution(msg)),
            None => Ok(()),
        }
    }
}
