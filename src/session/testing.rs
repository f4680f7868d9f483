//! Scripted [`SqlTarget`] for unit tests.

use super::target::{SqlTarget, TextRow};
use crate::error::StatementError;
use async_trait::async_trait;
use parking_lot::Mutex;

struct Failure {
    needle: String,
    error: StatementError,
    remaining: Option<usize>,
}

/// Records every statement and answers from a script. Failures and query
/// results are matched by substring, first match wins.
#[derive(Default)]
pub struct ScriptedTarget {
    executed: Mutex<Vec<String>>,
    failures: Mutex<Vec<Failure>>,
    results: Mutex<Vec<(String, Vec<TextRow>)>>,
    affected: u64,
}

impl ScriptedTarget {
    pub fn new() -> Self {
        Self { affected: 1, ..Default::default() }
    }

    /// Every statement containing `needle` fails with `error`
    pub fn fail_on(self, needle: &str, error: StatementError) -> Self {
        self.failures.lock().push(Failure { needle: needle.to_string(), error, remaining: None });
        self
    }

    /// The next statement containing `needle` fails once
    pub fn fail_once(self, needle: &str, error: StatementError) -> Self {
        self.failures.lock().push(Failure { needle: needle.to_string(), error, remaining: Some(1) });
        self
    }

    /// Queries containing `needle` return `rows`
    pub fn answer(self, needle: &str, rows: Vec<Vec<Option<&str>>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| r.into_iter().map(|v| v.map(str::to_string)).collect())
            .collect();
        self.results.lock().push((needle.to_string(), rows));
        self
    }

    /// Statements seen so far, including failed ones
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    fn check(&self, sql: &str) -> Result<(), StatementError> {
        self.executed.lock().push(sql.to_string());
        let mut failures = self.failures.lock();
        for failure in failures.iter_mut() {
            if !sql.contains(&failure.needle) {
                continue;
            }
            match failure.remaining {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            return Err(failure.error.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl SqlTarget for ScriptedTarget {
    async fn execute(&self, sql: &str) -> Result<u64, StatementError> {
        self.check(sql)?;
        Ok(self.affected)
    }

    async fn query(&self, sql: &str) -> Result<Vec<TextRow>, StatementError> {
        self.check(sql)?;
        Ok(self
            .results
            .lock()
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }
}
