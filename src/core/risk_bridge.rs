//! Risk Assessment Bridge
//!
//! Sends token facts to an external scoring program over stdin and reads a
//! verdict back from stdout, both as JSON. The round trip is bounded by a
//! timeout and the child is killed if it is abandoned.
//!
//! A failed or unusable answer is never fatal: the token is simply stored
//! without risk fields.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::models::config::ScorerConfig;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::{RiskVerdict, TokenFacts};

/// Produces a risk verdict for a token, or nothing
#[async_trait]
pub trait RiskScorer: Send + Sync {
    async fn assess(&self, facts: &TokenFacts) -> Option<RiskVerdict>;
}

/// Scoring switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledScorer;

#[async_trait]
impl RiskScorer for DisabledScorer {
    async fn assess(&self, _facts: &TokenFacts) -> Option<RiskVerdict> {
        None
    }
}

/// Runs the scoring program once per token
#[derive(Debug, Clone)]
pub struct SubprocessScorer {
    config: ScorerConfig,
}

impl SubprocessScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    /// One round trip. `Ok(None)` is a clean answer without a verdict.
    pub async fn run(&self, facts: &TokenFacts) -> AppResult<Option<RiskVerdict>> {
        let request = encode_request(facts)?;

        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AppError::with_source(
                    ErrorCode::ScorerSpawnFailed,
                    format!("cannot start {}", self.config.program),
                    e,
                )
            })?;

        let stdin = child.stdin.take();
        let exchange = async move {
            if let Some(mut pipe) = stdin {
                // A scorer that exits without reading closes the pipe early
                if let Err(e) = pipe.write_all(&request).await {
                    debug!("Scorer stdin closed early: {}", e);
                }
            }
            child.wait_with_output().await
        };

        let output = tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| {
                AppError::new(
                    ErrorCode::ScorerTimeout,
                    format!("no answer within {:?}", self.config.timeout),
                )
            })??;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().map(str::trim).filter(|l| !l.is_empty()) {
            info!("🐍 [{}] scorer: {}", facts.blockchain, line);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            return parse_output(&stdout);
        }

        match parse_output(&stdout) {
            Ok(Some(verdict)) => {
                warn!(
                    "⚠️ Scorer exited with {} but returned a verdict, using it",
                    output.status
                );
                Ok(Some(verdict))
            }
            _ => Err(AppError::new(
                ErrorCode::ScorerExitFailure,
                format!("scorer exited with {}", output.status),
            )),
        }
    }
}

#[async_trait]
impl RiskScorer for SubprocessScorer {
    async fn assess(&self, facts: &TokenFacts) -> Option<RiskVerdict> {
        let start = Instant::now();
        match self.run(facts).await {
            Ok(verdict) => {
                debug!(
                    "Scorer answered for {} in {}ms",
                    facts.contract_address,
                    start.elapsed().as_millis()
                );
                verdict
            }
            Err(e) => {
                warn!(
                    "⚠️ [{}] No verdict for {} on {}: {}",
                    e.code_str(),
                    facts.contract_address,
                    facts.blockchain,
                    e.message
                );
                None
            }
        }
    }
}

/// Request line: a one-element JSON array followed by a newline
pub fn encode_request(facts: &TokenFacts) -> AppResult<Vec<u8>> {
    let mut line = serde_json::to_vec(&[facts])?;
    line.push(b'\n');
    Ok(line)
}

/// Parse scorer stdout into its first verdict.
///
/// The whole output is tried first; if it is not JSON (the scorer printed
/// progress text), the last line holding a JSON array or object is used.
pub fn parse_output(stdout: &str) -> AppResult<Option<RiskVerdict>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(e) => trimmed
            .lines()
            .rev()
            .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
            .find(|v| v.is_array() || v.is_object())
            .ok_or_else(|| AppError::from(e))?,
    };

    first_verdict(value)
}

fn first_verdict(value: Value) -> AppResult<Option<RiskVerdict>> {
    match value {
        Value::Array(items) => match items.into_iter().next() {
            None => Ok(None),
            Some(first) => RiskVerdict::from_value(first)
                .map(Some)
                .ok_or_else(|| AppError::scorer_output("first verdict is not an object")),
        },
        Value::Object(_) => Ok(RiskVerdict::from_value(value)),
        other => Err(AppError::scorer_output(format!(
            "expected a verdict array, got {}",
            other
        ))),
    }
}
