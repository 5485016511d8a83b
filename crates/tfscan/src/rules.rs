//! rule engine boundary
//!
//! A [RuleEngine] receives the [NormalizedDocument] and answers with a JSON object of three finding collections:
//!
//! ```json
//! {
//!   "violations": [{ "control": "CC6.6", "severity": "high", "resource": "aws_s3_bucket.logs", "message": "..." }],
//!   "warnings": [],
//!   "passed": []
//! }
//! ```
//!
//! The engine is an injected dependency. [CommandRuleEngine] runs an external evaluator such as
//! `opa eval --stdin-input --format raw -d policies/soc2 data.soc2.evaluate`.
use crate::document::NormalizedDocument;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};

/// Evaluates a normalized document against a rule set
pub trait RuleEngine {
    fn evaluate(&self, input: &NormalizedDocument) -> Result<serde_json::Value, EvaluateError>;
}

// blanket impl for Fn
impl<F> RuleEngine for F
where
    F: Fn(&NormalizedDocument) -> Result<serde_json::Value, EvaluateError>,
{
    fn evaluate(&self, input: &NormalizedDocument) -> Result<serde_json::Value, EvaluateError> {
        self(input)
    }
}

/// One rule evaluation result item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub control: String,
    pub severity: String,
    pub resource: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl Finding {
    /// Read a finding from engine output
    ///
    /// `None` unless `control`, `severity`, `resource` and `message` are all strings.
    pub fn from_raw(raw: &serde_json::Value) -> Option<Self> {
        let field = |key: &str| raw.get(key).and_then(serde_json::Value::as_str).map(String::from);

        Some(Self {
            control: field("control")?,
            severity: field("severity")?,
            resource: field("resource")?,
            message: field("message")?,
            remediation: field("remediation"),
        })
    }
}

/// Findings of one evaluation
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub violations: Vec<Finding>,
    pub warnings: Vec<Finding>,
    pub passed: Vec<Finding>,
}

impl Evaluation {
    /// Interpret raw engine output
    ///
    /// Missing collections are empty, malformed findings are dropped.
    pub fn from_raw(raw: &serde_json::Value) -> Self {
        if !raw.is_object() {
            tracing::warn!("rule engine output is not an object");
        }

        let findings = |key: &str| -> Vec<Finding> {
            let Some(items) = raw.get(key).and_then(serde_json::Value::as_array) else {
                return Vec::new();
            };

            items
                .iter()
                .filter_map(|item| {
                    let finding = Finding::from_raw(item);
                    if finding.is_none() {
                        tracing::debug!(collection = key, %item, "malformed finding dropped");
                    }
                    finding
                })
                .collect()
        };

        Self {
            violations: findings("violations"),
            warnings: findings("warnings"),
            passed: findings("passed"),
        }
    }

    pub fn total(&self) -> usize {
        self.violations.len() + self.warnings.len() + self.passed.len()
    }
}

/// Runs an external program, document as JSON on stdin, findings as JSON on stdout
#[derive(Debug, Clone, derive_new::new)]
pub struct CommandRuleEngine {
    program: String,
    args: Vec<String>,
}

impl RuleEngine for CommandRuleEngine {
    fn evaluate(&self, input: &NormalizedDocument) -> Result<serde_json::Value, EvaluateError> {
        let input = serde_json::to_vec(input).map_err(EvaluateError::Input)?;
        let spawn_error = |source| EvaluateError::Spawn {
            program: self.program.clone(),
            source,
        };

        tracing::debug!(program = %self.program, args = ?self.args, "running rule engine");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        // stdin is fed while stdout and stderr drain, an engine may write before reading all input
        let (written, output) = std::thread::scope(|scope| {
            let writer = child
                .stdin
                .take()
                .map(|mut stdin| scope.spawn(move || stdin.write_all(&input)));
            let output = child.wait_with_output();
            let written = match writer {
                Some(writer) => writer
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::other("rule engine input writer panicked"))),
                None => Ok(()),
            };
            (written, output)
        });

        let output = output.map_err(spawn_error)?;
        if let Err(err) = written {
            // an engine that exits early is reported by its exit status below
            if err.kind() != io::ErrorKind::BrokenPipe {
                return Err(spawn_error(err));
            }
        }

        if !output.status.success() {
            return Err(EvaluateError::Status {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(EvaluateError::Output)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EvaluateError {
    #[error("Unable to serialize rule engine input")]
    Input(#[source] serde_json::Error),
    #[error("Unable to run rule engine {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Rule engine {program} exited with {status}: {stderr}")]
    Status {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("Rule engine output is not valid JSON")]
    Output(#[source] serde_json::Error),
    #[error("{0}")]
    Engine(String),
}
