//! Lifecycle of one question, as pure transitions over caller-owned state.
//!
//! ```text
//! Idle -> Generated -> Validated{safe|unsafe} -> Executed{success|failure}
//!                          ^                                  |
//!                          |                                  v
//!                      Generated  <-----------------  RepairRequested
//! ```
//!
//! An unsafe verdict can never be executed. From there the caller either
//! regenerates or edits the SQL and validates again.

use crate::guard::safety::{self, SafetyVerdict};
use crate::llm::models::{GenerationResult, RepairRequest};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success { row_count: usize },
    Failure { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryLifecycle {
    Idle,
    Generated {
        question: String,
        result: GenerationResult,
    },
    Validated {
        question: String,
        sql: String,
        verdict: SafetyVerdict,
    },
    Executed {
        question: String,
        sql: String,
        outcome: ExecutionOutcome,
    },
    RepairRequested {
        request: RepairRequest,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {action} while {state}")]
    Invalid {
        action: &'static str,
        state: &'static str,
    },
    #[error("query was rejected: {0}")]
    Unsafe(String),
}

impl QueryLifecycle {
    pub fn state_name(&self) -> &'static str {
        match self {
            QueryLifecycle::Idle => "idle",
            QueryLifecycle::Generated { .. } => "generated",
            QueryLifecycle::Validated { verdict, .. } if verdict.is_safe => "validated (safe)",
            QueryLifecycle::Validated { .. } => "validated (unsafe)",
            QueryLifecycle::Executed {
                outcome: ExecutionOutcome::Success { .. },
                ..
            } => "executed (success)",
            QueryLifecycle::Executed { .. } => "executed (failure)",
            QueryLifecycle::RepairRequested { .. } => "repair requested",
        }
    }

    fn invalid(&self, action: &'static str) -> TransitionError {
        TransitionError::Invalid {
            action,
            state: self.state_name(),
        }
    }

    fn question(&self) -> Option<&str> {
        match self {
            QueryLifecycle::Idle => None,
            QueryLifecycle::Generated { question, .. }
            | QueryLifecycle::Validated { question, .. }
            | QueryLifecycle::Executed { question, .. } => Some(question),
            QueryLifecycle::RepairRequested { request } => Some(&request.original_question),
        }
    }

    /// A model produced `result` for `question`.
    ///
    /// Allowed from any state except `Generated` (which must be validated
    /// first); from `RepairRequested` the question must be the original one.
    pub fn generated(self, question: &str, result: GenerationResult) -> Result<Self, TransitionError> {
        match &self {
            QueryLifecycle::Generated { .. } => Err(self.invalid("record a generation")),
            QueryLifecycle::RepairRequested { request } if request.original_question != question => {
                Err(self.invalid("record a generation for a different question"))
            }
            _ => Ok(QueryLifecycle::Generated {
                question: question.to_string(),
                result,
            }),
        }
    }

    /// Run the safety gate on the generated SQL
    pub fn validate(self) -> Result<Self, TransitionError> {
        match self {
            QueryLifecycle::Generated { question, result } => {
                let verdict = safety::validate(&result.sql);
                Ok(QueryLifecycle::Validated {
                    question,
                    sql: result.sql,
                    verdict,
                })
            }
            other => Err(other.invalid("validate")),
        }
    }

    /// Replace the SQL with caller-edited text and re-run the safety gate
    pub fn edit(self, sql: &str) -> Result<Self, TransitionError> {
        match self.question() {
            Some(question) if !matches!(self, QueryLifecycle::RepairRequested { .. }) => {
                Ok(QueryLifecycle::Validated {
                    question: question.to_string(),
                    sql: sql.to_string(),
                    verdict: safety::validate(sql),
                })
            }
            _ => Err(self.invalid("edit")),
        }
    }

    /// SQL that may be handed to the execution backend, if any
    pub fn executable_sql(&self) -> Result<&str, TransitionError> {
        match self {
            QueryLifecycle::Validated { sql, verdict, .. } if verdict.is_safe => Ok(sql.as_str()),
            QueryLifecycle::Validated { verdict, .. } => Err(TransitionError::Unsafe(verdict.reason.clone())),
            other => Err(other.invalid("execute")),
        }
    }

    pub fn executed(self, outcome: ExecutionOutcome) -> Result<Self, TransitionError> {
        self.executable_sql()?;
        match self {
            QueryLifecycle::Validated { question, sql, .. } => Ok(QueryLifecycle::Executed {
                question,
                sql,
                outcome,
            }),
            other => Err(other.invalid("execute")),
        }
    }

    /// Only a failed execution can be repaired
    pub fn request_repair(self, schema_description: &str, row_limit: u32) -> Result<Self, TransitionError> {
        match self {
            QueryLifecycle::Executed {
                question,
                sql,
                outcome: ExecutionOutcome::Failure { message },
            } => Ok(QueryLifecycle::RepairRequested {
                request: RepairRequest {
                    original_question: question,
                    failed_sql: sql,
                    error_message: message,
                    schema_description: schema_description.to_string(),
                    row_limit,
                },
            }),
            other => Err(other.invalid("request a repair")),
        }
    }
}
