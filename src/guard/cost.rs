use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static DATE_FILTER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)date\s*(=|<>|!=|>=|<=|>|<)",
        r"(?i)\bbetween\b",
        r"(?i)\bwhere\s+date\b",
        r"(?i)\band\s+date\b",
        r"(?i)\bdate\s+in\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("date pattern is valid"))
    .collect()
});

static LIMIT_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\b").expect("limit pattern is valid"));

static LIMIT_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\s+(\d+)").expect("limit value pattern is valid"));

// DuckDB renders cardinality as "~123 Rows" (newer) or "EC: 123" (older)
static PLAN_ROWS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)~\s*([\d,]+)\s*rows?|EC:\s*([\d,]+)").expect("plan pattern is valid")
});

/// Heuristic indicators derived from the SQL text alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSignal {
    pub has_date_filter: bool,
    pub has_limit: bool,
    pub limit_value: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostWarning {
    MissingDateFilter,
    MissingLimit,
    LargeLimit { limit: u64, threshold: u64 },
}

impl CostWarning {
    pub fn message(&self) -> String {
        match self {
            CostWarning::MissingDateFilter => {
                "No date filter found; the query may scan the whole table".to_string()
            }
            CostWarning::MissingLimit => "No LIMIT clause found".to_string(),
            CostWarning::LargeLimit { limit, threshold } => {
                format!("LIMIT {} is above the recommended maximum of {}", limit, threshold)
            }
        }
    }
}

/// Advisory cost report attached to every draft query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostReport {
    pub signal: CostSignal,
    pub warnings: Vec<CostWarning>,
    /// Planner row estimate, when one could be obtained
    pub estimated_rows: Option<u64>,
    /// Why the planner estimate is missing
    pub plan_note: Option<String>,
}

pub fn estimate(sql: &str) -> CostSignal {
    let has_date_filter = DATE_FILTER_PATTERNS.iter().any(|re| re.is_match(sql));
    let has_limit = LIMIT_KEYWORD.is_match(sql);
    let limit_value = if has_limit {
        LIMIT_VALUE
            .captures(sql)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
    } else {
        None
    };

    CostSignal {
        has_date_filter,
        has_limit,
        limit_value,
    }
}

pub fn warnings(signal: &CostSignal, limit_threshold: u64) -> Vec<CostWarning> {
    let mut warnings = Vec::new();
    if !signal.has_date_filter {
        warnings.push(CostWarning::MissingDateFilter);
    }
    match (signal.has_limit, signal.limit_value) {
        (false, _) => warnings.push(CostWarning::MissingLimit),
        (true, Some(limit)) if limit > limit_threshold => warnings.push(CostWarning::LargeLimit {
            limit,
            threshold: limit_threshold,
        }),
        _ => {}
    }
    warnings
}

pub fn report(sql: &str, limit_threshold: u64) -> CostReport {
    let signal = estimate(sql);
    CostReport {
        warnings: warnings(&signal, limit_threshold),
        signal,
        estimated_rows: None,
        plan_note: None,
    }
}

/// Largest row estimate found in a rendered plan.
pub fn parse_plan_rows(plan: &str) -> Option<u64> {
    PLAN_ROWS
        .captures_iter(plan)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| m.as_str().replace(',', "").parse::<u64>().ok())
        .max()
}

impl CostReport {
    /// Attach the outcome of a planner lookup; failures become a note.
    pub fn with_plan<E: std::fmt::Display>(mut self, plan: Result<String, E>) -> Self {
        match plan {
            Ok(text) => match parse_plan_rows(&text) {
                Some(rows) => self.estimated_rows = Some(rows),
                None => self.plan_note = Some("plan did not contain a row estimate".to_string()),
            },
            Err(e) => self.plan_note = Some(format!("could not obtain plan: {}", e)),
        }
        self
    }
}
