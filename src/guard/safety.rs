use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Statement keywords that can never appear in an executable query.
pub const FORBIDDEN_KEYWORDS: [&str; 11] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "EXEC", "EXECUTE",
    "GRANT", "REVOKE",
];

// One word-bounded pattern per keyword, in deny-list order
static KEYWORD_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    FORBIDDEN_KEYWORDS
        .iter()
        .map(|kw| {
            let re = Regex::new(&format!(r"\b{}\b", kw)).expect("keyword pattern is valid");
            (*kw, re)
        })
        .collect()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_safe: bool,
    pub reason: String,
}

impl SafetyVerdict {
    fn safe() -> Self {
        Self {
            is_safe: true,
            reason: "query is a read-only SELECT".to_string(),
        }
    }

    fn rejected(reason: String) -> Self {
        Self {
            is_safe: false,
            reason,
        }
    }
}

/// Keyword gate admitting only read-only SELECT statements.
///
/// `_` counts as a word character, so identifiers such as `created_at` or
/// `last_update` do not trip the `CREATE` / `UPDATE` checks. Keywords inside
/// string literals are still rejected.
pub fn validate(sql: &str) -> SafetyVerdict {
    let normalized = sql.to_uppercase();

    if let Some((keyword, _)) = KEYWORD_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&normalized))
    {
        return SafetyVerdict::rejected(format!("contains forbidden keyword: {}", keyword));
    }

    if !normalized.trim().starts_with("SELECT") {
        return SafetyVerdict::rejected("only SELECT queries are allowed".to_string());
    }

    SafetyVerdict::safe()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_is_safe() {
        assert!(validate("SELECT * FROM t LIMIT 10").is_safe);
        assert!(validate("  \n select count(*) from t").is_safe);
    }

    #[test]
    fn chained_drop_is_rejected() {
        let verdict = validate("select * from t; DROP TABLE t;");
        assert!(!verdict.is_safe);
        assert!(verdict.reason.contains("DROP"));
        assert_eq!(verdict.reason, "contains forbidden keyword: DROP");
    }

    #[test]
    fn keyword_check_runs_before_prefix_check() {
        let verdict = validate("UPDATE t SET x=1");
        assert!(!verdict.is_safe);
        assert_eq!(verdict.reason, "contains forbidden keyword: UPDATE");
    }

    #[test]
    fn identifiers_containing_keywords_pass() {
        assert!(validate("SELECT created_at FROM t").is_safe);
        assert!(validate("SELECT last_update, dropped_frames FROM t").is_safe);
        assert!(validate("SELECT executed FROM t").is_safe);
    }

    #[test]
    fn first_keyword_in_list_order_is_reported() {
        let verdict = validate("DROP TABLE t; INSERT INTO t VALUES (1)");
        assert_eq!(verdict.reason, "contains forbidden keyword: INSERT");
    }

    #[test]
    fn non_select_statements_are_rejected() {
        for sql in ["WITH x AS (SELECT 1) SELECT * FROM x", "SHOW TABLES", "", "   "] {
            let verdict = validate(sql);
            assert!(!verdict.is_safe, "{sql} should be rejected");
            assert_eq!(verdict.reason, "only SELECT queries are allowed");
        }
    }

    #[test]
    fn lower_case_keywords_are_caught() {
        let verdict = validate("select 1; truncate table t");
        assert_eq!(verdict.reason, "contains forbidden keyword: TRUNCATE");
    }
}
