//! Schema description for the language model.
//!
//! The live column list of the target table is merged with a hand-written
//! annotation table ([`curated`]) and rendered as one line per column.

pub mod curated;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hand-written annotation for a column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub description: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub values: Option<String>,
}

/// A live column merged with its curated annotation, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub declared_type: String,
    pub description: Option<String>,
    pub allowed_values: Option<String>,
}

impl ColumnSpec {
    pub fn to_description_line(&self) -> String {
        match &self.description {
            Some(description) => {
                let mut line = format!("- {} ({}): {}", self.name, self.declared_type, description);
                if let Some(values) = &self.allowed_values {
                    line.push_str(&format!(" Possible values: {}", values));
                }
                line
            }
            None => format!("- {} ({})", self.name, self.declared_type),
        }
    }
}

/// How a live column name is turned into a curated-table key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    Exact,
    Upper,
    Lower,
}

impl LookupStrategy {
    pub fn key(&self, name: &str) -> String {
        match self {
            LookupStrategy::Exact => name.to_string(),
            LookupStrategy::Upper => name.to_uppercase(),
            LookupStrategy::Lower => name.to_lowercase(),
        }
    }
}

/// Tried in order, first hit wins
pub const LOOKUP_ORDER: [LookupStrategy; 3] = [
    LookupStrategy::Exact,
    LookupStrategy::Upper,
    LookupStrategy::Lower,
];

pub fn lookup<'a>(curated: &'a HashMap<String, ColumnInfo>, name: &str) -> Option<&'a ColumnInfo> {
    LOOKUP_ORDER
        .iter()
        .find_map(|strategy| curated.get(&strategy.key(name)))
}

/// Merge live `(name, declared_type)` pairs with the curated annotations.
///
/// Curated entries replace the declared type with their own type string.
pub fn merge_columns(
    columns: &[(String, String)],
    curated: &HashMap<String, ColumnInfo>,
) -> Vec<ColumnSpec> {
    columns
        .iter()
        .map(|(name, declared_type)| match lookup(curated, name) {
            Some(info) => ColumnSpec {
                name: name.clone(),
                declared_type: info.data_type.clone(),
                description: Some(info.description.clone()),
                allowed_values: info.values.clone().filter(|v| !v.is_empty()),
            },
            None => ColumnSpec {
                name: name.clone(),
                declared_type: declared_type.clone(),
                description: None,
                allowed_values: None,
            },
        })
        .collect()
}

pub fn render(columns: &[ColumnSpec]) -> String {
    columns
        .iter()
        .map(ColumnSpec::to_description_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn describe(columns: &[(String, String)], curated: &HashMap<String, ColumnInfo>) -> String {
    render(&merge_columns(columns, curated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(cols: &[(&str, &str)]) -> Vec<(String, String)> {
        cols.iter()
            .map(|(n, t)| (n.to_string(), t.to_string()))
            .collect()
    }

    fn curated() -> HashMap<String, ColumnInfo> {
        let mut map = HashMap::new();
        map.insert(
            "site".to_string(),
            ColumnInfo {
                description: "The site where the visit happened.".to_string(),
                data_type: "VARCHAR".to_string(),
                values: Some("n12, 12plus, v1, mako".to_string()),
            },
        );
        map.insert(
            "USER_ID".to_string(),
            ColumnInfo {
                description: "Device bound user id.".to_string(),
                data_type: "VARCHAR".to_string(),
                values: None,
            },
        );
        map
    }

    #[test]
    fn annotated_columns_use_curated_type_and_values() {
        let out = describe(&live(&[("SITE", "TEXT")]), &curated());
        assert_eq!(
            out,
            "- SITE (VARCHAR): The site where the visit happened. Possible values: n12, 12plus, v1, mako"
        );
    }

    #[test]
    fn upper_case_key_matches_lower_case_column() {
        let out = describe(&live(&[("user_id", "varchar")]), &curated());
        assert_eq!(out, "- user_id (VARCHAR): Device bound user id.");
    }

    #[test]
    fn unknown_columns_fall_back_to_declared_type() {
        let out = describe(&live(&[("mystery", "BIGINT"), ("site", "VARCHAR")]), &curated());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "- mystery (BIGINT)");
        assert!(lines[1].starts_with("- site (VARCHAR): "));
    }

    #[test]
    fn exact_match_takes_precedence() {
        let mut map = curated();
        map.insert(
            "User_Id".to_string(),
            ColumnInfo {
                description: "exact".to_string(),
                data_type: "TEXT".to_string(),
                values: None,
            },
        );
        let out = describe(&live(&[("User_Id", "VARCHAR")]), &map);
        assert_eq!(out, "- User_Id (TEXT): exact");
    }

    #[test]
    fn every_column_is_rendered_once_in_order() {
        let cols = live(&[("b", "INT"), ("a", "INT"), ("site", "VARCHAR")]);
        let out = describe(&cols, &curated());
        let names: Vec<&str> = out
            .lines()
            .map(|l| l.trim_start_matches("- ").split(' ').next().unwrap())
            .collect();
        assert_eq!(names, vec!["b", "a", "site"]);
    }

    #[test]
    fn full_curated_table_annotates_known_columns() {
        let out = describe(&live(&[("date", "DATE"), ("device_type", "VARCHAR")]), &curated::columns());
        assert!(out.contains("- date (DATE): Event date"));
        assert!(out.contains("- device_type (VARCHAR): The device type used. Possible values:"));
    }
}
