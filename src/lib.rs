//! Natural-language questions in, read-only SQL over one analytics table out.

pub mod config;
pub mod db;
pub mod error;
pub mod guard;
pub mod lifecycle;
pub mod llm;
pub mod pipeline;
pub mod schema;
pub mod util;
pub mod web;
