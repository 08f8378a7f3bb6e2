//! Diagnosis system
//!
//! Categories check one aspect of the server each and store their findings
//! in a per-category cache. Categories may depend on other categories: a
//! dependency that never ran or reported errors blocks the dependent one.
//!
//! ## Module Organization
//!
//! - `report`: reports and findings
//! - `cache`: one JSON file per category
//! - `ignore`: matching findings against admin-defined filters
//! - `i18n`: message catalog and markup stripping
//! - `render`: localized views and the text dump
//! - `context`: what checks read from
//! - `diagnoser`: the cache/dependency/run protocol
//! - `checks`: the built-in categories
//! - `service`: list, get, show, run and ignore

pub mod cache;
pub mod checks;
pub mod context;
pub mod diagnoser;
pub mod i18n;
pub mod ignore;
pub mod render;
pub mod report;
pub mod service;

pub use cache::ReportCache;
pub use context::{CheckSettings, DiagnosisContext};
pub use diagnoser::{Diagnoser, Outcome, diagnose};
pub use i18n::{Catalog, strip_html};
pub use render::{ShownFinding, ShownReport, dump_human_readable, localize};
pub use report::{Finding, Message, Meta, Report, Status};
pub use service::{
    DIAGNOSIS_ACTION, DiagnosisService, Lookup, RunOptions, RunSummary, ShowOptions, ShowOutput,
};
