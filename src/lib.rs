//! # IFC IDS Checker
//!
//! Validates the elements of an IFC model against the specifications of an
//! IDS document and keeps per-element compliance status in sync with the
//! latest check run.
//!
//! ## Features
//!
//! - Parse IFC files (IFC2x3 and IFC4 schemas) and IDS documents
//! - Evaluate entity applicability and property requirements per specification
//! - Aggregate pass/fail results and derive pass/warn/fail status per element
//! - Highlight passing and failing elements on the model
//! - Offline and generated fix suggestions, BCF issue drafting
//! - Export reports to CSV and JSON
//!
//! ## Example
//!
//! ```no_run
//! use ifc_ids_checker::check::run_check;
//! use ifc_ids_checker::ids::SpecificationStore;
//! use ifc_ids_checker::model::CheckContext;
//! use ifc_ids_checker::parser::parse_ifc_file;
//!
//! let model = parse_ifc_file("model.ifc").expect("Failed to parse");
//! let mut store = SpecificationStore::new();
//! store.load(&std::fs::read_to_string("rules.ids").expect("Failed to read"));
//!
//! let run = run_check(store.specs(), CheckContext::new(&model, &model));
//! println!("Failed specifications: {}", run.results.summary.failed_specs);
//! ```

pub mod check;
pub mod config;
pub mod error;
pub mod export;
pub mod fix;
pub mod highlight;
pub mod ids;
pub mod model;
pub mod parser;
pub mod reconcile;
pub mod remote;
pub mod ui;
