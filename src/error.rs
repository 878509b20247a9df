//! Error types for the IDS checker.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when parsing IFC files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },
}

/// Errors raised while reading an IDS document.
///
/// These never escape [`crate::ids::SpecificationStore::load`]; a malformed
/// block is logged and skipped.
#[derive(Debug, Error)]
pub enum IdsError {
    /// The XML text could not be tokenized.
    #[error("malformed XML at byte {offset}: {message}")]
    Xml { offset: usize, message: String },

    /// A specification block is missing a mandatory part.
    #[error("specification '{name}' is invalid: {message}")]
    InvalidSpecification { name: String, message: String },
}

/// Errors raised while evaluating a single specification.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The applicability filter does not name a usable IFC entity.
    #[error("malformed applicability filter '{filter}'")]
    MalformedFilter { filter: String },

    /// The model collaborator could not provide element data.
    #[error("lookup failed for element #{local_id} in model '{model}'")]
    Lookup { model: String, local_id: u64 },
}

/// Errors from the external text-generation collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Network failure or non-success HTTP status. Retried.
    #[error("generation request failed: {0}")]
    Transport(String),

    /// The collaborator refused because the element is not eligible. Never retried.
    #[error("element is not eligible: {0}")]
    Ineligible(String),

    /// The response contained no usable text. Retried.
    #[error("empty generation response")]
    Empty,
}

/// Why a bounded retry gave up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RetryError {
    #[error("no valid response after {attempts} attempts (last: {last})")]
    Exhausted { attempts: u32, last: String },

    #[error("abandoned after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Errors that can occur when submitting an issue to the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tracker rejected the issue: {0}")]
    Rejected(String),
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}

/// Errors in configuration values taken from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}
