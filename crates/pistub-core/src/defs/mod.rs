//! Reading defs files: tokens, s-expression trees and normalized records.

pub mod lexer;
pub mod parser;
pub mod reader;

use std::path::Path;

use crate::errors::PistubResult;

/// Read a source file as text. Bytes that are not UTF-8 (Latin-1 comments
/// and copyright headers are common) are replaced rather than rejected.
pub fn read_source(path: &Path) -> PistubResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
