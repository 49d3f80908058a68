//! Parse and query collaborators
//!
//! The engine never touches a concrete XML library. A [`TreeBackend`]
//! turns document text into a [`DocumentTree`], and a tree answers path
//! queries with the trimmed text of every matched node, in document order.

use thiserror::Error;

/// Error parsing a document
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// Error running a query against a parsed document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The expression was rejected before evaluation
    #[error("invalid query: {0}")]
    Syntax(String),

    /// The expression compiled but the engine could not evaluate it
    #[error("query failed: {0}")]
    Evaluation(String),
}

/// A parsed document that can answer path queries
pub trait DocumentTree {
    /// Run `expr` and reduce every matched node to its trimmed text.
    fn query(&self, expr: &str) -> Result<Vec<String>, QueryError>;
}

/// Parse collaborator; one instance is shared by all worker threads
pub trait TreeBackend: Send + Sync {
    /// Backend identifier (e.g., "libxml")
    fn name(&self) -> &str;

    /// Parse document text. The tree may borrow from `text`.
    fn parse<'t>(&self, text: &'t str) -> Result<Box<dyn DocumentTree + 't>, ParseError>;

    /// Reject an expression the query engine cannot compile, without a
    /// document at hand. Used for rule load warnings only.
    fn check_query(&self, _expr: &str) -> Result<(), QueryError> {
        Ok(())
    }
}

/// Decode document bytes, dropping a UTF-8 byte order mark.
pub fn decode(bytes: &[u8]) -> Result<&str, ParseError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    Ok(std::str::from_utf8(bytes)?)
}

/// The libxml2 backend
pub fn default_backend() -> Box<dyn TreeBackend> {
    Box::new(crate::backends::libxml::LibxmlBackend::new())
}
