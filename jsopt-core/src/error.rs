use std::path::PathBuf;

use jsopt_trace::TraceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("no .jsp sources were found under {0}")]
    MissingSources(PathBuf),
    #[error("lex error at byte {position}: {message}")]
    LexError { position: usize, message: String },
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("semantic error: {0}")]
    SemanticError(String),
    #[error("only expressions have precedence, got a {node}")]
    NoPrecedence { node: &'static str },
    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        source: Box<CoreError>,
    },
    #[error("trace logging failed: {0}")]
    Trace(#[from] TraceError),
}
