//! Core pipeline of the jsopt toolchain.
//!
//! Sources in the small prefix-notation `.jsp` language are compiled to
//! JavaScript:
//!
//!   source .jsp
//!     -> lexer      (tokens)
//!     -> parser     (surface AST)
//!     -> lower      (JavaScript AST)
//!     -> optimizer  (constant folding)
//!     -> js::printer (JavaScript text, parenthesized by precedence)
//!
//! Every phase is recorded as a trace event through a `jsopt_trace`
//! logger passed in by the caller. The CLI and any other front end should
//! depend on this crate rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing, parsing and lowering
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;
pub mod lower;

// ---------------------------------------------------------------------
// JavaScript output tree: operators, precedence, printing
// ---------------------------------------------------------------------

pub mod js;

// ---------------------------------------------------------------------
// Passes, source discovery and compiler orchestration
// ---------------------------------------------------------------------

pub mod optimizer;
pub mod sources;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, CompileOptions, CompiledFile, compile, compile_tree};
pub use error::CoreError;
pub use js::{NodeRef, Precedence, resolve};
