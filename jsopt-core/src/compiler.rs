use std::path::{Path, PathBuf};

use jsopt_trace::{EventType, TraceLogger};
use tracing::debug;

use crate::error::CoreError;
use crate::js::ast::JsProgram;
use crate::js::printer::to_js;
use crate::lower::lower_module;
use crate::optimizer::optimize;
use crate::parser::parse;
use crate::sources::{SourceFile, load_source_files};

// Trace categories of the compiler pipeline.
pub const COMPILE: EventType = EventType::new("Compile", "#3366CC");
pub const PARSE: EventType = EventType::new("Parse", "#66AA66");
pub const LOWER: EventType = EventType::new("Lower", "#AA66AA");
pub const OPTIMIZE: EventType = EventType::new("Optimize", "#CC9933");
pub const GENERATE_JS: EventType = EventType::new("Generate JavaScript", "#339999");
pub const FOLD: EventType = EventType::new("Constant Fold", "#999999").high_volume();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Run constant folding between lowering and generation.
    pub optimize: bool,
    /// Label recorded on the trace event, usually the source path.
    pub name: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            optimize: true,
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationArtifact {
    pub program: JsProgram,
    pub javascript: String,
    pub folds: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFile {
    /// Source path relative to the compiled tree.
    pub source: PathBuf,
    /// Where the output belongs, relative to the output root.
    pub output: PathBuf,
    pub artifact: CompilationArtifact,
}

pub fn compile(
    source: &str,
    options: &CompileOptions,
    logger: &TraceLogger,
) -> Result<CompilationArtifact, CoreError> {
    let name = options.name.as_deref().unwrap_or("<input>");
    let root = logger.start(COMPILE, &["source", name])?;
    let result = run_pipeline(source, options, logger);
    match &result {
        Ok(artifact) => {
            let folds = artifact.folds.to_string();
            let bytes = artifact.javascript.len().to_string();
            root.end(&["folds", &folds, "outputBytes", &bytes])?;
        }
        Err(err) => {
            let message = err.to_string();
            root.end(&["error", &message])?;
        }
    }
    result
}

fn run_pipeline(
    source: &str,
    options: &CompileOptions,
    logger: &TraceLogger,
) -> Result<CompilationArtifact, CoreError> {
    let module = phase(logger, PARSE, || parse(source))?;
    debug!(statements = module.stmts.len(), "parsed");

    let mut program = phase(logger, LOWER, || lower_module(&module))?;

    let folds = if options.optimize {
        let folds = phase(logger, OPTIMIZE, || optimize(&mut program, logger))?;
        debug!(folds, "optimized");
        folds
    } else {
        0
    };

    let javascript = phase(logger, GENERATE_JS, || to_js(&program))?;
    Ok(CompilationArtifact {
        program,
        javascript,
        folds,
    })
}

/// Runs one pipeline step inside a trace event of category `ty`.
fn phase<T>(
    logger: &TraceLogger,
    ty: EventType,
    step: impl FnOnce() -> Result<T, CoreError>,
) -> Result<T, CoreError> {
    let event = logger.start(ty, &[])?;
    let result = step();
    let status = if result.is_ok() { "ok" } else { "failed" };
    event.end(&["status", status])?;
    result
}

/// Compiles every `.jsp` file under `root`. Each file gets its own
/// `COMPILE` event; the first failure stops the walk.
pub fn compile_tree(
    root: impl AsRef<Path>,
    options: &CompileOptions,
    logger: &TraceLogger,
) -> Result<Vec<CompiledFile>, CoreError> {
    let files = load_source_files(root)?;
    debug!(count = files.len(), "compiling source tree");
    let mut compiled = Vec::with_capacity(files.len());
    for SourceFile { path, contents } in files {
        let options = CompileOptions {
            name: Some(path.display().to_string()),
            ..options.clone()
        };
        let artifact = match compile(&contents, &options, logger) {
            Ok(artifact) => artifact,
            Err(err) => {
                return Err(CoreError::InFile {
                    path,
                    source: Box::new(err),
                });
            }
        };
        compiled.push(CompiledFile {
            output: path.with_extension("js"),
            source: path,
            artifact,
        });
    }
    Ok(compiled)
}
