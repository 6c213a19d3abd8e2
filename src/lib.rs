//! jackc - Single-pass Jack to VM compiler.
//!
//! This crate translates Jack source files into programs for the
//! nand2tetris stack-based virtual machine, one `.vm` file per `.jack`
//! file. An alternate XML mode emits a structured parse trace instead.
//! Compilation is one traversal: a pull-based tokenizer feeds a recursive
//! descent engine that consults a two-scope symbol table and emits through
//! a pluggable sink as it parses.
//!
//! # Usage
//!
//! ```no_run
//! use jackc::{CompileOptions, OutputMode, compile_directory, compile_file_with_options};
//! use std::path::Path;
//!
//! // Compile a single file to VM code
//! let result = jackc::compile_file(Path::new("Main.jack"));
//!
//! // Compile a directory
//! let results = compile_directory(Path::new("Square/"));
//!
//! // Emit the XML parse trace instead
//! let options = CompileOptions { mode: OutputMode::Xml };
//! let result = compile_file_with_options(Path::new("Main.jack"), options);
//! ```

pub mod engine;
pub mod error;
pub mod symbol_table;
pub mod token;
pub mod tokenizer;
pub mod vm_writer;
pub mod writer;
pub mod xml_writer;

use rayon::prelude::*;
use std::fs;
use std::path::Path;

// Re-export key types
pub use engine::CompilationEngine;
pub use error::{CompileError, ErrorKind, Report};
pub use symbol_table::{Symbol, SymbolKind, SymbolTable};
pub use tokenizer::Tokenizer;
pub use vm_writer::VmWriter;
pub use writer::Writer;
pub use xml_writer::XmlWriter;

/// What the compiler emits for each source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// VM instructions, one per line, into `<basename>.vm`.
    #[default]
    Vm,
    /// An indented parse trace into `<basename>.xml`.
    Xml,
}

impl OutputMode {
    /// File extension of the output artifact.
    pub fn extension(self) -> &'static str {
        match self {
            OutputMode::Vm => "vm",
            OutputMode::Xml => "xml",
        }
    }
}

/// Compilation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    pub mode: OutputMode,
}

/// Result of compiling a single Jack file.
#[derive(Debug)]
pub struct CompileResult {
    /// The file's basename, which is also the expected class name.
    pub filename: String,
    /// The original source (retained for diagnostic rendering).
    pub source: String,
    /// Generated VM code or XML trace; empty when an error occurred.
    pub output: String,
    /// The mode the file was compiled under.
    pub mode: OutputMode,
    /// The error that aborted compilation, if any.
    pub error: Option<CompileError>,
}

impl CompileResult {
    /// Check whether the compilation succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Render the error, if any, as the full caret-annotated report.
    pub fn report(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|e| Report::new(e, &self.filename, &self.source).to_string())
    }

    fn failed(filename: String, mode: OutputMode, error: CompileError) -> Self {
        Self {
            filename,
            source: String::new(),
            output: String::new(),
            mode,
            error: Some(error),
        }
    }
}

/// Compile a single Jack file to VM code.
pub fn compile_file(path: &Path) -> CompileResult {
    compile_file_with_options(path, CompileOptions::default())
}

/// Compile a single Jack file with custom options.
pub fn compile_file_with_options(path: &Path, options: CompileOptions) -> CompileResult {
    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string();

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            return CompileResult::failed(filename, options.mode, CompileError::io(path, e));
        }
    };

    compile_source_with_options(&source, &filename, options)
}

/// Compile Jack source text directly, in VM mode.
///
/// `filename` is the basename the class must carry; a `.jack` suffix is
/// tolerated and stripped.
pub fn compile_source(source: &str, filename: &str) -> CompileResult {
    compile_source_with_options(source, filename, CompileOptions::default())
}

/// Compile Jack source text with custom options.
pub fn compile_source_with_options(
    source: &str,
    filename: &str,
    options: CompileOptions,
) -> CompileResult {
    let class_name = filename.strip_suffix(".jack").unwrap_or(filename);

    let (output, error) = match options.mode {
        OutputMode::Vm => {
            let mut writer = VmWriter::new();
            match CompilationEngine::new(source, class_name, &mut writer).compile() {
                Ok(()) => (writer.into_output(), None),
                Err(e) => (String::new(), Some(e)),
            }
        }
        OutputMode::Xml => {
            let mut writer = XmlWriter::new();
            match CompilationEngine::new(source, class_name, &mut writer).compile() {
                Ok(()) => (writer.into_output(), None),
                Err(e) => (String::new(), Some(e)),
            }
        }
    };

    CompileResult {
        filename: class_name.to_string(),
        source: source.to_string(),
        output,
        mode: options.mode,
        error,
    }
}

/// Compile every `.jack` file directly inside a directory, in VM mode.
pub fn compile_directory(dir: &Path) -> Vec<CompileResult> {
    compile_directory_with_options(dir, CompileOptions::default())
}

/// Compile every `.jack` file directly inside a directory.
///
/// Files are compiled in parallel and independently: one failing file never
/// affects the others. Subdirectories are not entered.
pub fn compile_directory_with_options(dir: &Path, options: CompileOptions) -> Vec<CompileResult> {
    let jack_files: Vec<_> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "jack"))
            .collect(),
        Err(e) => {
            return vec![CompileResult::failed(
                dir.to_string_lossy().to_string(),
                options.mode,
                CompileError::io(dir, e),
            )];
        }
    };

    if jack_files.is_empty() {
        return Vec::new();
    }

    jack_files
        .par_iter()
        .map(|path| compile_file_with_options(path, options))
        .collect()
}

/// Write a compile result's artifact into `output_dir`.
///
/// For a successful result the output file is created (truncating any
/// previous contents). For a failed result any stale artifact of the same
/// name is removed instead, so a failed compilation never leaves an output
/// file behind.
pub fn write_result(result: &CompileResult, output_dir: &Path) -> Result<(), CompileError> {
    let out_path = output_dir.join(format!(
        "{}.{}",
        result.filename,
        result.mode.extension()
    ));

    if result.is_ok() {
        fs::write(&out_path, &result.output).map_err(|e| CompileError::io(&out_path, e))
    } else {
        match fs::remove_file(&out_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CompileError::io(&out_path, e)),
        }
    }
}
