//! Error types and diagnostic rendering for the Jack compiler.

use crate::token::Span;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Classification of a compilation error, shown as `<Kind>Error` in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed lexeme: unclosed string, unclosed block comment,
    /// unrecognized character, out-of-range integer.
    Lexical,
    /// Token sequence violates the grammar.
    Syntax,
    /// Input ended inside a class body.
    EndOfFile,
    /// Undeclared or redeclared variable.
    Variable,
    /// Subscript applied to a non-array variable.
    Array,
    /// Identifier in call position without a call.
    Subroutine,
    /// Class name does not match the file name.
    Class,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Lexical => "Lexical",
            ErrorKind::Syntax => "Syntax",
            ErrorKind::EndOfFile => "EndOfFile",
            ErrorKind::Variable => "Variable",
            ErrorKind::Array => "Array",
            ErrorKind::Subroutine => "Subroutine",
            ErrorKind::Class => "Class",
        };
        f.write_str(s)
    }
}

/// Errors produced while compiling a Jack source file.
///
/// The first error aborts the current file; there is no recovery.
#[derive(Debug, Error)]
pub enum CompileError {
    /// An error located in the source text.
    #[error("{kind}Error at {span}: {message}")]
    Source {
        kind: ErrorKind,
        span: Span,
        message: String,
    },

    /// File I/O error.
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn source(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self::Source {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        Self::source(ErrorKind::Lexical, span, message)
    }

    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self::source(ErrorKind::Syntax, span, message)
    }

    pub fn end_of_file(span: Span, message: impl Into<String>) -> Self {
        Self::source(ErrorKind::EndOfFile, span, message)
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The source span of this error, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Source { span, .. } => Some(*span),
            CompileError::Io { .. } => None,
        }
    }

    /// The kind tag of this error, if it is a source error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            CompileError::Source { kind, .. } => Some(*kind),
            CompileError::Io { .. } => None,
        }
    }
}

/// Renders a [`CompileError`] against its source text:
///
/// ```text
/// Error found:
///   Class 'Main', line 3
///     let z = 1;
///         ^
/// VariableError: undeclared variable 'z'
/// ```
pub struct Report<'a> {
    error: &'a CompileError,
    class_name: &'a str,
    source: &'a str,
}

impl<'a> Report<'a> {
    pub fn new(error: &'a CompileError, class_name: &'a str, source: &'a str) -> Self {
        Self {
            error,
            class_name,
            source,
        }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error {
            CompileError::Source {
                kind,
                span,
                message,
            } => {
                writeln!(f, "Error found:")?;
                writeln!(f, "  Class '{}', line {}", self.class_name, span.line)?;
                if let Some(line) = self.source.lines().nth(span.line.saturating_sub(1)) {
                    writeln!(f, "    {}", line)?;
                    writeln!(
                        f,
                        "    {:>width$}^",
                        "",
                        width = span.column.saturating_sub(1)
                    )?;
                }
                writeln!(f, "{}Error: {}", kind, message)
            }
            CompileError::Io { .. } => writeln!(f, "Error found:\n{}", self.error),
        }
    }
}
