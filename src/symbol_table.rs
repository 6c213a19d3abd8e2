//! Two-scope symbol table for the Jack compiler.
//!
//! Class scope holds `static` and `field` variables and lives for the whole
//! class; subroutine scope holds `argument` and `local` variables and is
//! reset at each subroutine boundary. Lookup is subroutine-first, so locals
//! shadow class-level names.

use crate::error::{CompileError, ErrorKind};
use crate::token::Span;
use std::collections::HashMap;

/// Storage class of a variable, determining its VM segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Class-level static variable, `static` segment.
    Static,
    /// Class-level field variable, `this` segment.
    Field,
    /// Subroutine argument, `argument` segment.
    Argument,
    /// Subroutine local variable, `local` segment.
    Local,
}

impl SymbolKind {
    /// The VM segment this kind maps to.
    #[inline]
    pub fn segment(self) -> &'static str {
        match self {
            SymbolKind::Static => "static",
            SymbolKind::Field => "this",
            SymbolKind::Argument => "argument",
            SymbolKind::Local => "local",
        }
    }

    #[inline]
    pub fn is_class_level(self) -> bool {
        matches!(self, SymbolKind::Static | SymbolKind::Field)
    }
}

/// A declared variable: its kind, Jack type, and allocation index.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Declared type: `int`, `char`, `boolean`, or a class name.
    pub ty: String,
    pub kind: SymbolKind,
    /// Zero-based index within the kind, in declaration order.
    pub index: u16,
}

impl Symbol {
    /// The VM segment this symbol lives in.
    #[inline]
    pub fn segment(&self) -> &'static str {
        self.kind.segment()
    }
}

/// Two-scope symbol table with per-kind index counters.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, Symbol>,
    subroutine_scope: HashMap<String, Symbol>,
    static_count: u16,
    field_count: u16,
    argument_count: u16,
    local_count: u16,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear subroutine-scope symbols and reset the argument and local
    /// counters. Class-level entries persist.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.argument_count = 0;
        self.local_count = 0;
    }

    /// Define a symbol in the scope implied by its kind.
    ///
    /// Redeclaring a name within the same scope is an error.
    pub fn define(
        &mut self,
        name: &str,
        ty: &str,
        kind: SymbolKind,
        span: Span,
    ) -> Result<(), CompileError> {
        let scope = if kind.is_class_level() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };

        if scope.contains_key(name) {
            return Err(CompileError::source(
                ErrorKind::Variable,
                span,
                format!("duplicate declaration of '{}'", name),
            ));
        }

        let counter = match kind {
            SymbolKind::Static => &mut self.static_count,
            SymbolKind::Field => &mut self.field_count,
            SymbolKind::Argument => &mut self.argument_count,
            SymbolKind::Local => &mut self.local_count,
        };
        let index = *counter;
        *counter += 1;

        scope.insert(
            name.to_string(),
            Symbol {
                ty: ty.to_string(),
                kind,
                index,
            },
        );
        Ok(())
    }

    /// Resolve a name, subroutine scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    /// Number of symbols defined under the given kind in its current scope.
    pub fn count(&self, kind: SymbolKind) -> u16 {
        match kind {
            SymbolKind::Static => self.static_count,
            SymbolKind::Field => self.field_count,
            SymbolKind::Argument => self.argument_count,
            SymbolKind::Local => self.local_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 1, 1, 1)
    }

    #[test]
    fn test_empty_table() {
        let table = SymbolTable::new();
        assert_eq!(table.count(SymbolKind::Static), 0);
        assert_eq!(table.count(SymbolKind::Field), 0);
        assert_eq!(table.count(SymbolKind::Argument), 0);
        assert_eq!(table.count(SymbolKind::Local), 0);
        assert!(table.lookup("x").is_none());
    }

    #[test]
    fn test_indices_are_dense_per_kind() {
        let mut table = SymbolTable::new();
        table.define("a", "int", SymbolKind::Static, span()).unwrap();
        table.define("b", "int", SymbolKind::Static, span()).unwrap();
        table.define("x", "int", SymbolKind::Field, span()).unwrap();

        assert_eq!(table.lookup("a").unwrap().index, 0);
        assert_eq!(table.lookup("b").unwrap().index, 1);
        // Field counter is independent of the static counter.
        assert_eq!(table.lookup("x").unwrap().index, 0);
        assert_eq!(table.count(SymbolKind::Static), 2);
        assert_eq!(table.count(SymbolKind::Field), 1);
    }

    #[test]
    fn test_segments() {
        let mut table = SymbolTable::new();
        table.define("s", "int", SymbolKind::Static, span()).unwrap();
        table.define("f", "int", SymbolKind::Field, span()).unwrap();
        table.define("a", "int", SymbolKind::Argument, span()).unwrap();
        table.define("l", "int", SymbolKind::Local, span()).unwrap();

        assert_eq!(table.lookup("s").unwrap().segment(), "static");
        assert_eq!(table.lookup("f").unwrap().segment(), "this");
        assert_eq!(table.lookup("a").unwrap().segment(), "argument");
        assert_eq!(table.lookup("l").unwrap().segment(), "local");
    }

    #[test]
    fn test_start_subroutine_resets_inner_scope_only() {
        let mut table = SymbolTable::new();
        table.define("f", "int", SymbolKind::Field, span()).unwrap();

        table.start_subroutine();
        table.define("x", "int", SymbolKind::Local, span()).unwrap();
        assert!(table.lookup("x").is_some());

        table.start_subroutine();
        assert!(table.lookup("x").is_none());
        assert_eq!(table.count(SymbolKind::Local), 0);
        assert_eq!(table.count(SymbolKind::Argument), 0);
        // Class scope survives.
        assert!(table.lookup("f").is_some());
        assert_eq!(table.count(SymbolKind::Field), 1);
    }

    #[test]
    fn test_subroutine_scope_shadows_class_scope() {
        let mut table = SymbolTable::new();
        table.define("x", "int", SymbolKind::Field, span()).unwrap();
        table.start_subroutine();
        table
            .define("x", "boolean", SymbolKind::Local, span())
            .unwrap();

        let symbol = table.lookup("x").unwrap();
        assert_eq!(symbol.kind, SymbolKind::Local);
        assert_eq!(symbol.ty, "boolean");
    }

    #[test]
    fn test_duplicate_in_same_scope_rejected() {
        let mut table = SymbolTable::new();
        table.define("x", "int", SymbolKind::Field, span()).unwrap();
        // Static and field share the class scope.
        assert!(table.define("x", "int", SymbolKind::Static, span()).is_err());

        table.start_subroutine();
        table
            .define("y", "int", SymbolKind::Argument, span())
            .unwrap();
        assert!(table.define("y", "int", SymbolKind::Local, span()).is_err());
    }

    #[test]
    fn test_method_this_argument_indexing() {
        let mut table = SymbolTable::new();
        table.start_subroutine();
        table
            .define("this", "Point", SymbolKind::Argument, span())
            .unwrap();
        table
            .define("dx", "int", SymbolKind::Argument, span())
            .unwrap();

        assert_eq!(table.lookup("this").unwrap().index, 0);
        assert_eq!(table.lookup("dx").unwrap().index, 1);
        assert_eq!(table.lookup("this").unwrap().ty, "Point");
    }
}
