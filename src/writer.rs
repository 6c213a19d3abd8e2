//! Output sink abstraction for the compilation engine.
//!
//! The engine drives one grammar traversal regardless of output format, so
//! the sink trait carries the union of both sinks' operations with no-op
//! defaults: a VM sink ignores the parse-trace calls, an XML sink ignores
//! the instruction calls.

/// Capability interface the compilation engine writes through.
pub trait Writer {
    /// Whether the sink consumes VM emissions. The engine resolves symbols
    /// and raises semantic errors only when this is true; parsing itself is
    /// identical in both modes.
    const GENERATES_CODE: bool;

    fn write_push(&mut self, _segment: &str, _index: u16) {}
    fn write_pop(&mut self, _segment: &str, _index: u16) {}
    fn write_arithmetic(&mut self, _cmd: &str) {}
    fn write_label(&mut self, _label: &str) {}
    fn write_goto(&mut self, _label: &str) {}
    fn write_if_goto(&mut self, _label: &str) {}
    fn write_call(&mut self, _name: &str, _num_args: u16) {}
    fn write_function(&mut self, _name: &str, _num_locals: u16) {}
    fn write_return(&mut self) {}

    /// Emit one terminal token of the parse trace.
    fn write_terminal(&mut self, _tag: &str, _text: &str) {}
    /// Enter a nonterminal of the parse trace.
    fn open_block(&mut self, _tag: &str) {}
    /// Leave a nonterminal of the parse trace.
    fn close_block(&mut self, _tag: &str) {}
}
