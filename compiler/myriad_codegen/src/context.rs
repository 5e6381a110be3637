//! Code generation context and state.
//!
//! The `CodegenContext` is the text buffer every generated body and file is
//! written through. It tracks indentation and remembers which one-off
//! declarations have already been emitted.

use rustc_hash::FxHashSet;

/// Indentation-aware output buffer.
#[derive(Debug, Default)]
pub struct CodegenContext {
    /// Current indentation level.
    indent: usize,
    /// Generated code output.
    output: String,
    /// Declarations already written, to avoid duplicates.
    emitted: FxHashSet<String>,
}

impl CodegenContext {
    /// Create an empty context at indentation level zero.
    pub fn new() -> Self {
        Self {
            indent: 0,
            output: String::with_capacity(4096),
            emitted: FxHashSet::default(),
        }
    }

    /// Create an empty context starting at `indent` levels.
    ///
    /// Function bodies are built at level one so they can be spliced
    /// between braces unchanged.
    pub fn with_indent(indent: usize) -> Self {
        Self {
            indent,
            ..Self::new()
        }
    }

    /// Increase indentation level.
    pub fn indent(&mut self) {
        self.indent += 1;
    }

    /// Decrease indentation level.
    pub fn dedent(&mut self) {
        debug_assert!(self.indent > 0, "dedent called with zero indent");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Write indentation to output.
    pub fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
    }

    /// Write a string to output.
    pub fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    /// Write a line to output (with indentation and newline).
    pub fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.output.push_str(s);
        self.output.push('\n');
    }

    /// Write a line at column zero (preprocessor directives).
    pub fn directive(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    /// Write a newline.
    pub fn newline(&mut self) {
        self.output.push('\n');
    }

    /// Open a `{` block on its own line and indent.
    pub fn open_block(&mut self) {
        self.writeln("{");
        self.indent();
    }

    /// Dedent and close a block with `closing` (usually `}`).
    pub fn close_block(&mut self, closing: &str) {
        self.dedent();
        self.writeln(closing);
    }

    /// Write `s` as a line unless an identical line was already emitted
    /// through this method. Returns whether it was written.
    pub fn writeln_once(&mut self, s: &str) -> bool {
        if self.emitted.contains(s) {
            return false;
        }
        self.emitted.insert(s.to_string());
        self.writeln(s);
        true
    }

    /// Take the generated output, leaving the buffer empty.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Clear output, indentation and emitted-line memory.
    pub fn reset(&mut self) {
        self.indent = 0;
        self.output.clear();
        self.emitted.clear();
    }
}
