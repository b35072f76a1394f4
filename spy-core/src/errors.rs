//! Structured errors and traceback (`spec.md` §4.6, §7).
//!
//! Shaped after the teacher's `exception_private::ExceptionRaise` /
//! `RawStackFrame`: errors are value-like (message + annotations), a
//! traceback is a stack of frames captured at raise time, and formatting is
//! a dedicated step separate from construction.

use std::fmt;

use crate::intern::{Interner, StrId};
use crate::span::{SourceMap, Span};

/// Compile-time error categories (`spec.md` §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    Type,
    Value,
    Index,
    Generic,
}

impl fmt::Display for StaticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StaticKind::Type => "TypeError",
            StaticKind::Value => "ValueError",
            StaticKind::Index => "IndexError",
            StaticKind::Generic => "StaticError",
        })
    }
}

/// Runtime panic categories, surfaced by the emitted `spy_panic` call
/// (`spec.md` §6.2, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicKind {
    ZeroDivision,
    OutOfBounds,
    NullDeref,
}

impl fmt::Display for PanicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PanicKind::ZeroDivision => "ZeroDivisionError",
            PanicKind::OutOfBounds => "IndexError",
            PanicKind::NullDeref => "NullPointerError",
        })
    }
}

/// Top-level error kind, matching the four kinds named in `spec.md` §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Syntax,
    Static(StaticKind),
    Panic(PanicKind),
}

impl ErrorKind {
    /// The first three kinds are fatal to compilation; only `Panic` is a
    /// runtime error that terminates the running process instead.
    #[must_use]
    pub fn is_fatal_to_compilation(self) -> bool {
        !matches!(self, ErrorKind::Panic(_))
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Parse => f.write_str("ParseError"),
            ErrorKind::Syntax => f.write_str("SyntaxError"),
            ErrorKind::Static(k) => write!(f, "{k}"),
            ErrorKind::Panic(k) => write!(f, "{k}"),
        }
    }
}

/// Severity of a single annotation line in a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Note,
}

/// One annotated source span in a diagnostic, carrying a human caption.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub level: Level,
    pub span: Span,
    pub caption: String,
}

/// One frame of the blue-call / runtime-call chain captured at raise time.
///
/// `name` is `None` for module-level code, matching the teacher's
/// `RawStackFrame` (whose `frame_name` is filled in lazily as the error
/// propagates out of a namespace lookup).
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub span: Span,
    pub name: Option<StrId>,
}

/// A structured, value-like compiler/runtime error.
///
/// Frames are pushed outermost-last as the error propagates up through
/// nested blue calls, then reversed at render time so the deepest call
/// (closest to the fault) prints last — matching `spec.md` §7's "nested
/// blue calls are printed inner-to-outer, deepest last."
#[derive(Debug, Clone)]
pub struct SpyError {
    pub kind: ErrorKind,
    pub message: String,
    pub annotations: Vec<Annotation>,
    frames: Vec<TraceFrame>,
}

impl SpyError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), annotations: Vec::new(), frames: Vec::new() }
    }

    #[must_use]
    pub fn with_annotation(mut self, level: Level, span: Span, caption: impl Into<String>) -> Self {
        self.annotations.push(Annotation { level, span, caption: caption.into() });
        self
    }

    /// Pushes a calling frame onto the traceback. Used both for ordinary
    /// runtime call stacks and for the nested blue-call chain recorded
    /// during redshift (`spec.md` §4.6: "tagged with every nested blue-call
    /// site").
    pub fn push_frame(&mut self, span: Span, name: Option<StrId>) {
        self.frames.push(TraceFrame { span, name });
    }

    #[must_use]
    pub fn frames(&self) -> &[TraceFrame] {
        &self.frames
    }

    /// Renders the full multi-line diagnostic: the message, each annotation
    /// with a caret range under its span, and the call-chain frames
    /// deepest-last.
    #[must_use]
    pub fn render(&self, interner: &Interner, sources: &SourceMap) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}: {}\n", self.kind, self.message));
        for ann in &self.annotations {
            render_span(&mut out, interner, sources, ann.span, &ann.caption);
        }
        if !self.frames.is_empty() {
            out.push_str("Traceback (most recent call last):\n");
            for frame in self.frames.iter().rev() {
                let name = frame.name.map_or("<module>", |id| interner.resolve(id));
                out.push_str(&format!("  in {name}\n"));
                render_span(&mut out, interner, sources, frame.span, "");
            }
        }
        out
    }
}

fn render_span(out: &mut String, interner: &Interner, sources: &SourceMap, span: Span, caption: &str) {
    let file = interner.resolve(span.file);
    out.push_str(&format!("  --> {file}:{}:{}\n", span.start().line + 1, span.start().col + 1));
    if let Some(line_no) = span.preview_line() {
        if let Some(line) = sources.line(span.file, line_no) {
            out.push_str(&format!("      | {line}\n"));
            let start_col = span.start().col as usize;
            let width = (span.end().col.max(span.start().col + 1) - span.start().col) as usize;
            out.push_str("      | ");
            out.push_str(&" ".repeat(start_col));
            out.push_str(&"^".repeat(width.max(1)));
            if !caption.is_empty() {
                out.push_str(&format!(" {caption}"));
            }
            out.push('\n');
        }
    }
}

impl fmt::Display for SpyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for SpyError {}

/// Convenience constructors mirroring the canned diagnostics of `spec.md`
/// §4.2 and §8's scenario list.
impl SpyError {
    #[must_use]
    pub fn no_operator(op: &str, lhs_type: &str, rhs_type: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::Static(StaticKind::Type),
            format!("no operator {op} for types {lhs_type}, {rhs_type}"),
        )
        .with_annotation(Level::Error, span, "here")
    }

    #[must_use]
    pub fn struct_field_assignment(field: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::Static(StaticKind::Type),
            format!("cannot assign to field '{field}': struct values are immutable; use a pointer"),
        )
        .with_annotation(Level::Error, span, "assignment here")
    }

    #[must_use]
    pub fn cycle_in_blue_evaluation(fqn: &str, span: Span) -> Self {
        Self::new(ErrorKind::Static(StaticKind::Generic), format!("cycle detected resolving '{fqn}'"))
            .with_annotation(Level::Error, span, "called from here")
    }

    #[must_use]
    pub fn zero_division(span: Span) -> Self {
        Self::new(ErrorKind::Panic(PanicKind::ZeroDivision), "division by zero")
            .with_annotation(Level::Error, span, "here")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::LineCol;

    fn dummy_span(interner: &mut Interner) -> Span {
        let file = interner.intern("main.spy");
        Span::new(file, LineCol::new(0, 0), LineCol::new(0, 5))
    }

    #[test]
    fn render_shows_type_error_and_message() {
        let mut interner = Interner::new();
        let span = dummy_span(&mut interner);
        let err = SpyError::no_operator("+", "i32", "str", span);
        let sources = SourceMap::new();
        let rendered = err.render(&interner, &sources);
        assert!(rendered.starts_with("TypeError: no operator + for types i32, str"));
    }

    #[test]
    fn frames_render_deepest_last() {
        let mut interner = Interner::new();
        let span = dummy_span(&mut interner);
        let main_name = interner.intern("main");
        let matrix_name = interner.intern("Matrix[i32]");
        let array_name = interner.intern("Array[i32]");
        let mut err = SpyError::new(ErrorKind::Static(StaticKind::Generic), "N must be positive");
        err.push_frame(span, Some(main_name));
        err.push_frame(span, Some(matrix_name));
        err.push_frame(span, Some(array_name));
        let sources = SourceMap::new();
        let rendered = err.render(&interner, &sources);
        let main_pos = rendered.find("in main").expect("main frame present");
        let array_pos = rendered.find("in Array[i32]").expect("array frame present");
        assert!(array_pos > main_pos, "deepest frame (Array) should render after main");
    }
}
