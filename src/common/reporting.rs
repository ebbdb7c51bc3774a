/*!

  Source locations and per-file diagnostic accumulation.

  A `ReportingContext` collects user-facing diagnostics while lexing and
  compilation continue best-effort. The two fatal channels (`fatal`,
  `logical_fatal`) never return; they mark compiler bugs or hard engine
  limits, and the driver isolates them at the file boundary.

  Line numbers are derived lazily: the lexer notifies the context of each
  new line's starting offset, and `get_location_line` resolves an offset to
  a 1-based line on demand.

*/

use std::fmt::{Display, Formatter};
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{NoColor, WriteColor};

/// A half-open `[start, end)` byte range into the source buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLocation {
  pub start: u32,
  pub end: u32,
}

impl SourceLocation {
  pub fn new(start: u32, end: u32) -> Self {
    SourceLocation { start, end }
  }

  pub fn range(&self) -> Range<usize> {
    self.start as usize..self.end as usize
  }
}

impl Display for SourceLocation {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "[{}, {})", self.start, self.end)
  }
}

pub struct ReportingContext {
  file_name: String,
  line_offsets: Vec<u32>, //< Starting offset of each line; line 1 starts at 0.
  diagnostics: Vec<Diagnostic<()>>,
  error_count: usize,
}

impl ReportingContext {
  pub fn new(file_name: impl Into<String>) -> Self {
    ReportingContext {
      file_name: file_name.into(),
      line_offsets: vec![0],
      diagnostics: Vec::new(),
      error_count: 0,
    }
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  pub fn error(&mut self, loc: SourceLocation, message: impl Into<String>) {
    let message = message.into();
    tracing::debug!(file = %self.file_name, %loc, %message, "error");
    self.error_count += 1;
    self.diagnostics.push(
      Diagnostic::error()
        .with_message(message.clone())
        .with_labels(vec![Label::primary((), loc.range()).with_message(message)]),
    );
  }

  pub fn warning(&mut self, loc: SourceLocation, message: impl Into<String>) {
    let message = message.into();
    self.diagnostics.push(
      Diagnostic::warning()
        .with_message(message.clone())
        .with_labels(vec![Label::primary((), loc.range()).with_message(message)]),
    );
  }

  /// A hard error tied to a source location. Aborts the current file's
  /// compilation.
  pub fn fatal(&mut self, loc: SourceLocation, message: impl Into<String>) -> ! {
    let message = message.into();
    self.diagnostics.push(
      Diagnostic::error()
        .with_message(message.clone())
        .with_labels(vec![Label::primary((), loc.range())]),
    );
    panic!("{}: fatal error at {}: {}", self.file_name, loc, message);
  }

  /// A violated compiler invariant. No source location applies.
  pub fn logical_fatal(message: impl Into<String>) -> ! {
    let message = message.into();
    panic!("logical fatal error: {}", message);
  }

  /// The lexer calls this once per line break with the offset of the first
  /// byte of the new line.
  pub fn push_next_line_offset(&mut self, offset: u32) {
    debug_assert!(self.line_offsets.last().map_or(true, |&o| o <= offset));
    self.line_offsets.push(offset);
  }

  /// The 1-based line containing `loc.start`. `hint` is the last returned
  /// line for a monotone caller; pass 0 when unknown.
  pub fn get_location_line(&self, loc: SourceLocation, hint: usize) -> usize {
    let start = loc.start;
    let from = if hint != 0 && hint <= self.line_offsets.len() && self.line_offsets[hint - 1] <= start {
      hint - 1
    } else {
      0
    };
    from + self.line_offsets[from..].partition_point(|&off| off <= start)
  }

  pub fn error_count(&self) -> usize {
    self.error_count
  }

  pub fn has_errors(&self) -> bool {
    self.error_count != 0
  }

  pub fn diagnostics(&self) -> &[Diagnostic<()>] {
    &self.diagnostics
  }

  /// Renders every accumulated diagnostic against the source text.
  pub fn render(&self, source: &str, writer: &mut dyn WriteColor) {
    let file = SimpleFile::new(self.file_name.as_str(), source);
    let config = term::Config::default();
    for diagnostic in &self.diagnostics {
      // Rendering failure is not worth dying over; the diagnostics stay
      // queryable either way.
      let _ = term::emit(writer, &config, &file, diagnostic);
    }
  }

  pub fn render_to_string(&self, source: &str) -> String {
    let mut writer = NoColor::new(Vec::new());
    self.render(source, &mut writer);
    String::from_utf8(writer.into_inner()).unwrap_or_default()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn line_lookup() {
    let mut ctx = ReportingContext::new("test.psc");
    // "ab\ncd\n\nef"
    ctx.push_next_line_offset(3);
    ctx.push_next_line_offset(6);
    ctx.push_next_line_offset(7);

    assert_eq!(ctx.get_location_line(SourceLocation::new(0, 1), 0), 1);
    assert_eq!(ctx.get_location_line(SourceLocation::new(2, 3), 0), 1);
    assert_eq!(ctx.get_location_line(SourceLocation::new(3, 4), 0), 2);
    assert_eq!(ctx.get_location_line(SourceLocation::new(6, 7), 0), 3);
    assert_eq!(ctx.get_location_line(SourceLocation::new(8, 9), 0), 4);
  }

  #[test]
  fn line_lookup_with_hint() {
    let mut ctx = ReportingContext::new("test.psc");
    for off in &[10u32, 20, 30, 40] {
      ctx.push_next_line_offset(*off);
    }
    let loc = SourceLocation::new(35, 36);
    let line = ctx.get_location_line(loc, 0);
    assert_eq!(line, 4);
    // The hint fast path agrees with the cold path.
    assert_eq!(ctx.get_location_line(loc, line), 4);
    assert_eq!(ctx.get_location_line(loc, 2), 4);
  }

  #[test]
  fn errors_accumulate() {
    let mut ctx = ReportingContext::new("test.psc");
    assert!(!ctx.has_errors());
    ctx.error(SourceLocation::new(0, 1), "first");
    ctx.error(SourceLocation::new(1, 2), "second");
    assert_eq!(ctx.error_count(), 2);
    assert_eq!(ctx.diagnostics().len(), 2);
  }

  #[test]
  fn render_names_the_file() {
    let mut ctx = ReportingContext::new("script.psc");
    ctx.error(SourceLocation::new(0, 3), "bad token");
    let out = ctx.render_to_string("abc def");
    assert!(out.contains("script.psc"));
    assert!(out.contains("bad token"));
  }

  #[test]
  #[should_panic(expected = "logical fatal error")]
  fn logical_fatal_panics() {
    ReportingContext::logical_fatal("broken invariant");
  }
}
