//! Built-in failure renderers
//!
//! | name          | output                                              |
//! |---------------|-----------------------------------------------------|
//! | `styled`      | rustc-like report with source context and a caret   |
//! | `explanation` | plain-language explanation of the message           |
//! | `frames`      | program frames with their source lines              |
//! | `plain`       | std-like panic text, source line, raw backtrace     |
//!
//! Styling is applied only when [`RenderContext::color`] is set; durable
//! copies are stripped by the sink either way.

use super::explain::explain;
use crossterm::style::Stylize;
use ddebug_config::constants::{
    RENDERER_EXPLANATION, RENDERER_FRAMES, RENDERER_PLAIN, RENDERER_STYLED,
};
use ddebug_core::{Error, FailureInfo, Result, SourceLocation, StackFrame};
use ddebug_logging::warn;
use ddebug_ports::{FailureRenderer, FailureRendererRef, RenderContext, SourceProvider};
use std::fmt::Write;
use std::sync::Arc;

/// Applies terminal styling when enabled.
struct Painter {
    color: bool,
}

impl Painter {
    fn new(color: bool) -> Self {
        Self { color }
    }

    fn error(&self, text: &str) -> String {
        if self.color {
            text.red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn strong(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.blue().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn note(&self, text: &str) -> String {
        if self.color {
            text.cyan().to_string()
        } else {
            text.to_string()
        }
    }
}

fn fmt_err(renderer: &str) -> impl Fn(std::fmt::Error) -> Error + '_ {
    move |e| Error::renderer(renderer, e)
}

/// Source lines around `line`, clamped to the file start.
fn context_lines(
    source: &dyn SourceProvider,
    location: &SourceLocation,
    around: u32,
) -> Vec<(u32, String)> {
    source.lines(
        &location.file,
        location.line.saturating_sub(around),
        location.line + around,
    )
}

// ============================================================================
// styled
// ============================================================================

/// Rustc-like report: headline, location arrow, source gutter with a caret
/// under the failing column, causes and program frames.
pub struct StyledRenderer;

impl FailureRenderer for StyledRenderer {
    fn render(&self, failure: &FailureInfo, ctx: &RenderContext<'_>, out: &mut String) -> Result<()> {
        let paint = Painter::new(ctx.color);
        let err = fmt_err(RENDERER_STYLED);

        writeln!(out, "{}", paint.error(&failure.headline())).map_err(&err)?;
        writeln!(out, "{}", paint.strong(&format!("{}: {}", failure.kind, failure.message)))
            .map_err(&err)?;

        if let Some(location) = &failure.location {
            let lines = context_lines(ctx.source, location, ctx.context_lines);
            let width = lines
                .last()
                .map(|(n, _)| n.to_string().len())
                .unwrap_or(1);
            let pad = " ".repeat(width);
            writeln!(
                out,
                "{}{} {}:{}:{}",
                pad,
                paint.dim("-->"),
                location.file,
                location.line,
                location.column
            )
            .map_err(&err)?;

            if !lines.is_empty() {
                writeln!(out, "{} {}", pad, paint.dim("|")).map_err(&err)?;
                for (number, text) in &lines {
                    let gutter = format!("{:>width$} |", number, width = width);
                    writeln!(out, "{} {}", paint.dim(&gutter), text).map_err(&err)?;
                    if *number == location.line {
                        let column = location.column.max(1) as usize;
                        let caret = format!("{}^", " ".repeat(column - 1));
                        writeln!(out, "{} {} {}", pad, paint.dim("|"), paint.error(&caret))
                            .map_err(&err)?;
                    }
                }
                writeln!(out, "{} {}", pad, paint.dim("|")).map_err(&err)?;
            }
        }

        for cause in &failure.causes {
            writeln!(out, "{} {}", paint.note("caused by:"), cause).map_err(&err)?;
        }

        let frames = failure.user_frames();
        if !frames.is_empty() {
            writeln!(out, "{}", paint.note("program frames:")).map_err(&err)?;
            for frame in &frames {
                write_frame_header(out, frame).map_err(&err)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        RENDERER_STYLED
    }
}

fn write_frame_header(out: &mut String, frame: &StackFrame) -> std::fmt::Result {
    writeln!(out, "  {:>3}: {}", frame.index, frame.name)?;
    if let (Some(file), Some(line)) = (&frame.file, frame.line) {
        writeln!(out, "         at {}:{}", file, line)?;
    }
    Ok(())
}

// ============================================================================
// explanation
// ============================================================================

/// Plain-language explanation, the failing line and where it is.
pub struct ExplanationRenderer;

impl FailureRenderer for ExplanationRenderer {
    fn render(&self, failure: &FailureInfo, ctx: &RenderContext<'_>, out: &mut String) -> Result<()> {
        let paint = Painter::new(ctx.color);
        let err = fmt_err(RENDERER_EXPLANATION);

        writeln!(out, "{}", paint.strong("What happened")).map_err(&err)?;
        writeln!(out, "  {}", explain(&failure.message)).map_err(&err)?;
        for cause in &failure.causes {
            writeln!(out, "  It was caused by: {}", explain(cause)).map_err(&err)?;
        }

        if let Some(location) = &failure.location {
            writeln!(out).map_err(&err)?;
            writeln!(out, "{}", paint.strong("Where")).map_err(&err)?;
            writeln!(
                out,
                "  Line {} of {}, in {}",
                location.line,
                location.file,
                location.scope_name()
            )
            .map_err(&err)?;
            if let Some(code) = ctx.source.line(&location.file, location.line) {
                writeln!(out, "  {}", code.trim()).map_err(&err)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        RENDERER_EXPLANATION
    }
}

// ============================================================================
// frames
// ============================================================================

/// Program frames, innermost first, each with its source line.
///
/// Falls back to the failure location when no backtrace was captured.
pub struct FramesRenderer;

impl FailureRenderer for FramesRenderer {
    fn render(&self, failure: &FailureInfo, ctx: &RenderContext<'_>, out: &mut String) -> Result<()> {
        let paint = Painter::new(ctx.color);
        let err = fmt_err(RENDERER_FRAMES);

        let frames = failure.user_frames();
        writeln!(out, "{}", paint.strong("Frames (most recent call first):")).map_err(&err)?;

        if frames.is_empty() {
            let location = failure
                .location
                .as_ref()
                .ok_or_else(|| Error::renderer(RENDERER_FRAMES, "no frames and no location captured"))?;
            writeln!(out, "  #0 {}", location).map_err(&err)?;
            if let Some(code) = ctx.source.line(&location.file, location.line) {
                writeln!(out, "     {:>5} | {}", location.line, code).map_err(&err)?;
            }
            return Ok(());
        }

        for (position, frame) in frames.iter().enumerate() {
            writeln!(out, "  #{} {}", position, frame.name).map_err(&err)?;
            if let (Some(file), Some(line)) = (&frame.file, frame.line) {
                writeln!(out, "     at {}:{}", file, line).map_err(&err)?;
                if let Some(code) = ctx.source.line(file, line) {
                    writeln!(out, "     {:>5} | {}", line, code).map_err(&err)?;
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        RENDERER_FRAMES
    }
}

// ============================================================================
// plain
// ============================================================================

/// The report std would print plus the failing source line, never styled.
pub struct PlainRenderer;

impl FailureRenderer for PlainRenderer {
    fn render(&self, failure: &FailureInfo, ctx: &RenderContext<'_>, out: &mut String) -> Result<()> {
        let err = fmt_err(RENDERER_PLAIN);
        writeln!(out, "{}", failure.headline()).map_err(&err)?;
        writeln!(out, "{}", failure.message).map_err(&err)?;
        if let Some(location) = &failure.location {
            if let Some(code) = ctx.source.line(&location.file, location.line) {
                writeln!(out, "  --> {}:{}", location.file, location.line).map_err(&err)?;
                writeln!(out, "{:>5} | {}", location.line, code).map_err(&err)?;
            }
        }
        for cause in &failure.causes {
            writeln!(out, "Caused by: {}", cause).map_err(&err)?;
        }
        if let Some(backtrace) = &failure.backtrace {
            writeln!(out, "stack backtrace:").map_err(&err)?;
            out.push_str(backtrace);
            if !backtrace.ends_with('\n') {
                out.push('\n');
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        RENDERER_PLAIN
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Built-in renderer by name.
pub fn renderer_by_name(name: &str) -> Option<FailureRendererRef> {
    let renderer: FailureRendererRef = match name {
        RENDERER_STYLED => Arc::new(StyledRenderer),
        RENDERER_EXPLANATION => Arc::new(ExplanationRenderer),
        RENDERER_FRAMES => Arc::new(FramesRenderer),
        RENDERER_PLAIN => Arc::new(PlainRenderer),
        _ => return None,
    };
    Some(renderer)
}

/// Built-in renderers for `names`, in order. Unknown names are skipped.
pub fn renderers_by_names(names: &[String]) -> Vec<FailureRendererRef> {
    names
        .iter()
        .filter_map(|name| {
            let renderer = renderer_by_name(name);
            if renderer.is_none() {
                warn!(renderer = %name, "Unknown failure renderer, skipping");
            }
            renderer
        })
        .collect()
}

/// `styled`, `explanation`, `frames`, `plain`.
pub fn default_renderers() -> Vec<FailureRendererRef> {
    vec![
        Arc::new(StyledRenderer),
        Arc::new(ExplanationRenderer),
        Arc::new(FramesRenderer),
        Arc::new(PlainRenderer),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddebug_core::strip_ansi;

    struct Fixed(Vec<&'static str>);

    impl SourceProvider for Fixed {
        fn line(&self, _file: &str, line: u32) -> Option<String> {
            self.0.get(line.checked_sub(1)? as usize).map(|s| s.to_string())
        }
    }

    fn source() -> Fixed {
        Fixed(vec![
            "fn main() {",
            "    let zero = black_box(0);",
            "    let x = 10 / zero;",
            "    println!(\"{}\", x);",
            "}",
        ])
    }

    fn failure() -> FailureInfo {
        FailureInfo::panic(
            "attempt to divide by zero",
            Some(SourceLocation::new("src/main.rs", 3).with_column(13)),
        )
        .with_thread("main")
    }

    fn render(renderer: &dyn FailureRenderer, failure: &FailureInfo, color: bool) -> String {
        let source = source();
        let ctx = RenderContext::new(&source).color(color);
        let mut out = String::new();
        renderer.render(failure, &ctx, &mut out).unwrap();
        out
    }

    #[test]
    fn test_styled_shows_source_and_caret() {
        let out = render(&StyledRenderer, &failure(), false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "thread 'main' panicked at src/main.rs:3:13:");
        assert_eq!(lines[1], "panic: attempt to divide by zero");
        assert_eq!(lines[2], " --> src/main.rs:3:13");
        assert!(lines.contains(&"3 |     let x = 10 / zero;"));
        assert!(lines.contains(&"  |             ^"));
    }

    #[test]
    fn test_styled_color_strips_to_plain() {
        let colored = render(&StyledRenderer, &failure(), true);
        let plain = render(&StyledRenderer, &failure(), false);
        assert_ne!(colored, plain);
        assert_eq!(strip_ansi(&colored), plain);
    }

    #[test]
    fn test_explanation_mentions_cause_and_line() {
        let out = render(&ExplanationRenderer, &failure(), false);
        assert!(out.contains("divid"));
        assert!(out.contains("Line 3 of src/main.rs, in <module>"));
        assert!(out.contains("let x = 10 / zero;"));
    }

    #[test]
    fn test_frames_falls_back_to_location() {
        let out = render(&FramesRenderer, &failure(), false);
        assert!(out.contains("#0 main.rs:3 in <module>"));
        assert!(out.contains("    3 |     let x = 10 / zero;"));
    }

    #[test]
    fn test_frames_uses_program_frames() {
        let failure = failure().with_backtrace(
            "   0: std::panicking::begin_panic_handler\n   1: demo::compute\n             at src/main.rs:3:13\n",
        );
        let out = render(&FramesRenderer, &failure, false);
        assert!(out.contains("#0 demo::compute"));
        assert!(out.contains("at src/main.rs:3"));
        assert!(!out.contains("begin_panic_handler"));
    }

    #[test]
    fn test_frames_without_anything_fails() {
        let failure = FailureInfo::panic("boom", None);
        let source = source();
        let ctx = RenderContext::new(&source);
        let mut out = String::new();
        let err = FramesRenderer.render(&failure, &ctx, &mut out).unwrap_err();
        assert!(err.to_string().contains("frames"));
    }

    #[test]
    fn test_plain_includes_causes() {
        let mut failure = failure();
        failure.causes.push("disk full".to_string());
        let out = render(&PlainRenderer, &failure, true);
        assert!(out.starts_with("thread 'main' panicked at src/main.rs:3:13:\nattempt to divide by zero\n"));
        assert!(out.contains("Caused by: disk full"));
    }

    #[test]
    fn test_plain_shows_failing_line() {
        let out = render(&PlainRenderer, &failure(), false);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[2], "  --> src/main.rs:3");
        assert_eq!(lines[3], "    3 |     let x = 10 / zero;");

        let unknown = FailureInfo::panic("boom", Some(SourceLocation::new("src/gone.rs", 40)));
        let out = render(&PlainRenderer, &unknown, false);
        assert!(!out.contains("-->"));
    }

    #[test]
    fn test_registry() {
        let names: Vec<String> = default_renderers()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["styled", "explanation", "frames", "plain"]);
        assert!(renderer_by_name("rich").is_none());
        let picked = renderers_by_names(&["plain".to_string(), "nope".to_string()]);
        assert_eq!(picked.len(), 1);
    }
}
