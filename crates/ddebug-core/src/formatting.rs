//! Shared formatting utilities
//!
//! Pure functions used by every output path: elapsed times, repr
//! truncation and terminal-style stripping for durable logs.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;

// =============================================================================
// Durations
// =============================================================================

/// Elapsed-time suffix of an inspection line: `+0.004s`, `+12.500s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("+{:.3}s", elapsed.as_secs_f64())
}

/// Human duration for trace output: `850µs`, `12.30ms`, `1.250s`.
pub fn format_duration(elapsed: Duration) -> String {
    let micros = elapsed.as_micros();
    if micros < 1_000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.2}ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.3}s", elapsed.as_secs_f64())
    }
}

// =============================================================================
// Text
// =============================================================================

fn ansi_pattern() -> &'static Regex {
    static ANSI: OnceLock<Regex> = OnceLock::new();
    ANSI.get_or_init(|| {
        Regex::new(r"(?:\x1B[@-_]|[\x{80}-\x{9F}])[0-?]*[ -/]*[@-~]").expect("Static regex is valid")
    })
}

/// Remove terminal escape sequences. Durable logs never receive styling.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ansi_pattern().replace_all(text, "")
}

/// Cut a repr to at most `max_chars` characters, marking the cut with `...`.
///
/// `max_chars == 0` disables truncation.
pub fn truncate_repr(repr: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 || repr.chars().count() <= max_chars {
        return Cow::Borrowed(repr);
    }
    let kept: String = repr.chars().take(max_chars.saturating_sub(3)).collect();
    Cow::Owned(format!("{}...", kept))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(4)), "+0.004s");
        assert_eq!(format_elapsed(Duration::from_millis(12_500)), "+12.500s");
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::from_micros(850)), "850µs");
        assert_eq!(format_duration(Duration::from_micros(12_300)), "12.30ms");
        assert_eq!(format_duration(Duration::from_millis(1_250)), "1.250s");
    }

    #[test]
    fn test_strip_ansi_removes_colors() {
        let styled = "\x1b[1;31mError\x1b[0m: boom";
        assert_eq!(strip_ansi(styled), "Error: boom");
    }

    #[test]
    fn test_strip_ansi_keeps_plain_text_borrowed() {
        assert!(matches!(strip_ansi("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_truncate_repr() {
        assert_eq!(truncate_repr("abcdef", 0), "abcdef");
        assert_eq!(truncate_repr("abcdef", 10), "abcdef");
        assert_eq!(truncate_repr("abcdefghij", 6), "abc...");
    }
}
