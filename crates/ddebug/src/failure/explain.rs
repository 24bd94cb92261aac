//! Plain-language explanations of common failure messages

use ddebug_logging::warn;
use regex::Regex;
use std::sync::OnceLock;

struct Rule {
    pattern: Regex,
    /// Expanded with the pattern's captures (`$1`, `$2`)
    template: &'static str,
}

const RULES: &[(&str, &str)] = &[
    (
        r"(?i)divide by zero|division by zero|divided by zero|remainder with a divisor of zero",
        "A number was divided by zero. Dividing by zero has no result, so the program \
         stopped. Check that the divisor is not zero before dividing.",
    ),
    (
        r"index out of bounds: the len is (\d+) but the index is (\d+)",
        "A collection with $1 elements was indexed at position $2. Valid positions start \
         at 0 and stop one before the length. Use `.get()` when the index may be out of range.",
    ),
    (
        r"called `Option::unwrap\(\)` on a `None` value",
        "A value that was expected to be present was missing: `unwrap()` was called on \
         `None`. Handle the missing case with `match`, `if let` or `?`.",
    ),
    (
        r"called `Result::unwrap\(\)` on an `Err` value: (.*)",
        "An operation failed and its error was not handled: `unwrap()` was called on \
         the error `$1`. Propagate it with `?` or handle it with `match`.",
    ),
    (
        r"attempt to (add|subtract|multiply|negate|shift left|shift right) with overflow",
        "An arithmetic operation overflowed: the result of the `$1` does not fit in the \
         integer type. Use a wider type or the `checked_`/`wrapping_` methods.",
    ),
    (
        r"byte index (\d+) is not a char boundary",
        "A string was sliced at byte $1, which is inside a multi-byte character. Slice \
         at positions returned by `char_indices()`.",
    ),
    (
        r"already (?:mutably )?borrowed",
        "A `RefCell` was borrowed while a conflicting borrow was still alive.",
    ),
    (
        r"(?i)no such file or directory|not found",
        "A file or resource the program needs does not exist at the given path.",
    ),
    (
        r"(?i)permission denied",
        "The program is not allowed to access a file or resource it tried to use.",
    ),
    (
        r"(?i)invalid digit|invalid float literal|cannot parse integer",
        "Text could not be parsed as a number.",
    ),
];

fn rules() -> &'static [Rule] {
    static COMPILED: OnceLock<Vec<Rule>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .filter_map(|&(pattern, template)| match Regex::new(pattern) {
                Ok(pattern) => Some(Rule { pattern, template }),
                Err(e) => {
                    warn!("Skipping explanation rule: {}", e);
                    None
                }
            })
            .collect()
    })
}

/// Explain a failure message in plain language.
pub fn explain(message: &str) -> String {
    for rule in rules() {
        if let Some(caps) = rule.pattern.captures(message) {
            let mut text = String::new();
            caps.expand(rule.template, &mut text);
            return text;
        }
    }
    format!(
        "The program stopped because of an unexpected condition: {}. The location \
         and frames above show where it happened.",
        message.trim_end_matches('.')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_by_zero() {
        assert!(explain("attempt to divide by zero").contains("divid"));
        assert!(explain("attempt to calculate the remainder with a divisor of zero").contains("divid"));
    }

    #[test]
    fn test_index_out_of_bounds_uses_captures() {
        let text = explain("index out of bounds: the len is 3 but the index is 7");
        assert!(text.contains("3 elements"));
        assert!(text.contains("position 7"));
    }

    #[test]
    fn test_unwrap_err_names_error() {
        let text = explain("called `Result::unwrap()` on an `Err` value: ParseIntError");
        assert!(text.contains("`ParseIntError`"));
    }

    #[test]
    fn test_overflow_names_operation() {
        assert!(explain("attempt to multiply with overflow").contains("`multiply`"));
    }

    #[test]
    fn test_unknown_message_falls_back() {
        let text = explain("reactor core breach.");
        assert!(text.contains("reactor core breach"));
        assert!(!text.contains("breach.."));
    }
}
