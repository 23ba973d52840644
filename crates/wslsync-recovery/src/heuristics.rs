//! Heuristic classification for codes absent from the catalog
//!
//! An explicit, ordered list of predicate/category pairs evaluated in a
//! fixed priority order: the first heuristic whose predicate matches wins.
//! Each heuristic is a plain function over the raw error message and the
//! action that failed, so the list is unit-testable independently of the
//! catalog.

use wslsync_core::domain::{ErrorCategory, Severity, SyncAction};

/// Input handed to heuristic predicates
#[derive(Debug, Clone, Copy)]
pub struct HeuristicInput<'a> {
    /// Lowercased display string of the raw error
    pub message: &'a str,
    /// The action that was being performed
    pub action: SyncAction,
}

/// One named heuristic rule
#[derive(Debug, Clone, Copy)]
pub struct Heuristic {
    /// Stable name, used as the classified error's code (e.g. `"H_COLLISION"`)
    pub name: &'static str,
    /// Category assigned on match
    pub category: ErrorCategory,
    /// Severity assigned on match
    pub severity: Severity,
    /// Retryability assigned on match
    pub retryable: bool,
    predicate: fn(&HeuristicInput<'_>) -> bool,
}

impl Heuristic {
    /// Returns true if this heuristic matches the input
    pub fn matches(&self, input: &HeuristicInput<'_>) -> bool {
        (self.predicate)(input)
    }
}

fn is_filename_collision(input: &HeuristicInput<'_>) -> bool {
    input.message.contains("already exists")
        || input.message.contains("file exists")
        || input.message.contains("case-insensitive")
        || input.message.contains("collides with")
}

fn is_config_read(input: &HeuristicInput<'_>) -> bool {
    input.action == SyncAction::ConfigRead
}

fn is_validation_failure(input: &HeuristicInput<'_>) -> bool {
    input.message.contains("invalid") || input.message.contains("validation failed")
}

/// The default heuristic list, in priority order
///
/// Collision patterns come first: a collision message on a config read is
/// still a conflict, not a config error.
pub fn default_heuristics() -> &'static [Heuristic] {
    &[
        Heuristic {
            name: "H_COLLISION",
            category: ErrorCategory::Conflict,
            severity: Severity::Warning,
            retryable: false,
            predicate: is_filename_collision,
        },
        Heuristic {
            name: "H_CONFIG_READ",
            category: ErrorCategory::Config,
            severity: Severity::Error,
            retryable: false,
            predicate: is_config_read,
        },
        Heuristic {
            name: "H_VALIDATION",
            category: ErrorCategory::Validation,
            severity: Severity::Error,
            retryable: false,
            predicate: is_validation_failure,
        },
    ]
}

/// Evaluates a heuristic list in order, returning the first match
pub fn apply<'h>(
    heuristics: &'h [Heuristic],
    input: &HeuristicInput<'_>,
) -> Option<&'h Heuristic> {
    heuristics.iter().find(|h| h.matches(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(message: &str, action: SyncAction) -> HeuristicInput<'_> {
        HeuristicInput { message, action }
    }

    #[test]
    fn test_collision_patterns_classify_as_conflict() {
        let heuristics = default_heuristics();

        for message in [
            "destination already exists",
            "file exists",
            "case-insensitive name clash",
            "report.txt collides with Report.txt",
        ] {
            let matched = apply(heuristics, &input(message, SyncAction::Copy))
                .unwrap_or_else(|| panic!("no heuristic matched {message:?}"));
            assert_eq!(matched.category, ErrorCategory::Conflict);
        }
    }

    #[test]
    fn test_config_read_action_classifies_as_config() {
        let heuristics = default_heuristics();
        let matched = apply(
            heuristics,
            &input("unexpected end of stream", SyncAction::ConfigRead),
        )
        .unwrap();
        assert_eq!(matched.category, ErrorCategory::Config);
        assert!(!matched.retryable);
    }

    #[test]
    fn test_validation_message_classifies_as_validation() {
        let heuristics = default_heuristics();
        let matched = apply(heuristics, &input("invalid utf-8 in path", SyncAction::Stat)).unwrap();
        assert_eq!(matched.category, ErrorCategory::Validation);
    }

    #[test]
    fn test_priority_order_collision_beats_config() {
        // A collision message during a config read is still a conflict.
        let heuristics = default_heuristics();
        let matched = apply(
            heuristics,
            &input("target already exists", SyncAction::ConfigRead),
        )
        .unwrap();
        assert_eq!(matched.category, ErrorCategory::Conflict);
    }

    #[test]
    fn test_no_match_returns_none() {
        let heuristics = default_heuristics();
        assert!(apply(heuristics, &input("something odd happened", SyncAction::Copy)).is_none());
    }
}
