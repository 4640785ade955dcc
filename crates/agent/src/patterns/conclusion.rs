//! Conclusions: what one executor run achieved, scored for the planner.

use serde::{Deserialize, Serialize};

/// Replies mentioning any of these are treated as finished work.
const COMPLETION_KEYWORDS: [&str; 3] = ["done", "complete", "finished"];
/// Replies mentioning any of these (and no completion keyword) are treated as failed work.
const FAILURE_KEYWORDS: [&str; 2] = ["error", "failed"];

const NEXT_ACTION_LABELS: [&str; 3] = ["suggested next action:", "next action:", "next step:"];

/// Summary of one executor run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conclusion {
    /// The executor's full reply text
    pub summary: String,
    /// List items found in the reply, in order
    pub steps: Vec<String>,
    /// 0.0 – 1.0
    pub confidence: f64,
    /// Model calls the executor made
    pub iteration_count: usize,
    pub suggested_next_action: String,
    /// Files or outputs produced. `extract` leaves this empty; callers fill
    /// it with [`Conclusion::add_artifact`].
    pub artifacts: Vec<String>,
    /// Instruction the executor was given
    pub original_input: String,
}

impl Conclusion {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }

    /// Heuristically extract a conclusion from executor reply text.
    ///
    /// Completion keywords win over failure keywords.
    pub fn extract(text: &str) -> Self {
        let lower = text.to_lowercase();
        let confidence = if COMPLETION_KEYWORDS.iter().any(|k| lower.contains(k)) {
            0.9
        } else if FAILURE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            0.2
        } else {
            0.5
        };

        let mut conclusion = Self::new(text);
        conclusion.confidence = confidence;

        for line in text.lines() {
            let line = line.trim();
            if is_list_item(line) {
                conclusion.add_step(line);
            }
            if conclusion.suggested_next_action.is_empty()
                && let Some(action) = labelled_next_action(line)
            {
                conclusion.suggested_next_action = action.to_string();
            }
        }

        conclusion
    }

    pub fn add_step(&mut self, step: impl Into<String>) {
        self.steps.push(step.into());
    }

    pub fn add_artifact(&mut self, artifact: impl Into<String>) {
        self.artifacts.push(artifact.into());
    }

    pub fn is_complete(&self) -> bool {
        self.confidence >= 0.8
    }
}

/// `- item` or `12. item`
fn is_list_item(line: &str) -> bool {
    if line.starts_with('-') {
        return true;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && line[digits..].starts_with('.')
}

fn labelled_next_action(line: &str) -> Option<&str> {
    let stripped = line.trim_start_matches(['-', '*', ' ']);
    let lower = stripped.to_lowercase();
    NEXT_ACTION_LABELS.iter().find_map(|label| {
        if !lower.starts_with(label) {
            return None;
        }
        let rest = stripped.get(label.len()..)?;
        Some(rest.trim().trim_start_matches("**").trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_list_gives_ordered_steps_and_neutral_confidence() {
        let conclusion = Conclusion::extract("- Step one\n- Step two\n- Step three");
        assert_eq!(conclusion.steps, vec!["- Step one", "- Step two", "- Step three"]);
        assert_eq!(conclusion.confidence, 0.5);
        assert!(conclusion.artifacts.is_empty());
        assert!(!conclusion.is_complete());
    }

    #[test]
    fn completion_keywords_raise_confidence() {
        let conclusion = Conclusion::extract("All tests pass. The refactor is complete.");
        assert_eq!(conclusion.confidence, 0.9);
        assert!(conclusion.is_complete());
    }

    #[test]
    fn failure_keywords_lower_confidence() {
        let conclusion = Conclusion::extract("The build FAILED with a linker error.");
        assert_eq!(conclusion.confidence, 0.2);
    }

    #[test]
    fn completion_beats_failure() {
        let conclusion = Conclusion::extract("Fixed the error, done.");
        assert_eq!(conclusion.confidence, 0.9);
    }

    #[test]
    fn numbered_lists_are_steps() {
        let text = "Plan:\n1. Read the file\n  2. Patch it\n10. Ship\nNot a step\n3 missing dot";
        let conclusion = Conclusion::extract(text);
        assert_eq!(conclusion.steps, vec!["1. Read the file", "2. Patch it", "10. Ship"]);
    }

    #[test]
    fn labelled_next_action_is_captured() {
        let conclusion = Conclusion::extract("Parser ported.\n**Next step:** wire it into the CLI");
        assert_eq!(conclusion.suggested_next_action, "wire it into the CLI");

        let conclusion = Conclusion::extract("Suggested next action: add tests");
        assert_eq!(conclusion.suggested_next_action, "add tests");

        assert!(Conclusion::extract("nothing labelled").suggested_next_action.is_empty());
    }

    #[test]
    fn programmatic_construction() {
        let mut conclusion = Conclusion::new("manual");
        conclusion.add_step("wrote docs");
        conclusion.add_artifact("README.md");
        conclusion.add_artifact("CHANGELOG.md");
        assert_eq!(conclusion.steps, vec!["wrote docs"]);
        assert_eq!(conclusion.artifacts, vec!["README.md", "CHANGELOG.md"]);
        assert_eq!(conclusion.confidence, 0.0);
    }
}
