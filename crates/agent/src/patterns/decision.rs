//! Planner decisions: how the supervisor proceeds after reviewing a conclusion.

use serde::{Deserialize, Serialize};

const TERMINATE_KEYWORDS: [&str; 4] = ["terminate", "done", "complete", "finished"];
const REDIRECT_KEYWORDS: [&str; 3] = ["redirect", "change approach", "different approach"];

const APPROACH_LABELS: [&str; 2] = ["new approach:", "approach:"];

/// What the planner wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Keep working with a follow-up instruction
    Continue,
    /// Stop and report
    Terminate,
    /// Keep working, but with a different approach
    Redirect,
}

impl DecisionAction {
    pub fn should_continue(self) -> bool {
        matches!(self, Self::Continue | Self::Redirect)
    }

    pub fn should_terminate(self) -> bool {
        self == Self::Terminate
    }

    pub fn is_redirect(self) -> bool {
        self == Self::Redirect
    }
}

impl std::fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Continue => "CONTINUE",
            Self::Terminate => "TERMINATE",
            Self::Redirect => "REDIRECT",
        })
    }
}

/// A classified planner reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    pub reasoning: String,
    /// Instruction for the next executor run; empty for Terminate
    pub new_instruction: String,
    /// Set for Redirect
    pub modified_approach: String,
}

impl Decision {
    pub fn new(action: DecisionAction) -> Self {
        Self {
            action,
            reasoning: String::new(),
            new_instruction: String::new(),
            modified_approach: String::new(),
        }
    }

    /// The synthetic decision used when the round budget runs out.
    pub fn max_loops_reached() -> Self {
        Self {
            reasoning: "Maximum loops reached".into(),
            ..Self::new(DecisionAction::Terminate)
        }
    }

    /// Classify a planner reply by keyword.
    ///
    /// Precedence is Terminate, then Redirect, then Continue.
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();
        let action = if TERMINATE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            DecisionAction::Terminate
        } else if REDIRECT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            DecisionAction::Redirect
        } else {
            DecisionAction::Continue
        };

        let mut decision = Self::new(action);
        decision.reasoning = extract_reasoning(text);

        if !action.should_terminate() {
            decision.new_instruction = extract_instruction(text);
        }
        if action.is_redirect() {
            decision.modified_approach =
                extract_approach(text).unwrap_or_else(|| decision.reasoning.clone());
        }
        decision
    }
}

/// Strip list and emphasis markers from the start of a line.
fn strip_markers(line: &str) -> &str {
    line.trim().trim_start_matches(['#', '*', '-', ' '])
}

/// Text after the first colon, with markdown emphasis removed.
fn after_colon(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once(':')?;
    let rest = rest.trim().trim_start_matches("**").trim_end_matches("**").trim();
    (!rest.is_empty()).then_some(rest)
}

fn is_section_break(line: &str) -> bool {
    line.starts_with('#') || (line.starts_with("**") && line.contains(":**"))
}

fn extract_reasoning(text: &str) -> String {
    let mut lines = text.lines();
    let mut collected: Vec<&str> = Vec::new();

    for line in lines.by_ref() {
        if strip_markers(line).to_lowercase().starts_with("reasoning") {
            collected.extend(after_colon(line));
            break;
        }
    }

    for line in lines {
        if is_section_break(line.trim_start()) {
            break;
        }
        let line = line.trim().trim_start_matches(['*', '-']).trim();
        if !line.is_empty() {
            collected.push(line);
        }
    }

    collected.join(" ")
}

fn extract_instruction(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let lower = line.to_lowercase();
        if !(lower.contains("next") || lower.contains("instruction")) {
            continue;
        }
        if let Some(rest) = after_colon(line) {
            return rest.to_string();
        }
        if let Some(following) = lines[i + 1..].iter().map(|l| l.trim()).find(|l| !l.is_empty()) {
            return following.to_string();
        }
        break;
    }
    text.trim().to_string()
}

fn extract_approach(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let stripped = strip_markers(line);
        let lower = stripped.to_lowercase();
        APPROACH_LABELS
            .iter()
            .any(|label| lower.starts_with(label))
            .then(|| after_colon(stripped).map(str::to_string))
            .flatten()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_classification_cases() {
        assert_eq!(
            Decision::parse("The task is complete and done.").action,
            DecisionAction::Terminate
        );
        assert_eq!(
            Decision::parse("Need to continue with next steps.").action,
            DecisionAction::Continue
        );
        assert_eq!(
            Decision::parse("We should redirect and change approach.").action,
            DecisionAction::Redirect
        );
    }

    #[test]
    fn terminate_wins_over_redirect() {
        let decision = Decision::parse("Redirect? No, terminate.");
        assert_eq!(decision.action, DecisionAction::Terminate);
        assert!(decision.new_instruction.is_empty());
    }

    #[test]
    fn unmarked_reply_becomes_instruction() {
        let decision = Decision::parse("  Need to continue with next steps.  ");
        assert_eq!(decision.new_instruction, "Need to continue with next steps.");
        assert!(decision.reasoning.is_empty());
    }

    #[test]
    fn instruction_after_colon_or_on_next_line() {
        let decision = Decision::parse("CONTINUE\nNext instruction: add integration tests");
        assert_eq!(decision.new_instruction, "add integration tests");

        let decision = Decision::parse("CONTINUE\n**Next instruction**\n\n  Add a benchmark\n");
        assert_eq!(decision.new_instruction, "Add a benchmark");
    }

    #[test]
    fn reasoning_section_is_collected() {
        let text = "CONTINUE\n\n**Reasoning:** The parser works\n- but lacks error recovery\n\n## Next\nAdd recovery";
        let decision = Decision::parse(text);
        assert_eq!(
            decision.reasoning,
            "The parser works but lacks error recovery"
        );
    }

    #[test]
    fn reasoning_stops_at_bold_label() {
        let text = "Reasoning:\nTests are flaky.\n**Instruction:** pin the seed";
        let decision = Decision::parse(text);
        assert_eq!(decision.reasoning, "Tests are flaky.");
        assert_eq!(decision.new_instruction, "pin the seed");
    }

    #[test]
    fn redirect_takes_labelled_approach() {
        let text = "REDIRECT\nReasoning: regex parsing is too brittle\nNew approach: use a real parser";
        let decision = Decision::parse(text);
        assert_eq!(decision.action, DecisionAction::Redirect);
        assert_eq!(decision.modified_approach, "use a real parser");
    }

    #[test]
    fn redirect_falls_back_to_reasoning() {
        let text = "REDIRECT\nReasoning: try bisecting instead";
        let decision = Decision::parse(text);
        assert_eq!(decision.modified_approach, "try bisecting instead");
    }

    #[test]
    fn action_helpers_and_display() {
        assert!(DecisionAction::Continue.should_continue());
        assert!(DecisionAction::Redirect.should_continue());
        assert!(DecisionAction::Redirect.is_redirect());
        assert!(DecisionAction::Terminate.should_terminate());
        assert!(!DecisionAction::Terminate.should_continue());
        assert_eq!(DecisionAction::Redirect.to_string(), "REDIRECT");

        let forced = Decision::max_loops_reached();
        assert_eq!(forced.action, DecisionAction::Terminate);
        assert_eq!(forced.reasoning, "Maximum loops reached");
    }
}
