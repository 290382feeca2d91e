//! Interactive yes/no confirmation.
//!
//! Destructive or backward-moving operations ask before touching the store.
//! Only `yes` and `no` (any case) are answers; anything else asks again. End of
//! input is a `no`.

use std::collections::VecDeque;

/// Line-oriented access to whoever is driving the tool.
pub trait Prompt {
    /// Show `prompt` and read one line. `None` once input is exhausted.
    fn read_line(&mut self, prompt: &str) -> Option<String>;

    /// Show a message that needs no answer.
    fn notice(&mut self, message: &str);
}

/// Ask `question` until the answer is `yes` or `no`.
pub fn confirm(prompt: &mut dyn Prompt, question: &str) -> bool {
    let question = format!("{question} (yes/no): ");
    loop {
        let Some(answer) = prompt.read_line(&question) else {
            tracing::debug!("Input closed during confirmation, treating as no");
            return false;
        };

        match answer.trim().to_lowercase().as_str() {
            "yes" => return true,
            "no" => return false,
            _ => prompt.notice("Invalid response. Answer with 'yes' or 'no'."),
        }
    }
}

/// Prompt fed from a fixed list of answers.
///
/// Records every question and notice so callers can check what was asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
    notices: Vec<String>,
}

impl ScriptedPrompt {
    /// Create a prompt that answers with `answers`, in order, then hits end of input.
    #[must_use]
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Questions shown so far.
    #[must_use]
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    /// Notices shown so far.
    #[must_use]
    pub fn notices(&self) -> &[String] {
        &self.notices
    }
}

impl Prompt for ScriptedPrompt {
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        self.asked.push(prompt.to_owned());
        self.answers.pop_front()
    }

    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_and_no_any_case() {
        assert!(confirm(&mut ScriptedPrompt::new(["yes"]), "Go?"));
        assert!(confirm(&mut ScriptedPrompt::new(["YES"]), "Go?"));
        assert!(confirm(&mut ScriptedPrompt::new([" Yes \n"]), "Go?"));
        assert!(!confirm(&mut ScriptedPrompt::new(["no"]), "Go?"));
        assert!(!confirm(&mut ScriptedPrompt::new(["No"]), "Go?"));
    }

    #[test]
    fn test_invalid_answers_reprompt() {
        let mut prompt = ScriptedPrompt::new(["y", "maybe", "yes"]);
        assert!(confirm(&mut prompt, "Delete alice?"));
        assert_eq!(prompt.asked().len(), 3);
        assert_eq!(prompt.notices().len(), 2);
        assert!(prompt.asked().iter().all(|q| q == "Delete alice? (yes/no): "));
    }

    #[test]
    fn test_end_of_input_is_no() {
        let mut prompt = ScriptedPrompt::new(["n"]);
        assert!(!confirm(&mut prompt, "Delete alice?"));
        assert_eq!(prompt.asked().len(), 2);
    }
}
