use anyhow::Result;
use std::io::IsTerminal;

/// Yes/no confirmations asked during a run
pub trait Prompter: Send + Sync {
    fn confirm(&self, question: &str, default: bool) -> Result<bool>;
}

/// Interactive prompt on the terminal; falls back to the default without a TTY
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, question: &str, default: bool) -> Result<bool> {
        if !std::io::stdin().is_terminal() {
            tracing::debug!(question, default, "no terminal, using default answer");
            return Ok(default);
        }

        let answer = dialoguer::Confirm::new()
            .with_prompt(question)
            .default(default)
            .interact()?;
        Ok(answer)
    }
}

/// Answers every question the same way (`--yes`, tests)
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompter(pub bool);

impl Prompter for FixedPrompter {
    fn confirm(&self, question: &str, _default: bool) -> Result<bool> {
        tracing::debug!(question, answer = self.0, "auto-answered");
        Ok(self.0)
    }
}
