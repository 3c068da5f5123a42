use std::io::{self, BufRead, Write};

use client_core::Prompt;

/// Terminal dialogs: confirmations read `y/N` from the input, notices go to
/// the output.
pub struct StdioPrompt<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl StdioPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio(assume_yes: bool) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), assume_yes)
    }
}

impl<R: BufRead, W: Write> StdioPrompt<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompt for StdioPrompt<R, W> {
    fn confirm(&mut self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let asked = write!(self.output, "{message} [y/N] ").and_then(|()| self.output.flush());
        if let Err(err) = asked {
            tracing::warn!(%err, "failed to write confirmation prompt");
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(err) => {
                tracing::warn!(%err, "failed to read confirmation");
                false
            }
        }
    }

    fn notify(&mut self, message: &str) {
        if let Err(err) = writeln!(self.output, "{message}") {
            tracing::warn!(%err, "failed to write notice");
        }
    }
}

#[cfg(test)]
#[path = "tests/prompt_tests.rs"]
mod tests;
