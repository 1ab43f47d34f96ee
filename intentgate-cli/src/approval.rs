//! Terminal approval prompts
//!
//! Asks on stderr and reads `y`/`n` from stdin. Anything that is not a clear
//! yes, including end of input, is a rejection.

use async_trait::async_trait;
use intentgate_core::ApprovalPort;
use std::io::{BufRead, Write};

/// Approval port that asks the person at the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalApprover;

#[async_trait]
impl ApprovalPort for TerminalApprover {
    async fn request_approval(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut output = std::io::stderr();
            ask(&prompt, &mut input, &mut output)
        })
        .await;

        match answer {
            Ok(approved) => approved,
            Err(e) => {
                tracing::error!(error = %e, "approval prompt task failed");
                false
            }
        }
    }
}

/// Interpret one line of input.
///
/// `None` means the answer was not understood and the question should be repeated.
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" | "deny" => Some(false),
        _ => None,
    }
}

/// Prompt on `output` until `input` yields a yes or no.
pub fn ask<R: BufRead, W: Write>(prompt: &str, input: &mut R, output: &mut W) -> bool {
    let _ = writeln!(output, "\n\x1b[33mPermission required:\x1b[0m {}", prompt);
    loop {
        let _ = write!(output, "Approve? [y/n]: ");
        let _ = output.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => {
                let _ = writeln!(output);
                return false;
            }
            Ok(_) => {}
        }

        match parse_answer(&line) {
            Some(approved) => {
                let label = if approved { "Approved" } else { "Denied" };
                let _ = writeln!(output, "  \x1b[32m✓\x1b[0m {}", label);
                return approved;
            }
            None if line.trim().is_empty() => continue,
            None => {
                let _ = writeln!(output, "\x1b[31mInvalid choice. Use y/n\x1b[0m");
            }
        }
    }
}
