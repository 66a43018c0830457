use crate::error::Result;
use colored::Colorize;
use std::io::{self, BufRead, Write};

/// Renders choices and diffs to the user.
///
/// `select` returns the index of the chosen entry, or `None` when the user
/// cancels. Nothing in the pipeline talks to the terminal directly, so the
/// menus can be scripted in tests.
pub trait Presenter {
    fn select(&mut self, prompt: &str, choices: &[String]) -> Result<Option<usize>>;

    fn show_diff(&mut self, title: &str, diff: &str);
}

/// Numbered menus on stdin/stdout.
pub struct TerminalPresenter<R: BufRead> {
    input: R,
}

impl TerminalPresenter<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> TerminalPresenter<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    fn parse_answer(answer: &str, len: usize) -> Option<Option<usize>> {
        match answer {
            "" | "0" | "q" | "quit" | "c" | "cancel" => Some(None),
            other => match other.parse::<usize>() {
                Ok(n) if (1..=len).contains(&n) => Some(Some(n - 1)),
                _ => None,
            },
        }
    }
}

impl<R: BufRead> Presenter for TerminalPresenter<R> {
    fn select(&mut self, prompt: &str, choices: &[String]) -> Result<Option<usize>> {
        println!("\n{}", prompt.bold());
        for (i, label) in choices.iter().enumerate() {
            println!("  {:>2}) {}", (i + 1).to_string().cyan(), label);
        }
        println!("  {:>2}) {}", "0".cyan(), "Cancel".dimmed());

        loop {
            print!("{}", format!("Choice [1-{}, 0 to cancel]: ", choices.len()).bold());
            io::stdout().flush()?;

            let mut input = String::new();
            if self.input.read_line(&mut input)? == 0 {
                // stdin closed
                return Ok(None);
            }

            match Self::parse_answer(&input.trim().to_lowercase(), choices.len()) {
                Some(selection) => return Ok(selection),
                None => println!(
                    "{}",
                    format!("Please enter a number between 0 and {}.", choices.len()).red()
                ),
            }
        }
    }

    fn show_diff(&mut self, title: &str, diff: &str) {
        println!("\n{}", format!("--- Changes in {title} ---").cyan().bold());
        for line in diff.lines() {
            if line.starts_with("+++") || line.starts_with("---") {
                println!("{}", line.bold());
            } else if line.starts_with('+') {
                println!("{}", line.green());
            } else if line.starts_with('-') {
                println!("{}", line.red());
            } else if line.starts_with("@@") {
                println!("{}", line.cyan());
            } else {
                println!("{line}");
            }
        }
        println!("{}", "------------------------------------".cyan());
    }
}
