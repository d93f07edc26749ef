//! Terminal logger and interactive operator

use async_trait::async_trait;
use chrono::Local;
use colored::Colorize;
use redeploy_core::{indentation, LogLevel, Logger, Operator, OperatorPrompt};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::warn;

/// Colored, timestamped logger writing to stdout.
///
/// Lines from the stdout and stderr drain tasks arrive concurrently; the mutex
/// keeps each line whole.
#[derive(Debug, Default)]
pub struct ConsoleLogger {
    sink: Mutex<()>,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str, indent: usize) {
        let line = format_line(
            &Local::now().format("%H:%M:%S").to_string(),
            level,
            message,
            indent,
        );
        let _guard = self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
    }
}

fn format_line(timestamp: &str, level: LogLevel, message: &str, indent: usize) -> String {
    let (marker, text) = match level {
        LogLevel::Info => ("•".normal(), message.normal()),
        LogLevel::Success => ("✔".bright_green(), message.bright_green()),
        LogLevel::Warning => ("!".bright_yellow(), message.bright_yellow()),
        LogLevel::Error => ("✖".bright_red(), message.bright_red()),
        LogLevel::Progress => ("→".bright_cyan(), message.bright_white()),
    };
    format!(
        "{} {}{} {}",
        format!("[{}]", timestamp).dimmed(),
        indentation(indent),
        marker,
        text
    )
}

/// Operator answering prompts typed on stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinOperator;

impl StdinOperator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Operator for StdinOperator {
    async fn confirm(&self, prompt: &OperatorPrompt) -> bool {
        let question = prompt.question();
        let default = prompt.default_answer();
        match tokio::task::spawn_blocking(move || ask_confirmation(&question, default)).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                warn!("Could not read answer, using default: {}", e);
                default
            }
            Err(e) => {
                warn!("Prompt task failed, using default: {}", e);
                default
            }
        }
    }

    async fn acknowledge(&self, message: &str) {
        let message = message.to_string();
        let result = tokio::task::spawn_blocking(move || -> io::Result<()> {
            print!("{} ", message.bright_white().bold());
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            Ok(())
        })
        .await;
        if let Ok(Err(e)) = result {
            warn!("Could not read acknowledgement: {}", e);
        }
    }
}

fn ask_confirmation(prompt: &str, default: bool) -> io::Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{} {} ", prompt.bright_white().bold(), hint.dimmed());
    io::stdout().flush()?;

    let mut response = String::new();
    // EOF: nobody is there to answer
    if io::stdin().read_line(&mut response)? == 0 {
        println!();
        return Ok(default);
    }
    Ok(parse_answer(&response, default))
}

fn parse_answer(response: &str, default: bool) -> bool {
    match response.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert!(parse_answer("y\n", false));
        assert!(parse_answer(" YES ", false));
        assert!(!parse_answer("n", true));
        assert!(!parse_answer("\n", false));
        assert!(parse_answer("", true));
        assert!(!parse_answer("maybe", false));
    }

    #[test]
    fn test_format_line_layout() {
        colored::control::set_override(false);
        let line = format_line("09:15:02", LogLevel::Progress, "[4/7] Stopping containers", 1);
        assert_eq!(line, "[09:15:02]   → [4/7] Stopping containers");

        let line = format_line("09:15:03", LogLevel::Error, "shop: Build error", 0);
        assert_eq!(line, "[09:15:03] ✖ shop: Build error");
    }
}
