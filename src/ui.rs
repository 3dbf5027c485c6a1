use std::{io, time::Duration};

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};

use crate::flow::{Choice, Outcome, Prompter};

/// [`Prompter`] on the controlling terminal
pub struct TerminalPrompter {
    theme: ColorfulTheme,
    spinner: Option<ProgressBar>,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            spinner: None,
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn select(&mut self, prompt: &str, choices: &[Choice]) -> Result<Option<usize>> {
        let items: Vec<String> = choices.iter().map(choice_line).collect();

        let selection = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&items)
            .default(0)
            .interact_opt();

        cancel_on_interrupt(selection)
    }

    fn input_code(&mut self, notice: Option<&str>) -> Result<Option<String>> {
        if let Some(notice) = notice {
            eprintln!("{}", notice.red());
        }

        let code = Input::<String>::with_theme(&self.theme)
            .with_prompt("MFA code")
            .interact_text()
            .map(Some);

        cancel_on_interrupt(code)
    }

    fn start_busy(&mut self, message: &str) {
        self.stop_busy();
        self.spinner = Some(spinner(message));
    }

    fn stop_busy(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

fn choice_line(choice: &Choice) -> String {
    if choice.description.is_empty() {
        choice.title.clone()
    } else {
        format!("{} {}", choice.title, choice.description.dimmed())
    }
}

/// Ctrl-C arrives as an interrupted read while a prompt owns the terminal
fn cancel_on_interrupt<T>(result: dialoguer::Result<Option<T>>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(value),
        Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e).context("Failed to read from terminal"),
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// One-line summary of how the login ended
pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Success(result) => {
            let ecr = if result.registry_login { "yes" } else { "no" };
            format!(
                "{} {} - account [{}] - ecr [{}]",
                "✓".green().bold(),
                "Success".green(),
                result.profile.bold(),
                ecr
            )
        }
        Outcome::Failure(message) => format!("{} {}", "✗".red().bold(), message.red()),
    }
}
