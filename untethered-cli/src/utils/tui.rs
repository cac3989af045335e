use anyhow::{Context, Result};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};

pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["-", "\\", "|", "/"])
        .template("{msg} {spinner}")
    {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// Prompt for a line of text, falling back to `current` on empty input.
pub fn prompt_text(label: &str, current: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(label)
        .default(current.to_string())
        .show_default(!current.is_empty())
        .allow_empty(true)
        .interact_text()?;
    Ok(value.trim().to_string())
}

/// Prompt for an optional value; empty input means none.
pub fn prompt_optional(label: &str) -> Result<Option<String>> {
    let value = prompt_text(&format!("{label} (skip)"), "")?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

/// Prompt the user for password input (hidden).
pub fn prompt_password(label: &str) -> Result<String> {
    let prompt = format!("{}: ", label);
    rpassword::prompt_password(&prompt).context("Failed to read password")
}
