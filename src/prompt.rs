use colored::Colorize;
use inquire::{Select, Text};

use crate::error::AppError;

/// Source of operator answers
pub trait Prompter {
    /// Asks for a free-text answer
    fn text(&mut self, message: &str) -> Result<String, AppError>;
    /// Asks the operator to pick one of `options`
    fn select(&mut self, message: &str, options: &[&str]) -> Result<String, AppError>;
}

/// Prompter backed by the terminal
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn text(&mut self, message: &str) -> Result<String, AppError> {
        Ok(Text::new(&format!("{}", message.blue())).prompt()?)
    }

    fn select(&mut self, message: &str, options: &[&str]) -> Result<String, AppError> {
        let selected: &str = Select::new(&format!("{}", message.blue()), options.to_vec()).prompt()?;
        Ok(selected.to_string())
    }
}

/// Prompts until `parse` accepts the answer
///
/// # Arguments
/// * `prompter` - Where answers come from
/// * `message` - Prompt shown to the operator
/// * `hint` - Printed after every rejected answer
/// * `parse` - Maps an answer to a value, `None` to reprompt
pub fn prompt_until_valid<T, F>(
    prompter: &mut dyn Prompter,
    message: &str,
    hint: &str,
    parse: F,
) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<T>,
{
    loop {
        let input: String = prompter.text(message)?;
        match parse(&input) {
            Some(value) => break Ok(value),
            None => println!("{}", hint.red()),
        }
    }
}

/// Normalizes an answer for case-insensitive matching
pub fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}
