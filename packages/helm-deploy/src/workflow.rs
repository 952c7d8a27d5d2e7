//! Workflow commands
//!
//! Annotations understood by the GitHub Actions runner when printed to
//! stdout. They surface failures and warnings on the run summary page.

/// Escape a message so the runner keeps it on one annotation
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

pub fn error_command(message: &str) -> String {
    format!("::error::{}", escape_data(message))
}

pub fn warning_command(message: &str) -> String {
    format!("::warning::{}", escape_data(message))
}

/// Mark the step as failed with `message`
pub fn error(message: &str) {
    println!("{}", error_command(message));
}

/// Attach a warning to the step
pub fn warning(message: &str) {
    println!("{}", warning_command(message));
}
