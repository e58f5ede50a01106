//! Output formatting utilities

use crate::error::Result;
use console::style;
use serde::Serialize;

/// Characters of a token left visible when masking
const VISIBLE_TOKEN_CHARS: usize = 4;

/// Output data as JSON
pub fn json_output<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;
    println!("{json}");
    Ok(())
}

/// Print a success message with green checkmark
pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an informational message with blue info icon
pub fn print_info(message: &str) {
    println!("{} {}", style("ℹ").blue(), message);
}

/// Print a labelled value
pub fn print_field(label: &str, value: &str) {
    println!("  {:<12} {}", style(label).dim(), value);
}

/// Mask all but the last few characters of a token
pub fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= VISIBLE_TOKEN_CHARS * 2 {
        return "*".repeat(count);
    }

    let tail: String = token.chars().skip(count - VISIBLE_TOKEN_CHARS).collect();
    format!("{}{}", "*".repeat(count - VISIBLE_TOKEN_CHARS), tail)
}

/// Join scopes for display, `-` when there are none
pub fn format_scopes(scopes: &[String]) -> String {
    if scopes.is_empty() {
        "-".to_string()
    } else {
        scopes.join(" ")
    }
}
