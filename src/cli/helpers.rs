//! Shared helper functions for CLI commands

use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::{self, Write};

use crate::core::identity::RecipeId;

/// Length of the id prefix shown in lists
pub const SHORT_ID_LEN: usize = 8;

/// Format a RecipeId for display
///
/// Canonical UUIDs are cut to their first eight characters, which is
/// enough to resolve them again. Other ids are truncated like text.
pub fn format_short_id(id: &RecipeId) -> String {
    if id.is_uuid() {
        id.as_str().chars().take(SHORT_ID_LEN).collect()
    } else {
        format_short_id_str(id.as_str())
    }
}

/// Format a string ID for display, truncating if too long
pub fn format_short_id_str(id: &str) -> String {
    truncate_str(id, 16)
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Ask a yes/no question on stdin; anything but "y" is a no
pub fn confirm(question: &str) -> Result<bool> {
    println!("{}", question);
    print!("Continue? [y/N] ");
    io::stdout().flush().into_diagnostic()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input).into_diagnostic()?;
    let yes = input.trim().eq_ignore_ascii_case("y");
    if !yes {
        println!("{}", style("Aborted.").dim());
    }
    Ok(yes)
}
