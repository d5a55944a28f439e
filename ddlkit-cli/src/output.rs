//! Terminal rendering for plans, scripts and conflict reports.
//!
//! Everything decorative goes to stdout except errors. Commands whose output
//! is meant to be piped (`diff`, `check --json`) bypass this module.

use ddlkit_migrate::{Conflict, DiffError, JsonStatement, STATEMENT_BREAKPOINT};
use owo_colors::OwoColorize;

/// Command title, underlined.
pub fn header(text: &str) {
    println!();
    println!("{}", text.bold().cyan());
    println!("{}", "─".repeat(text.chars().count()).dimmed());
    println!();
}

/// Bold line introducing a group of items.
pub fn section(text: &str) {
    println!("{}", text.bold());
}

pub fn kv(key: &str, value: &str) {
    println!("  {:<12} {}", format!("{}:", key).dimmed(), value);
}

pub fn success(text: &str) {
    println!("{} {}", "✔".green().bold(), text.green());
}

pub fn info(text: &str) {
    println!("{} {}", "ℹ".blue().bold(), text);
}

pub fn warn(text: &str) {
    println!("{} {}", "⚠".yellow().bold(), text.yellow());
}

/// Error line on stderr.
pub fn error(text: &str) {
    eprintln!("{} {}", "✖".red().bold(), text.red());
}

pub fn bullet(text: &str) {
    println!("  {} {}", "•".dimmed(), text);
}

pub fn newline() {
    println!();
}

pub fn dim(text: &str) {
    println!("{}", text.dimmed());
}

/// Numbered statement summary. Destructive statements are flagged.
pub fn statement(number: usize, statement: &JsonStatement) {
    let index = format!("{:>3}.", number);
    match statement.data_loss_reason() {
        Some(reason) => println!(
            "{} {} {}",
            index.dimmed(),
            statement.summary().red(),
            format!("({})", reason).dimmed()
        ),
        None => println!("{} {}", index.dimmed(), statement.summary()),
    }
}

/// Structural problems found while diffing, one per line on stderr.
pub fn diff_errors(errors: &[DiffError]) {
    for e in errors {
        error(&e.to_string());
    }
}

/// A migration script, with breakpoint markers dimmed.
pub fn sql(script: &str) {
    println!();
    for line in script.lines() {
        if line.trim() == STATEMENT_BREAKPOINT {
            println!("  {}", line.dimmed());
        } else {
            println!("  {}", line.bright_white());
        }
    }
    println!();
}

/// One conflicting branch pair with the first offending statements and all
/// reasons.
pub fn conflict(conflict: &Conflict) {
    section(&format!(
        "{} and {} (branched from {})",
        conflict.branch_a.head_id.yellow(),
        conflict.branch_b.head_id.yellow(),
        conflict.parent_id
    ));
    kv("first", &conflict.branch_a.statement.summary());
    kv("second", &conflict.branch_b.statement.summary());
    for reason in &conflict.reasons {
        bullet(reason);
    }
    newline();
}
