//! Terminal rendering for the cluster commands.
//!
//! Handlers print through this module so the global `--json`, `-q` and `-v`
//! flags are honoured in one place. In JSON mode the human printers stay
//! silent and each handler emits a single [`document`]; errors still reach
//! stderr as a JSON object.

use std::fmt::Display;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde_json::json;

use super::command::ColorChoice;
use crate::domain::{short_id, MemberInfo};

/// Global flags that shape what handlers print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    pub verbose: u8,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
        }
    }

    /// Chatty lines (progress, fields, tables) only print in human mode
    /// without `-q`.
    const fn chatty(self) -> bool {
        !self.json && !self.quiet
    }
}

static CONFIG: RwLock<OutputConfig> = RwLock::new(OutputConfig::new(false, false, 0));

fn current() -> OutputConfig {
    *CONFIG.read().unwrap_or_else(PoisonError::into_inner)
}

/// Install the flags parsed from the command line.
pub fn configure(config: OutputConfig) {
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = config;
}

/// Force colors on or off, or leave detection to the terminal.
pub fn apply_color(choice: &ColorChoice) {
    match choice {
        ColorChoice::Auto => owo_colors::unset_override(),
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
    }
}

#[must_use]
pub fn is_json() -> bool {
    current().json
}

/// `-v` swaps short container ids for full ones.
#[must_use]
pub fn full_ids() -> bool {
    current().verbose > 0
}

fn container_label(id: &str) -> &str {
    if full_ids() {
        id
    } else {
        short_id(id)
    }
}

// -- lines --------------------------------------------------------------------

/// `minicluster <version>` followed by a blank line.
pub fn banner() {
    if current().chatty() {
        println!("{} {}", "minicluster".bold(), env!("CARGO_PKG_VERSION").dimmed());
        println!();
    }
}

pub fn field(label: &str, value: impl Display) {
    if current().chatty() {
        println!("  {:<10} {value}", label.dimmed());
    }
}

pub fn success(message: &str) {
    if current().chatty() {
        println!("  {} {message}", "✓".green());
    }
}

/// Warnings print even with `-q`.
pub fn warning(message: &str) {
    if !current().json {
        println!("  {} {message}", "⚠".yellow());
    }
}

pub fn hint(message: &str) {
    if current().chatty() {
        println!("  {}: {}", "hint".cyan(), message.dimmed());
    }
}

/// Errors always print, to stderr.
pub fn error(message: &str) {
    if current().json {
        eprintln!("{}", json!({ "error": message }));
    } else {
        eprintln!("  {} {message}", "×".red());
    }
}

/// The single result document of a command in JSON mode.
pub fn document(value: &serde_json::Value) {
    println!("{value}");
}

/// Cluster id as shown in headings and fields.
#[must_use]
pub fn cluster_id(id: &str) -> String {
    if current().json {
        id.to_string()
    } else {
        id.cyan().to_string()
    }
}

// -- progress -----------------------------------------------------------------

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// A spinner for a long-running cluster operation. Hidden unless chatty.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn start(message: &str) -> Self {
        let bar = if current().chatty() {
            let bar = ProgressBar::new_spinner();
            let style = ProgressStyle::default_spinner().tick_strings(FRAMES);
            bar.set_style(style.clone().template("  {spinner:.cyan} {msg}").unwrap_or(style));
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(message.to_string());
        Self { bar }
    }

    pub fn succeed(self, message: &str) {
        self.bar.finish_with_message(format!("{} {message}", "✓".green()));
    }

    pub fn fail(self, message: &str) {
        self.bar.finish_with_message(format!("{} {message}", "×".red()));
    }

    /// Remove the spinner line, leaving the output to the caller.
    pub fn clear(self) {
        self.bar.finish_and_clear();
    }
}

// -- member table -------------------------------------------------------------

const MEMBER_COLUMNS: [&str; 5] = ["ROLE", "NAME", "CONTAINER", "ADDRESS", "STATE"];

fn member_cells(member: &MemberInfo) -> [String; 5] {
    [
        member.role.to_string(),
        member.name.clone(),
        container_label(&member.container_id).to_string(),
        member.ip_address.clone().unwrap_or_else(|| "-".into()),
        if member.running { "running" } else { "stopped" }.to_string(),
    ]
}

fn column_widths(rows: &[[String; 5]]) -> [usize; 5] {
    let mut widths = MEMBER_COLUMNS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

/// Table of cluster members: role, name, container, address and state.
pub fn members(members: &[MemberInfo]) {
    if !current().chatty() {
        return;
    }

    let rows: Vec<[String; 5]> = members.iter().map(member_cells).collect();
    let widths = column_widths(&rows);

    println!();
    println!("{}", "Members".bold());
    let heading: Vec<String> = MEMBER_COLUMNS
        .iter()
        .zip(widths)
        .map(|(name, width)| format!("{name:<width$}"))
        .collect();
    println!("  {}", heading.join(" ").trim_end().dimmed());
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("  {}", rule.join(" ").dimmed());

    for (row, member) in rows.iter().zip(members) {
        let [role, name, container, address, state] = row;
        let [w_role, w_name, w_container, w_address, _] = widths;
        let state = if member.running {
            state.green().to_string()
        } else {
            state.red().to_string()
        };
        println!(
            "  {role:<w_role$} {name:<w_name$} {} {address:<w_address$} {state}",
            format!("{container:<w_container$}").dimmed(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    fn member(name: &str, running: bool) -> MemberInfo {
        MemberInfo {
            role: Role::Worker,
            container_id: "0123456789abcdef0123".into(),
            name: name.into(),
            ip_address: None,
            running,
        }
    }

    #[test]
    fn quiet_and_json_silence_chatty_lines() {
        assert!(OutputConfig::default().chatty());
        assert!(!OutputConfig::new(false, true, 0).chatty());
        assert!(!OutputConfig::new(true, false, 2).chatty());
    }

    #[test]
    fn member_rows_fill_missing_address_and_state() {
        let cells = member_cells(&member("mc-worker-0", false));

        assert_eq!(cells[0], "worker");
        assert_eq!(cells[3], "-");
        assert_eq!(cells[4], "stopped");
    }

    #[test]
    fn column_widths_fit_headers_and_cells() {
        let rows = vec![member_cells(&member("a-rather-long-worker-name", true))];

        let widths = column_widths(&rows);

        assert_eq!(widths[0], "ROLE".len().max("worker".len()));
        assert_eq!(widths[1], "a-rather-long-worker-name".len());
        assert_eq!(widths[4], "running".len().max("STATE".len()));
    }
}
