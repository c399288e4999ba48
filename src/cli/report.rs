//! Terminal output for CLI commands.
//!
//! Kept apart from the commands so the metamodel types stay free of
//! presentation concerns.

use std::io::{self, Write};

use colored::Colorize;

use crate::metamodel::validate::ValidationReport;

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

pub fn print_validation(report: &ValidationReport) {
    print_validation_to(report, &mut io::stdout().lock());
}

/// Print a validation report to a custom writer.
pub fn print_validation_to<W: Write>(report: &ValidationReport, writer: &mut W) {
    let format = report
        .format
        .map(|f| format!(" ({})", f.as_str()))
        .unwrap_or_default();

    if report.valid {
        let _ = writeln!(
            writer,
            "{} {}",
            SUCCESS_MARK.green(),
            format!("{} is valid for {}{}", report.value, report.indicator, format).green()
        );
        return;
    }

    let _ = writeln!(
        writer,
        "{} {}",
        FAILURE_MARK.red(),
        format!("{} is invalid for {}{}", report.value, report.indicator, format).red()
    );
    for error in &report.errors {
        let _ = writeln!(writer, "  {} {}", "-".dimmed(), error);
    }
}
