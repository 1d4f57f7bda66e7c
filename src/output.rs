use colored::Colorize;
use serde::Serialize;

use crate::rules::{RiskLevel, ValidationResult};

/// Output format for results
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true
        }
    }
}

/// One validated statement for serialization
#[derive(Debug, Serialize)]
pub struct StatementReport<'a> {
    pub sql:    &'a str,
    pub result: &'a ValidationResult
}

/// Format a validation report based on output options
pub fn format_report(reports: &[StatementReport<'_>], opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(reports).unwrap_or_default(),
        OutputFormat::Text => format_text_report(reports, opts)
    }
}

fn format_text_report(reports: &[StatementReport<'_>], opts: &OutputOptions) -> String {
    let mut output = String::new();
    let mut total = 0usize;
    for (i, report) in reports.iter().enumerate() {
        let header = format!(
            "Statement #{} [{}]:",
            i + 1,
            report.result.risk_label()
        );
        if opts.colored {
            let painted = match report.result.risk() {
                Some(RiskLevel::Critical) | Some(RiskLevel::High) => header.red().bold(),
                Some(RiskLevel::Medium) | Some(RiskLevel::Low) => header.yellow().bold(),
                Some(RiskLevel::Info) => header.cyan().bold(),
                None => header.green().bold()
            };
            output.push_str(&painted.to_string());
        } else {
            output.push_str(&header);
        }
        output.push('\n');
        output.push_str(&format!("{}\n", report.sql));
        for violation in report.result.violations() {
            total += 1;
            let line = format!(
                "  [{}] {}: {}",
                violation.risk, violation.rule_id, violation.message
            );
            if opts.colored {
                let painted = match violation.risk {
                    RiskLevel::Critical | RiskLevel::High => line.red(),
                    RiskLevel::Medium | RiskLevel::Low => line.yellow(),
                    RiskLevel::Info => line.cyan()
                };
                output.push_str(&painted.to_string());
            } else {
                output.push_str(&line);
            }
            output.push('\n');
            if let Some(suggestion) = &violation.suggestion {
                output.push_str(&format!("      suggestion: {}\n", suggestion));
            }
        }
        output.push('\n');
    }
    output.push_str(&format!(
        "{} statement(s) checked, {} violation(s) found\n",
        reports.len(),
        total
    ));
    output
}
