use crate::commands::read_document;
use crate::config::Config;
use anyhow::Result;
use clap::{Args, ValueEnum};
use colored::Colorize;
use screenkit_editor::Editor;
use screenkit_validator::{Finding, Severity, ValidationReport};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Screen document (JSON) to validate
    pub input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Validate one document; returns whether it could be published
pub fn validate(args: ValidateArgs, config: &Config) -> Result<bool> {
    let document = read_document(&args.input)?;
    let editor = Editor::with_document(config.editor_config(), document);
    let report = editor.findings();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => print_text(&args.input, report),
    }

    tracing::debug!(
        errors = report.error_count(),
        warnings = report.warning_count(),
        "validated {}",
        args.input.display()
    );
    Ok(editor.can_publish())
}

fn print_text(path: &std::path::Path, report: &ValidationReport) {
    println!("🔍 {} {}", "Validating".green().bold(), path.display());
    println!();

    for finding in &report.findings {
        println!("{}", format_finding(finding));
        if let Some(suggestion) = &finding.suggestion {
            println!("      {} {}", "help:".cyan(), suggestion);
        }
    }
    if !report.is_empty() {
        println!();
    }

    let errors = report.error_count();
    let warnings = report.warning_count();
    if errors > 0 {
        println!("   {} {}", "Errors:".red(), errors);
    }
    if warnings > 0 {
        println!("   {} {}", "Warnings:".yellow(), warnings);
    }
    if report.is_empty() {
        println!("   {} No issues found!", "✓".green());
    }

    if report.can_publish() {
        println!("✨ {} Ready to publish", "Done".green().bold());
    } else {
        println!("✨ {} Publishing is blocked", "Done".red().bold());
    }
}

fn format_finding(finding: &Finding) -> String {
    let level = match finding.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
    };
    format!(
        "  {}[{}] {} {}",
        level,
        finding.kind,
        finding.path.dimmed(),
        finding.message
    )
}
