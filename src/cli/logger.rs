// src/cli/logger.rs
//! Progress and result output with three verbosity levels

use crate::verification::{Verdict, VerificationReport};
use colored::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Only errors and the final verdict
    Quiet,
    /// Default level - stage progress and results
    Normal,
    /// Stage statistics, models and saved files
    Verbose,
}

impl LogLevel {
    pub fn should_show(self, target: LogLevel) -> bool {
        match (self, target) {
            (LogLevel::Quiet, LogLevel::Quiet) => true,
            (LogLevel::Normal, LogLevel::Quiet | LogLevel::Normal) => true,
            (LogLevel::Verbose, _) => true,
            _ => false,
        }
    }
}

pub struct Logger {
    level: LogLevel,
}

impl Logger {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        let level = if quiet {
            LogLevel::Quiet
        } else if verbose {
            LogLevel::Verbose
        } else {
            LogLevel::Normal
        };

        Self { level }
    }

    pub fn stage_start(&self, stage_num: usize, total: usize, name: &str) {
        if self.level.should_show(LogLevel::Normal) {
            print!(
                "{} {}: ",
                "Stage".bright_blue().bold(),
                format!("{}/{}", stage_num, total).bright_blue().bold()
            );
            print!("({}): ", name.bright_blue());
        }
    }

    pub fn stage_success(&self) {
        if self.level.should_show(LogLevel::Normal) {
            println!("{}", "OK".green().bold());
        }
    }

    pub fn stage_error(&self) {
        if self.level.should_show(LogLevel::Normal) {
            println!("{}", "ERROR".red().bold());
        }
    }

    pub fn stage_skipped(&self, reason: &str) {
        if self.level.should_show(LogLevel::Normal) {
            println!("{} ({})", "OK".green().bold(), reason.italic());
        }
    }

    pub fn file_output(&self, path: &std::path::Path) {
        if self.level.should_show(LogLevel::Normal) {
            println!(
                "{} {}",
                "Writing".blue().bold(),
                path.display().to_string().bright_blue().underline()
            );
        }
    }

    pub fn warn(&self, message: &str) {
        if self.level.should_show(LogLevel::Normal) {
            println!("{} {}", "Warning:".yellow().bold(), message.bright_yellow());
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "ERROR:".red().bold(), message.bright_red());
    }

    pub fn abort_pipeline(&self) {
        if self.level.should_show(LogLevel::Normal) {
            println!("Aborting pipeline due to errors.");
        }
    }

    pub fn detail(&self, message: &str) {
        if self.level.should_show(LogLevel::Verbose) {
            println!("  {}", message);
        }
    }

    pub fn detail_item(&self, label: &str, value: &str) {
        if self.level.should_show(LogLevel::Verbose) {
            println!("  {}: {}", label.bright_white(), value);
        }
    }

    pub fn result_summary(&self, title: &str) {
        if self.level.should_show(LogLevel::Normal) {
            println!("\n{}", title.bright_white().bold());
        }
    }

    pub fn result_item(&self, label: &str, value: &str, success: Option<bool>) {
        if self.level.should_show(LogLevel::Normal) {
            let formatted_value = match success {
                Some(true) => value.green(),
                Some(false) => value.red(),
                None => value.normal(),
            };
            println!(" - {}: {}", label, formatted_value);
        }
    }

    /// Verdict, diagnostic and example bindings of a solved query.
    pub fn verification_result(&self, report: &VerificationReport) {
        if self.level == LogLevel::Quiet {
            println!("{}", quiet_line(report.verdict));
            return;
        }

        self.result_summary("Verification Results");
        self.result_item(
            "Verdict",
            &report.verdict.to_string(),
            Some(report.verdict.is_positive()),
        );
        self.result_item("Logic", report.script.logic, None);
        self.result_item(
            "Assertions",
            &report.script.assertion_count().to_string(),
            None,
        );
        if let Some(diagnostic) = &report.diagnostic {
            self.result_item("Reason", &diagnostic.to_string(), Some(false));
        }

        if let Some(model) = &report.model {
            if model.is_empty() {
                return;
            }
            self.result_summary("Example bindings");
            let shown = if self.level == LogLevel::Verbose { model.len() } else { 10 };
            for (name, value) in model.iter().take(shown) {
                println!("   {} = {}", name.bright_white(), value);
            }
            if model.len() > shown {
                println!("   ... {} more (use --verbose to list all)", model.len() - shown);
            }
        }
    }

    pub fn get_level(&self) -> LogLevel {
        self.level
    }
}

fn quiet_line(verdict: Verdict) -> String {
    match verdict {
        Verdict::Verified | Verdict::NotVerified => format!("Verification: {}", verdict),
        Verdict::Equivalent | Verdict::NotEquivalent => format!("Equivalence: {}", verdict),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_level_only_shows_quiet_messages() {
        assert!(LogLevel::Quiet.should_show(LogLevel::Quiet));
        assert!(!LogLevel::Quiet.should_show(LogLevel::Normal));
        assert!(LogLevel::Normal.should_show(LogLevel::Quiet));
        assert!(!LogLevel::Normal.should_show(LogLevel::Verbose));
        assert!(LogLevel::Verbose.should_show(LogLevel::Normal));
    }

    #[test]
    fn quiet_flag_wins_over_verbose() {
        assert_eq!(Logger::new(true, true).get_level(), LogLevel::Quiet);
        assert_eq!(Logger::new(true, false).get_level(), LogLevel::Verbose);
    }

    #[test]
    fn quiet_line_names_the_query_kind() {
        assert_eq!(quiet_line(Verdict::NotVerified), "Verification: Not verified");
        assert_eq!(quiet_line(Verdict::Equivalent), "Equivalence: Equivalent");
    }
}
