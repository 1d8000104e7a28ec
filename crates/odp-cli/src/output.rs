use console::style;
use serde::Serialize;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Console output that is either styled text or one JSON document
pub struct OutputWriter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputWriter {
    pub fn new(json: bool, quiet: bool) -> Self {
        Self { format: if json { OutputFormat::Json } else { OutputFormat::Human }, quiet }
    }

    pub fn success(&self, message: impl Display) {
        if self.quiet || self.is_json() {
            return;
        }
        println!("{} {}", style("✓").green().bold(), message);
    }

    pub fn info(&self, message: impl Display) {
        if self.quiet || self.is_json() {
            return;
        }
        println!("{} {}", style("ℹ").blue().bold(), message);
    }

    /// Errors are printed in quiet mode too; in JSON mode they only appear in the result
    pub fn error(&self, message: impl Display) {
        if self.is_json() {
            return;
        }
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    pub fn table<T: Tabled>(&self, data: Vec<T>) {
        if self.is_json() {
            return;
        }
        if data.is_empty() {
            println!("{}", style("(no data)").dim());
        } else {
            let mut table = Table::new(data);
            table.with(Style::rounded());
            println!("{}", table);
        }
    }

    /// Print the command result; only JSON mode emits anything
    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if let OutputFormat::Json = self.format {
            let output = serde_json::json!({
                "status": "success",
                "data": data,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Ok(())
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        if self.is_json() {
            return;
        }
        println!("{}: {}", style(key).bold(), value);
    }

    pub fn section(&self, title: impl Display) {
        if self.is_json() {
            return;
        }
        println!("\n{}", style(title).bold().underlined());
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}
