//! Human-readable formatter for command results.

use crate::commands::{CheckReport, DispatchOutcome, UrlOutput};
use colored::*;
use serde_json::Value;
use std::fmt::Write;
use switchboard_core::value::display_value;

/// Types that render as terminal text.
pub trait HumanFormat {
    fn render_human(&self) -> String;

    fn print_human(&self) {
        print!("{}", self.render_human());
    }
}

impl HumanFormat for DispatchOutcome {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} {} {}",
            self.method.bold(),
            self.path,
            format!("(mode: {})", self.mode).bright_black()
        );
        let _ = writeln!(out);

        let _ = writeln!(out, "{}", "Rules attempted:".bold());
        for attempt in &self.attempts {
            let marker = if attempt.matched { "✓".green() } else { "✗".red() };
            let _ = writeln!(out, "  {} {}", marker, attempt.rule);
        }

        let _ = writeln!(out);
        if !self.found {
            let _ = writeln!(out, "{}", "No rule matched".yellow().bold());
            return out;
        }

        let _ = writeln!(out, "{} {}", "Matched:".bold(), self.matched.join(", ").green());

        if !self.backreferences.is_empty() {
            let refs: Vec<String> = self.backreferences.iter().map(render_value).collect();
            let _ = writeln!(out, "{} {}", "Backreferences:".bold(), refs.join(", "));
        }

        if !self.results.is_empty() {
            let _ = writeln!(out, "{}", "Results:".bold());
            for (name, value) in &self.results {
                let _ = writeln!(out, "  {} = {}", name.cyan(), render_value(value));
            }
        }

        if !self.handlers.is_empty() {
            let _ = writeln!(out, "{}", "Handlers:".bold());
            for call in &self.handlers {
                let refs: Vec<String> = call.backreferences.iter().map(render_value).collect();
                let _ = writeln!(out, "  {}({})", call.handler.cyan(), refs.join(", "));
            }
        }

        out
    }
}

impl HumanFormat for CheckReport {
    fn render_human(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "{}", "Rule tables:".bold());
        for table in &self.tables {
            let name = table.name.as_deref().unwrap_or("(unnamed)");
            let _ = writeln!(
                out,
                "  {} {} {}",
                name.cyan(),
                table.path.display(),
                format!("({} rules)", table.rules).bright_black()
            );
            if let Some(description) = &table.description {
                let _ = writeln!(out, "    {}", description.bright_black());
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{} {}", "Rules in dispatch order".bold(), format!("(mode: {}):", self.mode).bright_black());
        for (position, rule) in self.rules.iter().enumerate() {
            let name = rule["name"].as_str().unwrap_or_default();
            let priority = rule["priority"].as_i64().unwrap_or_default();
            let _ = writeln!(out, "  {:>3}. {} {}", position + 1, name.green(), format!("[priority {priority}]").bright_black());

            for condition in rule["conditions"].as_array().into_iter().flatten() {
                let _ = writeln!(out, "       if   {}", render_value(condition));
            }
            for action in rule["actions"].as_array().into_iter().flatten() {
                let _ = writeln!(out, "       then {}", render_value(action));
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{} {} rule(s) compiled", "✓".green(), self.rules.len());
        out
    }
}

impl HumanFormat for UrlOutput {
    fn render_human(&self) -> String {
        format!("{}\n", self.url)
    }
}

/// Scalars print bare, everything else as compact JSON.
fn render_value(value: &Value) -> String {
    display_value(value).unwrap_or_else(|| value.to_string())
}
