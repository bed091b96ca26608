// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.

use std::fmt;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct CliError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for CliError {}

/// Builders for the failures users hit most
impl CliError {
    pub fn not_found(kind: &str, namespace: &str, name: &str) -> Self {
        CliError::new(format!("{} '{}/{}' not found", kind, namespace, name))
            .with_context(format!("Looked in namespace '{}'", namespace))
            .with_suggestion(format!("List existing objects: strata {} list", kind))
            .with_suggestion("Select another namespace with --namespace")
    }

    pub fn already_exists(kind: &str, namespace: &str, name: &str) -> Self {
        CliError::new(format!("{} '{}/{}' already exists", kind, namespace, name))
            .with_suggestion(format!("Inspect it: strata {} show {}", kind, name))
    }

    pub fn action_mismatch(run: &str, expected: &str, actual: &str) -> Self {
        CliError::new(format!(
            "run '{}' is a {} run, cannot report {}",
            run, actual, expected
        ))
        .with_suggestion(format!("Report it with: strata report {} {}", actual, run))
    }
}
