//! Diagnostics collected while a solver runs.
//!
//! Solvers in this workspace report recoverable numerical trouble through
//! their result type rather than through `Err`. This module gives them a common
//! place to attach the details:
//!
//! - Severity levels (Warning, Error)
//! - Categories for grouping issues ("germ", "pade", "precision", ...)
//! - Optional entity references (e.g., "bus 14")
//! - Optional coefficient order at which the issue appeared
//! - Serialization for JSON output
//!
//! # Example
//!
//! ```
//! use gat_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//!
//! diag.add_warning("pade", "singular Padé system, using partial sum");
//! diag.add_warning_with_entity("germ", "zero germ voltage coefficient", "bus 4");
//!
//! assert_eq!(diag.warning_count(), 2);
//! assert_eq!(diag.error_count(), 0);
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but the solve continued
    Warning,
    /// The solve could not use a result (e.g., non-finite coefficients)
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g., "germ", "pade", "precision")
    pub category: String,
    pub message: String,
    /// Coefficient order (or iteration) at which the issue was observed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<usize>,
    /// Optional entity reference (e.g., "bus 14")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            order: None,
            entity: None,
        }
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(order) = self.order {
            write!(f, " at order {}", order)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for one operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    // =========================================================================
    // Warning Methods
    // =========================================================================

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_at_order(&mut self, category: &str, message: &str, order: usize) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_order(order));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    // =========================================================================
    // Error Methods
    // =========================================================================

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn add_error_at_order(&mut self, category: &str, message: &str, order: usize) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_order(order));
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Get issues filtered by category
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Merge another diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        let warnings = self.warning_count();
        let errors = self.error_count();

        match (warnings, errors) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (0, e) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (w, e) => format!(
                "{} warning{}, {} error{}",
                w,
                if w == 1 { "" } else { "s" },
                e,
                if e == 1 { "" } else { "s" }
            ),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning("pade", "fallback");
        diag.add_warning_at_order("germ", "zero coefficient", 0);
        diag.add_error_at_order("precision", "non-finite coefficients", 57);

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_errors());
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add_warning_with_entity("germ", "zero germ voltage coefficient", "bus 3");

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"severity\":\"warning\""));
        assert!(json.contains("\"entity\":\"bus 3\""));
        assert!(!json.contains("\"order\""));
    }

    #[test]
    fn test_diagnostic_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Error, "precision", "NaN in coefficients")
            .with_entity("bus 2")
            .with_order(12);

        assert_eq!(
            issue.to_string(),
            "[error:precision] NaN in coefficients (bus 2) at order 12"
        );
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning("pade", "w1");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_error("precision", "e1");
        diag.add_error("precision", "e2");
        assert_eq!(diag.summary(), "1 warning, 2 errors");
    }

    #[test]
    fn test_issues_by_category_and_merge() {
        let mut a = Diagnostics::new();
        a.add_warning("germ", "g");
        let mut b = Diagnostics::new();
        b.add_warning("pade", "p1");
        b.add_warning("pade", "p2");
        a.merge(b);

        assert_eq!(a.issues.len(), 3);
        assert_eq!(a.issues_by_category("pade").count(), 2);
    }
}
