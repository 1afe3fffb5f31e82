//! Structured diagnostics surfaced to callers.
//!
//! A diagnostic carries a severity, a headline, optional detail, and an
//! optional attribute path or namespace name locating the problem. Callers
//! accumulate them in [`Diagnostics`] and check for errors before going on.

use serde::{Deserialize, Serialize};

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that does not prevent the operation.
    Warning,
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// The namespace the issue concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
            resource: None,
        }
    }

    /// Creates a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            ..Self::error(summary)
        }
    }

    /// Adds detail to this diagnostic.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Sets the attribute path for this diagnostic.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Sets the namespace this diagnostic concerns.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Returns true for error diagnostics.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    /// Appends every diagnostic from another collection.
    pub fn extend(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Returns true if any entry is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Number of error entries.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.0.iter().filter(|d| d.is_error()).count()
    }

    /// Error entries scoped to the given attribute.
    #[must_use]
    pub fn for_attribute(&self, attribute: &str) -> Vec<&Diagnostic> {
        self.0
            .iter()
            .filter(|d| d.attribute.as_deref() == Some(attribute))
            .collect()
    }

    /// All entries.
    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Summaries of the error entries joined into one line.
    #[must_use]
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .filter(|d| d.is_error())
            .map(|d| match &d.attribute {
                Some(attribute) => format!("{} ({attribute})", d.summary),
                None => d.summary.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self(diagnostics)
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            DiagnosticSeverity::Error => "Error",
            DiagnosticSeverity::Warning => "Warning",
        };
        write!(f, "{level}: {}", self.summary)?;
        if let Some(resource) = &self.resource {
            write!(f, "\n  with temporal_namespace.{resource}")?;
        }
        if let Some(attribute) = &self.attribute {
            write!(f, "\n  on attribute \"{attribute}\"")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\n\n  {detail}")?;
        }
        Ok(())
    }
}
