//! Output formatting for CLI commands.
//!
//! Every formatter returns the rendered text; the binary decides where it
//! goes. JSON output is stable and meant for scripting.

use std::fmt::Write;

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::config::SpecHasher;
use crate::driver::RunReport;
use crate::model::{
    AttributeType, DiagnosticSeverity, Diagnostics, ResourceState, Schema,
};
use crate::planner::{ActionType, ProviderPlan};
use crate::state::ProviderState;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    format: OutputFormat,
}

#[derive(Tabled)]
struct PlanActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Tabled)]
struct NamespaceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Active Cluster")]
    active_cluster: String,
    #[tabled(rename = "Owner")]
    owner: String,
}

#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Attribute")]
    name: &'static str,
    #[tabled(rename = "Type")]
    attr_type: &'static str,
    #[tabled(rename = "Usage")]
    usage: String,
    #[tabled(rename = "Description")]
    description: &'static str,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Returns the output format.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Formats a plan.
    #[must_use]
    pub fn format_plan(&self, plan: &ProviderPlan) -> String {
        match self.format {
            OutputFormat::Json => to_json(plan),
            OutputFormat::Text => Self::format_plan_text(plan),
        }
    }

    fn format_plan_text(plan: &ProviderPlan) -> String {
        if plan.is_empty() {
            return format!(
                "{} No changes required - namespaces match the manifest.\n",
                "✓".green()
            );
        }

        let mut output = String::new();
        let _ = writeln!(output, "\nExecution Plan");
        let _ = writeln!(
            output,
            "   Manifest hash: {}\n",
            SpecHasher::short_hash(&plan.manifest_hash)
        );

        let changed: Vec<_> = plan.actions.iter().filter(|a| a.has_changes()).collect();
        let rows: Vec<PlanActionRow> = changed
            .iter()
            .enumerate()
            .map(|(i, a)| PlanActionRow {
                index: i + 1,
                action: Self::format_action_type(a.action_type),
                namespace: a.resource_name.clone(),
                reason: truncate(&a.reason, 48),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        for action in changed.iter().filter(|a| !a.changes.is_empty()) {
            let _ = writeln!(output, "\n  ~ {}", action.resource_name.bold());
            for change in &action.changes {
                let _ = writeln!(output, "      {change}");
            }
        }

        let _ = writeln!(
            output,
            "\nPlan: {} to create, {} to update, {} to delete",
            plan.count(ActionType::Create).to_string().green(),
            plan.count(ActionType::Update).to_string().yellow(),
            plan.count(ActionType::Delete).to_string().red()
        );
        output
    }

    /// Formats the result of an apply or destroy run.
    #[must_use]
    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Json => to_json(report),
            OutputFormat::Text => {
                let status = if report.has_errors() {
                    format!("{} Finished with errors", "✗".red())
                } else {
                    format!("{} Finished", "✓".green())
                };

                let mut output = format!("{status}\n\n");
                let _ = writeln!(output, "   Created:   {}", report.count(ActionType::Create));
                let _ = writeln!(output, "   Updated:   {}", report.count(ActionType::Update));
                let _ = writeln!(output, "   Deleted:   {}", report.count(ActionType::Delete));
                let _ = writeln!(output, "   Unchanged: {}", report.count(ActionType::NoOp));

                if !report.diagnostics.is_empty() {
                    output.push('\n');
                    output.push_str(&Self::diagnostics_text(&report.diagnostics));
                }
                output
            }
        }
    }

    /// Formats one namespace with every computed attribute.
    #[must_use]
    pub fn format_namespace(&self, state: &ResourceState) -> String {
        match self.format {
            OutputFormat::Json => to_json(&state.to_attributes()),
            OutputFormat::Text => {
                let mut output = format!("\nNamespace: {}\n\n", state.name.bold());
                let _ = writeln!(output, "   ID:                 {}", state.id);
                let _ = writeln!(output, "   State:              {}", state.state);
                let _ = writeln!(output, "   Description:        {}", state.description);
                let _ = writeln!(output, "   Owner email:        {}", state.owner_email);
                let _ = writeln!(output, "   Active cluster:     {}", state.active_cluster_name);
                let _ = writeln!(output, "   Clusters:           {}", state.clusters.join(", "));
                let _ = writeln!(output, "   History archival:   {}", state.history_archival_state);
                let _ = writeln!(output, "   Visibility archival: {}", state.visibility_archival_state);
                let _ = writeln!(output, "   Global:             {}", state.is_global);
                let _ = writeln!(output, "   Failover version:   {}", state.failover_version);
                if !state.failover_history.is_empty() {
                    let _ = writeln!(output, "   Failover history:");
                    for record in &state.failover_history {
                        let _ = writeln!(output, "     - {record}");
                    }
                }
                output
            }
        }
    }

    /// Formats the list of managed namespaces.
    #[must_use]
    pub fn format_state(&self, state: &ProviderState) -> String {
        match self.format {
            OutputFormat::Json => to_json(state),
            OutputFormat::Text => {
                if state.namespaces.is_empty() {
                    return String::from("No namespaces are managed.\n");
                }

                let rows: Vec<NamespaceRow> = state
                    .namespaces
                    .values()
                    .map(|record| NamespaceRow {
                        name: record.state.name.clone(),
                        id: truncate(&record.state.id, 36),
                        state: record.state.state.to_string(),
                        active_cluster: record.state.active_cluster_name.clone(),
                        owner: record.state.owner_email.clone(),
                    })
                    .collect();

                let mut output = Table::new(rows).to_string();
                let _ = writeln!(
                    output,
                    "\n\n{} namespace(s), last updated {}",
                    state.namespaces.len(),
                    state.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
                );

                if let Some(entry) = state.history.last() {
                    let status = if entry.success { "✓".green() } else { "✗".red() };
                    let _ = writeln!(
                        output,
                        "Last operation: {status} {} at {} ({})",
                        entry.operation,
                        entry.timestamp.format("%Y-%m-%d %H:%M"),
                        entry.namespaces.join(", ")
                    );
                }
                output
            }
        }
    }

    /// Formats declared schemas.
    #[must_use]
    pub fn format_schemas(&self, schemas: &[Schema]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&schemas),
            OutputFormat::Text => {
                let mut output = String::new();
                for schema in schemas {
                    let _ = writeln!(output, "\n{} - {}\n", schema.type_name.bold(), schema.description);
                    let rows: Vec<AttributeRow> = schema
                        .attributes
                        .iter()
                        .map(|a| AttributeRow {
                            name: a.name,
                            attr_type: attribute_type_name(a.attr_type),
                            usage: [
                                (a.flags.required, "required"),
                                (a.flags.optional, "optional"),
                                (a.flags.computed, "computed"),
                            ]
                            .iter()
                            .filter(|(set, _)| *set)
                            .map(|(_, label)| *label)
                            .collect::<Vec<_>>()
                            .join(", "),
                            description: a.description,
                        })
                        .collect();
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }
                output
            }
        }
    }

    /// Formats diagnostics.
    #[must_use]
    pub fn format_diagnostics(&self, diagnostics: &Diagnostics) -> String {
        match self.format {
            OutputFormat::Json => to_json(diagnostics),
            OutputFormat::Text => Self::diagnostics_text(diagnostics),
        }
    }

    fn diagnostics_text(diagnostics: &Diagnostics) -> String {
        let mut output = String::new();
        for diagnostic in diagnostics.as_slice() {
            let marker = match diagnostic.severity {
                DiagnosticSeverity::Error => "Error:".red().bold(),
                DiagnosticSeverity::Warning => "Warning:".yellow().bold(),
            };
            let _ = write!(output, "{marker} {}", diagnostic.summary);
            if let Some(resource) = &diagnostic.resource {
                let _ = write!(output, " [{resource}]");
            }
            if let Some(attribute) = &diagnostic.attribute {
                let _ = write!(output, " ({attribute})");
            }
            output.push('\n');
            if let Some(detail) = &diagnostic.detail {
                let _ = writeln!(output, "   {detail}");
            }
        }
        output
    }

    /// Formats a one-line status message.
    #[must_use]
    pub fn message(&self, success: bool, message: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "status": if success { "success" } else { "error" },
                "message": message,
            })),
            OutputFormat::Text if success => format!("{} {message}", "✓".green()),
            OutputFormat::Text => format!("{} {message}", "✗".red()),
        }
    }

    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Update => "~update".yellow().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
            ActionType::NoOp => "no-op".dimmed().to_string(),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {e}\"}}"))
}

const fn attribute_type_name(attr_type: AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Bool => "bool",
        AttributeType::StringList => "list(string)",
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{namespace_schema, provider_schema, sample_state, Diagnostic, ResourceSpec};
    use crate::planner::Planner;

    fn sample_plan() -> ProviderPlan {
        let planner = Planner::new();
        ProviderPlan {
            manifest_hash: String::from("0123456789abcdef"),
            actions: vec![
                planner
                    .plan(&ResourceSpec::new("orders"), None)
                    .expect("plannable"),
                planner
                    .plan(
                        &ResourceSpec::new("billing").with_description("Billing"),
                        Some(&sample_state("billing")),
                    )
                    .expect("plannable"),
            ],
        }
    }

    #[test]
    fn test_plan_text_lists_changes() {
        let text = OutputFormatter::new(OutputFormat::Text).format_plan(&sample_plan());

        assert!(text.contains("orders"));
        assert!(text.contains("01234567"));
        assert!(text.contains("description"));
        assert!(text.contains("to create"));
    }

    #[test]
    fn test_plan_json_is_machine_readable() {
        let json = OutputFormatter::new(OutputFormat::Json).format_plan(&sample_plan());
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["actions"][0]["action_type"], "create");
        assert_eq!(value["actions"][1]["action_type"], "update");
        assert_eq!(value["actions"][1]["changes"][0]["field"], "description");
    }

    #[test]
    fn test_namespace_json_uses_schema_names() {
        let json = OutputFormatter::new(OutputFormat::Json).format_namespace(&sample_state("billing"));
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["id"], "billing-id");
        assert_eq!(value["is_global_namespace"], false);
    }

    #[test]
    fn test_empty_state() {
        let text = OutputFormatter::new(OutputFormat::Text).format_state(&ProviderState::new());
        assert_eq!(text, "No namespaces are managed.\n");
    }

    #[test]
    fn test_schema_text_marks_usage() {
        let text = OutputFormatter::new(OutputFormat::Text)
            .format_schemas(&[provider_schema(), namespace_schema()]);

        assert!(text.contains("temporal_namespace"));
        assert!(text.contains("optional, computed"));
        assert!(text.contains("list(string)"));
    }

    #[test]
    fn test_diagnostics_text() {
        let diagnostics = Diagnostics::from(vec![
            Diagnostic::error("Missing Temporal Frontend Host")
                .with_attribute("host")
                .with_detail("Set the host value."),
        ]);
        let text = OutputFormatter::new(OutputFormat::Text).format_diagnostics(&diagnostics);

        assert!(text.contains("Missing Temporal Frontend Host"));
        assert!(text.contains("(host)"));
        assert!(text.contains("Set the host value."));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-namespace-name", 10), "a-very-...");
    }
}
