//! Inspect command - Show what extraction finds in one source file

use crate::output::{Output, OutputFormat, TableDisplay};
use anyhow::{Context, Result};
use calltree_core::parser;
use calltree_core::{CallGraph, CallableUnit, NameMap, UnitKind};
use colored::Colorize;
use serde::Serialize;

/// One extracted unit.
#[derive(Debug, Serialize)]
pub struct UnitSummary {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub params: Vec<String>,
    pub start_line: u32,
    pub end_line: u32,
    /// Distinct known units this one calls.
    pub calls: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marked_body: Option<String>,
}

impl UnitSummary {
    fn from_unit(unit: &CallableUnit, graph: &CallGraph, bodies: bool) -> Self {
        let calls = unit
            .name
            .as_deref()
            .map(|name| graph.callees(name).count())
            .unwrap_or(0);
        Self {
            name: unit.name.clone(),
            kind: unit.kind,
            params: unit.params.clone(),
            start_line: unit.start_line,
            end_line: unit.end_line,
            calls,
            marked_body: bodies.then(|| unit.marked_body.clone()),
        }
    }
}

/// Extraction report for one file.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub file: String,
    pub units: Vec<UnitSummary>,
    pub call_graph: CallGraph,
    pub call_counts: NameMap<u32>,
}

impl TableDisplay for InspectReport {
    fn to_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{} {} ({} units, {} call edges)\n",
            "Inspected".green().bold(),
            self.file.bold(),
            self.units.len(),
            self.call_graph.edge_count()
        ));

        out.push_str(&format!("\n{}\n", "Units".cyan().bold()));
        for unit in &self.units {
            let name = unit.name.as_deref().unwrap_or("<lambda>");
            out.push_str(&format!(
                "  {:<7} {}({})  {}\n",
                unit.kind.as_str().dimmed(),
                name.bold(),
                unit.params.join(", "),
                format!("L{}-{}", unit.start_line, unit.end_line).dimmed()
            ));
            if let Some(body) = &unit.marked_body {
                out.push_str(&format!("          {}\n", body));
            }
        }

        if !self.call_graph.is_empty() {
            out.push_str(&format!("\n{}\n", "Calls".cyan().bold()));
            for caller in self.call_graph.callers() {
                for (callee, count) in self.call_graph.callees(caller) {
                    out.push_str(&format!("  {} -> {} x{}\n", caller, callee, count));
                }
            }
        }
        out.trim_end().to_string()
    }
}

/// Extract `file` and summarise the result.
pub fn inspect_file(file: &str, bodies: bool) -> Result<InspectReport> {
    let text = std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;
    let extraction =
        parser::extract(&text).with_context(|| format!("Failed to extract {}", file))?;

    let units = extraction
        .units
        .iter()
        .map(|unit| UnitSummary::from_unit(unit, &extraction.call_graph, bodies))
        .collect();

    Ok(InspectReport {
        file: file.to_string(),
        units,
        call_graph: extraction.call_graph,
        call_counts: extraction.call_counts,
    })
}

/// Run the inspect command.
pub fn run(file: &str, bodies: bool, format: OutputFormat) -> Result<()> {
    let report = inspect_file(file, bodies)?;
    Output::new(report, format).render()
}
