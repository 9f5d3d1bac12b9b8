//! Entity graph built from stored or consolidated models.
//!
//! Nodes are unioned by entity name across all inputs. Join relationships are
//! drawn solid and lineage (source to target) edges dashed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use serde::Serialize;

use crate::error::ReportError;
use crate::types::model::{ConsolidatedModel, EntityRole};
use crate::types::record::ExtractionRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Relationship,
    Lineage,
}

impl EdgeKind {
    fn dot_style(&self) -> &'static str {
        match self {
            Self::Relationship => "solid",
            Self::Lineage => "dashed",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Self::Relationship => "#4a6fa5",
            Self::Lineage => "#c0392b",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    /// First role label seen for this entity
    pub role: Option<String>,
    /// Files the entity appeared in
    pub files: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataModelGraph {
    nodes: BTreeMap<String, GraphNode>,
    edges: BTreeSet<GraphEdge>,
}

impl DataModelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of every `NEW` record's entities, joins and lineage.
    pub fn from_records(records: &[ExtractionRecord]) -> Self {
        let mut graph = Self::new();

        for record in records {
            let output = record.output();
            let Some(model) = output.model() else {
                continue;
            };
            let file = Some(record.sql_file_name.as_str());

            for entity in &model.entities {
                graph.add_node(&entity.entity_name, entity.entity_role.as_deref(), file);
            }
            for rel in &model.relationships {
                graph.add_edge(
                    &rel.left_entity,
                    &rel.right_entity,
                    EdgeKind::Relationship,
                    rel.join_type.as_deref(),
                    file,
                );
            }
            for flow in &model.data_flow {
                for source in &flow.source_entities {
                    graph.add_edge(
                        source,
                        &flow.target_entity,
                        EdgeKind::Lineage,
                        flow.operation_type.as_deref(),
                        file,
                    );
                }
            }
        }

        graph
    }

    /// Graph of consolidated models; same-named entities merge into one node.
    pub fn from_consolidated(models: &[ConsolidatedModel]) -> Self {
        let mut graph = Self::new();

        for model in models {
            for entity in &model.entities {
                graph.add_node(&entity.name, None, None);
            }
            for rel in &model.relationships {
                graph.add_edge(
                    &rel.from,
                    &rel.to,
                    EdgeKind::Relationship,
                    rel.kind.as_deref(),
                    None,
                );
            }
        }

        graph
    }

    fn add_node(&mut self, name: &str, role: Option<&str>, file: Option<&str>) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }

        let node = self
            .nodes
            .entry(name.to_string())
            .or_insert_with(|| GraphNode {
                id: name.to_string(),
                role: None,
                files: BTreeSet::new(),
            });
        if node.role.is_none() {
            node.role = role.map(str::to_string);
        }
        if let Some(file) = file {
            node.files.insert(file.to_string());
        }
    }

    fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        kind: EdgeKind,
        label: Option<&str>,
        file: Option<&str>,
    ) {
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return;
        }

        self.add_node(from, None, file);
        self.add_node(to, None, file);
        self.edges.insert(GraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            label: label.map(str::to_string),
        });
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Graphviz DOT rendering.
    pub fn to_dot(&self) -> String {
        let mut dot = String::new();

        writeln!(dot, "digraph DataModel {{").unwrap();
        writeln!(dot, "  rankdir=LR;").unwrap();
        writeln!(dot, "  node [fontname=\"Arial\" fontsize=10 shape=box style=\"rounded,filled\"];").unwrap();
        writeln!(dot, "  edge [fontname=\"Arial\" fontsize=9];").unwrap();
        writeln!(dot).unwrap();

        for node in self.nodes.values() {
            writeln!(
                dot,
                "  \"{}\" [label=\"{}\" fillcolor=\"{}\"];",
                escape_dot(&node.id),
                escape_dot(&node.id),
                node_color(node.role.as_deref())
            )
            .unwrap();
        }

        writeln!(dot).unwrap();

        for edge in &self.edges {
            let mut attrs = vec![
                format!("style=\"{}\"", edge.kind.dot_style()),
                format!("color=\"{}\"", edge.kind.color()),
            ];
            if let Some(label) = &edge.label {
                attrs.push(format!("label=\"{}\"", escape_dot(label)));
            }

            writeln!(
                dot,
                "  \"{}\" -> \"{}\" [{}];",
                escape_dot(&edge.from),
                escape_dot(&edge.to),
                attrs.join(" ")
            )
            .unwrap();
        }

        writeln!(dot, "}}").unwrap();
        dot
    }

    /// Node/edge payload in the shape vis-network consumes.
    pub fn to_vis_json(&self) -> serde_json::Value {
        let nodes: Vec<_> = self
            .nodes
            .values()
            .map(|node| {
                serde_json::json!({
                    "id": node.id,
                    "label": node.id,
                    "group": node.role.as_deref().map(role_group).unwrap_or("entity"),
                    "title": node.files.iter().cloned().collect::<Vec<_>>().join(", "),
                    "color": node_color(node.role.as_deref()),
                })
            })
            .collect();

        let edges: Vec<_> = self
            .edges
            .iter()
            .map(|edge| {
                serde_json::json!({
                    "from": edge.from,
                    "to": edge.to,
                    "label": edge.label,
                    "kind": edge.kind,
                    "dashes": edge.kind == EdgeKind::Lineage,
                    "arrows": "to",
                    "color": {"color": edge.kind.color()},
                })
            })
            .collect();

        serde_json::json!({ "nodes": nodes, "edges": edges })
    }

    /// Standalone interactive HTML page.
    pub fn to_html(&self, title: &str) -> Result<String, ReportError> {
        let data = serde_json::to_string(&self.to_vis_json())?
            // keep the payload from closing the script tag
            .replace("</", "<\\/");

        Ok(fill_template(HTML_TEMPLATE, &escape_html(title), &data))
    }
}

fn role_group(role: &str) -> &'static str {
    match EntityRole::classify(role) {
        EntityRole::Source => "source",
        EntityRole::Target => "target",
        EntityRole::Work => "work",
        EntityRole::Lookup => "lookup",
        EntityRole::Other(_) => "entity",
    }
}

fn node_color(role: Option<&str>) -> &'static str {
    match role.map(role_group) {
        Some("source") => "#d6eaf8",
        Some("target") => "#d5f5e3",
        Some("work") => "#eaeded",
        Some("lookup") => "#fcf3cf",
        _ => "#fdebd0",
    }
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Fill `{title}` and `{data}` in one pass; inserted text is never rescanned.
fn fill_template(template: &str, title: &str, data: &str) -> String {
    let mut out = String::with_capacity(template.len() + data.len());
    let mut rest = template;

    loop {
        let next = [("{title}", title), ("{data}", data)]
            .into_iter()
            .filter_map(|(placeholder, value)| {
                rest.find(placeholder).map(|at| (at, placeholder, value))
            })
            .min_by_key(|(at, _, _)| *at);

        let Some((at, placeholder, value)) = next else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..at]);
        out.push_str(value);
        rest = &rest[at + placeholder.len()..];
    }
}

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <script src="https://unpkg.com/vis-network/standalone/umd/vis-network.min.js"></script>
  <style>
    body { margin: 0; font-family: Arial, sans-serif; }
    h1 { font-size: 16px; padding: 8px 12px; margin: 0; }
    #graph { width: 100vw; height: calc(100vh - 40px); }
  </style>
</head>
<body>
  <h1>{title}</h1>
  <div id="graph"></div>
  <script>
    const data = {data};
    new vis.Network(
      document.getElementById("graph"),
      { nodes: new vis.DataSet(data.nodes), edges: new vis.DataSet(data.edges) },
      {
        nodes: { shape: "box", margin: 8 },
        edges: { font: { size: 10, align: "middle" }, smooth: { type: "dynamic" } },
        physics: { stabilization: true, barnesHut: { springLength: 180 } }
      }
    );
  </script>
</body>
</html>
"#;
