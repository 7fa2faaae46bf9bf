//! Python unit extractor using tree-sitter.
//!
//! Two passes over the syntax tree:
//!
//! 1. Collect every function, class and lambda in pre-order. A unit is
//!    registered before its body is descended, so nested definitions end up
//!    as children of their lexical parent in the forest.
//! 2. Count calls to known unit names per enclosing function and render each
//!    unit's source with call markers. Running this after pass 1 lets forward
//!    references count.

use tree_sitter::{Node, Parser};

use super::helpers::{
    find_child_by_type, first_error, get_end_line, get_node_text, get_start_line, slice,
};
use crate::error::{RecordError, Result};
use crate::graph::CallGraph;
use crate::tokens::{CALL_CLOSE, CALL_OPEN};
use crate::types::{Bundle, CallableUnit, DocumentNode, NameMap, NodeRecord, UnitKind, UnitPayload};

/// Everything extracted from one source file.
#[derive(Clone, Debug)]
pub struct Extraction {
    /// Units nested by lexical containment under a synthetic `root`.
    pub forest: DocumentNode<UnitPayload>,
    /// All units in pre-order.
    pub units: Vec<CallableUnit>,
    pub call_graph: CallGraph,
    /// Total counted invocations per known name.
    pub call_counts: NameMap<u32>,
    /// Named units by name; a later definition replaces an earlier one.
    pub node_set: NameMap<NodeRecord>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn into_bundle(self) -> Bundle {
        Bundle {
            code: self.forest,
            call_tree: self.call_graph,
            node_set: self.node_set,
            call_set: self.call_counts,
        }
    }
}

/// Parse Python source and extract its units and call graph.
///
/// Any syntax error fails the whole extraction.
pub fn extract(source: &str) -> Result<Extraction> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| RecordError::parse(0, format!("Failed to set Python language: {}", e)))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| RecordError::parse(0, "Failed to parse Python source"))?;
    let root = tree.root_node();

    if let Some(error) = first_error(&root) {
        let message = if error.is_missing() {
            format!("missing `{}`", error.kind())
        } else {
            let text = get_node_text(&error, source);
            format!("unexpected `{}`", text.lines().next().unwrap_or("").trim())
        };
        return Err(RecordError::parse(get_start_line(&error), message));
    }

    let mut collector = UnitCollector::new(source);
    let mut forest = DocumentNode::leaf(UnitPayload::root());
    collector.collect(&root, &mut forest.children);

    let UnitCollector {
        mut units,
        known,
        mut node_set,
        ..
    } = collector;

    let mut counter = CallCounter::new(source, &known);
    counter.visit(&root);

    for (unit, marked) in units.iter_mut().zip(counter.marked) {
        if let (Some(name), false) = (&unit.name, unit.kind == UnitKind::Lambda) {
            if let Some(record) = node_set.get_mut(name) {
                record.emb_repr = Some(marked.clone());
            }
        }
        unit.marked_body = marked;
    }

    Ok(Extraction {
        forest,
        units,
        call_graph: counter.graph,
        call_counts: counter.counts,
        node_set,
    })
}

/// Reduce a call expression's text to the name it is matched by: the part
/// before the first `(`, after the last `.`.
pub fn callee_key(call_text: &str) -> &str {
    let head = call_text.trim().split('(').next().unwrap_or("");
    head.rsplit('.').next().unwrap_or(head)
}

/// The `lambda` keyword token shares its kind with the expression node.
fn unit_kind(node: &Node) -> Option<UnitKind> {
    if !node.is_named() {
        return None;
    }
    match node.kind() {
        "function_definition" => Some(UnitKind::Function),
        "class_definition" => Some(UnitKind::Class),
        "lambda" => Some(UnitKind::Lambda),
        _ => None,
    }
}

/// Node whose text is the unit's source: decorators are part of a definition.
fn definition_span<'a>(node: &Node<'a>) -> Node<'a> {
    match node.parent() {
        Some(parent) if parent.kind() == "decorated_definition" => parent,
        _ => *node,
    }
}

/// Parameter names in declaration order, including `*args` and `**kwargs`.
fn extract_params(node: Option<Node>, source: &str) -> Vec<String> {
    let Some(node) = node else {
        return Vec::new();
    };

    let mut params = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        let name = match child.kind() {
            "identifier" => Some(child),
            "default_parameter" | "typed_default_parameter" => child.child_by_field_name("name"),
            "typed_parameter" => child.named_child(0).and_then(|inner| {
                if inner.kind() == "identifier" {
                    Some(inner)
                } else {
                    find_child_by_type(&inner, "identifier")
                }
            }),
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                find_child_by_type(&child, "identifier")
            }
            _ => None,
        };
        if let Some(name) = name {
            params.push(get_node_text(&name, source).to_string());
        }
    }
    params
}

/// Pass 1: builds the forest, the unit list and the known-name tables.
struct UnitCollector<'s> {
    source: &'s str,
    units: Vec<CallableUnit>,
    known: NameMap<u32>,
    node_set: NameMap<NodeRecord>,
}

impl<'s> UnitCollector<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            units: Vec::new(),
            known: NameMap::new(),
            node_set: NameMap::new(),
        }
    }

    fn collect(&mut self, node: &Node, siblings: &mut Vec<DocumentNode<UnitPayload>>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match self.unit_for(&child) {
                Some(unit) => {
                    let mut payload = UnitPayload::from(&unit);
                    if unit.kind == UnitKind::Class {
                        payload.params = None;
                    }
                    let mut doc = DocumentNode::leaf(payload);
                    self.register(unit);
                    self.collect(&child, &mut doc.children);
                    siblings.push(doc);
                }
                None => self.collect(&child, siblings),
            }
        }
    }

    fn unit_for(&self, node: &Node) -> Option<CallableUnit> {
        let kind = unit_kind(node)?;
        let span = if kind == UnitKind::Lambda {
            *node
        } else {
            definition_span(node)
        };

        let name = match kind {
            UnitKind::Lambda => None,
            _ => node
                .child_by_field_name("name")
                .map(|n| get_node_text(&n, self.source).to_string()),
        };
        let params = match kind {
            UnitKind::Class => Vec::new(),
            _ => extract_params(node.child_by_field_name("parameters"), self.source),
        };

        Some(CallableUnit {
            name,
            params,
            body: get_node_text(&span, self.source).to_string(),
            marked_body: String::new(),
            kind,
            start_byte: span.start_byte(),
            end_byte: span.end_byte(),
            start_line: get_start_line(&span),
            end_line: get_end_line(&span),
        })
    }

    fn register(&mut self, unit: CallableUnit) {
        if let (Some(name), false) = (&unit.name, unit.kind == UnitKind::Lambda) {
            if self.known.insert(name.clone(), 0).is_some() {
                tracing::trace!(name = %name, "redefinition replaces earlier unit");
            }
            self.node_set.insert(
                name.clone(),
                NodeRecord {
                    name: name.clone(),
                    params: unit.params.clone(),
                    body: unit.body.clone(),
                    kind: unit.kind,
                    emb_repr: None,
                },
            );
        }
        self.units.push(unit);
    }
}

/// Pass 2: call counting and marker rendering.
struct CallCounter<'s, 'k> {
    source: &'s str,
    known: &'k NameMap<u32>,
    /// Names of the open function definitions, innermost last.
    enclosing: Vec<String>,
    graph: CallGraph,
    counts: NameMap<u32>,
    /// Marked source per unit, in the same pre-order as pass 1.
    marked: Vec<String>,
}

impl<'s, 'k> CallCounter<'s, 'k> {
    fn new(source: &'s str, known: &'k NameMap<u32>) -> Self {
        Self {
            source,
            known,
            enclosing: Vec::new(),
            graph: CallGraph::new(),
            counts: known.clone(),
            marked: Vec::new(),
        }
    }

    fn visit(&mut self, node: &Node) {
        let kind = unit_kind(node);
        let slot = kind.map(|_| {
            self.marked.push(String::new());
            self.marked.len() - 1
        });

        let mut opened = false;
        if kind == Some(UnitKind::Function) {
            if let Some(name) = node.child_by_field_name("name") {
                self.enclosing
                    .push(get_node_text(&name, self.source).to_string());
                opened = true;
            }
        }

        if node.kind() == "call" {
            self.count_call(node);
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(&child);
        }

        if opened {
            self.enclosing.pop();
        }
        if let (Some(slot), Some(kind)) = (slot, kind) {
            let span = if kind == UnitKind::Lambda {
                *node
            } else {
                definition_span(node)
            };
            self.marked[slot] = render_marked(&span, self.source, self.known);
        }
    }

    fn count_call(&mut self, node: &Node) {
        let key = callee_key(get_node_text(node, self.source));
        if !self.known.contains_key(key) {
            return;
        }
        // Calls outside any function are marked but not counted
        if let Some(caller) = self.enclosing.last() {
            self.graph.record_call(caller, key);
            *self.counts.get_or_insert_with(key, || 0) += 1;
        }
    }
}

/// Render a node's source with every call to a known name wrapped in call
/// markers. Inner calls are rewritten first; newlines inside a marked call
/// are dropped so the marker stays on one line.
fn render_marked(node: &Node, source: &str, known: &NameMap<u32>) -> String {
    let mut out = String::new();
    let mut offset = node.start_byte();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        out.push_str(slice(source, offset, child.start_byte()));
        out.push_str(&render_marked(&child, source, known));
        offset = child.end_byte();
    }
    out.push_str(slice(source, offset, node.end_byte()));

    if node.kind() == "call" && known.contains_key(callee_key(get_node_text(node, source))) {
        format!("{}{}{}", CALL_OPEN, out.replace('\n', ""), CALL_CLOSE)
    } else {
        out
    }
}
