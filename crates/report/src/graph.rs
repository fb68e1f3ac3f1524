use extract::{Category, InvestigationResult, Locale};
use investigate::Highlight;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Leaves drawn per category; the rest are summarised by an overflow node.
pub const MAX_LEAVES: usize = 3;

pub const TARGET_NODE_ID: &str = "target-node";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Distance from the target to each category node
    pub category_radius: f64,
    /// Distance from a category node to its leaves
    pub leaf_radius: f64,
    /// Angle between neighbouring leaves of one category, in radians
    pub leaf_spread: f64,
    pub margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            category_radius: 220.0,
            leaf_radius: 110.0,
            leaf_spread: 0.5,
            margin: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Target,
    Category { category: Category },
    Leaf { category: Category, index: usize, text: String },
    Overflow { category: Category, remaining: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub highlighted: bool,
}

/// A drawn connection between two node centres.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A computed relationship graph. Coordinates are relative to the top-left
/// corner of a `width` x `height` canvas.
#[derive(Debug, Clone)]
pub struct GraphLayout {
    graph: DiGraph<GraphNode, ()>,
    pub width: f64,
    pub height: f64,
}

impl GraphLayout {
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes().find(|n| n.id == id)
    }

    /// Edges in drawing order: every target->category edge, then every
    /// category->leaf edge.
    pub fn edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edge_references()
            .map(|edge| {
                let from = &self.graph[edge.source()];
                let to = &self.graph[edge.target()];
                GraphEdge {
                    from: from.id.clone(),
                    to: to.id.clone(),
                    x1: from.x,
                    y1: from.y,
                    x2: to.x,
                    y2: to.y,
                }
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The highlight produced by clicking `node_id`. Only leaves are
    /// selectable; the layout itself is left untouched.
    pub fn select(&self, node_id: &str) -> Option<Highlight> {
        match &self.node(node_id)?.kind {
            NodeKind::Leaf { category, text, .. } => Some(Highlight {
                category: *category,
                text: text.clone(),
            }),
            _ => None,
        }
    }
}

pub fn category_node_id(category: Category) -> String {
    format!("cat-node-{}", category.key())
}

pub fn leaf_node_id(category: Category, index: usize) -> String {
    format!("data-node-{}-{}", category.key(), index)
}

fn overflow_node_id(category: Category) -> String {
    format!("more-node-{}", category.key())
}

fn leaf_label(category: Category, text: &str) -> String {
    match category {
        Category::TelegramActivity if !text.starts_with('@') => format!("@{}", text),
        _ => text.to_string(),
    }
}

/// Lay out `result` radially around `target`.
///
/// Non-empty categories sit evenly spaced on a ring around the target,
/// starting at twelve o'clock. Each category fans out up to [`MAX_LEAVES`]
/// leaves on an arc pointing away from the target.
pub fn layout(
    target: &str,
    result: &InvestigationResult,
    highlight: Option<&Highlight>,
    locale: Locale,
    config: &LayoutConfig,
) -> GraphLayout {
    let mut graph = DiGraph::new();

    let root = graph.add_node(GraphNode {
        id: TARGET_NODE_ID.to_string(),
        kind: NodeKind::Target,
        label: target.to_string(),
        x: 0.0,
        y: 0.0,
        highlighted: false,
    });

    let categories: Vec<Category> = result.non_empty_categories().collect();
    let step = if categories.is_empty() { 0.0 } else { 2.0 * PI / categories.len() as f64 };

    let mut rings: Vec<(Category, NodeIndex, f64)> = Vec::with_capacity(categories.len());
    for (i, category) in categories.iter().copied().enumerate() {
        let angle = -PI / 2.0 + step * i as f64;
        let node = graph.add_node(GraphNode {
            id: category_node_id(category),
            kind: NodeKind::Category { category },
            label: locale.graph_label(category).to_string(),
            x: config.category_radius * angle.cos(),
            y: config.category_radius * angle.sin(),
            highlighted: false,
        });
        graph.add_edge(root, node, ());
        rings.push((category, node, angle));
    }

    for (category, cat_index, angle) in rings {
        let (cx, cy) = (graph[cat_index].x, graph[cat_index].y);
        let texts = result.item_texts(category);
        let shown = texts.len().min(MAX_LEAVES);
        // Slots are centred on the category's own direction; the overflow
        // marker takes the slot after the last leaf.
        let slots = if texts.len() > MAX_LEAVES { shown + 1 } else { shown };
        let offset = (slots.saturating_sub(1)) as f64 / 2.0;
        let slot_position = |slot: usize| {
            let a = angle + config.leaf_spread * (slot as f64 - offset);
            (cx + config.leaf_radius * a.cos(), cy + config.leaf_radius * a.sin())
        };

        for (index, text) in texts.iter().take(shown).enumerate() {
            let (x, y) = slot_position(index);
            let highlighted = highlight.is_some_and(|h| h.category == category && h.text == *text);
            let leaf = graph.add_node(GraphNode {
                id: leaf_node_id(category, index),
                kind: NodeKind::Leaf { category, index, text: text.to_string() },
                label: leaf_label(category, text),
                x,
                y,
                highlighted,
            });
            graph.add_edge(cat_index, leaf, ());
        }

        if texts.len() > MAX_LEAVES {
            let remaining = texts.len() - MAX_LEAVES;
            let (x, y) = slot_position(shown);
            graph.add_node(GraphNode {
                id: overflow_node_id(category),
                kind: NodeKind::Overflow { category, remaining },
                label: locale.more_items(remaining),
                x,
                y,
                highlighted: false,
            });
        }
    }

    let (width, height) = fit_to_canvas(&mut graph, config.margin);
    GraphLayout { graph, width, height }
}

/// Shift every node so the bounding box starts at `margin` from the top-left
/// corner and return the canvas size.
fn fit_to_canvas(graph: &mut DiGraph<GraphNode, ()>, margin: f64) -> (f64, f64) {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for node in graph.node_weights() {
        min_x = min_x.min(node.x);
        min_y = min_y.min(node.y);
        max_x = max_x.max(node.x);
        max_y = max_y.max(node.y);
    }

    for node in graph.node_weights_mut() {
        node.x += margin - min_x;
        node.y += margin - min_y;
    }

    (max_x - min_x + 2.0 * margin, max_y - min_y + 2.0 * margin)
}
