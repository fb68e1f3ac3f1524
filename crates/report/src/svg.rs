use std::fmt::Write;

use crate::graph::{GraphLayout, NodeKind};

const MAX_LABEL_CHARS: usize = 24;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let mut short: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
    short.push('…');
    short
}

/// Render a layout as a standalone SVG document. Edges are emitted before
/// nodes so they sit behind them.
pub fn render_svg(graph: &GraphLayout) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="sans-serif">"#,
        w = graph.width,
        h = graph.height
    );

    svg.push_str("  <g class=\"edges\">\n");
    for edge in graph.edges() {
        let (stroke, width) = if edge.from == crate::graph::TARGET_NODE_ID {
            ("rgba(59,130,246,0.4)", 2.0)
        } else {
            ("rgba(71,85,105,0.3)", 1.5)
        };
        let _ = writeln!(
            svg,
            r#"    <line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="{}"/>"#,
            edge.x1, edge.y1, edge.x2, edge.y2, stroke, width
        );
    }
    svg.push_str("  </g>\n");

    svg.push_str("  <g class=\"nodes\">\n");
    for node in graph.nodes() {
        let label = escape(&truncate(&node.label));
        let (radius, fill, font_size) = match node.kind {
            NodeKind::Target => (28.0, "#2563eb", 14),
            NodeKind::Category { .. } => (22.0, "#1e293b", 12),
            NodeKind::Leaf { .. } if node.highlighted => (8.0, "#f59e0b", 11),
            NodeKind::Leaf { .. } => (8.0, "#0f172a", 11),
            NodeKind::Overflow { .. } => {
                let _ = writeln!(
                    svg,
                    r##"    <text id="{}" x="{:.1}" y="{:.1}" font-size="10" fill="#64748b" text-anchor="middle">{}</text>"##,
                    escape(&node.id),
                    node.x,
                    node.y,
                    label
                );
                continue;
            }
        };
        let _ = writeln!(
            svg,
            r##"    <g id="{}"><circle cx="{:.1}" cy="{:.1}" r="{}" fill="{}" stroke="#3b82f6"/><text x="{:.1}" y="{:.1}" font-size="{}" fill="#e2e8f0" text-anchor="middle">{}</text></g>"##,
            escape(&node.id),
            node.x,
            node.y,
            radius,
            fill,
            node.x,
            node.y + radius + 14.0,
            font_size,
            label
        );
    }
    svg.push_str("  </g>\n</svg>\n");
    svg
}
