use crate::model::{LayoutEdge, LayoutResult, NodeRole};
use crate::realize::{NodeTextStyle, RealizedNode, realize_nodes};
use crate::text::TextMeasurer;
use stakemap_core::Membership;
use std::collections::HashMap;
use std::fmt::Write as _;

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Root `<svg id>` and prefix for marker ids.
    pub diagram_id: Option<String>,
    /// Fills the whole canvas first. `None` leaves it transparent.
    pub background: Option<String>,
    pub text_style: NodeTextStyle,
    pub font_family: String,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            diagram_id: None,
            background: Some("white".to_string()),
            text_style: NodeTextStyle::default(),
            font_family: "Arial, Helvetica, sans-serif".to_string(),
        }
    }
}

/// What part of the diagram the SVG canvas shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SvgFrame {
    /// The padded diagram bounds, grown to fit realized boxes.
    Fit,
    /// A fixed-size canvas showing content under a pan/zoom transform:
    /// `screen = content * zoom + translate`.
    Viewport {
        width: f64,
        height: f64,
        translate_x: f64,
        translate_y: f64,
        zoom: f64,
    },
}

pub fn render_svg(
    layout: &LayoutResult,
    measurer: &dyn TextMeasurer,
    options: &SvgRenderOptions,
) -> String {
    let realized = realize_nodes(layout, measurer, &options.text_style);
    render_realized_svg(layout, &realized, options, SvgFrame::Fit)
}

/// Padded view box over the layout bounds and the realized boxes.
pub fn fit_view_box(layout: &LayoutResult, realized: &[RealizedNode]) -> (f64, f64, f64, f64) {
    let (x, y, w, h) = layout.view_box();
    let half = layout.bounds.padding / 2.0;
    let max_right = realized
        .iter()
        .map(|n| n.right() + half)
        .fold(x + w, f64::max);
    let max_bottom = realized
        .iter()
        .map(|n| n.bottom() + half)
        .fold(y + h, f64::max);
    (x, y, max_right - x, max_bottom - y)
}

pub fn render_realized_svg(
    layout: &LayoutResult,
    realized: &[RealizedNode],
    options: &SvgRenderOptions,
    frame: SvgFrame,
) -> String {
    let diagram_id = options.diagram_id.as_deref().unwrap_or("stakemap");
    let diagram_id_esc = escape_xml(diagram_id);

    let mut out = String::new();
    let transform = match frame {
        SvgFrame::Fit => {
            let (x, y, w, h) = fit_view_box(layout, realized);
            let _ = write!(
                &mut out,
                r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="{x} {y} {w} {h}" role="graphics-document document" aria-roledescription="ownership">"#,
                id = diagram_id_esc,
                x = fmt(x),
                y = fmt(y),
                w = fmt(w.max(1.0)),
                h = fmt(h.max(1.0)),
            );
            if let Some(bg) = &options.background {
                let _ = write!(
                    &mut out,
                    r#"<rect class="background" x="{x}" y="{y}" width="{w}" height="{h}" fill="{bg}"/>"#,
                    x = fmt(x),
                    y = fmt(y),
                    w = fmt(w.max(1.0)),
                    h = fmt(h.max(1.0)),
                    bg = escape_attr(bg),
                );
            }
            None
        }
        SvgFrame::Viewport {
            width,
            height,
            translate_x,
            translate_y,
            zoom,
        } => {
            let w = width.max(1.0);
            let h = height.max(1.0);
            let _ = write!(
                &mut out,
                r#"<svg id="{id}" xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="graphics-document document" aria-roledescription="ownership">"#,
                id = diagram_id_esc,
                w = fmt(w),
                h = fmt(h),
            );
            if let Some(bg) = &options.background {
                let _ = write!(
                    &mut out,
                    r#"<rect class="background" x="0" y="0" width="{w}" height="{h}" fill="{bg}"/>"#,
                    w = fmt(w),
                    h = fmt(h),
                    bg = escape_attr(bg),
                );
            }
            Some(format!(
                "translate({}, {}) scale({})",
                fmt(translate_x),
                fmt(translate_y),
                fmt(zoom)
            ))
        }
    };

    let _ = write!(
        &mut out,
        r##"<defs><marker id="{id}-arrow" viewBox="0 0 10 10" refX="10" refY="5" markerWidth="8" markerHeight="8" orient="auto-start-reverse"><path d="M0,0 L10,5 L0,10 z" fill="#64748b"/></marker></defs>"##,
        id = diagram_id_esc,
    );

    match &transform {
        Some(t) => {
            let _ = write!(&mut out, r#"<g class="content" transform="{t}">"#);
        }
        None => out.push_str(r#"<g class="content">"#),
    }

    let by_id: HashMap<&str, &RealizedNode> = realized.iter().map(|n| (n.id.as_str(), n)).collect();

    out.push_str(r#"<g class="edges">"#);
    for e in &layout.edges {
        let (Some(source), Some(target)) = (
            by_id.get(e.source.as_str()),
            by_id.get(e.target.as_str()),
        ) else {
            continue;
        };
        write_edge(&mut out, e, source, target, &diagram_id_esc);
    }
    out.push_str("</g>");

    out.push_str(r#"<g class="nodes">"#);
    for node in &layout.nodes {
        let Some(r) = by_id.get(node.id.as_str()) else {
            continue;
        };
        write_node(&mut out, node.role, r, options);
    }
    out.push_str("</g>");

    out.push_str("</g></svg>");
    out
}

/// Orthogonal step path from the bottom center of `source` to the top center of `target`.
fn write_edge(
    out: &mut String,
    edge: &LayoutEdge,
    source: &RealizedNode,
    target: &RealizedNode,
    diagram_id: &str,
) {
    let sx = source.x + source.width / 2.0;
    let sy = source.bottom();
    let tx = target.x + target.width / 2.0;
    let ty = target.y;
    let mid_y = sy + (ty - sy) / 2.0;

    let d = if (sx - tx).abs() < 1e-6 {
        format!("M{},{} L{},{}", fmt(sx), fmt(sy), fmt(tx), fmt(ty))
    } else {
        format!(
            "M{},{} L{},{} L{},{} L{},{}",
            fmt(sx),
            fmt(sy),
            fmt(sx),
            fmt(mid_y),
            fmt(tx),
            fmt(mid_y),
            fmt(tx),
            fmt(ty)
        )
    };

    let dash = if edge.style.dashed {
        r#" stroke-dasharray="8,6""#
    } else {
        ""
    };
    let marker = if edge.style.arrow_head {
        format!(r#" marker-end="url(#{diagram_id}-arrow)""#)
    } else {
        String::new()
    };
    let _ = write!(
        out,
        r#"<path class="edge" id="{id}" data-source="{src}" data-target="{dst}" d="{d}" fill="none" stroke="{stroke}" stroke-width="{sw}"{dash}{marker}/>"#,
        id = escape_attr(&edge.id),
        src = escape_attr(&edge.source),
        dst = escape_attr(&edge.target),
        stroke = escape_attr(&edge.style.stroke),
        sw = fmt(edge.style.stroke_width),
    );
}

fn node_palette(role: NodeRole) -> (&'static str, &'static str, &'static str, &'static str) {
    // (class, fill, stroke, text)
    match role {
        NodeRole::Root => ("node root", "#1e3a8a", "#1e3a8a", "#ffffff"),
        NodeRole::Header(_) => ("node header", "#e2e8f0", "#94a3b8", "#0f172a"),
        NodeRole::Entity(Membership::Shareholder) => {
            ("node shareholder", "#ecfdf5", "#059669", "#064e3b")
        }
        NodeRole::Entity(Membership::RepresentativeOnly) => {
            ("node representative", "#eff6ff", "#2563eb", "#1e3a8a")
        }
        NodeRole::Entity(Membership::Excluded) => ("node excluded", "#f8fafc", "#cbd5e1", "#334155"),
    }
}

fn write_node(out: &mut String, role: NodeRole, r: &RealizedNode, options: &SvgRenderOptions) {
    let (class, fill, stroke, text_fill) = node_palette(role);
    let style = &options.text_style;
    let title_style = match role {
        NodeRole::Root => &style.root_title,
        _ => &style.title,
    };

    let _ = write!(
        out,
        r#"<g class="{class}" id="{id}" transform="translate({x}, {y})">"#,
        id = escape_attr(&r.id),
        x = fmt(r.x),
        y = fmt(r.y),
    );
    let _ = write!(
        out,
        r#"<rect rx="8" ry="8" x="0" y="0" width="{w}" height="{h}" fill="{fill}" stroke="{stroke}" stroke-width="2"/>"#,
        w = fmt(r.width),
        h = fmt(r.height),
    );

    let cx = r.width / 2.0;
    let mut y = style.padding_y;
    for line in &r.title_lines {
        y += r.title_line_height;
        let _ = write!(
            out,
            r#"<text class="title" x="{x}" y="{y}" text-anchor="middle" font-family="{ff}" font-size="{fs}" font-weight="bold" fill="{text_fill}">{t}</text>"#,
            x = fmt(cx),
            y = fmt(y - r.title_line_height * 0.25),
            ff = escape_attr(&options.font_family),
            fs = fmt(title_style.font_size),
            t = escape_xml(line),
        );
    }
    if !r.detail_lines.is_empty() {
        y += style.title_gap;
    }
    for line in &r.detail_lines {
        y += r.detail_line_height;
        let _ = write!(
            out,
            r#"<text class="detail" x="{x}" y="{y}" text-anchor="middle" font-family="{ff}" font-size="{fs}" fill="{text_fill}">{t}</text>"#,
            x = fmt(cx),
            y = fmt(y - r.detail_line_height * 0.25),
            ff = escape_attr(&options.font_family),
            fs = fmt(style.detail.font_size),
            t = escape_xml(line),
        );
    }
    out.push_str("</g>");
}

fn fmt(v: f64) -> String {
    // Round-trippable decimal form without `-0` or tiny float noise.
    if !v.is_finite() {
        return "0".to_string();
    }

    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    let s = v.to_string();
    if s == "-0" { "0".to_string() } else { s }
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
    escape_xml(text)
}
