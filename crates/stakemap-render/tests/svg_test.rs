use stakemap_core::{EntityKind, OwnershipNode, OwnershipTree};
use stakemap_render::text::DeterministicTextMeasurer;
use stakemap_render::{
    NodeTextStyle, SvgFrame, SvgRenderOptions, layout, realize_nodes, render_svg,
    svg::render_realized_svg,
};
use std::path::PathBuf;

fn load_fixture(name: &str) -> OwnershipTree {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("ownership")
        .join(name);
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    OwnershipTree::from_json_str(&text).expect("fixture parses")
}

fn has_class(node: &roxmltree::Node<'_, '_>, class: &str) -> bool {
    node.attribute("class")
        .is_some_and(|c| c.split_whitespace().any(|part| part == class))
}

#[test]
fn root_only_svg_uses_padded_bounds_as_view_box() {
    let out = layout(&load_fixture("root_only.json"));
    let svg = render_svg(
        &out,
        &DeterministicTextMeasurer::default(),
        &SvgRenderOptions::default(),
    );

    let doc = roxmltree::Document::parse(&svg).expect("svg parses");
    let root = doc.root_element();
    assert_eq!(root.tag_name().name(), "svg");
    assert_eq!(root.attribute("viewBox"), Some("-50 -250 1500 300"));

    let nodes = doc.descendants().filter(|n| has_class(n, "node")).count();
    let edges = doc.descendants().filter(|n| has_class(n, "edge")).count();
    assert_eq!(nodes, 1);
    assert_eq!(edges, 0);
}

#[test]
fn full_fixture_draws_every_box_and_connector() {
    let out = layout(&load_fixture("basic.json"));
    let svg = render_svg(
        &out,
        &DeterministicTextMeasurer::default(),
        &SvgRenderOptions::default(),
    );
    let doc = roxmltree::Document::parse(&svg).expect("svg parses");

    let nodes: Vec<_> = doc.descendants().filter(|n| has_class(n, "node")).collect();
    assert_eq!(nodes.len(), out.nodes.len());
    assert_eq!(nodes.iter().filter(|n| has_class(n, "shareholder")).count(), 4);
    assert_eq!(nodes.iter().filter(|n| has_class(n, "representative")).count(), 2);

    let edges: Vec<_> = doc.descendants().filter(|n| has_class(n, "edge")).collect();
    assert_eq!(edges.len(), out.edges.len());
    let dashed = edges
        .iter()
        .filter(|e| e.attribute("stroke-dasharray").is_some())
        .count();
    assert_eq!(dashed, 3);
    assert!(
        edges
            .iter()
            .all(|e| e.attribute("marker-end") == Some("url(#stakemap-arrow)"))
    );
}

#[test]
fn text_is_escaped() {
    let root = OwnershipNode::new("r", "Smith & Sons <Holdings>", EntityKind::Company)
        .with_child(
            OwnershipNode::new("p", "O'Neil \"Jr\"", EntityKind::Person).with_shares("Ordinary", 5),
        );
    let out = layout(&OwnershipTree::new(root));
    let svg = render_svg(
        &out,
        &DeterministicTextMeasurer::default(),
        &SvgRenderOptions::default(),
    );
    assert!(svg.contains("Smith &amp; Sons &lt;Holdings&gt;"));

    let doc = roxmltree::Document::parse(&svg).expect("svg parses");
    let titles: Vec<&str> = doc
        .descendants()
        .filter(|n| has_class(n, "title"))
        .filter_map(|n| n.text())
        .collect();
    assert!(titles.contains(&"Smith & Sons <Holdings>"));
    assert!(titles.contains(&"O'Neil \"Jr\""));
}

#[test]
fn long_text_grows_the_realized_box() {
    let address = "Suite 2301 Tower Two Lippo Centre 89 Queensway Admiralty Hong Kong Special \
                   Administrative Region of the People's Republic of China, attention of the \
                   company secretarial services department";
    let root = OwnershipNode::new("r", "Root", EntityKind::Company).with_child(
        OwnershipNode::new("p", "Long Address Holder", EntityKind::Person)
            .with_address(address)
            .with_shares("Class A", 1),
    );
    let out = layout(&OwnershipTree::new(root));
    let realized = realize_nodes(
        &out,
        &DeterministicTextMeasurer::default(),
        &NodeTextStyle::default(),
    );

    let nominal = out.node("shareholder-0").expect("placed").height;
    let grown = realized
        .iter()
        .find(|n| n.id == "shareholder-0")
        .expect("realized");
    assert!(grown.height > nominal, "{} <= {nominal}", grown.height);
    assert_eq!(grown.width, 350.0);
    assert!(grown.detail_lines.len() > 4);
}

#[test]
fn viewport_frame_wraps_content_in_a_pan_zoom_transform() {
    let out = layout(&load_fixture("root_only.json"));
    let realized = realize_nodes(
        &out,
        &DeterministicTextMeasurer::default(),
        &NodeTextStyle::default(),
    );
    let svg = render_realized_svg(
        &out,
        &realized,
        &SvgRenderOptions {
            diagram_id: Some("capture".to_string()),
            ..SvgRenderOptions::default()
        },
        SvgFrame::Viewport {
            width: 800.0,
            height: 600.0,
            translate_x: 40.0,
            translate_y: 240.0,
            zoom: 1.0,
        },
    );
    let doc = roxmltree::Document::parse(&svg).expect("svg parses");
    let root = doc.root_element();
    assert_eq!(root.attribute("id"), Some("capture"));
    assert_eq!(root.attribute("width"), Some("800"));
    assert_eq!(root.attribute("viewBox"), Some("0 0 800 600"));

    let content = doc
        .descendants()
        .find(|n| has_class(n, "content"))
        .expect("content group");
    assert_eq!(content.attribute("transform"), Some("translate(40, 240) scale(1)"));
}
