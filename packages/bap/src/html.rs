//! `ScienceBase` HTML descriptions converted to print nodes.
//!
//! The catalog body is arbitrary HTML. Only its leaves matter for print:
//! every text leaf becomes a styled block based on its parent element and
//! every empty leaf becomes a line break.

use biogeography_bap_models::print::{PageBreak, PrintNode, TextBlock};
use biogeography_bap_models::sciencebase::SbItem;
use scraper::{Html, Node};

const DEFAULT_STYLE: &str = "sbProperties";
const TITLE_STYLE: &str = "sbPropertiesTitle";
const LINK_STYLE: &str = "annotationLink";
const DEFAULT_MARGIN: [f64; 4] = [10.0, 2.0, 0.0, 2.0];
const HEADING_MARGIN: [f64; 4] = [5.0, 5.0, 0.0, 5.0];
const BULLET: &str = "   \u{2022}   ";

/// Converts an HTML fragment into a flat list of styled text runs.
#[must_use]
pub fn html_to_runs(html: &str) -> Vec<TextBlock> {
    let fragment = Html::parse_fragment(html);
    let mut runs = Vec::new();

    for node in fragment.tree.root().descendants() {
        if node.has_children() {
            continue;
        }
        let Node::Text(text) = node.value() else {
            if !matches!(node.value(), Node::Document | Node::Fragment) {
                runs.push(TextBlock::new("\n"));
            }
            continue;
        };

        let text = text.trim().replace('\u{21b5}', "");
        if text.is_empty() {
            runs.push(TextBlock::new("\n"));
            continue;
        }

        let parent = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| (p, e.name().to_string())));
        let grandparent_is_underline = parent
            .as_ref()
            .and_then(|(p, _)| p.parent())
            .and_then(|g| g.value().as_element().map(|e| e.name() == "u"))
            .unwrap_or(false);

        let block = match parent.as_ref().map(|(_, name)| name.as_str()) {
            Some("h1" | "h2" | "h3" | "h4") => TextBlock::new(format!("{text}\n"))
                .style(TITLE_STYLE)
                .margin(HEADING_MARGIN),
            Some("u") => underlined(&text),
            _ if grandparent_is_underline => underlined(&text),
            Some("li") => {
                let [left, top, right, bottom] = DEFAULT_MARGIN;
                TextBlock::new(format!("{BULLET}{text}"))
                    .style(DEFAULT_STYLE)
                    .margin([left + 10.0, top, right, bottom])
                    .preserve_leading_spaces()
            }
            Some("a") => TextBlock::new(text.clone())
                .style(LINK_STYLE)
                .margin(DEFAULT_MARGIN)
                .link(&text),
            Some("em" | "i") => TextBlock::new(text)
                .style(DEFAULT_STYLE)
                .margin(DEFAULT_MARGIN)
                .italics(),
            _ => TextBlock::new(text)
                .style(DEFAULT_STYLE)
                .margin(DEFAULT_MARGIN),
        };
        runs.push(block);
    }

    runs
}

fn underlined(text: &str) -> TextBlock {
    TextBlock::new(format!("{text} "))
        .style(DEFAULT_STYLE)
        .margin(DEFAULT_MARGIN)
        .underline()
        .bold()
}

/// Print nodes for a package's `ScienceBase` item: the title on a new page,
/// the converted body and the catalog link when known.
#[must_use]
pub fn sb_item_for_print(item: &SbItem) -> Vec<PrintNode> {
    let mut nodes: Vec<PrintNode> = vec![
        TextBlock::new(item.title.clone())
            .style("analysisTitle")
            .margin([5.0, 2.0, 5.0, 20.0])
            .page_break(PageBreak::Before)
            .into(),
        TextBlock::runs(html_to_runs(&item.body)).into(),
    ];

    if let Some(url) = item.url() {
        nodes.push(TextBlock::new("ScienceBase Item").style(TITLE_STYLE).into());
        nodes.push(
            TextBlock::new(url)
                .style(LINK_STYLE)
                .margin([15.0, 10.0, 5.0, 0.0])
                .link(url)
                .into(),
        );
    }

    nodes
}
