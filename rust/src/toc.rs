//! Table-of-contents extraction from the `#toc > div` fragment of a document.

use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    /// `href` of the entry's link, e.g. `#s-1.2`.
    pub anchor: String,
    pub title: String,
    /// Nesting level, 0 for top-level sections.
    pub depth: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum TocError {
    #[error("failed to parse table of contents: {0}")]
    Parse(#[from] std::io::Error),
}

/// Flattens every `.toc-item` (document order) into an entry. Items without a link are skipped.
pub fn parse_table_of_contents(html: &str) -> Result<Vec<TocEntry>, TocError> {
    let dom = parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .read_from(&mut html.as_bytes())?;

    let mut entries = Vec::new();
    collect(&dom.document, 0, &mut entries);
    Ok(entries)
}

#[uniffi::export]
pub fn table_of_contents_entries(html: String) -> Vec<TocEntry> {
    parse_table_of_contents(&html).unwrap_or_else(|e| {
        tracing::warn!(%e, "toc parse failed");
        vec![]
    })
}

fn collect(handle: &Handle, indent_blocks: u32, out: &mut Vec<TocEntry>) {
    let mut indent_blocks = indent_blocks;
    if let NodeData::Element { attrs, .. } = &handle.data {
        let attrs = attrs.borrow();
        let classes = attr_val(&attrs, "class");
        if has_class(&classes, "toc-indent") {
            indent_blocks += 1;
        }
        if has_class(&classes, "toc-item") {
            if let Some(anchor) = first_link_href(handle) {
                let mut title = String::new();
                text_content(handle, &mut title);
                out.push(TocEntry {
                    anchor,
                    title: collapse_whitespace(&title),
                    depth: indent_blocks.saturating_sub(1),
                });
            }
        }
    }
    for child in handle.children.borrow().iter() {
        collect(child, indent_blocks, out);
    }
}

fn first_link_href(handle: &Handle) -> Option<String> {
    for child in handle.children.borrow().iter() {
        if let NodeData::Element { name, attrs, .. } = &child.data {
            if name.local.as_ref() == "a" {
                let href = attr_val(&attrs.borrow(), "href");
                if !href.is_empty() {
                    return Some(href);
                }
            }
        }
        if let Some(href) = first_link_href(child) {
            return Some(href);
        }
    }
    None
}

fn text_content(handle: &Handle, out: &mut String) {
    for child in handle.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => text_content(child, out),
            _ => {}
        }
    }
}

fn attr_val(attrs: &[html5ever::Attribute], name: &str) -> String {
    attrs
        .iter()
        .find(|a| a.name.local.as_ref() == name)
        .map(|a| a.value.to_string())
        .unwrap_or_default()
}

fn has_class(classes: &str, class: &str) -> bool {
    classes.split_ascii_whitespace().any(|c| c == class)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
