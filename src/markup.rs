use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// Owned markup tree handed to the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Tag {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text {
        content: String,
    },
}

impl MarkupNode {
    pub fn tag(name: &str, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Tag {
            name: name.to_string(),
            attributes: Vec::new(),
            children,
        }
    }

    pub fn text(content: &str) -> Self {
        MarkupNode::Text {
            content: content.to_string(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            MarkupNode::Tag { name, .. } => Some(name),
            MarkupNode::Text { .. } => None,
        }
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.name() == Some(tag)
    }

    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Tag { children, .. } => children,
            MarkupNode::Text { .. } => &[],
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            MarkupNode::Tag { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str()),
            MarkupNode::Text { .. } => None,
        }
    }

    /// Concatenation of every descendant text node, markup ignored.
    pub fn flattened_text(&self) -> String {
        fn collect(node: &MarkupNode, out: &mut String) {
            match node {
                MarkupNode::Text { content } => out.push_str(content),
                MarkupNode::Tag { children, .. } => {
                    for c in children {
                        collect(c, out);
                    }
                }
            }
        }
        let mut out = String::new();
        collect(self, &mut out);
        out
    }
}

fn html5_parse(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

fn convert(node: &Handle) -> Option<MarkupNode> {
    match &node.data {
        NodeData::Text { contents } => Some(MarkupNode::Text {
            content: contents.borrow().to_string(),
        }),
        NodeData::Element { name, attrs, .. } => {
            let attributes = attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect();
            let children = node.children.borrow().iter().filter_map(convert).collect();
            Some(MarkupNode::Tag {
                name: name.local.to_string().to_ascii_lowercase(),
                attributes,
                children,
            })
        }
        _ => None,
    }
}

fn find_body(node: &Handle) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &node.data {
        if name.local.to_string().eq_ignore_ascii_case("body") {
            return Some(node.clone());
        }
    }
    for child in node.children.borrow().iter() {
        if let Some(body) = find_body(child) {
            return Some(body);
        }
    }
    None
}

/// True when the input opens with its own doctype or `<html>` element.
fn is_full_document(input: &str) -> bool {
    let head = input.trim_start().as_bytes();
    ["<!doctype", "<html"].iter().any(|prefix| {
        head.get(..prefix.len())
            .is_some_and(|h| h.eq_ignore_ascii_case(prefix.as_bytes()))
    })
}

/// Parse a markup string into the top-level nodes of its body.
///
/// html5ever recovers from any input, so this never fails; fragments are
/// placed in a synthetic document first so stray text lands in `<body>`.
pub fn parse(input: &str) -> Vec<MarkupNode> {
    let wrapped = if is_full_document(input) {
        input.to_string()
    } else {
        format!(
            "<!doctype html><html><head><meta charset=\"utf-8\"></head><body>{}</body></html>",
            input
        )
    };

    let dom = html5_parse(&wrapped);
    let top = match find_body(&dom.document) {
        Some(body) => body.children.borrow().clone(),
        None => dom.document.children.borrow().clone(),
    };
    top.iter().filter_map(convert).collect()
}
