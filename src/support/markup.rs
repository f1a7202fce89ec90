//! Markup parsing and serialization for the live tree.
//!
//! Parsing goes through html5ever into a `markup5ever_rcdom` tree, which is then converted into
//! live nodes. Serialization drives the html5ever serializer directly over live nodes.

use crate::support::dom::{Handle, NodeData};
use crate::{Error, Result};
use html5ever::driver::ParseOpts;
use html5ever::parse_document as html5ever_parse_document;
use html5ever::parse_fragment as html5ever_parse_fragment;
use html5ever::serialize::{SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use markup5ever::QualName;
use markup5ever::serialize::{Serialize, Serializer};
use markup5ever_rcdom::{Handle as RcHandle, NodeData as RcNodeData, RcDom};
use std::collections::VecDeque;
use std::io;

// region:    --- Parse

/// Parses a full document and returns its live document node.
pub(crate) fn parse_document(html_content: &str) -> Result<Handle> {
	let dom = parse_rcdom(html_content)?;
	let document = convert_node(&dom.document).ok_or_else(|| Error::custom("html5ever returned no document node"))?;

	tracing::debug!(nodes = document.descendants().len(), "parsed document");
	Ok(document)
}

/// Parses markup as the content of `context`, the way `innerHTML` assignment does.
///
/// The context element's name and attributes select the tokenizer state and insertion mode, so
/// table rows stay rows inside a `<table>` and `<script>`/`<textarea>` content stays raw text.
/// Returns parentless nodes, in order.
pub(crate) fn parse_fragment(context: &Handle, html_content: &str) -> Result<Vec<Handle>> {
	let NodeData::Element { name, attrs, .. } = context.data() else {
		return Err(Error::custom("fragment parsing requires an element context"));
	};
	let context_attrs = attrs.borrow().clone();

	let dom = html5ever_parse_fragment(RcDom::default(), ParseOpts::default(), name.clone(), context_attrs, false)
		.from_utf8()
		.read_from(&mut html_content.as_bytes())?;

	// The fragment parser hangs everything under a synthetic `<html>` root.
	let root = dom
		.document
		.children
		.borrow()
		.first()
		.cloned()
		.ok_or_else(|| Error::custom("html5ever returned no fragment root"))?;

	let nodes: Vec<Handle> = root.children.borrow().iter().filter_map(convert_node).collect();

	tracing::trace!(context = %name.local, nodes = nodes.len(), "parsed fragment");
	Ok(nodes)
}

fn parse_rcdom(html_content: &str) -> Result<RcDom> {
	let dom = html5ever_parse_document(RcDom::default(), ParseOpts::default())
		.from_utf8()
		.read_from(&mut html_content.as_bytes())?;
	Ok(dom)
}

/// Converts an rcdom node (and its subtree) into a live node.
/// Processing instructions have no live counterpart and are dropped.
fn convert_node(handle: &RcHandle) -> Option<Handle> {
	let node = match &handle.data {
		RcNodeData::Document => Handle::new(NodeData::Document),
		RcNodeData::Doctype { name, .. } => Handle::new(NodeData::Doctype { name: name.clone() }),
		RcNodeData::Text { contents } => Handle::new_text(&contents.borrow()),
		RcNodeData::Comment { contents } => Handle::new(NodeData::Comment {
			contents: contents.clone(),
		}),
		RcNodeData::Element { name, attrs, .. } => Handle::new_element(name.clone(), attrs.borrow().clone()),
		RcNodeData::ProcessingInstruction { .. } => return None,
	};

	for child in handle.children.borrow().iter() {
		if let Some(child) = convert_node(child) {
			node.push_child(child);
		}
	}

	Some(node)
}

// endregion: --- Parse

// region:    --- Serialize

/// Serializes a node, including itself (`outerHTML`) or only its children (`innerHTML`).
pub(crate) fn serialize(handle: &Handle, include_node: bool) -> Result<String> {
	// Children-only output names the parent so raw-text content (`script`, `style`) is not escaped.
	let traversal_scope = match handle.data() {
		NodeData::Document => TraversalScope::ChildrenOnly(None),
		_ if include_node => TraversalScope::IncludeNode,
		NodeData::Element { name, .. } => TraversalScope::ChildrenOnly(Some(name.clone())),
		_ => TraversalScope::ChildrenOnly(None),
	};
	let serialize_opts = SerializeOpts {
		traversal_scope,
		..Default::default()
	};

	let mut output = Vec::new();
	html5ever::serialize(&mut output, &SerializableHandle(handle.clone()), serialize_opts)?;

	let content =
		String::from_utf8(output).map_err(|err| Error::custom(format!("html5ever serialization non utf8. {err}")))?;
	Ok(content)
}

struct SerializableHandle(Handle);

enum SerializeOp {
	Open(Handle),
	Close(QualName),
}

impl Serialize for SerializableHandle {
	fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
	where
		S: Serializer,
	{
		let mut ops = VecDeque::new();
		match traversal_scope {
			TraversalScope::IncludeNode => ops.push_back(SerializeOp::Open(self.0.clone())),
			TraversalScope::ChildrenOnly(_) => ops.extend(self.0.children().into_iter().map(SerializeOp::Open)),
		}

		while let Some(op) = ops.pop_front() {
			match op {
				SerializeOp::Open(handle) => {
					match handle.data() {
						NodeData::Element { name, attrs, .. } => {
							let attrs = attrs.borrow();
							serializer.start_elem(name.clone(), attrs.iter().map(|at| (&at.name, &at.value[..])))?;
							ops.push_front(SerializeOp::Close(name.clone()));
						}
						NodeData::Doctype { name } => {
							serializer.write_doctype(name)?;
							continue;
						}
						NodeData::Text { contents } => {
							serializer.write_text(&contents.borrow())?;
							continue;
						}
						NodeData::Comment { contents } => {
							serializer.write_comment(contents)?;
							continue;
						}
						NodeData::Document => (),
					}
					for child in handle.children().into_iter().rev() {
						ops.push_front(SerializeOp::Open(child));
					}
				}
				SerializeOp::Close(name) => serializer.end_elem(name)?,
			}
		}

		Ok(())
	}
}

// endregion: --- Serialize

// region:    --- Tests

#[cfg(test)]
mod tests {
	use super::*;
	use crate::support::dom::html_name;
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

	#[test]
	fn test_markup_parse_fragment_returns_detached_nodes() -> Result<()> {
		// -- Setup & Fixtures
		let div = Handle::new_element(html_name("div"), Vec::new());
		let fx_html = r#"  <p class="a">Hello &amp; <b>bye</b></p><!-- note -->tail"#;

		// -- Exec
		let nodes = parse_fragment(&div, fx_html)?;

		// -- Check
		assert_eq!(nodes.len(), 4);
		assert!(nodes.iter().all(|n| n.parent().is_none()));
		assert_eq!(nodes[0].text_content(), "  ");
		assert_eq!(nodes[1].tag_name().as_deref(), Some("p"));
		assert_eq!(nodes[1].text_content(), "Hello & bye");
		assert!(matches!(nodes[2].data(), NodeData::Comment { .. }));
		assert_eq!(nodes[3].text_content(), "tail");

		Ok(())
	}

	#[test]
	fn test_markup_parse_fragment_table_context_keeps_rows() -> Result<()> {
		// -- Setup & Fixtures
		let table = Handle::new_element(html_name("table"), Vec::new());

		// -- Exec
		let nodes = parse_fragment(&table, "<tr><td>1</td></tr>")?;

		// -- Check
		assert_eq!(nodes.len(), 1);
		assert_eq!(nodes[0].tag_name().as_deref(), Some("tbody"));
		assert_eq!(serialize(&nodes[0], true)?, "<tbody><tr><td>1</td></tr></tbody>");

		Ok(())
	}

	#[test]
	fn test_markup_parse_fragment_raw_text_context() -> Result<()> {
		// -- Setup & Fixtures
		let script = Handle::new_element(html_name("script"), Vec::new());
		let textarea = Handle::new_element(html_name("textarea"), Vec::new());

		// -- Exec
		let script_nodes = parse_fragment(&script, "if (a<b) {}")?;
		let textarea_nodes = parse_fragment(&textarea, "<b>not bold</b>")?;

		// -- Check
		assert_eq!(script_nodes.len(), 1);
		assert_eq!(script_nodes[0].text_content(), "if (a<b) {}");
		assert_eq!(textarea_nodes.len(), 1);
		assert_eq!(textarea_nodes[0].text_content(), "<b>not bold</b>");

		Ok(())
	}

	#[test]
	fn test_markup_parse_fragment_rejects_non_element_context() -> Result<()> {
		// -- Setup & Fixtures
		let text = Handle::new_text("plain");

		// -- Exec
		let res = parse_fragment(&text, "<b>x</b>");

		// -- Check
		assert!(res.is_err(), "text node should not be a fragment context");

		Ok(())
	}

	#[test]
	fn test_markup_serialize_inner_and_outer() -> Result<()> {
		// -- Setup & Fixtures
		let div = Handle::new_element(html_name("div"), Vec::new());
		let nodes = parse_fragment(&div, r#"<ul id="list"><li>1</li><li>2 &lt; 3</li></ul>"#)?;
		let ul = nodes.first().ok_or("Should have ul")?;

		// -- Exec
		let inner = serialize(ul, false)?;
		let outer = serialize(ul, true)?;

		// -- Check
		assert_eq!(inner, "<li>1</li><li>2 &lt; 3</li>");
		assert_eq!(outer, r#"<ul id="list"><li>1</li><li>2 &lt; 3</li></ul>"#);

		Ok(())
	}

	#[test]
	fn test_markup_serialize_script_inner_unescaped() -> Result<()> {
		// -- Setup & Fixtures
		let script = Handle::new_element(html_name("script"), Vec::new());
		script.push_child(Handle::new_text("if (a<b && c) {}"));

		// -- Exec
		let inner = serialize(&script, false)?;
		let outer = serialize(&script, true)?;

		// -- Check
		assert_eq!(inner, "if (a<b && c) {}");
		assert_eq!(outer, "<script>if (a<b && c) {}</script>");

		Ok(())
	}

	#[test]
	fn test_markup_parse_document_keeps_doctype() -> Result<()> {
		// -- Setup & Fixtures
		let fx_html = "<!DOCTYPE html><html><head><title>T</title></head><body><p>x</p></body></html>";

		// -- Exec
		let document = parse_document(fx_html)?;
		let html = serialize(&document, false)?;

		// -- Check
		assert_eq!(
			html,
			"<!DOCTYPE html><html><head><title>T</title></head><body><p>x</p></body></html>"
		);

		Ok(())
	}
}

// endregion: --- Tests
