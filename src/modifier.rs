use crate::support::dom::{Document, Handle};
use crate::{ModifyOptions, Result};

/// Applies `options` to `element` and returns the same element.
///
/// Steps run in this fixed order, each only when its option is present and non-empty:
/// id, classes, attributes, raw attributes, html, text, parent, children, on, once, styles, css vars.
/// `html` and `text` both replace the content, so `text` wins when both are given.
///
/// Errors from the tree are returned as-is. Steps applied before a failing step stay applied.
pub fn modify(element: &Handle, options: &ModifyOptions) -> Result<Handle> {
	tracing::debug!(element = ?element, "modify");

	if let Some(id) = options.id.as_deref().filter(|id| !id.is_empty()) {
		element.set_attribute("id", id)?;
	}

	if let Some(classes) = options.classes.as_deref().filter(|classes| !classes.is_empty()) {
		element.add_classes(classes)?;
	}

	if let Some(attributes) = &options.attributes {
		for (name, value) in attributes {
			element.set_attribute(name, value)?;
		}
	}

	if let Some(raw_attributes) = &options.raw_attributes {
		for (name, value) in raw_attributes {
			element.set_property(name, value.clone())?;
		}
	}

	if let Some(html) = options.html.as_deref().filter(|html| !html.is_empty()) {
		element.set_inner_html(html)?;
	}

	if let Some(text) = options.text.as_deref().filter(|text| !text.is_empty()) {
		element.set_inner_text(text)?;
	}

	if let Some(parent) = &options.parent {
		parent.append_child(element)?;
	}

	if let Some(children) = &options.children {
		for child in children {
			element.append_child(child)?;
		}
	}

	if let Some(on) = &options.on {
		for (event_type, listener) in on {
			element.add_event_listener(event_type, listener.clone())?;
		}
	}

	// NOTE: Same registration as `on`, so these listeners are not removed after their first call.
	if let Some(once) = &options.once {
		for (event_type, listener) in once {
			element.add_event_listener(event_type, listener.clone())?;
		}
	}

	if let Some(styles) = &options.styles {
		for (name, value) in styles {
			element.set_style(name, value)?;
		}
	}

	if let Some(css_vars) = &options.css_vars {
		for (name, value) in css_vars {
			element.set_style_property(name, value)?;
		}
	}

	Ok(element.clone())
}

/// Finds the first element matching `selector` under `root` (the document node when `None`),
/// and applies `options` to it when given.
///
/// No match is `Ok(None)`. An invalid selector is an error.
pub fn find(
	document: &Document,
	selector: &str,
	options: Option<&ModifyOptions>,
	root: Option<&Handle>,
) -> Result<Option<Handle>> {
	let root = root.unwrap_or(document.document());
	let Some(element) = root.query_selector(selector)? else {
		tracing::debug!(selector, "find - no match");
		return Ok(None);
	};

	if let Some(options) = options {
		modify(&element, options)?;
	}

	Ok(Some(element))
}

/// Creates a new, unattached element of `tag_name`, and applies `options` to it when given.
pub fn create(document: &Document, tag_name: &str, options: Option<&ModifyOptions>) -> Result<Handle> {
	let element = document.create_element(tag_name)?;

	if let Some(options) = options {
		modify(&element, options)?;
	}

	Ok(element)
}

/// Removes every child of `node`.
pub fn clear(node: &Handle) -> Result<()> {
	// children() is a snapshot, removals do not shift the iteration
	for child in node.children() {
		node.remove_child(&child)?;
	}
	Ok(())
}

/// Removes `node` from its parent. Does nothing when it has no parent.
pub fn remove(node: &Handle) -> Result<()> {
	if let Some(parent) = node.parent() {
		parent.remove_child(node)?;
	}
	Ok(())
}

// region:    --- Tests

#[cfg(test)]
mod tests {
	use super::*;
	use crate::support::dom::Event;
	use crate::Error;
	use std::cell::Cell;
	use std::rc::Rc;
	// General test functions use this local `Result<T>` for `Box<dyn Error>`.
	type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

	#[test]
	fn test_modifier_modify_id_only() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let el = doc.create_element("div")?;

		// -- Exec
		let res = modify(&el, &ModifyOptions::new().with_id("main"))?;

		// -- Check
		assert_eq!(res, el, "Should return the same handle");
		assert_eq!(el.outer_html()?, r#"<div id="main"></div>"#);

		Ok(())
	}

	#[test]
	fn test_modifier_modify_classes_union() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let el = doc.create_element("div")?;
		el.set_attribute("class", "a x")?;

		// -- Exec
		modify(&el, &ModifyOptions::new().with_classes("a"))?;
		modify(&el, &ModifyOptions::new().with_classes(["a", "b"]))?;
		modify(&el, &ModifyOptions::new().with_classes(["a", "b"]))?;

		// -- Check
		assert_eq!(el.class_list(), vec!["a", "x", "b"]);

		Ok(())
	}

	#[test]
	fn test_modifier_modify_empty_values_are_skipped() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let el = doc.create_element("div")?;
		el.set_inner_html("<b>keep</b>")?;
		let options = ModifyOptions {
			id: Some(String::new()),
			classes: Some(Vec::new()),
			html: Some(String::new()),
			text: Some(String::new()),
			..Default::default()
		};

		// -- Exec
		modify(&el, &options)?;

		// -- Check
		assert_eq!(el.outer_html()?, "<div><b>keep</b></div>");

		Ok(())
	}

	#[test]
	fn test_modifier_modify_text_wins_over_html() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let el = doc.create_element("div")?;

		// -- Exec
		modify(
			&el,
			&ModifyOptions::new().with_html("<b>bold</b>").with_text("<i>plain</i>"),
		)?;

		// -- Check
		assert_eq!(el.children().len(), 1);
		assert_eq!(el.text_content(), "<i>plain</i>");
		assert_eq!(el.inner_html()?, "&lt;i&gt;plain&lt;/i&gt;");

		Ok(())
	}

	#[test]
	fn test_modifier_modify_full_options() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let body = doc.body().ok_or("Should have body")?;
		let el = doc.create_element("section")?;
		let child_a = doc.create_element("span")?;
		let child_b = doc.create_element("em")?;

		// -- Exec
		modify(
			&el,
			&ModifyOptions::new()
				.with_id("card")
				.with_classes(["card", "wide"])
				.with_attr("data-Role", "panel")
				.with_raw_attr("title", "Tip")
				.with_raw_attr("customState", serde_json::json!({"open": true}))
				.with_html("<p>intro</p>")
				.with_parent(&body)
				.with_children(vec![child_a.clone(), child_b.clone()])
				.with_style("backgroundColor", "red")
				.with_css_var("--gap", "4px"),
		)?;

		// -- Check
		assert_eq!(body.last_child(), Some(el.clone()));
		assert_eq!(
			el.outer_html()?,
			r#"<section id="card" class="card wide" data-role="panel" title="Tip" style="background-color: red; --gap: 4px;"><p>intro</p><span></span><em></em></section>"#
		);
		assert_eq!(el.property("customState"), Some(serde_json::json!({"open": true})));
		assert_eq!(child_b.parent(), Some(el));

		Ok(())
	}

	#[test]
	fn test_modifier_create_html_in_context_dependent_elements() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();

		// -- Exec
		let table = create(&doc, "table", Some(&ModifyOptions::new().with_html("<tr><td>1</td></tr>")))?;
		let select = create(&doc, "select", Some(&ModifyOptions::new().with_html("<option>a<option>b")))?;
		let script = create(&doc, "script", Some(&ModifyOptions::new().with_html("if (a<b) {}")))?;
		let textarea = create(&doc, "textarea", Some(&ModifyOptions::new().with_html("<b>x</b>")))?;
		let div = create(&doc, "div", Some(&ModifyOptions::new().with_html("  <b>x</b>")))?;

		// -- Check
		assert_eq!(table.inner_html()?, "<tbody><tr><td>1</td></tr></tbody>");
		assert_eq!(select.element_children().len(), 2);
		assert_eq!(script.inner_html()?, "if (a<b) {}");
		assert!(textarea.element_children().is_empty());
		assert_eq!(textarea.text_content(), "<b>x</b>");
		assert_eq!(div.inner_html()?, "  <b>x</b>");

		Ok(())
	}

	#[test]
	fn test_modifier_modify_styles_with_separators_are_ignored() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let el = doc.create_element("div")?;

		// -- Exec
		modify(
			&el,
			&ModifyOptions::new()
				.with_style("color", "red; display: none")
				.with_style("notAProperty", "x")
				.with_style("backgroundImage", r#"url("data:image/png;base64,AAA")"#)
				.with_css_var("--gap", "1px; color: blue"),
		)?;

		// -- Check
		assert_eq!(
			el.get_attribute("style").as_deref(),
			Some(r#"background-image: url("data:image/png;base64,AAA");"#)
		);
		assert_eq!(el.style_property("display"), None);
		assert_eq!(el.style_property("color"), None);

		Ok(())
	}

	#[test]
	fn test_modifier_modify_children_moves_attached_node() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let old_parent = doc.create_element("div")?;
		let new_parent = doc.create_element("div")?;
		let child = doc.create_element("p")?;
		old_parent.append_child(&child)?;

		// -- Exec
		modify(&new_parent, &ModifyOptions::new().with_children(&child))?;
		modify(&new_parent, &ModifyOptions::new().with_children(&child))?;

		// -- Check
		assert!(!old_parent.has_child_nodes());
		assert_eq!(new_parent.children(), vec![child]);

		Ok(())
	}

	#[test]
	fn test_modifier_modify_error_keeps_earlier_steps() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let el = doc.create_element("div")?;

		// -- Exec
		let res = modify(
			&el,
			&ModifyOptions::new()
				.with_id("kept")
				.with_attr("bad name", "x")
				.with_text("never"),
		);

		// -- Check
		assert!(matches!(res, Err(Error::InvalidAttributeName { .. })));
		assert_eq!(el.id().as_deref(), Some("kept"));
		assert!(!el.has_child_nodes());

		Ok(())
	}

	#[test]
	fn test_modifier_modify_parent_cycle_is_error() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let outer = doc.create_element("div")?;
		let inner = doc.create_element("div")?;
		outer.append_child(&inner)?;

		// -- Exec
		let res = modify(&outer, &ModifyOptions::new().with_parent(&inner));

		// -- Check
		assert!(matches!(res, Err(Error::HierarchyRequest { .. })));

		Ok(())
	}

	#[test]
	fn test_modifier_modify_listeners_accumulate() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let el = doc.create_element("button")?;
		let first = Rc::new(Cell::new(0));
		let second = Rc::new(Cell::new(0));
		let (f, s) = (first.clone(), second.clone());

		// -- Exec
		modify(&el, &ModifyOptions::new().with_on("click", move |_, _| f.set(f.get() + 1)))?;
		modify(&el, &ModifyOptions::new().with_on("click", move |_, _| s.set(s.get() + 1)))?;
		let invoked = el.dispatch_event(&Event::new("click"));

		// -- Check
		assert_eq!(invoked, 2);
		assert_eq!(first.get(), 1);
		assert_eq!(second.get(), 1);
		assert_eq!(el.listener_count("click"), 2);

		Ok(())
	}

	#[test]
	fn test_modifier_modify_once_stays_registered() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let el = doc.create_element("button")?;
		let hits = Rc::new(Cell::new(0));
		let h = hits.clone();

		// -- Exec
		modify(&el, &ModifyOptions::new().with_once("click", move |ev, target| {
			assert_eq!(ev.event_type(), "click");
			assert_eq!(target.tag_name().as_deref(), Some("button"));
			h.set(h.get() + 1);
		}))?;
		el.dispatch_event(&Event::new("click"));
		el.dispatch_event(&Event::new("click"));

		// -- Check
		assert_eq!(hits.get(), 2);

		Ok(())
	}

	#[test]
	fn test_modifier_find_missing_is_none() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::parse(r#"<div id="present"></div>"#)?;

		// -- Exec
		let found = find(&doc, "#missing", Some(&ModifyOptions::new().with_id("x")), None)?;

		// -- Check
		assert!(found.is_none());
		assert!(!doc.to_html()?.contains(r#"id="x""#));

		Ok(())
	}

	#[test]
	fn test_modifier_find_with_options_and_root() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::parse(r#"<p class="t">outside</p><div id="scope"><p class="t">inside</p></div>"#)?;
		let scope = doc.query_selector("#scope")?.ok_or("Should have scope")?;

		// -- Exec
		let found = find(&doc, "p.t", Some(&ModifyOptions::new().with_classes("hit")), Some(&scope))?
			.ok_or("Should find p")?;

		// -- Check
		assert_eq!(found.text_content(), "inside");
		assert!(found.has_class("hit"));
		let outside = find(&doc, "p.t", None, None)?.ok_or("Should find p")?;
		assert!(!outside.has_class("hit"));

		Ok(())
	}

	#[test]
	fn test_modifier_find_structural_selector() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::parse("<ul><li>1</li><li>2</li><li>3</li></ul>")?;

		// -- Exec
		let found = find(&doc, "li:nth-child(2)", Some(&ModifyOptions::new().with_classes("active")), None)?
			.ok_or("Should find second li")?;

		// -- Check
		assert_eq!(found.text_content(), "2");
		assert!(found.has_class("active"));
		assert!(find(&doc, "ul > li:first-of-type.active", None, None)?.is_none());

		Ok(())
	}

	#[test]
	fn test_modifier_find_invalid_selector() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();

		// -- Exec
		let res = find(&doc, "div[", None, None);

		// -- Check
		assert!(matches!(res, Err(Error::SelectorParse { .. })));

		Ok(())
	}

	#[test]
	fn test_modifier_create_with_text_and_parent() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let root = doc.create_element("main")?;
		root.append_child(&doc.create_element("header")?)?;

		// -- Exec
		let el = create(&doc, "div", Some(&ModifyOptions::new().with_text("hi").with_parent(&root)))?;

		// -- Check
		assert_eq!(el.text_content(), "hi");
		assert_eq!(root.last_child(), Some(el));

		Ok(())
	}

	#[test]
	fn test_modifier_create_invalid_tag() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();

		// -- Exec
		let res = create(&doc, "not a tag", None);

		// -- Check
		assert!(matches!(res, Err(Error::InvalidTagName { .. })));

		Ok(())
	}

	#[test]
	fn test_modifier_clear_idempotent() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let node = create(&doc, "ul", Some(&ModifyOptions::new().with_html("<li>a</li><li>b</li>c")))?;
		let old_children = node.children();
		assert_eq!(old_children.len(), 3);

		// -- Exec
		clear(&node)?;
		clear(&node)?;

		// -- Check
		assert!(!node.has_child_nodes());
		assert!(old_children.iter().all(|c| c.parent().is_none()));

		Ok(())
	}

	#[test]
	fn test_modifier_remove() -> Result<()> {
		// -- Setup & Fixtures
		let doc = Document::new();
		let parent = doc.create_element("div")?;
		let child = create(&doc, "p", Some(&ModifyOptions::new().with_parent(&parent)))?;
		let orphan = doc.create_element("p")?;

		// -- Exec
		remove(&child)?;
		remove(&orphan)?;
		remove(&child)?;

		// -- Check
		assert!(!parent.has_child_nodes());
		assert!(child.parent().is_none());

		Ok(())
	}
}

// endregion: --- Tests
