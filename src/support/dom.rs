//! A small live document tree.
//!
//! Nodes are reference counted (`Handle`); parents own their children and children point back
//! to their parent with a weak reference, so detached subtrees are freed with their last handle.
//!
//! The API mirrors the native document operations the modify layer relies on
//! (`createElement`, `setAttribute`, `classList.add`, `appendChild`, `addEventListener`, ...).

use crate::support::{markup, selector, style};
use crate::{Error, Result};
use markup5ever::{Attribute, LocalName, Namespace, QualName};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tendril::StrTendril;

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

// region:    --- Types

/// Listener callback. Receives the event and the node it is currently dispatched on.
///
/// Listeners are owned by their node. A closure that captures a `Handle` to that same node (or to
/// one of its descendants) forms an `Rc` cycle and the node is never freed. Reach the node through
/// the `&Handle` argument instead.
pub type Listener = Rc<dyn Fn(&Event, &Handle)>;

/// A reference to a node of a live tree. Cloning a handle does not clone the node.
#[derive(Clone)]
pub struct Handle(Rc<Node>);

pub(crate) struct Node {
	parent: RefCell<Option<Weak<Node>>>,
	children: RefCell<Vec<Handle>>,
	listeners: RefCell<Vec<(String, Listener)>>,
	data: NodeData,
}

pub enum NodeData {
	Document,
	Doctype {
		name: StrTendril,
	},
	Text {
		contents: RefCell<StrTendril>,
	},
	Comment {
		contents: StrTendril,
	},
	Element {
		name: QualName,
		attrs: RefCell<Vec<Attribute>>,
		/// Expando properties assigned directly on the handle. Never serialized.
		properties: RefCell<Vec<(String, Value)>>,
	},
}

/// An event to dispatch on a node.
#[derive(Debug, Clone)]
pub struct Event {
	event_type: String,
	bubbles: bool,
}

impl Event {
	/// A non-bubbling event (only the target's listeners run).
	pub fn new(event_type: impl Into<String>) -> Self {
		Self {
			event_type: event_type.into(),
			bubbles: false,
		}
	}

	/// An event that also runs the listeners of the target's ancestors.
	pub fn bubbling(event_type: impl Into<String>) -> Self {
		Self {
			event_type: event_type.into(),
			bubbles: true,
		}
	}

	pub fn event_type(&self) -> &str {
		&self.event_type
	}

	pub fn bubbles(&self) -> bool {
		self.bubbles
	}
}

// endregion: --- Types

// region:    --- Document

/// The root of a live tree and the factory for its nodes.
pub struct Document {
	root: Handle,
}

impl Document {
	/// Creates a document with an empty `<html><head></head><body></body></html>` skeleton.
	pub fn new() -> Self {
		let root = Handle::new(NodeData::Document);
		let html = Handle::new_element(html_name("html"), Vec::new());
		html.push_child(Handle::new_element(html_name("head"), Vec::new()));
		html.push_child(Handle::new_element(html_name("body"), Vec::new()));
		root.push_child(html);

		Self { root }
	}

	/// Parses a full HTML document into a live tree.
	pub fn parse(html_content: &str) -> Result<Self> {
		let root = markup::parse_document(html_content)?;
		Ok(Self { root })
	}

	/// The document node itself (the default root for lookups).
	pub fn document(&self) -> &Handle {
		&self.root
	}

	/// The `<html>` element, if any.
	pub fn document_element(&self) -> Option<Handle> {
		self.root.element_children().into_iter().next()
	}

	pub fn head(&self) -> Option<Handle> {
		self.document_element()?
			.element_children()
			.into_iter()
			.find(|el| el.tag_name().as_deref() == Some("head"))
	}

	pub fn body(&self) -> Option<Handle> {
		self.document_element()?
			.element_children()
			.into_iter()
			.find(|el| el.tag_name().as_deref() == Some("body"))
	}

	/// Creates a new, unattached element. ASCII letters of the tag name are lowercased.
	pub fn create_element(&self, tag_name: &str) -> Result<Handle> {
		if !is_valid_name(tag_name) {
			return Err(Error::InvalidTagName {
				name: tag_name.to_string(),
			});
		}
		let name = html_name(&tag_name.to_ascii_lowercase());
		Ok(Handle::new_element(name, Vec::new()))
	}

	/// Creates a new, unattached text node.
	pub fn create_text_node(&self, text: &str) -> Handle {
		Handle::new_text(text)
	}

	/// First element in tree order matching `selectors`.
	pub fn query_selector(&self, selectors: &str) -> Result<Option<Handle>> {
		self.root.query_selector(selectors)
	}

	/// Serializes the whole document.
	pub fn to_html(&self) -> Result<String> {
		self.root.inner_html()
	}
}

impl Default for Document {
	fn default() -> Self {
		Self::new()
	}
}

// endregion: --- Document

// region:    --- Handle Construction

impl Handle {
	pub(crate) fn new(data: NodeData) -> Self {
		Handle(Rc::new(Node {
			parent: RefCell::new(None),
			children: RefCell::new(Vec::new()),
			listeners: RefCell::new(Vec::new()),
			data,
		}))
	}

	pub(crate) fn new_element(name: QualName, attrs: Vec<Attribute>) -> Self {
		Self::new(NodeData::Element {
			name,
			attrs: RefCell::new(attrs),
			properties: RefCell::new(Vec::new()),
		})
	}

	pub(crate) fn new_text(text: &str) -> Self {
		Self::new(NodeData::Text {
			contents: RefCell::new(StrTendril::from_slice(text)),
		})
	}

	/// Appends a fresh, parentless node without hierarchy checks. Used when building parsed trees.
	pub(crate) fn push_child(&self, child: Handle) {
		*child.0.parent.borrow_mut() = Some(Rc::downgrade(&self.0));
		self.0.children.borrow_mut().push(child);
	}
}

// endregion: --- Handle Construction

// region:    --- Tree Navigation

impl Handle {
	pub fn data(&self) -> &NodeData {
		&self.0.data
	}

	pub fn ptr_eq(&self, other: &Handle) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	pub fn is_element(&self) -> bool {
		matches!(self.0.data, NodeData::Element { .. })
	}

	pub fn parent(&self) -> Option<Handle> {
		self.0.parent.borrow().as_ref().and_then(Weak::upgrade).map(Handle)
	}

	/// Snapshot of the child nodes. Later mutations of the tree do not affect the returned list.
	pub fn children(&self) -> Vec<Handle> {
		self.0.children.borrow().clone()
	}

	pub fn element_children(&self) -> Vec<Handle> {
		self.0.children.borrow().iter().filter(|c| c.is_element()).cloned().collect()
	}

	pub fn has_child_nodes(&self) -> bool {
		!self.0.children.borrow().is_empty()
	}

	pub fn last_child(&self) -> Option<Handle> {
		self.0.children.borrow().last().cloned()
	}

	/// The element sibling right before this node, if any.
	pub fn previous_element_sibling(&self) -> Option<Handle> {
		let parent = self.parent()?;
		let siblings = parent.0.children.borrow();
		let idx = siblings.iter().position(|s| s.ptr_eq(self))?;
		siblings[..idx].iter().rev().find(|s| s.is_element()).cloned()
	}

	/// The element sibling right after this node, if any.
	pub fn next_element_sibling(&self) -> Option<Handle> {
		let parent = self.parent()?;
		let siblings = parent.0.children.borrow();
		let idx = siblings.iter().position(|s| s.ptr_eq(self))?;
		siblings[idx + 1..].iter().find(|s| s.is_element()).cloned()
	}

	pub fn first_element_child(&self) -> Option<Handle> {
		self.0.children.borrow().iter().find(|c| c.is_element()).cloned()
	}

	/// The shared node, for identity comparisons that outlive a borrow (selector matching).
	pub(crate) fn node(&self) -> &Node {
		&self.0
	}

	/// Whether `self` is `other` or one of its ancestors.
	pub fn is_inclusive_ancestor_of(&self, other: &Handle) -> bool {
		let mut current = Some(other.clone());
		while let Some(node) = current {
			if node.ptr_eq(self) {
				return true;
			}
			current = node.parent();
		}
		false
	}

	/// Descendants in tree order (pre-order), excluding `self`.
	pub fn descendants(&self) -> Vec<Handle> {
		let mut out = Vec::new();
		let mut stack: Vec<Handle> = self.0.children.borrow().iter().rev().cloned().collect();
		while let Some(node) = stack.pop() {
			stack.extend(node.0.children.borrow().iter().rev().cloned());
			out.push(node);
		}
		out
	}

	/// First descendant element matching `selectors` (comma separated list), in tree order.
	///
	/// Ancestors outside `self` still take part in combinator matching, as with `querySelector`.
	/// `:scope` refers to `self` when it is an element.
	pub fn query_selector(&self, selectors: &str) -> Result<Option<Handle>> {
		let selector_list = selector::SelectorList::parse(selectors)?;
		let scope = self.is_element().then_some(self);
		Ok(self
			.descendants()
			.into_iter()
			.find(|node| node.is_element() && selector_list.matches_in_scope(node, scope)))
	}
}

// endregion: --- Tree Navigation

// region:    --- Tree Mutation

impl Handle {
	/// Appends `child` as the last child, moving it out of its current parent if it has one.
	pub fn append_child(&self, child: &Handle) -> Result<()> {
		let parent_can_hold = matches!(self.0.data, NodeData::Element { .. } | NodeData::Document);
		if !parent_can_hold || matches!(child.0.data, NodeData::Document) || child.is_inclusive_ancestor_of(self) {
			return Err(Error::HierarchyRequest {
				parent: format!("{self:?}"),
				child: format!("{child:?}"),
			});
		}

		child.detach()?;

		self.0
			.children
			.try_borrow_mut()
			.map_err(|err| Error::custom(format!("Node children already borrowed: {err}")))?
			.push(child.clone());
		*child.0.parent.borrow_mut() = Some(Rc::downgrade(&self.0));

		tracing::trace!(parent = ?self, child = ?child, "append_child");
		Ok(())
	}

	/// Removes `child` from this node's children.
	pub fn remove_child(&self, child: &Handle) -> Result<()> {
		let mut children = self
			.0
			.children
			.try_borrow_mut()
			.map_err(|err| Error::custom(format!("Node children already borrowed: {err}")))?;
		let idx = children.iter().position(|c| c.ptr_eq(child)).ok_or(Error::NotFound)?;
		children.remove(idx);
		drop(children);

		*child.0.parent.borrow_mut() = None;

		tracing::trace!(parent = ?self, child = ?child, "remove_child");
		Ok(())
	}

	/// Removes this node from its parent, if it has one.
	pub fn detach(&self) -> Result<()> {
		match self.parent() {
			Some(parent) => parent.remove_child(self),
			None => Ok(()),
		}
	}

	fn remove_all_children(&self) -> Result<()> {
		for child in self.children() {
			self.remove_child(&child)?;
		}
		Ok(())
	}
}

// endregion: --- Tree Mutation

// region:    --- Attributes

impl Handle {
	/// Local tag name of an element (`None` for other nodes).
	pub fn tag_name(&self) -> Option<String> {
		match &self.0.data {
			NodeData::Element { name, .. } => Some(name.local.to_string()),
			_ => None,
		}
	}

	pub fn get_attribute(&self, name: &str) -> Option<String> {
		let NodeData::Element { attrs, .. } = &self.0.data else {
			return None;
		};
		let name = name.to_ascii_lowercase();
		attrs
			.borrow()
			.iter()
			.find(|attr| attr.name.local.as_ref() == name)
			.map(|attr| attr.value.to_string())
	}

	pub fn has_attribute(&self, name: &str) -> bool {
		self.get_attribute(name).is_some()
	}

	/// Sets an attribute. The name is lowercased and must be a valid attribute name.
	pub fn set_attribute(&self, name: &str, value: &str) -> Result<()> {
		if !is_valid_name(name) {
			return Err(Error::InvalidAttributeName { name: name.to_string() });
		}
		let attrs = self.element_attrs()?;
		let mut attrs = attrs
			.try_borrow_mut()
			.map_err(|err| self.borrow_err("Attrs", err))?;

		let name = name.to_ascii_lowercase();
		match attrs.iter_mut().find(|attr| attr.name.local.as_ref() == name) {
			Some(attr) => attr.value = StrTendril::from_slice(value),
			None => attrs.push(Attribute {
				name: attr_name(&name),
				value: StrTendril::from_slice(value),
			}),
		}
		Ok(())
	}

	pub fn remove_attribute(&self, name: &str) -> Result<()> {
		let attrs = self.element_attrs()?;
		let name = name.to_ascii_lowercase();
		attrs
			.try_borrow_mut()
			.map_err(|err| self.borrow_err("Attrs", err))?
			.retain(|attr| attr.name.local.as_ref() != name);
		Ok(())
	}

	pub fn id(&self) -> Option<String> {
		self.get_attribute("id")
	}

	/// The deduplicated class tokens, in order.
	pub fn class_list(&self) -> Vec<String> {
		let mut tokens: Vec<String> = Vec::new();
		for token in self.get_attribute("class").unwrap_or_default().split_ascii_whitespace() {
			if !tokens.iter().any(|t| t == token) {
				tokens.push(token.to_string());
			}
		}
		tokens
	}

	pub fn has_class(&self, token: &str) -> bool {
		self.class_list().iter().any(|t| t == token)
	}

	/// Adds class tokens (set semantics). Empty tokens or tokens with whitespace are rejected
	/// before anything is changed.
	pub fn add_classes<S: AsRef<str>>(&self, tokens: &[S]) -> Result<()> {
		if let Some(bad) = tokens
			.iter()
			.map(AsRef::as_ref)
			.find(|t| t.is_empty() || t.chars().any(|c| c.is_ascii_whitespace()))
		{
			return Err(Error::InvalidClassToken { token: bad.to_string() });
		}

		let mut list = self.class_list();
		for token in tokens.iter().map(AsRef::as_ref) {
			if !list.iter().any(|t| t == token) {
				list.push(token.to_string());
			}
		}
		self.set_attribute("class", &list.join(" "))
	}

	fn borrow_err(&self, what: &str, err: impl fmt::Display) -> Error {
		Error::custom(format!(
			"{what} already borrowed for <{}>: {err}",
			self.tag_name().unwrap_or_default()
		))
	}

	fn element_attrs(&self) -> Result<&RefCell<Vec<Attribute>>> {
		match &self.0.data {
			NodeData::Element { attrs, .. } => Ok(attrs),
			_ => Err(Error::custom(format!("{self:?} is not an element"))),
		}
	}
}

// endregion: --- Attributes

// region:    --- Properties

impl Handle {
	/// Assigns a property directly on the element.
	///
	/// Reflected properties (`id`, `className`, `title`, `hidden`, `textContent`, `innerText`,
	/// `innerHTML`) update the tree; any other name is stored as an expando property that never
	/// shows up in the markup.
	pub fn set_property(&self, name: &str, value: Value) -> Result<()> {
		match name {
			"id" => self.set_attribute("id", &to_js_string(&value)),
			"className" => self.set_attribute("class", &to_js_string(&value)),
			"title" => self.set_attribute("title", &to_js_string(&value)),
			"hidden" if is_truthy(&value) => self.set_attribute("hidden", ""),
			"hidden" => self.remove_attribute("hidden"),
			"textContent" => self.set_text_content(&to_js_string(&value)),
			"innerText" => self.set_inner_text(&to_js_string(&value)),
			"innerHTML" => self.set_inner_html(&to_js_string(&value)),
			_ => {
				let NodeData::Element { properties, .. } = &self.0.data else {
					return Err(Error::custom(format!("{self:?} is not an element")));
				};
				let mut properties = properties
					.try_borrow_mut()
					.map_err(|err| self.borrow_err("Properties", err))?;
				match properties.iter_mut().find(|(n, _)| n == name) {
					Some(entry) => entry.1 = value,
					None => properties.push((name.to_string(), value)),
				}
				Ok(())
			}
		}
	}

	/// Reads a property back (reflected or expando).
	pub fn property(&self, name: &str) -> Option<Value> {
		let NodeData::Element { properties, .. } = &self.0.data else {
			return None;
		};
		match name {
			"id" => Some(Value::from(self.get_attribute("id").unwrap_or_default())),
			"className" => Some(Value::from(self.get_attribute("class").unwrap_or_default())),
			"title" => Some(Value::from(self.get_attribute("title").unwrap_or_default())),
			"hidden" => Some(Value::from(self.has_attribute("hidden"))),
			"textContent" | "innerText" => Some(Value::from(self.text_content())),
			"innerHTML" => self.inner_html().ok().map(Value::from),
			_ => properties.borrow().iter().find(|(n, _)| n == name).map(|(_, v)| v.clone()),
		}
	}
}

// endregion: --- Properties

// region:    --- Styles

impl Handle {
	/// Sets an inline style from its scripting name (`backgroundColor`). An empty value removes it.
	pub fn set_style(&self, name: &str, value: &str) -> Result<()> {
		self.set_style_property(&style::camel_to_kebab(name), value)
	}

	/// Sets an inline style property by its CSS name, custom properties included (`--accent`).
	/// An empty value removes it.
	///
	/// Like a style assignment in a browser, an unknown property name or a value that is not a
	/// single declaration value (`red; display: none`) is ignored and the `style` attribute is left untouched.
	pub fn set_style_property(&self, name: &str, value: &str) -> Result<()> {
		let name = style::normalize_name(name);
		let value = value.trim();
		if !value.is_empty() && !style::is_valid_declaration(&name, value) {
			tracing::debug!(%name, value, "ignored invalid inline style");
			return Ok(());
		}

		let mut decls = style::parse_declarations(&self.get_attribute("style").unwrap_or_default());
		style::set_declaration(&mut decls, &name, value);
		self.set_attribute("style", &style::serialize_declarations(&decls))
	}

	/// Value of an inline style property by CSS name.
	pub fn style_property(&self, name: &str) -> Option<String> {
		let name = style::normalize_name(name);
		style::parse_declarations(&self.get_attribute("style")?)
			.into_iter()
			.find(|(n, _)| *n == name)
			.map(|(_, v)| v)
	}
}

// endregion: --- Styles

// region:    --- Content

impl Handle {
	/// Concatenated text of all descendant text nodes.
	pub fn text_content(&self) -> String {
		if let NodeData::Text { contents } = &self.0.data {
			return contents.borrow().to_string();
		}
		let mut out = String::new();
		for node in self.descendants() {
			if let NodeData::Text { contents } = &node.0.data {
				out.push_str(&contents.borrow());
			}
		}
		out
	}

	/// Replaces the children with a single text node (none when `text` is empty).
	pub fn set_text_content(&self, text: &str) -> Result<()> {
		self.remove_all_children()?;
		if !text.is_empty() {
			self.append_child(&Handle::new_text(text))?;
		}
		Ok(())
	}

	/// Replaces the children with literal text; line breaks become `<br>` elements.
	pub fn set_inner_text(&self, text: &str) -> Result<()> {
		self.remove_all_children()?;
		let text = text.replace("\r\n", "\n").replace('\r', "\n");
		for (idx, line) in text.split('\n').enumerate() {
			if idx > 0 {
				self.append_child(&Handle::new_element(html_name("br"), Vec::new()))?;
			}
			if !line.is_empty() {
				self.append_child(&Handle::new_text(line))?;
			}
		}
		Ok(())
	}

	/// Replaces the children with the nodes parsed from `html_content`.
	pub fn set_inner_html(&self, html_content: &str) -> Result<()> {
		let nodes = markup::parse_fragment(self, html_content)?;
		self.remove_all_children()?;
		for node in nodes {
			self.append_child(&node)?;
		}
		Ok(())
	}

	pub fn inner_html(&self) -> Result<String> {
		markup::serialize(self, false)
	}

	pub fn outer_html(&self) -> Result<String> {
		markup::serialize(self, true)
	}
}

// endregion: --- Content

// region:    --- Events

impl Handle {
	/// Registers a listener. Listeners are never deduplicated.
	pub fn add_event_listener(&self, event_type: &str, listener: Listener) -> Result<()> {
		self.0
			.listeners
			.try_borrow_mut()
			.map_err(|err| self.borrow_err("Listeners", err))?
			.push((event_type.to_string(), listener));
		Ok(())
	}

	pub fn listener_count(&self, event_type: &str) -> usize {
		self.0.listeners.borrow().iter().filter(|(t, _)| t == event_type).count()
	}

	/// Runs the matching listeners of this node, then of its ancestors if the event bubbles.
	/// Returns the number of listeners invoked.
	pub fn dispatch_event(&self, event: &Event) -> usize {
		let mut invoked = 0;
		let mut current = Some(self.clone());

		while let Some(node) = current {
			// snapshot, so listeners may register more listeners
			let listeners: Vec<Listener> = node
				.0
				.listeners
				.borrow()
				.iter()
				.filter(|(t, _)| t == event.event_type())
				.map(|(_, l)| l.clone())
				.collect();
			for listener in listeners {
				listener(event, &node);
				invoked += 1;
			}
			current = if event.bubbles() { node.parent() } else { None };
		}

		tracing::trace!(target_node = ?self, event = event.event_type(), invoked, "dispatch_event");
		invoked
	}
}

// endregion: --- Events

// region:    --- Debug & Equality

impl fmt::Debug for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0.data {
			NodeData::Document => write!(f, "#document"),
			NodeData::Doctype { name } => write!(f, "<!DOCTYPE {name}>"),
			NodeData::Text { .. } => write!(f, "#text"),
			NodeData::Comment { .. } => write!(f, "#comment"),
			NodeData::Element { name, .. } => match self.id() {
				Some(id) => write!(f, "<{}#{id}>", name.local),
				None => write!(f, "<{}>", name.local),
			},
		}
	}
}

impl PartialEq for Handle {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}

impl Eq for Handle {}

// endregion: --- Debug & Equality

// region:    --- Support

pub(crate) fn html_name(local: &str) -> QualName {
	QualName::new(None, Namespace::from(HTML_NS), LocalName::from(local))
}

fn attr_name(local: &str) -> QualName {
	QualName::new(None, Namespace::from(""), LocalName::from(local))
}

/// XML `Name`-like check, as used for element and attribute names.
fn is_valid_name(name: &str) -> bool {
	let mut chars = name.chars();
	let Some(first) = chars.next() else {
		return false;
	};
	let is_start = |c: char| c.is_ascii_alphabetic() || c == '_' || c == ':' || !c.is_ascii();
	is_start(first) && chars.all(|c| is_start(c) || c.is_ascii_digit() || c == '-' || c == '.')
}

/// String conversion of a property value, as a script engine would do it.
fn to_js_string(value: &Value) -> String {
	match value {
		Value::Null => "null".to_string(),
		Value::Bool(b) => b.to_string(),
		Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
			(Some(i), _, _) => i.to_string(),
			(_, Some(u), _) => u.to_string(),
			(_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
			_ => n.to_string(),
		},
		Value::String(s) => s.clone(),
		Value::Array(items) => items
			.iter()
			.map(|v| if v.is_null() { String::new() } else { to_js_string(v) })
			.collect::<Vec<_>>()
			.join(","),
		Value::Object(_) => "[object Object]".to_string(),
	}
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

// endregion: --- Support

// region:    --- Tests


// endregion: --- Tests
