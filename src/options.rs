use crate::support::dom::{Event, Handle, Listener};
use serde_json::Value;
use std::rc::Rc;

// region:    --- OneOrMany

/// A single value or an ordered list of values, normalized to a list.
///
/// Lets `classes` and `children` take either one item or many (`"a"`, `["a", "b"]`, `handle`, `vec![h1, h2]`).
#[derive(Debug, Clone, PartialEq)]
pub struct OneOrMany<T>(Vec<T>);

impl<T> OneOrMany<T> {
	pub fn into_vec(self) -> Vec<T> {
		self.0
	}
}

impl From<&str> for OneOrMany<String> {
	fn from(val: &str) -> Self {
		Self(vec![val.to_string()])
	}
}

impl From<String> for OneOrMany<String> {
	fn from(val: String) -> Self {
		Self(vec![val])
	}
}

impl From<Vec<String>> for OneOrMany<String> {
	fn from(val: Vec<String>) -> Self {
		Self(val)
	}
}

impl From<Vec<&str>> for OneOrMany<String> {
	fn from(val: Vec<&str>) -> Self {
		Self(val.into_iter().map(String::from).collect())
	}
}

impl<const N: usize> From<[&str; N]> for OneOrMany<String> {
	fn from(val: [&str; N]) -> Self {
		Self(val.into_iter().map(String::from).collect())
	}
}

impl From<Handle> for OneOrMany<Handle> {
	fn from(val: Handle) -> Self {
		Self(vec![val])
	}
}

impl From<&Handle> for OneOrMany<Handle> {
	fn from(val: &Handle) -> Self {
		Self(vec![val.clone()])
	}
}

impl From<Vec<Handle>> for OneOrMany<Handle> {
	fn from(val: Vec<Handle>) -> Self {
		Self(val)
	}
}

impl<const N: usize> From<[Handle; N]> for OneOrMany<Handle> {
	fn from(val: [Handle; N]) -> Self {
		Self(val.into())
	}
}

// endregion: --- OneOrMany

// region:    --- ModifyOptions

/// What to apply to an element. Every field is optional; `None` (or an empty value) skips the step.
///
/// Fields are applied in declaration order (see `modify`).
/// Map-like fields are ordered `(name, value)` lists and are applied in insertion order.
#[derive(Clone, Default)]
pub struct ModifyOptions {
	pub id: Option<String>,
	pub classes: Option<Vec<String>>,
	pub attributes: Option<Vec<(String, String)>>,
	/// Assigned as properties on the handle, not as attributes.
	pub raw_attributes: Option<Vec<(String, Value)>>,
	pub html: Option<String>,
	pub text: Option<String>,
	pub parent: Option<Handle>,
	pub children: Option<Vec<Handle>>,
	pub on: Option<Vec<(String, Listener)>>,
	/// Registered exactly like `on` (the listeners stay after the first event).
	pub once: Option<Vec<(String, Listener)>>,
	pub styles: Option<Vec<(String, String)>>,
	pub css_vars: Option<Vec<(String, String)>>,
}

/// Builder
impl ModifyOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_id(mut self, id: impl Into<String>) -> Self {
		self.id = Some(id.into());
		self
	}

	/// Adds one or more class tokens.
	pub fn with_classes(mut self, classes: impl Into<OneOrMany<String>>) -> Self {
		self.classes.get_or_insert_with(Vec::new).extend(classes.into().into_vec());
		self
	}

	pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		push_entry(&mut self.attributes, name.into(), value.into());
		self
	}

	pub fn with_raw_attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		push_entry(&mut self.raw_attributes, name.into(), value.into());
		self
	}

	pub fn with_html(mut self, html: impl Into<String>) -> Self {
		self.html = Some(html.into());
		self
	}

	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	pub fn with_parent(mut self, parent: &Handle) -> Self {
		self.parent = Some(parent.clone());
		self
	}

	/// Adds one or more children, in order.
	pub fn with_children(mut self, children: impl Into<OneOrMany<Handle>>) -> Self {
		self.children.get_or_insert_with(Vec::new).extend(children.into().into_vec());
		self
	}

	pub fn with_on(mut self, event_type: impl Into<String>, listener: impl Fn(&Event, &Handle) + 'static) -> Self {
		let listener: Listener = Rc::new(listener);
		self.on.get_or_insert_with(Vec::new).push((event_type.into(), listener));
		self
	}

	pub fn with_once(mut self, event_type: impl Into<String>, listener: impl Fn(&Event, &Handle) + 'static) -> Self {
		let listener: Listener = Rc::new(listener);
		self.once.get_or_insert_with(Vec::new).push((event_type.into(), listener));
		self
	}

	/// Inline style by scripting name (`backgroundColor`) or CSS name (`background-color`).
	pub fn with_style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		push_entry(&mut self.styles, name.into(), value.into());
		self
	}

	/// Custom property, name kept verbatim (`--accent`).
	pub fn with_css_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		push_entry(&mut self.css_vars, name.into(), value.into());
		self
	}
}

fn push_entry<V>(entries: &mut Option<Vec<(String, V)>>, name: String, value: V) {
	entries.get_or_insert_with(Vec::new).push((name, value));
}

// endregion: --- ModifyOptions

// region:    --- Tests


// endregion: --- Tests
