//! CSS selector parsing and matching against live elements.
//!
//! Parsing and matching are done by the `selectors` crate. The live `Handle` implements
//! `selectors::Element`, so the full selector grammar (`:nth-child()`, `:is()`, `:has()`,
//! attribute operators, combinators) matches nodes of a mutable tree.

use crate::support::dom::{Handle, NodeData};
use crate::{Error, Result};
use cssparser::ToCss;
use markup5ever::{LocalName, Namespace, ns};
use precomputed_hash::PrecomputedHash;
use selectors::attr::{AttrSelectorOperation, CaseSensitivity, NamespaceConstraint};
use selectors::bloom::BloomFilter;
use selectors::matching::{self, ElementSelectorFlags, MatchingContext};
use selectors::parser::{self, ParseRelative, SelectorParseErrorKind};
use selectors::{Element, OpaqueElement};
use std::fmt;

// region:    --- SelectorList

/// A comma separated list of complex selectors. Matches when any of them matches.
#[derive(Clone)]
pub struct SelectorList(parser::SelectorList<Simple>);

impl SelectorList {
	pub fn parse(selectors: &str) -> Result<Self> {
		let mut parser_input = cssparser::ParserInput::new(selectors);
		let mut parser = cssparser::Parser::new(&mut parser_input);
		let selector_list =
			parser::SelectorList::parse(&Parser, &mut parser, ParseRelative::No).map_err(|err| {
				Error::SelectorParse {
					selector: selectors.to_string(),
					cause: format!("{:?}", err.kind),
				}
			})?;

		Ok(Self(selector_list))
	}

	pub fn matches(&self, element: &Handle) -> bool {
		self.matches_in_scope(element, None)
	}

	/// Matches with `scope` as the `:scope` element (the root of the document otherwise).
	pub fn matches_in_scope(&self, element: &Handle, scope: Option<&Handle>) -> bool {
		let mut caches = matching::SelectorCaches::default();
		let mut context = MatchingContext::new(
			matching::MatchingMode::Normal,
			None,
			&mut caches,
			matching::QuirksMode::NoQuirks,
			matching::NeedsSelectorFlags::No,
			matching::MatchingForInvalidation::No,
		);
		context.scope_element = scope.map(|scope| scope.opaque());

		self.0
			.slice()
			.iter()
			.any(|selector| matching::matches_selector(selector, 0, None, element, &mut context))
	}
}

// endregion: --- SelectorList

// region:    --- Selector Impl

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parser;

impl<'i> parser::Parser<'i> for Parser {
	type Impl = Simple;
	type Error = SelectorParseErrorKind<'i>;

	fn parse_is_and_where(&self) -> bool {
		true
	}

	fn parse_has(&self) -> bool {
		true
	}
}

/// Selector implementation for the live tree. No interactive states, no pseudo-elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Simple;

impl parser::SelectorImpl for Simple {
	type AttrValue = CssString;
	type Identifier = CssLocalName;
	type LocalName = CssLocalName;
	type NamespacePrefix = CssLocalName;
	type NamespaceUrl = Namespace;
	type BorrowedNamespaceUrl = Namespace;
	type BorrowedLocalName = CssLocalName;

	type NonTSPseudoClass = NonTSPseudoClass;
	type PseudoElement = PseudoElement;

	type ExtraMatchingData<'a> = ();
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CssString(pub String);

impl From<&str> for CssString {
	fn from(val: &str) -> Self {
		Self(val.to_string())
	}
}

impl AsRef<str> for CssString {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl ToCss for CssString {
	fn to_css<W>(&self, dest: &mut W) -> fmt::Result
	where
		W: fmt::Write,
	{
		cssparser::serialize_string(&self.0, dest)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CssLocalName(pub LocalName);

impl From<&str> for CssLocalName {
	fn from(val: &str) -> Self {
		Self(LocalName::from(val))
	}
}

impl ToCss for CssLocalName {
	fn to_css<W>(&self, dest: &mut W) -> fmt::Result
	where
		W: fmt::Write,
	{
		dest.write_str(&self.0)
	}
}

impl PrecomputedHash for CssLocalName {
	fn precomputed_hash(&self) -> u32 {
		self.0.precomputed_hash()
	}
}

/// Uninhabited: `:hover` and friends have no meaning without a renderer, so they fail to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonTSPseudoClass {}

impl parser::NonTSPseudoClass for NonTSPseudoClass {
	type Impl = Simple;

	fn is_active_or_hover(&self) -> bool {
		match *self {}
	}

	fn is_user_action_state(&self) -> bool {
		match *self {}
	}
}

impl ToCss for NonTSPseudoClass {
	fn to_css<W>(&self, _dest: &mut W) -> fmt::Result
	where
		W: fmt::Write,
	{
		match *self {}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoElement {}

impl parser::PseudoElement for PseudoElement {
	type Impl = Simple;
}

impl ToCss for PseudoElement {
	fn to_css<W>(&self, _dest: &mut W) -> fmt::Result
	where
		W: fmt::Write,
	{
		match *self {}
	}
}

// endregion: --- Selector Impl

// region:    --- Element

impl Element for Handle {
	type Impl = Simple;

	fn opaque(&self) -> OpaqueElement {
		OpaqueElement::new(self.node())
	}

	fn parent_element(&self) -> Option<Self> {
		self.parent().filter(|parent| parent.is_element())
	}

	fn parent_node_is_shadow_root(&self) -> bool {
		false
	}

	fn containing_shadow_host(&self) -> Option<Self> {
		None
	}

	fn is_pseudo_element(&self) -> bool {
		false
	}

	fn prev_sibling_element(&self) -> Option<Self> {
		self.previous_element_sibling()
	}

	fn next_sibling_element(&self) -> Option<Self> {
		self.next_element_sibling()
	}

	fn first_element_child(&self) -> Option<Self> {
		Handle::first_element_child(self)
	}

	fn is_html_element_in_html_document(&self) -> bool {
		matches!(self.data(), NodeData::Element { name, .. } if name.ns == ns!(html))
	}

	fn has_local_name(&self, local_name: &CssLocalName) -> bool {
		matches!(self.data(), NodeData::Element { name, .. } if name.local == local_name.0)
	}

	fn has_namespace(&self, ns: &Namespace) -> bool {
		matches!(self.data(), NodeData::Element { name, .. } if name.ns == *ns)
	}

	fn is_same_type(&self, other: &Self) -> bool {
		match (self.data(), other.data()) {
			(NodeData::Element { name, .. }, NodeData::Element { name: other_name, .. }) => name == other_name,
			_ => false,
		}
	}

	fn attr_matches(
		&self,
		ns: &NamespaceConstraint<&Namespace>,
		local_name: &CssLocalName,
		operation: &AttrSelectorOperation<&CssString>,
	) -> bool {
		let NodeData::Element { attrs, .. } = self.data() else {
			return false;
		};
		attrs.borrow().iter().any(|attr| {
			!matches!(*ns, NamespaceConstraint::Specific(url) if *url != attr.name.ns)
				&& local_name.0 == attr.name.local
				&& operation.eval_str(&attr.value)
		})
	}

	fn match_non_ts_pseudo_class(&self, pc: &NonTSPseudoClass, _context: &mut MatchingContext<Simple>) -> bool {
		match *pc {}
	}

	fn match_pseudo_element(&self, pe: &PseudoElement, _context: &mut MatchingContext<Simple>) -> bool {
		match *pe {}
	}

	fn apply_selector_flags(&self, _flags: ElementSelectorFlags) {}

	fn is_link(&self) -> bool {
		matches!(self.tag_name().as_deref(), Some("a" | "area" | "link")) && self.has_attribute("href")
	}

	fn is_html_slot_element(&self) -> bool {
		false
	}

	fn has_id(&self, id: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
		self.id()
			.is_some_and(|value| case_sensitivity.eq(id.0.as_bytes(), value.as_bytes()))
	}

	fn has_class(&self, name: &CssLocalName, case_sensitivity: CaseSensitivity) -> bool {
		self.class_list()
			.iter()
			.any(|token| case_sensitivity.eq(name.0.as_bytes(), token.as_bytes()))
	}

	fn has_custom_state(&self, _name: &CssLocalName) -> bool {
		false
	}

	fn imported_part(&self, _name: &CssLocalName) -> Option<CssLocalName> {
		None
	}

	fn is_part(&self, _name: &CssLocalName) -> bool {
		false
	}

	/// Comments do not count; empty text nodes neither.
	fn is_empty(&self) -> bool {
		!self.children().iter().any(|child| match child.data() {
			NodeData::Element { .. } => true,
			NodeData::Text { contents } => !contents.borrow().is_empty(),
			_ => false,
		})
	}

	fn is_root(&self) -> bool {
		self.parent().is_some_and(|parent| matches!(parent.data(), NodeData::Document))
	}

	fn add_element_unique_hashes(&self, _filter: &mut BloomFilter) -> bool {
		false
	}
}

// endregion: --- Element

// region:    --- Tests


// endregion: --- Tests
