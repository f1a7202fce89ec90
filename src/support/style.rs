//! Inline style declarations, as stored in the `style` attribute.

use cssparser::{ParseError, Parser, ParserInput, Token};
use lightningcss::properties::PropertyId;
use lightningcss::properties::custom::CustomPropertyName;

/// Parses a `style` attribute value into ordered `(property, value)` pairs.
///
/// Semicolons inside quotes or parentheses (e.g., `url(data:...;base64,...)`) do not split declarations.
/// Malformed declarations (no `:`, or an empty name) are dropped.
pub(crate) fn parse_declarations(css: &str) -> Vec<(String, String)> {
	let mut decls: Vec<(String, String)> = Vec::new();

	for raw in split_top_level(css, ';') {
		let Some((name, value)) = raw.split_once(':') else {
			continue;
		};
		let name = normalize_name(name.trim());
		let value = value.trim();
		if name.is_empty() || value.is_empty() {
			continue;
		}
		set_declaration(&mut decls, &name, value);
	}

	decls
}

/// Serializes declarations the way browsers write back a `style` attribute (`a: b; c: d;`).
pub(crate) fn serialize_declarations(decls: &[(String, String)]) -> String {
	decls
		.iter()
		.map(|(name, value)| format!("{name}: {value};"))
		.collect::<Vec<_>>()
		.join(" ")
}

/// Sets, replaces, or (when `value` is empty) removes a declaration, keeping the position of existing ones.
pub(crate) fn set_declaration(decls: &mut Vec<(String, String)>, name: &str, value: &str) {
	let value = value.trim();
	let existing = decls.iter().position(|(n, _)| n == name);

	match (existing, value.is_empty()) {
		(Some(idx), true) => {
			decls.remove(idx);
		}
		(Some(idx), false) => decls[idx].1 = value.to_string(),
		(None, true) => (),
		(None, false) => decls.push((name.to_string(), value.to_string())),
	}
}

/// Whether `name: value` can be stored as a single inline declaration.
///
/// `name` must be a known CSS property (or a `--custom` one). `value` must hold exactly one
/// declaration value: no `;`, `{` or `}`, no stray closing bracket, and every string and block closed.
pub(crate) fn is_valid_declaration(name: &str, value: &str) -> bool {
	is_known_property(name) && is_single_value(value)
}

pub(crate) fn is_known_property(name: &str) -> bool {
	!matches!(
		PropertyId::from(name),
		PropertyId::Custom(CustomPropertyName::Unknown(_))
	)
}

fn is_single_value(value: &str) -> bool {
	let mut input = ParserInput::new(value);
	let mut parser = Parser::new(&mut input);
	check_value_tokens(&mut parser).is_ok()
}

fn check_value_tokens<'i>(parser: &mut Parser<'i, '_>) -> core::result::Result<(), ParseError<'i, ()>> {
	loop {
		let start = parser.position();
		let token = match parser.next_including_whitespace_and_comments() {
			Ok(token) => token.clone(),
			Err(_) => return Ok(()),
		};
		match token {
			Token::Semicolon
			| Token::CurlyBracketBlock
			| Token::CloseCurlyBracket
			| Token::CloseParenthesis
			| Token::CloseSquareBracket
			| Token::BadString(_)
			| Token::BadUrl(_) => return Err(parser.new_custom_error(())),
			Token::QuotedString(_) => {
				if !is_closed_string(parser.slice_from(start)) {
					return Err(parser.new_custom_error(()));
				}
			}
			Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => {
				parser.parse_nested_block(check_value_tokens)?;
				let closer = if matches!(token, Token::SquareBracketBlock) { ']' } else { ')' };
				// the tokenizer closes blocks left open at the end of input
				if !parser.slice_from(start).ends_with(closer) {
					return Err(parser.new_custom_error(()));
				}
			}
			_ => (),
		}
	}
}

/// `raw` is a quoted string token as written, opening quote included.
fn is_closed_string(raw: &str) -> bool {
	let Some(quote) = raw.chars().next() else {
		return false;
	};
	let Some(body) = raw[quote.len_utf8()..].strip_suffix(quote) else {
		return false;
	};
	let trailing_backslashes = body.chars().rev().take_while(|c| *c == '\\').count();
	trailing_backslashes % 2 == 0
}

/// Custom properties (`--name`) are case-sensitive; everything else is lowercased.
pub(crate) fn normalize_name(name: &str) -> String {
	if name.starts_with("--") {
		name.to_string()
	} else {
		name.to_ascii_lowercase()
	}
}

/// Converts a scripting style name (`backgroundColor`, `cssFloat`, `webkitTransform`)
/// to its CSS property name (`background-color`, `float`, `-webkit-transform`).
///
/// Names already in CSS form (`background-color`, `--accent`) are returned as-is (lowercased unless custom).
pub(crate) fn camel_to_kebab(name: &str) -> String {
	if name.starts_with("--") || name.contains('-') {
		return normalize_name(name);
	}
	if name == "cssFloat" {
		return "float".to_string();
	}

	let mut out = String::with_capacity(name.len() + 4);
	for (idx, c) in name.chars().enumerate() {
		if c.is_ascii_uppercase() {
			out.push('-');
			out.push(c.to_ascii_lowercase());
		} else {
			out.push(c);
		}
		// vendor prefixes are written with a leading dash
		if idx == 0 && is_vendor_prefixed(name) {
			out.insert(0, '-');
		}
	}
	out
}

fn is_vendor_prefixed(name: &str) -> bool {
	["webkit", "moz", "ms"].iter().any(|prefix| {
		name.strip_prefix(prefix)
			.and_then(|rest| rest.chars().next())
			.is_some_and(|c| c.is_ascii_uppercase())
	})
}

/// Splits on `sep` outside of quotes and parentheses.
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut depth = 0usize;
	let mut quote: Option<char> = None;
	let mut start = 0;

	for (idx, c) in input.char_indices() {
		match (quote, c) {
			(Some(q), c) if c == q => quote = None,
			(Some(_), _) => (),
			(None, '"' | '\'') => quote = Some(c),
			(None, '(') => depth += 1,
			(None, ')') => depth = depth.saturating_sub(1),
			(None, c) if c == sep && depth == 0 => {
				parts.push(&input[start..idx]);
				start = idx + c.len_utf8();
			}
			_ => (),
		}
	}
	parts.push(&input[start..]);

	parts
}

// region:    --- Tests


// endregion: --- Tests
