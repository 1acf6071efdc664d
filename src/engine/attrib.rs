//! Attribute Store - Per-element name/value storage and text helpers.
//!
//! Every element owns one `AttributeStore` holding the raw string values that
//! were not consumed by a class handler. This module also owns the small text
//! grammars shared by the dispatch engine:
//! - indexed names (`TITLE5`, `BGCOLOR3:4`, `"2:7"`)
//! - the bulk `NAME=value, NAME2="quoted value"` mini-language
//! - strict numeric and boolean parsing used by the typed accessors

use std::collections::BTreeMap;

// =============================================================================
// Attribute Store
// =============================================================================

/// Ordered mapping from attribute name to an owned value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeStore {
    values: BTreeMap<String, String>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning the previous one.
    pub fn set(&mut self, name: &str, value: &str) -> Option<String> {
        self.values.insert(name.to_string(), value.to_string())
    }

    /// Remove a value, returning it.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Stored names in order.
    pub fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Internal names start with an underscore; they are never inherited and
/// never serialized.
pub fn is_internal(name: &str) -> bool {
    name.starts_with('_')
}

// =============================================================================
// Indexed Names
// =============================================================================

/// Id suffix parsed from an attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSuffix {
    One(i32),
    Two(i32, i32),
}

/// `TITLE` + 5 → `TITLE5`.
pub fn compose_id(name: &str, id: i32) -> String {
    format!("{name}{id}")
}

/// `BGCOLOR` + (3, 4) → `BGCOLOR3:4`.
pub fn compose_id2(name: &str, lin: i32, col: i32) -> String {
    format!("{name}{lin}:{col}")
}

/// Split a trailing id suffix off an attribute name.
///
/// Returns `None` when the name carries no numeric suffix.
pub fn split_id_suffix(name: &str) -> Option<(&str, IdSuffix)> {
    let (head, last) = split_trailing_digits(name)?;

    if let Some(head) = head.strip_suffix(':') {
        if let Some((base, first)) = split_trailing_digits(head) {
            return Some((base, IdSuffix::Two(first, last)));
        }
        return None;
    }

    Some((head, IdSuffix::One(last)))
}

fn split_trailing_digits(name: &str) -> Option<(&str, i32)> {
    let digits = name.bytes().rev().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let split = name.len() - digits;
    let value = name[split..].parse::<i32>().ok()?;
    Some((&name[..split], value))
}

// =============================================================================
// Bulk Mini-Language
// =============================================================================

/// Parse `NAME=value, NAME2="quoted, value", NAME3`.
///
/// A name without `=` means "unset" and yields `None`. Quoted values may
/// contain commas and `\"`.
pub fn parse_attribute_list(text: &str) -> Vec<(String, Option<String>)> {
    let mut result = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        // name
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            name.push(c);
            chars.next();
        }
        let name = name.trim().to_string();

        let value = match chars.next() {
            Some('=') => {
                skip_spaces(&mut chars);
                Some(read_value(&mut chars))
            }
            _ => None,
        };

        if !name.is_empty() {
            result.push((name, value));
        }

        // separator
        skip_spaces(&mut chars);
        match chars.peek() {
            Some(',') => {
                chars.next();
            }
            None => break,
            Some(_) => {}
        }
        if chars.peek().is_none() {
            break;
        }
    }

    result
}

fn skip_spaces(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn read_value(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut value = String::new();

    if chars.peek() == Some(&'"') {
        chars.next();
        while let Some(c) = chars.next() {
            match c {
                '\\' if chars.peek() == Some(&'"') => {
                    value.push('"');
                    chars.next();
                }
                '"' => break,
                c => value.push(c),
            }
        }
        return value;
    }

    while let Some(&c) = chars.peek() {
        if c == ',' {
            break;
        }
        value.push(c);
        chars.next();
    }
    value.trim_end().to_string()
}

/// Serialize stored values in the mini-language, skipping internal names.
pub fn format_attribute_list(store: &AttributeStore) -> String {
    store
        .iter()
        .filter(|(name, _)| !is_internal(name))
        .map(|(name, value)| format!("{name}={}", quote_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c == ',' || c == '=' || c == '"' || c.is_whitespace());
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

// =============================================================================
// Strict Parsing
// =============================================================================

/// Optional sign followed by decimal digits, surrounding whitespace allowed.
pub fn parse_int(value: &str) -> Option<i32> {
    let value = value.trim();
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse::<i32>().ok()
}

/// Decimal float; rejects `inf`/`nan` spellings.
pub fn parse_float(value: &str) -> Option<f32> {
    let value = value.trim();
    if value.is_empty()
        || !value
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return None;
    }
    value.parse::<f32>().ok()
}

/// Two integers separated by `sep` (e.g. `"640x480"`, `"3:4"`).
///
/// Either side may be missing (`"x480"`).
pub fn parse_int_pair(value: &str, sep: char) -> (Option<i32>, Option<i32>) {
    match value.split_once(sep) {
        Some((a, b)) => (parse_int(a), parse_int(b)),
        None => (parse_int(value), None),
    }
}

/// Two integers separated by any of `x`, `:`, `,`, `-` or a space.
///
/// A leading sign belongs to the first number.
pub fn parse_int_pair_any(value: &str) -> (Option<i32>, Option<i32>) {
    let value = value.trim();
    let split = value
        .char_indices()
        .skip(1)
        .find(|&(_, c)| matches!(c, 'x' | 'X' | ':' | ',' | '-' | ' '));
    match split {
        Some((i, c)) => (parse_int(&value[..i]), parse_int(&value[i + c.len_utf8()..])),
        None => (parse_int(value), None),
    }
}

/// `YES` / `ON` (case-insensitive) are true; everything else is false.
pub fn parse_boolean(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("YES") || value.eq_ignore_ascii_case("ON")
}

pub fn bool_str(value: bool) -> &'static str {
    if value { "YES" } else { "NO" }
}
