//! Core types for portkit.
//!
//! These types define the vocabulary shared by the engine, the drivers and the
//! standard controls: boundary status codes, callback results, native type
//! tags, child policies, creation parameters and colors.

use std::fmt;

use crate::engine::Handle;

// =============================================================================
// Status Codes
// =============================================================================

/// Ordinary function status: success.
pub const NOERROR: i32 = 0;
/// Ordinary function status: failure.
pub const ERROR: i32 = 1;
/// Returned by `Toolkit::popup`-style calls when the element was already shown.
pub const OPENED: i32 = -1;
/// Invalid position / id marker.
pub const INVALID: i32 = -1;

/// Id passed to indexed handlers when the attribute was addressed without one.
///
/// Controls treat it as "the current item" (the focus node of a tree, the
/// control itself for matrix colors).
pub const NO_ID: i32 = -1;

// =============================================================================
// Popup / Show Positions
// =============================================================================

pub const CENTER: i32 = 0xFFFF;
pub const LEFT: i32 = 0xFFFE;
pub const RIGHT: i32 = 0xFFFD;
pub const MOUSEPOS: i32 = 0xFFFC;
pub const CURRENT: i32 = 0xFFFB;
pub const CENTERPARENT: i32 = 0xFFFA;
pub const TOP: i32 = LEFT;
pub const BOTTOM: i32 = RIGHT;

// =============================================================================
// Callback Results
// =============================================================================

/// Value returned by application callbacks.
///
/// The negative sentinels are only ever callback results, never ordinary
/// function status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackResult {
    /// Suppress the native default behavior.
    Ignore,
    /// Nothing special, default processing.
    #[default]
    Default,
    /// Terminate the application loop.
    Close,
    /// Let the native default behavior proceed.
    Continue,
    /// Any other numeric result (positive values, selection indices...).
    Value(i32),
}

impl CallbackResult {
    /// Numeric code used at the boundary.
    pub const fn code(self) -> i32 {
        match self {
            Self::Ignore => -1,
            Self::Default => -2,
            Self::Close => -3,
            Self::Continue => -4,
            Self::Value(v) => v,
        }
    }

    /// Decode a numeric callback result.
    pub const fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::Ignore,
            -2 => Self::Default,
            -3 => Self::Close,
            -4 => Self::Continue,
            v => Self::Value(v),
        }
    }
}

// =============================================================================
// Native Type
// =============================================================================

/// Kind of native resource a class creates when mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NativeType {
    /// No native element (layout containers, timers).
    #[default]
    Void,
    Control,
    Canvas,
    Dialog,
    Image,
    Menu,
}

impl NativeType {
    /// Textual class type, as reported by `Toolkit::get_class_type`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Control => "control",
            Self::Canvas => "canvas",
            Self::Dialog => "dialog",
            Self::Image => "image",
            Self::Menu => "menu",
        }
    }
}

impl fmt::Display for NativeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Child Policy
// =============================================================================

/// How many children a class accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildType {
    #[default]
    None,
    One,
    Many,
}

impl fmt::Display for ChildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::One => "exactly-one",
            Self::Many => "many",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Native Handle
// =============================================================================

/// Opaque native resource identifier handed out by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

impl fmt::Display for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Creation Parameters
// =============================================================================

/// One positional creation parameter.
///
/// The class format string decides which variants are accepted:
/// `s` string, `h` handle, `g` handle list, `i` integer.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Str(String),
    Handle(Handle),
    Handles(Vec<Handle>),
    Int(i32),
}

impl Param {
    /// Format character this parameter satisfies.
    pub const fn format_char(&self) -> char {
        match self {
            Self::Str(_) => 's',
            Self::Handle(_) => 'h',
            Self::Handles(_) => 'g',
            Self::Int(_) => 'i',
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Self::Handle(h) => Some(*h),
            _ => None,
        }
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Param {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Handle> for Param {
    fn from(h: Handle) -> Self {
        Self::Handle(h)
    }
}

impl From<i32> for Param {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

// =============================================================================
// Key Codes
// =============================================================================

/// Key codes carried by `NativeEvent::Key` and passed to `K_ANY`.
///
/// Printable keys use their character code. Modifier state is or-ed in with
/// the masks below.
pub mod keys {
    pub const K_BS: i32 = 0x08;
    pub const K_TAB: i32 = 0x09;
    pub const K_CR: i32 = 0x0D;
    pub const K_SP: i32 = 0x20;
    pub const K_ESC: i32 = 0xFF1B;
    pub const K_HOME: i32 = 0xFF50;
    pub const K_LEFT: i32 = 0xFF51;
    pub const K_UP: i32 = 0xFF52;
    pub const K_RIGHT: i32 = 0xFF53;
    pub const K_DOWN: i32 = 0xFF54;
    pub const K_PGUP: i32 = 0xFF55;
    pub const K_PGDN: i32 = 0xFF56;
    pub const K_END: i32 = 0xFF57;
    pub const K_INS: i32 = 0xFF63;
    pub const K_DEL: i32 = 0xFFFF;
    pub const K_F1: i32 = 0xFFBE;
    pub const K_F2: i32 = 0xFFBF;

    pub const SHIFT_MASK: i32 = 0x1000_0000;
    pub const CTRL_MASK: i32 = 0x2000_0000;
    pub const ALT_MASK: i32 = 0x4000_0000;

    /// Strip modifier bits.
    pub const fn base(code: i32) -> i32 {
        code & 0x0FFF_FFFF
    }

    pub const fn is_ctrl(code: i32) -> bool {
        code & CTRL_MASK != 0
    }

    pub const fn is_shift(code: i32) -> bool {
        code & SHIFT_MASK != 0
    }
}

// =============================================================================
// Color
// =============================================================================

/// 8-bit RGB color in the attribute text form `"r g b"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Parse `"r g b"` (space, `;` or `,` separated) or `"#rrggbb"`.
    ///
    /// Components outside 0-255 make the whole value invalid.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return None;
            }
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Self::new(r, g, b));
        }

        let mut parts = value
            .split(|c: char| c == ' ' || c == ';' || c == ',')
            .filter(|p| !p.is_empty());
        let r = parts.next()?.parse::<u8>().ok()?;
        let g = parts.next()?.parse::<u8>().ok()?;
        let b = parts.next()?.parse::<u8>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(r, g, b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_codes() {
        assert_eq!(CallbackResult::Ignore.code(), -1);
        assert_eq!(CallbackResult::Default.code(), -2);
        assert_eq!(CallbackResult::Close.code(), -3);
        assert_eq!(CallbackResult::Continue.code(), -4);
        assert_eq!(CallbackResult::from_code(-3), CallbackResult::Close);
        assert_eq!(CallbackResult::from_code(7), CallbackResult::Value(7));
    }

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("255 0 0"), Some(Rgb::new(255, 0, 0)));
        assert_eq!(Rgb::parse("10;20;30"), Some(Rgb::new(10, 20, 30)));
        assert_eq!(Rgb::parse("#00ff10"), Some(Rgb::new(0, 255, 16)));
        assert_eq!(Rgb::parse("256 0 0"), None);
        assert_eq!(Rgb::parse("1 2"), None);
        assert_eq!(Rgb::parse("1 2 3 4"), None);
        assert_eq!(Rgb::new(1, 2, 3).to_string(), "1 2 3");
    }

    #[test]
    fn test_native_type_names() {
        assert_eq!(NativeType::Dialog.as_str(), "dialog");
        assert_eq!(NativeType::Void.to_string(), "void");
    }
}
