use anyhow::{Context, Result};

use crate::vartype::VarType;

const VARIANT_TRUE: i16 = -1;
const VARIANT_FALSE: i16 = 0;

/// A value that can be stored into a SafeArray slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Bstr(String),
    Bool(bool),
    I1(i8),
    I2(i16),
    I4(i32),
    I8(i64),
    UI1(u8),
    UI2(u16),
    UI4(u32),
    UI8(u64),
    R4(f32),
    R8(f64),
    Int(i32),
    UInt(u32),
    /// Currency, in ten-thousandths of a unit.
    Cy(i64),
    /// OLE Automation date: days since 1899-12-30, time as the fraction.
    Date(f64),
    /// SCODE
    Error(i32),
}

/// Eight byte, eight aligned scratch slot holding a scalar in native byte
/// order. `SafeArrayPutElement` reads `element_size` bytes from its start.
#[repr(C, align(8))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarSlot(pub [u8; 8]);

impl ScalarSlot {
    fn from_bytes(bytes: &[u8]) -> Self {
        let mut slot = [0u8; 8];
        slot[..bytes.len()].copy_from_slice(bytes);
        ScalarSlot(slot)
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_void {
        self.0.as_ptr().cast()
    }
}

impl Element {
    pub fn kind(&self) -> VarType {
        match self {
            Element::Bstr(_) => VarType::Bstr,
            Element::Bool(_) => VarType::Bool,
            Element::I1(_) => VarType::I1,
            Element::I2(_) => VarType::I2,
            Element::I4(_) => VarType::I4,
            Element::I8(_) => VarType::I8,
            Element::UI1(_) => VarType::UI1,
            Element::UI2(_) => VarType::UI2,
            Element::UI4(_) => VarType::UI4,
            Element::UI8(_) => VarType::UI8,
            Element::R4(_) => VarType::R4,
            Element::R8(_) => VarType::R8,
            Element::Int(_) => VarType::Int,
            Element::UInt(_) => VarType::UInt,
            Element::Cy(_) => VarType::Cy,
            Element::Date(_) => VarType::Date,
            Element::Error(_) => VarType::Error,
        }
    }

    /// Scalar representation handed to `SafeArrayPutElement` by address.
    /// Strings have none: the BSTR pointer itself is passed instead.
    pub fn scalar_slot(&self) -> Option<ScalarSlot> {
        let slot = match self {
            Element::Bstr(_) => return None,
            Element::Bool(b) => {
                let raw = if *b { VARIANT_TRUE } else { VARIANT_FALSE };
                ScalarSlot::from_bytes(&raw.to_ne_bytes())
            }
            Element::I1(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::I2(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::I4(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::I8(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::UI1(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::UI2(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::UI4(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::UI8(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::R4(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::R8(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::Int(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::UInt(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::Cy(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::Date(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
            Element::Error(v) => ScalarSlot::from_bytes(&v.to_ne_bytes()),
        };
        Some(slot)
    }

    /// Parse a textual value into an element of the given kind.
    pub fn parse(kind: VarType, text: &str) -> Result<Self> {
        let text = text.trim_matches(|c| c == '\r' || c == '\n');
        let element = match kind {
            VarType::Bstr => Element::Bstr(text.to_string()),
            VarType::Bool => Element::Bool(parse_bool(text)?),
            VarType::I1 => Element::I1(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::I2 => Element::I2(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::I4 => Element::I4(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::I8 => Element::I8(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::UI1 => Element::UI1(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::UI2 => Element::UI2(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::UI4 => Element::UI4(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::UI8 => Element::UI8(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::R4 => Element::R4(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::R8 => Element::R8(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::Int => Element::Int(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::UInt => Element::UInt(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::Cy => Element::Cy(parse_currency(text)?),
            VarType::Date => Element::Date(text.trim().parse().with_context(|| bad(kind, text))?),
            VarType::Error => Element::Error(parse_scode(text)?),
            other => return Err(anyhow::anyhow!("{} elements cannot be built from text", other)),
        };
        Ok(element)
    }
}

fn bad(kind: VarType, text: &str) -> String {
    format!("'{}' is not a valid {} value", text, kind)
}

fn parse_bool(text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(anyhow::anyhow!(bad(VarType::Bool, text))),
    }
}

/// "12.5" -> 125000. At most four fractional digits.
fn parse_currency(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let valid = !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.len() <= 4
        && fraction.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return Err(anyhow::anyhow!(bad(VarType::Cy, text)));
    }
    let scaled = format!("{}{}{:0<4}", if negative { "-" } else { "" }, whole, fraction);
    scaled.parse().with_context(|| bad(VarType::Cy, text))
}

/// Decimal or 0x-prefixed hex; hex is taken as the raw 32-bit pattern.
fn parse_scode(text: &str) -> Result<i32> {
    let trimmed = text.trim();
    match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16)
            .map(|v| v as i32)
            .with_context(|| bad(VarType::Error, text)),
        None => trimmed.parse().with_context(|| bad(VarType::Error, text)),
    }
}

impl From<&str> for Element {
    fn from(s: &str) -> Self {
        Element::Bstr(s.to_string())
    }
}

impl From<String> for Element {
    fn from(s: String) -> Self {
        Element::Bstr(s)
    }
}

impl From<bool> for Element {
    fn from(b: bool) -> Self {
        Element::Bool(b)
    }
}

impl From<i32> for Element {
    fn from(v: i32) -> Self {
        Element::I4(v)
    }
}

impl From<i64> for Element {
    fn from(v: i64) -> Self {
        Element::I8(v)
    }
}

impl From<u32> for Element {
    fn from(v: u32) -> Self {
        Element::UI4(v)
    }
}

impl From<f64> for Element {
    fn from(v: f64) -> Self {
        Element::R8(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Element::from("a").kind(), VarType::Bstr);
        assert_eq!(Element::from(true).kind(), VarType::Bool);
        assert_eq!(Element::from(7i32).kind(), VarType::I4);
        assert_eq!(Element::UI8(1).kind(), VarType::UI8);
    }

    #[test]
    fn test_bool_marshals_as_variant_bool() {
        let slot = Element::Bool(true).scalar_slot().unwrap();
        assert_eq!(i16::from_ne_bytes([slot.0[0], slot.0[1]]), -1);
        let slot = Element::Bool(false).scalar_slot().unwrap();
        assert_eq!(slot.0, [0u8; 8]);
    }

    #[test]
    fn test_scalar_slot_is_native_order() {
        let slot = Element::I4(0x0102_0304).scalar_slot().unwrap();
        assert_eq!(&slot.0[..4], &0x0102_0304i32.to_ne_bytes());
        assert_eq!(&slot.0[4..], &[0, 0, 0, 0]);
        let slot = Element::R8(1.5).scalar_slot().unwrap();
        assert_eq!(f64::from_ne_bytes(slot.0), 1.5);
    }

    #[test]
    fn test_scalar_slot_alignment() {
        assert_eq!(std::mem::align_of::<ScalarSlot>(), 8);
        let slot = Element::I8(-2).scalar_slot().unwrap();
        assert_eq!(slot.as_ptr() as usize % 8, 0);
    }

    #[test]
    fn test_strings_have_no_scalar_slot() {
        assert!(Element::from("abc").scalar_slot().is_none());
    }

    #[test]
    fn test_automation_kinds_have_scalar_slots() {
        let cases = [
            (Element::Int(-3), VarType::Int, (-3i32).to_ne_bytes().to_vec()),
            (Element::UInt(9), VarType::UInt, 9u32.to_ne_bytes().to_vec()),
            (Element::Cy(125_000), VarType::Cy, 125_000i64.to_ne_bytes().to_vec()),
            (Element::Date(45000.5), VarType::Date, 45000.5f64.to_ne_bytes().to_vec()),
            (Element::Error(0x8002_0004_u32 as i32), VarType::Error, 0x8002_0004_u32.to_ne_bytes().to_vec()),
        ];
        for (element, kind, bytes) in cases {
            assert_eq!(element.kind(), kind);
            let slot = element.scalar_slot().unwrap();
            assert_eq!(&slot.0[..bytes.len()], bytes.as_slice());
        }
    }

    #[test]
    fn test_parse_automation_kinds() {
        assert_eq!(Element::parse(VarType::Int, "-7").unwrap(), Element::Int(-7));
        assert_eq!(Element::parse(VarType::UInt, "7").unwrap(), Element::UInt(7));
        assert!(Element::parse(VarType::UInt, "-7").is_err());
        assert_eq!(Element::parse(VarType::Date, "45000.25").unwrap(), Element::Date(45000.25));
        assert_eq!(Element::parse(VarType::Error, "0x80020004").unwrap(), Element::Error(0x8002_0004_u32 as i32));
        assert_eq!(Element::parse(VarType::Error, "-5").unwrap(), Element::Error(-5));
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(Element::parse(VarType::Cy, "12.5").unwrap(), Element::Cy(125_000));
        assert_eq!(Element::parse(VarType::Cy, "-0.0001").unwrap(), Element::Cy(-1));
        assert_eq!(Element::parse(VarType::Cy, "3").unwrap(), Element::Cy(30_000));
        assert!(Element::parse(VarType::Cy, "1.23456").is_err());
        assert!(Element::parse(VarType::Cy, "abc").is_err());
        assert!(Element::parse(VarType::Cy, ".5").is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!(Element::parse(VarType::Bstr, "hello").unwrap(), Element::from("hello"));
        assert_eq!(Element::parse(VarType::I4, " 42 ").unwrap(), Element::I4(42));
        assert_eq!(Element::parse(VarType::Bool, "Yes").unwrap(), Element::Bool(true));
        assert_eq!(Element::parse(VarType::R8, "2.25").unwrap(), Element::R8(2.25));
        assert!(Element::parse(VarType::UI1, "300").is_err());
        assert!(Element::parse(VarType::Bool, "maybe").is_err());
        assert!(Element::parse(VarType::Dispatch, "x").is_err());
    }
}
