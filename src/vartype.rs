use serde::{Deserialize, Serialize};

/// VARTYPE codes understood by `SafeArrayCreateVector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u16)]
pub enum VarType {
    Empty = 0,
    Null = 1,
    I2 = 2,
    I4 = 3,
    R4 = 4,
    R8 = 5,
    Cy = 6,
    Date = 7,
    Bstr = 8,
    Dispatch = 9,
    Error = 10,
    Bool = 11,
    Variant = 12,
    Unknown = 13,
    Decimal = 14,
    I1 = 16,
    UI1 = 17,
    UI2 = 18,
    UI4 = 19,
    I8 = 20,
    UI8 = 21,
    Int = 22,
    UInt = 23,
}

const ALL: [VarType; 23] = [
    VarType::Empty,
    VarType::Null,
    VarType::I2,
    VarType::I4,
    VarType::R4,
    VarType::R8,
    VarType::Cy,
    VarType::Date,
    VarType::Bstr,
    VarType::Dispatch,
    VarType::Error,
    VarType::Bool,
    VarType::Variant,
    VarType::Unknown,
    VarType::Decimal,
    VarType::I1,
    VarType::UI1,
    VarType::UI2,
    VarType::UI4,
    VarType::I8,
    VarType::UI8,
    VarType::Int,
    VarType::UInt,
];

impl VarType {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        ALL.iter().copied().find(|vt| vt.code() == code)
    }

    pub fn name(self) -> &'static str {
        match self {
            VarType::Empty => "VT_EMPTY",
            VarType::Null => "VT_NULL",
            VarType::I2 => "VT_I2",
            VarType::I4 => "VT_I4",
            VarType::R4 => "VT_R4",
            VarType::R8 => "VT_R8",
            VarType::Cy => "VT_CY",
            VarType::Date => "VT_DATE",
            VarType::Bstr => "VT_BSTR",
            VarType::Dispatch => "VT_DISPATCH",
            VarType::Error => "VT_ERROR",
            VarType::Bool => "VT_BOOL",
            VarType::Variant => "VT_VARIANT",
            VarType::Unknown => "VT_UNKNOWN",
            VarType::Decimal => "VT_DECIMAL",
            VarType::I1 => "VT_I1",
            VarType::UI1 => "VT_UI1",
            VarType::UI2 => "VT_UI2",
            VarType::UI4 => "VT_UI4",
            VarType::I8 => "VT_I8",
            VarType::UI8 => "VT_UI8",
            VarType::Int => "VT_INT",
            VarType::UInt => "VT_UINT",
        }
    }

    /// Whether OLE Automation accepts this tag as a SafeArray element type.
    /// VT_EMPTY and VT_NULL are rejected by `SafeArrayCreateVector`.
    pub fn is_array_element(self) -> bool {
        !matches!(self, VarType::Empty | VarType::Null)
    }

    /// Whether an [`Element`](crate::Element) of this kind exists to put
    /// into such an array.
    pub fn has_element(self) -> bool {
        self.is_array_element()
            && !matches!(self, VarType::Variant | VarType::Decimal | VarType::Dispatch | VarType::Unknown)
    }
}

impl std::fmt::Display for VarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_oleauto() {
        assert_eq!(VarType::Bstr.code(), 8);
        assert_eq!(VarType::Bool.code(), 11);
        assert_eq!(VarType::Variant.code(), 12);
        assert_eq!(VarType::UInt.code(), 23);
    }

    #[test]
    fn test_from_code() {
        for vt in ALL {
            assert_eq!(VarType::from_code(vt.code()), Some(vt));
        }
        // 15 is unassigned
        assert_eq!(VarType::from_code(15), None);
        assert_eq!(VarType::from_code(0x2000), None);
    }

    #[test]
    fn test_empty_and_null_are_not_array_elements() {
        assert!(!VarType::Empty.is_array_element());
        assert!(!VarType::Null.is_array_element());
        assert!(VarType::Bstr.is_array_element());
        assert!(VarType::Variant.is_array_element());
    }

    #[test]
    fn test_has_element() {
        for vt in [VarType::Variant, VarType::Decimal, VarType::Dispatch, VarType::Unknown, VarType::Empty] {
            assert!(!vt.has_element(), "{}", vt);
        }
        for vt in [VarType::Int, VarType::UInt, VarType::Cy, VarType::Date, VarType::Error, VarType::Bstr] {
            assert!(vt.has_element(), "{}", vt);
        }
    }

    #[test]
    fn test_display_uses_vt_name() {
        assert_eq!(VarType::I4.to_string(), "VT_I4");
    }
}
