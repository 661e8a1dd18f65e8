//! Built-in wire tags.

/// One-byte tags for the built-in value shapes.
///
/// Every value on the wire starts with one of these, or with a custom tag
/// registered in a [`ProcessorChain`](crate::ProcessorChain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BoTag {
    Undefined = 0,
    Null = 1,
    False = 2,
    True = 3,
    /// 8-byte little-endian IEEE-754 double.
    Number = 4,
    /// Framed UTF-8.
    String = 5,
    /// Framed raw bytes.
    Bytes = 6,
    /// 8-byte little-endian double, milliseconds since the Unix epoch.
    Timestamp = 7,
    /// `u32` element count, then each element.
    Array = 8,
    /// `u32` entry count, then framed key and value per entry.
    Object = 9,
}

/// Highest tag reserved for built-in shapes.
pub const RESERVED_TAG_MAX: u8 = BoTag::Object as u8;

/// Lowest tag a custom processor may claim.
pub const FIRST_CUSTOM_TAG: u8 = RESERVED_TAG_MAX + 1;

impl BoTag {
    /// Maps a tag byte to its built-in shape, or `None` for custom tags.
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => BoTag::Undefined,
            1 => BoTag::Null,
            2 => BoTag::False,
            3 => BoTag::True,
            4 => BoTag::Number,
            5 => BoTag::String,
            6 => BoTag::Bytes,
            7 => BoTag::Timestamp,
            8 => BoTag::Array,
            9 => BoTag::Object,
            _ => return None,
        })
    }

    /// Returns `true` if `byte` belongs to a built-in shape.
    #[inline]
    pub const fn is_reserved(byte: u8) -> bool {
        byte <= RESERVED_TAG_MAX
    }
}
