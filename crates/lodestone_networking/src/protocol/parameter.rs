//! # Entity Parameters
//!
//! Indexed, typed values attached to spawn and metadata messages.
//!
//! ## Encoding
//!
//! ```text
//! ┌───────────────────────┬─────────────┐
//! │ header: type<<5 | idx │ value       │  repeated
//! ├───────────────────────┴─────────────┤
//! │ 0x7F                                │  terminator
//! └─────────────────────────────────────┘
//! ```

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::buffer::{PacketReader, PacketWriter};

/// Largest index a parameter header can carry.
pub const MAX_PARAMETER_INDEX: u8 = 0x1F;

/// Byte that ends a parameter list.
pub const PARAMETER_LIST_END: u8 = 0x7F;

/// An item stack inside a parameter list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ItemSlot {
    /// Item id, `-1` for an empty slot.
    pub id: i16,
    /// Stack size.
    pub count: i8,
    /// Damage or data value.
    pub damage: i16,
}

impl ItemSlot {
    /// The empty slot. Encoded as a lone `-1`.
    pub const EMPTY: Self = Self {
        id: -1,
        count: 0,
        damage: 0,
    };

    /// Creates an item stack.
    #[inline]
    #[must_use]
    pub const fn new(id: i16, count: i8, damage: i16) -> Self {
        Self { id, count, damage }
    }

    /// Returns true for the empty slot.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.id == -1
    }
}

/// The value half of a parameter.
#[derive(Clone, Debug)]
pub enum ParameterValue {
    /// Type 0.
    Byte(i8),
    /// Type 1.
    Short(i16),
    /// Type 2.
    Int(i32),
    /// Type 3.
    Float(f32),
    /// Type 4.
    String(String),
    /// Type 5.
    Item(ItemSlot),
    /// Type 6.
    Coordinates([i32; 3]),
}

impl ParameterValue {
    /// Wire type tag (upper three bits of the header).
    #[must_use]
    pub const fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => 0,
            Self::Short(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::String(_) => 4,
            Self::Item(_) => 5,
            Self::Coordinates(_) => 6,
        }
    }
}

// Floats compare by bit pattern so that an unchanged NaN is not "dirty"
// on every tick.
impl PartialEq for ParameterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Item(a), Self::Item(b)) => a == b,
            (Self::Coordinates(a), Self::Coordinates(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParameterValue {}

/// One indexed entity parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    /// Slot index, `0..=31`.
    pub index: u8,
    /// Typed value.
    pub value: ParameterValue,
}

impl Parameter {
    /// Creates a parameter.
    #[inline]
    #[must_use]
    pub const fn new(index: u8, value: ParameterValue) -> Self {
        Self { index, value }
    }

    /// Byte parameter.
    #[must_use]
    pub const fn byte(index: u8, value: i8) -> Self {
        Self::new(index, ParameterValue::Byte(value))
    }

    /// Short parameter.
    #[must_use]
    pub const fn short(index: u8, value: i16) -> Self {
        Self::new(index, ParameterValue::Short(value))
    }

    /// Int parameter.
    #[must_use]
    pub const fn int(index: u8, value: i32) -> Self {
        Self::new(index, ParameterValue::Int(value))
    }

    /// Float parameter.
    #[must_use]
    pub const fn float(index: u8, value: f32) -> Self {
        Self::new(index, ParameterValue::Float(value))
    }

    /// String parameter.
    #[must_use]
    pub fn string(index: u8, value: impl Into<String>) -> Self {
        Self::new(index, ParameterValue::String(value.into()))
    }

    fn header(&self) -> ProtocolResult<u8> {
        if self.index > MAX_PARAMETER_INDEX {
            return Err(ProtocolError::Malformed(format!(
                "parameter index {} exceeds {MAX_PARAMETER_INDEX}",
                self.index
            )));
        }
        let header = (self.value.type_id() << 5) | self.index;
        if header == PARAMETER_LIST_END {
            return Err(ProtocolError::Malformed(
                "float parameter at index 31 collides with the list terminator".into(),
            ));
        }
        Ok(header)
    }
}

fn write_item(out: &mut PacketWriter, item: &ItemSlot) {
    out.write_i16(item.id);
    if !item.is_empty() {
        out.write_i8(item.count);
        out.write_i16(item.damage);
    }
}

fn read_item(input: &mut PacketReader<'_>) -> ProtocolResult<ItemSlot> {
    let id = input.read_i16()?;
    if id == -1 {
        return Ok(ItemSlot::EMPTY);
    }
    Ok(ItemSlot::new(id, input.read_i8()?, input.read_i16()?))
}

/// Writes a terminated parameter list.
///
/// # Errors
///
/// Fails on an out-of-range index or an oversized string. The writer may
/// hold a partial list afterwards.
pub fn write_parameters(out: &mut PacketWriter, parameters: &[Parameter]) -> ProtocolResult<()> {
    for parameter in parameters {
        out.write_u8(parameter.header()?);
        match &parameter.value {
            ParameterValue::Byte(v) => out.write_i8(*v),
            ParameterValue::Short(v) => out.write_i16(*v),
            ParameterValue::Int(v) => out.write_i32(*v),
            ParameterValue::Float(v) => out.write_f32(*v),
            ParameterValue::String(v) => out.write_string(v)?,
            ParameterValue::Item(item) => write_item(out, item),
            ParameterValue::Coordinates([x, y, z]) => {
                out.write_i32(*x);
                out.write_i32(*y);
                out.write_i32(*z);
            }
        }
    }
    out.write_u8(PARAMETER_LIST_END);
    Ok(())
}

/// Reads a parameter list up to and including its terminator.
///
/// # Errors
///
/// [`ProtocolError::Malformed`] on an unknown type tag,
/// [`ProtocolError::Truncated`] if the terminator never arrives.
pub fn read_parameters(input: &mut PacketReader<'_>) -> ProtocolResult<Vec<Parameter>> {
    let mut parameters = Vec::new();
    loop {
        let header = input.read_u8()?;
        if header == PARAMETER_LIST_END {
            return Ok(parameters);
        }

        let index = header & MAX_PARAMETER_INDEX;
        let value = match header >> 5 {
            0 => ParameterValue::Byte(input.read_i8()?),
            1 => ParameterValue::Short(input.read_i16()?),
            2 => ParameterValue::Int(input.read_i32()?),
            3 => ParameterValue::Float(input.read_f32()?),
            4 => ParameterValue::String(input.read_string()?),
            5 => ParameterValue::Item(read_item(input)?),
            6 => ParameterValue::Coordinates([
                input.read_i32()?,
                input.read_i32()?,
                input.read_i32()?,
            ]),
            other => {
                return Err(ProtocolError::Malformed(format!(
                    "unknown parameter type {other}"
                )))
            }
        };
        parameters.push(Parameter { index, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_packing() {
        let mut writer = PacketWriter::new();
        write_parameters(&mut writer, &[Parameter::byte(16, -1), Parameter::int(17, 300)]).unwrap();

        assert_eq!(
            writer.as_slice(),
            &[0x10, 0xFF, 0x51, 0x00, 0x00, 0x01, 0x2C, PARAMETER_LIST_END]
        );
    }

    #[test]
    fn test_every_type_survives() {
        let list = vec![
            Parameter::byte(0, 3),
            Parameter::short(1, -300),
            Parameter::int(2, 70_000),
            Parameter::float(3, 0.5),
            Parameter::string(4, "Notch"),
            Parameter::new(5, ParameterValue::Item(ItemSlot::new(276, 1, 12))),
            Parameter::new(6, ParameterValue::Item(ItemSlot::EMPTY)),
            Parameter::new(7, ParameterValue::Coordinates([1, -2, 3])),
        ];

        let mut writer = PacketWriter::new();
        write_parameters(&mut writer, &list).unwrap();
        let mut reader = PacketReader::new(writer.as_slice());

        assert_eq!(read_parameters(&mut reader).unwrap(), list);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_empty_item_is_two_bytes() {
        let mut writer = PacketWriter::new();
        write_parameters(&mut writer, &[Parameter::new(0, ParameterValue::Item(ItemSlot::EMPTY))])
            .unwrap();

        assert_eq!(writer.as_slice(), &[0xA0, 0xFF, 0xFF, PARAMETER_LIST_END]);
    }

    #[test]
    fn test_rejects_bad_index() {
        let mut writer = PacketWriter::new();
        assert!(write_parameters(&mut writer, &[Parameter::byte(32, 0)]).is_err());
        assert!(write_parameters(&mut writer, &[Parameter::float(31, 0.0)]).is_err());
    }

    #[test]
    fn test_missing_terminator_is_truncated() {
        let mut reader = PacketReader::new(&[0x00, 0x05]);
        assert!(matches!(
            read_parameters(&mut reader),
            Err(ProtocolError::Truncated { .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        // type 7, index 0
        let mut reader = PacketReader::new(&[0xE0, 0x00]);
        assert!(matches!(read_parameters(&mut reader), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn test_nan_equals_itself() {
        let a = Parameter::float(3, f32::NAN);
        assert_eq!(a, a.clone());
        assert_ne!(Parameter::float(3, 0.0), Parameter::float(3, -0.0));
    }
}
