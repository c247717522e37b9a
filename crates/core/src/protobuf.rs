//! A flat protobuf subset: tagged fields against a fixed schema.
//!
//! Only what the dag-pb and UnixFS messages need is supported: varint fields
//! and length-delimited byte fields, with no nested decoding. Nested messages
//! are carried as raw bytes and parsed by the caller against their own schema.

use crate::varint;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Protobuf wire types understood by the parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// int32, int64, uint32, uint64, bool, enum.
    Varint = 0,
    /// 64-bit sizes. This subset reads the value as a trailing varint.
    Fixed64 = 1,
    /// Strings, bytes, embedded messages.
    VarLength = 2,
}

impl WireType {
    fn from_tag(tag: u64) -> Option<Self> {
        match tag & 0x07 {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::VarLength),
            _ => None,
        }
    }
}

/// One field declaration in a schema.
#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub wire_type: WireType,
    pub repeated: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, wire_type: WireType) -> Self {
        Self {
            name,
            wire_type,
            repeated: false,
        }
    }

    pub const fn repeated(name: &'static str, wire_type: WireType) -> Self {
        Self {
            name,
            wire_type,
            repeated: true,
        }
    }
}

/// An ordered field list. A field's number is its 1-based position.
#[derive(Clone, Copy, Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

impl Schema {
    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    fn field(&self, name: &str) -> Result<(u64, &FieldDef)> {
        let index = self.position(name).ok_or_else(|| {
            Error::FormatViolation(format!("field {name} is not part of {}", self.name))
        })?;
        Ok((index as u64 + 1, &self.fields[index]))
    }

    /// Encoded tag for a field: `varint((position << 3) | wire_type)`.
    pub fn encode_tag(&self, name: &str) -> Result<Vec<u8>> {
        let (number, field) = self.field(name)?;
        Ok(varint::encode((number << 3) | field.wire_type as u64))
    }
}

/// A decoded field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Varint(u64),
    Bytes(Vec<u8>),
}

/// The result of parsing a buffer against a schema.
#[derive(Clone, Debug, Default)]
pub struct Message {
    fields: BTreeMap<&'static str, Vec<FieldValue>>,
}

impl Message {
    /// Whether the field occurred at least once.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All stored values of a field, in order of occurrence.
    pub fn values(&self, name: &str) -> &[FieldValue] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first value of a varint field.
    pub fn varint(&self, name: &str) -> Result<Option<u64>> {
        match self.values(name).first() {
            None => Ok(None),
            Some(FieldValue::Varint(v)) => Ok(Some(*v)),
            Some(FieldValue::Bytes(_)) => Err(Error::FormatViolation(format!(
                "field {name} holds bytes, expected an integer"
            ))),
        }
    }

    /// The first value of a byte field.
    pub fn bytes(&self, name: &str) -> Result<Option<&[u8]>> {
        match self.values(name).first() {
            None => Ok(None),
            Some(FieldValue::Bytes(b)) => Ok(Some(b.as_slice())),
            Some(FieldValue::Varint(_)) => Err(Error::FormatViolation(format!(
                "field {name} holds an integer, expected bytes"
            ))),
        }
    }

    /// Every value of a repeated byte field.
    pub fn repeated_bytes(&self, name: &str) -> Result<Vec<&[u8]>> {
        self.values(name)
            .iter()
            .map(|value| match value {
                FieldValue::Bytes(b) => Ok(b.as_slice()),
                FieldValue::Varint(_) => Err(Error::FormatViolation(format!(
                    "field {name} holds an integer, expected bytes"
                ))),
            })
            .collect()
    }
}

/// Parse `data` against `schema`.
///
/// Repeated fields keep every occurrence in order. A non-repeated field keeps
/// only its first occurrence; later duplicates are dropped without error.
pub fn parse(data: &[u8], schema: &Schema) -> Result<Message> {
    let mut message = Message::default();
    let mut offset = 0;

    while offset < data.len() {
        let tag = varint::decode(data, offset)?;
        offset += tag.length;

        let field = usize::try_from(tag.value >> 3)
            .ok()
            .and_then(|number| number.checked_sub(1))
            .and_then(|index| schema.fields.get(index))
            .ok_or(Error::UnknownField(tag.value))?;

        let value = match WireType::from_tag(tag.value) {
            Some(WireType::Varint) | Some(WireType::Fixed64) => {
                let v = varint::decode(data, offset)?;
                offset += v.length;
                FieldValue::Varint(v.value)
            }
            Some(WireType::VarLength) => {
                let len = varint::decode(data, offset)?;
                offset += len.length;
                let remaining = data.len() - offset;
                let length = usize::try_from(len.value)
                    .ok()
                    .filter(|&l| l <= remaining)
                    .ok_or_else(|| {
                        Error::BufferOverrun(format!(
                            "field {} declares {} bytes, {remaining} remain",
                            field.name, len.value
                        ))
                    })?;
                let bytes = data[offset..offset + length].to_vec();
                offset += length;
                FieldValue::Bytes(bytes)
            }
            None => {
                return Err(Error::UnsupportedType(format!(
                    "wire type {} for field {}",
                    tag.value & 0x07,
                    field.name
                )));
            }
        };

        let slot = message.fields.entry(field.name).or_default();
        if field.repeated || slot.is_empty() {
            slot.push(value);
        }
    }

    Ok(message)
}

/// Builds an encoded message field by field.
pub struct MessageWriter<'a> {
    schema: &'a Schema,
    buf: Vec<u8>,
}

impl<'a> MessageWriter<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            buf: Vec::new(),
        }
    }

    /// Append an integer field.
    pub fn varint(mut self, name: &str, value: u64) -> Result<Self> {
        self.buf.extend(self.schema.encode_tag(name)?);
        varint::encode_into(value, &mut self.buf);
        Ok(self)
    }

    /// Append a length-prefixed byte field.
    pub fn bytes(mut self, name: &str, value: &[u8]) -> Result<Self> {
        self.buf.extend(self.schema.encode_tag(name)?);
        varint::encode_into(value.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(value);
        Ok(self)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
