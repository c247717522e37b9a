//! UnixFS data records carried in the `data` field of a dag-pb node.
//!
//! Only regular file records are produced or accepted.

use crate::protobuf::{self, FieldDef, MessageWriter, Schema, WireType};
use crate::{Error, Result};

/// UnixFS node kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum UnixFsType {
    Raw = 0,
    Directory = 1,
    File = 2,
    Metadata = 3,
    Symlink = 4,
    HamtShard = 5,
}

impl UnixFsType {
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(Self::Raw),
            1 => Some(Self::Directory),
            2 => Some(Self::File),
            3 => Some(Self::Metadata),
            4 => Some(Self::Symlink),
            5 => Some(Self::HamtShard),
            _ => None,
        }
    }
}

pub const UNIXFS_SCHEMA: Schema = Schema {
    name: "UnixFs",
    fields: &[
        FieldDef::new("type", WireType::Varint),
        FieldDef::new("data", WireType::VarLength),
        FieldDef::new("filesize", WireType::Varint),
        FieldDef::new("blocksize", WireType::Varint),
        FieldDef::new("hashtype", WireType::Varint),
        FieldDef::new("fanout", WireType::Varint),
    ],
};

/// Wrap file bytes in a UnixFS `File` record.
pub fn encode_file(data: &[u8]) -> Result<Vec<u8>> {
    Ok(MessageWriter::new(&UNIXFS_SCHEMA)
        .varint("type", UnixFsType::File as u64)?
        .bytes("data", data)?
        .varint("filesize", data.len() as u64)?
        .finish())
}

/// Extract the file bytes from a UnixFS record.
///
/// A `File` record without a `data` field yields an empty payload.
pub fn decode_file(record: &[u8]) -> Result<Vec<u8>> {
    let message = protobuf::parse(record, &UNIXFS_SCHEMA)?;

    let code = message.varint("type")?;
    match code.and_then(UnixFsType::from_code) {
        Some(UnixFsType::File) => {}
        Some(other) => {
            return Err(Error::UnsupportedType(format!("unixfs {other:?}")));
        }
        None => {
            return Err(Error::UnsupportedType(format!(
                "unixfs type {}",
                code.map_or_else(|| "missing".to_string(), |c| c.to_string())
            )));
        }
    }

    Ok(message.bytes("data")?.map(<[u8]>::to_vec).unwrap_or_default())
}
