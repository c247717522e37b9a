//! dag-pb nodes and links.
//!
//! A block is either a leaf carrying one chunk of file bytes (wrapped in a
//! UnixFS record) or an internal node whose links enumerate child blocks in
//! order. Reassembly concatenates the children's payloads in link order.

use crate::multihash::Multihash;
use crate::protobuf::{self, FieldDef, MessageWriter, Schema, WireType};
use crate::unixfs;
use crate::{Error, Result};
use bytes::Bytes;

pub const PBNODE_SCHEMA: Schema = Schema {
    name: "PBNode",
    fields: &[
        FieldDef::new("data", WireType::VarLength),
        FieldDef::repeated("links", WireType::VarLength),
    ],
};

pub const PBLINK_SCHEMA: Schema = Schema {
    name: "PBLink",
    fields: &[
        FieldDef::new("hash", WireType::VarLength),
        FieldDef::new("name", WireType::VarLength),
        FieldDef::new("tsize", WireType::Varint),
    ],
};

/// A reference to a child block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    /// Address of the child block.
    pub hash: Multihash,
    /// Link name. Never set for file chunks.
    pub name: Option<String>,
    /// Cumulative size of the child block as reported by the store.
    pub tsize: u64,
}

impl Link {
    pub fn new(hash: Multihash, tsize: u64) -> Self {
        Self {
            hash,
            name: None,
            tsize,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut writer = MessageWriter::new(&PBLINK_SCHEMA).bytes("hash", self.hash.as_bytes())?;
        if let Some(name) = &self.name {
            writer = writer.bytes("name", name.as_bytes())?;
        }
        Ok(writer.varint("tsize", self.tsize)?.finish())
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        let message = protobuf::parse(data, &PBLINK_SCHEMA)?;
        let raw = message
            .bytes("hash")?
            .ok_or_else(|| Error::FormatViolation("link without hash".to_string()))?;
        let hash = Multihash::from_bytes(raw)?;
        let name = message
            .bytes("name")?
            .map(|n| {
                String::from_utf8(n.to_vec())
                    .map_err(|_| Error::FormatViolation("link name is not UTF-8".to_string()))
            })
            .transpose()?;
        let tsize = message.varint("tsize")?.unwrap_or(0);
        Ok(Self { hash, name, tsize })
    }
}

/// A decoded block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DagRecord {
    /// File bytes stored directly in the block.
    Leaf(Bytes),
    /// Ordered references to the blocks holding the file bytes.
    Internal(Vec<Link>),
}

impl DagRecord {
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Leaf(payload) => encode_node(Some(payload.as_ref()), None),
            Self::Internal(links) => encode_node(None, Some(links.as_slice())),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        parse_node(data)
    }
}

/// Encode a dag-pb node.
///
/// An empty payload is treated as absent, so a node built from an empty
/// payload and no links encodes to an empty block and fails to parse.
pub fn encode_node(payload: Option<&[u8]>, links: Option<&[Link]>) -> Result<Vec<u8>> {
    let mut writer = MessageWriter::new(&PBNODE_SCHEMA);

    if let Some(payload) = payload.filter(|p| !p.is_empty()) {
        writer = writer.bytes("data", &unixfs::encode_file(payload)?)?;
    }

    for link in links.unwrap_or_default() {
        writer = writer.bytes("links", &link.encode()?)?;
    }

    Ok(writer.finish())
}

/// Decode a dag-pb node into a [`DagRecord`].
pub fn parse_node(data: &[u8]) -> Result<DagRecord> {
    let message = protobuf::parse(data, &PBNODE_SCHEMA)?;

    if message.contains("links") {
        let links = message
            .repeated_bytes("links")?
            .into_iter()
            .map(Link::parse)
            .collect::<Result<Vec<_>>>()?;

        if let Some(record) = message.bytes("data")?
            && !unixfs::decode_file(record)?.is_empty()
        {
            return Err(Error::FormatViolation(
                "node carries both links and payload".to_string(),
            ));
        }
        return Ok(DagRecord::Internal(links));
    }

    match message.bytes("data")? {
        Some(record) => Ok(DagRecord::Leaf(Bytes::from(unixfs::decode_file(record)?))),
        None => Err(Error::FormatViolation("missing links or data".to_string())),
    }
}
