use crate::commitlog;
use crate::commitlog::EntryDecodeError;
use crate::grpc::ProtoConfiguration;
use crate::membership::Configuration;
use crate::replica::Term;
use crate::wire;
use bytes::{Buf, BufMut, Bytes};
use prost::Message;
use std::convert::TryFrom;

/// Byte representation:
///
/// ```text
/// |                                         1                               |
/// | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | 0 | 1 | 2 | 3 | 4 | 5 | ... |
/// +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+-...-+
/// |Vrs|       Term (8 bytes LE)       |Knd|   Data (variable size)  ... |
/// +---+-------------------------------+---+-------------------------...-+
/// ```
///
/// * `Vrs` - version of the serialized payload
/// * `Term` - raft leadership term when this entry was created
/// * `Knd` - what the entry is; see `EntryPayload`
/// * `Data` - app specific data payload, or an encoded `ProtoConfiguration`
///
/// Checksums aren't stored here. They're computed over these bytes when the entry is replicated.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WriteAheadLogEntry {
    pub term: Term,
    pub payload: EntryPayload,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum EntryPayload {
    /// No-op appended by every new leader.
    Initialize,
    Configuration(Configuration),
    Application(Bytes),
}

const RAFT_LOG_ENTRY_FORMAT_VERSION: u8 = 2;
const HEADER_LEN: usize = 1 + 8 + 1;

const KIND_INITIALIZE: u8 = 1;
const KIND_CONFIGURATION: u8 = 2;
const KIND_APPLICATION: u8 = 3;

impl commitlog::Entry for WriteAheadLogEntry {}

impl TryFrom<Vec<u8>> for WriteAheadLogEntry {
    type Error = EntryDecodeError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < HEADER_LEN {
            return Err(EntryDecodeError(format!("Entry too short: {} bytes", bytes.len())));
        }

        let mut header = &bytes[..HEADER_LEN];
        let version = header.get_u8();
        if version != RAFT_LOG_ENTRY_FORMAT_VERSION {
            return Err(EntryDecodeError(format!("Unknown entry format version {}", version)));
        }
        let term = Term::new(header.get_u64_le());
        let kind = header.get_u8();
        let data = &bytes[HEADER_LEN..];

        let payload = match kind {
            KIND_INITIALIZE => EntryPayload::Initialize,
            KIND_CONFIGURATION => {
                let proto = ProtoConfiguration::decode(data)
                    .map_err(|e| EntryDecodeError(format!("Malformed configuration: {:?}", e)))?;
                let configuration = wire::convert_configuration(proto)
                    .map_err(|e| EntryDecodeError(format!("Invalid configuration: {}", e)))?;
                EntryPayload::Configuration(configuration)
            }
            KIND_APPLICATION => EntryPayload::Application(Bytes::copy_from_slice(data)),
            other => return Err(EntryDecodeError(format!("Unknown entry kind {}", other))),
        };

        Ok(WriteAheadLogEntry { term, payload })
    }
}

impl From<WriteAheadLogEntry> for Vec<u8> {
    fn from(entry: WriteAheadLogEntry) -> Self {
        let (kind, data) = match entry.payload {
            EntryPayload::Initialize => (KIND_INITIALIZE, Vec::new()),
            EntryPayload::Configuration(configuration) => {
                let proto = wire::proto_configuration(&configuration);
                let mut data = Vec::with_capacity(proto.encoded_len());
                if let Err(e) = proto.encode(&mut data) {
                    unreachable!("Vec<u8> grows as needed, so encoding can't run out of space: {:?}", e);
                }
                (KIND_CONFIGURATION, data)
            }
            EntryPayload::Application(data) => (KIND_APPLICATION, data.to_vec()),
        };

        let mut bytes = Vec::with_capacity(HEADER_LEN + data.len());
        bytes.put_u8(RAFT_LOG_ENTRY_FORMAT_VERSION);
        bytes.put_u64_le(entry.term.as_u64());
        bytes.put_u8(kind);
        bytes.extend_from_slice(&data);

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitlog::Index;
    use crate::membership::RaftMember;

    fn round_trip(entry: WriteAheadLogEntry) -> WriteAheadLogEntry {
        let bytes: Vec<u8> = entry.into();
        WriteAheadLogEntry::try_from(bytes).unwrap()
    }

    #[test]
    fn configuration_entry_survives_encoding() {
        let entry = WriteAheadLogEntry {
            term: Term::new(7),
            payload: EntryPayload::Configuration(Configuration {
                index: Some(Index::new(12)),
                term: Term::new(7),
                timestamp: 1_600_000_000_000,
                new_members: vec![RaftMember::active("a"), RaftMember::active("d")],
                old_members: vec![RaftMember::active("a"), RaftMember::active("c")],
                compaction_bound: Some(Index::new(4)),
                force: false,
            }),
        };

        assert_eq!(round_trip(entry.clone()), entry);
    }

    #[test]
    fn header_layout() {
        let bytes: Vec<u8> = WriteAheadLogEntry {
            term: Term::new(0x0102),
            payload: EntryPayload::Application(Bytes::from_static(b"hi")),
        }
        .into();

        assert_eq!(
            bytes,
            vec![RAFT_LOG_ENTRY_FORMAT_VERSION, 0x02, 0x01, 0, 0, 0, 0, 0, 0, KIND_APPLICATION, b'h', b'i']
        );
    }

    #[test]
    fn rejects_malformed_bytes() {
        assert!(WriteAheadLogEntry::try_from(vec![RAFT_LOG_ENTRY_FORMAT_VERSION, 1]).is_err());

        let mut bytes: Vec<u8> = WriteAheadLogEntry {
            term: Term::new(1),
            payload: EntryPayload::Initialize,
        }
        .into();
        bytes[0] = 99;
        assert!(WriteAheadLogEntry::try_from(bytes.clone()).is_err());

        bytes[0] = RAFT_LOG_ENTRY_FORMAT_VERSION;
        bytes[HEADER_LEN - 1] = 42;
        assert!(WriteAheadLogEntry::try_from(bytes).is_err());
    }
}
