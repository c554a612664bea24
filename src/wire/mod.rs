//! Conversions between protobuf messages and the internal protocol types. Decoding goes through
//! the validating constructors, so a malformed message fails here with `MessageError`.
mod common;
mod requests;
mod responses;

pub(crate) use common::convert_configuration;
pub(crate) use common::proto_configuration;
pub(crate) use requests::*;
pub(crate) use responses::*;
