use bytes::{Bytes, BytesMut};

use crate::{errors::Result, types::wire::structure, Version};

pub(crate) const SIGNATURE: u8 = 0x0F;
pub(crate) const ACK_FAILURE_SIGNATURE: u8 = 0x0E;

/// RESET returns a connection to READY from any server-side state,
/// discarding everything that was queued. Also used as the pool's ping.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Reset;

impl Reset {
    pub(crate) fn into_bytes(self, _version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 0, SIGNATURE);
        Ok(bytes.freeze())
    }
}

/// ACK_FAILURE acknowledges a FAILURE on v1-v3. v4 removed it; requests
/// are rewritten to RESET there.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct AckFailure;

impl AckFailure {
    pub(crate) fn into_bytes(self, _version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 0, ACK_FAILURE_SIGNATURE);
        Ok(bytes.freeze())
    }
}
