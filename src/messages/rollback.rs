use bytes::{Bytes, BytesMut};

use crate::{errors::Result, types::wire::structure, Version};

pub(crate) const SIGNATURE: u8 = 0x13;

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Rollback;

impl Rollback {
    pub(crate) fn into_bytes(self, _version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 0, SIGNATURE);
        Ok(bytes.freeze())
    }
}
