use bytes::{Bytes, BytesMut};

use crate::{
    errors::Result,
    types::wire::{structure, BoltWireFormat},
    types::BoltInteger,
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x54;

/// TELEMETRY reports which driver API surface triggered a unit of work
/// (v5.4+). Failures are informational only.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Telemetry {
    api: BoltInteger,
}

impl Telemetry {
    pub fn new(api: i64) -> Telemetry {
        Telemetry { api: api.into() }
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 1, SIGNATURE);
        self.api.write_into(version, &mut bytes)?;
        Ok(bytes.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_telemetry() {
        let bytes = Telemetry::new(2).into_bytes(Version::V5_4).unwrap();
        assert_eq!(&bytes[..], &[0xB1, SIGNATURE, 0x02]);
    }
}
