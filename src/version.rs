use crate::errors::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt::{self, Display};

/// The magic preamble every Bolt connection opens with.
pub(crate) const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// A negotiated Bolt protocol version.
///
/// Versions 1 to 3 are bare majors, everything later is a `major.minor`
/// pair. 5.5 was never assigned by the protocol and does not exist here.
/// The variant order gives `Ord`, so feature checks read as comparisons,
/// e.g. `version >= Version::V4`.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub enum Version {
    V1,
    V2,
    V3,
    V4,
    V4_1,
    V4_2,
    V4_3,
    V4_4,
    V5,
    V5_1,
    V5_2,
    V5_3,
    V5_4,
    V5_6,
}

impl Version {
    /// The four version slots sent after the magic preamble, most
    /// preferred first. Slots for v4+ carry a range byte covering
    /// `minor - range ..= minor`.
    pub fn supported_versions() -> Bytes {
        let mut bytes = BytesMut::with_capacity(16);
        let slots: [[u8; 4]; 4] = [
            [0x00, 0x04, 0x06, 0x05], // 5.2 - 5.6
            [0x00, 0x04, 0x04, 0x04], // 4.0 - 4.4
            [0x00, 0x00, 0x00, 0x03],
            [0x00, 0x00, 0x00, 0x02],
        ];
        for slot in slots {
            bytes.put_slice(&slot);
        }
        bytes.freeze()
    }

    /// Parses the single version slot the server answers the handshake
    /// with. An all-zero slot means no advertised version was acceptable.
    pub fn parse(reply: [u8; 4]) -> Result<Version> {
        if reply == [0, 0, 0, 0] {
            return Err(Error::HandshakeRejected);
        }
        if reply[0] != 0 {
            return Err(Error::ProtocolMismatch(u32::from_be_bytes(reply)));
        }
        let (minor, major) = (reply[2], reply[3]);
        Ok(match (major, minor) {
            (1, 0) => Version::V1,
            (2, 0) => Version::V2,
            (3, 0) => Version::V3,
            (4, 0) => Version::V4,
            (4, 1) => Version::V4_1,
            (4, 2) => Version::V4_2,
            (4, 3) => Version::V4_3,
            (4, 4) => Version::V4_4,
            (5, 0) => Version::V5,
            (5, 1) => Version::V5_1,
            (5, 2) => Version::V5_2,
            (5, 3) => Version::V5_3,
            (5, 4) => Version::V5_4,
            (5, 6) => Version::V5_6,
            (major, minor) => return Err(Error::UnsupportedVersion(major, minor)),
        })
    }

    pub fn major(self) -> u8 {
        match self {
            Version::V1 => 1,
            Version::V2 => 2,
            Version::V3 => 3,
            Version::V4 | Version::V4_1 | Version::V4_2 | Version::V4_3 | Version::V4_4 => 4,
            _ => 5,
        }
    }

    pub fn minor(self) -> u8 {
        match self {
            Version::V1 | Version::V2 | Version::V3 | Version::V4 | Version::V5 => 0,
            Version::V4_1 | Version::V5_1 => 1,
            Version::V4_2 | Version::V5_2 => 2,
            Version::V4_3 | Version::V5_3 => 3,
            Version::V4_4 | Version::V5_4 => 4,
            Version::V5_6 => 6,
        }
    }

    /// PULL/DISCARD take an `{n, qid}` extra map instead of the bare
    /// PULL_ALL/DISCARD_ALL forms.
    pub(crate) fn supports_flow_control(self) -> bool {
        self >= Version::V4
    }

    /// BEGIN/COMMIT/ROLLBACK and GOODBYE exist; auth moved from INIT
    /// into HELLO.
    pub(crate) fn supports_hello(self) -> bool {
        self >= Version::V3
    }

    /// HELLO may carry a routing context map.
    pub(crate) fn supports_routing_context(self) -> bool {
        self >= Version::V4
    }

    /// ROUTE and `imp_user` transaction metadata.
    pub(crate) fn supports_route(self) -> bool {
        self >= Version::V4_3
    }

    /// HELLO carries a `bolt_agent` map and graph entities carry element ids.
    pub(crate) fn supports_element_id(self) -> bool {
        self >= Version::V5
    }

    /// Auth is split out of HELLO into LOGON/LOGOFF.
    pub(crate) fn supports_logon(self) -> bool {
        self >= Version::V5_1
    }

    /// `notifications_minimum_severity` in HELLO/BEGIN/RUN extras.
    pub(crate) fn supports_notification_filtering(self) -> bool {
        self >= Version::V5_2
    }

    pub(crate) fn supports_telemetry(self) -> bool {
        self >= Version::V5_4
    }

    /// `notifications_disabled_classifications` in HELLO extras.
    pub(crate) fn supports_notification_classifications(self) -> bool {
        self >= Version::V5_6
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self <= Version::V3 {
            write!(f, "{}", self.major())
        } else {
            write!(f, "{}.{}", self.major(), self.minor())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn advertises_four_slots_most_preferred_first() {
        let bytes = Version::supported_versions();
        assert_eq!(
            &bytes[..],
            &[
                0x00, 0x04, 0x06, 0x05, // 5.6 down to 5.2
                0x00, 0x04, 0x04, 0x04, // 4.4 down to 4.0
                0x00, 0x00, 0x00, 0x03, //
                0x00, 0x00, 0x00, 0x02,
            ]
        );
    }

    #[test_case([0, 0, 0, 3], Version::V3; "bolt 3")]
    #[test_case([0, 0, 4, 4], Version::V4_4; "bolt 4.4")]
    #[test_case([0, 4, 6, 5], Version::V5_6; "bolt 5.6 with range byte")]
    #[test_case([0, 0, 0, 1], Version::V1; "bolt 1")]
    #[test_case([0, 0, 2, 5], Version::V5_2; "bolt 5.2")]
    fn parses_server_reply(reply: [u8; 4], expected: Version) {
        assert_eq!(Version::parse(reply).unwrap(), expected);
    }

    #[test]
    fn zero_reply_is_a_rejection() {
        assert!(matches!(
            Version::parse([0, 0, 0, 0]),
            Err(Error::HandshakeRejected)
        ));
    }

    #[test]
    fn five_five_does_not_exist() {
        assert!(matches!(
            Version::parse([0, 0, 5, 5]),
            Err(Error::UnsupportedVersion(5, 5))
        ));
    }

    #[test]
    fn http_response_is_a_protocol_mismatch() {
        assert!(matches!(
            Version::parse(*b"HTTP"),
            Err(Error::ProtocolMismatch(0x48545450))
        ));
    }

    #[test]
    fn versions_are_ordered() {
        assert!(Version::V1 < Version::V3);
        assert!(Version::V3 < Version::V4);
        assert!(Version::V4_4 < Version::V5);
        assert!(Version::V5_4 < Version::V5_6);
    }
}
