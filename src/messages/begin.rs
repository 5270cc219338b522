use bytes::{Bytes, BytesMut};

use crate::{
    errors::Result,
    types::wire::{structure, BoltWireFormat},
    types::{BoltList, BoltMap, BoltType},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x11;

/// BEGIN opens an explicit transaction (v3+).
#[derive(Debug, PartialEq, Clone)]
pub struct Begin {
    extra: BoltMap,
}

impl Begin {
    pub fn new(extra: BoltMap) -> Begin {
        Begin { extra }
    }

    pub fn builder() -> BeginBuilder {
        BeginBuilder::default()
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 1, SIGNATURE);
        self.extra.write_into(version, &mut bytes)?;
        Ok(bytes.freeze())
    }
}

/// Collects the transaction metadata the protocol knows, dropping fields
/// the negotiated version does not.
#[derive(Debug, Default)]
pub struct BeginBuilder {
    db: Option<String>,
    mode: Option<&'static str>,
    bookmarks: Vec<String>,
    tx_timeout_ms: Option<i64>,
    tx_metadata: Option<BoltMap>,
    imp_user: Option<String>,
}

impl BeginBuilder {
    pub fn with_db(mut self, db: impl Into<Option<String>>) -> Self {
        self.db = db.into();
        self
    }

    pub fn read(mut self) -> Self {
        self.mode = Some("r");
        self
    }

    pub fn with_bookmarks(mut self, bookmarks: Vec<String>) -> Self {
        self.bookmarks = bookmarks;
        self
    }

    pub fn with_tx_timeout_ms(mut self, timeout: i64) -> Self {
        self.tx_timeout_ms = Some(timeout);
        self
    }

    pub fn with_tx_metadata(mut self, metadata: BoltMap) -> Self {
        self.tx_metadata = Some(metadata);
        self
    }

    pub fn with_imp_user(mut self, imp_user: impl Into<Option<String>>) -> Self {
        self.imp_user = imp_user.into();
        self
    }

    pub fn build(self, version: Version) -> Begin {
        Begin::new(self.into_extra(version))
    }

    /// The extra map alone, for callers that drive the wire themselves.
    pub fn into_extra(self, version: Version) -> BoltMap {
        let mut extra = BoltMap::new();
        if version >= Version::V4 {
            if let Some(db) = self.db {
                extra.put("db".into(), BoltType::from(db));
            }
        }
        if let Some(mode) = self.mode {
            extra.put("mode".into(), BoltType::from(mode));
        }
        if !self.bookmarks.is_empty() {
            let bookmarks: BoltList = self.bookmarks.into_iter().map(BoltType::from).collect();
            extra.put("bookmarks".into(), BoltType::List(bookmarks));
        }
        if let Some(timeout) = self.tx_timeout_ms {
            extra.put("tx_timeout".into(), BoltType::from(timeout));
        }
        if let Some(metadata) = self.tx_metadata {
            extra.put("tx_metadata".into(), BoltType::Map(metadata));
        }
        if version.supports_route() {
            if let Some(imp_user) = self.imp_user {
                extra.put("imp_user".into(), BoltType::from(imp_user));
            }
        }
        extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_begin() {
        let mut extra = BoltMap::new();
        extra.put("db".into(), "neo4j".into());
        let begin = Begin::new(extra);

        let bytes = begin.into_bytes(Version::V4_4).unwrap();

        assert_eq!(
            &bytes[..],
            &[
                0xB1, SIGNATURE, //
                0xA1, 0x82, b'd', b'b', 0x85, b'n', b'e', b'o', b'4', b'j',
            ]
        );
    }

    #[test]
    fn builder_gates_metadata_by_version() {
        let begin = Begin::builder()
            .with_db(Some("movies".to_string()))
            .with_imp_user(Some("alice".to_string()))
            .build(Version::V4);
        assert!(begin.extra.contains_key("db"));
        assert!(!begin.extra.contains_key("imp_user"));

        let begin = Begin::builder()
            .with_db(Some("movies".to_string()))
            .with_imp_user(Some("alice".to_string()))
            .build(Version::V4_3);
        assert!(begin.extra.contains_key("imp_user"));

        // v3 has no multi-db support
        let begin = Begin::builder()
            .with_db(Some("movies".to_string()))
            .build(Version::V3);
        assert!(!begin.extra.contains_key("db"));
    }

    #[test]
    fn read_mode_and_bookmarks_are_kept() {
        let begin = Begin::builder()
            .read()
            .with_bookmarks(vec!["bm-1".to_string()])
            .build(Version::V4_4);
        assert_eq!(begin.extra.get::<String>("mode").as_deref(), Some("r"));
        assert!(begin.extra.contains_key("bookmarks"));
    }
}
