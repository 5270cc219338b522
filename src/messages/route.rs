use bytes::{Bytes, BytesMut};

use crate::{
    errors::Result,
    types::wire::{structure, BoltWireFormat},
    types::{BoltList, BoltMap, BoltNull, BoltString, BoltType},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x66;

/// ROUTE asks the server for a routing table (v4.3+). The third field
/// changed shape in 4.4: a bare db string became an extra map carrying
/// `db` and `imp_user`.
#[derive(Debug, PartialEq, Clone)]
pub struct Route {
    routing: BoltMap,
    bookmarks: BoltList,
    db: Option<BoltString>,
    imp_user: Option<BoltString>,
}

impl Route {
    pub fn new(
        routing: BoltMap,
        bookmarks: BoltList,
        db: Option<String>,
        imp_user: Option<String>,
    ) -> Route {
        Route {
            routing,
            bookmarks,
            db: db.map(Into::into),
            imp_user: imp_user.map(Into::into),
        }
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 3, SIGNATURE);
        self.routing.write_into(version, &mut bytes)?;
        self.bookmarks.write_into(version, &mut bytes)?;
        if version >= Version::V4_4 {
            let mut extra = BoltMap::new();
            if let Some(db) = self.db {
                extra.put("db".into(), BoltType::String(db));
            }
            if let Some(imp_user) = self.imp_user {
                extra.put("imp_user".into(), BoltType::String(imp_user));
            }
            extra.write_into(version, &mut bytes)?;
        } else {
            match self.db {
                Some(db) => db.write_into(version, &mut bytes)?,
                None => BoltNull.write_into(version, &mut bytes)?,
            }
        }
        Ok(bytes.freeze())
    }
}
