use bytes::{Bytes, BytesMut};

use crate::{
    errors::Result,
    types::wire::{structure, BoltWireFormat},
    types::{BoltList, BoltMap, BoltType},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x01;

/// HELLO opens a session on Bolt v3+. Up to v5.0 the auth token travels
/// inline; from v5.1 auth moves to LOGON and HELLO only introduces the
/// client.
#[derive(Debug, PartialEq, Clone)]
pub struct Hello {
    extra: BoltMap,
}

impl Hello {
    pub fn builder(user_agent: impl Into<String>) -> HelloBuilder {
        HelloBuilder::new(user_agent)
    }

    pub(crate) fn extra(&self) -> &BoltMap {
        &self.extra
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 1, SIGNATURE);
        self.extra.write_into(version, &mut bytes)?;
        Ok(bytes.freeze())
    }
}

pub struct HelloBuilder {
    user_agent: String,
    principal: Option<String>,
    credentials: Option<String>,
    routing: Option<BoltMap>,
    notifications_minimum_severity: Option<String>,
    notifications_disabled_classifications: Vec<String>,
}

impl HelloBuilder {
    pub fn new(user_agent: impl Into<String>) -> Self {
        HelloBuilder {
            user_agent: user_agent.into(),
            principal: None,
            credentials: None,
            routing: None,
            notifications_minimum_severity: None,
            notifications_disabled_classifications: Vec::new(),
        }
    }

    pub fn with_auth(mut self, principal: impl Into<String>, credentials: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self.credentials = Some(credentials.into());
        self
    }

    pub fn with_routing(mut self, routing: impl Into<Option<BoltMap>>) -> Self {
        self.routing = routing.into();
        self
    }

    pub fn with_notification_filter(
        mut self,
        minimum_severity: Option<String>,
        disabled_classifications: Vec<String>,
    ) -> Self {
        self.notifications_minimum_severity = minimum_severity;
        self.notifications_disabled_classifications = disabled_classifications;
        self
    }

    /// Assembles the extra map for the negotiated version. Fields a
    /// version does not know are left out, whatever was configured.
    pub fn build(self, version: Version) -> Hello {
        let HelloBuilder {
            user_agent,
            principal,
            credentials,
            routing,
            notifications_minimum_severity,
            notifications_disabled_classifications,
        } = self;

        let mut extra = BoltMap::new();
        extra.put("user_agent".into(), BoltType::from(user_agent));

        if version.supports_element_id() {
            let mut bolt_agent = BoltMap::new();
            bolt_agent.put("product".into(), BoltType::from(PRODUCT));
            bolt_agent.put("platform".into(), BoltType::from(std::env::consts::OS));
            bolt_agent.put("language".into(), BoltType::from("rust"));
            extra.put("bolt_agent".into(), BoltType::Map(bolt_agent));
        }

        // v5.1+ authenticates through LOGON instead
        if !version.supports_logon() {
            if let (Some(principal), Some(credentials)) = (principal, credentials) {
                extra.put("scheme".into(), "basic".into());
                extra.put("principal".into(), BoltType::from(principal));
                extra.put("credentials".into(), BoltType::from(credentials));
            }
        }

        if version.supports_routing_context() {
            if let Some(routing) = routing {
                extra.put("routing".into(), BoltType::Map(routing));
            }
        }

        if version.supports_notification_filtering() {
            if let Some(severity) = notifications_minimum_severity {
                extra.put(
                    "notifications_minimum_severity".into(),
                    BoltType::from(severity),
                );
            }
            if version.supports_notification_classifications()
                && !notifications_disabled_classifications.is_empty()
            {
                let classifications: BoltList = notifications_disabled_classifications
                    .into_iter()
                    .map(BoltType::from)
                    .collect();
                extra.put(
                    "notifications_disabled_classifications".into(),
                    BoltType::List(classifications),
                );
            }
        }

        Hello { extra }
    }
}

pub(crate) const PRODUCT: &str = concat!("boltcore/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests {
    use super::*;

    fn build(version: Version) -> Hello {
        Hello::builder("boltcore-test")
            .with_auth("neo4j", "secret")
            .build(version)
    }

    #[test]
    fn v3_hello_carries_inline_auth() {
        let hello = build(Version::V3);
        assert_eq!(hello.extra().get::<String>("scheme").as_deref(), Some("basic"));
        assert_eq!(
            hello.extra().get::<String>("principal").as_deref(),
            Some("neo4j")
        );
        assert_eq!(
            hello.extra().get::<String>("credentials").as_deref(),
            Some("secret")
        );
        assert!(!hello.extra().contains_key("bolt_agent"));
    }

    #[test]
    fn v5_hello_adds_the_bolt_agent() {
        let hello = build(Version::V5);
        let agent: BoltMap = hello.extra().get("bolt_agent").unwrap();
        assert_eq!(agent.get::<String>("product").as_deref(), Some(PRODUCT));
        assert_eq!(agent.get::<String>("language").as_deref(), Some("rust"));
        // auth still inline at 5.0
        assert!(hello.extra().contains_key("credentials"));
    }

    #[test]
    fn v5_1_hello_has_no_auth() {
        let hello = build(Version::V5_1);
        assert!(!hello.extra().contains_key("scheme"));
        assert!(!hello.extra().contains_key("principal"));
        assert!(!hello.extra().contains_key("credentials"));
    }

    #[test]
    fn routing_context_is_version_gated() {
        let mut routing = BoltMap::new();
        routing.put("address".into(), "example.com:7687".into());

        let hello = Hello::builder("t")
            .with_routing(routing.clone())
            .build(Version::V3);
        assert!(!hello.extra().contains_key("routing"));

        let hello = Hello::builder("t").with_routing(routing).build(Version::V4);
        assert!(hello.extra().contains_key("routing"));
    }

    #[test]
    fn notification_settings_are_version_gated() {
        let build = |version| {
            Hello::builder("t")
                .with_notification_filter(Some("WARNING".into()), vec!["HINT".into()])
                .build(version)
        };
        assert!(!build(Version::V5_1)
            .extra()
            .contains_key("notifications_minimum_severity"));
        let v5_2 = build(Version::V5_2);
        assert!(v5_2.extra().contains_key("notifications_minimum_severity"));
        assert!(!v5_2
            .extra()
            .contains_key("notifications_disabled_classifications"));
        assert!(build(Version::V5_6)
            .extra()
            .contains_key("notifications_disabled_classifications"));
    }

    #[test]
    fn should_serialize_hello() {
        let mut extra = BoltMap::new();
        extra.put("user_agent".into(), "a".into());
        let hello = Hello { extra };
        let bytes = hello.into_bytes(Version::V4_4).unwrap();
        assert_eq!(
            &bytes[..],
            &[
                0xB1, SIGNATURE, 0xA1, 0x8A, b'u', b's', b'e', b'r', b'_', b'a', b'g', b'e', b'n',
                b't', 0x81, b'a',
            ]
        );
    }
}
