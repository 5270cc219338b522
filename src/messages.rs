mod begin;
mod bye;
mod commit;
mod discard;
mod failure;
mod hello;
mod ignore;
mod init;
mod logon;
mod pull;
mod record;
mod reset;
mod rollback;
mod route;
mod run;
mod success;
mod telemetry;

use crate::{
    errors::{Error, Result},
    types::{BoltList, BoltMap},
    types::wire::BoltWireFormat,
    version::Version,
};
use bytes::Bytes;

pub(crate) use hello::PRODUCT as USER_AGENT;

pub use begin::Begin;
pub use bye::Goodbye;
pub use commit::Commit;
pub use discard::{Discard, DiscardAll};
pub use failure::Failure;
pub use hello::{Hello, HelloBuilder};
pub use ignore::Ignored;
pub use init::Init;
pub use logon::{Logoff, Logon};
pub use pull::{Pull, PullAll};
pub use record::Record;
pub use reset::{AckFailure, Reset};
pub use rollback::Rollback;
pub use route::Route;
pub use run::Run;
pub use success::Success;
pub use telemetry::Telemetry;

/// The request vocabulary, used for legality checks and diagnostics
/// independently of a message's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Init,
    Hello,
    Logon,
    Logoff,
    Telemetry,
    Goodbye,
    AckFailure,
    Reset,
    Run,
    Discard,
    DiscardAll,
    Pull,
    PullAll,
    Begin,
    Commit,
    Rollback,
    Route,
}

impl RequestKind {
    pub fn signature(self) -> u8 {
        match self {
            RequestKind::Init | RequestKind::Hello => 0x01,
            RequestKind::Goodbye => 0x02,
            RequestKind::AckFailure => 0x0E,
            RequestKind::Reset => 0x0F,
            RequestKind::Run => 0x10,
            RequestKind::Begin => 0x11,
            RequestKind::Commit => 0x12,
            RequestKind::Rollback => 0x13,
            RequestKind::Discard | RequestKind::DiscardAll => 0x2F,
            RequestKind::Pull | RequestKind::PullAll => 0x3F,
            RequestKind::Telemetry => 0x54,
            RequestKind::Route => 0x66,
            RequestKind::Logon => 0x6A,
            RequestKind::Logoff => 0x6B,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RequestKind::Init => "INIT",
            RequestKind::Hello => "HELLO",
            RequestKind::Logon => "LOGON",
            RequestKind::Logoff => "LOGOFF",
            RequestKind::Telemetry => "TELEMETRY",
            RequestKind::Goodbye => "GOODBYE",
            RequestKind::AckFailure => "ACK_FAILURE",
            RequestKind::Reset => "RESET",
            RequestKind::Run => "RUN",
            RequestKind::Discard => "DISCARD",
            RequestKind::DiscardAll => "DISCARD_ALL",
            RequestKind::Pull => "PULL",
            RequestKind::PullAll => "PULL_ALL",
            RequestKind::Begin => "BEGIN",
            RequestKind::Commit => "COMMIT",
            RequestKind::Rollback => "ROLLBACK",
            RequestKind::Route => "ROUTE",
        }
    }

    /// Whether this message exists in the given protocol version.
    /// [`BoltRequest::normalize`] runs before this check, so requests for
    /// the retired v1-v3 forms are rewritten rather than rejected on
    /// modern connections.
    pub fn legal_for(self, version: Version) -> bool {
        match self {
            RequestKind::Init => version <= Version::V2,
            RequestKind::Hello => version >= Version::V3,
            RequestKind::Logon | RequestKind::Logoff => version.supports_logon(),
            RequestKind::Telemetry => version.supports_telemetry(),
            RequestKind::Goodbye => version >= Version::V3,
            RequestKind::AckFailure => version <= Version::V3,
            RequestKind::Reset => true,
            RequestKind::Run => true,
            RequestKind::Discard | RequestKind::Pull => version.supports_flow_control(),
            RequestKind::DiscardAll | RequestKind::PullAll => version <= Version::V3,
            RequestKind::Begin | RequestKind::Commit | RequestKind::Rollback => {
                version >= Version::V3
            }
            RequestKind::Route => version.supports_route(),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum BoltRequest {
    Init(Init),
    Hello(Hello),
    Logon(Logon),
    Logoff(Logoff),
    Telemetry(Telemetry),
    Goodbye(Goodbye),
    AckFailure(AckFailure),
    Reset(Reset),
    Run(Run),
    Discard(Discard),
    DiscardAll(DiscardAll),
    Pull(Pull),
    PullAll(PullAll),
    Begin(Begin),
    Commit(Commit),
    Rollback(Rollback),
    Route(Route),
}

#[derive(Debug, PartialEq, Clone)]
pub enum BoltResponse {
    Success(Success),
    Failure(Failure),
    Record(Record),
    Ignored(Ignored),
}

impl BoltRequest {
    pub fn run(query: &str, parameters: BoltMap, extra: BoltMap) -> BoltRequest {
        BoltRequest::Run(Run::new(query.into(), parameters, extra))
    }

    pub fn pull(n: i64, qid: i64) -> Result<BoltRequest> {
        Ok(BoltRequest::Pull(Pull::new(n, qid)?))
    }

    pub fn pull_all() -> BoltRequest {
        BoltRequest::PullAll(PullAll)
    }

    pub fn discard(n: i64, qid: i64) -> Result<BoltRequest> {
        Ok(BoltRequest::Discard(Discard::new(n, qid)?))
    }

    pub fn discard_all() -> BoltRequest {
        BoltRequest::DiscardAll(DiscardAll)
    }

    pub fn begin(extra: BoltMap) -> BoltRequest {
        BoltRequest::Begin(Begin::new(extra))
    }

    pub fn commit() -> BoltRequest {
        BoltRequest::Commit(Commit)
    }

    pub fn rollback() -> BoltRequest {
        BoltRequest::Rollback(Rollback)
    }

    pub fn reset() -> BoltRequest {
        BoltRequest::Reset(Reset)
    }

    pub fn ack_failure() -> BoltRequest {
        BoltRequest::AckFailure(AckFailure)
    }

    pub fn goodbye() -> BoltRequest {
        BoltRequest::Goodbye(Goodbye)
    }

    pub fn logon(principal: &str, credentials: &str) -> BoltRequest {
        BoltRequest::Logon(Logon::new(principal.into(), credentials.into()))
    }

    pub fn logoff() -> BoltRequest {
        BoltRequest::Logoff(Logoff)
    }

    pub fn telemetry(api: i64) -> BoltRequest {
        BoltRequest::Telemetry(Telemetry::new(api))
    }

    pub fn route(routing: BoltMap, bookmarks: BoltList, db: Option<String>) -> BoltRequest {
        BoltRequest::Route(Route::new(routing, bookmarks, db, None))
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            BoltRequest::Init(_) => RequestKind::Init,
            BoltRequest::Hello(_) => RequestKind::Hello,
            BoltRequest::Logon(_) => RequestKind::Logon,
            BoltRequest::Logoff(_) => RequestKind::Logoff,
            BoltRequest::Telemetry(_) => RequestKind::Telemetry,
            BoltRequest::Goodbye(_) => RequestKind::Goodbye,
            BoltRequest::AckFailure(_) => RequestKind::AckFailure,
            BoltRequest::Reset(_) => RequestKind::Reset,
            BoltRequest::Run(_) => RequestKind::Run,
            BoltRequest::Discard(_) => RequestKind::Discard,
            BoltRequest::DiscardAll(_) => RequestKind::DiscardAll,
            BoltRequest::Pull(_) => RequestKind::Pull,
            BoltRequest::PullAll(_) => RequestKind::PullAll,
            BoltRequest::Begin(_) => RequestKind::Begin,
            BoltRequest::Commit(_) => RequestKind::Commit,
            BoltRequest::Rollback(_) => RequestKind::Rollback,
            BoltRequest::Route(_) => RequestKind::Route,
        }
    }

    /// Rewrites requests for message forms that were retired in v4:
    /// PULL_ALL and DISCARD_ALL become PULL/DISCARD over everything, and
    /// ACK_FAILURE becomes RESET. The encoders never see the old forms on
    /// modern connections.
    pub fn normalize(self, version: Version) -> BoltRequest {
        if !version.supports_flow_control() {
            return self;
        }
        match self {
            BoltRequest::PullAll(_) => BoltRequest::Pull(Pull::all()),
            BoltRequest::DiscardAll(_) => BoltRequest::Discard(Discard::all()),
            BoltRequest::AckFailure(_) => BoltRequest::Reset(Reset),
            other => other,
        }
    }

    pub fn into_bytes(self, version: Version) -> Result<Bytes> {
        let kind = self.kind();
        if !kind.legal_for(version) {
            return Err(Error::InvalidMessageForVersion(kind.name(), version));
        }
        match self {
            BoltRequest::Init(init) => init.into_bytes(version),
            BoltRequest::Hello(hello) => hello.into_bytes(version),
            BoltRequest::Logon(logon) => logon.into_bytes(version),
            BoltRequest::Logoff(logoff) => logoff.into_bytes(version),
            BoltRequest::Telemetry(telemetry) => telemetry.into_bytes(version),
            BoltRequest::Goodbye(goodbye) => goodbye.into_bytes(version),
            BoltRequest::AckFailure(ack) => ack.into_bytes(version),
            BoltRequest::Reset(reset) => reset.into_bytes(version),
            BoltRequest::Run(run) => run.into_bytes(version),
            BoltRequest::Discard(discard) => discard.into_bytes(version),
            BoltRequest::DiscardAll(discard) => discard.into_bytes(version),
            BoltRequest::Pull(pull) => pull.into_bytes(version),
            BoltRequest::PullAll(pull) => pull.into_bytes(version),
            BoltRequest::Begin(begin) => begin.into_bytes(version),
            BoltRequest::Commit(commit) => commit.into_bytes(version),
            BoltRequest::Rollback(rollback) => rollback.into_bytes(version),
            BoltRequest::Route(route) => route.into_bytes(version),
        }
    }
}

impl BoltResponse {
    pub fn parse(version: Version, mut response: Bytes) -> Result<BoltResponse> {
        if Success::can_parse(version, &response) {
            return Ok(BoltResponse::Success(Success::parse(
                version,
                &mut response,
            )?));
        }
        if Failure::can_parse(version, &response) {
            return Ok(BoltResponse::Failure(Failure::parse(
                version,
                &mut response,
            )?));
        }
        if Record::can_parse(version, &response) {
            return Ok(BoltResponse::Record(Record::parse(version, &mut response)?));
        }
        if Ignored::can_parse(version, &response) {
            return Ok(BoltResponse::Ignored(Ignored::parse(
                version,
                &mut response,
            )?));
        }
        Err(Error::UnexpectedMessage(format!(
            "unknown response message {response:?}"
        )))
    }

    pub(crate) fn into_error(self, msg: &'static str) -> Error {
        match self {
            BoltResponse::Failure(failure) => failure.into_error(),
            BoltResponse::Ignored(_) => Error::ServerInFailedState(msg),
            msg_other => Error::UnexpectedMessage(format!(
                "unexpected response for {msg}: {msg_other:?}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const ALL_VERSIONS: [Version; 12] = [
        Version::V1,
        Version::V2,
        Version::V3,
        Version::V4,
        Version::V4_2,
        Version::V4_3,
        Version::V4_4,
        Version::V5,
        Version::V5_1,
        Version::V5_2,
        Version::V5_4,
        Version::V5_6,
    ];

    fn legal_versions(kind: RequestKind) -> Vec<Version> {
        ALL_VERSIONS
            .into_iter()
            .filter(|v| kind.legal_for(*v))
            .collect()
    }

    #[test_case(RequestKind::Init, &[Version::V1, Version::V2]; "init")]
    #[test_case(RequestKind::AckFailure, &[Version::V1, Version::V2, Version::V3]; "ack failure")]
    #[test_case(RequestKind::PullAll, &[Version::V1, Version::V2, Version::V3]; "pull all")]
    #[test_case(RequestKind::DiscardAll, &[Version::V1, Version::V2, Version::V3]; "discard all")]
    #[test_case(RequestKind::Reset, &ALL_VERSIONS; "reset")]
    #[test_case(RequestKind::Run, &ALL_VERSIONS; "run")]
    fn legality_matrix(kind: RequestKind, expected: &[Version]) {
        assert_eq!(legal_versions(kind), expected);
    }

    #[test]
    fn legality_matrix_for_versioned_features() {
        use Version::*;
        let from = |min: Version| -> Vec<Version> {
            ALL_VERSIONS.into_iter().filter(|v| *v >= min).collect()
        };
        for kind in [
            RequestKind::Hello,
            RequestKind::Goodbye,
            RequestKind::Begin,
            RequestKind::Commit,
            RequestKind::Rollback,
        ] {
            assert_eq!(legal_versions(kind), from(V3), "{:?}", kind);
        }
        for kind in [RequestKind::Pull, RequestKind::Discard] {
            assert_eq!(legal_versions(kind), from(V4), "{:?}", kind);
        }
        assert_eq!(legal_versions(RequestKind::Route), from(V4_3));
        for kind in [RequestKind::Logon, RequestKind::Logoff] {
            assert_eq!(legal_versions(kind), from(V5_1), "{:?}", kind);
        }
        assert_eq!(legal_versions(RequestKind::Telemetry), from(V5_4));
    }

    #[test]
    fn pull_all_normalizes_to_pull_on_modern_versions() {
        let normalized = BoltRequest::pull_all().normalize(Version::V4_4);
        assert_eq!(normalized.kind(), RequestKind::Pull);
        let bytes = normalized.into_bytes(Version::V4_4).unwrap();
        assert_eq!(&bytes[..], &[0xB1, 0x3F, 0xA1, 0x81, b'n', 0xFF]);
    }

    #[test]
    fn pull_all_stays_bare_on_v3() {
        let bytes = BoltRequest::pull_all()
            .normalize(Version::V3)
            .into_bytes(Version::V3)
            .unwrap();
        assert_eq!(&bytes[..], &[0xB0, 0x3F]);
    }

    #[test]
    fn ack_failure_normalizes_to_reset_on_modern_versions() {
        let normalized = BoltRequest::ack_failure().normalize(Version::V5);
        assert_eq!(normalized.kind(), RequestKind::Reset);
        assert_eq!(
            BoltRequest::ack_failure().normalize(Version::V3).kind(),
            RequestKind::AckFailure
        );
    }

    #[test]
    fn encoding_an_illegal_message_fails() {
        let begin = BoltRequest::begin(BoltMap::new());
        assert!(matches!(
            begin.into_bytes(Version::V2),
            Err(Error::InvalidMessageForVersion("BEGIN", Version::V2))
        ));
    }

    #[test]
    fn signatures_match_the_protocol() {
        assert_eq!(RequestKind::Hello.signature(), 0x01);
        assert_eq!(RequestKind::Goodbye.signature(), 0x02);
        assert_eq!(RequestKind::AckFailure.signature(), 0x0E);
        assert_eq!(RequestKind::Reset.signature(), 0x0F);
        assert_eq!(RequestKind::Run.signature(), 0x10);
        assert_eq!(RequestKind::Begin.signature(), 0x11);
        assert_eq!(RequestKind::Commit.signature(), 0x12);
        assert_eq!(RequestKind::Rollback.signature(), 0x13);
        assert_eq!(RequestKind::Discard.signature(), 0x2F);
        assert_eq!(RequestKind::Pull.signature(), 0x3F);
        assert_eq!(RequestKind::Telemetry.signature(), 0x54);
        assert_eq!(RequestKind::Route.signature(), 0x66);
        assert_eq!(RequestKind::Logon.signature(), 0x6A);
        assert_eq!(RequestKind::Logoff.signature(), 0x6B);
    }
}
