use std::collections::HashMap;

use crate::errors::Error;
use crate::types::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNode, BoltNull, BoltPath,
    BoltRelation, BoltString, BoltType, BoltUnboundedRelation,
};

impl From<i64> for BoltType {
    fn from(value: i64) -> Self {
        BoltType::Integer(value.into())
    }
}

impl From<i32> for BoltType {
    fn from(value: i32) -> Self {
        BoltType::Integer(value.into())
    }
}

impl From<f64> for BoltType {
    fn from(value: f64) -> Self {
        BoltType::Float(value.into())
    }
}

impl From<bool> for BoltType {
    fn from(value: bool) -> Self {
        BoltType::Boolean(value.into())
    }
}

impl From<&str> for BoltType {
    fn from(value: &str) -> Self {
        BoltType::String(value.into())
    }
}

impl From<String> for BoltType {
    fn from(value: String) -> Self {
        BoltType::String(value.into())
    }
}

impl From<()> for BoltType {
    fn from(_: ()) -> Self {
        BoltType::Null(BoltNull)
    }
}

impl<T: Into<BoltType>> From<Vec<T>> for BoltType {
    fn from(value: Vec<T>) -> Self {
        BoltType::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<BoltType>> From<HashMap<String, T>> for BoltType {
    fn from(value: HashMap<String, T>) -> Self {
        BoltType::Map(
            value
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<T: Into<BoltType>> From<Option<T>> for BoltType {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => BoltType::Null(BoltNull),
        }
    }
}

macro_rules! try_from_bolt_type {
    ($target:ty, $variant:ident) => {
        impl TryFrom<BoltType> for $target {
            type Error = Error;

            fn try_from(value: BoltType) -> Result<Self, Self::Error> {
                match value {
                    BoltType::$variant(inner) => Ok(inner),
                    other => Err(Error::UnexpectedMessage(format!(
                        concat!("expected ", stringify!($variant), ", got {:?}"),
                        other
                    ))),
                }
            }
        }
    };
}

try_from_bolt_type!(BoltInteger, Integer);
try_from_bolt_type!(BoltFloat, Float);
try_from_bolt_type!(BoltBoolean, Boolean);
try_from_bolt_type!(BoltString, String);
try_from_bolt_type!(BoltList, List);
try_from_bolt_type!(BoltMap, Map);
try_from_bolt_type!(BoltNode, Node);
try_from_bolt_type!(BoltRelation, Relation);
try_from_bolt_type!(BoltUnboundedRelation, UnboundedRelation);
try_from_bolt_type!(BoltPath, Path);

impl TryFrom<BoltType> for i64 {
    type Error = Error;

    fn try_from(value: BoltType) -> Result<Self, Self::Error> {
        BoltInteger::try_from(value).map(|i| i.value)
    }
}

impl TryFrom<BoltType> for f64 {
    type Error = Error;

    fn try_from(value: BoltType) -> Result<Self, Self::Error> {
        BoltFloat::try_from(value).map(|f| f.value)
    }
}

impl TryFrom<BoltType> for bool {
    type Error = Error;

    fn try_from(value: BoltType) -> Result<Self, Self::Error> {
        BoltBoolean::try_from(value).map(|b| b.value)
    }
}

impl TryFrom<BoltType> for String {
    type Error = Error;

    fn try_from(value: BoltType) -> Result<Self, Self::Error> {
        BoltString::try_from(value).map(|s| s.value)
    }
}

impl TryFrom<BoltType> for Vec<String> {
    type Error = Error;

    fn try_from(value: BoltType) -> Result<Self, Self::Error> {
        let list = BoltList::try_from(value)?;
        list.into_iter().map(String::try_from).collect()
    }
}
