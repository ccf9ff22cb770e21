use serde::{Deserialize, Serialize};
use std::{fmt, marker::PhantomData, str::FromStr};
use thiserror::Error;
use ulid::Ulid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity is empty")]
    Empty,
    #[error("identity is not a valid ulid encoding")]
    Malformed,
    #[error("identity must not be the nil value")]
    Nil,
}

/// Marker trait giving each identity family its canonical string prefix.
pub trait HasIdPrefix:
    fmt::Debug + Clone + Copy + PartialEq + Eq + PartialOrd + Ord + std::hash::Hash + Send + Sync + 'static
{
    const PREFIX: &'static str;
}

/// Typed identity value backed by a ULID.
///
/// The wrapped ULID is never nil: `new` and `from_str` reject the nil value,
/// and `generate` cannot produce it. Equality, ordering and hashing operate
/// on the wrapped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId<K: HasIdPrefix> {
    id: Ulid,
    _phantom: PhantomData<K>,
}

impl<K: HasIdPrefix> EntityId<K> {
    pub fn new(id: Ulid) -> Result<Self, IdentityError> {
        if id.is_nil() {
            return Err(IdentityError::Nil);
        }
        Ok(Self {
            id,
            _phantom: PhantomData,
        })
    }

    pub fn generate() -> Self {
        Self {
            id: Ulid::new(),
            _phantom: PhantomData,
        }
    }

    pub fn into_inner(&self) -> Ulid {
        self.id
    }
}

impl<K: HasIdPrefix> fmt::Display for EntityId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", K::PREFIX, self.id)
    }
}

impl<K: HasIdPrefix> FromStr for EntityId<K> {
    type Err = IdentityError;

    /// Accepts both the canonical `{prefix}-{ulid}` form and a bare ULID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdentityError::Empty);
        }

        let ulid_string = s.strip_prefix(&format!("{}-", K::PREFIX)).unwrap_or(s);

        let ulid = Ulid::from_string(ulid_string).map_err(|_| IdentityError::Malformed)?;

        Self::new(ulid)
    }
}

impl<K: HasIdPrefix> Serialize for EntityId<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de, K: HasIdPrefix> Deserialize<'de> for EntityId<K> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
