use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

#[derive(Debug, thiserror::Error)]
pub enum SerdeError {
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub trait Serializer<T>: Send + Sync {
    fn serialize(&self, value: T) -> Result<Vec<u8>, SerdeError>;
}

pub trait Deserializer<T>: Send + Sync {
    fn deserialize(&self, data: &[u8]) -> Result<T, SerdeError>;
}

pub trait Serde<T>: Serializer<T> + Deserializer<T> + Send + Sync {}

impl<S, T> Serde<T> for S where S: Serializer<T> + Deserializer<T> {}

#[derive(Debug, Clone, Copy)]
pub struct Json<T>(PhantomData<T>)
where
    T: Serialize + Send + Sync,
    for<'d> T: Deserialize<'d>;

impl<T> Default for Json<T>
where
    T: Serialize + Send + Sync,
    for<'d> T: Deserialize<'d>,
{
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Serializer<T> for Json<T>
where
    T: Serialize + Send + Sync,
    for<'d> T: Deserialize<'d>,
{
    fn serialize(&self, value: T) -> Result<Vec<u8>, SerdeError> {
        Ok(serde_json::to_vec(&value)?)
    }
}

impl<T> Deserializer<T> for Json<T>
where
    T: Serialize + Send + Sync,
    for<'d> T: Deserialize<'d>,
{
    fn deserialize(&self, data: &[u8]) -> Result<T, SerdeError> {
        Ok(serde_json::from_slice(data)?)
    }
}
