use crate::{event_id::EventIdType, message};
use chrono::{DateTime, Utc};
use std::fmt;

/// Marker trait for domain events that represent state changes within an
/// aggregate. Domain events capture what happened in the domain.
pub trait DomainEvent: fmt::Debug + Clone + message::Message + Send + Sync + 'static {
    fn id(&self) -> EventIdType;
    fn event_type(&self) -> &'static str;

    /// When the event happened, taken from the timestamp encoded in its id.
    fn occurred_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.id().into_inner().datetime())
    }
}

/// Persistence-ready form of a pending event, keyed by the entity's
/// canonical id string. The payload encoding is chosen by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializedDomainEvent {
    pub id: String,
    pub entity_id: String,
    pub entity_type: String,
    pub event_type: String,
    pub payload: Vec<u8>,
    pub metadata: message::Metadata,
}

impl SerializedDomainEvent {
    pub fn new(
        id: String,
        entity_id: String,
        entity_type: String,
        event_type: String,
        payload: Vec<u8>,
        metadata: message::Metadata,
    ) -> Self {
        Self {
            id,
            entity_id,
            entity_type,
            event_type,
            payload,
            metadata,
        }
    }
}
