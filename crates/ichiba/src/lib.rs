//! Ichiba is an event-sourced domain modeling library, built around a
//! classified ads marketplace.
//!
//! The core contract lives in [`entity`]: an aggregate's state implements
//! [`EntityState`] to describe how each domain event mutates it (`when`)
//! and which rules must hold afterwards (`ensure_valid_state`), and
//! [`Entity`] drives both, recording every accepted event in an
//! append-only change log. A persistence collaborator reads the log
//! through [`Entity::changes`] or [`Entity::serialized_changes`] and
//! drains it with [`Entity::clear_changes`] once the events are durable.
//!
//! [`classified_ad`] is the worked example: a listing aggregate with the
//! full create / edit / review / publish / archive lifecycle.

pub mod classified_ad;
pub mod codec;
pub mod domain_event;
pub mod entity;
pub mod entity_id;
pub mod event_id;
pub mod message;
pub mod values;

pub use codec::{Deserializer, Json, Serde, SerdeError, Serializer};
pub use domain_event::{DomainEvent, SerializedDomainEvent};
pub use entity::{
    Entity, EntityState, InvalidStateTransition, InvariantViolation, TransitionError, UnhandledEvent,
};
pub use entity_id::{EntityId, HasIdPrefix, IdentityError};
pub use event_id::EventIdType;
pub use message::{Message, Metadata};
