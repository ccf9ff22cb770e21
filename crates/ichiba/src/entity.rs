use crate::{
    codec::{SerdeError, Serializer},
    domain_event::{DomainEvent, SerializedDomainEvent},
    entity_id::{EntityId, HasIdPrefix},
    message::Metadata,
};
use std::fmt;
use thiserror::Error;

/// The mutation handler received an event variant it does not define a case
/// for. The closed event enums make this unreachable for same-version
/// events; it exists as a guard against cross-version schema mismatches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unhandled event type {event_type}")]
pub struct UnhandledEvent {
    pub event_type: &'static str,
}

/// A domain rule does not hold for the entity's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invariant violated: {rule}")]
pub struct InvariantViolation {
    pub rule: String,
}

impl InvariantViolation {
    pub fn new(rule: impl Into<String>) -> Self {
        Self { rule: rule.into() }
    }
}

/// Why an event could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error(transparent)]
    Unhandled(#[from] UnhandledEvent),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// An event was refused. The entity's observable state and pending changes
/// are exactly what they were before the attempt; the offending event is
/// handed back to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid state transition: {reason}")]
pub struct InvalidStateTransition<E: fmt::Debug> {
    pub event: E,
    #[source]
    pub reason: TransitionError,
}

/// State of an event-sourced aggregate.
///
/// Implementations provide the per-variant mutation in `when` and the
/// domain rules in `ensure_valid_state`; [`Entity`] drives both and owns
/// the change log. `ensure_valid_state` only ever inspects current state,
/// never event history.
pub trait EntityState: fmt::Debug + Clone + Send + Sync + 'static {
    const TYPE: &'static str;
    type ID: HasIdPrefix;
    type Event: DomainEvent;

    /// The empty state an entity starts from before any event is applied.
    fn init(id: EntityId<Self::ID>) -> Self;

    /// Returns the ID of the entity.
    fn id(&self) -> &EntityId<Self::ID>;

    /// Applies a single event to the state.
    fn when(&mut self, event: &Self::Event) -> Result<(), UnhandledEvent>;

    /// Checks every domain rule against the current state.
    fn ensure_valid_state(&self) -> Result<(), InvariantViolation>;
}

/// An event-sourced entity: aggregate state plus the ordered log of events
/// applied since the last commit.
///
/// The log is append-only and exclusively owned; external readers get a
/// borrowed snapshot through [`Entity::changes`] and can never mutate it.
#[derive(Debug, Clone)]
#[must_use]
pub struct Entity<A: EntityState> {
    state: A,
    changes: Vec<A::Event>,
}

impl<A: EntityState> Entity<A> {
    /// Creates an entity in its initial state with an empty change log.
    pub fn init(id: EntityId<A::ID>) -> Self {
        Self {
            state: A::init(id),
            changes: Vec::new(),
        }
    }

    /// Rebuilds an entity from an already-persisted history.
    ///
    /// Every event is re-validated in order, so a corrupt history is
    /// rejected at the first offending event. The change log stays empty:
    /// nothing here is pending persistence.
    pub fn rehydrate<I>(id: EntityId<A::ID>, events: I) -> Result<Self, InvalidStateTransition<A::Event>>
    where
        I: IntoIterator<Item = A::Event>,
    {
        let mut entity = Self::init(id);
        for event in events {
            entity.apply(event)?;
        }
        entity.changes.clear();
        Ok(entity)
    }

    /// Returns a reference to the entity ID.
    pub fn id(&self) -> &EntityId<A::ID> {
        self.state.id()
    }

    /// Returns a reference to the current state.
    pub fn state(&self) -> &A {
        &self.state
    }

    /// Runs the mutation handler and the invariant check for `event`, and
    /// records it at the end of the change log if both pass.
    ///
    /// All-or-nothing: the handler runs against a working copy of the
    /// state, so a refused event leaves observable state and the change
    /// log exactly as they were.
    pub fn apply(&mut self, event: A::Event) -> Result<(), InvalidStateTransition<A::Event>> {
        let mut next = self.state.clone();

        let outcome = next
            .when(&event)
            .map_err(TransitionError::from)
            .and_then(|()| next.ensure_valid_state().map_err(TransitionError::from));

        match outcome {
            Ok(()) => {
                tracing::trace!(
                    entity_type = A::TYPE,
                    entity_id = %self.id(),
                    event_type = event.event_type(),
                    "event applied"
                );
                self.state = next;
                self.changes.push(event);
                Ok(())
            }
            Err(reason) => {
                tracing::debug!(
                    entity_type = A::TYPE,
                    entity_id = %self.id(),
                    event_type = event.event_type(),
                    %reason,
                    "event refused"
                );
                Err(InvalidStateTransition { event, reason })
            }
        }
    }

    /// The events applied since construction or the last `clear_changes`,
    /// in application order.
    pub fn changes(&self) -> &[A::Event] {
        &self.changes
    }

    /// Drops all pending changes. Called after a persistence collaborator
    /// has durably stored them; clearing an empty log is a no-op.
    pub fn clear_changes(&mut self) {
        if !self.changes.is_empty() {
            tracing::trace!(
                entity_type = A::TYPE,
                entity_id = %self.id(),
                count = self.changes.len(),
                "pending changes cleared"
            );
        }
        self.changes.clear();
    }

    /// Maps the pending changes into persistence-ready records, in order,
    /// keyed by this entity's canonical id string.
    pub fn serialized_changes<S>(&self, codec: &S) -> Result<Vec<SerializedDomainEvent>, SerdeError>
    where
        S: Serializer<A::Event>,
    {
        self.changes
            .iter()
            .map(|event| {
                let payload = codec.serialize(event.clone())?;
                Ok(SerializedDomainEvent::new(
                    event.id().to_string(),
                    self.id().to_string(),
                    A::TYPE.to_string(),
                    event.event_type().to_string(),
                    payload,
                    Metadata::default(),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::{Deserializer, Json},
        event_id::EventIdType,
        message::Message,
    };
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    struct Tally;

    impl HasIdPrefix for Tally {
        const PREFIX: &'static str = "tly";
    }

    type TallyId = EntityId<Tally>;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum TallyEvent {
        Opened { id: EventIdType },
        Counted { id: EventIdType, delta: i64 },
        // Written by the v0 importer; the current state refuses it.
        Imported { id: EventIdType },
    }

    impl Message for TallyEvent {
        fn name(&self) -> &'static str {
            "TallyEvent"
        }
    }

    impl DomainEvent for TallyEvent {
        fn id(&self) -> EventIdType {
            match self {
                Self::Opened { id } => *id,
                Self::Counted { id, .. } => *id,
                Self::Imported { id } => *id,
            }
        }

        fn event_type(&self) -> &'static str {
            match self {
                Self::Opened { .. } => "TallyOpened",
                Self::Counted { .. } => "TallyCounted",
                Self::Imported { .. } => "TallyImported",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct TallyState {
        id: TallyId,
        total: i64,
        opened: bool,
    }

    impl EntityState for TallyState {
        const TYPE: &'static str = "Tally";
        type ID = Tally;
        type Event = TallyEvent;

        fn init(id: TallyId) -> Self {
            Self {
                id,
                total: 0,
                opened: false,
            }
        }

        fn id(&self) -> &TallyId {
            &self.id
        }

        fn when(&mut self, event: &TallyEvent) -> Result<(), UnhandledEvent> {
            match event {
                TallyEvent::Opened { .. } => self.opened = true,
                TallyEvent::Counted { delta, .. } => self.total += delta,
                TallyEvent::Imported { .. } => {
                    return Err(UnhandledEvent {
                        event_type: event.event_type(),
                    })
                }
            }
            Ok(())
        }

        fn ensure_valid_state(&self) -> Result<(), InvariantViolation> {
            if !self.opened && self.total != 0 {
                return Err(InvariantViolation::new("tally must be opened before counting"));
            }
            if self.total < 0 {
                return Err(InvariantViolation::new("total must not be negative"));
            }
            Ok(())
        }
    }

    fn opened() -> TallyEvent {
        TallyEvent::Opened {
            id: EventIdType::generate(),
        }
    }

    fn counted(delta: i64) -> TallyEvent {
        TallyEvent::Counted {
            id: EventIdType::generate(),
            delta,
        }
    }

    #[test]
    fn apply_records_events_in_call_order() {
        let mut tally = Entity::<TallyState>::init(TallyId::generate());
        let events = vec![opened(), counted(2), counted(3)];

        for event in &events {
            tally.apply(event.clone()).unwrap();
        }

        assert_eq!(tally.changes(), events.as_slice());
        assert_eq!(tally.state().total, 5);
    }

    #[test]
    fn changes_can_be_read_any_number_of_times() {
        let mut tally = Entity::<TallyState>::init(TallyId::generate());
        tally.apply(opened()).unwrap();

        let first = tally.changes().to_vec();
        let second = tally.changes().to_vec();
        assert_eq!(first, second);
        assert_eq!(tally.changes().len(), 1);
    }

    #[test]
    fn a_refused_event_leaves_state_and_changes_untouched() {
        let mut tally = Entity::<TallyState>::init(TallyId::generate());
        let recorded = vec![opened(), counted(2)];
        for event in &recorded {
            tally.apply(event.clone()).unwrap();
        }

        let bad = counted(-5);
        let err = tally.apply(bad.clone()).unwrap_err();

        assert_eq!(err.event, bad);
        assert!(matches!(
            err.reason,
            TransitionError::Invariant(ref v) if v.rule == "total must not be negative"
        ));
        assert_eq!(tally.changes(), recorded.as_slice());
        assert_eq!(tally.state().total, 2);
    }

    #[test]
    fn an_event_before_the_first_one_is_rejected() {
        let mut tally = Entity::<TallyState>::init(TallyId::generate());

        let err = tally.apply(counted(1)).unwrap_err();

        assert!(matches!(
            err.reason,
            TransitionError::Invariant(ref v) if v.rule == "tally must be opened before counting"
        ));
        assert!(tally.changes().is_empty());
        assert_eq!(tally.state().total, 0);
    }

    #[test]
    fn an_unhandled_event_is_refused_loudly() {
        let mut tally = Entity::<TallyState>::init(TallyId::generate());
        let first = opened();
        tally.apply(first.clone()).unwrap();

        let foreign = TallyEvent::Imported {
            id: EventIdType::generate(),
        };
        let err = tally.apply(foreign).unwrap_err();

        assert!(matches!(
            err.reason,
            TransitionError::Unhandled(ref u) if u.event_type == "TallyImported"
        ));
        assert_eq!(tally.changes(), &[first]);
    }

    #[test]
    fn clear_changes_drains_the_log_and_is_idempotent() {
        let mut tally = Entity::<TallyState>::init(TallyId::generate());
        tally.apply(opened()).unwrap();
        tally.apply(counted(1)).unwrap();

        tally.clear_changes();
        assert!(tally.changes().is_empty());

        tally.clear_changes();
        assert!(tally.changes().is_empty());
        assert_eq!(tally.state().total, 1);
    }

    #[test]
    fn rehydrate_folds_history_without_pending_changes() {
        let id = TallyId::generate();
        let history = vec![opened(), counted(4), counted(1)];

        let tally = Entity::<TallyState>::rehydrate(id, history).unwrap();

        assert!(tally.changes().is_empty());
        assert_eq!(tally.state().total, 5);
        assert_eq!(*tally.id(), id);
    }

    #[test]
    fn rehydrate_rejects_a_corrupt_history() {
        let id = TallyId::generate();
        let history = vec![counted(4)];

        let result = Entity::<TallyState>::rehydrate(id, history);
        assert!(result.is_err());
    }

    #[test]
    fn serialized_changes_emit_one_record_per_event_in_order() {
        let mut tally = Entity::<TallyState>::init(TallyId::generate());
        tally.apply(opened()).unwrap();
        tally.apply(counted(7)).unwrap();

        let codec = Json::<TallyEvent>::default();
        let records = tally.serialized_changes(&codec).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_type, "TallyOpened");
        assert_eq!(records[1].event_type, "TallyCounted");
        for (record, event) in records.iter().zip(tally.changes()) {
            assert_eq!(record.entity_id, tally.id().to_string());
            assert_eq!(record.entity_type, "Tally");
            assert_eq!(record.id, event.id().to_string());
            let back: TallyEvent = codec.deserialize(&record.payload).unwrap();
            assert_eq!(&back, event);
        }
    }
}
