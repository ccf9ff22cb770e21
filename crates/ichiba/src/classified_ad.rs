use crate::{
    domain_event::DomainEvent,
    entity::{Entity, EntityState, InvalidStateTransition, InvariantViolation, UnhandledEvent},
    entity_id::{EntityId, HasIdPrefix},
    event_id::EventIdType,
    message::Message,
    values::{AdText, AdTitle, Price},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ad;

impl HasIdPrefix for Ad {
    const PREFIX: &'static str = "ad";
}

pub type AdId = EntityId<Ad>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct User;

impl HasIdPrefix for User {
    const PREFIX: &'static str = "usr";
}

pub type UserId = EntityId<User>;

/// Everything that can happen to a classified ad listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdEvent {
    Created {
        id: EventIdType,
        ad_id: AdId,
        owner: UserId,
    },
    TitleChanged {
        id: EventIdType,
        title: AdTitle,
    },
    TextUpdated {
        id: EventIdType,
        text: AdText,
    },
    PriceUpdated {
        id: EventIdType,
        price: Price,
    },
    SentForReview {
        id: EventIdType,
    },
    Published {
        id: EventIdType,
        approved_by: UserId,
    },
    Archived {
        id: EventIdType,
    },
}

impl Message for AdEvent {
    fn name(&self) -> &'static str {
        "ClassifiedAdEvent"
    }
}

impl DomainEvent for AdEvent {
    fn id(&self) -> EventIdType {
        match self {
            Self::Created { id, .. } => *id,
            Self::TitleChanged { id, .. } => *id,
            Self::TextUpdated { id, .. } => *id,
            Self::PriceUpdated { id, .. } => *id,
            Self::SentForReview { id } => *id,
            Self::Published { id, .. } => *id,
            Self::Archived { id } => *id,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "ClassifiedAdCreated",
            Self::TitleChanged { .. } => "ClassifiedAdTitleChanged",
            Self::TextUpdated { .. } => "ClassifiedAdTextUpdated",
            Self::PriceUpdated { .. } => "ClassifiedAdPriceUpdated",
            Self::SentForReview { .. } => "ClassifiedAdSentForReview",
            Self::Published { .. } => "ClassifiedAdPublished",
            Self::Archived { .. } => "ClassifiedAdArchived",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdStatus {
    Uninitialized,
    Inactive,
    PendingReview,
    Active,
    Archived,
}

const MAX_TITLE_CHARS: usize = 100;

/// A classified ad listing.
///
/// The lifecycle runs `Uninitialized -> Inactive -> PendingReview ->
/// Active -> Archived`; which event sequences are legal is decided by
/// `ensure_valid_state` plus the command guards below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedAd {
    id: AdId,
    owner: Option<UserId>,
    title: Option<AdTitle>,
    text: Option<AdText>,
    price: Option<Price>,
    approved_by: Option<UserId>,
    status: AdStatus,
}

impl ClassifiedAd {
    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn title(&self) -> Option<&AdTitle> {
        self.title.as_ref()
    }

    pub fn text(&self) -> Option<&AdText> {
        self.text.as_ref()
    }

    pub fn price(&self) -> Option<&Price> {
        self.price.as_ref()
    }

    pub fn approved_by(&self) -> Option<UserId> {
        self.approved_by
    }

    pub fn status(&self) -> AdStatus {
        self.status
    }

    fn is_complete(&self) -> bool {
        self.title.is_some() && self.text.is_some() && self.price.as_ref().is_some_and(|p| p.amount_minor() > 0)
    }
}

impl EntityState for ClassifiedAd {
    const TYPE: &'static str = "ClassifiedAd";
    type ID = Ad;
    type Event = AdEvent;

    fn init(id: AdId) -> Self {
        Self {
            id,
            owner: None,
            title: None,
            text: None,
            price: None,
            approved_by: None,
            status: AdStatus::Uninitialized,
        }
    }

    fn id(&self) -> &AdId {
        &self.id
    }

    fn when(&mut self, event: &AdEvent) -> Result<(), UnhandledEvent> {
        match event {
            AdEvent::Created { ad_id, owner, .. } => {
                self.id = *ad_id;
                self.owner = Some(*owner);
                self.status = AdStatus::Inactive;
            }
            AdEvent::TitleChanged { title, .. } => self.title = Some(title.clone()),
            AdEvent::TextUpdated { text, .. } => self.text = Some(text.clone()),
            AdEvent::PriceUpdated { price, .. } => self.price = Some(price.clone()),
            AdEvent::SentForReview { .. } => self.status = AdStatus::PendingReview,
            AdEvent::Published { approved_by, .. } => {
                self.approved_by = Some(*approved_by);
                self.status = AdStatus::Active;
            }
            AdEvent::Archived { .. } => self.status = AdStatus::Archived,
        }
        Ok(())
    }

    fn ensure_valid_state(&self) -> Result<(), InvariantViolation> {
        if self.status == AdStatus::Uninitialized {
            if self.owner.is_some()
                || self.title.is_some()
                || self.text.is_some()
                || self.price.is_some()
                || self.approved_by.is_some()
            {
                return Err(InvariantViolation::new("listing must be created before it can change"));
            }
            return Ok(());
        }

        if self.owner.is_none() {
            return Err(InvariantViolation::new("listing must have an owner"));
        }

        if let Some(title) = &self.title {
            if title.as_str().trim().is_empty() {
                return Err(InvariantViolation::new("title must not be empty"));
            }
            if title.as_str().chars().count() > MAX_TITLE_CHARS {
                return Err(InvariantViolation::new("title must be at most 100 characters"));
            }
        }

        if let Some(text) = &self.text {
            if text.as_str().trim().is_empty() {
                return Err(InvariantViolation::new("text must not be empty"));
            }
        }

        if let Some(price) = &self.price {
            if price.amount_minor() < 0 {
                return Err(InvariantViolation::new("price must not be negative"));
            }
        }

        match self.status {
            AdStatus::PendingReview => {
                if !self.is_complete() {
                    return Err(InvariantViolation::new(
                        "a listing sent for review must have a title, text and a non-zero price",
                    ));
                }
            }
            AdStatus::Active => {
                if !self.is_complete() {
                    return Err(InvariantViolation::new(
                        "an active listing must have a title, text and a non-zero price",
                    ));
                }
                if self.approved_by.is_none() {
                    return Err(InvariantViolation::new("an active listing must be approved"));
                }
            }
            _ => {}
        }

        Ok(())
    }
}

pub type ClassifiedAdEntity = Entity<ClassifiedAd>;

/// Command surface. Each method builds one event and routes it through
/// `apply`; guards cover the transitions current state alone cannot
/// express, such as changes to an archived listing.
impl Entity<ClassifiedAd> {
    pub fn create(id: AdId, owner: UserId) -> Result<Self, InvalidStateTransition<AdEvent>> {
        let mut listing = Self::init(id);
        listing.apply(AdEvent::Created {
            id: EventIdType::generate(),
            ad_id: id,
            owner,
        })?;
        Ok(listing)
    }

    pub fn set_title(&mut self, title: AdTitle) -> Result<(), InvalidStateTransition<AdEvent>> {
        let event = self.refuse_when_archived(AdEvent::TitleChanged {
            id: EventIdType::generate(),
            title,
        })?;
        self.apply(event)
    }

    pub fn update_text(&mut self, text: AdText) -> Result<(), InvalidStateTransition<AdEvent>> {
        let event = self.refuse_when_archived(AdEvent::TextUpdated {
            id: EventIdType::generate(),
            text,
        })?;
        self.apply(event)
    }

    pub fn update_price(&mut self, price: Price) -> Result<(), InvalidStateTransition<AdEvent>> {
        let event = self.refuse_when_archived(AdEvent::PriceUpdated {
            id: EventIdType::generate(),
            price,
        })?;
        self.apply(event)
    }

    pub fn request_to_publish(&mut self) -> Result<(), InvalidStateTransition<AdEvent>> {
        let event = AdEvent::SentForReview {
            id: EventIdType::generate(),
        };
        if self.state().status() != AdStatus::Inactive {
            return Err(InvalidStateTransition {
                event,
                reason: InvariantViolation::new("only an inactive listing can be sent for review").into(),
            });
        }
        self.apply(event)
    }

    pub fn publish(&mut self, approved_by: UserId) -> Result<(), InvalidStateTransition<AdEvent>> {
        let event = AdEvent::Published {
            id: EventIdType::generate(),
            approved_by,
        };
        if self.state().status() != AdStatus::PendingReview {
            return Err(InvalidStateTransition {
                event,
                reason: InvariantViolation::new("only a listing pending review can be published").into(),
            });
        }
        self.apply(event)
    }

    pub fn archive(&mut self) -> Result<(), InvalidStateTransition<AdEvent>> {
        let event = self.refuse_when_archived(AdEvent::Archived {
            id: EventIdType::generate(),
        })?;
        self.apply(event)
    }

    fn refuse_when_archived(&self, event: AdEvent) -> Result<AdEvent, InvalidStateTransition<AdEvent>> {
        if self.state().status() == AdStatus::Archived {
            return Err(InvalidStateTransition {
                event,
                reason: InvariantViolation::new("an archived listing cannot change").into(),
            });
        }
        Ok(event)
    }
}
