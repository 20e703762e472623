//! # Store: the user's records and the capability that persists them
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`records`] | The [`RecordStore`] trait and the [`Query`] builder over the seven backend collections |
//! | [`models`] | Row types for profiles and the six user-owned entities, with their drafts and patches |
//! | [`entity`] | The [`Entity`] schema trait and the generic [`EntityController`] |
//! | [`ordering`] | Append-at-end rank assignment for manually ordered records |
//! | [`error`] | [`DataError`] and [`ValidationError`] |
//!
//! [`MemoryStore`] is an in-process [`RecordStore`] used by tests and offline demos.

pub mod entity;
pub mod error;
pub mod models;
pub mod ordering;
pub mod records;

mod memory;
pub use memory::{MemoryStore, Operation};

pub use entity::{Entity, EntityController};
pub use error::{DataError, ValidationError};
pub use models::{
    ActionMemo, Event, ImportantDate, PartnerPreference, Profile, Relationship, RelationshipTag,
    ThemeMode, DEFAULT_PRIMARY,
};
pub use ordering::next_priority;
pub use records::{Collection, Filter, Order, Query, RecordStore, Row};
