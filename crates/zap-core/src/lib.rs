//! # zap-core: Foundational Types for Zap Dispatch
//!
//! Defines the identifier and contact primitives shared by every other crate
//! in the workspace. It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `ParcelId`, `RiderId`,
//!    `TrackingId`, `TransactionId`, `CheckoutSessionId` are distinct types.
//!    A rider id cannot be passed where a parcel id is expected.
//!
//! 2. **Tracking ids are minted here and nowhere else.** [`TrackingId::mint`]
//!    produces the `zap-<YYYYMMDD>-<6 hex>` format; [`TrackingId::parse`]
//!    validates the same format at the boundary.
//!
//! 3. **Emails are normalized on construction.** [`Email`] trims and
//!    lowercases so that role lookups and rider matching compare equal values.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `zap-*` crates.
//! - No `.unwrap()` outside tests.

pub mod contact;
pub mod error;
pub mod identity;
pub mod tracking;

pub use contact::Email;
pub use error::ValidationError;
pub use identity::{CheckoutSessionId, ParcelId, RiderId, TransactionId};
pub use tracking::TrackingId;
