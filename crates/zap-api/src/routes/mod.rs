//! # Route Modules
//!
//! Each module defines an Axum Router for one API surface area.
//! Routers are assembled in [`crate::app`].

pub mod parcels;
pub mod payments;
pub mod riders;
pub mod trackings;
pub mod users;
