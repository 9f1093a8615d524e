//! # zap-state: Dispatch State Machines
//!
//! Pure, I/O-free state machines for the delivery workflow. Persistence and
//! side effects live in `zap-dispatch`; this crate only answers "given this
//! state and this action, what is the next state, or is it rejected?".
//!
//! ## State Machines
//!
//! - **Delivery** (`delivery.rs`): a parcel's delivery status as a closed enum
//!   with an explicit transition table over [`LifecycleAction`]s.
//!
//! - **Rider** (`rider.rs`): approval status and work status (availability).
//!
//! - **Payment** (`payment.rs`): unpaid → paid.
//!
//! - **Policy** (`policy.rs`): the rider assignment policy that widens or
//!   narrows the `Assign` edges of the delivery table.
//!
//! ## Design
//!
//! Statuses travel over the wire as kebab-case strings (`pending-pickup`).
//! Unknown strings are rejected at parse time instead of being stored.

pub mod delivery;
pub mod payment;
pub mod policy;
pub mod rider;

pub use delivery::{DeliveryStatus, LifecycleAction, TransitionError};
pub use payment::PaymentStatus;
pub use policy::AssignmentPolicy;
pub use rider::{RiderApproval, WorkStatus};
