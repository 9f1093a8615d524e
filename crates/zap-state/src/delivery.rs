//! # Parcel Delivery Lifecycle
//!
//! The delivery status of a parcel as a closed enum with an explicit
//! transition table.
//!
//! ## States
//!
//! ```text
//! parcel-created ──pay──▶ pending-pickup ──assign──▶ driver-assigned
//!                               ▲                        │  │
//!                               └────────reject──────────┘  │ advance
//!                                                           ▼
//!                   rider-arriving ─▶ parcel-picked-up ─▶ in-transit ─▶ parcel-delivered
//! ```
//!
//! `parcel-created` is never re-entered. `parcel-delivered` is terminal; the
//! only action it accepts is the idempotent repeat `advance(parcel-delivered)`.
//!
//! ## Advancing
//!
//! Riders may skip intermediate statuses (a rider who never reported
//! `rider-arriving` can still report `parcel-picked-up`) but may never move
//! backwards. Re-reporting the current status is accepted as a no-op so that
//! client retries are harmless.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::AssignmentPolicy;

// ─── Delivery Status ─────────────────────────────────────────────────

/// Where a parcel is in its delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryStatus {
    /// Created by the sender, awaiting payment.
    ParcelCreated,
    /// Paid; waiting for a rider to be assigned.
    PendingPickup,
    /// A rider has been assigned but has not set off.
    DriverAssigned,
    /// The rider is on the way to the pickup address.
    RiderArriving,
    /// The rider has collected the parcel.
    ParcelPickedUp,
    /// The parcel is on the way to the recipient.
    InTransit,
    /// Delivered to the recipient (terminal).
    ParcelDelivered,
}

impl DeliveryStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [DeliveryStatus; 7] = [
        Self::ParcelCreated,
        Self::PendingPickup,
        Self::DriverAssigned,
        Self::RiderArriving,
        Self::ParcelPickedUp,
        Self::InTransit,
        Self::ParcelDelivered,
    ];

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParcelCreated => "parcel-created",
            Self::PendingPickup => "pending-pickup",
            Self::DriverAssigned => "driver-assigned",
            Self::RiderArriving => "rider-arriving",
            Self::ParcelPickedUp => "parcel-picked-up",
            Self::InTransit => "in-transit",
            Self::ParcelDelivered => "parcel-delivered",
        }
    }

    /// Position in the rider-driven part of the lifecycle.
    ///
    /// `None` for the statuses that precede rider assignment; those can
    /// never be the target of an advance.
    pub fn rank(&self) -> Option<u8> {
        match self {
            Self::ParcelCreated | Self::PendingPickup => None,
            Self::DriverAssigned => Some(0),
            Self::RiderArriving => Some(1),
            Self::ParcelPickedUp => Some(2),
            Self::InTransit => Some(3),
            Self::ParcelDelivered => Some(4),
        }
    }

    /// A rider is attached and the parcel is not yet delivered.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::DriverAssigned | Self::RiderArriving | Self::ParcelPickedUp | Self::InTransit
        )
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ParcelDelivered)
    }

    /// Human-readable form used as a tracking event's `details`.
    pub fn details(&self) -> String {
        self.as_str().replace(['-', '_'], " ")
    }

    /// Apply an action under the default (strict) assignment policy.
    pub fn apply(self, action: LifecycleAction) -> Result<DeliveryStatus, TransitionError> {
        self.apply_with(action, AssignmentPolicy::default())
    }

    /// Apply an action, returning the next status or rejecting the action.
    ///
    /// A returned status equal to `self` means the action is an accepted
    /// idempotent repeat.
    pub fn apply_with(
        self,
        action: LifecycleAction,
        policy: AssignmentPolicy,
    ) -> Result<DeliveryStatus, TransitionError> {
        use DeliveryStatus::*;
        use LifecycleAction::*;

        let next = match (self, action) {
            (ParcelCreated | PendingPickup, Pay) => Some(PendingPickup),
            (PendingPickup | DriverAssigned, Assign) => Some(DriverAssigned),
            (RiderArriving, Assign) if policy == AssignmentPolicy::Override => {
                Some(DriverAssigned)
            }
            (DriverAssigned, Reject) => Some(PendingPickup),
            (ParcelDelivered, Advance(ParcelDelivered)) => Some(ParcelDelivered),
            (from, Advance(to)) if from.is_in_flight() => match (from.rank(), to.rank()) {
                (Some(f), Some(t)) if t >= f => Some(to),
                _ => None,
            },
            _ => None,
        };

        next.ok_or(TransitionError::InvalidTransition { from: self, action })
    }

    /// Whether a parcel in this status may be withdrawn.
    ///
    /// Only a parcel still in `parcel-created` qualifies. Once paid it has a
    /// payment on record and may have a rider attached.
    pub fn check_cancel(self) -> Result<(), TransitionError> {
        if self == Self::ParcelCreated {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                from: self,
                action: LifecycleAction::Cancel,
            })
        }
    }

    /// Statuses reachable from `self` under the given policy.
    pub fn valid_transitions(&self, policy: AssignmentPolicy) -> Vec<DeliveryStatus> {
        let mut actions = vec![LifecycleAction::Pay, LifecycleAction::Assign, LifecycleAction::Reject];
        actions.extend(Self::ALL.iter().copied().map(LifecycleAction::Advance));

        let mut out: Vec<DeliveryStatus> = Vec::new();
        for action in actions {
            if let Ok(next) = self.apply_with(action, policy) {
                if next != *self && !out.contains(&next) {
                    out.push(next);
                }
            }
        }
        out
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| TransitionError::UnknownStatus(s.to_string()))
    }
}

// ─── Actions ─────────────────────────────────────────────────────────

/// An operation that drives the delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    /// Payment confirmed.
    Pay,
    /// A rider is (re)assigned by an operator.
    Assign,
    /// The assigned rider reports progress.
    Advance(DeliveryStatus),
    /// The assigned rider hands the parcel back to the pool.
    Reject,
    /// The parcel is withdrawn. Never yields a next status; see
    /// [`DeliveryStatus::check_cancel`].
    Cancel,
}

impl std::fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pay => f.write_str("pay"),
            Self::Assign => f.write_str("assign"),
            Self::Advance(to) => write!(f, "advance to {to}"),
            Self::Reject => f.write_str("reject"),
            Self::Cancel => f.write_str("cancel"),
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors from the delivery lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The action is not permitted from the current status.
    #[error("cannot {action} a parcel in status {from}")]
    InvalidTransition {
        /// Status the parcel was in.
        from: DeliveryStatus,
        /// Rejected action.
        action: LifecycleAction,
    },

    /// A status string outside the closed set.
    #[error("unknown delivery status \"{0}\"")]
    UnknownStatus(String),
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = DeliveryStatus> {
        prop::sample::select(DeliveryStatus::ALL.to_vec())
    }

    fn any_action() -> impl Strategy<Value = LifecycleAction> {
        prop_oneof![
            Just(LifecycleAction::Pay),
            Just(LifecycleAction::Assign),
            Just(LifecycleAction::Reject),
            Just(LifecycleAction::Cancel),
            any_status().prop_map(LifecycleAction::Advance),
        ]
    }

    fn any_policy() -> impl Strategy<Value = AssignmentPolicy> {
        prop_oneof![Just(AssignmentPolicy::Strict), Just(AssignmentPolicy::Override)]
    }

    proptest! {
        /// An accepted advance never lowers the rank.
        #[test]
        fn advance_never_moves_backwards(
            from in any_status(),
            to in any_status(),
            policy in any_policy(),
        ) {
            if let Ok(next) = from.apply_with(LifecycleAction::Advance(to), policy) {
                prop_assert_eq!(next, to);
                prop_assert!(from.rank().is_some());
                prop_assert!(next.rank() >= from.rank());
            }
        }

        /// No action ever leads into `parcel-created`.
        #[test]
        fn parcel_created_is_never_a_result(
            from in any_status(),
            action in any_action(),
            policy in any_policy(),
        ) {
            if let Ok(next) = from.apply_with(action, policy) {
                prop_assert_ne!(next, DeliveryStatus::ParcelCreated);
            }
        }

        /// From delivered, every action but the idempotent repeat is refused.
        #[test]
        fn delivered_only_accepts_its_own_repeat(
            action in any_action(),
            policy in any_policy(),
        ) {
            let result = DeliveryStatus::ParcelDelivered.apply_with(action, policy);
            if action == LifecycleAction::Advance(DeliveryStatus::ParcelDelivered) {
                prop_assert_eq!(result, Ok(DeliveryStatus::ParcelDelivered));
            } else {
                prop_assert!(result.is_err());
            }
        }

        /// Walking any action sequence keeps the rank monotone once a rider
        /// is attached, unless the rider hands the parcel back.
        #[test]
        fn walks_only_regress_through_reject_or_reassign(
            actions in prop::collection::vec(any_action(), 0..24),
            policy in any_policy(),
        ) {
            let mut current = DeliveryStatus::ParcelCreated;
            for action in actions {
                if let Ok(next) = current.apply_with(action, policy) {
                    if next.rank() < current.rank() {
                        prop_assert!(matches!(
                            action,
                            LifecycleAction::Reject | LifecycleAction::Assign
                        ));
                    }
                    current = next;
                }
            }
        }
    }
}
