//! Checkout orchestration: intent creation, webhook reconciliation, and
//! settlement.

pub mod intent;
pub mod reconcile;
pub mod settlement;

pub use intent::{
    BusinessDetails, CheckoutError, CheckoutService, CreateIntentRequest, CreateIntentResponse,
};
pub use reconcile::{Outcome, ReconcileError, Reconciler};
pub use settlement::{PayoutEngine, ReversalEngine};
