//! Webhook-driven order state machine.
//!
//! The reconciler is the only component allowed to transition order status.
//! Every handler tolerates duplicate and out-of-order delivery: the event-id
//! ledger short-circuits exact replays, and each transition is a conditional
//! update that treats a no-op match as success.

use crate::checkout::settlement::{PayoutEngine, ReversalEngine};
use crate::db::Repository;
use crate::domain::{Minor, Order, OrderStatus, ProviderEvent, TimeMs};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// What processing an event amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The event changed local state.
    Applied,
    /// A replay or an out-of-order duplicate; state already reflects it.
    AlreadyProcessed,
    /// Verified but not actionable (unknown transaction, unhandled type).
    Ignored,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

pub struct Reconciler {
    repo: Arc<Repository>,
    payouts: Arc<PayoutEngine>,
    reversals: Arc<ReversalEngine>,
}

impl Reconciler {
    pub fn new(
        repo: Arc<Repository>,
        payouts: Arc<PayoutEngine>,
        reversals: Arc<ReversalEngine>,
    ) -> Self {
        Self {
            repo,
            payouts,
            reversals,
        }
    }

    /// Process one verified provider event.
    pub async fn process(
        &self,
        event_id: &str,
        event: &ProviderEvent,
    ) -> Result<Outcome, ReconcileError> {
        let now = TimeMs::now();

        // Insert-first idempotency guard: a duplicate delivery is done here.
        let fresh = self
            .repo
            .record_webhook_event(event_id, event_type_name(event), now)
            .await?;
        if !fresh {
            info!(event_id, "Duplicate webhook event, skipping");
            return Ok(Outcome::AlreadyProcessed);
        }

        let outcome = self.dispatch(event, now).await;

        // A failed handler must not leave the event marked processed, or the
        // provider's retry would be swallowed as a duplicate.
        if outcome.is_err() {
            if let Err(e) = self.repo.delete_webhook_event(event_id).await {
                error!(event_id, error = %e, "Failed to unrecord webhook event");
            }
        }

        outcome
    }

    async fn dispatch(
        &self,
        event: &ProviderEvent,
        now: TimeMs,
    ) -> Result<Outcome, ReconcileError> {
        match event {
            ProviderEvent::PaymentSucceeded { transaction_id } => {
                self.handle_payment_succeeded(transaction_id, now).await
            }
            ProviderEvent::PaymentFailed { transaction_id }
            | ProviderEvent::PaymentCanceled { transaction_id } => {
                self.handle_payment_failed(transaction_id).await
            }
            ProviderEvent::ChargeRefunded {
                transaction_id,
                amount_refunded,
                charge_amount,
            } => {
                self.handle_reversal(transaction_id, "refund", *amount_refunded, *charge_amount, now)
                    .await
            }
            ProviderEvent::DisputeCreated {
                transaction_id,
                amount,
                charge_amount,
            } => {
                self.handle_reversal(transaction_id, "dispute", *amount, *charge_amount, now)
                    .await
            }
            ProviderEvent::Unrecognized { event_type } => {
                info!(event_type, "Unhandled webhook event type");
                Ok(Outcome::Ignored)
            }
        }
    }

    async fn handle_payment_succeeded(
        &self,
        transaction_id: &str,
        now: TimeMs,
    ) -> Result<Outcome, ReconcileError> {
        let Some(order) = self.find_order(transaction_id).await? else {
            return Ok(Outcome::Ignored);
        };

        match order.status {
            OrderStatus::Paid => return Ok(Outcome::AlreadyProcessed),
            OrderStatus::Failed | OrderStatus::Cancelled => {
                warn!(
                    order_id = %order.id,
                    status = order.status.as_db(),
                    "payment_succeeded for a terminal order; ignoring"
                );
                return Ok(Outcome::Ignored);
            }
            OrderStatus::Pending => {}
        }

        // Claim the transition and finalize items atomically; a concurrent
        // delivery that loses the claim sees None and stops here.
        let Some(items) = self.repo.apply_paid_transition(&order.id).await? else {
            return Ok(Outcome::AlreadyProcessed);
        };

        info!(
            order_id = %order.id,
            total = order.total.as_i64(),
            "Order paid"
        );

        // Post-payment side effects. Each failure is logged and swallowed:
        // payment success is never undone by a downstream clerical failure.
        if let Err(e) = self.payouts.schedule(&order, &items, now).await {
            error!(order_id = %order.id, error = %e, "Payout scheduling failed");
        }
        if let Err(e) = self.repo.delete_cart(&order.cart_id).await {
            error!(order_id = %order.id, error = %e, "Cart teardown failed");
        }

        Ok(Outcome::Applied)
    }

    async fn handle_payment_failed(
        &self,
        transaction_id: &str,
    ) -> Result<Outcome, ReconcileError> {
        let Some(order) = self.find_order(transaction_id).await? else {
            return Ok(Outcome::Ignored);
        };

        let flipped = self
            .repo
            .set_order_status_if(&order.id, OrderStatus::Pending, OrderStatus::Failed, None)
            .await?;
        if !flipped {
            // Already terminal; whichever transition won also handled holds.
            return Ok(Outcome::AlreadyProcessed);
        }

        self.repo.release_holds_for_order(&order.id).await?;
        info!(order_id = %order.id, "Order failed, holds released");
        Ok(Outcome::Applied)
    }

    async fn handle_reversal(
        &self,
        transaction_id: &str,
        kind: &str,
        affected_amount: Minor,
        charge_amount: Minor,
        now: TimeMs,
    ) -> Result<Outcome, ReconcileError> {
        let Some(order) = self.find_order(transaction_id).await? else {
            return Ok(Outcome::Ignored);
        };

        self.repo
            .record_refund_event(&order.id, kind, affected_amount, charge_amount, now)
            .await?;
        self.repo
            .add_refunded_amount(&order.id, affected_amount)
            .await?;

        // Order status is untouched by refunds and disputes.
        let reversed = self
            .reversals
            .apply(&order, affected_amount, charge_amount)
            .await?;
        info!(
            order_id = %order.id,
            kind,
            amount = affected_amount.as_i64(),
            reversed,
            "Reversal applied"
        );

        Ok(Outcome::Applied)
    }

    async fn find_order(&self, transaction_id: &str) -> Result<Option<Order>, ReconcileError> {
        let order = self.repo.find_order_by_transaction(transaction_id).await?;
        if order.is_none() {
            warn!(transaction_id, "Webhook references an unknown transaction");
        }
        Ok(order)
    }
}

fn event_type_name(event: &ProviderEvent) -> &str {
    match event {
        ProviderEvent::PaymentSucceeded { .. } => "payment_intent.succeeded",
        ProviderEvent::PaymentFailed { .. } => "payment_intent.payment_failed",
        ProviderEvent::PaymentCanceled { .. } => "payment_intent.canceled",
        ProviderEvent::ChargeRefunded { .. } => "charge.refunded",
        ProviderEvent::DisputeCreated { .. } => "charge.dispute.created",
        ProviderEvent::Unrecognized { event_type } => event_type,
    }
}
