//! Payout scheduling and reversal execution.

use crate::db::Repository;
use crate::domain::{Minor, Order, OrderItem, Payout, PayoutId, PayoutStatus, TimeMs};
use crate::engine::{artist_share, compute_reversal};
use crate::gateway::PaymentGateway;
use std::sync::Arc;
use tracing::{info, warn};

/// Creates artist payouts when an order is paid and executes transfers once
/// the availability delay elapses.
pub struct PayoutEngine {
    repo: Arc<Repository>,
    gateway: Arc<dyn PaymentGateway>,
    fee_bps: i64,
    delay_days: i64,
}

impl PayoutEngine {
    pub fn new(
        repo: Arc<Repository>,
        gateway: Arc<dyn PaymentGateway>,
        fee_bps: i64,
        delay_days: i64,
    ) -> Self {
        Self {
            repo,
            gateway,
            fee_bps,
            delay_days,
        }
    }

    /// Create one pending payout per order item.
    ///
    /// With a zero delay the transfer is attempted synchronously; a transfer
    /// failure leaves the payout pending for a later `run_due` pass and never
    /// fails the surrounding payment flow.
    pub async fn schedule(
        &self,
        order: &Order,
        items: &[OrderItem],
        now: TimeMs,
    ) -> Result<Vec<Payout>, sqlx::Error> {
        let available_at = (self.delay_days > 0).then(|| now.plus_days(self.delay_days));

        let payouts: Vec<Payout> = items
            .iter()
            .map(|item| Payout {
                id: PayoutId::new(),
                order_id: order.id,
                order_item_id: item.id,
                artist_id: item.artist_id,
                amount: artist_share(item.subtotal, self.fee_bps),
                currency: order.currency.clone(),
                status: PayoutStatus::Pending,
                available_at,
                transfer_id: None,
                created_at: now,
            })
            .collect();

        self.repo.insert_payouts(&payouts).await?;
        info!(
            order_id = %order.id,
            count = payouts.len(),
            "Scheduled artist payouts"
        );

        if self.delay_days == 0 {
            for payout in &payouts {
                self.attempt_transfer(payout).await;
            }
        }

        Ok(payouts)
    }

    /// Execute transfers for pending payouts whose delay has elapsed.
    ///
    /// Payouts on orders that have accumulated refunds are skipped and
    /// flagged for operator review rather than paid blind.
    pub async fn run_due(&self, now: TimeMs) -> Result<usize, sqlx::Error> {
        let due = self.repo.list_due_payouts(now).await?;
        let mut executed = 0;

        for payout in &due {
            let order = self.repo.get_order(&payout.order_id).await?;
            if let Some(order) = order {
                if order.refunded.is_positive() {
                    warn!(
                        payout_id = %payout.id,
                        order_id = %order.id,
                        refunded = order.refunded.as_i64(),
                        "Skipping due payout on a refunded order"
                    );
                    continue;
                }
            }
            if self.attempt_transfer(payout).await {
                executed += 1;
            }
        }

        Ok(executed)
    }

    /// Try to move one payout to paid via a provider transfer.
    async fn attempt_transfer(&self, payout: &Payout) -> bool {
        let account = match self.repo.artist_provider_account(&payout.artist_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                warn!(
                    payout_id = %payout.id,
                    artist_id = %payout.artist_id,
                    "Artist has no provider account; payout stays pending"
                );
                return false;
            }
            Err(e) => {
                warn!(payout_id = %payout.id, error = %e, "Account lookup failed");
                return false;
            }
        };

        match self
            .gateway
            .create_transfer(&account, payout.amount, &payout.currency)
            .await
        {
            Ok(transfer_id) => match self.repo.mark_payout_paid(&payout.id, &transfer_id).await {
                Ok(marked) => marked,
                Err(e) => {
                    warn!(payout_id = %payout.id, error = %e, "Failed to record transfer");
                    false
                }
            },
            Err(e) => {
                warn!(
                    payout_id = %payout.id,
                    error = %e,
                    "Transfer failed; payout stays pending for retry"
                );
                false
            }
        }
    }
}

/// Applies proportional payout reversals when part or all of an order's
/// charge is refunded or disputed.
pub struct ReversalEngine {
    repo: Arc<Repository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl ReversalEngine {
    pub fn new(repo: Arc<Repository>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { repo, gateway }
    }

    /// Reverse each paid payout by its item's proportional share of the
    /// affected amount. Returns how many payouts were reversed.
    pub async fn apply(
        &self,
        order: &Order,
        affected_amount: Minor,
        charge_amount: Minor,
    ) -> Result<usize, sqlx::Error> {
        let items = self.repo.list_order_items(&order.id).await?;
        let payouts = self.repo.list_payouts_for_order(&order.id).await?;
        let mut reversed = 0;

        for payout in payouts {
            if payout.status != PayoutStatus::Paid {
                continue;
            }
            let Some(item) = items.iter().find(|i| i.id == payout.order_item_id) else {
                warn!(payout_id = %payout.id, "Payout references a missing order item");
                continue;
            };

            let reversal =
                compute_reversal(item.subtotal, affected_amount, charge_amount, payout.amount);
            if !reversal.is_positive() {
                continue;
            }

            if let Some(transfer_id) = &payout.transfer_id {
                if let Err(e) = self.gateway.reverse_transfer(transfer_id, reversal).await {
                    warn!(
                        payout_id = %payout.id,
                        error = %e,
                        "Transfer reversal failed; payout left paid"
                    );
                    continue;
                }
            }

            if self.repo.mark_payout_reversed(&payout.id).await? {
                info!(
                    payout_id = %payout.id,
                    amount = reversal.as_i64(),
                    "Payout reversed"
                );
                reversed += 1;
            }
        }

        Ok(reversed)
    }
}
