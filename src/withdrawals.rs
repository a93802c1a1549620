//! Commission withdrawal requests.
//!
//! Processing is guarded by status, not by catching downstream errors:
//! only a PENDING request can be processed or rejected, and a credit whose
//! commission is already paid is skipped, so commissions are credited
//! exactly once no matter how often processing is attempted.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::error::{CrediflowError, Result};
use crate::model::{new_id, Account, WithdrawalRequest, WithdrawalStatus};
use crate::store::Store;

pub struct WithdrawalDesk {
    store: Arc<dyn Store>,
}

impl WithdrawalDesk {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a PENDING request over a non-empty set of credits, totalling
    /// their estimated commissions.
    pub async fn create(
        &self,
        requester: &Account,
        credit_ids: Vec<String>,
        notes: Option<String>,
    ) -> Result<WithdrawalRequest> {
        if credit_ids.is_empty() {
            return Err(CrediflowError::Validation(
                "a withdrawal request needs at least one credit".into(),
            ));
        }
        let mut total = 0.0;
        for credit_id in &credit_ids {
            let credit = self
                .store
                .get_credit(credit_id)
                .await?
                .ok_or_else(|| CrediflowError::NotFound {
                    kind: "credit",
                    id: credit_id.clone(),
                })?;
            if credit.commission_paid {
                return Err(CrediflowError::Validation(format!(
                    "commission for credit {credit_id} is already paid"
                )));
            }
            total += credit.commission_estimated;
        }

        let request = WithdrawalRequest {
            id: new_id(),
            requester_id: requester.id.clone(),
            status: WithdrawalStatus::Pending,
            total_amount: total,
            credit_ids,
            created_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            notes,
        };
        self.store.put_withdrawal(request.clone()).await?;
        Ok(request)
    }

    /// Marks the request PROCESSED and every referenced credit's commission
    /// as paid. Re-processing is rejected up front and touches no credit.
    pub async fn process(
        &self,
        withdrawal_id: &str,
        processor: &Account,
        notes: Option<String>,
    ) -> Result<WithdrawalRequest> {
        let mut request = self.pending(withdrawal_id).await?;

        for credit_id in &request.credit_ids {
            let Some(mut credit) = self.store.get_credit(credit_id).await? else {
                warn!(credit_id = %credit_id, "withdrawal references a missing credit");
                continue;
            };
            if credit.commission_paid {
                continue;
            }
            credit.commission_paid = true;
            credit.commission_paid_at = Some(Utc::now());
            self.store.put_credit(credit).await?;
        }

        request.status = WithdrawalStatus::Processed;
        request.processed_at = Some(Utc::now());
        request.processed_by = Some(processor.id.clone());
        if notes.is_some() {
            request.notes = notes;
        }
        self.store.put_withdrawal(request.clone()).await?;
        Ok(request)
    }

    /// Rejects a PENDING request. Credits are untouched.
    pub async fn reject(
        &self,
        withdrawal_id: &str,
        processor: &Account,
        notes: Option<String>,
    ) -> Result<WithdrawalRequest> {
        let mut request = self.pending(withdrawal_id).await?;
        request.status = WithdrawalStatus::Rejected;
        request.processed_at = Some(Utc::now());
        request.processed_by = Some(processor.id.clone());
        if notes.is_some() {
            request.notes = notes;
        }
        self.store.put_withdrawal(request.clone()).await?;
        Ok(request)
    }

    async fn pending(&self, withdrawal_id: &str) -> Result<WithdrawalRequest> {
        let request = self
            .store
            .get_withdrawal(withdrawal_id)
            .await?
            .ok_or_else(|| CrediflowError::NotFound {
                kind: "withdrawal",
                id: withdrawal_id.to_string(),
            })?;
        if request.status != WithdrawalStatus::Pending {
            return Err(CrediflowError::Validation(format!(
                "withdrawal {withdrawal_id} was already {}",
                request.status
            )));
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::machine::tests::{new_credit, seed_world, World};
    use crate::model::Role;

    fn tesoreria() -> Account {
        Account {
            id: "t1".into(),
            display_name: "Teresa Vega".into(),
            phone: String::new(),
            email: "teresa@example.com".into(),
            role: Role::Tesoreria,
            active: true,
        }
    }

    async fn desk_with_credits(world: &World, count: usize) -> (WithdrawalDesk, Vec<String>) {
        let desk = WithdrawalDesk::new(world.store.clone());
        let mut ids = Vec::new();
        for _ in 0..count {
            let credit = world
                .lifecycle
                .create_credit(new_credit(), &world.gestor)
                .await
                .unwrap();
            ids.push(credit.id);
        }
        (desk, ids)
    }

    #[tokio::test]
    async fn create_requires_at_least_one_credit() {
        let world = seed_world().await;
        let (desk, _) = desk_with_credits(&world, 0).await;
        let result = desk.create(&world.gestor, vec![], None).await;
        assert!(matches!(result, Err(CrediflowError::Validation(_))));
    }

    #[tokio::test]
    async fn create_totals_estimated_commissions() {
        let world = seed_world().await;
        let (desk, ids) = desk_with_credits(&world, 2).await;
        let request = desk.create(&world.gestor, ids, None).await.unwrap();
        assert_eq!(request.status, WithdrawalStatus::Pending);
        // Each seeded credit estimates 240_000.
        assert_eq!(request.total_amount, 480_000.0);
    }

    #[tokio::test]
    async fn process_marks_every_commission_paid_once() {
        let world = seed_world().await;
        let (desk, ids) = desk_with_credits(&world, 3).await;
        let request = desk.create(&world.gestor, ids.clone(), None).await.unwrap();

        let processed = desk
            .process(&request.id, &tesoreria(), Some("Lote agosto".into()))
            .await
            .unwrap();
        assert_eq!(processed.status, WithdrawalStatus::Processed);
        assert_eq!(processed.processed_by.as_deref(), Some("t1"));

        for id in &ids {
            let credit = world.store.get_credit(id).await.unwrap().unwrap();
            assert!(credit.commission_paid);
            assert!(credit.commission_paid_at.is_some());
        }
    }

    #[tokio::test]
    async fn reprocessing_is_rejected_and_touches_no_credit() {
        let world = seed_world().await;
        let (desk, ids) = desk_with_credits(&world, 2).await;
        let request = desk.create(&world.gestor, ids.clone(), None).await.unwrap();
        desk.process(&request.id, &tesoreria(), None).await.unwrap();

        let paid_at_first: Vec<_> = {
            let mut stamps = Vec::new();
            for id in &ids {
                let credit = world.store.get_credit(id).await.unwrap().unwrap();
                stamps.push(credit.commission_paid_at);
            }
            stamps
        };

        let result = desk.process(&request.id, &tesoreria(), None).await;
        assert!(matches!(result, Err(CrediflowError::Validation(_))));

        for (id, first_stamp) in ids.iter().zip(paid_at_first) {
            let credit = world.store.get_credit(id).await.unwrap().unwrap();
            assert_eq!(credit.commission_paid_at, first_stamp);
        }
    }

    #[tokio::test]
    async fn reject_leaves_commissions_unpaid() {
        let world = seed_world().await;
        let (desk, ids) = desk_with_credits(&world, 1).await;
        let request = desk.create(&world.gestor, ids.clone(), None).await.unwrap();

        let rejected = desk
            .reject(&request.id, &tesoreria(), Some("Cuenta invalida".into()))
            .await
            .unwrap();
        assert_eq!(rejected.status, WithdrawalStatus::Rejected);

        let credit = world.store.get_credit(&ids[0]).await.unwrap().unwrap();
        assert!(!credit.commission_paid);

        // A rejected request can no longer be processed.
        let result = desk.process(&request.id, &tesoreria(), None).await;
        assert!(matches!(result, Err(CrediflowError::Validation(_))));
    }

    #[tokio::test]
    async fn create_rejects_already_paid_commissions() {
        let world = seed_world().await;
        let (desk, ids) = desk_with_credits(&world, 1).await;
        let mut credit = world.store.get_credit(&ids[0]).await.unwrap().unwrap();
        credit.commission_paid = true;
        world.store.put_credit(credit).await.unwrap();

        let result = desk.create(&world.gestor, ids, None).await;
        assert!(matches!(result, Err(CrediflowError::Validation(_))));
    }
}
