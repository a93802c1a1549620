//! Auto-archive sweep for credits parked in a returned state.
//!
//! Invoked opportunistically (on credit-list reads), not from a scheduler,
//! so it must be cheap to call and idempotent: a credit already in a final
//! state is never re-archived.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use super::machine::{CreditLifecycle, TransitionRequest};
use crate::error::Result;
use crate::model::{Account, CreditState};

impl CreditLifecycle {
    /// Archives every credit sitting in a non-final returned state for
    /// longer than the retention window, moving it into the preferred final
    /// state via the ordinary `transition` path. Returns how many credits
    /// were archived.
    pub async fn sweep_expired_returns(&self) -> Result<usize> {
        let states = self.store.list_states().await?;
        let returned: HashSet<&str> = states
            .iter()
            .filter(|s| !s.is_final && self.config.is_returned_state(&s.name))
            .map(|s| s.id.as_str())
            .collect();
        if returned.is_empty() {
            return Ok(0);
        }
        let Some(archive) = self.pick_archive_state(&states) else {
            warn!("no final state available for auto-archive");
            return Ok(0);
        };

        let cutoff = Utc::now() - Duration::days(self.config.retention_days);
        let system = Account::system();
        let mut archived = 0;
        for credit in self.store.list_credits().await? {
            if !returned.contains(credit.status_id.as_str()) || credit.updated_at >= cutoff {
                continue;
            }
            let mut request = TransitionRequest::new(
                &credit.id,
                &archive.id,
                "Archivado automaticamente por vencimiento del plazo de devolucion",
            );
            request.action_label = Some("AUTO-ARCHIVE".into());
            match self.transition(request, &system).await {
                Ok(()) => archived += 1,
                Err(err) => {
                    warn!(credit_id = %credit.id, error = %err, "auto-archive transition failed");
                }
            }
        }
        if archived > 0 {
            info!(archived, target = %archive.name, "auto-archive sweep closed credits");
        }
        Ok(archived)
    }

    /// Preferred final state to archive into: rejection-like names first,
    /// then any final state by workflow order.
    fn pick_archive_state<'a>(&self, states: &'a [CreditState]) -> Option<&'a CreditState> {
        states
            .iter()
            .filter(|s| s.is_final)
            .min_by_key(|s| (self.config.archive_rank(&s.name), s.order))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::lifecycle::machine::tests::{new_credit, seed_world};
    use crate::store::Store;

    #[tokio::test]
    async fn archives_expired_returned_credits_into_rejection() {
        let world = seed_world().await;
        let returned = world.state("DEVUELTO AL GESTOR").clone();
        let rejected = world.state("RECHAZADO").clone();

        let mut credit = world
            .lifecycle
            .create_credit(new_credit(), &world.gestor)
            .await
            .unwrap();
        credit.status_id = returned.id.clone();
        credit.updated_at = Utc::now() - Duration::days(200);
        world.store.put_credit(credit.clone()).await.unwrap();

        let archived = world.lifecycle.sweep_expired_returns().await.unwrap();
        assert_eq!(archived, 1);

        let stored = world.store.get_credit(&credit.id).await.unwrap().unwrap();
        assert_eq!(stored.status_id, rejected.id);

        let history = world.store.list_history(&credit.id).await.unwrap();
        assert_eq!(history.last().unwrap().action, "AUTO-ARCHIVE");
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let world = seed_world().await;
        let returned = world.state("DEVUELTO AL GESTOR").clone();

        let mut credit = world
            .lifecycle
            .create_credit(new_credit(), &world.gestor)
            .await
            .unwrap();
        credit.status_id = returned.id.clone();
        credit.updated_at = Utc::now() - Duration::days(200);
        world.store.put_credit(credit.clone()).await.unwrap();

        assert_eq!(world.lifecycle.sweep_expired_returns().await.unwrap(), 1);
        let after_first = world.store.get_credit(&credit.id).await.unwrap().unwrap();
        let history_after_first = world.store.list_history(&credit.id).await.unwrap().len();

        // Second run archives nothing and leaves the credit as-is.
        assert_eq!(world.lifecycle.sweep_expired_returns().await.unwrap(), 0);
        let after_second = world.store.get_credit(&credit.id).await.unwrap().unwrap();
        assert_eq!(after_first.status_id, after_second.status_id);
        assert_eq!(
            world.store.list_history(&credit.id).await.unwrap().len(),
            history_after_first
        );
    }

    #[tokio::test]
    async fn fresh_returned_credits_are_left_alone() {
        let world = seed_world().await;
        let returned = world.state("DEVUELTO AL GESTOR").clone();

        let mut credit = world
            .lifecycle
            .create_credit(new_credit(), &world.gestor)
            .await
            .unwrap();
        credit.status_id = returned.id.clone();
        world.store.put_credit(credit.clone()).await.unwrap();

        assert_eq!(world.lifecycle.sweep_expired_returns().await.unwrap(), 0);
        let stored = world.store.get_credit(&credit.id).await.unwrap().unwrap();
        assert_eq!(stored.status_id, returned.id);
    }

    #[tokio::test]
    async fn non_returned_credits_are_never_swept() {
        let world = seed_world().await;
        let study = world.state("EN ESTUDIO").clone();

        let mut credit = world
            .lifecycle
            .create_credit(new_credit(), &world.gestor)
            .await
            .unwrap();
        credit.status_id = study.id.clone();
        credit.updated_at = Utc::now() - Duration::days(400);
        world.store.put_credit(credit.clone()).await.unwrap();

        assert_eq!(world.lifecycle.sweep_expired_returns().await.unwrap(), 0);
    }
}
