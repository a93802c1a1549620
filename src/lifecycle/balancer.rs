//! Least-loaded reviewer selection.
//!
//! Greedy round-robin-by-load: counts are recomputed on every call instead
//! of keeping a rotation pointer, which self-corrects for uneven completion
//! rates. O(reviewers x credits) per assignment.

use std::collections::HashSet;

use crate::error::Result;
use crate::model::{Account, Credit, Role};
use crate::store::{AccountsDirectory, Store};

/// Picks the active account holding `role` with the fewest open (non-final)
/// credits assigned to it.
///
/// Returns `None` when no eligible account exists; the caller proceeds
/// without auto-assignment. Ties keep the directory's stable order.
pub async fn pick_least_loaded(
    store: &dyn Store,
    directory: &dyn AccountsDirectory,
    role: Role,
) -> Result<Option<Account>> {
    let candidates = directory.list_active(role).await?;
    if candidates.is_empty() {
        return Ok(None);
    }

    let final_states: HashSet<String> = store
        .list_states()
        .await?
        .into_iter()
        .filter(|s| s.is_final)
        .map(|s| s.id)
        .collect();
    let credits = store.list_credits().await?;

    let mut ranked: Vec<(usize, Account)> = candidates
        .into_iter()
        .map(|account| {
            let open = credits
                .iter()
                .filter(|c| is_assigned(c, role, &account.id) && !final_states.contains(&c.status_id))
                .count();
            (open, account)
        })
        .collect();
    // Stable sort: ties resolve to whoever the directory listed first.
    ranked.sort_by_key(|(open, _)| *open);

    Ok(ranked.into_iter().next().map(|(_, account)| account))
}

fn is_assigned(credit: &Credit, role: Role, account_id: &str) -> bool {
    match role {
        Role::Analista => credit.analista_id.as_deref() == Some(account_id),
        Role::Gestor => credit.gestor_id == account_id,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::model::{new_id, CreditState};
    use crate::store::{MemoryDirectory, MemoryStore};

    fn analista(id: &str, name: &str) -> Account {
        Account {
            id: id.into(),
            display_name: name.into(),
            phone: String::new(),
            email: String::new(),
            role: Role::Analista,
            active: true,
        }
    }

    fn credit_assigned_to(analista_id: &str, status_id: &str) -> Credit {
        let now = Utc::now();
        Credit {
            id: new_id(),
            created_at: now,
            updated_at: now,
            gestor_id: "g1".into(),
            analista_id: Some(analista_id.into()),
            status_id: status_id.into(),
            amount: 1_000_000.0,
            term_months: 12,
            rate: 1.5,
            disbursement_amount: None,
            commission_pct: 2.0,
            commission_estimated: 20_000.0,
            commission_paid: false,
            commission_paid_at: None,
            client_data: serde_json::json!({}),
            correction_enabled: false,
        }
    }

    async fn world() -> (MemoryStore, MemoryDirectory, CreditState, CreditState) {
        let store = MemoryStore::new();
        let open = CreditState::new("EN ESTUDIO", Role::Analista, 1);
        let mut closed = CreditState::new("DESEMBOLSADO", Role::Gestor, 2);
        closed.is_final = true;
        store.put_state(open.clone()).await.unwrap();
        store.put_state(closed.clone()).await.unwrap();
        (store, MemoryDirectory::new(), open, closed)
    }

    #[tokio::test]
    async fn picks_analyst_with_fewest_open_credits() {
        let (store, directory, open, _) = world().await;
        directory.insert(analista("a1", "Ana")).await;
        directory.insert(analista("a2", "Beatriz")).await;
        for _ in 0..3 {
            store
                .put_credit(credit_assigned_to("a1", &open.id))
                .await
                .unwrap();
        }
        store
            .put_credit(credit_assigned_to("a2", &open.id))
            .await
            .unwrap();

        let picked = pick_least_loaded(&store, &directory, Role::Analista)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, "a2");
    }

    #[tokio::test]
    async fn returns_none_without_eligible_accounts() {
        let (store, directory, _, _) = world().await;
        let picked = pick_least_loaded(&store, &directory, Role::Analista)
            .await
            .unwrap();
        assert!(picked.is_none());
    }

    #[tokio::test]
    async fn final_state_credits_do_not_count_as_load() {
        let (store, directory, open, closed) = world().await;
        directory.insert(analista("a1", "Ana")).await;
        directory.insert(analista("a2", "Beatriz")).await;
        // a1 carries closed credits only; a2 carries one open credit.
        for _ in 0..4 {
            store
                .put_credit(credit_assigned_to("a1", &closed.id))
                .await
                .unwrap();
        }
        store
            .put_credit(credit_assigned_to("a2", &open.id))
            .await
            .unwrap();

        let picked = pick_least_loaded(&store, &directory, Role::Analista)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, "a1");
    }

    #[tokio::test]
    async fn ties_keep_directory_order() {
        let (store, directory, _, _) = world().await;
        directory.insert(analista("a1", "Ana")).await;
        directory.insert(analista("a2", "Beatriz")).await;

        let picked = pick_least_loaded(&store, &directory, Role::Analista)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, "a1");
    }

    #[tokio::test]
    async fn never_picks_a_strictly_more_loaded_account() {
        let (store, directory, open, _) = world().await;
        for (id, load) in [("a1", 2usize), ("a2", 0), ("a3", 5), ("a4", 1)] {
            directory.insert(analista(id, id)).await;
            for _ in 0..load {
                store
                    .put_credit(credit_assigned_to(id, &open.id))
                    .await
                    .unwrap();
            }
        }

        let picked = pick_least_loaded(&store, &directory, Role::Analista)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(picked.id, "a2");
    }
}
