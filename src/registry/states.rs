//! Admin-facing registry of workflow states.

use std::sync::Arc;

use crate::error::{CrediflowError, Result};
use crate::model::{CreditState, Role};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderDirection {
    Up,
    Down,
}

/// Partial update for a state. `order` is deliberately absent: ordering only
/// changes through [`StateRegistry::reorder`].
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub responsible_role: Option<Role>,
    pub is_final: Option<bool>,
}

pub struct StateRegistry {
    store: Arc<dyn Store>,
}

impl StateRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All states in workflow order.
    pub async fn list(&self) -> Result<Vec<CreditState>> {
        self.store.list_states().await
    }

    /// Appends a state at the end of the workflow (`max(order) + 1`).
    pub async fn add(&self, name: &str, responsible_role: Role) -> Result<CreditState> {
        let next_order = self
            .store
            .list_states()
            .await?
            .last()
            .map(|s| s.order + 1)
            .unwrap_or(1);
        let state = CreditState::new(name, responsible_role, next_order);
        self.store.put_state(state.clone()).await?;
        Ok(state)
    }

    /// Swaps the state's `order` with its adjacent neighbor. No-op at either
    /// boundary, so the order values always stay a permutation of the
    /// original set.
    pub async fn reorder(&self, state_id: &str, direction: ReorderDirection) -> Result<()> {
        let states = self.store.list_states().await?;
        let idx = states
            .iter()
            .position(|s| s.id == state_id)
            .ok_or_else(|| CrediflowError::NotFound {
                kind: "state",
                id: state_id.to_string(),
            })?;
        let neighbor = match direction {
            ReorderDirection::Up => {
                if idx == 0 {
                    return Ok(());
                }
                idx - 1
            }
            ReorderDirection::Down => {
                if idx + 1 == states.len() {
                    return Ok(());
                }
                idx + 1
            }
        };

        let mut moved = states[idx].clone();
        let mut other = states[neighbor].clone();
        std::mem::swap(&mut moved.order, &mut other.order);
        self.store.put_state(moved).await?;
        self.store.put_state(other).await?;
        Ok(())
    }

    /// Applies a patch. Never touches `order`.
    pub async fn update(&self, state_id: &str, patch: StatePatch) -> Result<CreditState> {
        let mut state = self
            .store
            .get_state(state_id)
            .await?
            .ok_or_else(|| CrediflowError::NotFound {
                kind: "state",
                id: state_id.to_string(),
            })?;
        if let Some(name) = patch.name {
            state.name = name;
        }
        if let Some(color) = patch.color {
            state.color = color;
        }
        if let Some(role) = patch.responsible_role {
            state.responsible_role = role;
        }
        if let Some(is_final) = patch.is_final {
            state.is_final = is_final;
        }
        self.store.put_state(state.clone()).await?;
        Ok(state)
    }

    /// Deletes a state. Ensuring no credit still references it is the
    /// caller's responsibility (referential integrity lives in the store).
    pub async fn delete(&self, state_id: &str) -> Result<()> {
        self.store.delete_state(state_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn registry_with_abc() -> (StateRegistry, Vec<CreditState>) {
        let registry = StateRegistry::new(Arc::new(MemoryStore::new()));
        let a = registry.add("A", Role::Gestor).await.unwrap();
        let b = registry.add("B", Role::Analista).await.unwrap();
        let mut c = registry.add("C", Role::Gestor).await.unwrap();
        c = registry
            .update(
                &c.id,
                StatePatch {
                    is_final: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        (registry, vec![a, b, c])
    }

    #[tokio::test]
    async fn add_appends_after_the_last_order() {
        let (registry, states) = registry_with_abc().await;
        assert_eq!(
            states.iter().map(|s| s.order).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        let d = registry.add("D", Role::Gestor).await.unwrap();
        assert_eq!(d.order, 4);
    }

    #[tokio::test]
    async fn reorder_up_swaps_with_previous_neighbor() {
        let (registry, states) = registry_with_abc().await;
        registry
            .reorder(&states[1].id, ReorderDirection::Up)
            .await
            .unwrap();

        let listed = registry.list().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        let orders: Vec<u32> = listed.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn reorder_is_a_noop_at_the_boundaries() {
        let (registry, states) = registry_with_abc().await;
        registry
            .reorder(&states[0].id, ReorderDirection::Up)
            .await
            .unwrap();
        registry
            .reorder(&states[2].id, ReorderDirection::Down)
            .await
            .unwrap();

        let names: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn any_reorder_sequence_keeps_orders_a_permutation() {
        let (registry, states) = registry_with_abc().await;
        let moves = [
            (0, ReorderDirection::Down),
            (2, ReorderDirection::Up),
            (1, ReorderDirection::Up),
            (0, ReorderDirection::Up),
            (2, ReorderDirection::Down),
            (1, ReorderDirection::Down),
        ];
        for (i, direction) in moves {
            registry.reorder(&states[i].id, direction).await.unwrap();
            let mut orders: Vec<u32> = registry
                .list()
                .await
                .unwrap()
                .iter()
                .map(|s| s.order)
                .collect();
            orders.sort_unstable();
            assert_eq!(orders, vec![1, 2, 3]);
        }
    }

    #[tokio::test]
    async fn update_patches_fields_but_never_order() {
        let (registry, states) = registry_with_abc().await;
        let updated = registry
            .update(
                &states[0].id,
                StatePatch {
                    name: Some("RADICADO".into()),
                    color: Some("#ff0000".into()),
                    responsible_role: Some(Role::Admin),
                    is_final: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "RADICADO");
        assert_eq!(updated.color, "#ff0000");
        assert_eq!(updated.responsible_role, Role::Admin);
        assert_eq!(updated.order, states[0].order);
    }

    #[tokio::test]
    async fn reorder_unknown_state_errors() {
        let (registry, _) = registry_with_abc().await;
        let result = registry.reorder("nope", ReorderDirection::Up).await;
        assert!(matches!(
            result,
            Err(CrediflowError::NotFound { kind: "state", .. })
        ));
    }
}
