//! Per-state quick actions.
//!
//! Executing an action records history, optionally chains into the state
//! machine when the action carries a status-change effect, and always emits
//! a `state_action_executed` event.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{CrediflowError, Result};
use crate::lifecycle::{
    cliente_persona, ActionExecutedPayload, ActorRef, CreditEvent, CreditLifecycle,
    EventPublisher, TransitionRequest,
};
use crate::model::{new_id, Account, ActionEffect, CreditHistoryEntry, StateAction};
use crate::store::Store;

pub struct ActionRegistry {
    store: Arc<dyn Store>,
    lifecycle: CreditLifecycle,
    events: Arc<dyn EventPublisher>,
}

impl ActionRegistry {
    pub fn new(
        store: Arc<dyn Store>,
        lifecycle: CreditLifecycle,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            lifecycle,
            events,
        }
    }

    /// Actions configured for one state, in display order.
    pub async fn list(&self, state_id: &str) -> Result<Vec<StateAction>> {
        self.store.list_actions(state_id).await
    }

    /// Upserts an action after validating its references: a status-change
    /// effect must point at an existing state different from the action's
    /// own state.
    pub async fn save(&self, action: StateAction) -> Result<()> {
        if self.store.get_state(&action.state_id).await?.is_none() {
            return Err(CrediflowError::UnknownState(action.state_id.clone()));
        }
        if let ActionEffect::ChangeStatus { target_state_id } = &action.effect {
            if target_state_id == &action.state_id {
                return Err(CrediflowError::Validation(
                    "action result state must differ from its own state".into(),
                ));
            }
            if self.store.get_state(target_state_id).await?.is_none() {
                return Err(CrediflowError::UnknownState(target_state_id.clone()));
            }
        }
        self.store.put_action(action).await
    }

    pub async fn delete(&self, action_id: &str) -> Result<()> {
        self.store.delete_action(action_id).await
    }

    /// Runs a quick action on a credit.
    ///
    /// Role mismatches reject before anything executes; an unknown action or
    /// credit is a not-found error.
    pub async fn run(&self, credit_id: &str, action_id: &str, actor: &Account) -> Result<()> {
        let action = self
            .store
            .get_action(action_id)
            .await?
            .ok_or_else(|| CrediflowError::NotFound {
                kind: "action",
                id: action_id.to_string(),
            })?;
        if !action.allows(actor.role) {
            return Err(CrediflowError::Forbidden {
                label: action.label.clone(),
                role: actor.role,
            });
        }
        let credit = self
            .store
            .get_credit(credit_id)
            .await?
            .ok_or_else(|| CrediflowError::NotFound {
                kind: "credit",
                id: credit_id.to_string(),
            })?;
        let state_name = self
            .store
            .get_state(&credit.status_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_default();

        self.store
            .append_history(CreditHistoryEntry {
                id: new_id(),
                credit_id: credit.id.clone(),
                actor_id: Some(actor.id.clone()),
                action: "ACCION_RAPIDA".into(),
                description: format!("{} ejecutada por {}", action.label, actor.display_name),
                timestamp: Utc::now(),
            })
            .await?;

        if let ActionEffect::ChangeStatus { target_state_id } = &action.effect {
            let mut request = TransitionRequest::new(
                &credit.id,
                target_state_id,
                &format!("Accion rapida: {}", action.label),
            );
            request.action_label = Some("ACCION_RAPIDA".into());
            self.lifecycle.transition(request, actor).await?;
        }

        let event = CreditEvent::ActionExecuted(ActionExecutedPayload {
            credit_id: credit.id.clone(),
            accion: action.label.clone(),
            estado: state_name,
            ejecutado_por: ActorRef {
                nombre: actor.display_name.clone(),
                rol: actor.role.as_str().to_string(),
            },
            gestor: self.lifecycle.persona(&credit.gestor_id).await,
            analista: match &credit.analista_id {
                Some(id) => self.lifecycle.persona(id).await,
                None => None,
            },
            cliente: cliente_persona(&credit),
        });
        self.events.publish(event).await;

        Ok(())
    }
}
