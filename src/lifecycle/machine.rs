//! The credit state machine.
//!
//! There is no transition table: any state is reachable from any state by
//! explicit caller action, including moving a final credit backward. This is
//! a deliberate flexibility choice the correction workflows rely on, not an
//! oversight; it does remove the usual terminal-state safety invariant.
//!
//! A transition validates its target before any mutation, then runs a chain
//! of best-effort side effects (auto-assignment, notifications, event
//! dispatch) that may individually fail without aborting the status change.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use super::balancer::pick_least_loaded;
use super::event::{
    ActorRef, CreditCreatedPayload, CreditEvent, CreditoResumen, EventPublisher, PersonaRef,
    StatusChangePayload,
};
use crate::config::CrediflowConfig;
use crate::error::{CrediflowError, Result};
use crate::model::{
    new_id, Account, Credit, CreditComment, CreditHistoryEntry, CreditState, NotificationKind,
    Role,
};
use crate::store::{AccountsDirectory, NotificationOutbox, Store};

/// Bag key correction tasks are merged under.
const CORRECTION_TASKS_KEY: &str = "tareas_correccion";

/// A requested status change.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub credit_id: String,
    pub target_state_id: String,
    /// Free-text reason; flows into the lifecycle event as `motivo`.
    pub comment: String,
    /// Correction tasks to merge into the client-data bag.
    pub correction_tasks: Option<Vec<String>>,
    /// History action label. Defaults to `CAMBIO_ESTADO`.
    pub action_label: Option<String>,
}

impl TransitionRequest {
    pub fn new(credit_id: &str, target_state_id: &str, comment: &str) -> Self {
        Self {
            credit_id: credit_id.to_string(),
            target_state_id: target_state_id.to_string(),
            comment: comment.to_string(),
            correction_tasks: None,
            action_label: None,
        }
    }
}

/// Intake parameters for a new credit.
#[derive(Debug, Clone)]
pub struct NewCredit {
    pub gestor_id: String,
    pub amount: f64,
    pub term_months: u32,
    pub rate: f64,
    pub commission_pct: f64,
    pub client_data: Value,
}

/// Drives credits through the configurable workflow.
#[derive(Clone)]
pub struct CreditLifecycle {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) directory: Arc<dyn AccountsDirectory>,
    pub(crate) outbox: Arc<dyn NotificationOutbox>,
    pub(crate) events: Arc<dyn EventPublisher>,
    pub(crate) config: CrediflowConfig,
}

impl CreditLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn AccountsDirectory>,
        outbox: Arc<dyn NotificationOutbox>,
        events: Arc<dyn EventPublisher>,
        config: CrediflowConfig,
    ) -> Self {
        Self {
            store,
            directory,
            outbox,
            events,
            config,
        }
    }

    /// Creates a credit in the entry state (lowest `order`).
    pub async fn create_credit(&self, new: NewCredit, actor: &Account) -> Result<Credit> {
        let states = self.store.list_states().await?;
        let entry = states
            .first()
            .cloned()
            .ok_or_else(|| CrediflowError::Validation("no workflow states configured".into()))?;

        let now = Utc::now();
        let credit = Credit {
            id: new_id(),
            created_at: now,
            updated_at: now,
            gestor_id: new.gestor_id,
            analista_id: None,
            status_id: entry.id.clone(),
            amount: new.amount,
            term_months: new.term_months,
            rate: new.rate,
            disbursement_amount: None,
            commission_pct: new.commission_pct,
            commission_estimated: new.amount * new.commission_pct / 100.0,
            commission_paid: false,
            commission_paid_at: None,
            client_data: new.client_data,
            correction_enabled: false,
        };
        self.store.put_credit(credit.clone()).await?;
        self.store
            .append_history(CreditHistoryEntry {
                id: new_id(),
                credit_id: credit.id.clone(),
                actor_id: Some(actor.id.clone()),
                action: "RADICACION".into(),
                description: format!("Credito radicado en estado {}", entry.name),
                timestamp: now,
            })
            .await?;

        let event = CreditEvent::CreditCreated(CreditCreatedPayload {
            credit_id: credit.id.clone(),
            estado_inicial: entry.name.clone(),
            creado_por: actor_ref(actor),
            gestor: self.persona(&credit.gestor_id).await,
            cliente: cliente_persona(&credit),
            credito: credito_resumen(&credit),
        });
        self.events.publish(event).await;

        Ok(credit)
    }

    /// Applies a status transition to a credit.
    ///
    /// Steps 1-2 (target resolution, correction merge) validate and must
    /// reject before any mutation. Everything after is best-effort: an
    /// auto-assignment or notification failure never aborts the change.
    /// Event dispatch errors are caught by the publisher and logged only.
    pub async fn transition(&self, request: TransitionRequest, actor: &Account) -> Result<()> {
        let target = self
            .store
            .get_state(&request.target_state_id)
            .await?
            .ok_or_else(|| CrediflowError::UnknownState(request.target_state_id.clone()))?;
        let mut credit = self
            .store
            .get_credit(&request.credit_id)
            .await?
            .ok_or_else(|| CrediflowError::NotFound {
                kind: "credit",
                id: request.credit_id.clone(),
            })?;
        let old_state_name = self
            .store
            .get_state(&credit.status_id)
            .await?
            .map(|s| s.name)
            .unwrap_or_default();

        // The correction window closes on every status change.
        if let Some(tasks) = &request.correction_tasks
            && !tasks.is_empty()
        {
            merge_correction_tasks(&mut credit.client_data, tasks);
        }
        credit.correction_enabled = false;

        let newly_assigned = self.auto_assign(&mut credit, &target).await;

        let previous_gestor = credit.gestor_id.clone();
        credit.status_id = target.id.clone();
        credit.updated_at = Utc::now();
        self.store.put_credit(credit.clone()).await?;

        let mut description = format!("Estado actualizado a {}", target.name);
        if let Some(analista) = &newly_assigned {
            description.push_str(&format!(" (asignado a {})", analista.display_name));
        }
        if let Some(tasks) = &request.correction_tasks
            && !tasks.is_empty()
        {
            description.push_str(&format!(" | tareas: {}", tasks.join(", ")));
        }
        self.store
            .append_history(CreditHistoryEntry {
                id: new_id(),
                credit_id: credit.id.clone(),
                actor_id: Some(actor.id.clone()),
                action: request
                    .action_label
                    .clone()
                    .unwrap_or_else(|| "CAMBIO_ESTADO".into()),
                description,
                timestamp: credit.updated_at,
            })
            .await?;
        self.store
            .add_comment(CreditComment {
                id: new_id(),
                credit_id: credit.id.clone(),
                author_id: None,
                body: format!("El credito paso al estado {}", target.name),
                created_at: credit.updated_at,
            })
            .await?;

        let kind = if self.config.is_alert_state(&target.name) {
            NotificationKind::Warning
        } else {
            NotificationKind::Info
        };
        self.notify_if_other(&previous_gestor, actor, &credit, &target.name, kind)
            .await;
        if let Some(analista_id) = credit.analista_id.clone() {
            self.notify_if_other(&analista_id, actor, &credit, &target.name, kind)
                .await;
        }

        let event = CreditEvent::StatusChange(StatusChangePayload {
            credit_id: credit.id.clone(),
            estado_anterior: old_state_name,
            nuevo_estado: target.name.clone(),
            motivo: request.comment.clone(),
            cambio_por: actor_ref(actor),
            gestor: self.persona(&credit.gestor_id).await,
            analista: match &credit.analista_id {
                Some(id) => self.persona(id).await,
                None => None,
            },
            cliente: cliente_persona(&credit),
            credito: credito_resumen(&credit),
        });
        self.events.publish(event).await;

        Ok(())
    }

    /// Auto-assigns an analyst when the target state is analyst-owned and
    /// nobody is assigned yet. Failures fall back to no assignment.
    async fn auto_assign(&self, credit: &mut Credit, target: &CreditState) -> Option<Account> {
        if target.responsible_role != Role::Analista || credit.analista_id.is_some() {
            return None;
        }
        match pick_least_loaded(self.store.as_ref(), self.directory.as_ref(), Role::Analista).await
        {
            Ok(Some(analista)) => {
                credit.analista_id = Some(analista.id.clone());
                Some(analista)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(
                    credit_id = %credit.id,
                    error = %err,
                    "auto-assignment failed; continuing without analyst"
                );
                None
            }
        }
    }

    async fn notify_if_other(
        &self,
        user_id: &str,
        actor: &Account,
        credit: &Credit,
        state_name: &str,
        kind: NotificationKind,
    ) {
        if user_id == actor.id {
            return;
        }
        let message = format!("El credito {} paso al estado {}", credit.id, state_name);
        if let Err(err) = self
            .outbox
            .enqueue(user_id, "Cambio de estado", &message, kind, Some(&credit.id))
            .await
        {
            warn!(user_id, error = %err, "notification enqueue failed");
        }
    }

    pub(crate) async fn persona(&self, account_id: &str) -> Option<PersonaRef> {
        match self.directory.get(account_id).await {
            Ok(Some(account)) => Some(PersonaRef {
                nombre: account.display_name,
                telefono: account.phone,
                correo: account.email,
            }),
            Ok(None) => None,
            Err(err) => {
                warn!(account_id, error = %err, "account lookup failed");
                None
            }
        }
    }
}

fn actor_ref(actor: &Account) -> ActorRef {
    ActorRef {
        nombre: actor.display_name.clone(),
        rol: actor.role.as_str().to_string(),
    }
}

/// Redacted client snapshot: only the contact fields leave the bag.
pub(crate) fn cliente_persona(credit: &Credit) -> Option<PersonaRef> {
    let nombre = credit.client_field("nombre")?;
    Some(PersonaRef {
        nombre,
        telefono: credit.client_field("telefono").unwrap_or_default(),
        correo: credit.client_field("correo").unwrap_or_default(),
    })
}

pub(crate) fn credito_resumen(credit: &Credit) -> CreditoResumen {
    CreditoResumen {
        monto: credit.amount,
        plazo: credit.term_months,
        entidad: credit.client_field("entidad"),
        tasa: credit.rate,
    }
}

fn merge_correction_tasks(bag: &mut Value, tasks: &[String]) {
    if !bag.is_object() {
        *bag = serde_json::json!({});
    }
    if let Some(obj) = bag.as_object_mut() {
        let list = obj
            .entry(CORRECTION_TASKS_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = list {
            items.extend(tasks.iter().map(|t| Value::String(t.clone())));
        }
    }
}
