//! Self-contained demonstration of the engine against in-memory backends.
//!
//! Seeds a six-state workflow, accounts in every role and one automation
//! rule, then drives a credit through intake, study, a correction return and
//! approval, finishing with the auto-archive sweep.

use std::sync::Arc;

use anyhow::Result;

use crate::automation::{AutomationDispatcher, HttpWebhookTransport};
use crate::config::CrediflowConfig;
use crate::lifecycle::{CreditLifecycle, EventPublisher, NewCredit, NullPublisher, TransitionRequest};
use crate::model::{new_id, Account, ActionEffect, AutomationRule, Role, RoleTag, StateAction};
use crate::registry::{ActionRegistry, StateRegistry, StatePatch};
use crate::store::{MemoryDirectory, MemoryOutbox, MemoryStore, Store};
use crate::ui::DemoProgress;
use crate::withdrawals::WithdrawalDesk;

fn account(id: &str, name: &str, role: Role) -> Account {
    Account {
        id: id.into(),
        display_name: name.into(),
        phone: "3000000000".into(),
        email: format!("{id}@crediflow.example"),
        role,
        active: true,
    }
}

/// Runs the demo. With a webhook URL, real automation dispatch fires against
/// it; without one, events go to a null publisher.
pub async fn run_demo(webhook_url: Option<String>) -> Result<()> {
    let config = CrediflowConfig::load()?;
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(MemoryDirectory::new());
    let outbox = Arc::new(MemoryOutbox::new());

    let events: Arc<dyn EventPublisher> = match &webhook_url {
        Some(url) => {
            store
                .put_rule(AutomationRule {
                    id: new_id(),
                    name: "demo-aviso".into(),
                    webhook_url: url.clone(),
                    active: true,
                    event_types: vec![],
                    status_filter: vec![],
                    recipient_roles: vec![RoleTag::Gestor, RoleTag::Cliente],
                })
                .await?;
            Arc::new(AutomationDispatcher::new(
                store.clone(),
                directory.clone(),
                Arc::new(HttpWebhookTransport::new()),
                config.source.clone(),
            ))
        }
        None => Arc::new(NullPublisher),
    };

    let gestor = account("g1", "Pedro Gomez", Role::Gestor);
    directory.insert(gestor.clone()).await;
    directory.insert(account("a1", "Ana Ruiz", Role::Analista)).await;
    directory
        .insert(account("a2", "Beatriz Mora", Role::Analista))
        .await;
    directory
        .insert(account("t1", "Teresa Vega", Role::Tesoreria))
        .await;

    let states = StateRegistry::new(store.clone());
    states.add("RADICADO", Role::Gestor).await?;
    let estudio = states.add("EN ESTUDIO", Role::Analista).await?;
    let devuelto = states.add("DEVUELTO AL GESTOR", Role::Gestor).await?;
    let aprobado = states.add("APROBADO", Role::Gestor).await?;
    let desembolsado = states.add("DESEMBOLSADO", Role::Gestor).await?;
    states
        .update(
            &desembolsado.id,
            StatePatch {
                is_final: Some(true),
                ..Default::default()
            },
        )
        .await?;

    let lifecycle = CreditLifecycle::new(
        store.clone(),
        directory.clone(),
        outbox.clone(),
        events.clone(),
        config,
    );
    let actions = ActionRegistry::new(store.clone(), lifecycle.clone(), events.clone());
    let approve = StateAction {
        id: new_id(),
        state_id: estudio.id.clone(),
        label: "Aprobar".into(),
        allowed_roles: vec![Role::Analista],
        order_index: 1,
        effect: ActionEffect::ChangeStatus {
            target_state_id: aprobado.id.clone(),
        },
    };
    actions.save(approve.clone()).await?;

    let progress = DemoProgress::start("Radicando credito...");
    let credit = lifecycle
        .create_credit(
            NewCredit {
                gestor_id: gestor.id.clone(),
                amount: 12_000_000.0,
                term_months: 36,
                rate: 1.6,
                commission_pct: 2.0,
                client_data: serde_json::json!({
                    "nombre": "Maria Lopez",
                    "telefono": "3017654321",
                    "correo": "maria@example.com",
                    "entidad": "Banco Central",
                }),
            },
            &gestor,
        )
        .await?;
    progress.note(&format!("Credito {} radicado", credit.id));

    progress.state("EN ESTUDIO");
    lifecycle
        .transition(
            TransitionRequest::new(&credit.id, &estudio.id, "Documentacion completa"),
            &gestor,
        )
        .await?;
    let assigned = store
        .get_credit(&credit.id)
        .await?
        .and_then(|c| c.analista_id);
    if let Some(analista_id) = assigned {
        progress.note(&format!("Analista asignado: {analista_id}"));
    }

    progress.state("DEVUELTO AL GESTOR");
    let analista = account("a1", "Ana Ruiz", Role::Analista);
    let mut devolver = TransitionRequest::new(&credit.id, &devuelto.id, "Faltan documentos");
    devolver.correction_tasks = Some(vec!["Adjuntar cedula".into()]);
    lifecycle.transition(devolver, &analista).await?;

    progress.state("EN ESTUDIO");
    lifecycle
        .transition(
            TransitionRequest::new(&credit.id, &estudio.id, "Documentos completos"),
            &gestor,
        )
        .await?;

    // Quick action: the analyst approves without writing a comment.
    actions.run(&credit.id, &approve.id, &analista).await?;

    progress.state("DESEMBOLSADO");
    lifecycle
        .transition(
            TransitionRequest::new(&credit.id, &desembolsado.id, "Desembolso realizado"),
            &gestor,
        )
        .await?;

    // Opportunistic maintenance, as a credit-list read would do.
    let archived = lifecycle.sweep_expired_returns().await?;
    progress.note(&format!("Barrido de archivado: {archived} creditos"));

    let desk = WithdrawalDesk::new(store.clone());
    let withdrawal = desk
        .create(&gestor, vec![credit.id.clone()], None)
        .await?;
    desk.process(&withdrawal.id, &account("t1", "Teresa Vega", Role::Tesoreria), None)
        .await?;
    progress.note("Comision pagada via solicitud de retiro");

    progress.finish("Recorrido completo");
    progress.print_history(&store.list_history(&credit.id).await?);

    let notifications = outbox.queued().await;
    println!();
    println!("Notificaciones encoladas: {}", notifications.len());
    for n in notifications {
        println!("  [{}] {} -> {}", n.kind.as_str(), n.user_id, n.message);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_runs_end_to_end_without_webhook() {
        run_demo(None).await.unwrap();
    }
}
