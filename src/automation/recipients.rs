//! Recipient resolution for automation dispatch.
//!
//! Payload-scoped tags (gestor, analista, cliente) read the snapshots
//! embedded in the event, avoiding stale-data races against the store.
//! Broadcast tags query the directory for every active account in the role.
//! Duplicates across overlapping tags are deliberately kept: delivery is
//! at-least-once, not exactly-once.

use tracing::warn;

use crate::lifecycle::{CreditEvent, PersonaRef};
use crate::model::{Recipient, Role, RoleTag};
use crate::store::AccountsDirectory;

pub async fn resolve_recipients(
    directory: &dyn AccountsDirectory,
    roles: &[RoleTag],
    event: &CreditEvent,
) -> Vec<Recipient> {
    let parties = event.parties();
    let mut recipients = Vec::new();
    for tag in roles {
        match tag {
            RoleTag::Gestor => push_persona(&mut recipients, parties.gestor, "gestor"),
            RoleTag::Analista => push_persona(&mut recipients, parties.analista, "analista"),
            RoleTag::Cliente => push_persona(&mut recipients, parties.cliente, "cliente"),
            RoleTag::Admins => broadcast(&mut recipients, directory, Role::Admin).await,
            RoleTag::Tesoreria => broadcast(&mut recipients, directory, Role::Tesoreria).await,
        }
    }
    recipients
}

fn push_persona(out: &mut Vec<Recipient>, persona: Option<&PersonaRef>, role: &str) {
    if let Some(p) = persona {
        out.push(Recipient {
            name: p.nombre.clone(),
            phone: p.telefono.clone(),
            email: p.correo.clone(),
            role: role.to_string(),
        });
    }
}

async fn broadcast(out: &mut Vec<Recipient>, directory: &dyn AccountsDirectory, role: Role) {
    match directory.list_active(role).await {
        Ok(accounts) => out.extend(accounts.iter().map(Recipient::from_account)),
        Err(err) => warn!(role = %role, error = %err, "broadcast recipient lookup failed"),
    }
}
