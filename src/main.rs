use clap::Parser;
use tracing_subscriber::EnvFilter;

use crediflow::automation::build_envelope;
use crediflow::cli::{Cli, Command};
use crediflow::config::CrediflowConfig;
use crediflow::lifecycle::{
    ActorRef, CreditEvent, CreditoResumen, PersonaRef, StatusChangePayload,
};
use crediflow::model::Recipient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "crediflow=debug" } else { "crediflow=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Command::Demo { webhook_url } => crediflow::demo::run_demo(webhook_url).await?,
        Command::Envelope { state } => print_sample_envelope(&state)?,
    }

    Ok(())
}

/// Prints the envelope an automation endpoint would receive for a transition
/// into `state`, with placeholder parties.
fn print_sample_envelope(state: &str) -> anyhow::Result<()> {
    let config = CrediflowConfig::load()?;
    let event = CreditEvent::StatusChange(StatusChangePayload {
        credit_id: "credito-ejemplo".into(),
        estado_anterior: "RADICADO".into(),
        nuevo_estado: state.to_string(),
        motivo: "Ejemplo".into(),
        cambio_por: ActorRef {
            nombre: "Pedro Gomez".into(),
            rol: "gestor".into(),
        },
        gestor: Some(PersonaRef {
            nombre: "Pedro Gomez".into(),
            telefono: "3000000000".into(),
            correo: "pedro@crediflow.example".into(),
        }),
        analista: None,
        cliente: Some(PersonaRef {
            nombre: "Maria Lopez".into(),
            telefono: "3017654321".into(),
            correo: "maria@example.com".into(),
        }),
        credito: CreditoResumen {
            monto: 12_000_000.0,
            plazo: 36,
            entidad: Some("Banco Central".into()),
            tasa: 1.6,
        },
    });
    let recipients = vec![Recipient {
        name: "Pedro Gomez".into(),
        phone: "3000000000".into(),
        email: "pedro@crediflow.example".into(),
        role: "gestor".into(),
    }];
    let envelope = build_envelope(&config.source, "ejemplo", &event, &recipients);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
