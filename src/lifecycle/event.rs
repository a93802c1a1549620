//! Eventos del ciclo de vida y el contrato de publicación.
//!
//! Cada operación relevante produce un [`CreditEvent`] que la máquina de
//! estados entrega a un [`EventPublisher`] inyectado. Los nombres de los
//! campos serializados son estables: las automatizaciones externas los
//! esperan tal cual (`nuevo_estado`, `cambio_por`, `gestor`, `analista`, ...).
//!
//! Los contactos van embebidos como snapshots en el payload; el despacho
//! nunca vuelve a consultar la base para evitar leer datos ya cambiados.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Contacto embebido en un payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaRef {
    pub nombre: String,
    pub telefono: String,
    pub correo: String,
}

/// Quién ejecutó la operación que originó el evento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorRef {
    pub nombre: String,
    pub rol: String,
}

/// Resumen financiero del crédito incluido en los payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditoResumen {
    pub monto: f64,
    pub plazo: u32,
    pub entidad: Option<String>,
    pub tasa: f64,
}

/// Payload de `credit_status_change`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangePayload {
    pub credit_id: String,
    pub estado_anterior: String,
    pub nuevo_estado: String,
    pub motivo: String,
    pub cambio_por: ActorRef,
    pub gestor: Option<PersonaRef>,
    pub analista: Option<PersonaRef>,
    pub cliente: Option<PersonaRef>,
    pub credito: CreditoResumen,
}

/// Payload de `state_action_executed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecutedPayload {
    pub credit_id: String,
    pub accion: String,
    /// Estado del crédito al momento de ejecutar la acción.
    pub estado: String,
    pub ejecutado_por: ActorRef,
    pub gestor: Option<PersonaRef>,
    pub analista: Option<PersonaRef>,
    pub cliente: Option<PersonaRef>,
}

/// Payload de `credit_created`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCreatedPayload {
    pub credit_id: String,
    pub estado_inicial: String,
    pub creado_por: ActorRef,
    pub gestor: Option<PersonaRef>,
    pub cliente: Option<PersonaRef>,
    pub credito: CreditoResumen,
}

/// Evento del ciclo de vida como unión etiquetada.
///
/// El conjunto de tipos de evento es abierto para quien suscribe: una regla
/// con el comodín `all` recibe también tipos agregados en el futuro.
#[derive(Debug, Clone, PartialEq)]
pub enum CreditEvent {
    StatusChange(StatusChangePayload),
    ActionExecuted(ActionExecutedPayload),
    CreditCreated(CreditCreatedPayload),
}

/// Snapshots de contacto de un evento, para resolución de destinatarios.
pub struct EventParties<'a> {
    pub gestor: Option<&'a PersonaRef>,
    pub analista: Option<&'a PersonaRef>,
    pub cliente: Option<&'a PersonaRef>,
}

impl CreditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CreditEvent::StatusChange(_) => "credit_status_change",
            CreditEvent::ActionExecuted(_) => "state_action_executed",
            CreditEvent::CreditCreated(_) => "credit_created",
        }
    }

    pub fn credit_id(&self) -> &str {
        match self {
            CreditEvent::StatusChange(p) => &p.credit_id,
            CreditEvent::ActionExecuted(p) => &p.credit_id,
            CreditEvent::CreditCreated(p) => &p.credit_id,
        }
    }

    /// Nombre del nuevo estado, solo para `credit_status_change` (es el único
    /// tipo al que aplican los filtros de estado de las reglas).
    pub fn new_state_name(&self) -> Option<&str> {
        match self {
            CreditEvent::StatusChange(p) => Some(&p.nuevo_estado),
            _ => None,
        }
    }

    pub fn parties(&self) -> EventParties<'_> {
        match self {
            CreditEvent::StatusChange(p) => EventParties {
                gestor: p.gestor.as_ref(),
                analista: p.analista.as_ref(),
                cliente: p.cliente.as_ref(),
            },
            CreditEvent::ActionExecuted(p) => EventParties {
                gestor: p.gestor.as_ref(),
                analista: p.analista.as_ref(),
                cliente: p.cliente.as_ref(),
            },
            CreditEvent::CreditCreated(p) => EventParties {
                gestor: p.gestor.as_ref(),
                analista: None,
                cliente: p.cliente.as_ref(),
            },
        }
    }

    /// Payload serializado del evento (sin el sobre de despacho).
    pub fn payload_json(&self) -> serde_json::Value {
        let result = match self {
            CreditEvent::StatusChange(p) => serde_json::to_value(p),
            CreditEvent::ActionExecuted(p) => serde_json::to_value(p),
            CreditEvent::CreditCreated(p) => serde_json::to_value(p),
        };
        result.unwrap_or(serde_json::Value::Null)
    }
}

/// Publicador de eventos inyectado en la máquina de estados.
///
/// `publish` nunca falla ni bloquea la transición: las fallas de entrega se
/// registran y se descartan.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: CreditEvent);
}

/// Publicador que descarta todo. Para modos sin automatizaciones.
pub struct NullPublisher;

#[async_trait]
impl EventPublisher for NullPublisher {
    async fn publish(&self, _event: CreditEvent) {}
}

/// Publicador que acumula los eventos en memoria. Para pruebas.
#[derive(Default)]
pub struct RecordingPublisher {
    events: tokio::sync::Mutex<Vec<CreditEvent>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<CreditEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: CreditEvent) {
        self.events.lock().await.push(event);
    }
}
