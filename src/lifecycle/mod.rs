mod balancer;
mod event;
pub(crate) mod machine;
mod sweep;

pub use balancer::pick_least_loaded;
pub use event::{
    ActionExecutedPayload, ActorRef, CreditCreatedPayload, CreditEvent, CreditoResumen,
    EventParties, EventPublisher, NullPublisher, PersonaRef, RecordingPublisher,
    StatusChangePayload,
};
pub use machine::{CreditLifecycle, NewCredit, TransitionRequest};
pub(crate) use machine::cliente_persona;
