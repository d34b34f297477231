mod envelope;
mod events;
pub mod jid;
mod kind;
mod media;
mod normalize;
mod outcome;

pub use envelope::*;
pub use events::*;
pub use kind::MessageKind;
pub use media::*;
pub use normalize::*;
pub use outcome::WebhookOutcome;
