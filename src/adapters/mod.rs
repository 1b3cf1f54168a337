// Adapters layer: concrete collaborators behind the domain ports.

pub mod postgrest;
pub mod resend;

pub use postgrest::PostgrestOrderStore;
pub use resend::{ConsoleDispatcher, ResendDispatcher};
