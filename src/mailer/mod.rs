pub mod templates;
pub mod transport;
pub mod worker;

pub use transport::{MailTransport, OutboundEmail};
pub use worker::{process_batch, ChangeRecord};
