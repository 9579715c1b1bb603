pub mod alert;
pub mod webhook;

pub use alert::{AlertRecord, Priority};
pub use webhook::{AlertManagerAlert, AlertManagerWebhook};
