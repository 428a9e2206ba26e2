//! Webhook delivery of rblwatch alerts.
//!
//! [`WebhookNotifier`] implements the engine's
//! [`Notifier`](rblwatch_engine::Notifier): one JSON POST per completed run
//! carrying every alert of that run, or one POST per alert when called
//! through [`Notifier::notify`](rblwatch_engine::Notifier::notify).
//!
//! ```no_run
//! use rblwatch_webhook::WebhookNotifier;
//! use std::time::Duration;
//!
//! # fn demo() -> rblwatch_core::Result<()> {
//! let notifier = WebhookNotifier::builder("https://hooks.example.com/rbl")
//!     .timeout(Duration::from_secs(5))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod notifier;
mod payload;

pub use notifier::{WebhookNotifier, WebhookNotifierBuilder};
pub use payload::{AlertPayload, RunSummary, WebhookPayload};
