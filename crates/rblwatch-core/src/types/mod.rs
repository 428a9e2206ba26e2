//! Data model shared by the engine, notifiers and storage backends.

mod alert;
mod outcome;
mod run;
mod target;
mod zone;

pub use alert::*;
pub use outcome::*;
pub use run::*;
pub use target::*;
pub use zone::*;
