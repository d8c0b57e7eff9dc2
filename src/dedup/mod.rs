pub mod fuzzy;
pub mod index;
pub mod lock;
pub mod log;
pub mod record;

pub use index::{BatchGate, DuplicateIndex};
pub use record::{DuplicateRecord, IdentityKeys, PaperIdentity};
