#![forbid(unsafe_code)]

pub mod catalog;
pub mod model;
pub mod scoring;
pub mod session;
pub mod time;
pub mod timer;

pub use catalog::{Catalog, CatalogError};
pub use session::{Advance, Session, SessionStatus, TransitionRejected};
pub use time::Clock;
pub use timer::{TickOutcome, TimerTag};
