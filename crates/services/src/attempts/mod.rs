mod controller;
mod service;
mod timer;

// Public API of the attempt subsystem.
pub use controller::{AttemptController, AttemptSettings};
pub use service::AssessmentService;
pub use timer::{TimerHandle, TimerTick};
