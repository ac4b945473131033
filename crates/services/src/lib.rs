#![forbid(unsafe_code)]

pub mod app_services;
pub mod attempts;
pub mod error;
pub mod progress;

pub use coach_core::Clock;

pub use app_services::AppServices;
pub use attempts::{AssessmentService, AttemptController, AttemptSettings, TimerTick};
pub use error::{AppServicesError, AttemptError, ProgressError};
pub use progress::{AssessmentProgress, ProgressOverview, ProgressService, ResultListItem};
