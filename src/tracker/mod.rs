//! Project tracking domain: the document model, derived figures, pure
//! mutations and the editing session that ties them to persistence.

pub mod admin;
pub mod format;
pub mod media;
pub mod model;
pub mod mutation;
pub mod progress;
pub mod seed;
pub mod session;

pub use admin::{AdminError, AdminGate, AdminMode};
pub use media::{DataUrl, MediaError, PhotoFile};
pub use model::{
    LogEntry, MilestoneStatus, Payment, PaymentMilestone, Phase, Photo, Project, Task, TaskStatus,
};
pub use mutation::{ValidationError, parse_amount};
pub use progress::{MilestoneTotals, milestone_totals, overall_progress, phase_progress};
pub use session::{SaveState, Session, SessionError};
