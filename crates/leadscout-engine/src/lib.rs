//! Client-side orchestration for Leadscout: the per-prospect scrape-job
//! queue, the subscription quota gate, optimistic post triage, and the
//! session store that ties them to a [`Backend`].

pub mod backend;
pub mod error;
pub mod notification;
pub mod queue;
pub mod quota_gate;
pub mod session;
pub mod triage;

#[cfg(test)]
mod fake;

pub use backend::Backend;
pub use error::EngineError;
pub use notification::{Notification, SuggestedAction, ToastLevel};
pub use queue::{
    BatchSubmissionOutcome, DrawerState, ScrapeJobQueue, SubmissionProgress, SubmitContext,
};
pub use quota_gate::{PaywallSignal, QuotaDecision, QuotaGate};
pub use session::{Session, SessionConfig};
pub use triage::{Confirmation, RetryReport, TriageBoard, TriageContext, TriageOutcome};
