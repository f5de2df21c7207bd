pub mod report;
pub mod sync;

pub use self::report::{ReconcileReport, SyncError, SyncFailure};
pub use self::sync::{plan_reconcile, SyncPlan, SyncService};
