pub mod reconciler;
pub mod snapshot_job;
