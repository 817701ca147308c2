mod pipeline_controller;
mod process_supervisor;

#[cfg(test)]
pub(crate) mod fake_launcher;

pub use pipeline_controller::PipelineController;
pub use process_supervisor::{ProcessSupervisor, DEFAULT_GRACE_PERIOD};
