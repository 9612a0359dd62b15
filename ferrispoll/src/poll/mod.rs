//! Polling: per-device orchestration and fleet-wide cycles.

mod device;
mod fleet;
mod plan;
mod result;

pub use device::poll_device;
pub use fleet::FleetPoller;
pub use plan::{CommandKey, PlannedCommand, plan_commands};
pub use result::{
    CommandResult, CommandStatus, CycleReport, DeviceFailure, DeviceOutcome, PollResult,
    error_document,
};
