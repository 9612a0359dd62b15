//! Device Poll Orchestrator.
//!
//! Drives one [`InteractiveSession`] through a device's planned commands,
//! parses each transcript, and writes one reading per command to the sink.
//! Command-level failures degrade that command's record to absent fields;
//! only session-level failures stop the device.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};

use super::plan::{PlannedCommand, plan_commands};
use super::result::{CommandResult, CommandStatus, DeviceFailure, DeviceOutcome, PollResult};
use crate::error::{Error, TransportError};
use crate::inventory::DeviceTarget;
use crate::platform::CompiledFamily;
use crate::session::{InteractiveSession, SessionState};
use crate::sink::{Reading, ReadingSink};
use crate::transport::{Connector, Shell};

/// Run `fut` against an optional deadline.
async fn within<T>(
    deadline: Option<tokio::time::Instant>,
    fut: impl Future<Output = T>,
) -> Option<T> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut).await.ok(),
        None => Some(fut.await),
    }
}

fn deadline_error(budget: Option<Duration>) -> Error {
    TransportError::Timeout(budget.unwrap_or_default()).into()
}

/// Poll one device.
///
/// Never fails: every problem is reported inside the returned
/// [`PollResult`]. `budget` bounds the whole device, login included.
pub async fn poll_device<C, K>(
    connector: &C,
    family: &CompiledFamily,
    target: &DeviceTarget,
    sink: &K,
    budget: Option<Duration>,
) -> PollResult
where
    C: Connector,
    K: ReadingSink,
{
    let start = Instant::now();
    let deadline = budget.map(|b| tokio::time::Instant::now() + b);
    let device = &target.device;
    let endpoint = target.endpoint();

    let plan = plan_commands(family, target.monitored_interfaces());
    debug!("{}: {} commands planned", device.hostname, plan.len());

    let established = within(
        deadline,
        InteractiveSession::<C::Shell>::establish(connector, &endpoint, family.profile.clone()),
    )
    .await;

    let mut session = match established {
        Some(Ok(session)) => session,
        Some(Err(failure)) => {
            warn!("{}: session failed: {}", device.hostname, failure);
            return PollResult::failed(
                &device.id,
                &device.hostname,
                failure.kind(),
                failure.reached,
                failure.error.to_string(),
                start.elapsed(),
            );
        }
        None => {
            let error = deadline_error(budget);
            warn!("{}: {}", device.hostname, error);
            return PollResult::failed(
                &device.id,
                &device.hostname,
                error.kind(),
                SessionState::Authenticating,
                error.to_string(),
                start.elapsed(),
            );
        }
    };

    let mut commands = Vec::with_capacity(plan.len());
    let mut fatal = None;

    for planned in &plan {
        let outcome = within(deadline, run_command(&mut session, family, planned)).await;
        let result = match outcome {
            Some(Ok(result)) => result,
            Some(Err(error)) => {
                fatal = Some(error);
                break;
            }
            None => {
                fatal = Some(deadline_error(budget));
                break;
            }
        };

        let result = store(sink, target, result).await;
        commands.push(result);
    }

    let teardown_error = session
        .close()
        .await
        .err()
        .map(|e| e.to_string());

    let (outcome, failure) = match fatal {
        Some(error) => {
            warn!("{}: session lost: {}", device.hostname, error);
            let failure = DeviceFailure {
                reason: error.kind(),
                reached: SessionState::Executing,
                message: error.to_string(),
            };
            (DeviceOutcome::Failed, Some(failure))
        }
        None if commands.iter().any(|c| c.status.is_failure()) => (DeviceOutcome::Partial, None),
        None => (DeviceOutcome::Success, None),
    };

    info!(
        "{}: {:?}, {} commands in {:?}",
        device.hostname,
        outcome,
        commands.len(),
        start.elapsed()
    );

    PollResult {
        device_id: device.id.clone(),
        hostname: device.hostname.clone(),
        outcome,
        failure,
        commands,
        teardown_error,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Execute and parse one command. Errors are session-level only.
async fn run_command<S: Shell>(
    session: &mut InteractiveSession<S>,
    family: &CompiledFamily,
    planned: &PlannedCommand<'_>,
) -> Result<CommandResult, Error> {
    let start = Instant::now();
    let settle = planned.command.spec.settle;

    let (status, record, message) = match session.execute(&planned.text, &settle).await {
        Ok(transcript) => {
            let body = transcript.body();
            if let Some(marker) = family.detect_failure(body) {
                debug!("{}: '{}' rejected ({})", session.host(), planned.text, marker);
                let record = planned.command.absent_record().with_transcript(transcript.raw);
                (CommandStatus::Rejected, record, Some(format!("output contains '{}'", marker)))
            } else if transcript.is_empty() {
                let record = planned.command.absent_record().with_transcript(transcript.raw);
                (CommandStatus::Empty, record, Some("empty response".to_string()))
            } else {
                let record = planned.command.parse(body).with_transcript(transcript.raw.clone());
                let status = if record.is_degraded() {
                    CommandStatus::Degraded
                } else {
                    CommandStatus::Ok
                };
                (status, record, None)
            }
        }
        Err(e) if e.is_command_local() => {
            debug!("{}: {}", session.host(), e);
            (CommandStatus::Timeout, planned.command.absent_record(), Some(e.to_string()))
        }
        Err(e) => return Err(e),
    };

    Ok(CommandResult {
        key: planned.key.clone(),
        command: planned.text.clone(),
        status,
        record,
        message,
        sink_error: None,
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

/// Write the reading; a failed write is attached to the result.
async fn store<K: ReadingSink>(
    sink: &K,
    target: &DeviceTarget,
    mut result: CommandResult,
) -> CommandResult {
    let reading = Reading {
        device_id: target.device.id.clone(),
        device: target.device.hostname.clone(),
        interface: result.key.interface.clone(),
        parameter: result.key.parameter.clone(),
        raw_output: result.record.transcript.clone(),
        record: result.record.clone(),
        taken_at: Utc::now(),
    };

    if let Err(e) = sink.write(&reading).await {
        warn!(
            "{}: failed to store {}: {}",
            target.device.hostname, result.key.parameter, e
        );
        result.sink_error = Some(e.to_string());
    }
    result
}
