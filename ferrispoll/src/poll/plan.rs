//! Command ordering for one device.

use serde::Serialize;

use crate::inventory::MonitoredInterface;
use crate::platform::{CommandScope, CompiledCommand, CompiledFamily};

/// Identity of one result within a device poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CommandKey {
    pub parameter: String,

    /// Set for interface-scoped commands only.
    pub interface: Option<String>,
}

/// A command ready to send.
#[derive(Debug, Clone)]
pub struct PlannedCommand<'a> {
    pub key: CommandKey,
    pub command: &'a CompiledCommand,
    /// Rendered command text.
    pub text: String,
}

/// Order a device's commands: device-scoped first, then interface-scoped
/// commands grouped by interface.
pub fn plan_commands<'a, 'i>(
    family: &'a CompiledFamily,
    interfaces: impl IntoIterator<Item = &'i MonitoredInterface>,
) -> Vec<PlannedCommand<'a>> {
    let mut plan: Vec<PlannedCommand<'a>> = family
        .commands_for(CommandScope::Device)
        .map(|command| PlannedCommand {
            key: CommandKey {
                parameter: command.spec.parameter.clone(),
                interface: None,
            },
            command,
            text: command.spec.render(None),
        })
        .collect();

    for interface in interfaces {
        for command in family.commands_for(CommandScope::Interface) {
            plan.push(PlannedCommand {
                key: CommandKey {
                    parameter: command.spec.parameter.clone(),
                    interface: Some(interface.interface.clone()),
                },
                command,
                text: command.spec.render(Some(&interface.interface)),
            });
        }
    }

    plan
}
