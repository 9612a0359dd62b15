//! Tejas Networks router family.
//!
//! The CLI has no reliable end-of-output marker and pages long output, so
//! pagination is switched off in config mode right after login and every
//! response is completed by quiescence.

use std::time::Duration;

use crate::channel::SettleTime;
use crate::platform::{CommandSpec, DeviceFamily, ParserSpec};

pub const OSPF_NEIGHBORS: &str = "TEJAS_OSPF_NEIGHBORS";
pub const BGP_SUMMARY: &str = "TEJAS_BGP_SUMMARY";
pub const SFP_100G_INFO: &str = "TEJAS_SFP_100G_INFO";
pub const SFP_100G_STATS: &str = "TEJAS_SFP_100G_STATS";

/// Create the Tejas family definition.
pub fn family() -> DeviceFamily {
    let two_seconds = SettleTime::new(Duration::from_secs(2));

    DeviceFamily::new("tejas")
        .with_bootstrap("conf t")
        .with_bootstrap("set cli pagination off")
        .with_bootstrap("end")
        .with_exit_command("exit")
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Unknown command")
        .with_failure_pattern("% Incomplete command")
        .with_command(
            CommandSpec::new(OSPF_NEIGHBORS, "sh ip ospf ne", ParserSpec::OspfNeighbors)
                .with_settle(two_seconds),
        )
        .with_command(
            CommandSpec::new(BGP_SUMMARY, "sh ip bgp summary sorted", ParserSpec::BgpSummary)
                .with_settle(SettleTime::new(Duration::from_secs(3))),
        )
        .with_command(
            CommandSpec::new(SFP_100G_INFO, "sh sfp 100g {interface}", ParserSpec::SfpInfo)
                .per_interface()
                .with_settle(two_seconds),
        )
        .with_command(
            CommandSpec::new(SFP_100G_STATS, "sh sfp stats 100g {interface}", ParserSpec::SfpStats)
                .per_interface()
                .with_settle(two_seconds),
        )
}
