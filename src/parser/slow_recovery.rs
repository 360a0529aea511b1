//! Detects recovery after a radio link failure that falls through to a
//! full connection setup (an intervening MAC RACH `CONNECTION_REQ` ->
//! `rrcConnectionSetup`), and surfaces plain "Connection Setup" events
//! that were never preceded by an RLF at all.

use std::io::Write;

use super::{Context, Parser};
use crate::error::Error;
use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionRequestReason {
    RadioLinkFailure,
    ConnectionSetup,
}

#[derive(Debug, Default)]
pub struct SlowRecoverAfterRlfParser {
    reestablishment_requested_on_rlf: bool,
    mac_rach_triggered_by_rlf: bool,
    mac_rach_attempt_succeeded: bool,
    connection_setup: bool,
    rrc_reconfiguration_started: bool,
    reestablishment_request_timestamp: Option<String>,
    rrc_reestablishment_rejected: bool,
    mac_rach_connection_request_reason: Option<ConnectionRequestReason>,
    last_packet_timestamp_before_rlf: Option<String>,
    just_switched: bool,
    trying_cell_dl_freq: Option<String>,
    trying_cell_ul_freq: Option<String>,
    trying_cell_id: Option<String>,
    trying_cell_identity: Option<String>,
}

impl SlowRecoverAfterRlfParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset_attempt(&mut self) {
        self.reestablishment_requested_on_rlf = false;
        self.mac_rach_triggered_by_rlf = false;
        self.mac_rach_attempt_succeeded = false;
        self.connection_setup = false;
        self.rrc_reconfiguration_started = false;
        self.reestablishment_request_timestamp = None;
        self.rrc_reestablishment_rejected = false;
        self.mac_rach_connection_request_reason = None;
    }

    fn on_reestablishment_request(&mut self, event: &Event) -> Result<(), Error> {
        let cause = event.field("reestablishmentCause")?;
        if cause.contains("otherFailure") {
            self.reestablishment_requested_on_rlf = true;
            self.reestablishment_request_timestamp = Some(event.timestamp.clone());
            self.last_packet_timestamp_before_rlf =
                Some(event.field("LastPDCPPacketTimestamp")?.to_string());
        }
        Ok(())
    }

    fn on_rach_trigger(&mut self, event: &Event) -> Result<(), Error> {
        let reason = event.field("Reason")?;
        if reason == "RLF" && self.reestablishment_requested_on_rlf {
            self.mac_rach_triggered_by_rlf = true;
        } else if reason == "CONNECTION_REQ" {
            self.mac_rach_connection_request_reason = Some(if self.mac_rach_triggered_by_rlf {
                ConnectionRequestReason::RadioLinkFailure
            } else {
                ConnectionRequestReason::ConnectionSetup
            });
        }
        Ok(())
    }

    fn on_rach_attempt(&mut self, event: &Event) -> Result<(), Error> {
        if event.field("Result")? == "Success" && self.mac_rach_connection_request_reason.is_some()
        {
            self.mac_rach_attempt_succeeded = true;
        }
        Ok(())
    }

    fn on_serv_cell_info(&mut self, event: &Event) -> Result<(), Error> {
        self.trying_cell_dl_freq = Some(event.field("Downlink frequency")?.to_string());
        self.trying_cell_ul_freq = Some(event.field("Uplink frequency")?.to_string());
        self.trying_cell_id = Some(event.field("Cell ID")?.to_string());
        self.trying_cell_identity = Some(event.field("Cell Identity")?.to_string());
        Ok(())
    }

    fn on_connection_setup(&mut self) {
        if self.mac_rach_attempt_succeeded {
            self.connection_setup = true;
        }
    }

    fn on_reconfiguration(&mut self, event: &Event) -> Result<(), Error> {
        if event.field("mobilityControlInfo")? == "0" && self.connection_setup {
            self.rrc_reconfiguration_started = true;
        }
        Ok(())
    }

    fn on_reconfiguration_complete<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) {
        if !self.rrc_reconfiguration_started {
            return;
        }
        match self.mac_rach_connection_request_reason {
            Some(ConnectionRequestReason::RadioLinkFailure) => {
                let to_prev = self.trying_cell_id == ctx.shared.cell.last_serving_cell_id;
                let label = if to_prev {
                    "Slow Recover After RLF (to prev serving cell)"
                } else {
                    "Slow Recover After RLF (to new cell)"
                };
                let from = self.reestablishment_request_timestamp.clone().unwrap_or_default();
                let prev_identity = ctx.shared.cell.last_serving_cell_identity.clone();
                let current_identity = self.trying_cell_identity.clone().unwrap_or_default();
                ctx.reports.emit(
                    label,
                    &[
                        ("From", &from),
                        ("To", &event.timestamp),
                        ("Previous Cell Identity", &prev_identity),
                        ("Current Cell Identity", &current_identity),
                    ],
                );
                self.just_switched = true;
                ctx.shared.cell.last_serving_cell_dl_freq = self.trying_cell_dl_freq.clone();
                ctx.shared.cell.last_serving_cell_ul_freq = self.trying_cell_ul_freq.clone();
                ctx.shared.cell.last_serving_cell_id = self.trying_cell_id.clone();
                ctx.shared.cell.last_serving_cell_identity = current_identity;
            }
            Some(ConnectionRequestReason::ConnectionSetup) => {
                ctx.reports.emit("Connection Setup", &[]);
            }
            None => {}
        }
        ctx.shared.control.reset_all = true;
    }

    fn on_pdcp_packet<R: Write, S: Write>(&mut self, event: &Event, ctx: &mut Context<R, S>) {
        if self.just_switched {
            let before = self.last_packet_timestamp_before_rlf.clone().unwrap_or_default();
            ctx.reports.emit(
                "Slow Recover After RLF PDCP Disruption",
                &[("From", &before), ("To", &event.timestamp)],
            );
            ctx.shared.control.reset_all = true;
            self.just_switched = false;
        }
    }
}

impl<R: Write, S: Write> Parser<R, S> for SlowRecoverAfterRlfParser {
    fn name(&self) -> &'static str {
        "SlowRecoverAfterRLFParser"
    }

    fn feed(&mut self, event: &Event, ctx: &mut Context<R, S>) -> Result<(), Error> {
        match event.packet_type.as_str() {
            "rrcConnectionReestablishmentRequest" => self.on_reestablishment_request(event)?,
            "LTE_MAC_Rach_Trigger" => self.on_rach_trigger(event)?,
            "LTE_MAC_Rach_Attempt" => self.on_rach_attempt(event)?,
            "rrcConnectionSetup" => self.on_connection_setup(),
            "rrcConnectionReconfiguration" => self.on_reconfiguration(event)?,
            "rrcConnectionReconfigurationComplete" => self.on_reconfiguration_complete(event, ctx),
            "FirstPDCPPacketAfterDisruption" => self.on_pdcp_packet(event, ctx),
            "LTE_RRC_Serv_Cell_Info" => self.on_serv_cell_info(event)?,
            "rrcConnectionRelease" => ctx.shared.control.reset_all = true,
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.reset_attempt();
    }
}
