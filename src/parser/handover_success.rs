//! Detects a successful handover: handover command -> MAC RACH triggered
//! by `HO` -> MAC RACH success -> serving-cell info for the target cell.
//! Frequency classification and the PDCP-disruption window are completed
//! after the serving-cell info arrives.

use std::io::Write;

use super::{Context, Parser};
use crate::error::Error;
use crate::event::Event;

#[derive(Debug)]
pub struct HandoverSuccessParser {
    received_handover_command: bool,
    mac_rach_triggered_reason: Option<String>,
    mac_rach_just_succeeded: bool,
    just_handovered: bool,
    have_sent_meas_report_to_current_cell: bool,
    handover_command_timestamp: Option<String>,
    target_cell_id: Option<String>,
    last_packet_timestamp_before_ho: Option<String>,
    mac_rach_success_timestamp: Option<String>,
    first_packet_timestamp_after_ho: Option<String>,
}

impl Default for HandoverSuccessParser {
    fn default() -> Self {
        Self {
            received_handover_command: false,
            mac_rach_triggered_reason: None,
            mac_rach_just_succeeded: false,
            just_handovered: false,
            // Suppresses spurious warnings before the first real measurement report.
            have_sent_meas_report_to_current_cell: true,
            handover_command_timestamp: None,
            target_cell_id: None,
            last_packet_timestamp_before_ho: None,
            mac_rach_success_timestamp: None,
            first_packet_timestamp_after_ho: None,
        }
    }
}

impl HandoverSuccessParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears only the normal-transition-graph fields. `just_handovered`,
    /// `last_packet_timestamp_before_ho` and `first_packet_timestamp_after_ho`
    /// survive a cross-parser `reset_all`: the commit that sets
    /// `just_handovered` also raises `reset_all` in the same event, so the
    /// Dispatcher resets every parser, including this one, before the very
    /// next event — the one those fields exist to describe — is fed.
    fn reset_attempt(&mut self) {
        self.received_handover_command = false;
        self.mac_rach_triggered_reason = None;
        self.mac_rach_just_succeeded = false;
        self.have_sent_meas_report_to_current_cell = true;
        self.handover_command_timestamp = None;
        self.target_cell_id = None;
        self.mac_rach_success_timestamp = None;
    }

    fn on_reconfiguration<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) -> Result<(), Error> {
        if event.field("mobilityControlInfo")? != "1" {
            return Ok(());
        }
        if self.received_handover_command {
            ctx.warnings
                .warn(<HandoverSuccessParser as Parser<R, S>>::name(self), &event.timestamp, "received handover command twice");
        } else {
            self.received_handover_command = true;
            self.handover_command_timestamp = Some(event.timestamp.clone());
            self.target_cell_id = Some(event.field("targetPhysCellId")?.to_string());
        }
        if !self.have_sent_meas_report_to_current_cell {
            ctx.warnings.warn(
                <HandoverSuccessParser as Parser<R, S>>::name(self),
                &event.timestamp,
                "received handover command but no measurement report was sent",
            );
        }
        Ok(())
    }

    fn on_rach_trigger<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) -> Result<(), Error> {
        let reason = event.field("Reason")?.to_string();
        if reason == "HO" {
            self.last_packet_timestamp_before_ho =
                Some(event.field("LastPDCPPacketTimestamp")?.to_string());
            if !self.received_handover_command {
                ctx.warnings.warn(
                    <HandoverSuccessParser as Parser<R, S>>::name(self),
                    &event.timestamp,
                    "MAC RACH triggered by handover without a prior handover command",
                );
            }
        } else if reason != "UL_DATA" && reason != "DL_DATA" && self.mac_rach_just_succeeded {
            // The target-cell serving-cell info never arrived; give up on
            // this attempt without disturbing the other parsers.
            let hc_ts = self.handover_command_timestamp.clone().unwrap_or_default();
            let rach_ts = self.mac_rach_success_timestamp.clone().unwrap_or_default();
            ctx.reports.emit(
                "Handover Success",
                &[("From", &hc_ts), ("To", &rach_ts), ("Frequecy Change", "unknown")],
            );
            <HandoverSuccessParser as Parser<R, S>>::reset(self);
            return Ok(());
        }
        self.mac_rach_triggered_reason = Some(reason);
        Ok(())
    }

    fn on_rach_attempt(&mut self, event: &Event) -> Result<(), Error> {
        if event.field("Result")? == "Success"
            && self.received_handover_command
            && self.mac_rach_triggered_reason.as_deref() == Some("HO")
        {
            self.mac_rach_just_succeeded = true;
            self.mac_rach_success_timestamp = Some(event.timestamp.clone());
        }
        Ok(())
    }

    fn on_serv_cell_info<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) -> Result<(), Error> {
        let cell_id = event.field("Cell ID")?.to_string();
        if ctx.shared.cell.last_serving_cell_id.as_deref() != Some(cell_id.as_str()) {
            self.have_sent_meas_report_to_current_cell = false;
        }

        if self.target_cell_id.as_deref() != Some(cell_id.as_str()) || !self.mac_rach_just_succeeded {
            return Ok(());
        }

        let dl = event.field("Downlink frequency")?.to_string();
        let ul = event.field("Uplink frequency")?.to_string();
        let identity = event.field("Cell Identity")?.to_string();

        let frequency_change = match (
            &ctx.shared.cell.last_serving_cell_dl_freq,
            &ctx.shared.cell.last_serving_cell_ul_freq,
        ) {
            (Some(prev_dl), Some(prev_ul)) if *prev_dl == dl && *prev_ul == ul => "intra",
            (Some(_), Some(_)) => "inter",
            _ => "unknown",
        };
        let previous_identity = ctx.shared.cell.last_serving_cell_identity.clone();
        let hc_ts = self.handover_command_timestamp.clone().unwrap_or_default();
        let mac_ts = self.mac_rach_success_timestamp.clone().unwrap_or_default();

        ctx.reports.emit(
            "Handover Success",
            &[
                ("From", &hc_ts),
                ("To", &mac_ts),
                ("Frequecy Change", frequency_change),
                ("Previous Cell Identity", &previous_identity),
            ],
        );

        ctx.shared.control.reset_all = true;
        self.just_handovered = true;
        ctx.shared.cell.last_serving_cell_dl_freq = Some(dl);
        ctx.shared.cell.last_serving_cell_ul_freq = Some(ul);
        ctx.shared.cell.last_serving_cell_id = Some(cell_id);
        ctx.shared.cell.last_serving_cell_identity = identity;

        if let Some(after) = self.first_packet_timestamp_after_ho.take() {
            let before = self.last_packet_timestamp_before_ho.clone().unwrap_or_default();
            ctx.reports
                .emit("Handover Success PDCP Disruption", &[("From", &before), ("To", &after)]);
            self.just_handovered = false;
        }
        Ok(())
    }

    fn on_pdcp_packet<R: Write, S: Write>(&mut self, event: &Event, ctx: &mut Context<R, S>) {
        if self.just_handovered {
            let before = self.last_packet_timestamp_before_ho.clone().unwrap_or_default();
            ctx.reports.emit(
                "Handover Success PDCP Disruption",
                &[("From", &before), ("To", &event.timestamp)],
            );
            ctx.shared.control.reset_all = true;
            self.just_handovered = false;
        } else if self.mac_rach_just_succeeded && self.first_packet_timestamp_after_ho.is_none() {
            self.first_packet_timestamp_after_ho = Some(event.timestamp.clone());
        } else if self.received_handover_command && self.mac_rach_triggered_reason.is_none() {
            self.last_packet_timestamp_before_ho = Some(event.timestamp.clone());
        }
    }
}

impl<R: Write, S: Write> Parser<R, S> for HandoverSuccessParser {
    fn name(&self) -> &'static str {
        "HandoverSuccessParser"
    }

    fn feed(&mut self, event: &Event, ctx: &mut Context<R, S>) -> Result<(), Error> {
        match event.packet_type.as_str() {
            "measResults" => self.have_sent_meas_report_to_current_cell = true,
            "rrcConnectionReconfiguration" => self.on_reconfiguration(event, ctx)?,
            "LTE_MAC_Rach_Trigger" => self.on_rach_trigger(event, ctx)?,
            "LTE_MAC_Rach_Attempt" => self.on_rach_attempt(event)?,
            "LTE_RRC_Serv_Cell_Info" => self.on_serv_cell_info(event, ctx)?,
            "FirstPDCPPacketAfterDisruption" => self.on_pdcp_packet(event, ctx),
            "rrcConnectionRelease" => ctx.shared.control.reset_all = true,
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.reset_attempt();
    }
}
