//! Detects a handover command that fails and is recovered through
//! reestablishment: handover command -> MAC RACH `HO` -> (no success under
//! `HO`) -> reestablishment request citing `handoverFailure` -> MAC RACH
//! `RLF` succeeds -> reconfiguration back to normal -> complete.

use std::io::Write;

use super::{Context, Parser};
use crate::error::Error;
use crate::event::Event;

#[derive(Debug)]
pub struct HandoverFailureParser {
    received_handover_command: bool,
    have_sent_meas_report_to_current_cell: bool,
    handover_command_timestamp: Option<String>,
    target_cell_id: Option<String>,
    last_packet_timestamp_before_ho: Option<String>,
    mac_rach_triggered_reason: Option<String>,
    handover_failure: bool,
    mac_rach_succeeded_after_ho_failure: bool,
    connection_reconfig_after_ho_failure: bool,
    switched_to_target_cell: bool,
    just_handovered: bool,
    trying_cell_dl_freq: Option<String>,
    trying_cell_ul_freq: Option<String>,
    trying_cell_id: Option<String>,
}

impl Default for HandoverFailureParser {
    fn default() -> Self {
        Self {
            received_handover_command: false,
            // Suppresses spurious warnings before the first real measurement report.
            have_sent_meas_report_to_current_cell: true,
            handover_command_timestamp: None,
            target_cell_id: None,
            last_packet_timestamp_before_ho: None,
            mac_rach_triggered_reason: None,
            handover_failure: false,
            mac_rach_succeeded_after_ho_failure: false,
            connection_reconfig_after_ho_failure: false,
            switched_to_target_cell: false,
            just_handovered: false,
            trying_cell_dl_freq: None,
            trying_cell_ul_freq: None,
            trying_cell_id: None,
        }
    }
}

impl HandoverFailureParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn on_reconfiguration<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) -> Result<(), Error> {
        if event.field("mobilityControlInfo")? == "1" {
            if self.received_handover_command {
                ctx.warnings
                    .warn(<HandoverFailureParser as Parser<R, S>>::name(self), &event.timestamp, "received handover command twice");
            } else {
                self.received_handover_command = true;
                self.handover_command_timestamp = Some(event.timestamp.clone());
                self.target_cell_id = Some(event.field("targetPhysCellId")?.to_string());
                self.last_packet_timestamp_before_ho =
                    Some(event.field("LastPDCPPacketTimestamp")?.to_string());
            }
            if !self.have_sent_meas_report_to_current_cell {
                ctx.warnings.warn(
                    <HandoverFailureParser as Parser<R, S>>::name(self),
                    &event.timestamp,
                    "received handover command but no measurement report was sent",
                );
            }
        } else if self.mac_rach_succeeded_after_ho_failure {
            self.connection_reconfig_after_ho_failure = true;
        }
        Ok(())
    }

    fn on_serv_cell_info(&mut self, event: &Event) -> Result<(), Error> {
        let cell_id = event.field("Cell ID")?.to_string();
        if self.target_cell_id.as_deref() == Some(cell_id.as_str()) {
            self.switched_to_target_cell = true;
            self.trying_cell_dl_freq = Some(event.field("Downlink frequency")?.to_string());
            self.trying_cell_ul_freq = Some(event.field("Uplink frequency")?.to_string());
            self.trying_cell_id = Some(cell_id);
        }
        Ok(())
    }

    fn on_reconfiguration_complete<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) {
        if !self.connection_reconfig_after_ho_failure {
            return;
        }
        if !self.switched_to_target_cell {
            ctx.warnings.warn(
                <HandoverFailureParser as Parser<R, S>>::name(self),
                &event.timestamp,
                "recovery completed but serving cell did not match the handover command's target",
            );
        }

        let hc_ts = self.handover_command_timestamp.clone().unwrap_or_default();
        ctx.reports
            .emit("Handover Failure", &[("From", &hc_ts), ("To", &event.timestamp)]);

        self.just_handovered = true;
        if let Some(cell_id) = self.trying_cell_id.clone() {
            ctx.shared.cell.last_serving_cell_dl_freq = self.trying_cell_dl_freq.clone();
            ctx.shared.cell.last_serving_cell_ul_freq = self.trying_cell_ul_freq.clone();
            ctx.shared.cell.last_serving_cell_id = Some(cell_id);
        }

        self.received_handover_command = false;
        self.target_cell_id = None;
        self.mac_rach_triggered_reason = None;
        self.handover_failure = false;
        self.mac_rach_succeeded_after_ho_failure = false;
        self.connection_reconfig_after_ho_failure = false;
        self.switched_to_target_cell = false;
    }

    fn on_reestablishment_request<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) -> Result<(), Error> {
        let cause = event.field("reestablishmentCause")?;
        if cause.contains("handoverFailure") {
            if !self.received_handover_command {
                ctx.warnings.warn(
                    <HandoverFailureParser as Parser<R, S>>::name(self),
                    &event.timestamp,
                    "reestablishment cause handoverFailure without a prior handover command",
                );
            }
            self.handover_failure = true;
        }
        Ok(())
    }

    fn on_rach_trigger<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) -> Result<(), Error> {
        let reason = event.field("Reason")?.to_string();
        if reason == "HO" && !self.received_handover_command {
            ctx.warnings.warn(
                <HandoverFailureParser as Parser<R, S>>::name(self),
                &event.timestamp,
                "MAC RACH triggered by handover without a prior handover command",
            );
        }
        self.mac_rach_triggered_reason = Some(reason);
        Ok(())
    }

    fn on_rach_attempt(&mut self, event: &Event) -> Result<(), Error> {
        if event.field("Result")? == "Success"
            && self.handover_failure
            && self.mac_rach_triggered_reason.as_deref() == Some("RLF")
        {
            self.mac_rach_succeeded_after_ho_failure = true;
        }
        Ok(())
    }

    fn on_pdcp_packet<R: Write, S: Write>(&mut self, event: &Event, ctx: &mut Context<R, S>) {
        if self.just_handovered {
            let before = self.last_packet_timestamp_before_ho.clone().unwrap_or_default();
            ctx.reports.emit(
                "Handover Failure PDCP Disruption",
                &[("From", &before), ("To", &event.timestamp)],
            );
            ctx.shared.control.reset_all = true;
        }
        <HandoverFailureParser as Parser<R, S>>::reset(self);
    }
}

impl<R: Write, S: Write> Parser<R, S> for HandoverFailureParser {
    fn name(&self) -> &'static str {
        "HandoverFailureParser"
    }

    fn feed(&mut self, event: &Event, ctx: &mut Context<R, S>) -> Result<(), Error> {
        match event.packet_type.as_str() {
            "measResults" => self.have_sent_meas_report_to_current_cell = true,
            "rrcConnectionReconfiguration" => self.on_reconfiguration(event, ctx)?,
            "rrcConnectionReconfigurationComplete" => self.on_reconfiguration_complete(event, ctx),
            "rrcConnectionReestablishmentRequest" => self.on_reestablishment_request(event, ctx)?,
            "LTE_MAC_Rach_Trigger" => self.on_rach_trigger(event, ctx)?,
            "LTE_MAC_Rach_Attempt" => self.on_rach_attempt(event)?,
            "LTE_RRC_Serv_Cell_Info" => self.on_serv_cell_info(event)?,
            "FirstPDCPPacketAfterDisruption" => self.on_pdcp_packet(event, ctx),
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
