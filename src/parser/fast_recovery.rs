//! Detects reestablishment-based recovery after a radio link failure with
//! no intervening connection setup: reestablishment request citing
//! `otherFailure` -> MAC RACH `RLF` succeeds -> reestablishment complete
//! -> reconfiguration back to normal -> complete.

use std::io::Write;

use super::{Context, Parser};
use crate::error::Error;
use crate::event::Event;

#[derive(Debug, Default)]
pub struct FastRecoverAfterRlfParser {
    reestablishment_requested_on_rlf: bool,
    mac_rach_triggered_by_rlf: bool,
    mac_rach_attempt_succeeded: bool,
    reestablishment_completed: bool,
    rrc_reconfiguration_started: bool,
    reestablishment_request_timestamp: Option<String>,
    rrc_reestablishment_rejected: bool,
    mac_rach_switched_to_connection_request: bool,
    last_packet_timestamp_before_rlf: Option<String>,
    just_switched: bool,
    trying_cell_dl_freq: Option<String>,
    trying_cell_ul_freq: Option<String>,
    trying_cell_id: Option<String>,
}

impl FastRecoverAfterRlfParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets only the per-attempt normal-state fields, preserving the
    /// `trying_cell_*` fields the way the commit path needs them even
    /// after the commit clears everything else.
    fn reset_attempt(&mut self) {
        self.reestablishment_requested_on_rlf = false;
        self.mac_rach_triggered_by_rlf = false;
        self.mac_rach_attempt_succeeded = false;
        self.reestablishment_completed = false;
        self.rrc_reconfiguration_started = false;
        self.reestablishment_request_timestamp = None;
        self.rrc_reestablishment_rejected = false;
        self.mac_rach_switched_to_connection_request = false;
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
            self.mac_rach_switched_to_connection_request = true;
        }
        Ok(())
    }

    fn on_rach_attempt(&mut self, event: &Event) -> Result<(), Error> {
        if event.field("Result")? == "Success" && self.mac_rach_triggered_by_rlf {
            self.mac_rach_attempt_succeeded = true;
        }
        Ok(())
    }

    fn on_serv_cell_info(&mut self, event: &Event) -> Result<(), Error> {
        self.trying_cell_dl_freq = Some(event.field("Downlink frequency")?.to_string());
        self.trying_cell_ul_freq = Some(event.field("Uplink frequency")?.to_string());
        self.trying_cell_id = Some(event.field("Cell ID")?.to_string());
        Ok(())
    }

    fn on_reconfiguration(&mut self, event: &Event) -> Result<(), Error> {
        if event.field("mobilityControlInfo")? == "0" && self.reestablishment_completed {
            self.rrc_reconfiguration_started = true;
        }
        Ok(())
    }

    fn on_reconfiguration_complete<R: Write, S: Write>(
        &mut self,
        event: &Event,
        ctx: &mut Context<R, S>,
    ) {
        if self.rrc_reconfiguration_started
            && !self.rrc_reestablishment_rejected
            && !self.mac_rach_switched_to_connection_request
        {
            let label = if ctx.shared.cell.last_serving_cell_id == self.trying_cell_id {
                "Fast Recovery After RLF (Self Reconnection)"
            } else {
                "Fast Recovery After RLF (Psudo Handover)"
            };
            let from = self.reestablishment_request_timestamp.clone().unwrap_or_default();
            ctx.reports.emit(label, &[("From", &from), ("To", &event.timestamp)]);

            self.just_switched = true;
            ctx.shared.cell.last_serving_cell_dl_freq = self.trying_cell_dl_freq.clone();
            ctx.shared.cell.last_serving_cell_ul_freq = self.trying_cell_ul_freq.clone();
            ctx.shared.cell.last_serving_cell_id = self.trying_cell_id.clone();
        }
        self.reset_attempt();
    }

    fn on_pdcp_packet<R: Write, S: Write>(&mut self, event: &Event, ctx: &mut Context<R, S>) {
        if self.just_switched {
            let before = self.last_packet_timestamp_before_rlf.clone().unwrap_or_default();
            ctx.reports.emit(
                "Fast Recovery After RLF",
                &[("From", &before), ("To", &event.timestamp)],
            );
            self.just_switched = false;
        }
    }
}

impl<R: Write, S: Write> Parser<R, S> for FastRecoverAfterRlfParser {
    fn name(&self) -> &'static str {
        "FastRecoverAfterRLFParser"
    }

    fn feed(&mut self, event: &Event, ctx: &mut Context<R, S>) -> Result<(), Error> {
        match event.packet_type.as_str() {
            "rrcConnectionReestablishmentRequest" => self.on_reestablishment_request(event)?,
            "LTE_MAC_Rach_Trigger" => self.on_rach_trigger(event)?,
            "LTE_MAC_Rach_Attempt" => self.on_rach_attempt(event)?,
            "LTE_RRC_Serv_Cell_Info" => self.on_serv_cell_info(event)?,
            "rrcConnectionReestablishmentComplete" => {
                if self.mac_rach_attempt_succeeded {
                    self.reestablishment_completed = true;
                }
            }
            "rrcConnectionReconfiguration" => self.on_reconfiguration(event)?,
            "rrcConnectionReconfigurationComplete" => self.on_reconfiguration_complete(event, ctx),
            "rrcConnectionReestablishmentReject" => self.rrc_reestablishment_rejected = true,
            "FirstPDCPPacketAfterDisruption" => self.on_pdcp_packet(event, ctx),
            _ => {}
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.reset_attempt();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::SharedState;
    use crate::warnings::{ColorMode, Reports, Warnings};

    fn feed_line(
        parser: &mut FastRecoverAfterRlfParser,
        line: &str,
        shared: &mut SharedState,
        reports: &mut Reports<&mut Vec<u8>>,
        warnings: &mut Warnings<&mut Vec<u8>>,
    ) {
        let event = Event::decode(line, 1).unwrap();
        let mut c = Context {
            shared,
            reports,
            warnings,
        };
        parser.feed(&event, &mut c).unwrap();
    }

    #[test]
    fn self_reconnection() {
        let mut parser = FastRecoverAfterRlfParser::new();
        let mut shared = SharedState::default();
        shared.cell.last_serving_cell_id = Some("7".to_string());
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut reports = Reports::new(&mut out);
        let mut warnings = Warnings::new(&mut err, ColorMode::Plain);

        for line in [
            "T1 $ rrcConnectionReestablishmentRequest $ reestablishmentCause: otherFailure, LastPDCPPacketTimestamp: T0",
            "T2 $ LTE_MAC_Rach_Trigger $ Reason: RLF",
            "T3 $ LTE_MAC_Rach_Attempt $ Result: Success",
            "T4 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 7, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C7",
            "T5 $ rrcConnectionReestablishmentComplete $",
            "T6 $ rrcConnectionReconfiguration $ mobilityControlInfo: 0",
            "T8 $ rrcConnectionReconfigurationComplete $",
            "T9 $ FirstPDCPPacketAfterDisruption $",
        ] {
            feed_line(&mut parser, line, &mut shared, &mut reports, &mut warnings);
        }

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Fast Recovery After RLF (Self Reconnection) $ From: T1, To: T8\n\
             Fast Recovery After RLF $ From: T0, To: T9\n"
        );
    }

    #[test]
    fn pseudo_handover_when_cell_differs() {
        let mut parser = FastRecoverAfterRlfParser::new();
        let mut shared = SharedState::default();
        shared.cell.last_serving_cell_id = Some("7".to_string());
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut reports = Reports::new(&mut out);
        let mut warnings = Warnings::new(&mut err, ColorMode::Plain);

        for line in [
            "T1 $ rrcConnectionReestablishmentRequest $ reestablishmentCause: otherFailure, LastPDCPPacketTimestamp: T0",
            "T2 $ LTE_MAC_Rach_Trigger $ Reason: RLF",
            "T3 $ LTE_MAC_Rach_Attempt $ Result: Success",
            "T4 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 55, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C55",
            "T5 $ rrcConnectionReestablishmentComplete $",
            "T6 $ rrcConnectionReconfiguration $ mobilityControlInfo: 0",
            "T8 $ rrcConnectionReconfigurationComplete $",
        ] {
            feed_line(&mut parser, line, &mut shared, &mut reports, &mut warnings);
        }

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Fast Recovery After RLF (Psudo Handover) $ From: T1, To: T8\n"
        );
        assert_eq!(shared.cell.last_serving_cell_id.as_deref(), Some("55"));
    }

    #[test]
    fn connection_req_suppresses_fast_recovery_commit() {
        let mut parser = FastRecoverAfterRlfParser::new();
        let mut shared = SharedState::default();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let mut reports = Reports::new(&mut out);
        let mut warnings = Warnings::new(&mut err, ColorMode::Plain);

        for line in [
            "T1 $ rrcConnectionReestablishmentRequest $ reestablishmentCause: otherFailure, LastPDCPPacketTimestamp: T0",
            "T2 $ LTE_MAC_Rach_Trigger $ Reason: RLF",
            "T3 $ LTE_MAC_Rach_Attempt $ Result: Success",
            "T4 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 55, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C55",
            "T5 $ rrcConnectionReestablishmentComplete $",
            "T5a $ LTE_MAC_Rach_Trigger $ Reason: CONNECTION_REQ",
            "T6 $ rrcConnectionReconfiguration $ mobilityControlInfo: 0",
            "T8 $ rrcConnectionReconfigurationComplete $",
        ] {
            feed_line(&mut parser, line, &mut shared, &mut reports, &mut warnings);
        }

        assert!(String::from_utf8(out).unwrap().is_empty());
    }
}
