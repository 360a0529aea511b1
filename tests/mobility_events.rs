//! End-to-end scenarios driving the full `Dispatcher` over literal trace
//! input, asserting on the combined stdout/stderr streams.

use lte_mobility_events::warnings::{ColorMode, Reports, Warnings};
use lte_mobility_events::{Dispatcher, Outcome};

fn run(input: &str) -> (String, String, Outcome) {
    let mut out = Vec::new();
    let mut err = Vec::new();
    let reports = Reports::new(&mut out);
    let warnings = Warnings::new(&mut err, ColorMode::Plain);
    let mut dispatcher = Dispatcher::new(reports, warnings);
    let outcome = dispatcher.run(input.as_bytes());
    drop(dispatcher);
    (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap(), outcome)
}

#[test]
fn handover_with_unknown_frequency_history() {
    let input = "\
T2 $ rrcConnectionReconfiguration $ mobilityControlInfo: 1, targetPhysCellId: 42, LastPDCPPacketTimestamp: T0
T3 $ LTE_MAC_Rach_Trigger $ Reason: HO, LastPDCPPacketTimestamp: T0
T4 $ LTE_MAC_Rach_Attempt $ Result: Success
T5 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 42, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C42
T6 $ FirstPDCPPacketAfterDisruption $
";
    let (stdout, stderr, outcome) = run(input);
    assert_eq!(outcome, Outcome::Eof);
    assert!(stderr.is_empty());
    assert_eq!(
        stdout,
        "Handover Success $ From: T2, To: T4, Frequecy Change: unknown, Previous Cell Identity: Unknown\n\
         Handover Success PDCP Disruption $ From: T0, To: T6\n"
    );
}

#[test]
fn second_handover_to_a_same_frequency_cell_is_intra() {
    // A cold-start handover establishes a serving cell at 1800/1700; a
    // second handover lands on a different cell using the same pair of
    // frequencies, which is what actually drives the `intra` branch —
    // unlike a single cold-start handover, which can only ever observe
    // `unknown` (there is no prior serving cell to compare against).
    let input = "\
T1 $ measResults $
T2 $ rrcConnectionReconfiguration $ mobilityControlInfo: 1, targetPhysCellId: 42, LastPDCPPacketTimestamp: T0
T3 $ LTE_MAC_Rach_Trigger $ Reason: HO, LastPDCPPacketTimestamp: T0
T4 $ LTE_MAC_Rach_Attempt $ Result: Success
T5 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 42, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C42
T6 $ FirstPDCPPacketAfterDisruption $
T7 $ rrcConnectionReconfiguration $ mobilityControlInfo: 1, targetPhysCellId: 99, LastPDCPPacketTimestamp: T6
T8 $ LTE_MAC_Rach_Trigger $ Reason: HO, LastPDCPPacketTimestamp: T6
T9 $ LTE_MAC_Rach_Attempt $ Result: Success
T10 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 99, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C99
T11 $ FirstPDCPPacketAfterDisruption $
";
    let (stdout, stderr, outcome) = run(input);
    assert_eq!(outcome, Outcome::Eof);
    assert!(stderr.is_empty());
    assert_eq!(
        stdout,
        "Handover Success $ From: T2, To: T4, Frequecy Change: unknown, Previous Cell Identity: Unknown\n\
         Handover Success PDCP Disruption $ From: T0, To: T6\n\
         Handover Success $ From: T7, To: T9, Frequecy Change: intra, Previous Cell Identity: C42\n\
         Handover Success PDCP Disruption $ From: T6, To: T11\n"
    );
}

#[test]
fn handover_success_resets_every_parser_for_the_next_round() {
    // A second handover, fed right after the first completes, must succeed
    // again: `reset_all` clears HFP/FRP/SRP's leftover partial state too.
    let input = "\
T2 $ rrcConnectionReconfiguration $ mobilityControlInfo: 1, targetPhysCellId: 42, LastPDCPPacketTimestamp: T0
T3 $ LTE_MAC_Rach_Trigger $ Reason: HO, LastPDCPPacketTimestamp: T0
T4 $ LTE_MAC_Rach_Attempt $ Result: Success
T5 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 42, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C42
T6 $ FirstPDCPPacketAfterDisruption $
T7 $ rrcConnectionReconfiguration $ mobilityControlInfo: 1, targetPhysCellId: 77, LastPDCPPacketTimestamp: T6
T8 $ LTE_MAC_Rach_Trigger $ Reason: HO, LastPDCPPacketTimestamp: T6
T9 $ LTE_MAC_Rach_Attempt $ Result: Success
T10 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 77, Downlink frequency: 1900, Uplink frequency: 1850, Cell Identity: C77
T11 $ FirstPDCPPacketAfterDisruption $
";
    let (stdout, _, outcome) = run(input);
    assert_eq!(outcome, Outcome::Eof);
    let reports: Vec<_> = stdout.lines().filter(|l| l.starts_with("Handover Success $")).collect();
    assert_eq!(reports.len(), 2);
}

#[test]
fn handover_failure_recovered_via_reestablishment() {
    let input = "\
T1 $ rrcConnectionReconfiguration $ mobilityControlInfo: 1, targetPhysCellId: 99, LastPDCPPacketTimestamp: T0
T2 $ LTE_MAC_Rach_Trigger $ Reason: HO
T3 $ rrcConnectionReestablishmentRequest $ reestablishmentCause: handoverFailure
T4 $ LTE_MAC_Rach_Trigger $ Reason: RLF
T5 $ LTE_MAC_Rach_Attempt $ Result: Success
T6 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 99, Downlink frequency: 1900, Uplink frequency: 1800, Cell Identity: C99
T7 $ rrcConnectionReconfiguration $ mobilityControlInfo: 0
T8 $ rrcConnectionReconfigurationComplete $
T9 $ FirstPDCPPacketAfterDisruption $
";
    let (stdout, stderr, outcome) = run(input);
    assert_eq!(outcome, Outcome::Eof);
    assert!(stderr.is_empty());
    assert_eq!(
        stdout,
        "Handover Failure $ From: T1, To: T8\n\
         Handover Failure PDCP Disruption $ From: T0, To: T9\n"
    );
}

#[test]
fn fast_recovery_self_reconnection() {
    // Establish cell 7 as the serving cell via a plain handover first, so
    // the subsequent reestablishment-based recovery back onto cell 7 is a
    // genuine self-reconnection rather than a cold-start pseudo-handover.
    let input = "\
T1 $ measResults $
T2 $ rrcConnectionReconfiguration $ mobilityControlInfo: 1, targetPhysCellId: 7, LastPDCPPacketTimestamp: T0
T3 $ LTE_MAC_Rach_Trigger $ Reason: HO, LastPDCPPacketTimestamp: T0
T4 $ LTE_MAC_Rach_Attempt $ Result: Success
T5 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 7, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C7
T6 $ FirstPDCPPacketAfterDisruption $
T7 $ rrcConnectionReestablishmentRequest $ reestablishmentCause: otherFailure, LastPDCPPacketTimestamp: T6
T8 $ LTE_MAC_Rach_Trigger $ Reason: RLF
T9 $ LTE_MAC_Rach_Attempt $ Result: Success
T10 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 7, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C7
T11 $ rrcConnectionReestablishmentComplete $
T12 $ rrcConnectionReconfiguration $ mobilityControlInfo: 0
T13 $ rrcConnectionReconfigurationComplete $
T14 $ FirstPDCPPacketAfterDisruption $
";
    let (stdout, stderr, outcome) = run(input);
    assert_eq!(outcome, Outcome::Eof);
    assert!(stderr.is_empty());
    assert_eq!(
        stdout,
        "Handover Success $ From: T2, To: T4, Frequecy Change: unknown, Previous Cell Identity: Unknown\n\
         Handover Success PDCP Disruption $ From: T0, To: T6\n\
         Fast Recovery After RLF (Self Reconnection) $ From: T7, To: T13\n\
         Fast Recovery After RLF $ From: T6, To: T14\n"
    );
}

#[test]
fn slow_recovery_to_new_cell() {
    let input = "\
T1 $ rrcConnectionReestablishmentRequest $ reestablishmentCause: otherFailure, LastPDCPPacketTimestamp: T0
T2 $ LTE_MAC_Rach_Trigger $ Reason: RLF
T3 $ LTE_MAC_Rach_Attempt $ Result: Success
T3a $ LTE_MAC_Rach_Trigger $ Reason: CONNECTION_REQ
T3b $ LTE_MAC_Rach_Attempt $ Result: Success
T4 $ LTE_RRC_Serv_Cell_Info $ Cell ID: 55, Downlink frequency: 1800, Uplink frequency: 1700, Cell Identity: C55
T5 $ rrcConnectionSetup $
T6 $ rrcConnectionReconfiguration $ mobilityControlInfo: 0
T8 $ rrcConnectionReconfigurationComplete $
T9 $ FirstPDCPPacketAfterDisruption $
";
    let (stdout, stderr, outcome) = run(input);
    assert_eq!(outcome, Outcome::Eof);
    assert!(stderr.is_empty());
    assert_eq!(
        stdout,
        "Slow Recover After RLF (to new cell) $ From: T1, To: T8, Previous Cell Identity: Unknown, Current Cell Identity: C55\n\
         Slow Recover After RLF PDCP Disruption $ From: T0, To: T9\n"
    );
}

#[test]
fn malformed_line_fails_at_its_line_number() {
    let input = "T1 $ measResults $\nnot a valid line\n";
    let (_, _, outcome) = run(input);
    match outcome {
        Outcome::Failed { line, error: Some(_) } => assert_eq!(line, 2),
        other => panic!("expected Failed at line 2, got {other:?}"),
    }
}

#[test]
fn missing_required_field_fails() {
    let input = "T1 $ rrcConnectionReconfiguration $ targetPhysCellId: 42\n";
    let (_, _, outcome) = run(input);
    assert!(matches!(outcome, Outcome::Failed { line: 1, error: Some(_) }));
}
