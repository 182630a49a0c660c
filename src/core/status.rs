/// Outcome of interpreting an APDU status word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwOutcome {
    Success,
    RecordNotFound,
    OtherFailure { sw1: u8, sw2: u8 },
}

/// Map a raw (SW1, SW2) pair to an outcome.
///
/// Total function: every byte pair maps to exactly one variant. Only the
/// two status words the protocol loops branch on get their own variant;
/// everything else carries the raw pair for diagnostics.
pub fn interpret_status(sw1: u8, sw2: u8) -> SwOutcome {
    match (sw1, sw2) {
        (0x90, 0x00) => SwOutcome::Success,
        (0x6A, 0x83) => SwOutcome::RecordNotFound,
        _ => SwOutcome::OtherFailure { sw1, sw2 },
    }
}

/// Get a human-readable description of SW1/SW2 status words
pub fn describe_status_word(sw1: u8, sw2: u8) -> String {
    match (sw1, sw2) {
        (0x90, 0x00) => "Success".to_string(),
        (0x61, n) => format!("Success, {n} bytes available"),
        (0x62, 0x83) => "Warning: Selected file invalidated".to_string(),
        (0x67, 0x00) => "Error: Wrong length".to_string(),
        (0x69, 0x85) => "Error: Conditions of use not satisfied".to_string(),
        (0x69, 0x86) => "Error: Command not allowed (no current EF)".to_string(),
        (0x6A, 0x81) => "Error: Function not supported".to_string(),
        (0x6A, 0x82) => "Error: File not found".to_string(),
        (0x6A, 0x83) => "Error: Record not found".to_string(),
        (0x6A, 0x86) => "Error: Incorrect parameters P1-P2".to_string(),
        (0x6A, 0x88) => "Error: Referenced data not found".to_string(),
        (0x6C, n) => format!("Error: Wrong Le field, exact length: {n}"),
        (0x6D, 0x00) => "Error: Instruction code not supported or invalid".to_string(),
        (0x6E, 0x00) => "Error: Class not supported".to_string(),
        _ => format!("Unknown status: {sw1:02X} {sw2:02X}"),
    }
}
