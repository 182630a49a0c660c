/// cardprobe - Cross-platform tool for identifying smart cards
///
/// This library classifies cards from their ATR and, for EMV payment
/// cards, drives application selection and a bounded record scan to
/// extract cardholder fields over any PCSC-compatible reader.
pub mod cli;
pub mod core;

// Re-export commonly used types
pub use core::{
    atr::{classify_atr, CardFamily, Classification},
    scan::{scan_records, ScanConfig},
    select::{select_application, CandidateAid, KNOWN_AIDS},
    session::{CardReport, ReaderEvent, SessionController},
    status::{interpret_status, SwOutcome},
    tlv::{extract_fields, EmvSessionFields},
    transport::{CardSession, Connector, PcscConnector, ReaderInfo, Transceiver},
};

// Common error type
pub type Result<T> = anyhow::Result<T>;
