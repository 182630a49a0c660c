//! Bounded record scan over (SFI, record number) pairs.
//!
//! After a GET PROCESSING OPTIONS handshake, walks the record search space
//! in order, feeding every non-empty response to the TLV extractor. One
//! decision function per exchange drives the nested loop: stop everything
//! once all fields are found, skip to the next file when the card reports
//! a missing record, continue otherwise.

use crate::core::apdu::commands;
use crate::core::status::{describe_status_word, SwOutcome};
use crate::core::tlv::{extract_fields, EmvSessionFields};
use crate::core::transport::Transceiver;

/// Bounds of the record search space
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub max_files: u8,
    pub max_records: u8,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_records: 10,
        }
    }
}

/// What to do after one record exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStep {
    Continue,
    NextFile,
    StopAll,
}

fn next_step(fields: &EmvSessionFields, outcome: SwOutcome) -> ScanStep {
    if fields.is_complete() {
        ScanStep::StopAll
    } else if outcome == SwOutcome::RecordNotFound {
        // a missing record number means this file is exhausted,
        // not that later files are invalid
        ScanStep::NextFile
    } else {
        ScanStep::Continue
    }
}

/// Scan the selected application's records, filling `fields` as tags are
/// found. Exhausting the search space with fields still missing is a
/// normal outcome; the caller reports whatever subset was found.
pub fn scan_records<T: Transceiver + ?Sized>(
    transceiver: &mut T,
    config: &ScanConfig,
    fields: &mut EmvSessionFields,
) {
    match transceiver.transmit(&commands::get_processing_options()) {
        Ok(response) if response.has_data() => {
            log::debug!("GPO returned {} bytes", response.data.len());
        }
        Ok(response) => {
            log::warn!(
                "GPO returned no data, status: {}",
                describe_status_word(response.sw1, response.sw2)
            );
            return;
        }
        Err(e) => {
            log::warn!("GPO exchange failed: {e}");
            return;
        }
    }

    'files: for sfi in 1..=config.max_files {
        for record in 1..=config.max_records {
            let command = commands::read_record(record, sfi);
            let response = match transceiver.transmit(&command) {
                Ok(response) => response,
                Err(e) => {
                    // a transport failure aborts only this record
                    log::warn!("READ RECORD {record} of SFI {sfi} failed: {e}");
                    continue;
                }
            };

            if response.has_data() {
                extract_fields(&response.data, fields);
            }

            match next_step(fields, response.outcome()) {
                ScanStep::Continue => {}
                ScanStep::NextFile => continue 'files,
                ScanStep::StopAll => break 'files,
            }
        }
    }

    if !fields.is_complete() {
        log::info!("Record scan exhausted with some fields missing");
    }
}
