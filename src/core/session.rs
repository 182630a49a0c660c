//! Presence-driven session control.
//!
//! The controller keeps one presence flag per reader name and reacts to
//! absent-to-present transitions by connecting, classifying the ATR and,
//! for EMV cards, running application selection and the record scan. All
//! failures along the way are logged and swallowed; a bad card never takes
//! down the monitor loop or another reader's state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::atr::{classify_atr, CardFamily, Classification};
use crate::core::scan::{scan_records, ScanConfig};
use crate::core::select::{select_application, CandidateAid, KNOWN_AIDS};
use crate::core::tlv::EmvSessionFields;
use crate::core::transport::{CardSession, Connector};
use crate::core::utils::format_hex_spaced;

/// One reader presence change delivered by the event source
#[derive(Debug, Clone)]
pub struct ReaderEvent {
    pub reader_name: String,
    pub present: bool,
}

/// Everything learned from one card insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardReport {
    pub timestamp: DateTime<Utc>,
    pub reader: String,
    pub atr: String,
    pub family: CardFamily,
    pub issuer_hint: Option<String>,
    pub selected_application: Option<String>,
    pub pan: Option<String>,
    pub expiry: Option<String>,
    pub cardholder_name: Option<String>,
}

enum Transition {
    Inserted,
    Removed,
    Unchanged,
}

/// Ties presence events to classification and the EMV pipeline
pub struct SessionController<C: Connector> {
    connector: C,
    candidates: &'static [CandidateAid],
    scan_config: ScanConfig,
    presence: Mutex<HashMap<String, bool>>,
}

impl<C: Connector> SessionController<C> {
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, ScanConfig::default())
    }

    pub fn with_config(connector: C, scan_config: ScanConfig) -> Self {
        Self {
            connector,
            candidates: KNOWN_AIDS,
            scan_config,
            presence: Mutex::new(HashMap::new()),
        }
    }

    /// Feed one presence event. Returns a report when the event was an
    /// insertion and the card could be probed, None otherwise.
    ///
    /// Safe to call from multiple event-source threads: the presence map
    /// is only touched under its lock, and the lock is released before
    /// any card exchange starts.
    pub fn handle_event(&self, event: &ReaderEvent) -> Option<CardReport> {
        let transition = {
            let mut presence = self.presence.lock().unwrap();
            let was_present = presence
                .insert(event.reader_name.clone(), event.present)
                .unwrap_or(false);
            match (was_present, event.present) {
                (false, true) => Transition::Inserted,
                (true, false) => Transition::Removed,
                _ => Transition::Unchanged,
            }
        };

        match transition {
            Transition::Inserted => {
                log::info!("Card inserted into {}", event.reader_name);
                self.probe(&event.reader_name)
            }
            Transition::Removed => {
                log::info!("Card removed from {}", event.reader_name);
                None
            }
            Transition::Unchanged => None,
        }
    }

    /// Run the full pipeline against a card that is already present
    pub fn probe(&self, reader_name: &str) -> Option<CardReport> {
        let mut session = match self.connector.connect(reader_name) {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Failed to connect to {reader_name}: {e}");
                return None;
            }
        };

        let atr = match session.atr() {
            Ok(atr) => atr,
            Err(e) => {
                log::warn!("Failed to read ATR from {reader_name}: {e}");
                return None;
            }
        };
        log::info!("Card ATR: {}", format_hex_spaced(&atr));

        let classification = classify_atr(&atr);
        log::info!("{}", classification.family.label());

        let mut fields = EmvSessionFields::new();
        let mut selected = None;

        if classification.family == CardFamily::EmvPayment {
            if let Some(candidate) = select_application(&mut session, self.candidates) {
                selected = Some(candidate.scheme.to_string());
                scan_records(&mut session, &self.scan_config, &mut fields);
            }
        }

        Some(build_report(
            reader_name,
            &atr,
            classification,
            selected,
            &fields,
        ))
    }
}

fn build_report(
    reader_name: &str,
    atr: &[u8],
    classification: Classification,
    selected_application: Option<String>,
    fields: &EmvSessionFields,
) -> CardReport {
    CardReport {
        timestamp: Utc::now(),
        reader: reader_name.to_string(),
        atr: format_hex_spaced(atr),
        family: classification.family,
        issuer_hint: classification.issuer_hint,
        selected_application,
        pan: fields.pan_hex(),
        expiry: fields.expiry_yymm(),
        cardholder_name: fields.holder_name_text(),
    }
}
