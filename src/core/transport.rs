use pcsc::{Card, Context, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE};
use serde::{Deserialize, Serialize};
use std::ffi::CString;

use crate::core::apdu::{ApduCommand, ApduResponse};
use crate::core::error::TransportError;
use crate::core::utils::format_hex_spaced;

#[cfg(test)]
use mockall::automock;

/// Command/response exchange with a card
#[cfg_attr(test, automock)]
pub trait Transceiver {
    fn transmit(&mut self, command: &ApduCommand) -> Result<ApduResponse, TransportError>;
}

/// An open connection to one card: exchanges plus ATR access
pub trait CardSession: Transceiver {
    fn atr(&self) -> Result<Vec<u8>, TransportError>;
}

/// Opens sessions to cards by reader name
pub trait Connector {
    type Session: CardSession;

    fn connect(&self, reader_name: &str) -> Result<Self::Session, TransportError>;
}

/// Information about a PCSC reader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderInfo {
    pub name: String,
    pub card_present: bool,
    pub atr: Option<Vec<u8>>,
}

/// PC/SC-backed connector
pub struct PcscConnector {
    context: Context,
}

impl PcscConnector {
    /// Establish a PC/SC context
    pub fn new() -> Result<Self, TransportError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List all available readers with their card status
    pub fn list_readers(&self) -> Result<Vec<ReaderInfo>, TransportError> {
        let mut readers_buf = vec![0; 2048];
        let readers = self.context.list_readers(&mut readers_buf)?;

        let mut reader_infos = Vec::new();

        for reader_name in readers {
            let reader_name_str = reader_name.to_string_lossy().to_string();

            // Probing the status may fail while a card is mid-insertion;
            // report the reader as empty in that case
            let (card_present, atr) = self
                .reader_status(&reader_name_str)
                .unwrap_or((false, None));

            reader_infos.push(ReaderInfo {
                name: reader_name_str,
                card_present,
                atr,
            });
        }

        Ok(reader_infos)
    }

    fn reader_status(&self, reader_name: &str) -> Result<(bool, Option<Vec<u8>>), TransportError> {
        let reader_cstr = to_cstring(reader_name)?;

        match self
            .context
            .connect(&reader_cstr, ShareMode::Shared, Protocols::ANY)
        {
            Ok(card) => match card.status2_owned() {
                Ok(status) => Ok((true, Some(status.atr().to_vec()))),
                Err(_) => Ok((true, None)),
            },
            Err(pcsc::Error::NoSmartcard) => Ok((false, None)),
            Err(_) => Ok((false, None)),
        }
    }
}

impl Connector for PcscConnector {
    type Session = PcscSession;

    fn connect(&self, reader_name: &str) -> Result<PcscSession, TransportError> {
        log::info!("Connecting to reader: {reader_name}");

        let reader_cstr = to_cstring(reader_name)?;
        let card = self
            .context
            .connect(&reader_cstr, ShareMode::Shared, Protocols::ANY)?;

        Ok(PcscSession { card })
    }
}

/// One connected card behind a PC/SC handle
pub struct PcscSession {
    card: Card,
}

impl Transceiver for PcscSession {
    fn transmit(&mut self, command: &ApduCommand) -> Result<ApduResponse, TransportError> {
        let apdu = command.to_bytes();
        log::debug!("Transmitting APDU: {}", format_hex_spaced(&apdu));

        let mut response_buf = [0; MAX_BUFFER_SIZE];
        let raw = self.card.transmit(&apdu, &mut response_buf)?;

        log::debug!("Received response: {}", format_hex_spaced(raw));

        ApduResponse::from_raw(raw).ok_or(TransportError::ShortResponse(raw.len()))
    }
}

impl CardSession for PcscSession {
    fn atr(&self) -> Result<Vec<u8>, TransportError> {
        let status = self.card.status2_owned()?;
        Ok(status.atr().to_vec())
    }
}

fn to_cstring(reader_name: &str) -> Result<CString, TransportError> {
    CString::new(reader_name)
        .map_err(|_| TransportError::InvalidReaderName(reader_name.to_string()))
}
