use crate::core::status::{interpret_status, SwOutcome};

/// An ISO 7816 command APDU, built fresh per exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
    pub le: Option<u8>,
}

impl ApduCommand {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Serialize to wire bytes: header, then Lc + data if present, then Le
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];

        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }

        if let Some(le) = self.le {
            apdu.push(le);
        }

        apdu
    }
}

/// A response APDU split into payload and status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    pub data: Vec<u8>,
    pub sw1: u8,
    pub sw2: u8,
}

impl ApduResponse {
    /// Split a raw transmit buffer into payload and trailing status word.
    /// Returns None when the buffer is too short to carry a status word.
    pub fn from_raw(raw: &[u8]) -> Option<Self> {
        if raw.len() < 2 {
            return None;
        }
        Some(Self {
            data: raw[..raw.len() - 2].to_vec(),
            sw1: raw[raw.len() - 2],
            sw2: raw[raw.len() - 1],
        })
    }

    pub fn has_data(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn outcome(&self) -> SwOutcome {
        interpret_status(self.sw1, self.sw2)
    }
}

/// Constructors for the EMV commands the probe issues
pub mod commands {
    use super::ApduCommand;

    /// SELECT by name (DF name = AID), requesting all available data
    pub fn select(aid: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x04, 0x00)
            .data(aid.to_vec())
            .le(0x00)
    }

    /// GET PROCESSING OPTIONS with an empty PDOL
    pub fn get_processing_options() -> ApduCommand {
        ApduCommand::new(0x80, 0xA8, 0x00, 0x00)
            .data(vec![0x83, 0x00])
            .le(0x00)
    }

    /// READ RECORD by record number within the file named by its SFI.
    /// P2 encodes "read by record number, SFI in bits 8-4": (sfi << 3) | 0x04.
    pub fn read_record(record_number: u8, sfi: u8) -> ApduCommand {
        let p2 = (sfi << 3) | 0x04;
        ApduCommand::new(0x00, 0xB2, record_number, p2).le(0x00)
    }
}
