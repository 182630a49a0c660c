use serde::{Deserialize, Serialize};

/// Card family derived from the ATR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardFamily {
    Unknown,
    JavaCardOrGlobalPlatform,
    ProximityMifareLike,
    EmvPayment,
}

impl CardFamily {
    /// Short human-readable label for display
    pub fn label(&self) -> &'static str {
        match self {
            CardFamily::Unknown => "Unknown card type",
            CardFamily::JavaCardOrGlobalPlatform => "JavaCard or GlobalPlatform card",
            CardFamily::ProximityMifareLike => "MIFARE proximity card",
            CardFamily::EmvPayment => "EMV (bank) chip card",
        }
    }
}

/// Result of classifying an ATR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub family: CardFamily,
    pub issuer_hint: Option<String>,
}

/// Known manufacturer signatures found at ATR bytes 10..13.
///
/// Extension point: add entries here as more vendors are identified.
const ISSUER_SIGNATURES: &[(&[u8; 3], &str)] = &[
    (&[0x41, 0x53, 0x4C], "Athena Smart Card Solutions"),
];

/// Classify an ATR into a card family with an optional issuer hint.
///
/// Inspects byte 0 (initial character, must be 0x3B for the families we
/// recognize) and byte 1, with length guards so that short ATRs degrade
/// to `Unknown` instead of faulting.
pub fn classify_atr(atr: &[u8]) -> Classification {
    if atr.len() < 2 || atr[0] != 0x3B {
        return Classification {
            family: CardFamily::Unknown,
            issuer_hint: None,
        };
    }

    let family = match atr[1] {
        0x6E => CardFamily::JavaCardOrGlobalPlatform,
        0x67 => CardFamily::ProximityMifareLike,
        0xF8 if atr.len() >= 10 && atr[8] == 0xFE => CardFamily::EmvPayment,
        _ => CardFamily::Unknown,
    };

    let issuer_hint = if family == CardFamily::EmvPayment {
        issuer_hint(atr)
    } else {
        None
    };

    Classification { family, issuer_hint }
}

/// Match ATR bytes 10..13 against the signature table.
/// Returns None when the ATR is too short to carry a signature.
fn issuer_hint(atr: &[u8]) -> Option<String> {
    let window = atr.get(10..13)?;
    ISSUER_SIGNATURES
        .iter()
        .find(|(signature, _)| window == &signature[..])
        .map(|(_, name)| (*name).to_string())
}
