use crate::core::apdu::commands;
use crate::core::status::{describe_status_word, SwOutcome};
use crate::core::transport::Transceiver;
use crate::core::utils::format_hex_spaced;

/// One entry in the ordered table of applications to try
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateAid {
    pub scheme: &'static str,
    pub aid: &'static [u8],
}

/// Known payment application identifiers, in trial priority order
pub const KNOWN_AIDS: &[CandidateAid] = &[
    CandidateAid {
        scheme: "Visa",
        aid: &[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10],
    },
    CandidateAid {
        scheme: "MasterCard",
        aid: &[0xA0, 0x00, 0x00, 0x00, 0x04, 0x10, 0x10],
    },
    CandidateAid {
        scheme: "American Express",
        aid: &[0xA0, 0x00, 0x00, 0x00, 0x25, 0x01],
    },
    CandidateAid {
        scheme: "Discover",
        aid: &[0xA0, 0x00, 0x00, 0x00, 0x65, 0x10, 0x10],
    },
    CandidateAid {
        scheme: "JCB",
        aid: &[0xA0, 0x00, 0x00, 0x00, 0x30, 0x60, 0x00],
    },
];

/// Try each candidate AID in order and return the first one the card
/// selects successfully.
///
/// A refused SELECT or a transport error on one candidate only skips that
/// candidate. Returns None when the table is exhausted; the caller treats
/// that as "no EMV application usable", not as a failure.
pub fn select_application<'a, T: Transceiver + ?Sized>(
    transceiver: &mut T,
    candidates: &'a [CandidateAid],
) -> Option<&'a CandidateAid> {
    for candidate in candidates {
        let command = commands::select(candidate.aid);
        match transceiver.transmit(&command) {
            Ok(response) => match response.outcome() {
                SwOutcome::Success => {
                    log::info!(
                        "Selected {} application, AID {}",
                        candidate.scheme,
                        format_hex_spaced(candidate.aid)
                    );
                    return Some(candidate);
                }
                SwOutcome::RecordNotFound | SwOutcome::OtherFailure { .. } => {
                    log::debug!(
                        "Card refused {} AID: {}",
                        candidate.scheme,
                        describe_status_word(response.sw1, response.sw2)
                    );
                }
            },
            Err(e) => {
                log::warn!("Transport error selecting {} AID: {e}", candidate.scheme);
            }
        }
    }

    log::info!(
        "No application selected after {} candidates",
        candidates.len()
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::apdu::{ApduCommand, ApduResponse};
    use crate::core::error::TransportError;
    use crate::core::transport::MockTransceiver;
    use mockall::Sequence;

    fn response(data: Vec<u8>, sw1: u8, sw2: u8) -> ApduResponse {
        ApduResponse { data, sw1, sw2 }
    }

    #[test]
    fn test_known_aid_priority_order() {
        let order: Vec<&str> = KNOWN_AIDS.iter().map(|c| c.scheme).collect();
        assert_eq!(
            order,
            vec!["Visa", "MasterCard", "American Express", "Discover", "JCB"]
        );
        for candidate in KNOWN_AIDS {
            assert!((5..=8).contains(&candidate.aid.len()));
        }
    }

    #[test]
    fn test_first_success_wins_and_stops() {
        let mut mock = MockTransceiver::new();
        let mut seq = Sequence::new();

        // Visa refused, MasterCard selected, nothing after that
        mock.expect_transmit()
            .withf(|c: &ApduCommand| c.data == KNOWN_AIDS[0].aid)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(vec![], 0x6A, 0x82)));
        mock.expect_transmit()
            .withf(|c: &ApduCommand| c.data == KNOWN_AIDS[1].aid)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(vec![0x6F, 0x00], 0x90, 0x00)));

        let selected = select_application(&mut mock, KNOWN_AIDS);
        assert_eq!(selected.unwrap().scheme, "MasterCard");
    }

    #[test]
    fn test_transport_error_does_not_abort_search() {
        let mut mock = MockTransceiver::new();
        let mut seq = Sequence::new();

        mock.expect_transmit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(TransportError::ShortResponse(0)));
        mock.expect_transmit()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(vec![], 0x90, 0x00)));

        let selected = select_application(&mut mock, &KNOWN_AIDS[..2]);
        assert_eq!(selected.unwrap().scheme, "MasterCard");
    }

    #[test]
    fn test_exhausted_candidates_returns_none() {
        let mut mock = MockTransceiver::new();
        mock.expect_transmit()
            .times(KNOWN_AIDS.len())
            .returning(|_| Ok(response(vec![], 0x6A, 0x82)));

        assert!(select_application(&mut mock, KNOWN_AIDS).is_none());
    }

    #[test]
    fn test_select_command_shape() {
        let mut mock = MockTransceiver::new();
        mock.expect_transmit()
            .withf(|c: &ApduCommand| {
                c.cla == 0x00 && c.ins == 0xA4 && c.p1 == 0x04 && c.p2 == 0x00 && c.le == Some(0)
            })
            .times(1)
            .returning(|_| Ok(response(vec![], 0x90, 0x00)));

        select_application(&mut mock, &KNOWN_AIDS[..1]);
    }
}
