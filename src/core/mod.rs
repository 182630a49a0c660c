pub mod apdu;
pub mod atr;
pub mod error;
pub mod scan;
pub mod select;
pub mod session;
pub mod status;
pub mod tlv;
pub mod transport;
pub mod utils;
