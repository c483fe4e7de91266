pub mod events;
pub mod messages;
pub mod protocol;

pub use events::{parse_event, PurchaseResult, ServerEvent};
pub use messages::ClientMessage;
pub use protocol::{decode_message, encode_message, DecodeError, DecodedMessage};
