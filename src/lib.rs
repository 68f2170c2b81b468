//! Cliente ICMP Echo ("ping") sobre sockets RAW.
//!
//! [`Session`] monta e envia Echo Requests, espera pelos Echo Replies
//! correspondentes e acumula as [`Statistics`] de ida e volta.

pub mod checksum;
pub mod error;
pub mod icmp;
pub mod session;
pub mod stats;
pub mod transport;

pub use checksum::internet_checksum;
pub use error::{ParseError, PingError, PingResult};
pub use icmp::Family;
pub use session::{RunOutcome, Sent, Session, SessionConfig};
pub use stats::{RttSummary, Statistics};
pub use transport::{Opener, RawSocket, RawSocketOpener, Transport};
