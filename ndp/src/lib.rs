//! IPv6 Neighbor Discovery Protocol message handling (RFC 4861).
//!
//! The crate opens a raw ICMPv6 endpoint joined to the all-nodes group,
//! receives the five NDP message types (router solicitation/advertisement,
//! neighbor solicitation/advertisement, redirect), parses their fixed
//! headers and option trailers, and delivers them to registered handlers
//! filtered by message type and arriving interface. The same message
//! representation assembles outbound frames.
//!
//! The library owns no event loop. [`Ndp::event_sources`] enumerates the
//! descriptors to poll; when one signals readable, [`Ndp::service`] runs a
//! single receive-and-dispatch cycle:
//!
//! ```no_run
//! use std::rc::Rc;
//! use ndp::Ndp;
//!
//! # fn main() -> std::io::Result<()> {
//! let ndp = Ndp::open()?;
//! ndp.register_handler(
//!     Rc::new(|_, msg| {
//!         println!("{:?} from {}", msg.msg_type(), msg.addrto());
//!         0
//!     }),
//!     None, // every message type
//!     0,    // every interface
//! );
//!
//! let source = ndp.event_sources().next().unwrap();
//! loop {
//!     // wait for source.fd() to become readable, then:
//!     ndp.service(&source)?;
//! }
//! # }
//! ```
//!
//! Everything is stateless with respect to the protocol: no neighbor
//! caches, no timers, no address configuration. Parsing tolerates
//! malformed input by dropping the datagram (logged through the injected
//! sink, see [`Ndp::set_log_sink`]), never by failing the caller.

#[macro_use]
mod macros;

mod ctx;
mod log;
mod msg;
mod sock;

pub use ndp_types as types;

pub use crate::ctx::{EventSource, MsgRcvHandler, Ndp};
pub use crate::log::{tracing_sink, LogPriority, LogSink};
pub use crate::msg::{
    MsgNa, MsgNaMut, MsgNs, MsgNsMut, MsgRa, MsgRaMut, MsgRedirect, MsgRedirectMut, MsgRs, NdpMsg,
    NDP_MSG_BUFLEN,
};
