#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions
)]
//! Wire-level types for the IPv6 Neighbor Discovery Protocol (RFC 4861).
//!
//! This crate carries no I/O: message-type codes, fixed-header layout
//! knowledge, the option TLV model and a few IPv6 address helpers. The
//! `ndp` crate builds the socket layer and the dispatch machinery on top.

pub mod addr;
pub mod msg;
pub mod opt;
