//! Buffer-backed NDP messages.
//!
//! An [`NdpMsg`] owns the raw ICMPv6 body, starting at the type octet, plus
//! the addressing metadata of one datagram. Field access goes through
//! per-type views ([`MsgRa`], [`MsgNs`], ...) that decode big-endian values
//! at their RFC 4861 offsets straight from the buffer, so a message never
//! holds a second, parsed representation that could drift from the wire
//! bytes.

use std::{io, net::Ipv6Addr};

use bytepack::{BigEndian, ByteOrder, ToBytestream};
use ndp_types::{
    addr::Ipv6AddrExt,
    msg::NdpMsgType,
    opt::{self, NdpOption, OptionIter, PrefixInformation},
};

/// Upper bound for a message body, fixed header plus options.
pub const NDP_MSG_BUFLEN: usize = 1500;

fn wrong_type() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "mismatched message type")
}

/// One NDP message, inbound or outbound.
#[derive(Debug, Clone)]
pub struct NdpMsg {
    msg_type: NdpMsgType,
    buf: Vec<u8>,
    addrto: Ipv6Addr,
    ifindex: u32,
}

impl NdpMsg {
    /// Creates a fresh message of the given type.
    ///
    /// The body is exactly the fixed header: the type octet is set, code,
    /// checksum and all per-type fields are zero, and no options are
    /// attached. The checksum stays zero for the messages lifetime, raw
    /// ICMPv6 sockets fill it in on send.
    #[must_use]
    pub fn new(msg_type: NdpMsgType) -> NdpMsg {
        let mut buf = vec![0; msg_type.fixed_header_len()];
        buf[0] = msg_type.to_raw_repr();
        NdpMsg {
            msg_type,
            buf,
            addrto: Ipv6Addr::UNSPECIFIED,
            ifindex: 0,
        }
    }

    /// Wraps a received ICMPv6 body.
    ///
    /// Rejects datagrams with unknown type octets, bodies shorter than the
    /// fixed header of their type, and inconsistent option trailers.
    pub(crate) fn from_wire(buf: &[u8], addrto: Ipv6Addr, ifindex: u32) -> io::Result<NdpMsg> {
        let Some(&code) = buf.first() else {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "empty datagram"));
        };
        let msg_type = NdpMsgType::from_raw_repr(code)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "not an NDP message"))?;
        if buf.len() < msg_type.fixed_header_len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "datagram shorter than its fixed header",
            ));
        }
        opt::check_opts(&buf[msg_type.fixed_header_len()..])?;
        Ok(NdpMsg {
            msg_type,
            buf: buf.to_vec(),
            addrto,
            ifindex,
        })
    }

    /// The type of this message.
    #[must_use]
    pub fn msg_type(&self) -> NdpMsgType {
        self.msg_type
    }

    /// The peer address: destination on send, source on receive.
    #[must_use]
    pub fn addrto(&self) -> Ipv6Addr {
        self.addrto
    }

    /// Sets the destination for [`Ndp::sendto`](crate::Ndp::sendto). Left
    /// unspecified, a per-type default destination applies.
    pub fn set_addrto(&mut self, addrto: Ipv6Addr) {
        self.addrto = addrto;
    }

    /// The interface index: arriving interface on receive, outgoing
    /// interface on send (0 lets the kernel route).
    #[must_use]
    pub fn ifindex(&self) -> u32 {
        self.ifindex
    }

    /// Sets the outgoing interface index.
    pub fn set_ifindex(&mut self, ifindex: u32) {
        self.ifindex = ifindex;
    }

    /// The full ICMPv6 body, starting at the type octet.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable access to the body, for callers that pack option bytes by
    /// hand. The fixed header octets are part of the slice.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// The length of the body in bytes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.buf.len()
    }

    /// Grows or shrinks the body, zero-filling new bytes.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `len` would cut into the fixed header or exceed
    /// [`NDP_MSG_BUFLEN`].
    pub fn set_payload_len(&mut self, len: usize) -> io::Result<()> {
        if len < self.msg_type.fixed_header_len() || len > NDP_MSG_BUFLEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "payload length out of bounds",
            ));
        }
        self.buf.resize(len, 0);
        Ok(())
    }

    /// The option trailer after the fixed header.
    #[must_use]
    pub fn payload_opts(&self) -> &[u8] {
        &self.buf[self.msg_type.fixed_header_len()..]
    }

    /// The length of the option trailer in bytes.
    #[must_use]
    pub fn payload_opts_len(&self) -> usize {
        self.payload_opts().len()
    }

    /// Walks the option trailer.
    #[must_use]
    pub fn options(&self) -> OptionIter<'_> {
        OptionIter::new(self.payload_opts())
    }

    /// Appends an option TLV to the body.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if the option does not fit into [`NDP_MSG_BUFLEN`]
    /// or cannot be expressed as a TLV.
    pub fn add_option(&mut self, option: &NdpOption) -> io::Result<()> {
        let tlv = option.to_vec()?;
        if self.buf.len() + tlv.len() > NDP_MSG_BUFLEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "message buffer limit exceeded",
            ));
        }
        self.buf.extend_from_slice(&tlv);
        Ok(())
    }

    /// The destination `sendto` will use: the explicit `addrto` if set,
    /// otherwise the RFC default group of the message type.
    pub(crate) fn send_dest(&self) -> io::Result<Ipv6Addr> {
        if !self.addrto.is_unspecified() {
            return Ok(self.addrto);
        }
        match self.msg_type {
            NdpMsgType::RouterSolicitation => Ok(Ipv6Addr::MULTICAST_ALL_ROUTERS),
            NdpMsgType::RouterAdvertisement | NdpMsgType::NeighborAdvertisement => {
                Ok(Ipv6Addr::MULTICAST_ALL_NODES)
            }
            NdpMsgType::NeighborSolicitation => {
                let target = self.ns().map(|ns| ns.target())?;
                Ok(Ipv6Addr::solicited_node_multicast(target))
            }
            NdpMsgType::Redirect => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "redirect messages need an explicit destination",
            )),
        }
    }

    /// A router solicitation view. Fails with `InvalidInput` for other
    /// message types, as do all sibling accessors.
    pub fn rs(&self) -> io::Result<MsgRs<'_>> {
        if self.msg_type == NdpMsgType::RouterSolicitation {
            Ok(MsgRs { buf: &self.buf })
        } else {
            Err(wrong_type())
        }
    }

    /// A router advertisement view.
    pub fn ra(&self) -> io::Result<MsgRa<'_>> {
        if self.msg_type == NdpMsgType::RouterAdvertisement {
            Ok(MsgRa { buf: &self.buf })
        } else {
            Err(wrong_type())
        }
    }

    /// A mutable router advertisement view.
    pub fn ra_mut(&mut self) -> io::Result<MsgRaMut<'_>> {
        if self.msg_type == NdpMsgType::RouterAdvertisement {
            Ok(MsgRaMut { buf: &mut self.buf })
        } else {
            Err(wrong_type())
        }
    }

    /// A neighbor solicitation view.
    pub fn ns(&self) -> io::Result<MsgNs<'_>> {
        if self.msg_type == NdpMsgType::NeighborSolicitation {
            Ok(MsgNs { buf: &self.buf })
        } else {
            Err(wrong_type())
        }
    }

    /// A mutable neighbor solicitation view.
    pub fn ns_mut(&mut self) -> io::Result<MsgNsMut<'_>> {
        if self.msg_type == NdpMsgType::NeighborSolicitation {
            Ok(MsgNsMut { buf: &mut self.buf })
        } else {
            Err(wrong_type())
        }
    }

    /// A neighbor advertisement view.
    pub fn na(&self) -> io::Result<MsgNa<'_>> {
        if self.msg_type == NdpMsgType::NeighborAdvertisement {
            Ok(MsgNa { buf: &self.buf })
        } else {
            Err(wrong_type())
        }
    }

    /// A mutable neighbor advertisement view.
    pub fn na_mut(&mut self) -> io::Result<MsgNaMut<'_>> {
        if self.msg_type == NdpMsgType::NeighborAdvertisement {
            Ok(MsgNaMut { buf: &mut self.buf })
        } else {
            Err(wrong_type())
        }
    }

    /// A redirect view.
    pub fn redirect(&self) -> io::Result<MsgRedirect<'_>> {
        if self.msg_type == NdpMsgType::Redirect {
            Ok(MsgRedirect { buf: &self.buf })
        } else {
            Err(wrong_type())
        }
    }

    /// A mutable redirect view.
    pub fn redirect_mut(&mut self) -> io::Result<MsgRedirectMut<'_>> {
        if self.msg_type == NdpMsgType::Redirect {
            Ok(MsgRedirectMut { buf: &mut self.buf })
        } else {
            Err(wrong_type())
        }
    }
}

fn read_addr(buf: &[u8], offset: usize) -> Ipv6Addr {
    let mut octets = [0; 16];
    octets.copy_from_slice(&buf[offset..offset + 16]);
    Ipv6Addr::from(octets)
}

fn set_flag(byte: &mut u8, mask: u8, value: bool) {
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

macro_rules! impl_opt_accessors {
    ($view:ident, $fixed:literal, [$($accessor:ident),*]) => {
        impl<'a> $view<'a> {
            /// Walks the option trailer of the message.
            #[must_use]
            pub fn options(&self) -> OptionIter<'a> {
                OptionIter::new(&self.buf[$fixed..])
            }
        }
        $(impl_opt_accessors!(@ $accessor $view);)*
    };
    (@ source_linkaddr $view:ident) => {
        impl<'a> $view<'a> {
            /// The payload of the first source link-layer address option,
            /// if any. The borrow is tied to the message, not to this view.
            #[must_use]
            pub fn opt_source_linkaddr(&self) -> Option<&'a [u8]> {
                self.options()
                    .find(|o| o.opt_type() == opt::NDP_OPT_SOURCE_LINKADDR)
                    .map(|o| o.payload())
            }
        }
    };
    (@ target_linkaddr $view:ident) => {
        impl<'a> $view<'a> {
            /// The payload of the first target link-layer address option,
            /// if any.
            #[must_use]
            pub fn opt_target_linkaddr(&self) -> Option<&'a [u8]> {
                self.options()
                    .find(|o| o.opt_type() == opt::NDP_OPT_TARGET_LINKADDR)
                    .map(|o| o.payload())
            }
        }
    };
    (@ prefix $view:ident) => {
        impl<'a> $view<'a> {
            /// The first well-sized prefix information option, if any.
            #[must_use]
            pub fn opt_prefix(&self) -> Option<PrefixInformation> {
                self.options().find_map(|o| o.as_prefix_information())
            }
        }
    };
    (@ mtu $view:ident) => {
        impl<'a> $view<'a> {
            /// The value of the first well-sized MTU option, if any.
            #[must_use]
            pub fn opt_mtu(&self) -> Option<u32> {
                self.options().find_map(|o| o.as_mtu())
            }
        }
    };
}

/// Read view of a router solicitation.
#[derive(Debug, Clone, Copy)]
pub struct MsgRs<'a> {
    buf: &'a [u8],
}

impl_opt_accessors!(MsgRs, 8, [source_linkaddr]);

/// Read view of a router advertisement.
#[derive(Debug, Clone, Copy)]
pub struct MsgRa<'a> {
    buf: &'a [u8],
}

impl_opt_accessors!(MsgRa, 16, [source_linkaddr, target_linkaddr, prefix, mtu]);

impl MsgRa<'_> {
    /// The hop limit the router proposes, 0 for unspecified.
    #[must_use]
    pub fn current_hop_limit(&self) -> u8 {
        self.buf[4]
    }

    /// The M flag: addresses are managed through DHCPv6.
    #[must_use]
    pub fn managed(&self) -> bool {
        self.buf[5] & 0b1000_0000 != 0
    }

    /// The O flag: non-address configuration is available via DHCPv6.
    #[must_use]
    pub fn other_configuration(&self) -> bool {
        self.buf[5] & 0b0100_0000 != 0
    }

    /// The H flag: the sender is a Mobile IPv6 home agent.
    #[must_use]
    pub fn home_agent(&self) -> bool {
        self.buf[5] & 0b0010_0000 != 0
    }

    /// Lifetime of the default route through this router, in seconds.
    /// 0 means the router is no default router.
    #[must_use]
    pub fn router_lifetime(&self) -> u16 {
        BigEndian::read_u16(&self.buf[6..8])
    }

    /// Reachability guarantee after a confirmation, in milliseconds.
    #[must_use]
    pub fn reachable_time(&self) -> u32 {
        BigEndian::read_u32(&self.buf[8..12])
    }

    /// Retransmission interval for solicitations, in milliseconds.
    #[must_use]
    pub fn retransmit_time(&self) -> u32 {
        BigEndian::read_u32(&self.buf[12..16])
    }
}

/// Write view of a router advertisement.
#[derive(Debug)]
pub struct MsgRaMut<'a> {
    buf: &'a mut Vec<u8>,
}

impl MsgRaMut<'_> {
    pub fn set_current_hop_limit(&mut self, hop_limit: u8) {
        self.buf[4] = hop_limit;
    }

    pub fn set_managed(&mut self, managed: bool) {
        set_flag(&mut self.buf[5], 0b1000_0000, managed);
    }

    pub fn set_other_configuration(&mut self, other: bool) {
        set_flag(&mut self.buf[5], 0b0100_0000, other);
    }

    pub fn set_home_agent(&mut self, home_agent: bool) {
        set_flag(&mut self.buf[5], 0b0010_0000, home_agent);
    }

    pub fn set_router_lifetime(&mut self, seconds: u16) {
        BigEndian::write_u16(&mut self.buf[6..8], seconds);
    }

    pub fn set_reachable_time(&mut self, millis: u32) {
        BigEndian::write_u32(&mut self.buf[8..12], millis);
    }

    pub fn set_retransmit_time(&mut self, millis: u32) {
        BigEndian::write_u32(&mut self.buf[12..16], millis);
    }
}

/// Read view of a neighbor solicitation.
#[derive(Debug, Clone, Copy)]
pub struct MsgNs<'a> {
    buf: &'a [u8],
}

impl_opt_accessors!(MsgNs, 24, [source_linkaddr]);

impl MsgNs<'_> {
    /// The address whose link-layer address is solicited.
    #[must_use]
    pub fn target(&self) -> Ipv6Addr {
        read_addr(self.buf, 8)
    }
}

/// Write view of a neighbor solicitation.
#[derive(Debug)]
pub struct MsgNsMut<'a> {
    buf: &'a mut Vec<u8>,
}

impl MsgNsMut<'_> {
    pub fn set_target(&mut self, target: Ipv6Addr) {
        self.buf[8..24].copy_from_slice(&target.octets());
    }
}

/// Read view of a neighbor advertisement.
#[derive(Debug, Clone, Copy)]
pub struct MsgNa<'a> {
    buf: &'a [u8],
}

impl_opt_accessors!(MsgNa, 24, [target_linkaddr]);

impl MsgNa<'_> {
    /// The R flag: the sender is a router.
    #[must_use]
    pub fn router(&self) -> bool {
        self.buf[4] & 0b1000_0000 != 0
    }

    /// The S flag: sent in response to a solicitation.
    #[must_use]
    pub fn solicited(&self) -> bool {
        self.buf[4] & 0b0100_0000 != 0
    }

    /// The O flag: the advertisement should override cached entries.
    #[must_use]
    pub fn override_flag(&self) -> bool {
        self.buf[4] & 0b0010_0000 != 0
    }

    /// The address the advertisement speaks for.
    #[must_use]
    pub fn target(&self) -> Ipv6Addr {
        read_addr(self.buf, 8)
    }
}

/// Write view of a neighbor advertisement.
#[derive(Debug)]
pub struct MsgNaMut<'a> {
    buf: &'a mut Vec<u8>,
}

impl MsgNaMut<'_> {
    pub fn set_router(&mut self, router: bool) {
        set_flag(&mut self.buf[4], 0b1000_0000, router);
    }

    pub fn set_solicited(&mut self, solicited: bool) {
        set_flag(&mut self.buf[4], 0b0100_0000, solicited);
    }

    pub fn set_override_flag(&mut self, override_flag: bool) {
        set_flag(&mut self.buf[4], 0b0010_0000, override_flag);
    }

    pub fn set_target(&mut self, target: Ipv6Addr) {
        self.buf[8..24].copy_from_slice(&target.octets());
    }
}

/// Read view of a redirect.
#[derive(Debug, Clone, Copy)]
pub struct MsgRedirect<'a> {
    buf: &'a [u8],
}

impl_opt_accessors!(MsgRedirect, 40, [target_linkaddr]);

impl MsgRedirect<'_> {
    /// The better first hop for the redirected destination.
    #[must_use]
    pub fn target(&self) -> Ipv6Addr {
        read_addr(self.buf, 8)
    }

    /// The destination the redirect applies to.
    #[must_use]
    pub fn destination(&self) -> Ipv6Addr {
        read_addr(self.buf, 24)
    }
}

/// Write view of a redirect.
#[derive(Debug)]
pub struct MsgRedirectMut<'a> {
    buf: &'a mut Vec<u8>,
}

impl MsgRedirectMut<'_> {
    pub fn set_target(&mut self, target: Ipv6Addr) {
        self.buf[8..24].copy_from_slice(&target.octets());
    }

    pub fn set_destination(&mut self, destination: Ipv6Addr) {
        self.buf[24..40].copy_from_slice(&destination.octets());
    }
}
