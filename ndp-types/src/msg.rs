use bytepack::raw_enum;

/// IPv6 next-header value of ICMPv6.
pub const PROTO_ICMPV6: u8 = 58;

raw_enum! {
    /// The five message types of the Neighbor Discovery Protocol.
    ///
    /// Discriminants are the ICMPv6 type codes of RFC 4861.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum NdpMsgType {
        type Repr = u8 where BigEndian;
        /// A message send by hosts to prompt routers into advertising.
        RouterSolicitation = 133,
        /// A message send by routers to advertise their capabilities.
        RouterAdvertisement = 134,
        /// A request for the link-layer address of a neighbor.
        NeighborSolicitation = 135,
        /// The response to a solicitation, or an unprovoked update.
        NeighborAdvertisement = 136,
        /// A hint that a better first hop exists for a destination.
        Redirect = 137,
    }
}

impl NdpMsgType {
    /// The length of the fixed header of this message type, in bytes,
    /// counted from the ICMPv6 type octet. Options follow immediately
    /// after.
    #[must_use]
    pub fn fixed_header_len(self) -> usize {
        match self {
            Self::RouterSolicitation => 8,
            Self::RouterAdvertisement => 16,
            Self::NeighborSolicitation | Self::NeighborAdvertisement => 24,
            Self::Redirect => 40,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_match_rfc4861() {
        assert_eq!(NdpMsgType::RouterSolicitation.to_raw_repr(), 133);
        assert_eq!(NdpMsgType::RouterAdvertisement.to_raw_repr(), 134);
        assert_eq!(NdpMsgType::NeighborSolicitation.to_raw_repr(), 135);
        assert_eq!(NdpMsgType::NeighborAdvertisement.to_raw_repr(), 136);
        assert_eq!(NdpMsgType::Redirect.to_raw_repr(), 137);

        assert_eq!(
            NdpMsgType::from_raw_repr(134).unwrap(),
            NdpMsgType::RouterAdvertisement
        );
        assert!(NdpMsgType::from_raw_repr(128).is_err());
    }

    #[test]
    fn fixed_header_lens() {
        assert_eq!(NdpMsgType::RouterSolicitation.fixed_header_len(), 8);
        assert_eq!(NdpMsgType::RouterAdvertisement.fixed_header_len(), 16);
        assert_eq!(NdpMsgType::NeighborSolicitation.fixed_header_len(), 24);
        assert_eq!(NdpMsgType::NeighborAdvertisement.fixed_header_len(), 24);
        assert_eq!(NdpMsgType::Redirect.fixed_header_len(), 40);
    }
}
