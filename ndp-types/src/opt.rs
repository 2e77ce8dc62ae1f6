//! The option trailer of NDP messages.
//!
//! Options are TLVs whose length octet counts units of 8 bytes, including
//! the two header octets. Inbound trailers are validated once with
//! [`check_opts`]; afterwards [`OptionIter`] walks them infallibly and
//! yields borrowed [`RawOption`] views. Outbound options are built from
//! the owned [`NdpOption`] values.

use std::{
    io::{self, Write},
    net::Ipv6Addr,
};

use bytepack::{
    BigEndian, ByteOrder, FromBytestream, ReadBytesExt, ToBytestream, WriteBytesExt, BE,
};

/// Option type: link-layer address of the sender.
pub const NDP_OPT_SOURCE_LINKADDR: u8 = 1;
/// Option type: link-layer address of the target.
pub const NDP_OPT_TARGET_LINKADDR: u8 = 2;
/// Option type: on-link prefix information, fixed 32-byte TLV.
pub const NDP_OPT_PREFIX_INFORMATION: u8 = 3;
/// Option type: leading bytes of the redirected packet.
pub const NDP_OPT_REDIRECTED_HEADER: u8 = 4;
/// Option type: link MTU, fixed 8-byte TLV.
pub const NDP_OPT_MTU: u8 = 5;

/// Lifetime value denoting "forever" in prefix information options.
pub const NDP_LIFETIME_INFINITE: u32 = u32::MAX;

fn malformed(text: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, text)
}

/// Validates an option trailer.
///
/// A trailer is well formed if it is a seamless concatenation of TLVs:
/// every option declares a non-zero length and ends within the area.
/// Option *contents* are not inspected.
///
/// # Errors
///
/// Returns `InvalidData` naming the violated constraint.
pub fn check_opts(area: &[u8]) -> io::Result<()> {
    let mut rest = area;
    while !rest.is_empty() {
        if rest.len() < 2 {
            return Err(malformed("option header extends past the payload"));
        }
        let len = 8 * usize::from(rest[1]);
        if len == 0 {
            return Err(malformed("option with zero length"));
        }
        if len > rest.len() {
            return Err(malformed("option extends past the payload"));
        }
        rest = &rest[len..];
    }
    Ok(())
}

/// A forward walk over an option trailer.
///
/// The iterator stops at the end of the area, or at the first
/// inconsistent TLV. Run [`check_opts`] beforehand to distinguish the
/// two.
#[derive(Debug, Clone)]
pub struct OptionIter<'a> {
    rest: &'a [u8],
}

impl<'a> OptionIter<'a> {
    /// Creates a walk over `area`.
    #[must_use]
    pub fn new(area: &'a [u8]) -> Self {
        Self { rest: area }
    }
}

impl<'a> Iterator for OptionIter<'a> {
    type Item = RawOption<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.len() < 2 {
            return None;
        }
        let len = 8 * usize::from(self.rest[1]);
        if len == 0 || len > self.rest.len() {
            return None;
        }
        let (tlv, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(RawOption { tlv })
    }
}

/// A borrowed view of one option TLV, header included.
#[derive(Debug, Clone, Copy)]
pub struct RawOption<'a> {
    tlv: &'a [u8],
}

impl<'a> RawOption<'a> {
    /// The option type octet.
    #[must_use]
    pub fn opt_type(&self) -> u8 {
        self.tlv[0]
    }

    /// The total wire length of the TLV in bytes (a multiple of 8).
    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.tlv.len()
    }

    /// The option payload after the two header octets.
    #[must_use]
    pub fn payload(&self) -> &'a [u8] {
        &self.tlv[2..]
    }

    /// The payload interpreted as a link-layer address, for options of
    /// type source/target link-layer address. The caller decides how many
    /// of the bytes are meaningful on its medium.
    #[must_use]
    pub fn as_linkaddr(&self) -> Option<&'a [u8]> {
        match self.opt_type() {
            NDP_OPT_SOURCE_LINKADDR | NDP_OPT_TARGET_LINKADDR => Some(self.payload()),
            _ => None,
        }
    }

    /// The payload parsed as prefix information.
    ///
    /// Returns `None` for other option types, and for prefix options whose
    /// declared size is not the fixed 32 bytes (such options are ignored,
    /// they do not poison the message).
    #[must_use]
    pub fn as_prefix_information(&self) -> Option<PrefixInformation> {
        if self.opt_type() != NDP_OPT_PREFIX_INFORMATION || self.wire_len() != 32 {
            return None;
        }
        PrefixInformation::from_slice(self.payload()).ok()
    }

    /// The payload parsed as an MTU value. `None` for other option types
    /// and for MTU options of the wrong size.
    #[must_use]
    pub fn as_mtu(&self) -> Option<u32> {
        if self.opt_type() != NDP_OPT_MTU || self.wire_len() != 8 {
            return None;
        }
        Some(BigEndian::read_u32(&self.tlv[4..8]))
    }
}

/// On-link prefix information carried in router advertisements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixInformation {
    /// The network part of the address, in bits.
    pub prefix_len: u8,
    /// Whether the prefix may be used for on-link determination.
    pub on_link: bool,
    /// Whether the prefix may be used for stateless address
    /// autoconfiguration.
    pub autonomous: bool,
    /// How long the prefix remains valid, in seconds.
    /// [`NDP_LIFETIME_INFINITE`] means forever.
    pub valid_lifetime: u32,
    /// How long addresses from the prefix remain preferred, in seconds.
    /// [`NDP_LIFETIME_INFINITE`] means forever.
    pub preferred_lifetime: u32,
    /// The address prefix.
    pub prefix: Ipv6Addr,
}

impl ToBytestream for PrefixInformation {
    type Error = io::Error;
    fn to_bytestream(&self, stream: &mut bytepack::BytestreamWriter) -> Result<(), Self::Error> {
        stream.write_u8(self.prefix_len)?;
        let mut flag_byte = 0;
        if self.on_link {
            flag_byte |= 0b1000_0000;
        }
        if self.autonomous {
            flag_byte |= 0b0100_0000;
        }
        stream.write_u8(flag_byte)?;
        stream.write_u32::<BE>(self.valid_lifetime)?;
        stream.write_u32::<BE>(self.preferred_lifetime)?;
        stream.write_u32::<BE>(0)?; // reserved
        stream.write_all(&self.prefix.octets())?;
        Ok(())
    }
}

impl FromBytestream for PrefixInformation {
    type Error = io::Error;
    fn from_bytestream(stream: &mut bytepack::BytestreamReader) -> Result<Self, Self::Error> {
        let prefix_len = stream.read_u8()?;
        let flag_byte = stream.read_u8()?;
        let valid_lifetime = stream.read_u32::<BE>()?;
        let preferred_lifetime = stream.read_u32::<BE>()?;
        let _reserved = stream.read_u32::<BE>()?;
        let prefix = Ipv6Addr::from_bytestream(stream)?;
        Ok(Self {
            prefix_len,
            on_link: (flag_byte & 0b1000_0000) != 0,
            autonomous: (flag_byte & 0b0100_0000) != 0,
            valid_lifetime,
            preferred_lifetime,
            prefix,
        })
    }
}

/// An owned NDP option, used to assemble outbound messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NdpOption {
    /// The senders link-layer address.
    SourceLinkLayerAddress(Vec<u8>),
    /// The targets link-layer address.
    TargetLinkLayerAddress(Vec<u8>),
    /// Prefix information provided by a router.
    PrefixInformation(PrefixInformation),
    /// The maximum transfer size of the senders link.
    Mtu(u32),
}

impl ToBytestream for NdpOption {
    type Error = io::Error;
    fn to_bytestream(&self, stream: &mut bytepack::BytestreamWriter) -> Result<(), Self::Error> {
        match self {
            Self::SourceLinkLayerAddress(addr) => {
                write_linkaddr(stream, NDP_OPT_SOURCE_LINKADDR, addr)
            }
            Self::TargetLinkLayerAddress(addr) => {
                write_linkaddr(stream, NDP_OPT_TARGET_LINKADDR, addr)
            }
            Self::PrefixInformation(info) => {
                stream.write_u8(NDP_OPT_PREFIX_INFORMATION)?;
                stream.write_u8(4)?;
                info.to_bytestream(stream)
            }
            Self::Mtu(mtu) => {
                stream.write_u8(NDP_OPT_MTU)?;
                stream.write_u8(1)?;
                stream.write_u16::<BE>(0)?; // reserved
                stream.write_u32::<BE>(*mtu)
            }
        }
    }
}

fn write_linkaddr(
    stream: &mut bytepack::BytestreamWriter,
    opt_type: u8,
    addr: &[u8],
) -> io::Result<()> {
    let units = (2 + addr.len() + 7) / 8;
    if units > usize::from(u8::MAX) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "link-layer address too long for an option",
        ));
    }
    stream.write_u8(opt_type)?;
    stream.write_u8(units as u8)?;
    stream.write_all(addr)?;
    let padding = 8 * units - 2 - addr.len();
    stream.write_all(&vec![0; padding])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lla(addr: &[u8]) -> Vec<u8> {
        NdpOption::SourceLinkLayerAddress(addr.to_vec())
            .to_vec()
            .unwrap()
    }

    #[test]
    fn walk_consumes_whole_area() {
        let mut area = lla(&[1, 2, 3, 4, 5, 6]);
        area.extend_from_slice(&NdpOption::Mtu(1500).to_vec().unwrap());
        check_opts(&area).unwrap();

        let opts: Vec<_> = OptionIter::new(&area).collect();
        assert_eq!(opts.len(), 2);
        assert_eq!(opts[0].opt_type(), NDP_OPT_SOURCE_LINKADDR);
        assert_eq!(opts[0].as_linkaddr().unwrap(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(opts[1].as_mtu(), Some(1500));
        assert_eq!(
            opts.iter().map(RawOption::wire_len).sum::<usize>(),
            area.len()
        );
    }

    #[test]
    fn zero_length_option_is_rejected() {
        let area = [NDP_OPT_SOURCE_LINKADDR, 0, 0, 0, 0, 0, 0, 0];
        assert!(check_opts(&area).is_err());
    }

    #[test]
    fn truncated_option_is_rejected() {
        // type 1, declares 2 units (16 bytes), only 8 present
        let area = [1u8, 2, 0, 0, 0, 0, 0, 0];
        assert!(check_opts(&area).is_err());
        assert_eq!(OptionIter::new(&area).count(), 0);
    }

    #[test]
    fn prefix_information_roundtrip() {
        let info = PrefixInformation {
            prefix_len: 64,
            on_link: true,
            autonomous: true,
            valid_lifetime: 86400,
            preferred_lifetime: 14400,
            prefix: "2001:db8::".parse().unwrap(),
        };
        let tlv = NdpOption::PrefixInformation(info.clone()).to_vec().unwrap();
        assert_eq!(tlv.len(), 32);
        assert_eq!(tlv[0], NDP_OPT_PREFIX_INFORMATION);
        assert_eq!(tlv[1], 4);
        assert_eq!(tlv[3], 0xC0);

        let opt = OptionIter::new(&tlv).next().unwrap();
        assert_eq!(opt.as_prefix_information().unwrap(), info);
    }

    #[test]
    fn infinite_lifetimes_survive_parsing() {
        let info = PrefixInformation {
            prefix_len: 64,
            on_link: false,
            autonomous: false,
            valid_lifetime: NDP_LIFETIME_INFINITE,
            preferred_lifetime: NDP_LIFETIME_INFINITE,
            prefix: "2001:db8::".parse().unwrap(),
        };
        let tlv = NdpOption::PrefixInformation(info).to_vec().unwrap();
        let parsed = OptionIter::new(&tlv)
            .next()
            .unwrap()
            .as_prefix_information()
            .unwrap();
        assert_eq!(parsed.valid_lifetime, NDP_LIFETIME_INFINITE);
        assert_eq!(parsed.preferred_lifetime, NDP_LIFETIME_INFINITE);
    }

    #[test]
    fn missized_fixed_options_read_as_absent() {
        // an MTU option padded out to 16 bytes is still a valid TLV
        let mut area = vec![NDP_OPT_MTU, 2];
        area.extend_from_slice(&[0; 14]);
        check_opts(&area).unwrap();

        let opt = OptionIter::new(&area).next().unwrap();
        assert_eq!(opt.as_mtu(), None);
        assert_eq!(opt.as_prefix_information(), None);
    }

    #[test]
    fn linkaddr_payload_is_padded_to_units() {
        let tlv = lla(&[0xde, 0xad]);
        assert_eq!(tlv.len(), 8);
        assert_eq!(tlv[1], 1);
        // short hardware addresses keep their declared padding
        let opt = OptionIter::new(&tlv).next().unwrap();
        assert_eq!(opt.as_linkaddr().unwrap(), [0xde, 0xad, 0, 0, 0, 0]);
    }
}
