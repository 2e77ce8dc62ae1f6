use super::*;
use ::byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::io::Error;

#[derive(Debug, PartialEq, Eq)]
struct Tlv {
    typ: u8,
    data: Vec<u8>,
}

impl ToBytestream for Tlv {
    type Error = Error;
    fn to_bytestream(&self, stream: &mut BytestreamWriter) -> Result<(), Self::Error> {
        stream.write_u8(self.typ)?;
        stream.write_u8(self.data.len() as u8)?;
        stream.write_all(&self.data)?;
        Ok(())
    }
}

impl FromBytestream for Tlv {
    type Error = Error;
    fn from_bytestream(stream: &mut BytestreamReader) -> Result<Self, Self::Error> {
        let typ = stream.read_u8()?;
        let len = stream.read_u8()?;
        let mut substr = stream.extract(len as usize)?;
        let mut data = Vec::new();
        substr.read_to_end(&mut data)?;
        Ok(Self { typ, data })
    }
}

#[test]
fn tlv_roundtrip_leaves_tail_untouched() {
    let tlv = Tlv {
        typ: 3,
        data: vec![1, 2, 3, 4],
    };
    let mut buf = tlv.to_vec().unwrap();
    buf.extend_from_slice(&[0xaa, 0xbb]);

    let mut slice = &buf[..];
    let parsed = Tlv::read_from_slice(&mut slice).unwrap();
    assert_eq!(parsed, tlv);
    assert_eq!(slice, [0xaa, 0xbb]);
}

#[test]
fn extract_rejects_overlong_substreams() {
    let buf = [1u8, 2, 3];
    let mut reader = BytestreamReader { slice: &buf };
    assert!(reader.extract(4).is_err());
}

#[test]
fn read_from_slice_keeps_slice_on_error() {
    let buf = [7u8, 5, 0, 0]; // declares 5 payload bytes, carries 2
    let mut slice = &buf[..];
    assert!(Tlv::read_from_slice(&mut slice).is_err());
    assert_eq!(slice, buf);
}

#[test]
fn ipv6_addr_roundtrip() {
    let addr: std::net::Ipv6Addr = "fe80::1c30:dfff:fe6a:2c9a".parse().unwrap();
    let buf = addr.to_vec().unwrap();
    assert_eq!(buf, addr.octets());
    assert_eq!(std::net::Ipv6Addr::from_slice(&buf).unwrap(), addr);
}

#[test]
fn append_to_vec_appends() {
    let mut buf = vec![0xff];
    let tlv = Tlv {
        typ: 1,
        data: vec![9],
    };
    tlv.append_to_vec(&mut buf).unwrap();
    assert_eq!(buf, [0xff, 1, 1, 9]);
}

crate::raw_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Proto {
        type Repr = u8 where BigEndian;
        Udp = 17,
        Icmp6 = 58,
    }
}

#[test]
fn raw_enum_repr_conversions() {
    assert_eq!(Proto::from_raw_repr(58).unwrap(), Proto::Icmp6);
    assert_eq!(Proto::Udp.to_raw_repr(), 17);
    assert!(Proto::from_raw_repr(6).is_err());
    assert_eq!("Udp".parse::<Proto>().unwrap(), Proto::Udp);
}
