//! The raw ICMPv6 endpoint.
//!
//! `socket2` covers creation and the portable socket options; the pieces it
//! does not expose (the ICMPv6 type filter, packet-info/hop-limit ancillary
//! delivery and the `recvmsg` control-message walk) go through `libc`
//! directly.

use std::{
    io, mem,
    net::{Ipv6Addr, SocketAddrV6},
    os::fd::{AsRawFd, RawFd},
    ptr,
};

use ndp_types::{addr::Ipv6AddrExt, msg::NdpMsgType};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

// Not exported by the libc crate.
const ICMP6_FILTER: libc::c_int = 1;

/// The ICMPv6 type filter: one block bit per type, as the kernel expects
/// it (bit set = type blocked).
pub(crate) struct Icmp6Filter([u32; 8]);

impl Icmp6Filter {
    pub(crate) fn block_all() -> Icmp6Filter {
        Icmp6Filter([!0; 8])
    }

    pub(crate) fn set_pass(&mut self, icmp6_type: u8) {
        self.0[usize::from(icmp6_type >> 5)] &= !(1u32 << (icmp6_type & 31));
    }

    #[cfg(test)]
    pub(crate) fn passes(&self, icmp6_type: u8) -> bool {
        self.0[usize::from(icmp6_type >> 5)] & (1u32 << (icmp6_type & 31)) == 0
    }
}

fn setsockopt<T>(
    sock: &Socket,
    level: libc::c_int,
    optname: libc::c_int,
    value: &T,
) -> io::Result<()> {
    let res = unsafe {
        libc::setsockopt(
            sock.as_raw_fd(),
            level,
            optname,
            (value as *const T).cast(),
            mem::size_of::<T>() as libc::socklen_t,
        )
    };
    if res == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Addressing metadata of one received datagram.
pub(crate) struct RecvInfo {
    pub(crate) len: usize,
    pub(crate) src: Ipv6Addr,
    pub(crate) ifindex: u32,
    pub(crate) hop_limit: u8,
}

pub(crate) struct IcmpV6Sock {
    sock: Socket,
}

impl IcmpV6Sock {
    /// Opens the raw endpoint: non-blocking, hop limit 255 in both
    /// directions, joined to the all-nodes group on the kernel-chosen
    /// interface, and filtered down to the five NDP types.
    pub(crate) fn open() -> io::Result<IcmpV6Sock> {
        let sock = Socket::new(Domain::IPV6, Type::RAW, Some(Protocol::ICMPV6))?;
        sock.set_nonblocking(true)?;
        sock.set_unicast_hops_v6(255)?;
        sock.set_multicast_hops_v6(255)?;
        sock.join_multicast_v6(&Ipv6Addr::MULTICAST_ALL_NODES, 0)?;

        let mut filter = Icmp6Filter::block_all();
        for msg_type in [
            NdpMsgType::RouterSolicitation,
            NdpMsgType::RouterAdvertisement,
            NdpMsgType::NeighborSolicitation,
            NdpMsgType::NeighborAdvertisement,
            NdpMsgType::Redirect,
        ] {
            filter.set_pass(msg_type.to_raw_repr());
        }
        setsockopt(&sock, libc::IPPROTO_ICMPV6, ICMP6_FILTER, &filter.0)?;

        Self::with_ancillary(sock)
    }

    /// Enables packet-info and hop-limit delivery and wraps the socket.
    /// Split out of [`open`](Self::open) so tests can drive the receive
    /// path over an unprivileged datagram socket.
    pub(crate) fn with_ancillary(sock: Socket) -> io::Result<IcmpV6Sock> {
        setsockopt(&sock, libc::IPPROTO_IPV6, libc::IPV6_RECVPKTINFO, &1i32)?;
        setsockopt(&sock, libc::IPPROTO_IPV6, libc::IPV6_RECVHOPLIMIT, &1i32)?;
        Ok(IcmpV6Sock { sock })
    }

    /// Receives one datagram with its ancillary metadata.
    ///
    /// Returns `Ok(None)` when the socket had nothing to deliver
    /// (would-block or interrupted); missing control messages leave
    /// `ifindex`/`hop_limit` at 0.
    pub(crate) fn recv(&self, buf: &mut [u8]) -> io::Result<Option<RecvInfo>> {
        let mut src: libc::sockaddr_in6 = unsafe { mem::zeroed() };
        let mut iov = libc::iovec {
            iov_base: buf.as_mut_ptr().cast(),
            iov_len: buf.len(),
        };
        let mut control = [0u8; 128];

        let mut mhdr: libc::msghdr = unsafe { mem::zeroed() };
        mhdr.msg_name = ptr::addr_of_mut!(src).cast();
        mhdr.msg_namelen = mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t;
        mhdr.msg_iov = &mut iov;
        mhdr.msg_iovlen = 1;
        mhdr.msg_control = control.as_mut_ptr().cast();
        mhdr.msg_controllen = control.len() as _;

        let n = unsafe { libc::recvmsg(self.sock.as_raw_fd(), &mut mhdr, 0) };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(None),
                _ => Err(err),
            };
        }

        let src_addr = if src.sin6_family == libc::AF_INET6 as libc::sa_family_t {
            Ipv6Addr::from(src.sin6_addr.s6_addr)
        } else {
            Ipv6Addr::UNSPECIFIED
        };

        let mut ifindex = 0;
        let mut hop_limit = 0;
        let mut cmsg = unsafe { libc::CMSG_FIRSTHDR(&mhdr) };
        while !cmsg.is_null() {
            let hdr = unsafe { *cmsg };
            if hdr.cmsg_level == libc::IPPROTO_IPV6 {
                match hdr.cmsg_type {
                    libc::IPV6_PKTINFO => {
                        let info = unsafe {
                            ptr::read_unaligned(libc::CMSG_DATA(cmsg).cast::<libc::in6_pktinfo>())
                        };
                        ifindex = info.ipi6_ifindex;
                    }
                    libc::IPV6_HOPLIMIT => {
                        let limit = unsafe {
                            ptr::read_unaligned(libc::CMSG_DATA(cmsg).cast::<libc::c_int>())
                        };
                        hop_limit = limit as u8;
                    }
                    _ => {}
                }
            }
            cmsg = unsafe { libc::CMSG_NXTHDR(&mhdr, cmsg) };
        }

        Ok(Some(RecvInfo {
            len: n as usize,
            src: src_addr,
            ifindex,
            hop_limit,
        }))
    }

    /// Writes one datagram. A non-zero `ifindex` pins the outgoing
    /// interface through the scope id.
    pub(crate) fn send(&self, buf: &[u8], dst: Ipv6Addr, ifindex: u32) -> io::Result<()> {
        let addr = SocketAddrV6::new(dst, 0, 0, ifindex);
        self.sock.send_to(buf, &SockAddr::from(addr))?;
        Ok(())
    }
}

impl AsRawFd for IcmpV6Sock {
    fn as_raw_fd(&self) -> RawFd {
        self.sock.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_passes_exactly_the_ndp_types() {
        let mut filter = Icmp6Filter::block_all();
        for typ in 133..=137 {
            filter.set_pass(typ);
        }
        // word 4 carries types 128..159; bits 5..=9 must be cleared
        assert_eq!(filter.0[4], 0xffff_fc1f);
        for word in [0, 1, 2, 3, 5, 6, 7] {
            assert_eq!(filter.0[word], 0xffff_ffff);
        }

        assert!(filter.passes(133));
        assert!(filter.passes(137));
        assert!(!filter.passes(128));
        assert!(!filter.passes(138));
    }
}
