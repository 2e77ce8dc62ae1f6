//! The library context: socket ownership, handler registry, dispatch.

use std::{
    cell::{Cell, RefCell},
    fmt, io,
    os::fd::{AsRawFd, RawFd},
    rc::Rc,
};

use ndp_types::msg::NdpMsgType;

use crate::{
    log::{LogPriority, LogSink},
    msg::{NdpMsg, NDP_MSG_BUFLEN},
    sock::IcmpV6Sock,
};

/// A message-receive callback.
///
/// Invoked with the owning context and the borrowed message; the message
/// must not be retained past the call (clone it if needed). A non-zero
/// return value aborts the running dispatch pass and becomes the return
/// value of [`Ndp::service`].
pub type MsgRcvHandler = dyn Fn(&Ndp, &NdpMsg) -> i32;

pub(crate) struct Registration {
    /// Slot identity; unregistered slots are skipped by running passes.
    id: u64,
    func: Rc<MsgRcvHandler>,
    msg_type: Option<NdpMsgType>,
    ifindex: u32,
}

impl Registration {
    fn matches(&self, msg: &NdpMsg) -> bool {
        (self.msg_type.is_none() || self.msg_type == Some(msg.msg_type()))
            && (self.ifindex == 0 || self.ifindex == msg.ifindex())
    }
}

impl Clone for Registration {
    fn clone(&self) -> Self {
        Registration {
            id: self.id,
            func: Rc::clone(&self.func),
            msg_type: self.msg_type,
            ifindex: self.ifindex,
        }
    }
}

/// One readable descriptor the caller must integrate into its poll loop.
///
/// When the descriptor signals readable, pass the source back to
/// [`Ndp::service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSource {
    fd: RawFd,
}

impl EventSource {
    /// The raw descriptor to poll for readability.
    #[must_use]
    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl AsRawFd for EventSource {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

/// The neighbor discovery context.
///
/// Owns the raw ICMPv6 endpoint and the handler registrations. A context
/// is single-threaded; dropping it closes the socket, after which no
/// callback fires again.
pub struct Ndp {
    sock: IcmpV6Sock,
    handlers: RefCell<Vec<Registration>>,
    next_id: Cell<u64>,
    sink: RefCell<Option<LogSink>>,
    log_priority: Cell<LogPriority>,
    dropped: Cell<u64>,
}

impl Ndp {
    /// Opens a context on a fresh raw ICMPv6 socket.
    ///
    /// The socket admits only the five NDP types, receives packet-info and
    /// hop-limit ancillary data, sends with hop limit 255 and joins the
    /// all-nodes group `ff02::1` once, on the kernel-chosen interface.
    /// Requires the privileges for raw sockets.
    ///
    /// # Errors
    ///
    /// Any socket or socket-option failure is handed through.
    pub fn open() -> io::Result<Ndp> {
        Ok(Self::with_sock(IcmpV6Sock::open()?))
    }

    pub(crate) fn with_sock(sock: IcmpV6Sock) -> Ndp {
        Ndp {
            sock,
            handlers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            sink: RefCell::new(None),
            log_priority: Cell::new(LogPriority::Err),
            dropped: Cell::new(0),
        }
    }

    /// Installs the log sink and its priority floor. Replaces any earlier
    /// sink; the default is no sink at all.
    pub fn set_log_sink(&self, sink: LogSink, min_priority: LogPriority) {
        *self.sink.borrow_mut() = Some(sink);
        self.log_priority.set(min_priority);
    }

    /// The current priority floor.
    #[must_use]
    pub fn log_priority(&self) -> LogPriority {
        self.log_priority.get()
    }

    /// Adjusts the priority floor without touching the sink.
    pub fn set_log_priority(&self, priority: LogPriority) {
        self.log_priority.set(priority);
    }

    pub(crate) fn log(&self, priority: LogPriority, args: fmt::Arguments<'_>) {
        if priority > self.log_priority.get() {
            return;
        }
        if let Some(sink) = &*self.sink.borrow() {
            sink(priority, args);
        }
    }

    /// The number of inbound datagrams dropped as malformed.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    /// Appends a handler registration.
    ///
    /// `msg_type: None` matches every message type, `ifindex: 0` every
    /// interface. Registering the same callback again is allowed; each
    /// registration fires independently, in insertion order.
    pub fn register_handler(
        &self,
        func: Rc<MsgRcvHandler>,
        msg_type: Option<NdpMsgType>,
        ifindex: u32,
    ) {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.handlers.borrow_mut().push(Registration {
            id,
            func,
            msg_type,
            ifindex,
        });
    }

    /// Removes the first registration matching callback (by pointer
    /// identity) and both filter fields. Removing a registration that does
    /// not exist is a no-op.
    pub fn unregister_handler(
        &self,
        func: &Rc<MsgRcvHandler>,
        msg_type: Option<NdpMsgType>,
        ifindex: u32,
    ) {
        let mut handlers = self.handlers.borrow_mut();
        if let Some(pos) = handlers.iter().position(|reg| {
            Rc::ptr_eq(&reg.func, func) && reg.msg_type == msg_type && reg.ifindex == ifindex
        }) {
            handlers.remove(pos);
        }
    }

    /// Sends a message through the raw endpoint.
    ///
    /// An unspecified `addrto` falls back to the default group of the
    /// message type: all-routers for RS, all-nodes for RA and NA, the
    /// solicited-node group of the target for NS. Redirects have no
    /// default and fail with `InvalidInput`.
    ///
    /// # Errors
    ///
    /// Destination selection and syscall failures are handed through.
    pub fn sendto(&self, msg: &NdpMsg) -> io::Result<()> {
        let dst = msg.send_dest()?;
        log_dbg!(self, "sending {:?} to {}", msg.msg_type(), dst);
        self.sock.send(msg.payload(), dst, msg.ifindex())
    }

    /// Enumerates the readable event sources of this context (currently a
    /// single one, the raw socket).
    pub fn event_sources(&self) -> impl Iterator<Item = EventSource> + '_ {
        std::iter::once(EventSource {
            fd: self.sock.as_raw_fd(),
        })
    }

    /// Services one event source: reads at most one datagram, parses it
    /// and runs the matching handlers in registration order.
    ///
    /// Returns `Ok(0)` when nothing was dispatched (no datagram pending,
    /// hop-limit gate, malformed drop) or every handler returned 0; a
    /// non-zero handler return aborts the pass and is handed through.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a foreign event source, otherwise only
    /// transport-level receive failures.
    pub fn service(&self, source: &EventSource) -> io::Result<i32> {
        if source.fd != self.sock.as_raw_fd() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unknown event source",
            ));
        }

        let mut buf = [0; NDP_MSG_BUFLEN];
        let Some(info) = self.sock.recv(&mut buf)? else {
            return Ok(0);
        };

        // RFC 4861 §6.1/§7.1: hop limits other than 255 void the message.
        if info.hop_limit != 255 {
            log_dbg!(
                self,
                "ignored datagram from {} with hop limit {}",
                info.src,
                info.hop_limit
            );
            return Ok(0);
        }

        let msg = match NdpMsg::from_wire(&buf[..info.len], info.src, info.ifindex) {
            Ok(msg) => msg,
            Err(err) => {
                self.dropped.set(self.dropped.get() + 1);
                log_warn!(self, "dropped malformed datagram from {}: {err}", info.src);
                return Ok(0);
            }
        };

        Ok(self.dispatch(&msg))
    }

    /// Runs the matching handlers for `msg` over a snapshot of the
    /// registration list. Handlers may unregister themselves or others;
    /// a registration removed mid-pass no longer fires.
    pub(crate) fn dispatch(&self, msg: &NdpMsg) -> i32 {
        let snapshot = self.handlers.borrow().clone();
        for reg in snapshot {
            if !self.handlers.borrow().iter().any(|r| r.id == reg.id) {
                continue;
            }
            if !reg.matches(msg) {
                continue;
            }
            let ret = (reg.func)(self, msg);
            if ret != 0 {
                return ret;
            }
        }
        0
    }
}
