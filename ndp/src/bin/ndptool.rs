//! Neighbor discovery monitor, driven by the `ndp` library.

use std::{
    ffi::{CStr, CString},
    io,
    process::ExitCode,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use clap::{ArgAction, Parser, Subcommand};
use ndp::{
    tracing_sink,
    types::{msg::NdpMsgType, opt::NDP_LIFETIME_INFINITE},
    LogPriority, MsgRcvHandler, Ndp, NdpMsg,
};
use signal_hook::consts::{SIGINT, SIGQUIT, SIGTERM};

#[derive(Parser)]
#[command(name = "ndptool", about = "Monitor IPv6 neighbor discovery messages")]
struct Args {
    /// Increase output verbosity (repeatable).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Message type to monitor: "rs", "ra", "ns", "na" or "r".
    #[arg(short = 't', long = "msg_type")]
    msg_type: Option<String>,

    /// Interface to monitor.
    #[arg(short = 'i', long = "ifname")]
    ifname: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every received neighbor discovery message.
    Monitor,
}

fn msg_type_of(name: &str) -> io::Result<NdpMsgType> {
    match name {
        "rs" => Ok(NdpMsgType::RouterSolicitation),
        "ra" => Ok(NdpMsgType::RouterAdvertisement),
        "ns" => Ok(NdpMsgType::NeighborSolicitation),
        "na" => Ok(NdpMsgType::NeighborAdvertisement),
        "r" => Ok(NdpMsgType::Redirect),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid message type \"{name}\""),
        )),
    }
}

fn ifindex_of(name: &str) -> io::Result<u32> {
    let cname = CString::new(name)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid interface name"))?;
    let ifindex = unsafe { libc::if_nametoindex(cname.as_ptr()) };
    if ifindex == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("interface \"{name}\" does not exist"),
        ));
    }
    Ok(ifindex)
}

fn ifname_of(ifindex: u32) -> String {
    let mut buf = [0 as libc::c_char; libc::IF_NAMESIZE];
    let name = unsafe { libc::if_indextoname(ifindex, buf.as_mut_ptr()) };
    if name.is_null() {
        return ifindex.to_string();
    }
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

fn fmt_linkaddr(addr: &[u8]) -> String {
    addr.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

fn fmt_lifetime(seconds: u32) -> String {
    if seconds == NDP_LIFETIME_INFINITE {
        "infinity".to_string()
    } else {
        format!("{seconds}s")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn print_ra(msg: &NdpMsg) {
    let Ok(ra) = msg.ra() else { return };
    println!("  Type: RA");
    println!("  Hop limit: {}", ra.current_hop_limit());
    println!(
        "  Managed address configuration: {}",
        yes_no(ra.managed())
    );
    println!("  Other configuration: {}", yes_no(ra.other_configuration()));
    println!("  Router lifetime: {}s", ra.router_lifetime());
    match ra.reachable_time() {
        0 => println!("  Reachable time: unspecified"),
        millis => println!("  Reachable time: {millis}ms"),
    }
    match ra.retransmit_time() {
        0 => println!("  Retransmit time: unspecified"),
        millis => println!("  Retransmit time: {millis}ms"),
    }
    if let Some(addr) = ra.opt_source_linkaddr() {
        println!("  Source linkaddr: {}", fmt_linkaddr(addr));
    }
    if let Some(addr) = ra.opt_target_linkaddr() {
        println!("  Target linkaddr: {}", fmt_linkaddr(addr));
    }
    if let Some(prefix) = ra.opt_prefix() {
        println!(
            "  Prefix: {}/{}, valid_time: {}, preferred_time: {}",
            prefix.prefix,
            prefix.prefix_len,
            fmt_lifetime(prefix.valid_lifetime),
            fmt_lifetime(prefix.preferred_lifetime),
        );
    }
    if let Some(mtu) = ra.opt_mtu() {
        println!("  MTU: {mtu}");
    }
}

fn print_msg(msg: &NdpMsg) {
    println!(
        "NDP payload len {}, from addr: {}, iface: {}",
        msg.payload_len(),
        msg.addrto(),
        ifname_of(msg.ifindex())
    );
    match msg.msg_type() {
        NdpMsgType::RouterSolicitation => println!("  Type: RS"),
        NdpMsgType::RouterAdvertisement => print_ra(msg),
        NdpMsgType::NeighborSolicitation => println!("  Type: NS"),
        NdpMsgType::NeighborAdvertisement => println!("  Type: NA"),
        NdpMsgType::Redirect => println!("  Type: R"),
    }
}

fn run_main_loop(ndp: &Ndp) -> io::Result<()> {
    let term = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGQUIT, SIGTERM] {
        signal_hook::flag::register(sig, Arc::clone(&term))?;
    }

    let sources: Vec<_> = ndp.event_sources().collect();
    while !term.load(Ordering::Relaxed) {
        let mut fds: Vec<libc::pollfd> = sources
            .iter()
            .map(|source| libc::pollfd {
                fd: source.fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();

        let ready = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, 500) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if ready == 0 {
            continue;
        }

        for (pollfd, source) in fds.iter().zip(&sources) {
            if pollfd.revents & libc::POLLIN != 0 {
                let ret = ndp.service(source)?;
                if ret != 0 {
                    return Err(io::Error::new(
                        io::ErrorKind::Other,
                        format!("handler aborted with {ret}"),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn run_cmd_monitor(ndp: &Ndp, msg_type: Option<NdpMsgType>, ifindex: u32) -> io::Result<()> {
    let handler: Rc<MsgRcvHandler> = Rc::new(|_, msg| {
        print_msg(msg);
        0
    });
    ndp.register_handler(Rc::clone(&handler), msg_type, ifindex);
    let res = run_main_loop(ndp);
    ndp.unregister_handler(&handler, msg_type, ifindex);
    res
}

fn run(args: &Args, priority: LogPriority) -> io::Result<()> {
    let msg_type = args.msg_type.as_deref().map(msg_type_of).transpose()?;
    let ifindex = args
        .ifname
        .as_deref()
        .map(ifindex_of)
        .transpose()?
        .unwrap_or(0);

    let ndp = Ndp::open()?;
    ndp.set_log_sink(tracing_sink(), priority);

    match args.command {
        Command::Monitor => run_cmd_monitor(&ndp, msg_type, ifindex),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let (level, priority) = match args.verbose {
        0 => (tracing::Level::WARN, LogPriority::Warning),
        1 => (tracing::Level::INFO, LogPriority::Info),
        _ => (tracing::Level::DEBUG, LogPriority::Debug),
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match run(&args, priority) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ndptool: {err}");
            ExitCode::FAILURE
        }
    }
}
