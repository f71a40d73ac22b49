//! Node identity: local address, host name, and the cache-message source.

use parking_lot::Mutex;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// How long a discovered local address is reused.
const ADDRESS_TTL: Duration = Duration::from_secs(5 * 60);

const HOSTNAME_FILE: &str = "/etc/hostname";

static CACHED_IP: Mutex<Option<(IpAddr, Instant)>> = Mutex::new(None);
static HOST_NAME: OnceLock<String> = OnceLock::new();

/// First non-loopback IPv4 address of this host, or 127.0.0.1.
///
/// Connecting a UDP socket sends no packets; it only makes the kernel pick
/// the outbound interface.
pub fn local_ip() -> IpAddr {
    let mut cached = CACHED_IP.lock();
    if let Some((ip, at)) = *cached
        && at.elapsed() < ADDRESS_TTL
    {
        return ip;
    }
    let ip = discover_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
    *cached = Some((ip, Instant::now()));
    ip
}

fn discover_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_loopback() && !ip.is_unspecified() && ip.is_ipv4()).then_some(ip)
}

/// Host name from /etc/hostname, then `$HOSTNAME`, then "localhost".
pub fn host_name() -> &'static str {
    HOST_NAME.get_or_init(|| {
        std::fs::read_to_string(HOSTNAME_FILE)
            .ok()
            .and_then(|s| s.lines().next().map(str::trim).map(String::from))
            .filter(|s| !s.is_empty())
            .or_else(|| std::env::var("HOSTNAME").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "localhost".to_string())
    })
}

/// Identity of this node on the cache bus.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub source: String,
    pub host: String,
    pub ip: IpAddr,
}

impl NodeIdentity {
    /// Build the identity for a node listening on `port`.
    ///
    /// An explicit `advertise` value wins over discovery.
    pub fn resolve(advertise: Option<&str>, port: u16) -> Self {
        let ip = local_ip();
        let source = advertise
            .map(String::from)
            .unwrap_or_else(|| source_address(ip, port));
        Self {
            source,
            host: host_name().to_string(),
            ip,
        }
    }
}

/// `"<ip>:<port>"`.
pub fn source_address(ip: IpAddr, port: u16) -> String {
    format!("{ip}:{port}")
}
