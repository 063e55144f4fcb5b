//! Free TCP port discovery.
//!
//! Each probe binds a real listener and drops it straight away, so a port
//! reported free may be taken again before the caller binds it. Callers must
//! treat their own bind as fallible.

use std::net::{IpAddr, SocketAddr, TcpListener};

use rand::Rng;
use tracing::debug;

use crate::error::StartupError;

/// Lowest port considered when probing; privileged ports are skipped.
pub const MIN_PORT: u16 = 1024;
/// Highest port considered when probing.
pub const MAX_PORT: u16 = u16::MAX;

/// Return `true` when a listener can be bound on `ip:port` right now.
pub fn is_port_available(ip: IpAddr, port: u16) -> bool {
    TcpListener::bind(SocketAddr::new(ip, port)).is_ok()
}

/// Find a bindable port on `ip`.
///
/// A non-zero `preferred` port is returned as-is when it binds. Otherwise the
/// search starts at a random port in `[MIN_PORT, MAX_PORT]`, walks up to
/// `MAX_PORT`, then wraps around to cover `[MIN_PORT, start)`.
pub fn find_available_port(ip: IpAddr, preferred: u16) -> Result<u16, StartupError> {
    if preferred > 0 && is_port_available(ip, preferred) {
        debug!(port = preferred, "preferred port available");
        return Ok(preferred);
    }

    let start = rand::rng().random_range(MIN_PORT..=MAX_PORT);
    debug!(preferred, start, "probing for a free port");
    probe_from(ip, start, |port| port != preferred && is_port_available(ip, port))
}

/// Linear wrap-around scan starting at `start`, returning the first port
/// accepted by `bindable`.
fn probe_from(
    ip: IpAddr,
    start: u16,
    mut bindable: impl FnMut(u16) -> bool,
) -> Result<u16, StartupError> {
    let upper = start..=MAX_PORT;
    let lower = MIN_PORT..start;
    for port in upper.chain(lower) {
        if bindable(port) {
            debug!(%ip, port, "found free port");
            return Ok(port);
        }
    }
    Err(StartupError::NoAvailablePort {
        min: MIN_PORT,
        max: MAX_PORT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[test]
    fn auto_select_returns_port_in_range() {
        let port = find_available_port(LOCALHOST, 0).unwrap();
        assert!(port >= MIN_PORT, "port {port} below {MIN_PORT}");
    }

    #[test]
    fn free_preferred_port_is_returned() {
        // Grab a port from the OS, release it, then ask for it back.
        let port = {
            let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
            listener.local_addr().unwrap().port()
        };
        assert_eq!(find_available_port(LOCALHOST, port).unwrap(), port);
    }

    #[test]
    fn occupied_preferred_port_is_never_returned() {
        let listener = TcpListener::bind((LOCALHOST, 0)).unwrap();
        let taken = listener.local_addr().unwrap().port();

        assert!(!is_port_available(LOCALHOST, taken));
        let port = find_available_port(LOCALHOST, taken).unwrap();
        assert_ne!(port, taken);
        assert!(port >= MIN_PORT);
        drop(listener);
    }

    #[test]
    fn probe_wraps_around_below_start() {
        let mut seen = Vec::new();
        let port = probe_from(LOCALHOST, 65534, |port| {
            seen.push(port);
            port == 2000
        })
        .unwrap();
        assert_eq!(port, 2000);
        assert_eq!(&seen[..3], &[65534, 65535, 1024]);
    }

    #[test]
    fn exhausted_range_is_an_error_not_a_panic() {
        let mut probes = 0usize;
        let err = probe_from(LOCALHOST, 40000, |_| {
            probes += 1;
            false
        })
        .unwrap_err();
        assert!(matches!(err, StartupError::NoAvailablePort { .. }));
        assert_eq!(probes, usize::from(MAX_PORT - MIN_PORT) + 1);
    }
}
