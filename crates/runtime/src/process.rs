//! Port lifecycle helpers used before the HTTP listener starts.

use std::io;
use std::net::TcpListener;

use tracing::debug;

/// How far past the preferred port the deterministic fallback scans.
const SCAN_SPAN: u16 = 100;

/// Returns `true` when `port` can be bound on `host`.
///
/// The probe socket is dropped before returning.
pub fn port_available(host: &str, port: u16) -> bool {
	TcpListener::bind((host, port)).is_ok()
}

/// A port chosen by [`resolve_port`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortChoice {
	pub requested: u16,
	pub port: u16,
}

impl PortChoice {
	/// Whether the prober had to move away from the requested port.
	pub fn changed(&self) -> bool {
		self.requested != self.port
	}
}

/// Resolves `preferred` to a port that is bindable on `host` right now.
///
/// Tries `preferred`, then an OS-assigned ephemeral port, then scans the
/// ports just above `preferred`. Every probe releases its socket, so the
/// caller binds the returned port itself.
pub fn resolve_port(host: &str, preferred: u16) -> io::Result<PortChoice> {
	if preferred != 0 && port_available(host, preferred) {
		return Ok(PortChoice {
			requested: preferred,
			port: preferred,
		});
	}

	match ephemeral_port(host) {
		Ok(port) => {
			debug!(target = "sv.port", preferred, port, "preferred port unavailable; using ephemeral port");
			return Ok(PortChoice { requested: preferred, port });
		}
		Err(err) => {
			debug!(target = "sv.port", preferred, error = %err, "ephemeral bind failed; scanning");
		}
	}

	let start = preferred.saturating_add(1);
	let end = preferred.saturating_add(SCAN_SPAN);
	(start..=end)
		.find(|port| *port != 0 && port_available(host, *port))
		.map(|port| PortChoice { requested: preferred, port })
		.ok_or_else(|| io::Error::new(io::ErrorKind::AddrInUse, format!("no bindable port on {host} near {preferred}")))
}

fn ephemeral_port(host: &str) -> io::Result<u16> {
	let listener = TcpListener::bind((host, 0))?;
	let port = listener.local_addr()?.port();
	drop(listener);
	Ok(port)
}
