// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    io,
    net::{SocketAddr, UdpSocket},
};

/// A datagram socket shared by every listener of a [Server](crate::Server).
///
/// Each call to `recv_from` must claim exactly one datagram so that concurrent listeners
/// never see the same query twice.
pub trait Transport: Send + Sync + 'static {
    /// Block until a datagram arrives, copy it into `buf` and return its size and source.
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Send `buf` as a single datagram to `target`.
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize>;
}

impl Transport for UdpSocket {
    #[inline]
    fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf)
    }

    #[inline]
    fn send_to(&self, buf: &[u8], target: SocketAddr) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, target)
    }
}

/// Errors after which the same socket operation can simply be tried again.
///
/// `ConnectionReset` shows up on some platforms when an earlier reply hit a closed port.
#[inline]
pub(crate) fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
            | io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds() {
        assert!(is_transient(&io::ErrorKind::Interrupted.into()));
        assert!(is_transient(&io::ErrorKind::WouldBlock.into()));
        assert!(is_transient(&io::ErrorKind::TimedOut.into()));
        assert!(is_transient(&io::ErrorKind::ConnectionReset.into()));
        assert!(!is_transient(&io::ErrorKind::Other.into()));
        assert!(!is_transient(&io::ErrorKind::NotConnected.into()));
    }

    #[test]
    fn udp_roundtrip() {
        let a = UdpSocket::bind("127.0.0.1:0").unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sent = Transport::send_to(&a, b"ping", b.local_addr().unwrap()).unwrap();
        assert_eq!(sent, 4);

        let mut buf = [0u8; 16];
        let (n, src) = Transport::recv_from(&b, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"ping");
        assert_eq!(src, a.local_addr().unwrap());
    }
}
