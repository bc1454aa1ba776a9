// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::net::SocketAddr;

use log::info;
use sinkhole_parser::{DnsAnswer, DnsRequest};

use crate::BlockSet;

/// Decide whether a decoded query is answered locally.
///
/// Returning an answer makes the [Server](crate::Server) encode it and send it back to the
/// client. Returning `None` hands the received datagram to the
/// [Forwarder](crate::Forwarder).
///
/// ```rust
/// use sinkhole::{DnsAnswer, DnsRequest, QueryGate};
/// use std::net::SocketAddr;
///
/// struct BlockAll;
///
/// impl QueryGate for BlockAll {
///     fn run<'a>(&self, _client: SocketAddr, request: DnsRequest<'a>) -> Option<DnsAnswer<'a>> {
///         Some(sinkhole::synthesize(request))
///     }
/// }
/// ```
pub trait QueryGate {
    /// Take the query sent by `client` and return the answer to send back, if any.
    fn run<'a>(&self, client: SocketAddr, request: DnsRequest<'a>) -> Option<DnsAnswer<'a>>;
}

impl QueryGate for BlockSet {
    #[inline]
    fn run<'a>(&self, client: SocketAddr, request: DnsRequest<'a>) -> Option<DnsAnswer<'a>> {
        if self.is_blocked(&request.question.name) {
            info!("{} asked for blocked {}", client.ip(), request.question.name);
            Some(synthesize(request))
        } else {
            None
        }
    }
}

/// Build the sinkhole answer for a blocked query.
///
/// Whatever the query type and class, the answer is one `A` record with the question name,
/// [TTL](sinkhole_parser::ANSWER_TTL) 100 and address
/// [127.0.0.1](sinkhole_parser::SINKHOLE_ADDRESS), and the same id as the query.
#[inline]
pub fn synthesize(request: DnsRequest<'_>) -> DnsAnswer<'_> {
    DnsAnswer::from(request)
}
