// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::binutils::*;
use crate::body::{Class, QType};
use crate::header::{serialize_response, HEADER_SIZE};
use crate::DnsRequest;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Largest DNS message carried over UDP without EDNS.
pub const MAX_MESSAGE_SIZE: usize = 512;

/// TTL, in seconds, of every sinkhole answer.
pub const ANSWER_TTL: u32 = 100;

/// Address every blocked name resolves to.
pub const SINKHOLE_ADDRESS: Ipv4Addr = Ipv4Addr::LOCALHOST;

// TYPE + CLASS + TTL + RDLENGTH + RDATA
const RECORD_TRAILER_SIZE: usize = 2 + 2 + 4 + 2 + 4;

/// The answer to a blocked [DnsRequest]: a single `A` record pointing the queried name at
/// [SINKHOLE_ADDRESS].
///
/// ```text
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |    HEADER (ID echoed, QR=1, QD=0, AN=1)       |
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    /          NAME (question labels echoed)        /
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |     TYPE = A    |    CLASS = IN   | TTL = 100 |
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |  RDLENGTH = 4   |      RDATA = 127.0.0.1      |
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// QDCOUNT is left at zero even though the question name is written in the answer record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsAnswer<'a> {
    /// The query being answered.
    pub request: DnsRequest<'a>,
}

impl<'a> From<DnsRequest<'a>> for DnsAnswer<'a> {
    #[inline]
    fn from(request: DnsRequest<'a>) -> Self {
        DnsAnswer { request }
    }
}

impl TryFrom<&DnsAnswer<'_>> for Vec<u8> {
    type Error = EncodeError;

    #[inline]
    fn try_from(answer: &DnsAnswer<'_>) -> Result<Self, Self::Error> {
        let mut out = Vec::with_capacity(answer.wire_size());
        answer.serialize(&mut out)?;
        Ok(out)
    }
}

impl DnsAnswer<'_> {
    /// Number of bytes the serialized answer takes.
    #[inline]
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.request.question.name_bytes.len() + 1 + RECORD_TRAILER_SIZE
    }

    /// Serialize the [DnsAnswer] and append it to the end of the provided `target`.
    ///
    /// # Errors
    ///
    /// If the answer would not fit in [MAX_MESSAGE_SIZE] bytes nothing is written.
    pub fn serialize(&self, target: &mut Vec<u8>) -> Result<(), EncodeError> {
        let size = self.wire_size();
        if size > MAX_MESSAGE_SIZE {
            return Err(EncodeError::SizeExceeded(size));
        }
        serialize_response(target, self.request.header.id, 0, 1);
        target.extend(self.request.question.name_bytes);
        target.push(0u8);
        push_u16(target, QType::A.into());
        push_u16(target, Class::IN.into());
        push_u32(target, ANSWER_TTL);
        push_u16(target, 4);
        target.extend(SINKHOLE_ADDRESS.octets());
        Ok(())
    }
}

/// The answer could not be encoded. No reply should be sent.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// The answer does not fit in a UDP DNS message.
    #[error("Answer needs {0} bytes, more than the 512 bytes allowed in a DNS message over UDP.")]
    SizeExceeded(usize),
}
