// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::binutils::*;
use crate::CorruptedPackageError;
use crate::ParseError;

/// Size in bytes of the fixed DNS header.
pub const HEADER_SIZE: usize = 12;

const OPCODE_MASK: u8 = 0b0111_1000;
const AA_MASK: u8 = 0b0000_0100;
const TC_MASK: u8 = 0b0000_0010;
const RD_MASK: u8 = 0b0000_0001;

/// Flags word of every synthesized answer: QR set in the first byte, `0x10` in the second one
/// and RCODE NOERROR.
pub(crate) const RESPONSE_NOERROR: u16 = 0b1000_0000_0001_0000;

#[inline]
fn mask_shift(mask: u8, n: u8) -> u8 {
    (n & mask) >> mask.trailing_zeros()
}

/// The header of a DNS query, reduced to the fields a sinkhole cares about.
///
/// ```text
///       0  1  2  3  4  5  6  7  0  1  2  3  4  5  6  7
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                      ID                       |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |QR|   Opcode  |AA|TC|RD|RA| Z|AD|CD|   RCODE   |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    QDCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ANCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    NSCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///     |                    ARCOUNT                    |
///     +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
///
/// QR and the whole second flags byte (RA, Z, AD, CD, RCODE) are ignored when decoding
/// a query, as are ANCOUNT, NSCOUNT and ARCOUNT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsHeader {
    /// Identifier chosen by the client. Never interpreted, only copied into the answer.
    pub id: [u8; 2],
    /// Kind of query.
    pub opcode: OpCode,
    /// AA bit.
    pub authoritative: bool,
    /// TC bit.
    pub truncated: bool,
    /// RD bit.
    pub recursion_desired: bool,
    /// Question records count, as announced by the client.
    pub questions: u16,
}

impl TryFrom<&[u8]> for DnsHeader {
    type Error = ParseError;

    #[inline]
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < HEADER_SIZE {
            return Err(CorruptedPackageError::HeaderLength(bytes.len()).into());
        }
        let flags = safe_u8_read(bytes, 2)?;
        Ok(DnsHeader {
            id: safe_read::<2>(bytes, 0)?,
            opcode: mask_shift(OPCODE_MASK, flags).into(),
            authoritative: mask_shift(AA_MASK, flags) == 1,
            truncated: mask_shift(TC_MASK, flags) == 1,
            recursion_desired: mask_shift(RD_MASK, flags) == 1,
            questions: safe_u16_read(bytes, 4)?,
        })
    }
}

/// Append the header of a response to `target`.
///
/// NSCOUNT and ARCOUNT are always zero.
#[inline]
pub(crate) fn serialize_response(target: &mut Vec<u8>, id: [u8; 2], questions: u16, answers: u16) {
    target.extend(id);
    push_u16(target, RESPONSE_NOERROR);
    push_u16(target, questions);
    push_u16(target, answers);
    push_u16(target, 0);
    push_u16(target, 0);
}

/// Standard query (0), Inverse query (1), Server status query (2), Notify (4), Update (5), DSO (6)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpCode {
    /// Standard query
    Query,
    /// Inverse query
    Iquery,
    /// Server status query
    Status,
    /// Notify
    Notify,
    /// Update
    Update,
    /// DSO
    Dso,
    /// Any other value
    Unknown(u8),
}

impl From<u8> for OpCode {
    #[inline]
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Query,
            1 => Self::Iquery,
            2 => Self::Status,
            4 => Self::Notify,
            5 => Self::Update,
            6 => Self::Dso,
            _ => Self::Unknown(value),
        }
    }
}

impl From<OpCode> for u8 {
    #[inline]
    fn from(value: OpCode) -> Self {
        match value {
            OpCode::Query => 0,
            OpCode::Iquery => 1,
            OpCode::Status => 2,
            OpCode::Notify => 4,
            OpCode::Update => 5,
            OpCode::Dso => 6,
            OpCode::Unknown(n) => n,
        }
    }
}
