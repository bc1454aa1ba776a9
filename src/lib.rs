// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Sinkhole parser
//!
//! Decode the header and first question of a DNS query and encode the single loopback
//! `A` answer a sinkhole gives back for a blocked name.
//!
//! ```
//! use sinkhole_parser::{DnsAnswer, DnsRequest};
//!
//! let query = [
//!     0xAB, 0xCD, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
//!     3, b'a', b'd', b's', 3, b'c', b'o', b'm', 0,
//!     0x00, 0x01, 0x00, 0x01,
//! ];
//! let request = DnsRequest::try_from(&query[..]).unwrap();
//! assert_eq!(request.question.name, "ads.com.");
//!
//! let answer = Vec::<u8>::try_from(&DnsAnswer::from(request)).unwrap();
//! assert_eq!(&answer[..2], &[0xAB, 0xCD]);
//! assert_eq!(&answer[answer.len() - 4..], &[127, 0, 0, 1]);
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    rustdoc::broken_intra_doc_links
)]

use thiserror::Error;

use body::Question;
use header::{DnsHeader, HEADER_SIZE};

pub use answer::*;

mod answer;
mod binutils;
pub mod body;
pub mod header;

// +---------------------+
// |        Header       |
// +---------------------+
// |       Question      | only the first one is decoded
// +---------------------+
// |        Answer       |
// +---------------------+
// |      Authority      | ignored
// +---------------------+
// |      Additional     | ignored
// +---------------------+
/// A DNS query reduced to its header and first question.
///
/// Any question after the first one and every resource record section are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsRequest<'a> {
    /// The query header.
    pub header: DnsHeader,
    /// The first question of the query.
    pub question: Question<'a>,
}

impl<'a> TryFrom<&'a [u8]> for DnsRequest<'a> {
    type Error = ParseError;

    fn try_from(buff: &'a [u8]) -> Result<Self, Self::Error> {
        let header = DnsHeader::try_from(buff)?;
        if header.questions == 0 {
            return Err(CorruptedPackageError::NoQuestion.into());
        }
        let (question, _) = Question::parse(buff, HEADER_SIZE)?;
        Ok(Self { header, question })
    }
}

/// The query could not be decoded. The datagram carrying it should be dropped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// The query uses a feature of the protocol that is not supported.
    #[error("Packet contains behaviour not implemented: {0}")]
    NotImplemented(#[from] NotImplementedError),
    /// The query is truncated or inconsistent.
    #[error("Packet has been corrupted or does not conform to DNS standard: {0}")]
    CorruptPackage(#[from] CorruptedPackageError),
}

/// Protocol features a query may use that are rejected.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NotImplementedError {
    /// A compression pointer was found while walking the question name.
    #[error("Compressed domain names are not supported (pointer at position {0}).")]
    CompressedName(usize),
    /// A length octet with one of the reserved label types.
    #[error("Byte {0:#b} does not have a pointer or length prefix.")]
    LabelPrefix(u8),
}

/// Ways in which a query may be malformed.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CorruptedPackageError {
    /// Less than 12 bytes received.
    #[error(
        "Length of package ({0} bytes) is too small to contain a DNS header (12 bytes in length)."
    )]
    HeaderLength(usize),
    /// The header announces no question.
    #[error("Query does not contain any question.")]
    NoQuestion,
    /// The decoded name does not fit in the name scratch space.
    #[error(
        "Name length ({0}) is bigger than the supported maximum ({}).",
        crate::body::name::MAX_NAME_SIZE
    )]
    NameLength(usize),
    /// A label claims more bytes than the packet has left.
    #[error("Specified label length ({0}) overflows the rest of the package.")]
    LabelLength(usize),
    /// The packet ended before a field could be read.
    #[error("Out-of-bounds read attempt at position {0}")]
    OobRead(usize),
    /// A label is not valid text.
    #[error("Non UTF-8 label: {0}")]
    NonUtf8(#[from] std::str::Utf8Error),
}
