// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Domain name walking
pub mod name;

use crate::binutils::*;
use crate::ParseError;

/// A query for the records of the specified [QType] and [Class] attached to a name.
///
/// ```text
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |                                               |
///    /                     QNAME                     /
///    /                                               /
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |                     QTYPE                     |
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
///    |                     QCLASS                    |
///    +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Question<'a> {
    /// Labels joined by dots, trailing dot included: `example.com.`
    pub name: String,
    /// The length-prefixed labels as received, without the terminating zero-length label.
    pub name_bytes: &'a [u8],
    /// The type of record being queried.
    pub qtype: QType,
    /// The class of record being queried.
    pub class: Class,
}

impl<'a> Question<'a> {
    /// Parse from the specified `buff`, starting at position `start`.
    ///
    /// Returns the question and the number of bytes it takes in `buff`.
    ///
    /// # Errors
    ///
    /// It will error if the buffer does not contain a complete question, if the name is
    /// compressed or if it is longer than [name::MAX_NAME_SIZE].
    #[inline]
    pub fn parse(buff: &'a [u8], start: usize) -> Result<(Self, usize), ParseError> {
        let (name, walked) = name::parse(buff, start)?;
        let n = start + walked + 1;
        Ok((
            Question {
                name,
                name_bytes: &buff[start..start + walked],
                qtype: safe_u16_read(buff, n)?.into(),
                class: safe_u16_read(buff, n + 2)?.into(),
            },
            walked + 5,
        ))
    }
}

/// The record type asked for in a [Question]. Only read, a blocked name gets an `A`
/// answer whatever the type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd)]
pub enum QType {
    /// IPv4 address
    A,
    /// Name server
    Ns,
    /// Alias
    Cname,
    /// Mail exchange
    Mx,
    /// Text
    Txt,
    /// IPv6 address
    Aaaa,
    /// Every record of the name
    All,
    /// Any other value
    Unknown(u16),
}

impl From<u16> for QType {
    #[inline]
    fn from(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::Ns,
            5 => Self::Cname,
            15 => Self::Mx,
            16 => Self::Txt,
            28 => Self::Aaaa,
            255 => Self::All,
            _ => Self::Unknown(value),
        }
    }
}

impl From<QType> for u16 {
    #[inline]
    fn from(value: QType) -> Self {
        match value {
            QType::A => 1,
            QType::Ns => 2,
            QType::Cname => 5,
            QType::Mx => 15,
            QType::Txt => 16,
            QType::Aaaa => 28,
            QType::All => 255,
            QType::Unknown(n) => n,
        }
    }
}

/// The class of a [Question]. Decoded for completeness, answers are always `IN`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd)]
pub enum Class {
    /// Internet
    IN,
    /// CSNET, obsolete
    CS,
    /// Chaos
    CH,
    /// Hesiod
    HS,
    /// Any class
    Any,
    /// Any other value
    Unknown(u16),
}

impl From<u16> for Class {
    #[inline]
    fn from(value: u16) -> Self {
        match value {
            1 => Self::IN,
            2 => Self::CS,
            3 => Self::CH,
            4 => Self::HS,
            255 => Self::Any,
            _ => Self::Unknown(value),
        }
    }
}

impl From<Class> for u16 {
    #[inline]
    fn from(value: Class) -> Self {
        match value {
            Class::IN => 1,
            Class::CS => 2,
            Class::CH => 3,
            Class::HS => 4,
            Class::Any => 255,
            Class::Unknown(n) => n,
        }
    }
}
