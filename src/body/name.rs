// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::binutils::*;
use crate::CorruptedPackageError;
use crate::NotImplementedError;
use crate::ParseError;
use std::str;

/// Upper bound for the text form of a decoded name, trailing dot included.
///
/// The text form is exactly as long as the label encoding without its terminator, so this
/// also bounds the bytes echoed back in an answer.
pub const MAX_NAME_SIZE: usize = 100;

const INIT_CAP: usize = 32;

/// Walk the labels of an uncompressed domain name starting at `start`.
///
/// Returns the dot-joined text of the name, trailing dot included, and the number of bytes
/// walked not counting the terminating zero-length label.
pub(crate) fn parse(buff: &[u8], start: usize) -> Result<(String, usize), ParseError> {
    let mut text = String::with_capacity(INIT_CAP);
    let mut pos = start;
    loop {
        match read_label_metadata(buff, pos)? {
            LabelMeta::End => return Ok((text, pos - start)),
            LabelMeta::Pointer => return Err(NotImplementedError::CompressedName(pos).into()),
            LabelMeta::Size(s) if buff.len() <= pos + s => {
                return Err(CorruptedPackageError::LabelLength(s).into())
            }
            LabelMeta::Size(s) if text.len() + s + 1 > MAX_NAME_SIZE => {
                return Err(CorruptedPackageError::NameLength(text.len() + s + 1).into())
            }
            LabelMeta::Size(s) => {
                let label = str::from_utf8(&buff[pos + 1..pos + 1 + s])
                    .map_err(CorruptedPackageError::from)?;
                text.push_str(label);
                text.push('.');
                pos += s + 1;
            }
        }
    }
}

enum LabelMeta {
    End,
    // Although it is really an u8 because it is used for indexing we give an usize
    Size(usize),
    Pointer,
}

#[inline]
fn read_label_metadata(buff: &[u8], pos: usize) -> Result<LabelMeta, ParseError> {
    let b = safe_u8_read(buff, pos)?;
    match b {
        0 => Ok(LabelMeta::End),
        1..=0b0011_1111 => Ok(LabelMeta::Size(b as _)),
        0b1100_0000..=0xFF => Ok(LabelMeta::Pointer),
        _ => Err(NotImplementedError::LabelPrefix(b).into()),
    }
}
