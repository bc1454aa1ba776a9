// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Sinkhole
//!
//! A DNS [Server] that answers the names of a [BlockSet] with `127.0.0.1` and hands every
//! other query to a [Forwarder].
//!
//! ```no_run
//! use sinkhole::{BlockSet, Server, UpstreamForwarder};
//!
//! let blocked = BlockSet::load("blocked.txt").unwrap();
//! let upstream = UpstreamForwarder::new("1.1.1.1:53".parse().unwrap());
//!
//! let error = Server::default()
//!         .threads(4)
//!         .bind("127.0.0.5:53".parse().unwrap())
//!         .unwrap()
//!         .serve(blocked, upstream);
//! eprintln!("{error}");
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    rustdoc::broken_intra_doc_links
)]

mod blockset;
mod forward;
mod gate;
mod server;
mod transport;

pub use blockset::{BlockListError, BlockSet};
pub use forward::{ForwardError, Forwarder, UpstreamForwarder};
pub use gate::{synthesize, QueryGate};
pub use server::{Builder, Runner, ServeError, Server, RECV_BUFFER_SIZE};
pub use transport::Transport;

pub use sinkhole_parser::body::{Class, QType, Question};
pub use sinkhole_parser::header::{DnsHeader, OpCode};
pub use sinkhole_parser::*;
