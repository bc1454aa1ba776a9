// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations)]

use argh::FromArgs;
use log::info;
use owo_colors::OwoColorize;
use sinkhole::{BlockListError, BlockSet, ServeError, Server};
use std::{io, net::SocketAddr, path::PathBuf};
use thiserror::Error;

use config::Config;

mod config;

#[derive(Clone, Debug, FromArgs)]
/// Answer blocked DNS names with 127.0.0.1 and forward the rest
struct DaemonArgs {
    /// TOML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
    /// file with one blocked domain name per line
    #[argh(option, short = 'b')]
    blocklist: Option<PathBuf>,
    /// socket address to listen on [default: 127.0.0.5:53]
    #[argh(option, short = 'l')]
    listen: Option<SocketAddr>,
    /// number of listener threads [default: number of CPUs]
    #[argh(option, short = 't')]
    threads: Option<usize>,
    /// resolver for the queries that are not blocked
    #[argh(option, short = 'u')]
    upstream: Option<SocketAddr>,
    /// log filter used when RUST_LOG is not set [default: info]
    #[argh(option)]
    log_level: Option<String>,
}

fn main() {
    let args: DaemonArgs = argh::from_env();
    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "ERROR".red(), e);
        std::process::exit(1)
    }
}

fn run(args: &DaemonArgs) -> Result<(), DaemonError> {
    let config = Config::from_args(args)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let blocked = BlockSet::load(config.blocklist()?)?;
    info!("{} names blocked", blocked.len());

    let server = Server::new()
        .threads(config.threads)
        .bind(config.listen)
        .map_err(|source| DaemonError::Bind {
            addr: config.listen,
            source,
        })?;
    let forwarder = config.forwarder();
    match &forwarder {
        Some(forwarder) => info!("forwarding to {}", forwarder.upstream()),
        None => info!("no upstream, queries that are not blocked are dropped"),
    }
    info!("listening on {}", config.listen);

    Err(server.serve(blocked, forwarder).into())
}

/// Why the daemon stopped.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("could not read configuration file {}: {source}", .path.display())]
    ReadConfig { path: PathBuf, source: io::Error },
    #[error("could not parse configuration: {0}")]
    ParseConfig(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error(transparent)]
    BlockList(#[from] BlockListError),
    #[error("could not bind to {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error(transparent)]
    Serve(#[from] ServeError),
}
