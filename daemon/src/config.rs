// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use sinkhole::UpstreamForwarder;

use crate::{DaemonArgs, DaemonError};

/// Daemon configuration, read from a TOML file and then overridden from the command line.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Address of the listening socket.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Number of listener threads.
    #[serde(default = "num_cpus::get")]
    pub threads: usize,
    /// Block list file.
    pub blocklist: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Where queries that are not blocked go. Dropped if absent.
    pub upstream: Option<UpstreamConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    pub address: SocketAddr,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_attempts")]
    pub attempts: u8,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen: default_listen(),
            threads: num_cpus::get(),
            blocklist: None,
            log_level: default_log_level(),
            upstream: None,
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 5], 53))
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_timeout_ms() -> u64 {
    2000
}

const fn default_attempts() -> u8 {
    2
}

const fn default_max_in_flight() -> usize {
    256
}

impl Config {
    /// Build the configuration of a run: the file given with `--config`, if any, and then
    /// every flag given on the command line.
    pub fn from_args(args: &DaemonArgs) -> Result<Self, DaemonError> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply(args);
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path).map_err(|source| DaemonError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse a configuration from TOML.
    pub fn parse(content: &str) -> Result<Self, DaemonError> {
        Ok(toml::from_str(content)?)
    }

    fn apply(&mut self, args: &DaemonArgs) {
        if let Some(listen) = args.listen {
            self.listen = listen;
        }
        if let Some(threads) = args.threads {
            self.threads = threads;
        }
        if let Some(blocklist) = &args.blocklist {
            self.blocklist = Some(blocklist.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        if let Some(address) = args.upstream {
            match &mut self.upstream {
                Some(upstream) => upstream.address = address,
                None => {
                    self.upstream = Some(UpstreamConfig {
                        address,
                        timeout_ms: default_timeout_ms(),
                        attempts: default_attempts(),
                        max_in_flight: default_max_in_flight(),
                    })
                }
            }
        }
    }

    fn validate(&self) -> Result<(), DaemonError> {
        if self.threads == 0 {
            return Err(DaemonError::Invalid("threads must be > 0".into()));
        }
        if self.blocklist.is_none() {
            return Err(DaemonError::Invalid(
                "no block list given, use --blocklist or the blocklist key".into(),
            ));
        }
        if let Some(upstream) = &self.upstream {
            if upstream.timeout_ms == 0 {
                return Err(DaemonError::Invalid("upstream.timeout_ms must be > 0".into()));
            }
            if upstream.attempts == 0 {
                return Err(DaemonError::Invalid("upstream.attempts must be > 0".into()));
            }
            if upstream.max_in_flight == 0 {
                return Err(DaemonError::Invalid(
                    "upstream.max_in_flight must be > 0".into(),
                ));
            }
        }
        Ok(())
    }

    /// The block list file. Always present once validated.
    pub fn blocklist(&self) -> Result<&Path, DaemonError> {
        self.blocklist
            .as_deref()
            .ok_or_else(|| DaemonError::Invalid("no block list given".into()))
    }

    /// The forwarder for queries that are not blocked.
    pub fn forwarder(&self) -> Option<UpstreamForwarder> {
        self.upstream.as_ref().map(|upstream| {
            UpstreamForwarder::new(upstream.address)
                .timeout(Duration::from_millis(upstream.timeout_ms))
                .attempts(upstream.attempts)
                .max_in_flight(upstream.max_in_flight)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> DaemonArgs {
        DaemonArgs {
            config: None,
            blocklist: None,
            listen: None,
            threads: None,
            upstream: None,
            log_level: None,
        }
    }

    #[test]
    fn parse_full() {
        let config = Config::parse(
            r#"
            listen = "127.0.0.1:5353"
            threads = 3
            blocklist = "/etc/sinkhole/blocked.txt"
            log_level = "debug"

            [upstream]
            address = "1.1.1.1:53"
            timeout_ms = 500
            attempts = 4
            max_in_flight = 32
            "#,
        )
        .unwrap();

        assert_eq!(config.listen, "127.0.0.1:5353".parse().unwrap());
        assert_eq!(config.threads, 3);
        assert_eq!(
            config.blocklist.as_deref(),
            Some(Path::new("/etc/sinkhole/blocked.txt"))
        );
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.upstream,
            Some(UpstreamConfig {
                address: "1.1.1.1:53".parse().unwrap(),
                timeout_ms: 500,
                attempts: 4,
                max_in_flight: 32,
            })
        );
    }

    #[test]
    fn parse_defaults() {
        let config = Config::parse(r#"blocklist = "blocked.txt""#).unwrap();

        assert_eq!(config.listen, "127.0.0.5:53".parse().unwrap());
        assert_eq!(config.threads, num_cpus::get());
        assert_eq!(config.log_level, "info");
        assert!(config.upstream.is_none());
        assert!(config.forwarder().is_none());
    }

    #[test]
    fn upstream_defaults() {
        let config = Config::parse(
            r#"
            [upstream]
            address = "9.9.9.9:53"
            "#,
        )
        .unwrap();

        let upstream = config.upstream.unwrap();
        assert_eq!(upstream.timeout_ms, 2000);
        assert_eq!(upstream.attempts, 2);
        assert_eq!(upstream.max_in_flight, 256);
    }

    #[test]
    fn reject_unknown_and_bad_values() {
        assert!(matches!(
            Config::parse("blocklst = \"typo.txt\""),
            Err(DaemonError::ParseConfig(_))
        ));
        assert!(matches!(
            Config::parse("listen = \"not an address\""),
            Err(DaemonError::ParseConfig(_))
        ));
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen = \"127.0.0.1:5353\"").unwrap();
        writeln!(file, "threads = 2").unwrap();
        writeln!(file, "blocklist = \"from-file.txt\"").unwrap();
        writeln!(file, "[upstream]").unwrap();
        writeln!(file, "address = \"1.1.1.1:53\"").unwrap();
        writeln!(file, "timeout_ms = 700").unwrap();

        let args = DaemonArgs {
            config: Some(file.path().to_path_buf()),
            threads: Some(6),
            upstream: Some("8.8.8.8:53".parse().unwrap()),
            ..args()
        };
        let config = Config::from_args(&args).unwrap();

        assert_eq!(config.listen, "127.0.0.1:5353".parse().unwrap());
        assert_eq!(config.threads, 6);
        assert_eq!(config.blocklist().unwrap(), Path::new("from-file.txt"));
        let upstream = config.upstream.unwrap();
        assert_eq!(upstream.address, "8.8.8.8:53".parse().unwrap());
        assert_eq!(upstream.timeout_ms, 700);
    }

    #[test]
    fn flags_without_file() {
        let args = DaemonArgs {
            blocklist: Some("blocked.txt".into()),
            upstream: Some("8.8.8.8:53".parse().unwrap()),
            log_level: Some("warn".into()),
            ..args()
        };
        let config = Config::from_args(&args).unwrap();

        assert_eq!(config.listen, "127.0.0.5:53".parse().unwrap());
        assert_eq!(config.log_level, "warn");
        let forwarder = config.forwarder().unwrap();
        assert_eq!(forwarder.upstream(), "8.8.8.8:53".parse().unwrap());
    }

    #[test]
    fn reject_zero_threads() {
        let args = DaemonArgs {
            blocklist: Some("blocked.txt".into()),
            threads: Some(0),
            ..args()
        };
        assert!(matches!(
            Config::from_args(&args),
            Err(DaemonError::Invalid(_))
        ));
    }

    #[test]
    fn require_blocklist() {
        assert!(matches!(
            Config::from_args(&args()),
            Err(DaemonError::Invalid(_))
        ));
    }

    #[test]
    fn reject_zero_timeout() {
        let mut config = Config::parse(
            r#"
            blocklist = "blocked.txt"
            [upstream]
            address = "1.1.1.1:53"
            timeout_ms = 0
            "#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(DaemonError::Invalid(_))));

        if let Some(upstream) = config.upstream.as_mut() {
            upstream.timeout_ms = 100;
            upstream.max_in_flight = 0;
        }
        assert!(matches!(config.validate(), Err(DaemonError::Invalid(_))));

        config.upstream = None;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sinkhole.toml");
        match Config::load(&path) {
            Err(DaemonError::ReadConfig { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected a read error, got {other:?}"),
        }
    }
}
