//! Configuration related structures
use clap::Parser;
use derive_builder::Builder;
use getset::{CopyGetters, Getters};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf};

#[derive(Builder, Parser, CopyGetters, Getters, Clone, Deserialize, Serialize)]
#[builder(default, pattern = "owned", setter(into))]
#[serde(rename_all = "kebab-case")]
#[clap(about = "chatd - multi-user network chat service")]
/// Runtime configuration for the chat server
pub struct Config {
    #[get_copy = "pub"]
    #[clap(
        long("log-level"),
        env("CHATD_LOG_LEVEL"),
        default_value("info"),
        possible_values(&["trace", "debug", "info", "warn", "error", "off"]),
        value_name("LEVEL")
    )]
    /// The logging level of the application
    log_level: LevelFilter,

    #[get = "pub"]
    #[clap(
        long("listen-addr"),
        env("CHATD_LISTEN_ADDR"),
        default_value("127.0.0.1:4321")
    )]
    /// The address the server listens for client connections on
    listen_addr: SocketAddr,

    #[get = "pub"]
    #[clap(
        long("store-path"),
        env("CHATD_STORE_PATH"),
        default_value("./chatd-data")
    )]
    /// Directory backing the durable key-value store
    store_path: PathBuf,

    #[get = "pub"]
    #[clap(long("bin-path"), env("CHATD_BIN_PATH"), default_value(""))]
    /// Colon separated list of directories scanned for external commands
    bin_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn build_config() -> Result<()> {
        let c = ConfigBuilder::default()
            .log_level(LevelFilter::Warn)
            .listen_addr("127.0.0.1:9999".parse::<SocketAddr>()?)
            .store_path("/some/path")
            .bin_path("/bin:/usr/bin")
            .build()?;

        assert_eq!(c.log_level(), LevelFilter::Warn);
        assert_eq!(&c.store_path().display().to_string(), "/some/path");
        assert_eq!(c.bin_path(), "/bin:/usr/bin");

        Ok(())
    }
}
