//! Command-line argument parsing for NimbusData.
//!
//! Every option can also be set through the environment (including a `.env`
//! file, which is loaded before parsing).

use clap::Parser;
use nimbusdata::error::{NimbusError, Result};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// HTTP data gateway over a relational store.
#[derive(Parser, Debug)]
#[command(name = "nimbusdata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "NIMBUS_HOST", value_name = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'p', long, env = "NIMBUS_PORT", value_name = "PORT", default_value = "8000")]
    pub port: u16,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            NimbusError::config(format!("Invalid listen address '{}'", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
