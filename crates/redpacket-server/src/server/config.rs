use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use redpacket::ServiceConfig;

/// Runtime configuration for the `redpacket-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is honoured), with defaults suitable for a single node.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "redpacket-server",
    version,
    about = "An HTTP service for creating and claiming red packets"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Number of single-writer shard workers.
    ///
    /// Every packet is owned by shard `id % num_shards`. Unrelated packets on
    /// the same shard are served one after another, so more shards reduce
    /// contention. Must be a power of two.
    ///
    /// Environment variable: `NUM_SHARDS`
    #[arg(long, env = "NUM_SHARDS", default_value_t = redpacket::DEFAULT_NUM_SHARDS)]
    pub num_shards: usize,

    /// Milliseconds a claim request waits for its shard before giving up.
    /// `0` waits indefinitely.
    ///
    /// A timed-out claim may still consume a share.
    ///
    /// Environment variable: `CLAIM_TIMEOUT_MS`
    #[arg(long, env = "CLAIM_TIMEOUT_MS", default_value_t = 0)]
    pub claim_timeout_ms: u64,

    /// Seconds to wait for each shard to acknowledge shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub service: ServiceConfig,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.shutdown_timeout == 0 {
            bail!("SHUTDOWN_TIMEOUT must be greater than 0");
        }

        let service = ServiceConfig {
            num_shards: args.num_shards,
            claim_timeout: (args.claim_timeout_ms > 0)
                .then(|| Duration::from_millis(args.claim_timeout_ms)),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        };
        if let Err(e) = service.validate() {
            bail!("NUM_SHARDS: {e}");
        }

        Ok(Self {
            server_addr: args.server_addr,
            service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let cli = CliArgs::try_parse_from(
            std::iter::once("redpacket-server").chain(args.iter().copied()),
        )?;
        ServerConfig::try_from(cli)
    }

    #[test]
    fn timeout_flag_maps_to_duration() {
        let config = parse(&["--num-shards", "32", "--claim-timeout-ms", "250"]).unwrap();
        assert_eq!(config.service.num_shards, 32);
        assert_eq!(
            config.service.claim_timeout,
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.service.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(parse(&["--num-shards", "0"]).is_err());
        assert!(parse(&["--num-shards", "10"]).is_err());
        assert!(parse(&["--shutdown-timeout", "0"]).is_err());
    }
}
