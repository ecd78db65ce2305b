use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, builder::BoolishValueParser};
use shop_core::config::{ConfigError, ConfigSources};

const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";

/// Transport the MCP server is exposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "shop-mcpd", version, about = "Shop MCP daemon.")]
struct CliArgs {
    /// Path to a JSON stores configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Admin API access token for single-store mode.
    #[arg(long = "accessToken", visible_alias = "access-token", value_name = "TOKEN")]
    access_token: Option<String>,

    /// Store domain for single-store mode, e.g. my-store.myshopify.com.
    #[arg(long, value_name = "DOMAIN")]
    domain: Option<String>,

    #[arg(
        long,
        env = "SHOP_MCP_TRANSPORT",
        value_enum,
        default_value_t = Transport::Stdio
    )]
    transport: Transport,

    #[arg(long, env = "SHOP_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    http_addr: SocketAddr,

    #[arg(
        long,
        env = "SHOP_MCP_HTTP_STATEFUL",
        default_value_t = true,
        value_parser = BoolishValueParser::new()
    )]
    http_stateful: bool,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub transport: Transport,
    pub http_addr: SocketAddr,
    pub http_stateful: bool,
    pub store_sources: ConfigSources,
}

impl DaemonConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        let sources = ConfigSources::from_process_env()?;
        Ok(Self::from_parts(args, sources))
    }

    /// Store-source flags are merged into the environment-derived sources;
    /// they have no `env` fallback so source priority stays explicit.
    fn from_parts(args: CliArgs, sources: ConfigSources) -> Self {
        let store_sources = sources
            .with_config_path(args.config)
            .with_cli_flags(args.access_token, args.domain);
        Self {
            transport: args.transport,
            http_addr: args.http_addr,
            http_stateful: args.http_stateful,
            store_sources,
        }
    }
}
