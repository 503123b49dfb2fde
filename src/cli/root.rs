use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::cli::{dump, pipe, query, restore};
use crate::client::tcp;
use crate::config::{env, Initializer};
use crate::core::KeyFilter;
use crate::Result;

/// A collection of command line redis utils
#[derive(Parser, Debug)]
#[command(version, propagate_version = true, subcommand_required = true)]
pub struct RutilCommand {
    /// Client options
    #[command(flatten)]
    pub client: ClientOptions,
    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Client options
#[derive(Args, Debug, Default)]
pub struct ClientOptions {
    /// Redis host [default: 127.0.0.1]
    #[arg(long, short = 's', env = env::HOST, global = true)]
    pub host: Option<String>,
    /// Redis port [default: 6379]
    #[arg(long, short = 'p', env = env::PORT, global = true)]
    pub port: Option<u16>,
    /// ACL username
    #[arg(long, env = env::USERNAME, global = true)]
    pub username: Option<String>,
    /// Authentication password
    #[arg(
        long = "auth",
        short = 'a',
        env = env::PASSWORD,
        hide_env_values = true,
        global = true
    )]
    pub password: Option<String>,
    /// Database number to select
    #[arg(long, global = true)]
    pub db: Option<u32>,
    /// Connect over tls
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub tls: bool,
    /// Pem encoded CA certificates to verify the server with
    #[arg(long, global = true)]
    pub tls_ca_cert: Option<PathBuf>,
    /// Configuration file path
    #[arg(long, short = 'C', env = env::CONFIG_PATH, global = true)]
    pub config: Option<PathBuf>,
}

impl ClientOptions {
    // Split into the config file path and the values given on the command line.
    fn into_config(self) -> (Option<PathBuf>, tcp::Config) {
        let ClientOptions {
            mut host,
            port,
            mut username,
            mut password,
            db,
            tls,
            mut tls_ca_cert,
            config: config_path,
        } = self;

        let mut config = tcp::Config::default();
        config.set_host(&mut host);
        config.set_port(port);
        config.set_username(&mut username);
        config.set_password(&mut password);
        config.set_db(db);
        config.set_tls(tls.then_some(true));
        config.set_tls_ca_certificate(&mut tls_ca_cert);

        (config_path, config)
    }
}

/// Key selection
#[derive(Args, Debug)]
pub struct KeyOptions {
    /// Keys pattern (passed to redis 'keys' command)
    #[arg(long, short = 'k', default_value = "*")]
    pub keys: String,
    /// Regexp filter for key names
    #[arg(long = "match", short = 'm')]
    pub regex: Option<String>,
    /// Invert match regexp
    #[arg(long, short = 'v')]
    pub invert: bool,
}

impl KeyOptions {
    pub fn filter(&self) -> Result<KeyFilter> {
        KeyFilter::new(self.keys.as_str(), self.regex.as_deref(), self.invert)
    }
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dump redis database to a file
    Dump(dump::DumpCommand),
    /// Dump a redis database to stdout in a format compatible with | redis-cli --pipe
    Pipe(pipe::PipeCommand),
    /// Restore redis database from a file
    Restore(restore::RestoreCommand),
    /// Query keys matching the pattern provided by --keys
    #[command(visible_alias = "q")]
    Query(query::QueryCommand),
}

impl RutilCommand {
    pub async fn run(self) -> Result<()> {
        let RutilCommand { client, command } = self;
        let (config_path, client_config) = client.into_config();

        let mut initializer = match config_path {
            Some(path) => Initializer::load_config_file(path).await?,
            None => Initializer::default(),
        };
        initializer.override_client(client_config);

        match command {
            Command::Dump(dump) => dump.run(&initializer).await,
            Command::Pipe(pipe) => pipe.run(&initializer).await,
            Command::Restore(restore) => restore.run(&initializer).await,
            Command::Query(query) => query.run(&initializer).await,
        }
    }
}

/// Parse command line args
pub fn parse() -> RutilCommand {
    RutilCommand::parse()
}
