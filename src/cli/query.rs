use clap::Args;

use crate::common::Error;
use crate::config::Initializer;
use crate::core::query::{self, QueryOptions};
use crate::core::KeyFilter;
use crate::Result;

/// Query keys matching the pattern provided by --keys
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Keys pattern (passed to redis 'keys' command)
    #[arg(long, short = 'k')]
    pub keys: Option<String>,
    /// Regexp filter for key names
    #[arg(long = "match", short = 'm')]
    pub regex: Option<String>,
    /// Invert match regexp
    #[arg(long, short = 'v')]
    pub invert: bool,
    /// Delete keys
    #[arg(long)]
    pub delete: bool,
    /// Print key values (no short flag, -p is the global --port)
    #[arg(long)]
    pub print: bool,
    /// Hash fields to print (default all)
    #[arg(long = "field", short = 'f')]
    pub fields: Vec<String>,
    /// Attempt to parse and pretty print strings as json
    #[arg(long, short = 'j')]
    pub json: bool,
}

impl QueryCommand {
    pub async fn run(self, initializer: &Initializer) -> Result<()> {
        let QueryCommand {
            keys,
            regex,
            invert,
            delete,
            print,
            fields,
            json,
        } = self;

        let pattern = match keys {
            Some(pattern) if !pattern.is_empty() => pattern,
            _ => return Err(Error::config("missing --keys pattern")),
        };
        let options = QueryOptions {
            delete,
            print,
            fields,
            json,
        };
        options.validate()?;
        let filter = KeyFilter::new(pattern, regex.as_deref(), invert)?;

        let mut client = initializer.connect().await?;
        let keys = filter.select(&mut client).await?;

        // Stdout takes its lock per write, nothing is held across awaits.
        let mut out = std::io::stdout();
        query::query(&mut client, &keys, &options, &mut out).await?;

        Ok(())
    }
}
