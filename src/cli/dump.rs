use std::path::PathBuf;

use clap::Args;
use tokio::fs;

use crate::cli::KeyOptions;
use crate::common::{debug, Error};
use crate::config::Initializer;
use crate::core;
use crate::Result;

/// Dump redis database to a file
#[derive(Args, Debug)]
pub struct DumpCommand {
    /// Dump file path
    #[arg()]
    pub path: Option<PathBuf>,
    /// Make up a file name for the dump - redisYYYYMMDDHHMMSS.rdmp
    #[arg(long)]
    pub auto: bool,
    #[command(flatten)]
    pub keys: KeyOptions,
}

impl DumpCommand {
    pub async fn run(self, initializer: &Initializer) -> Result<()> {
        let path = self.file_name()?;
        let filter = self.keys.filter()?;

        let mut client = initializer.connect().await?;
        let keys = filter.select(&mut client).await?;

        debug!("Dump {} keys to {}", keys.len(), path.display());

        let file = fs::File::create(&path).await?;
        let summary = core::dump(&mut client, &keys, file).await?;

        println!(
            "file: {}, keys: {}, expired: {}, bytes: {}",
            path.display(),
            summary.keys,
            summary.expired,
            summary.bytes
        );

        Ok(())
    }

    fn file_name(&self) -> Result<PathBuf> {
        match (&self.path, self.auto) {
            (None, false) => Err(Error::config("provide a file name or --auto")),
            (Some(_), true) => Err(Error::config(
                "you can't provide a name and use --auto at the same time",
            )),
            (Some(path), false) => Ok(path.clone()),
            (None, true) => Ok(PathBuf::from(auto_file_name(chrono::Local::now()))),
        }
    }
}

fn auto_file_name<Tz>(now: chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("redis{}.rdmp", now.format("%Y%m%d%H%M%S"))
}
