use clap::Args;

use crate::cli::KeyOptions;
use crate::config::Initializer;
use crate::core;
use crate::Result;

/// Dump a redis database to stdout in a format compatible with | redis-cli --pipe
#[derive(Args, Debug)]
pub struct PipeCommand {
    #[command(flatten)]
    pub keys: KeyOptions,
}

impl PipeCommand {
    pub async fn run(self, initializer: &Initializer) -> Result<()> {
        let filter = self.keys.filter()?;

        let mut client = initializer.connect().await?;
        let keys = filter.select(&mut client).await?;

        core::pipe(&mut client, &keys, tokio::io::stdout()).await?;

        Ok(())
    }
}
