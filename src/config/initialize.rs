use std::path::Path;

use tokio::fs;

use crate::client::{tcp, Api};
use crate::common::{debug, Result};
use crate::config::Config;

#[derive(Debug, Default)]
pub struct Initializer {
    pub config: Config,
}

impl Initializer {
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub async fn load_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let f = fs::File::open(path.as_ref()).await?;
        let config = serde_yaml::from_reader::<_, Config>(f.into_std().await)?;
        debug!(path = %path.as_ref().display(), "Config file loaded");

        Ok(Self { config })
    }

    // Values given on the command line take precedence over the file.
    pub fn override_client(&mut self, mut client: tcp::Config) {
        self.config.client.override_merge(&mut client);
    }

    pub async fn connect(&self) -> Result<Box<dyn Api>> {
        tcp::connect(&self.config.client).await
    }
}
