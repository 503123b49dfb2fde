use serde::Deserialize;

use crate::client::tcp;

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub client: tcp::Config,
}
