mod initialize;
pub use initialize::Initializer;

mod config;
pub use config::Config;

pub mod env {
    pub const LOG_DIRECTIVE: &str = "RUTIL_LOG";
    pub const CONFIG_PATH: &str = "RUTIL_CONFIG";
    pub const HOST: &str = "RUTIL_HOST";
    pub const PORT: &str = "RUTIL_PORT";
    pub const USERNAME: &str = "RUTIL_USERNAME";
    pub const PASSWORD: &str = "RUTIL_PASSWORD";
}
