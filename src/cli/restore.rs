use std::path::PathBuf;

use clap::Args;
use tokio::fs;
use tokio::io::AsyncRead;

use crate::common::{debug, Error};
use crate::config::Initializer;
use crate::core::{RestoreEngine, RestoreOptions};
use crate::Result;

/// Restore redis database from a file
#[derive(Args, Debug)]
pub struct RestoreCommand {
    /// Dump file path
    #[arg()]
    pub path: Option<PathBuf>,
    /// Pretend to restore
    #[arg(long, short = 'r')]
    pub dry_run: bool,
    /// Flush the database before restoring
    #[arg(long, short = 'f')]
    pub flushdb: bool,
    /// Delete key before restoring
    #[arg(long, short = 'd')]
    pub delete: bool,
    /// Ignore BUSYKEY restore errors
    #[arg(long, short = 'g')]
    pub ignore: bool,
    /// Read dump from STDIN
    #[arg(long, short = 'i')]
    pub stdin: bool,
}

impl RestoreCommand {
    pub async fn run(self, initializer: &Initializer) -> Result<()> {
        let options = self.options();
        options.validate()?;
        let path = self.source()?;

        let (name, source): (String, Box<dyn AsyncRead + Unpin + Send>) = match path {
            Some(path) => (
                path.display().to_string(),
                Box::new(fs::File::open(&path).await?),
            ),
            None => ("STDIN".to_owned(), Box::new(tokio::io::stdin())),
        };

        debug!(?options, "Restore from {}", name);

        let mut client = initializer.connect().await?;
        let outcome = RestoreEngine::new(&mut client, options)?.run(source).await;

        println!("file: {}, keys: {}", name, outcome.counts.restored);

        outcome.into_result().map(|_| ())
    }

    fn options(&self) -> RestoreOptions {
        RestoreOptions {
            dry_run: self.dry_run,
            flush_before_all: self.flushdb,
            delete_before_each: self.delete,
            ignore_conflict: self.ignore,
        }
    }

    // None means stdin.
    fn source(&self) -> Result<Option<PathBuf>> {
        match (&self.path, self.stdin) {
            (None, false) => Err(Error::config("no file name provided")),
            (Some(_), true) => Err(Error::config("can't use --stdin with filename")),
            (Some(path), false) => Ok(Some(path.clone())),
            (None, true) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Command, RutilCommand};
    use clap::Parser;

    fn restore(args: &[&str]) -> RestoreCommand {
        let args = ["rutil", "restore"].iter().chain(args.iter());
        match RutilCommand::try_parse_from(args).unwrap().command {
            Command::Restore(restore) => restore,
            command => panic!("{:?}", command),
        }
    }

    #[test]
    fn source() {
        assert_eq!(
            restore(&["dump.rdmp"]).source().unwrap(),
            Some(PathBuf::from("dump.rdmp"))
        );
        assert_eq!(restore(&["--stdin"]).source().unwrap(), None);
        assert!(restore(&[]).source().unwrap_err().is_config());
        assert!(restore(&["-i", "dump.rdmp"])
            .source()
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn options() {
        let options = restore(&["-r", "-d", "-g", "x"]).options();
        assert_eq!(
            options,
            RestoreOptions {
                dry_run: true,
                flush_before_all: false,
                delete_before_each: true,
                ignore_conflict: true,
            }
        );
        assert!(restore(&["-f", "-d", "x"])
            .options()
            .validate()
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn conflicting_flags_fail_before_connecting() {
        tokio_test::block_on(async move {
            // nothing listens on this port, the error has to come from validation.
            let mut initializer = Initializer::default();
            let mut config = crate::client::tcp::Config::default();
            config.set_port(Some(1));
            initializer.override_client(config);

            let err = restore(&["-f", "-d", "x"])
                .run(&initializer)
                .await
                .unwrap_err();
            assert!(err.is_config());
        })
    }
}
