use tokio::io::{AsyncRead, BufReader};

use crate::client::Api;
use crate::common::{debug, info, warn, Error, Result};
use crate::core::codec::{self, KeyDump};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOptions {
    // Parse the whole input without sending anything to the store.
    pub dry_run: bool,
    // FLUSHDB once before the first record.
    pub flush_before_all: bool,
    // DEL each key right before restoring it.
    pub delete_before_each: bool,
    // Skip keys that already exist instead of failing.
    pub ignore_conflict: bool,
}

impl RestoreOptions {
    pub fn validate(&self) -> Result<()> {
        if self.flush_before_all && self.delete_before_each {
            return Err(Error::config("flush or delete?"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreCounts {
    // record count from the header.
    pub records: u64,
    // records read from the input.
    pub processed: u64,
    // keys restored.
    pub restored: u64,
    // existing keys skipped with ignore_conflict.
    pub conflicts: u64,
}

// Result of a restore run. records before `error` are already committed to the store.
#[derive(Debug)]
pub struct RestoreOutcome {
    pub counts: RestoreCounts,
    pub error: Option<Error>,
}

impl RestoreOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<RestoreCounts> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.counts),
        }
    }
}

// RestoreEngine replays a dump file against the store, one record at a time.
// the next record is read only after the previous one's commands completed.
pub struct RestoreEngine<'a, C: ?Sized> {
    client: &'a mut C,
    options: RestoreOptions,
}

impl<'a, C> RestoreEngine<'a, C>
where
    C: Api + ?Sized,
{
    // Reject conflicting options before anything is sent to the store.
    pub fn new(client: &'a mut C, options: RestoreOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { client, options })
    }

    // Run until every record is restored or the first fatal error.
    pub async fn run<R: AsyncRead + Unpin>(&mut self, source: R) -> RestoreOutcome {
        let mut counts = RestoreCounts::default();
        let error = self.restore_all(source, &mut counts).await.err();

        match &error {
            None => info!(
                records = counts.records,
                restored = counts.restored,
                conflicts = counts.conflicts,
                dry_run = self.options.dry_run,
                "Restore completed"
            ),
            Some(err) => warn!(
                processed = counts.processed,
                restored = counts.restored,
                "Restore aborted. {}",
                err
            ),
        }

        RestoreOutcome { counts, error }
    }

    async fn restore_all<R: AsyncRead + Unpin>(
        &mut self,
        source: R,
        counts: &mut RestoreCounts,
    ) -> Result<()> {
        let mut source = BufReader::new(source);

        let header = codec::read_header(&mut source).await?;
        counts.records = header.record_count;
        debug!(records = header.record_count, "Header read");

        if self.options.flush_before_all && !self.options.dry_run {
            self.client.flush_db().await?;
            info!("Database flushed");
        }

        for i in 0..header.record_count {
            let dump = codec::read_record(&mut source, i, header.record_count).await?;
            counts.processed += 1;

            if self.options.dry_run {
                let key = String::from_utf8_lossy(&dump.key);
                debug!(%key, ttl_ms = dump.ttl_ms, "Dry run");
                continue;
            }

            self.restore_one(&dump, counts)
                .await
                .map_err(|(operation, err)| {
                    err.for_key(operation, &dump.key, i + 1, header.record_count)
                })?;
        }

        Ok(())
    }

    // Err carries the command that failed.
    async fn restore_one(
        &mut self,
        dump: &KeyDump,
        counts: &mut RestoreCounts,
    ) -> Result<(), (&'static str, Error)> {
        let key = String::from_utf8_lossy(&dump.key);

        if self.options.delete_before_each {
            // a missing key is fine.
            self.client
                .delete(&dump.key)
                .await
                .map_err(|err| ("DEL", err))?;
        }

        match self
            .client
            .restore(&dump.key, dump.ttl_ms, &dump.payload)
            .await
        {
            Ok(()) => {
                debug!(%key, ttl_ms = dump.ttl_ms, "Key restored");
                counts.restored += 1;
                Ok(())
            }
            Err(err) if err.is_busy_key() && self.options.ignore_conflict => {
                warn!(%key, "Key already exists, skipped");
                counts.conflicts += 1;
                Ok(())
            }
            Err(err) => Err(("RESTORE", err)),
        }
    }
}
