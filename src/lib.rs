//! # Prospect Splitter
//!
//! Splits a daily prospect CSV across a fixed set of outreach accounts.
//!
//! ## Core Concepts
//!
//! - **Category**: every prospect is classified as PM, OPEX/CI or OPS from its job title,
//!   using ordered, case-insensitive substring rules (see [`classifier`]). The short
//!   keyword `ci` matches inside unrelated words, so some titles land in OPEX/CI by accident.
//! - **Bucket**: an outreach account. The configured order is significant: when a category
//!   does not divide evenly, the leading accounts get the extra prospect.
//! - **Partition**: each category is shuffled and dealt round robin over the buckets, so every
//!   account's share of a category differs from any other's by at most one.
//! - **Tally**: per-account counts derived from the partition.
//!
//! ## Example
//!
//! ```rust,ignore
//! use prospect_splitter::*;
//!
//! let config = SplitterConfig { seed: Some(7), ..SplitterConfig::default() };
//! let result = process_file("prospects.csv", &config)?;
//!
//! println!("{}", result.summary().to_text());
//! result.write_outputs("out", true)?;
//! ```

pub mod classifier;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod partitioner;
pub mod schema;
pub mod summary;

pub use classifier::{classify, Classifier, KeywordRule};
pub use error::{Result, SplitterError};
pub use export::{
    archive_file_name, build_archive, output_units, unit_name, write_archive,
    write_output_units, OutputUnit,
};
pub use ingestion::{load_prospects, read_prospects, read_prospects_with, ProspectTable};
pub use partitioner::{
    group_by_category, partition, verify_balance, BalancedPartitioner, BucketAssignment,
    BucketTally, Partition, RecordsByCategory, Tally,
};
pub use schema::*;
pub use summary::SplitSummary;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use std::path::{Path, PathBuf};

/// Outcome of one split: the partition plus what is needed to render it.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub base_name: String,
    pub headers: Vec<String>,
    pub partition: Partition,
}

impl SplitResult {
    pub fn tally(&self) -> &Tally {
        &self.partition.tally
    }

    pub fn output_units(&self) -> Vec<OutputUnit<'_>> {
        output_units(&self.partition, &self.base_name)
    }

    pub fn summary(&self) -> SplitSummary {
        SplitSummary::from_tally(&self.partition.tally, &self.base_name)
    }

    pub fn build_archive(&self) -> Result<Vec<u8>> {
        build_archive(&self.output_units(), &self.headers)
    }

    /// Writes one CSV per non-empty (category, account) pair, and the zip when asked.
    pub fn write_outputs(&self, dir: impl AsRef<Path>, with_archive: bool) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let units = self.output_units();

        let mut written = write_output_units(&units, &self.headers, dir)?;
        if with_archive {
            written.push(write_archive(&units, &self.headers, dir, &self.base_name)?);
        }

        Ok(written)
    }
}

pub struct ProspectSplitter;

impl ProspectSplitter {
    pub fn split<R: Rng + ?Sized>(
        table: ProspectTable,
        config: &SplitterConfig,
        base_name: String,
        rng: &mut R,
    ) -> Result<SplitResult> {
        config.validate()?;

        info!(
            "Splitting {} prospects across {} accounts",
            table.records.len(),
            config.buckets.len()
        );

        let grouped = group_by_category(table.records)?;
        for (category, records) in &grouped {
            debug!("{}: {} prospects", category, records.len());
        }

        let partitioner = BalancedPartitioner::from_config(config)?;
        let partition = partitioner.partition(grouped, rng)?;
        partitioner.verify_balance(&partition.tally)?;

        for bucket in &partition.tally.buckets {
            debug!("{}: {} prospects", bucket.bucket, bucket.total);
        }

        Ok(SplitResult {
            base_name,
            headers: table.headers,
            partition,
        })
    }

    /// Uses the configured seed when present, otherwise a fresh thread-local RNG.
    pub fn split_with_config(
        table: ProspectTable,
        config: &SplitterConfig,
        base_name: String,
    ) -> Result<SplitResult> {
        match config.seed {
            Some(seed) => {
                debug!("Using seeded shuffle ({})", seed);
                Self::split(table, config, base_name, &mut StdRng::seed_from_u64(seed))
            }
            None => Self::split(table, config, base_name, &mut thread_rng()),
        }
    }
}

pub fn split_prospects(table: ProspectTable, config: &SplitterConfig) -> Result<SplitResult> {
    let base_name = config.resolve_base_name(None);
    ProspectSplitter::split_with_config(table, config, base_name)
}

pub fn process_file(path: impl AsRef<Path>, config: &SplitterConfig) -> Result<SplitResult> {
    let path = path.as_ref();
    config.validate()?;

    let table = load_prospects(path, config)?;
    let base_name = config.resolve_base_name(Some(path));
    ProspectSplitter::split_with_config(table, config, base_name)
}
