//! Balanced multi-way partitioning of classified records.
//!
//! Each category is shuffled on its own and dealt round robin over the buckets in
//! their configured order. A category of `n` records over `b` buckets therefore gives
//! every bucket `n / b` records, plus one more for the first `n % b` buckets. Bucket
//! grand totals are sums of independently balanced categories and can differ by up to
//! the number of categories.

use crate::error::{Result, SplitterError};
use crate::schema::{validate_buckets, Category, Record, SplitterConfig};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

pub type RecordsByCategory = BTreeMap<Category, Vec<Record>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketAssignment {
    pub bucket: String,
    pub records: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketTally {
    pub bucket: String,
    pub counts: BTreeMap<Category, usize>,
    pub total: usize,
}

impl BucketTally {
    pub fn count(&self, category: Category) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }
}

/// Per-bucket counts, in bucket order. Always derived from an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub buckets: Vec<BucketTally>,
}

impl Tally {
    pub fn from_assignment(assignment: &[BucketAssignment]) -> Self {
        let buckets = assignment
            .iter()
            .map(|slot| {
                let mut counts: BTreeMap<Category, usize> =
                    Category::ALL.iter().map(|c| (*c, 0)).collect();

                for record in &slot.records {
                    if let Some(category) = record.category {
                        *counts.entry(category).or_insert(0) += 1;
                    }
                }

                BucketTally {
                    bucket: slot.bucket.clone(),
                    counts,
                    total: slot.records.len(),
                }
            })
            .collect();

        Self { buckets }
    }

    pub fn bucket(&self, name: &str) -> Option<&BucketTally> {
        self.buckets.iter().find(|b| b.bucket == name)
    }

    pub fn count(&self, bucket: &str, category: Category) -> usize {
        self.bucket(bucket).map(|b| b.count(category)).unwrap_or(0)
    }

    /// Counts of one category, in bucket order.
    pub fn category_counts(&self, category: Category) -> Vec<usize> {
        self.buckets.iter().map(|b| b.count(category)).collect()
    }

    pub fn category_total(&self, category: Category) -> usize {
        self.buckets.iter().map(|b| b.count(category)).sum()
    }

    pub fn grand_total(&self) -> usize {
        self.buckets.iter().map(|b| b.total).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub assignment: Vec<BucketAssignment>,
    pub tally: Tally,
}

impl Partition {
    pub fn records_for(&self, category: Category, bucket: &str) -> Vec<&Record> {
        self.assignment
            .iter()
            .filter(|slot| slot.bucket == bucket)
            .flat_map(|slot| slot.records.iter())
            .filter(|record| record.category == Some(category))
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.assignment.iter().map(|slot| slot.records.len()).sum()
    }
}

/// Groups classified records by category. Every category key is present, even when empty.
pub fn group_by_category(records: Vec<Record>) -> Result<RecordsByCategory> {
    let mut grouped: RecordsByCategory = Category::ALL.iter().map(|c| (*c, Vec::new())).collect();

    for (idx, record) in records.into_iter().enumerate() {
        let category = record
            .category
            .ok_or_else(|| SplitterError::ValidationError {
                record: idx,
                details: "record has no category".to_string(),
            })?;
        grouped.entry(category).or_default().push(record);
    }

    Ok(grouped)
}

pub struct BalancedPartitioner<'a> {
    buckets: &'a [String],
}

impl<'a> BalancedPartitioner<'a> {
    pub fn new(buckets: &'a [String]) -> Result<Self> {
        validate_buckets(buckets)?;
        Ok(Self { buckets })
    }

    pub fn from_config(config: &'a SplitterConfig) -> Result<Self> {
        Self::new(&config.buckets)
    }

    pub fn buckets(&self) -> &[String] {
        self.buckets
    }

    pub fn partition<R: Rng + ?Sized>(
        &self,
        records_by_category: RecordsByCategory,
        rng: &mut R,
    ) -> Result<Partition> {
        Self::validate_categories(&records_by_category)?;

        let bucket_count = self.buckets.len();
        let expected_total: usize = records_by_category.values().map(Vec::len).sum();

        let mut assignment: Vec<BucketAssignment> = self
            .buckets
            .iter()
            .map(|bucket| BucketAssignment {
                bucket: bucket.clone(),
                records: Vec::new(),
            })
            .collect();

        for (category, mut records) in records_by_category {
            records.shuffle(rng);

            debug!(
                "Dealing {} {} records over {} buckets ({} get an extra record)",
                records.len(),
                category,
                bucket_count,
                records.len() % bucket_count
            );

            for (idx, mut record) in records.into_iter().enumerate() {
                let slot = &mut assignment[idx % bucket_count];
                record.bucket = Some(slot.bucket.clone());
                slot.records.push(record);
            }
        }

        let tally = Tally::from_assignment(&assignment);

        if tally.grand_total() != expected_total {
            return Err(SplitterError::TallyMismatch(format!(
                "assigned {} records but received {}",
                tally.grand_total(),
                expected_total
            )));
        }

        Ok(Partition { assignment, tally })
    }

    pub fn verify_balance(&self, tally: &Tally) -> Result<()> {
        for bucket in self.buckets {
            if tally.bucket(bucket).is_none() {
                return Err(SplitterError::TallyMismatch(format!(
                    "bucket '{}' missing from tally",
                    bucket
                )));
            }
        }

        verify_balance(tally)
    }

    fn validate_categories(records_by_category: &RecordsByCategory) -> Result<()> {
        for (category, records) in records_by_category {
            for (idx, record) in records.iter().enumerate() {
                match record.category {
                    None => {
                        return Err(SplitterError::ValidationError {
                            record: idx,
                            details: format!("record in {} group has no category", category),
                        });
                    }
                    Some(actual) if actual != *category => {
                        return Err(SplitterError::ValidationError {
                            record: idx,
                            details: format!(
                                "record classified as {} was submitted in the {} group",
                                actual, category
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}

pub fn partition<R: Rng + ?Sized>(
    records_by_category: RecordsByCategory,
    buckets: &[String],
    rng: &mut R,
) -> Result<Partition> {
    let partitioner = BalancedPartitioner::new(buckets)?;
    partitioner.partition(records_by_category, rng)
}

/// Checks the per-category spread and the per-bucket totals of a tally.
pub fn verify_balance(tally: &Tally) -> Result<()> {
    for bucket in &tally.buckets {
        let summed: usize = bucket.counts.values().sum();
        if summed != bucket.total {
            return Err(SplitterError::TallyMismatch(format!(
                "bucket '{}' total {} does not match category sum {}",
                bucket.bucket, bucket.total, summed
            )));
        }
    }

    for category in Category::ALL {
        let smallest = tally.buckets.iter().min_by_key(|b| b.count(category));
        let largest = tally.buckets.iter().max_by_key(|b| b.count(category));

        if let (Some(smallest), Some(largest)) = (smallest, largest) {
            if largest.count(category) - smallest.count(category) > 1 {
                return Err(SplitterError::BalanceViolation {
                    category: category.label().to_string(),
                    first: largest.bucket.clone(),
                    first_count: largest.count(category),
                    second: smallest.bucket.clone(),
                    second_count: smallest.count(category),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn buckets() -> Vec<String> {
        ["arun", "assaf", "chen", "leigh", "meirav"]
            .iter()
            .map(|b| b.to_string())
            .collect()
    }

    fn records(category: Category, count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| {
                Record::new(vec![("Name".to_string(), format!("{:?}-{}", category, i))])
                    .with_category(category)
            })
            .collect()
    }

    #[test]
    fn test_remainder_goes_to_leading_buckets() {
        let mut grouped = RecordsByCategory::new();
        grouped.insert(Category::Ops, records(Category::Ops, 7));

        let mut rng = StdRng::seed_from_u64(7);
        let result = partition(grouped, &buckets(), &mut rng).unwrap();

        assert_eq!(
            result.tally.category_counts(Category::Ops),
            vec![2, 2, 1, 1, 1]
        );
        assert_eq!(result.tally.grand_total(), 7);
    }

    #[test]
    fn test_records_are_stamped_with_bucket() {
        let mut grouped = RecordsByCategory::new();
        grouped.insert(Category::Pm, records(Category::Pm, 6));

        let mut rng = StdRng::seed_from_u64(1);
        let result = partition(grouped, &buckets(), &mut rng).unwrap();

        for slot in &result.assignment {
            for record in &slot.records {
                assert_eq!(record.bucket.as_deref(), Some(slot.bucket.as_str()));
            }
        }
        assert_eq!(result.records_for(Category::Pm, "arun").len(), 2);
        assert_eq!(result.records_for(Category::Pm, "meirav").len(), 1);
    }

    #[test]
    fn test_empty_input() {
        let grouped = group_by_category(Vec::new()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let result = partition(grouped, &buckets(), &mut rng).unwrap();

        assert_eq!(result.assignment.len(), 5);
        assert_eq!(result.total_records(), 0);
        for bucket in &result.tally.buckets {
            assert_eq!(bucket.total, 0);
            assert!(bucket.counts.values().all(|&c| c == 0));
        }
    }

    #[test]
    fn test_empty_buckets_is_configuration_error() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = partition(RecordsByCategory::new(), &[], &mut rng);
        assert!(matches!(result, Err(SplitterError::ConfigurationError(_))));
    }

    #[test]
    fn test_unclassified_record_is_validation_error() {
        let mut grouped = RecordsByCategory::new();
        let mut ops = records(Category::Ops, 3);
        ops.push(Record::new(vec![("Name".to_string(), "x".to_string())]));
        grouped.insert(Category::Ops, ops);

        let mut rng = StdRng::seed_from_u64(0);
        let result = partition(grouped, &buckets(), &mut rng);
        assert!(matches!(
            result,
            Err(SplitterError::ValidationError { record: 3, .. })
        ));
    }

    #[test]
    fn test_group_by_category_rejects_unclassified() {
        let mut input = records(Category::Pm, 2);
        input.push(Record::new(Vec::new()));

        let result = group_by_category(input);
        assert!(matches!(
            result,
            Err(SplitterError::ValidationError { record: 2, .. })
        ));
    }

    #[test]
    fn test_misfiled_record_is_validation_error() {
        let mut grouped = RecordsByCategory::new();
        grouped.insert(Category::Pm, records(Category::Ops, 1));

        let mut rng = StdRng::seed_from_u64(0);
        let result = partition(grouped, &buckets(), &mut rng);
        assert!(matches!(result, Err(SplitterError::ValidationError { .. })));
    }

    #[test]
    fn test_same_seed_same_assignment() {
        let build = || {
            let mut input = records(Category::Ops, 23);
            input.extend(records(Category::OpexCi, 9));
            input.extend(records(Category::Pm, 4));
            group_by_category(input).unwrap()
        };

        let first = partition(build(), &buckets(), &mut StdRng::seed_from_u64(99)).unwrap();
        let second = partition(build(), &buckets(), &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_verify_balance_accepts_partition() {
        let mut input = records(Category::Ops, 13);
        input.extend(records(Category::OpexCi, 8));
        input.extend(records(Category::Pm, 2));
        let grouped = group_by_category(input).unwrap();

        let buckets = buckets();
        let partitioner = BalancedPartitioner::new(&buckets).unwrap();
        let result = partitioner
            .partition(grouped, &mut StdRng::seed_from_u64(3))
            .unwrap();

        assert!(partitioner.verify_balance(&result.tally).is_ok());
        // Grand totals stay within the number of categories.
        let totals: Vec<usize> = result.tally.buckets.iter().map(|b| b.total).collect();
        let spread = totals.iter().max().unwrap() - totals.iter().min().unwrap();
        assert!(spread <= Category::ALL.len());
    }

    #[test]
    fn test_verify_balance_detects_violation() {
        let mut assignment = vec![
            BucketAssignment {
                bucket: "a".to_string(),
                records: records(Category::Ops, 3),
            },
            BucketAssignment {
                bucket: "b".to_string(),
                records: records(Category::Ops, 1),
            },
        ];
        let tally = Tally::from_assignment(&assignment);

        match verify_balance(&tally) {
            Err(SplitterError::BalanceViolation {
                first, second, ..
            }) => {
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("expected BalanceViolation, got {:?}", other),
        }

        assignment[0].records.pop();
        assert!(verify_balance(&Tally::from_assignment(&assignment)).is_ok());
    }
}
