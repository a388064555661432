use crate::error::{Result, SplitterError};
use crate::partitioner::{BucketTally, Tally};
use crate::schema::Category;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub base_name: String,
    pub generated_on: NaiveDate,
    pub total: usize,
    pub category_totals: BTreeMap<Category, usize>,
    pub buckets: Vec<BucketTally>,
}

impl SplitSummary {
    pub fn from_tally(tally: &Tally, base_name: &str) -> Self {
        Self::from_tally_on(tally, base_name, Local::now().date_naive())
    }

    pub fn from_tally_on(tally: &Tally, base_name: &str, generated_on: NaiveDate) -> Self {
        let category_totals = Category::ALL
            .iter()
            .map(|c| (*c, tally.category_total(*c)))
            .collect();

        Self {
            base_name: base_name.to_string(),
            generated_on,
            total: tally.grand_total(),
            category_totals,
            buckets: tally.buckets.clone(),
        }
    }

    pub fn category_total(&self, category: Category) -> usize {
        self.category_totals.get(&category).copied().unwrap_or(0)
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "{} ({}): {} prospects\n",
            self.base_name, self.generated_on, self.total
        ));
        for category in Category::ALL {
            output.push_str(&format!(
                "  {:<8} {}\n",
                category.label(),
                self.category_total(category)
            ));
        }
        output.push('\n');

        let width = self
            .buckets
            .iter()
            .map(|b| b.bucket.chars().count())
            .chain(std::iter::once("Account".len()))
            .max()
            .unwrap_or(0);

        output.push_str(&format!("{:<width$}", "Account", width = width));
        for category in Category::ALL {
            output.push_str(&format!(" {:>8}", category.label()));
        }
        output.push_str(&format!(" {:>8}\n", "Total"));

        for bucket in &self.buckets {
            output.push_str(&format!("{:<width$}", bucket.bucket, width = width));
            for category in Category::ALL {
                output.push_str(&format!(" {:>8}", bucket.count(category)));
            }
            output.push_str(&format!(" {:>8}\n", bucket.total));
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# Prospect Split - {}\n\n", self.base_name));
        output.push_str(&format!("**Generated:** {}\n\n", self.generated_on));
        output.push_str(&format!("**Total prospects:** {}\n\n", self.total));

        output.push_str("## Categories\n\n");
        for category in Category::ALL {
            output.push_str(&format!(
                "- {}: {}\n",
                category.label(),
                self.category_total(category)
            ));
        }
        output.push('\n');

        output.push_str("## Accounts\n\n");
        output.push_str("| Account |");
        for category in Category::ALL {
            output.push_str(&format!(" {} |", category.label()));
        }
        output.push_str(" Total |\n");

        output.push_str("|---|");
        for _ in Category::ALL {
            output.push_str("---:|");
        }
        output.push_str("---:|\n");

        for bucket in &self.buckets {
            output.push_str(&format!("| {} |", bucket.bucket));
            for category in Category::ALL {
                output.push_str(&format!(" {} |", bucket.count(category)));
            }
            output.push_str(&format!(" {} |\n", bucket.total));
        }

        output
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let mut header = vec!["Account".to_string()];
        header.extend(Category::ALL.iter().map(|c| c.label().to_string()));
        header.push("Total".to_string());
        writer.write_record(&header)?;

        for bucket in &self.buckets {
            let mut row = vec![bucket.bucket.clone()];
            row.extend(Category::ALL.iter().map(|c| bucket.count(*c).to_string()));
            row.push(bucket.total.to_string());
            writer.write_record(&row)?;
        }

        let mut totals = vec!["All".to_string()];
        totals.extend(
            Category::ALL
                .iter()
                .map(|c| self.category_total(*c).to_string()),
        );
        totals.push(self.total.to_string());
        writer.write_record(&totals)?;

        let bytes = writer
            .into_inner()
            .map_err(|e| SplitterError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            SplitterError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::BucketAssignment;
    use crate::schema::Record;

    fn sample_tally() -> Tally {
        let record = |category| Record::new(Vec::new()).with_category(category);
        Tally::from_assignment(&[
            BucketAssignment {
                bucket: "arun".to_string(),
                records: vec![record(Category::Pm), record(Category::Ops), record(Category::Ops)],
            },
            BucketAssignment {
                bucket: "assaf".to_string(),
                records: vec![record(Category::Ops)],
            },
        ])
    }

    fn sample_summary() -> SplitSummary {
        SplitSummary::from_tally_on(
            &sample_tally(),
            "leads",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        )
    }

    #[test]
    fn test_summary_totals() {
        let summary = sample_summary();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.category_total(Category::Pm), 1);
        assert_eq!(summary.category_total(Category::OpexCi), 0);
        assert_eq!(summary.category_total(Category::Ops), 3);
        assert_eq!(summary.buckets[0].total, 3);
    }

    #[test]
    fn test_summary_to_text() {
        let text = sample_summary().to_text();

        assert!(text.starts_with("leads (2024-05-01): 4 prospects"));
        assert!(text.contains("OPEX/CI"));
        assert!(text.contains("arun"));
    }

    #[test]
    fn test_summary_to_markdown() {
        let markdown = sample_summary().to_markdown();

        assert!(markdown.contains("# Prospect Split - leads"));
        assert!(markdown.contains("| arun | 1 | 0 | 2 | 3 |"));
        assert!(markdown.contains("| assaf | 0 | 0 | 1 | 1 |"));
    }

    #[test]
    fn test_summary_to_csv() {
        let csv = sample_summary().to_csv().unwrap();

        assert!(csv.starts_with("Account,PM,OPEX/CI,OPS,Total\n"));
        assert!(csv.contains("arun,1,0,2,3\n"));
        assert!(csv.ends_with("All,1,0,3,4\n"));
    }

    #[test]
    fn test_summary_to_json() {
        let json = sample_summary().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total"], 4);
        assert_eq!(value["category_totals"]["OPS"], 3);
        assert_eq!(value["buckets"][0]["counts"]["PM"], 1);
    }

    fn tally_for(buckets: &[&str], ops_per_bucket: usize) -> Tally {
        let assignment: Vec<BucketAssignment> = buckets
            .iter()
            .map(|name| BucketAssignment {
                bucket: name.to_string(),
                records: (0..ops_per_bucket)
                    .map(|_| Record::new(Vec::new()).with_category(Category::Ops))
                    .collect(),
            })
            .collect();
        Tally::from_assignment(&assignment)
    }

    #[test]
    fn test_summary_csv_quotes_account_names() {
        let summary = SplitSummary::from_tally_on(
            &tally_for(&["Smith, J", "Lee \"Jr\""], 2),
            "leads",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        );
        let csv = summary.to_csv().unwrap();

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.len() == 5));
        assert_eq!(&rows[0][0], "Smith, J");
        assert_eq!(&rows[0][3], "2");
        assert_eq!(&rows[1][0], "Lee \"Jr\"");
        assert_eq!(&rows[2][4], "4");
    }

    #[test]
    fn test_summary_text_columns_align_with_long_names() {
        let summary = SplitSummary::from_tally_on(
            &tally_for(&["a", "a-very-long-account-name"], 1),
            "leads",
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        );
        let text = summary.to_text();

        let table: Vec<&str> = text
            .lines()
            .skip_while(|line| !line.starts_with("Account"))
            .collect();
        assert_eq!(table.len(), 3);
        let width = table[0].len();
        assert!(table.iter().all(|line| line.len() == width));
        assert!(table[2].starts_with("a-very-long-account-name "));
    }
}
