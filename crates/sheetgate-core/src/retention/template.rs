use chrono::{Datelike, NaiveDate};
use glob::Pattern;

use crate::error::Error;

const TEMPLATE_EXTENSION: &str = "xlsx";

/// Naming convention of pre-warmed period templates: `{prefix}YYYY-MM.xlsx`.
#[derive(Debug, Clone)]
pub struct TemplatePattern {
    prefix: String,
    pattern: Pattern,
}

impl TemplatePattern {
    pub fn new(prefix: &str) -> Result<Self, Error> {
        let glob = format!(
            "{}[0-9][0-9][0-9][0-9]-[0-9][0-9].{}",
            Pattern::escape(prefix),
            TEMPLATE_EXTENSION
        );
        let pattern = Pattern::new(&glob)
            .map_err(|e| Error::Other(format!("Invalid template prefix '{}': {}", prefix, e)))?;
        Ok(Self {
            prefix: prefix.to_string(),
            pattern,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.matches(file_name)
    }

    pub fn file_name(&self, year: i32, month: u32) -> String {
        format!("{}{:04}-{:02}.{}", self.prefix, year, month, TEMPLATE_EXTENSION)
    }
}

/// (year, month) of the month before `today`, `today`'s month and the month after.
pub fn adjacent_periods(today: NaiveDate) -> [(i32, u32); 3] {
    let (year, month) = (today.year(), today.month());
    let previous = if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    };
    let next = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    [previous, (year, month), next]
}
