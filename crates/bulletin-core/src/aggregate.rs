//! Day aggregation.
//!
//! Turns the posts of one day into overall [`SummaryStats`] plus a
//! per-category breakdown. The breakdown keeps categories in the order they
//! were first encountered while scanning, and only lists categories that
//! actually appear.

use crate::models::{Post, SummaryStats};

/// Counts for one category on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    /// Display name (e.g. `"Lost & Found"`).
    pub name: String,
    pub stats: SummaryStats,
}

/// Aggregate for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayAggregate {
    pub stats: SummaryStats,
    /// Categories in first-seen order.
    pub categories: Vec<CategoryStats>,
}

impl DayAggregate {
    pub fn is_empty(&self) -> bool {
        self.stats.total == 0
    }
}

pub fn aggregate_posts(posts: &[Post]) -> DayAggregate {
    let mut agg = DayAggregate::default();
    for post in posts {
        agg.stats.record(post.urgency);

        let name = post.category.as_str();
        let idx = match agg.categories.iter().position(|c| c.name == name) {
            Some(i) => i,
            None => {
                agg.categories.push(CategoryStats {
                    name: name.to_string(),
                    stats: SummaryStats::default(),
                });
                agg.categories.len() - 1
            }
        };
        agg.categories[idx].stats.record(post.urgency);
    }
    agg
}
