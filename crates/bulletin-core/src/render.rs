//! Rule-based daily summary text.
//!
//! [`render_summary`] is a pure function of its inputs: no I/O, no clock,
//! no randomness. The output is Markdown with these sections, in order:
//!
//! 1. Header (community, weekday, ISO date)
//! 2. Overview (activity level, total posts)
//! 3. Urgency breakdown (non-zero levels only: emergency, urgent, normal)
//! 4. Activity by category (sorted by total, descending; ties keep
//!    first-seen order)
//! 5. Insights & recommendations (exactly one branch)

use chrono::NaiveDate;

use crate::aggregate::{CategoryStats, DayAggregate};

/// Activity level derived from a day's total post count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLevel {
    /// 0 posts.
    Quiet,
    /// 1–4 posts.
    Low,
    /// 5–19 posts.
    Moderate,
    /// 20 or more posts.
    High,
}

impl ActivityLevel {
    pub fn from_total(total: i64) -> Self {
        match total {
            t if t <= 0 => ActivityLevel::Quiet,
            1..=4 => ActivityLevel::Low,
            5..=19 => ActivityLevel::Moderate,
            _ => ActivityLevel::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Quiet => "quiet",
            ActivityLevel::Low => "low",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::High => "high",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ActivityLevel::Quiet => "😴 Quiet",
            ActivityLevel::Low => "🟢 Low",
            ActivityLevel::Moderate => "🟡 Moderate",
            ActivityLevel::High => "🔴 High",
        }
    }
}

/// Icon for a category name; unknown names get a pin.
pub fn category_icon(name: &str) -> &'static str {
    match name {
        "Safety" => "🚨",
        "Events" => "🎉",
        "Lost & Found" => "🔍",
        "Public Works" => "🔧",
        "General" => "💬",
        _ => "📌",
    }
}

/// Text stored for a day with no active posts.
pub fn no_activity_text(community: &str, date_iso: &str) -> String {
    format!("No activity reported in {} on {}.", community, date_iso)
}

fn plural(n: i64) -> &'static str {
    if n > 1 {
        "s"
    } else {
        ""
    }
}

/// Categories ordered by total, descending. `sort_by` is stable, so equal
/// totals keep their first-seen order.
pub fn sorted_categories(categories: &[CategoryStats]) -> Vec<&CategoryStats> {
    let mut sorted: Vec<&CategoryStats> = categories.iter().collect();
    sorted.sort_by(|a, b| b.stats.total.cmp(&a.stats.total));
    sorted
}

pub fn render_summary(community: &str, date: NaiveDate, agg: &DayAggregate) -> String {
    let stats = &agg.stats;
    let date_iso = date.format("%Y-%m-%d").to_string();
    let day_name = date.format("%A").to_string();
    let mut parts: Vec<String> = Vec::new();

    parts.push(format!("# 📊 Daily Summary for {}", community));
    parts.push(format!("**{}, {}**\n", day_name, date_iso));

    parts.push("## 📈 Overview".to_string());
    parts.push(format!(
        "- **Activity Level:** {}",
        ActivityLevel::from_total(stats.total).label()
    ));
    parts.push(format!("- **Total Posts:** {}\n", stats.total));

    if stats.emergency > 0 || stats.urgent > 0 || stats.normal > 0 {
        parts.push("## 🎯 Urgency Breakdown".to_string());
        if stats.emergency > 0 {
            parts.push(format!(
                "- 🚨 **Emergency:** {} post{}",
                stats.emergency,
                plural(stats.emergency)
            ));
        }
        if stats.urgent > 0 {
            parts.push(format!(
                "- ⚠️ **Urgent:** {} post{}",
                stats.urgent,
                plural(stats.urgent)
            ));
        }
        if stats.normal > 0 {
            parts.push(format!(
                "- ✅ **Normal:** {} post{}",
                stats.normal,
                plural(stats.normal)
            ));
        }
        parts.push(String::new());
    }

    if !agg.categories.is_empty() {
        parts.push("## 📂 Activity by Category".to_string());
        for cat in sorted_categories(&agg.categories) {
            let note = if cat.stats.emergency > 0 {
                format!(" ⚠️ ({} emergency)", cat.stats.emergency)
            } else if cat.stats.urgent > 0 {
                format!(" ⚡ ({} urgent)", cat.stats.urgent)
            } else {
                String::new()
            };
            parts.push(format!(
                "- {} **{}:** {} post{}{}",
                category_icon(&cat.name),
                cat.name,
                cat.stats.total,
                plural(cat.stats.total),
                note
            ));
        }
        parts.push(String::new());
    }

    parts.push("## 💡 Insights & Recommendations".to_string());
    if stats.emergency > 0 {
        parts.push(format!(
            "🚨 **URGENT:** {} emergency report{} require{} immediate attention.",
            stats.emergency,
            plural(stats.emergency),
            if stats.emergency == 1 { "s" } else { "" }
        ));
        parts.push(
            "\n→ *Action: Review emergency posts and coordinate response immediately.*"
                .to_string(),
        );
    } else if stats.urgent > 5 {
        parts.push(format!(
            "📢 **Notice:** Higher than usual urgent activity ({} posts).",
            stats.urgent
        ));
        parts.push("\n→ *Action: Monitor situation closely for potential escalation.*".to_string());
    } else if stats.total == 0 {
        parts.push("😴 **All Quiet:** No community activity reported today.".to_string());
        parts.push("\n→ *Consider posting community updates to boost engagement.*".to_string());
    } else {
        parts.push("✅ **All Clear:** Community activity is within normal range.".to_string());
        parts.push("\n→ *Continue regular monitoring. Everything looks good!*".to_string());
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryStats;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn cat(name: &str, total: i64, emergency: i64, urgent: i64) -> CategoryStats {
        CategoryStats {
            name: name.to_string(),
            stats: SummaryStats {
                total,
                emergency,
                urgent,
                normal: total - emergency - urgent,
            },
        }
    }

    fn agg(categories: Vec<CategoryStats>) -> DayAggregate {
        let mut stats = SummaryStats::default();
        for c in &categories {
            stats.total += c.stats.total;
            stats.emergency += c.stats.emergency;
            stats.urgent += c.stats.urgent;
            stats.normal += c.stats.normal;
        }
        DayAggregate { stats, categories }
    }

    #[test]
    fn test_activity_level_boundaries() {
        assert_eq!(ActivityLevel::from_total(0).as_str(), "quiet");
        assert_eq!(ActivityLevel::from_total(1).as_str(), "low");
        assert_eq!(ActivityLevel::from_total(4).as_str(), "low");
        assert_eq!(ActivityLevel::from_total(5).as_str(), "moderate");
        assert_eq!(ActivityLevel::from_total(19).as_str(), "moderate");
        assert_eq!(ActivityLevel::from_total(20).as_str(), "high");
    }

    #[test]
    fn test_category_order_stable_on_ties() {
        let categories = vec![cat("Safety", 3, 0, 0), cat("General", 1, 0, 0), cat("Events", 3, 0, 0)];
        let names: Vec<&str> = sorted_categories(&categories)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Safety", "Events", "General"]);

        let text = render_summary("riverside", date(), &agg(categories));
        let safety = text.find("**Safety:**").unwrap();
        let events = text.find("**Events:**").unwrap();
        let general = text.find("**General:**").unwrap();
        assert!(safety < events && events < general);
    }

    #[test]
    fn test_header_has_weekday_and_date() {
        let text = render_summary("riverside", date(), &agg(vec![cat("General", 1, 0, 0)]));
        assert!(text.starts_with("# 📊 Daily Summary for riverside\n**Friday, 2024-03-15**"));
        assert!(text.contains("- **Activity Level:** 🟢 Low"));
        assert!(text.contains("- **Total Posts:** 1"));
    }

    #[test]
    fn test_urgency_lines_skip_zero_and_pluralize() {
        let text = render_summary("riverside", date(), &agg(vec![cat("Safety", 3, 1, 0)]));
        assert!(text.contains("- 🚨 **Emergency:** 1 post\n"));
        assert!(text.contains("- ✅ **Normal:** 2 posts"));
        assert!(!text.contains("**Urgent:**"));
    }

    #[test]
    fn test_category_annotations() {
        let text = render_summary(
            "riverside",
            date(),
            &agg(vec![cat("Safety", 2, 1, 1), cat("Public Works", 2, 0, 2), cat("Events", 1, 0, 0)]),
        );
        assert!(text.contains("- 🚨 **Safety:** 2 posts ⚠️ (1 emergency)"));
        assert!(text.contains("- 🔧 **Public Works:** 2 posts ⚡ (2 urgent)"));
        assert!(text.contains("- 🎉 **Events:** 1 post\n"));
    }

    #[test]
    fn test_unknown_category_icon_falls_back() {
        assert_eq!(category_icon("Weather"), "📌");
        let text = render_summary("riverside", date(), &agg(vec![cat("Weather", 1, 0, 0)]));
        assert!(text.contains("- 📌 **Weather:** 1 post"));
    }

    #[test]
    fn test_emergency_branch_beats_urgent_branch() {
        let text = render_summary("riverside", date(), &agg(vec![cat("Safety", 11, 1, 10)]));
        assert!(text.contains("🚨 **URGENT:** 1 emergency report requires immediate attention."));
        assert!(!text.contains("Higher than usual urgent activity"));
    }

    #[test]
    fn test_plural_emergency_wording() {
        let text = render_summary("riverside", date(), &agg(vec![cat("Safety", 2, 2, 0)]));
        assert!(text.contains("2 emergency reports require immediate attention."));
    }

    #[test]
    fn test_urgent_notice_above_five() {
        let text = render_summary("riverside", date(), &agg(vec![cat("Safety", 6, 0, 6)]));
        assert!(text.contains("Higher than usual urgent activity (6 posts)"));

        let text = render_summary("riverside", date(), &agg(vec![cat("Safety", 5, 0, 5)]));
        assert!(text.contains("All Clear"));
    }

    #[test]
    fn test_quiet_branch_when_empty() {
        let text = render_summary("riverside", date(), &DayAggregate::default());
        assert!(text.contains("😴 Quiet"));
        assert!(text.contains("**All Quiet:**"));
        assert!(!text.contains("Urgency Breakdown"));
        assert!(!text.contains("Activity by Category"));
    }

    #[test]
    fn test_deterministic() {
        let a = agg(vec![cat("Events", 4, 0, 1), cat("General", 2, 0, 0)]);
        assert_eq!(
            render_summary("riverside", date(), &a),
            render_summary("riverside", date(), &a)
        );
    }
}
