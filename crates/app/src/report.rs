use std::sync::Arc;

use coach_core::Catalog;
use coach_core::model::AssessmentDefinition;
use services::{ProgressOverview, ResultListItem};

fn select_entries(
    catalog: &Catalog,
    category: Option<&str>,
    search: Option<&str>,
) -> Vec<Arc<AssessmentDefinition>> {
    let mut entries = match search {
        Some(query) => catalog.search(query),
        None => catalog.iter().cloned().collect(),
    };
    if let Some(category) = category {
        let category = category.trim();
        entries.retain(|d| d.category().eq_ignore_ascii_case(category));
    }
    entries
}

pub fn print_catalog(catalog: &Catalog, category: Option<&str>, search: Option<&str>) {
    let entries = select_entries(catalog, category, search);
    if entries.is_empty() {
        println!("No assessments match.");
        return;
    }

    for name in catalog.categories() {
        let group: Vec<_> = entries
            .iter()
            .filter(|d| d.category().eq_ignore_ascii_case(name))
            .collect();
        if group.is_empty() {
            continue;
        }
        println!("{name}");
        for def in group {
            println!(
                "  {:<22} {} ({} questions, {} min)",
                def.id().as_str(),
                def.title(),
                def.question_count(),
                def.duration_secs().div_ceil(60)
            );
        }
    }
}

pub fn print_history(recent: &[ResultListItem], overview: &ProgressOverview) {
    if recent.is_empty() {
        println!("No results recorded yet.");
    } else {
        println!("Recent results");
        for item in recent {
            println!(
                "  {}  {:<22} {}/{} ({}%)",
                item.recorded_at.format("%Y-%m-%d %H:%M"),
                item.assessment_id.as_str(),
                item.correct,
                item.total,
                item.percentage
            );
        }
    }

    println!();
    println!(
        "{} attempts, average {}%, best {}%",
        overview.attempts, overview.average_percentage, overview.best_percentage
    );
    println!(
        "{}/{} assessments attempted ({}%)",
        overview.assessments_attempted, overview.catalog_size, overview.completion_percentage
    );
    for p in &overview.per_assessment {
        println!(
            "  {:<22} {} attempts, latest {}%, best {}%, average {}%",
            p.assessment_id.as_str(),
            p.attempts,
            p.latest_percentage,
            p.best_percentage,
            p.average_percentage
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(entries: &[Arc<AssessmentDefinition>]) -> Vec<&str> {
        entries.iter().map(|d| d.id().as_str()).collect()
    }

    #[test]
    fn category_filter_ignores_case() {
        let catalog = Catalog::builtin().unwrap();
        let entries = select_entries(&catalog, Some("job search"), None);
        assert_eq!(ids(&entries), vec!["resume-fundamentals", "salary-negotiation"]);
    }

    #[test]
    fn search_and_category_combine() {
        let catalog = Catalog::builtin().unwrap();
        let entries = select_entries(&catalog, Some("Interviewing"), Some("salary"));
        assert!(entries.is_empty());
        let all = select_entries(&catalog, None, None);
        assert_eq!(all.len(), catalog.len());
    }
}
