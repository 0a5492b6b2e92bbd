//! Title/tag search and fuzzy target resolution.
//!
//! Target resolution is deliberately simple: trim and lowercase both sides,
//! then accept a candidate when either string contains the other. The first
//! candidate in collection order wins and ties are not broken, so two titles
//! sharing a substring can resolve to the "wrong" one. That ambiguity is a
//! known, documented limitation; adding a ranking policy here would change
//! observable behavior.

use crate::models::{Log, Schedule, Task};

/// Anything with a title and tags can be searched and resolved.
pub trait Searchable {
    fn title(&self) -> &str;
    fn tags(&self) -> &[String];
}

impl Searchable for Task {
    fn title(&self) -> &str {
        &self.title
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Searchable for Schedule {
    fn title(&self) -> &str {
        &self.title
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Searchable for Log {
    fn title(&self) -> &str {
        &self.title
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Case-insensitive substring filter over title or any tag.
/// An empty (or whitespace-only) query returns everything, in stable
/// collection order.
pub fn search_items<'a, T: Searchable>(items: &'a [T], query: &str) -> Vec<&'a T> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| {
            item.title().to_lowercase().contains(&q)
                || item.tags().iter().any(|tag| tag.to_lowercase().contains(&q))
        })
        .collect()
}

/// Resolve a free-text reference to at most one entity.
///
/// Bidirectional containment: "delete the linear algebra assignment" finds a
/// stored "linear algebra", and a short query finds a longer stored title.
/// Returns the first match in collection order, or `None`.
pub fn find_item_by_title<'a, T: Searchable>(items: &'a [T], query: &str) -> Option<&'a T> {
    let q = query.trim().to_lowercase();
    items.iter().find(|item| {
        let title = item.title().to_lowercase();
        title.contains(&q) || q.contains(&title)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::Utc;

    fn task(title: &str, tags: &[&str]) -> Task {
        Task {
            id: format!("task-{}", title),
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            priority: Priority::Medium,
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn exact_title_always_resolves() {
        let items = vec![task("線形代数の課題", &[]), task("会議", &[])];
        let found = find_item_by_title(&items, "線形代数の課題").unwrap();
        assert_eq!(found.title, "線形代数の課題");
    }

    #[test]
    fn query_containing_stored_title_resolves() {
        let items = vec![task("線形代数", &[])];
        let found = find_item_by_title(&items, "線形代数の課題を削除して");
        assert_eq!(found.map(|t| t.title.as_str()), Some("線形代数"));
    }

    #[test]
    fn stored_title_containing_query_resolves() {
        let items = vec![task("買い物リストを作る", &[])];
        assert!(find_item_by_title(&items, "買い物").is_some());
    }

    #[test]
    fn no_shared_substring_is_not_found() {
        let items = vec![task("牛乳を買う", &[]), task("パンを買う", &[])];
        assert!(find_item_by_title(&items, "zzz").is_none());
    }

    #[test]
    fn resolution_is_case_insensitive_and_trimmed() {
        let items = vec![task("Linear Algebra", &[])];
        assert!(find_item_by_title(&items, "  linear algebra  ").is_some());
    }

    // Known limitation: no ranking, first collection-order match wins even
    // when a later title matches "better".
    #[test]
    fn ambiguous_query_returns_first_match_in_collection_order() {
        let items = vec![task("数学の課題", &[]), task("物理の課題", &[])];
        let found = find_item_by_title(&items, "課題").unwrap();
        assert_eq!(found.title, "数学の課題");
    }

    #[test]
    fn search_matches_title_or_tags() {
        let items = vec![
            task("牛乳を買う", &["買い物"]),
            task("会議資料", &["仕事"]),
        ];
        let by_title = search_items(&items, "牛乳");
        assert_eq!(by_title.len(), 1);
        let by_tag = search_items(&items, "仕事");
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].title, "会議資料");
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let items = vec![task("a", &[]), task("b", &[])];
        let all = search_items(&items, "   ");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "a");
    }
}
