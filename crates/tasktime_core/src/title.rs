//! crates/tasktime_core/src/title.rs
//!
//! Resolves the display label for a time entry from already-fetched data.

use uuid::Uuid;
use crate::domain::TimeEntry;

/// Label shown when neither the task nor the entry carries a name.
pub const UNTITLED_TASK: &str = "Untitled Task";

/// Read-only access to cached task titles. Lookups must never fetch.
pub trait TaskTitles {
    fn task_title(&self, task_id: Uuid) -> Option<String>;
}

/// Picks the label for `entry`: cached task title, then the entry's own
/// description, then [`UNTITLED_TASK`]. Blank strings count as absent.
pub fn resolve_title<T: TaskTitles + ?Sized>(titles: &T, entry: &TimeEntry) -> String {
    titles
        .task_title(entry.task_id)
        .filter(|title| !title.trim().is_empty())
        .or_else(|| {
            entry
                .description
                .clone()
                .filter(|description| !description.trim().is_empty())
        })
        .unwrap_or_else(|| UNTITLED_TASK.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    struct Titles(HashMap<Uuid, String>);

    impl TaskTitles for Titles {
        fn task_title(&self, task_id: Uuid) -> Option<String> {
            self.0.get(&task_id).cloned()
        }
    }

    fn entry(task_id: Uuid, description: Option<&str>) -> TimeEntry {
        TimeEntry {
            id: Uuid::new_v4(),
            task_id,
            user_id: Uuid::new_v4(),
            start_time: Utc::now(),
            end_time: None,
            is_manual: false,
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn cached_title_wins_over_description() {
        let task_id = Uuid::new_v4();
        let titles = Titles(HashMap::from([(task_id, "Write report".to_string())]));
        assert_eq!(resolve_title(&titles, &entry(task_id, Some("notes"))), "Write report");
    }

    #[test]
    fn falls_back_to_description_on_cache_miss() {
        let titles = Titles(HashMap::new());
        assert_eq!(resolve_title(&titles, &entry(Uuid::new_v4(), Some("Call client"))), "Call client");
    }

    #[test]
    fn falls_back_to_literal_label() {
        let titles = Titles(HashMap::new());
        assert_eq!(resolve_title(&titles, &entry(Uuid::new_v4(), None)), UNTITLED_TASK);
    }

    #[test]
    fn blank_labels_fall_through_to_literal() {
        let task_id = Uuid::new_v4();
        let titles = Titles(HashMap::from([(task_id, "  ".to_string())]));
        assert_eq!(resolve_title(&titles, &entry(task_id, Some(""))), UNTITLED_TASK);
        assert_eq!(resolve_title(&titles, &entry(task_id, Some("Call client"))), "Call client");
    }
}
