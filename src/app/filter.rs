use std::fmt;

use crate::app::models::{Priority, Task};

// Which tasks the list shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    // Order of the buttons in the filter bar
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    pub fn name(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }

    pub fn index(self) -> usize {
        Filter::ALL
            .iter()
            .position(|filter| *filter == self)
            .unwrap_or(0)
    }

    pub fn next(self) -> Filter {
        Filter::ALL[(self.index() + 1) % Filter::ALL.len()]
    }

    pub fn previous(self) -> Filter {
        Filter::ALL[(self.index() + Filter::ALL.len() - 1) % Filter::ALL.len()]
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Derives the list the user sees from the stored collection.
///
/// Tasks not matching `filter` are dropped, then High priority tasks are
/// moved ahead of all others. The sort is stable, so within each of the two
/// groups tasks keep their insertion order. The collection is never touched.
pub fn visible_tasks(tasks: &[Task], filter: Filter) -> Vec<&Task> {
    let mut visible: Vec<&Task> = tasks.iter().filter(|task| filter.matches(task)).collect();
    visible.sort_by_key(|task| task.priority != Priority::High);
    visible
}

// Heading above the list, e.g. "3 tasks remaining"
pub fn remaining_heading(count: usize) -> String {
    if count == 1 {
        format!("{count} task remaining")
    } else {
        format!("{count} tasks remaining")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::TaskId;
    use rstest::rstest;

    fn task(id: &str, priority: Priority, completed: bool) -> Task {
        let mut task = Task::new(id, None);
        task.id = TaskId::from(id);
        task.priority = priority;
        task.completed = completed;
        task
    }

    fn ids(tasks: &[&Task]) -> Vec<String> {
        tasks.iter().map(|task| task.id.to_string()).collect()
    }

    fn mixed() -> Vec<Task> {
        vec![
            task("t1", Priority::Low, false),
            task("t2", Priority::High, true),
            task("t3", Priority::Medium, true),
            task("t4", Priority::High, false),
            task("t5", Priority::Low, true),
        ]
    }

    #[test]
    fn high_priority_comes_first() {
        let tasks = vec![task("t1", Priority::Low, false), task("t2", Priority::High, false)];
        assert_eq!(ids(&visible_tasks(&tasks, Filter::All)), vec!["t2", "t1"]);
    }

    #[test]
    fn other_tasks_keep_insertion_order() {
        assert_eq!(
            ids(&visible_tasks(&mixed(), Filter::All)),
            vec!["t2", "t4", "t1", "t3", "t5"]
        );
    }

    #[rstest]
    #[case(Filter::All, vec!["t2", "t4", "t1", "t3", "t5"])]
    #[case(Filter::Active, vec!["t4", "t1"])]
    #[case(Filter::Completed, vec!["t2", "t3", "t5"])]
    fn filters_select_by_completion(#[case] filter: Filter, #[case] expected: Vec<&str>) {
        let tasks = mixed();
        let visible = visible_tasks(&tasks, filter);
        assert_eq!(ids(&visible), expected);
        assert!(visible.iter().all(|task| filter.matches(task)));
    }

    #[test]
    fn active_and_completed_partition_the_collection() {
        let tasks = mixed();
        let active = visible_tasks(&tasks, Filter::Active).len();
        let completed = visible_tasks(&tasks, Filter::Completed).len();
        assert_eq!(active + completed, tasks.len());
    }

    #[test]
    fn filter_cycles_in_button_order() {
        assert_eq!(Filter::All.next(), Filter::Active);
        assert_eq!(Filter::Completed.next(), Filter::All);
        assert_eq!(Filter::All.previous(), Filter::Completed);
    }

    #[rstest]
    #[case(0, "0 tasks remaining")]
    #[case(1, "1 task remaining")]
    #[case(7, "7 tasks remaining")]
    fn heading_pluralizes(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(remaining_heading(count), expected);
    }
}
