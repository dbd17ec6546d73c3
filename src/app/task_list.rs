use chrono::{Duration, NaiveDate};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::app::models::{Priority, Task, TaskId};

// Selection over the visible (filtered and sorted) tasks
#[derive(Debug, Default)]
pub struct TaskList {
    pub state: ListState,
}

impl TaskList {
    // Move the selection to the next item, wrapping around at the end
    pub fn next(&mut self, len: usize) {
        let i = match self.state.selected() {
            Some(i) => {
                if len == 0 || i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(if len == 0 { None } else { Some(i) });
    }

    // Move the selection to the previous item, wrapping around at the start
    pub fn previous(&mut self, len: usize) {
        let i = match self.state.selected() {
            Some(i) => {
                if len == 0 {
                    0
                } else if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(if len == 0 { None } else { Some(i) });
    }

    pub fn unselect(&mut self) {
        self.state.select(None);
    }

    // Keep the selection inside a list that may have shrunk
    pub fn clamp(&mut self, len: usize) {
        match self.state.selected() {
            Some(_) if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            _ => {}
        }
    }

    // Get the id of the selected task
    pub fn selected_id(&self, visible: &[&Task]) -> Option<TaskId> {
        self.state
            .selected()
            .and_then(|i| visible.get(i))
            .map(|task| task.id.clone())
    }
}

// Counts shown in the statistics infobox
#[derive(Debug, PartialEq, Eq)]
pub struct Statistics {
    pub total: usize,
    pub remaining: usize,
    pub due_next_week: usize,
    pub overdue: usize,
}

impl Statistics {
    pub fn from_tasks(tasks: &[Task], today: NaiveDate) -> Statistics {
        let next_week = today + Duration::weeks(1);
        let open = || tasks.iter().filter(|task| !task.completed);
        Statistics {
            total: tasks.len(),
            remaining: open().count(),
            due_next_week: open()
                .filter(|task| task.deadline.is_some_and(|date| date >= today && date < next_week))
                .count(),
            overdue: open()
                .filter(|task| task.deadline.is_some_and(|date| date < today))
                .count(),
        }
    }
}

// Build the UI (list) for the visible tasks
pub fn get_list_items_ui<'a>(tasks: &[&'a Task]) -> Vec<ListItem<'a>> {
    return tasks
        .iter()
        .map(|&task| {
            let mut lines = Vec::new();

            let name_color = match task.priority {
                Priority::High => Color::Red,
                Priority::Medium => Color::Yellow,
                Priority::Low => Color::White,
            };

            let mut name_line = vec![
                Span::from(if task.completed { "[✓] " } else { "[ ] " }),
                Span::from(task.name.as_str()).fg(name_color),
            ];
            if task.location.is_some() {
                name_line.push(Span::from(" @").fg(Color::Cyan));
            }
            if task.photo.is_some() {
                name_line.push(Span::from(" [photo]").fg(Color::Cyan));
            }
            lines.push(Line::from(name_line));

            let deadline = task
                .deadline
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            lines.push(Line::from(format!(
                "    Priority: {}  Deadline: {}  Repeat: {}",
                task.priority, deadline, task.repeat
            )));

            ListItem::new(lines).style(Style::default().fg(Color::White))
        })
        .collect();
}

// Build the UI (lines) for the statistics infobox
pub fn get_statistics_ui<'a>(statistics: &Statistics) -> Vec<Line<'a>> {
    return vec![
        Line::from(format!("Total tasks: {}", statistics.total)),
        Line::from(format!("Uncompleted tasks: {}", statistics.remaining)),
        Line::from(format!("Due next week: {}", statistics.due_next_week)),
        Line::from(format!("Overdue: {}", statistics.overdue)),
    ];
}

// Build the UI (lines) for the instructions infobox
pub fn get_instructions_ui<'a>() -> Vec<Line<'a>> {
    return vec![
        "a - add a task".into(),
        "Enter/Space - toggle done".into(),
        "e - edit a task".into(),
        "x - delete a task".into(),
        "p - take a photo".into(),
        "v - view the photo".into(),
        "Tab/Shift+Tab - change filter".into(),
        "q - quit".into(),
    ];
}
