use chrono::NaiveDate;
use log::debug;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::app::models::{Priority, Repeat, Task, TaskEdit, TaskId};
use crate::app::store::TaskActions;

// Date format of the deadline field
const DEADLINE_FORMAT: &str = "%Y-%m-%d";

// Rows of the edit form, top to bottom
const NAME_ROW: usize = 0;
const PRIORITY_ROW: usize = 1;
const DEADLINE_ROW: usize = 2;
const REPEAT_ROW: usize = 3;

// Edit mode of a single task row
#[derive(Debug, Default)]
pub enum EditState {
    #[default]
    Viewing,
    Editing(TaskDraft),
}

// Uncommitted values of the task being edited
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub name: String,
    pub priority: Priority,
    pub deadline: String,
    pub repeat: Repeat,
    cursor_position: (usize, usize),
    error_message: Option<String>,
}

impl EditState {
    pub fn is_editing(&self) -> bool {
        matches!(self, EditState::Editing(_))
    }

    // Enter edit mode with a draft holding the task's committed values
    pub fn start(&mut self, task: &Task) {
        if self.is_editing() {
            return;
        }
        *self = EditState::Editing(TaskDraft::from_task(task));
    }

    pub fn draft(&self) -> Option<&TaskDraft> {
        match self {
            EditState::Editing(draft) => Some(draft),
            EditState::Viewing => None,
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut TaskDraft> {
        match self {
            EditState::Editing(draft) => Some(draft),
            EditState::Viewing => None,
        }
    }

    // Commit the draft through the store and go back to viewing.
    // An invalid draft stays open with an error message instead.
    pub fn save(&mut self, id: &TaskId, actions: &mut dyn TaskActions) {
        let EditState::Editing(draft) = self else {
            return;
        };
        match draft.to_edit() {
            Ok(edit) => {
                actions.edit(id, edit);
                *self = EditState::Viewing;
            }
            Err(message) => {
                debug!("event=task_edit module=task_edit status=rejected id={id} reason={message}");
                draft.error_message = Some(message);
            }
        }
    }

    // Drop the draft; the task keeps its last committed values
    pub fn cancel(&mut self) {
        *self = EditState::Viewing;
    }
}

impl TaskDraft {
    pub fn from_task(task: &Task) -> TaskDraft {
        TaskDraft {
            name: task.name.clone(),
            priority: task.priority,
            deadline: task
                .deadline
                .map(|date| date.format(DEADLINE_FORMAT).to_string())
                .unwrap_or_default(),
            repeat: task.repeat,
            cursor_position: (task.name.chars().count(), NAME_ROW),
            error_message: None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    // Validate the draft and turn it into the values to commit
    pub fn to_edit(&self) -> Result<TaskEdit, String> {
        if self.name.trim().is_empty() {
            return Err("Name cannot be empty".to_string());
        }
        let deadline = match self.deadline.trim() {
            "" => None,
            value => match NaiveDate::parse_from_str(value, DEADLINE_FORMAT) {
                Ok(date) => Some(date),
                Err(_e) => return Err("Deadline should be in format yyyy-mm-dd".to_string()),
            },
        };

        Ok(TaskEdit {
            name: self.name.clone(),
            priority: self.priority,
            deadline,
            repeat: self.repeat,
        })
    }

    // Move the cursor one row BELOW the current one.
    // The horizontal position is clamped to the length of the new row.
    pub fn move_cursor_down(&mut self) {
        let (x, y) = self.cursor_position;
        let future_y_position = (y + 1).min(REPEAT_ROW);
        self.cursor_position = (
            x.min(self.text_len_at_y_pos(future_y_position)),
            future_y_position,
        );
    }

    // Move the cursor one row ABOVE the current one
    pub fn move_cursor_up(&mut self) {
        let (x, y) = self.cursor_position;
        let future_y_position = y.saturating_sub(1);
        self.cursor_position = (
            x.min(self.text_len_at_y_pos(future_y_position)),
            future_y_position,
        );
    }

    // Move the cursor one char LEFT, or pick the previous option on a selector row
    pub fn move_cursor_left(&mut self) {
        let (x, y) = self.cursor_position;
        match y {
            PRIORITY_ROW => self.priority = self.priority.previous(),
            REPEAT_ROW => self.repeat = self.repeat.previous(),
            _ => self.cursor_position = (x.saturating_sub(1), y),
        }
    }

    // Move the cursor one char RIGHT, or pick the next option on a selector row
    pub fn move_cursor_right(&mut self) {
        let (x, y) = self.cursor_position;
        match y {
            PRIORITY_ROW => self.priority = self.priority.next(),
            REPEAT_ROW => self.repeat = self.repeat.next(),
            _ => self.cursor_position = ((x + 1).min(self.text_len_at_y_pos(y)), y),
        }
    }

    // Delete the char before the cursor
    pub fn delete_char(&mut self) {
        let (x, y) = self.cursor_position;
        if x == 0 {
            return;
        }
        let Some(text) = self.text_at_y_pos_mut(y) else {
            return;
        };
        let byte_index = byte_index_of(text, x - 1);
        text.remove(byte_index);
        self.cursor_position = (x - 1, y);
    }

    // Insert a char at the cursor of the active text row
    pub fn input(&mut self, to_insert: char) {
        let (x, y) = self.cursor_position;
        let Some(text) = self.text_at_y_pos_mut(y) else {
            return;
        };
        let byte_index = byte_index_of(text, x);
        text.insert(byte_index, to_insert);
        self.cursor_position = (x + 1, y);
    }

    fn text_at_y_pos_mut(&mut self, y_position: usize) -> Option<&mut String> {
        match y_position {
            NAME_ROW => Some(&mut self.name),
            DEADLINE_ROW => Some(&mut self.deadline),
            _ => None,
        }
    }

    // Think of this as a mapper of vertical cursor position to the length of its content
    fn text_len_at_y_pos(&self, y_position: usize) -> usize {
        match y_position {
            NAME_ROW => self.name.chars().count(),
            DEADLINE_ROW => self.deadline.chars().count(),
            _ => 0,
        }
    }
}

fn byte_index_of(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

// Returns the UI content for the task edit form
pub fn get_task_edit_ui(draft: &TaskDraft) -> Vec<Line<'static>> {
    const GRAY_TEXT: Style = Style::new().fg(Color::Rgb(62, 62, 62));
    const WHITE_TEXT: Style = Style::new().fg(Color::White);
    const BLACK_ON_WHITE: Style = Style::new().fg(Color::Black).bg(Color::White);
    let mut text = Vec::new();

    struct EditFormLine {
        prefix: &'static str,
        placeholder: &'static str,
        value: String,
        selector: bool,
    }

    // Define the lines (input fields) of the form
    let lines = [
        EditFormLine {
            prefix: "Name:     ",
            placeholder: "My task name",
            value: draft.name.clone(),
            selector: false,
        },
        EditFormLine {
            prefix: "Priority: ",
            placeholder: "",
            value: draft.priority.to_string(),
            selector: true,
        },
        EditFormLine {
            prefix: "Deadline: ",
            placeholder: "2024-12-31",
            value: draft.deadline.clone(),
            selector: false,
        },
        EditFormLine {
            prefix: "Repeat:   ",
            placeholder: "",
            value: draft.repeat.to_string(),
            selector: true,
        },
    ];

    let (cursor_x, cursor_y) = draft.cursor_position;

    for (i, line) in lines.iter().enumerate() {
        let mut spans = vec![Span::styled(line.prefix, WHITE_TEXT)];

        if line.selector {
            // Selector rows show the current option between arrows when active
            if cursor_y == i {
                spans.push(Span::styled(format!("< {} >", line.value), BLACK_ON_WHITE));
            } else {
                spans.push(Span::styled(line.value.clone(), WHITE_TEXT));
            }
        } else if line.value.is_empty() {
            // If the line is empty, a placeholder is displayed
            if cursor_y == i {
                // Line is selected. First char is highlighted, the rest is gray
                spans.push(Span::styled(
                    line.placeholder.chars().take(1).collect::<String>(),
                    BLACK_ON_WHITE,
                ));
                spans.push(Span::styled(
                    line.placeholder.chars().skip(1).collect::<String>(),
                    GRAY_TEXT,
                ));
            } else {
                spans.push(Span::styled(line.placeholder, GRAY_TEXT));
            }
        } else if cursor_y == i {
            // All chars are white, except for the one at the cursor position which is highlighted
            spans.push(Span::styled(
                line.value.chars().take(cursor_x).collect::<String>(),
                WHITE_TEXT,
            ));
            spans.push(Span::styled(
                line.value.chars().skip(cursor_x).take(1).collect::<String>(),
                BLACK_ON_WHITE,
            ));
            spans.push(Span::styled(
                line.value.chars().skip(cursor_x + 1).collect::<String>(),
                WHITE_TEXT,
            ));

            if cursor_x == line.value.chars().count() {
                spans.push(Span::styled(" ", BLACK_ON_WHITE));
            }
        } else {
            spans.push(Span::styled(line.value.clone(), WHITE_TEXT));
        }

        text.push(Line::from(spans));
    }

    text.push(Line::raw(""));

    // Display the error message if there is one
    if let Some(error_message) = draft.error_message() {
        text.push(Line::from(Span::styled(
            error_message.to_string(),
            Style::new().fg(Color::Red),
        )));
        text.push(Line::raw(""));
    }

    text.push(Line::from(Span::styled(
        "Enter - save, Esc - cancel, Left/Right - change option",
        WHITE_TEXT,
    )));

    text
}
