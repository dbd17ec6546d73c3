use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

// The "What needs to be done?" input above the list
#[derive(Debug, Default)]
pub struct AddForm {
    pub active: bool,
    input: String,
}

impl AddForm {
    pub fn open(&mut self) {
        self.active = true;
        self.input.clear();
    }

    pub fn input(&mut self, to_insert: char) {
        self.input.push(to_insert);
    }

    pub fn delete_char(&mut self) {
        self.input.pop();
    }

    pub fn cancel(&mut self) {
        self.active = false;
        self.input.clear();
    }

    // Close the form and hand back the entered name, if it is not blank
    pub fn submit(&mut self) -> Option<String> {
        let name = std::mem::take(&mut self.input);
        self.active = false;
        let trimmed = name.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

// Returns the UI content of the form line
pub fn get_add_form_ui(form: &AddForm, pending: usize) -> Line<'_> {
    const GRAY_TEXT: Style = Style::new().fg(Color::Rgb(120, 120, 120));
    const BLACK_ON_WHITE: Style = Style::new().fg(Color::Black).bg(Color::White);

    let mut spans = Vec::new();
    if form.active {
        spans.push(Span::raw(form.input.as_str()));
        spans.push(Span::styled(" ", BLACK_ON_WHITE));
    } else {
        spans.push(Span::styled("Press a to add a task", GRAY_TEXT));
    }
    if pending > 0 {
        spans.push(Span::styled(
            format!("  (locating {pending} new task{})", if pending == 1 { "" } else { "s" }),
            GRAY_TEXT,
        ));
    }
    Line::from(spans)
}
