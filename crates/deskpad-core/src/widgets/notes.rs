use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::short_id;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{InsertAt, ListManager, Record};
use crate::store::StoreKey;
use crate::surface::{Confirmed, Level};

pub const UNTITLED: &str = "Untitled Note";
const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

fn preview(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

fn render_note(note: &Record<Note>) -> String {
    let created = note.created_at().format("%Y-%m-%d");
    match preview(&note.data.content) {
        body if body.is_empty() => format!("{} {} ({created})", short_id(note.id()), note.data.title),
        body => format!(
            "{} {} ({created}): {body}",
            short_id(note.id()),
            note.data.title
        ),
    }
}

#[derive(Debug)]
pub struct Notes {
    list: ListManager<Note>,
}

impl Notes {
    pub fn new(services: Services) -> Self {
        let list = ListManager::new(StoreKey::Notes, services)
            .empty_message("No notes yet. Write one to get started!")
            .insert_at(InsertAt::Front)
            .render_with(render_note);
        Self { list }
    }

    pub fn list(&self) -> &ListManager<Note> {
        &self.list
    }

    #[instrument(skip(self, content))]
    pub fn add(&mut self, title: &str, content: &str) -> WidgetResult<String> {
        let (title, content) = (title.trim(), content.trim());
        if title.is_empty() && content.is_empty() {
            return self.list.services().reject(ValidationError::EmptyNote);
        }
        let title = if title.is_empty() { UNTITLED } else { title };

        let id = self.list.add(Note {
            title: title.to_string(),
            content: content.to_string(),
        });
        self.list
            .services()
            .notify(Level::Success, "Note saved successfully!");
        Ok(id)
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        let removed = self.list.delete(id, confirmed);
        if removed {
            self.list.services().notify(Level::Info, "Note deleted");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::{Notes, preview};
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;
    use crate::surface::{Confirmed, FixedPrompt, Level};

    #[test]
    fn newest_note_comes_first_and_blank_title_defaults() {
        let h = Harness::new();
        let mut notes = Notes::new(h.services.clone());
        notes.add("Groceries", "milk, eggs").expect("added");
        notes.add("  ", "call the bank").expect("added");

        let titles: Vec<&str> = notes
            .list()
            .items()
            .iter()
            .map(|n| n.data.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Untitled Note", "Groceries"]);
        assert_eq!(
            h.notifier.last(),
            Some((Level::Success, "Note saved successfully!".to_string()))
        );
    }

    #[test]
    fn empty_note_is_a_warning() {
        let h = Harness::new();
        let mut notes = Notes::new(h.services.clone());

        assert_eq!(notes.add(" ", "\n"), Err(ValidationError::EmptyNote));
        assert_eq!(
            h.notifier.last(),
            Some((Level::Warning, "Please enter a title or content".to_string()))
        );
    }

    #[test]
    fn delete_notifies() {
        let h = Harness::new();
        let mut notes = Notes::new(h.services.clone());
        let id = notes.add("Draft", "").expect("added");
        let confirmed = Confirmed::ask(&FixedPrompt(true), "Delete this note?").expect("yes");

        assert!(notes.delete(&id, confirmed));
        assert!(notes.list().is_empty());
        assert_eq!(h.last_message().as_deref(), Some("Note deleted"));
    }

    #[test]
    fn previews_collapse_whitespace_and_truncate() {
        assert_eq!(preview("a\n  b"), "a b");
        let long = "x".repeat(80);
        assert_eq!(preview(&long).chars().count(), 63);
    }
}
