use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::short_id;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{ListManager, Record};
use crate::store::StoreKey;
use crate::surface::{Confirmed, Level};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub progress: u8,
}

impl Book {
    pub fn author_label(&self) -> &str {
        if self.author.is_empty() {
            "Unknown"
        } else {
            &self.author
        }
    }
}

fn render_book(book: &Record<Book>) -> String {
    format!(
        "{} {} by {} ({}%)",
        short_id(book.id()),
        book.data.title,
        book.data.author_label(),
        book.data.progress
    )
}

#[derive(Debug)]
pub struct ReadingList {
    list: ListManager<Book>,
}

impl ReadingList {
    pub fn new(services: Services) -> Self {
        let list = ListManager::new(StoreKey::ReadingList, services)
            .empty_message("No books yet. Start reading! 📚")
            .render_with(render_book);
        Self { list }
    }

    pub fn list(&self) -> &ListManager<Book> {
        &self.list
    }

    #[instrument(skip(self))]
    pub fn add(&mut self, title: &str, author: &str) -> WidgetResult<String> {
        let title = title.trim();
        if title.is_empty() {
            return self.list.services().reject(ValidationError::EmptyBookTitle);
        }
        let id = self.list.add(Book {
            title: title.to_string(),
            author: author.trim().to_string(),
            progress: 0,
        });
        self.list
            .services()
            .notify(Level::Success, "Book added to reading list! 📚");
        Ok(id)
    }

    /// Stores `progress` clamped to 0..=100.
    pub fn set_progress(&mut self, id: &str, progress: i64) -> bool {
        let progress = progress.clamp(0, 100) as u8;
        self.list.update(id, |book| book.progress = progress)
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        self.list.delete(id, confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::ReadingList;
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;

    #[test]
    fn progress_is_clamped() {
        let h = Harness::new();
        let mut reading = ReadingList::new(h.services.clone());
        let id = reading.add("Dune", "Frank Herbert").expect("added");

        assert!(reading.set_progress(&id, 250));
        assert_eq!(reading.list().get(&id).map(|b| b.data.progress), Some(100));
        assert!(reading.set_progress(&id, -4));
        assert_eq!(reading.list().get(&id).map(|b| b.data.progress), Some(0));
        assert!(!reading.set_progress("missing", 50));
    }

    #[test]
    fn unknown_author_label_and_title_required() {
        let h = Harness::new();
        let mut reading = ReadingList::new(h.services.clone());
        reading.add("Anonymous Book", "  ").expect("added");
        assert_eq!(h.last_message().as_deref(), Some("Book added to reading list! 📚"));

        let frame = reading.list().render();
        assert!(frame.lines()[0].ends_with("Anonymous Book by Unknown (0%)"));
        assert_eq!(reading.add("", "Someone"), Err(ValidationError::EmptyBookTitle));
    }
}
