use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::short_id;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{ListManager, Record};
use crate::store::StoreKey;
use crate::surface::Confirmed;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub title: String,
    pub url: String,
    pub category: String,
}

impl Bookmark {
    /// Host part of the URL, shown instead of the full link.
    pub fn domain(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default()
    }
}

fn render_bookmark(bookmark: &Record<Bookmark>) -> String {
    format!(
        "{} {} <{}> [{}]",
        short_id(bookmark.id()),
        bookmark.data.title,
        bookmark.data.domain(),
        bookmark.data.category
    )
}

#[derive(Debug)]
pub struct Bookmarks {
    list: ListManager<Bookmark>,
}

impl Bookmarks {
    pub fn new(services: Services) -> Self {
        let list = ListManager::new(StoreKey::Bookmarks, services)
            .empty_message("No bookmarks yet. Add one to get started!")
            .render_with(render_bookmark);
        Self { list }
    }

    pub fn list(&self) -> &ListManager<Bookmark> {
        &self.list
    }

    #[instrument(skip(self))]
    pub fn add(&mut self, title: &str, url: &str, category: &str) -> WidgetResult<String> {
        let (title, url) = (title.trim(), url.trim());
        if title.is_empty() || url.is_empty() {
            return self
                .list
                .services()
                .reject(ValidationError::MissingBookmarkFields);
        }
        if Url::parse(url).is_err() {
            return self.list.services().reject(ValidationError::InvalidUrl);
        }
        let category = match category.trim() {
            "" => DEFAULT_CATEGORY,
            other => other,
        };

        Ok(self.list.add(Bookmark {
            title: title.to_string(),
            url: url.to_string(),
            category: category.to_string(),
        }))
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        self.list.delete(id, confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::Bookmarks;
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;

    #[test]
    fn malformed_url_is_rejected() {
        let h = Harness::new();
        let mut bookmarks = Bookmarks::new(h.services.clone());

        assert_eq!(
            bookmarks.add("Bad", "not-a-url", "Work"),
            Err(ValidationError::InvalidUrl)
        );
        assert!(bookmarks.list().is_empty());
        assert_eq!(h.last_message().as_deref(), Some("Please enter a valid URL"));
    }

    #[test]
    fn missing_fields_are_rejected() {
        let h = Harness::new();
        let mut bookmarks = Bookmarks::new(h.services.clone());

        assert_eq!(
            bookmarks.add("", "https://example.com", "Work"),
            Err(ValidationError::MissingBookmarkFields)
        );
    }

    #[test]
    fn valid_url_is_stored_and_shows_domain() {
        let h = Harness::new();
        let mut bookmarks = Bookmarks::new(h.services.clone());

        let id = bookmarks
            .add("Example", "https://example.com", "Work")
            .expect("added");

        let stored = bookmarks.list().get(&id).expect("stored");
        assert_eq!(stored.data.domain(), "example.com");
        let frame = bookmarks.list().render();
        assert!(frame.lines()[0].contains("Example <example.com> [Work]"));
    }
}
