use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::short_id;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{ListManager, Record};
use crate::store::StoreKey;
use crate::surface::{Confirmed, Frame, Level};

pub const QUOTE_REGION: &str = "quote";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub text: &'static str,
    pub author: &'static str,
}

const fn quote(text: &'static str, author: &'static str) -> Quote {
    Quote { text, author }
}

pub const QUOTES: [Quote; 12] = [
    quote("The only way to do great work is to love what you do.", "Steve Jobs"),
    quote("Success is not final, failure is not fatal.", "Winston Churchill"),
    quote("Believe you can and you're halfway there.", "Theodore Roosevelt"),
    quote(
        "The future belongs to those who believe in the beauty of their dreams.",
        "Eleanor Roosevelt",
    ),
    quote(
        "It is during our darkest moments that we must focus to see the light.",
        "Aristotle",
    ),
    quote("The only impossible journey is the one you never begin.", "Tony Robbins"),
    quote("Don't watch the clock; do what it does. Keep going.", "Sam Levenson"),
    quote(
        "The best time to plant a tree was 20 years ago. The second best time is now.",
        "Chinese Proverb",
    ),
    quote("Your limitation, it's only your imagination.", "Unknown"),
    quote("Push yourself, because no one else is going to do it for you.", "Unknown"),
    quote(
        "Sometimes we're tested not to show our weaknesses, but to discover our strengths.",
        "Unknown",
    ),
    quote("The key to success is to focus on goals, not obstacles.", "Unknown"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteQuote {
    pub text: String,
    pub author: String,
}

fn render_favorite(favorite: &Record<FavoriteQuote>) -> String {
    format!(
        "{} \"{}\" - {}",
        short_id(favorite.id()),
        favorite.data.text,
        favorite.data.author
    )
}

/// The quote of the moment plus the persisted favourites.
#[derive(Debug)]
pub struct Quotes {
    favorites: ListManager<FavoriteQuote>,
    current: Option<usize>,
}

impl Quotes {
    pub fn new(services: Services) -> Self {
        let favorites = ListManager::new(StoreKey::FavoriteQuotes, services)
            .empty_message("No favorite quotes yet")
            .render_with(render_favorite);
        Self {
            favorites,
            current: None,
        }
    }

    pub fn favorites(&self) -> &ListManager<FavoriteQuote> {
        &self.favorites
    }

    pub fn current(&self) -> Option<(usize, &'static Quote)> {
        let idx = self.current?;
        QUOTES.get(idx).map(|quote| (idx, quote))
    }

    /// Picks a built-in quote at random and shows it.
    pub fn next_quote(&mut self) -> (usize, &'static Quote) {
        let idx = rand::thread_rng().gen_range(0..QUOTES.len());
        debug!(idx, "picked quote");
        self.current = Some(idx);
        self.render_current();
        (idx, &QUOTES[idx])
    }

    /// Shows built-in quote `idx`; out-of-range indices change nothing.
    pub fn show_quote(&mut self, idx: usize) -> Option<&'static Quote> {
        let quote = QUOTES.get(idx)?;
        self.current = Some(idx);
        self.render_current();
        Some(quote)
    }

    /// Favourites the quote on screen. `Ok(None)` when nothing is shown yet.
    pub fn favorite_current(&mut self) -> WidgetResult<Option<String>> {
        let Some((_, quote)) = self.current() else {
            return Ok(None);
        };
        self.favorite(quote).map(Some)
    }

    #[instrument(skip(self))]
    pub fn favorite(&mut self, quote: &Quote) -> WidgetResult<String> {
        let exists = self
            .favorites
            .items()
            .iter()
            .any(|fav| fav.data.text == quote.text);
        if exists {
            return self.favorites.services().reject(ValidationError::AlreadyFavorite);
        }

        let id = self.favorites.add(FavoriteQuote {
            text: quote.text.to_string(),
            author: quote.author.to_string(),
        });
        self.favorites
            .services()
            .notify(Level::Success, "Added to favorites!");
        Ok(id)
    }

    pub fn remove_favorite(&mut self, id: &str, confirmed: Confirmed) -> bool {
        self.favorites.delete(id, confirmed)
    }

    pub fn render(&self) -> Frame {
        self.render_current();
        self.favorites.render()
    }

    fn render_current(&self) {
        let frame = match self.current() {
            Some((_, quote)) => Frame::Lines(vec![
                format!("\"{}\"", quote.text),
                format!("- {}", quote.author),
            ]),
            None => Frame::Empty("No quote shown yet".to_string()),
        };
        self.favorites.services().view.draw(QUOTE_REGION, &frame);
    }
}

#[cfg(test)]
mod tests {
    use super::{QUOTES, Quotes};
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;
    use crate::surface::{Confirmed, FixedPrompt, Frame, Level};

    #[test]
    fn favoriting_twice_keeps_one_copy() {
        let h = Harness::new();
        let mut quotes = Quotes::new(h.services.clone());
        quotes.show_quote(0).expect("built-in quote");

        quotes.favorite_current().expect("first favorite");
        assert_eq!(quotes.favorites().len(), 1);

        assert_eq!(quotes.favorite_current(), Err(ValidationError::AlreadyFavorite));
        assert_eq!(quotes.favorites().len(), 1);
        assert_eq!(
            h.notifier.last(),
            Some((Level::Warning, "Already in favorites!".to_string()))
        );
    }

    #[test]
    fn nothing_to_favorite_before_a_quote_is_shown() {
        let h = Harness::new();
        let mut quotes = Quotes::new(h.services.clone());
        assert_eq!(quotes.favorite_current(), Ok(None));
        assert!(quotes.favorites().is_empty());
    }

    #[test]
    fn next_quote_draws_a_built_in() {
        let h = Harness::new();
        let mut quotes = Quotes::new(h.services.clone());

        let (idx, quote) = quotes.next_quote();

        assert!(idx < QUOTES.len());
        assert_eq!(
            h.view.frame("quote"),
            Some(Frame::Lines(vec![
                format!("\"{}\"", quote.text),
                format!("- {}", quote.author)
            ]))
        );
        assert!(quotes.show_quote(QUOTES.len()).is_none());
    }

    #[test]
    fn removing_a_favorite() {
        let h = Harness::new();
        let mut quotes = Quotes::new(h.services.clone());
        let id = quotes.favorite(&QUOTES[3]).expect("added");
        let confirmed = Confirmed::ask(&FixedPrompt(true), "Remove?").expect("yes");

        assert!(quotes.remove_favorite(&id, confirmed));
        assert_eq!(
            quotes.render(),
            Frame::Empty("No favorite quotes yet".to_string())
        );
    }
}
