use std::rc::Rc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{days_until, parse_date, short_id};
use crate::clock::Clock;
use crate::dashboard::Services;
use crate::error::{ValidationError, WidgetResult};
use crate::list::{ListManager, Record};
use crate::store::StoreKey;
use crate::surface::{Confirmed, Level};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportantDate {
    pub name: String,
    pub date: NaiveDate,
}

pub fn countdown(days: i64) -> String {
    match days {
        d if d < 0 => format!("{} days ago", -d),
        0 => "Today!".to_string(),
        d => format!("{d} days away"),
    }
}

fn by_date<'a>(
    items: &'a [Record<ImportantDate>],
    _filter: &str,
) -> Vec<&'a Record<ImportantDate>> {
    let mut sorted: Vec<&Record<ImportantDate>> = items.iter().collect();
    sorted.sort_by_key(|item| item.data.date);
    sorted
}

#[derive(Debug)]
pub struct ImportantDates {
    list: ListManager<ImportantDate>,
}

impl ImportantDates {
    pub fn new(services: Services) -> Self {
        let clock: Rc<dyn Clock> = Rc::clone(&services.clock);
        let list = ListManager::new(StoreKey::ImportantDates, services)
            .empty_message("No important dates yet")
            .filter_with(by_date)
            .render_with(move |item: &Record<ImportantDate>| {
                format!(
                    "{} {} {} ({})",
                    short_id(item.id()),
                    item.data.name,
                    item.data.date,
                    countdown(days_until(clock.today(), item.data.date))
                )
            });
        Self { list }
    }

    pub fn list(&self) -> &ListManager<ImportantDate> {
        &self.list
    }

    /// `date` is `YYYY-MM-DD`.
    #[instrument(skip(self))]
    pub fn add(&mut self, name: &str, date: &str) -> WidgetResult<String> {
        let name = name.trim();
        if name.is_empty() || date.trim().is_empty() {
            return self.list.services().reject(ValidationError::MissingDateFields);
        }
        let date = match parse_date(date) {
            Ok(date) => date,
            Err(err) => return self.list.services().reject(err),
        };

        let id = self.list.add(ImportantDate {
            name: name.to_string(),
            date,
        });
        self.list
            .services()
            .notify(Level::Success, "Important date added! 📅");
        Ok(id)
    }

    pub fn delete(&mut self, id: &str, confirmed: Confirmed) -> bool {
        self.list.delete(id, confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::{ImportantDates, countdown};
    use crate::dashboard::test_support::Harness;
    use crate::error::ValidationError;

    #[test]
    fn shown_in_date_order_with_countdowns() {
        let h = Harness::new();
        let mut dates = ImportantDates::new(h.services.clone());
        dates.add("Anniversary", "2026-12-01").expect("added");
        dates.add("Dentist", "2026-10-17").expect("added");
        dates.add("Tax day", "2026-10-10").expect("added");

        let frame = dates.list().render();
        let lines = frame.lines();
        assert!(lines[0].ends_with("Tax day 2026-10-10 (7 days ago)"));
        assert!(lines[1].ends_with("Dentist 2026-10-17 (Today!)"));
        assert!(lines[2].ends_with("Anniversary 2026-12-01 (45 days away)"));
    }

    #[test]
    fn name_and_valid_date_required() {
        let h = Harness::new();
        let mut dates = ImportantDates::new(h.services.clone());

        assert_eq!(dates.add("", "2026-10-10"), Err(ValidationError::MissingDateFields));
        assert_eq!(dates.add("Party", " "), Err(ValidationError::MissingDateFields));
        assert_eq!(
            dates.add("Party", "next friday"),
            Err(ValidationError::InvalidDate("next friday".to_string()))
        );
        assert!(dates.list().is_empty());
    }

    #[test]
    fn countdown_labels() {
        assert_eq!(countdown(-2), "2 days ago");
        assert_eq!(countdown(0), "Today!");
        assert_eq!(countdown(1), "1 days away");
    }
}
