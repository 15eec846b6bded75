use std::rc::Rc;
use std::thread;
use std::time::Duration as StdDuration;

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::dashboard::{Dashboard, STATS_REGION};
use crate::error::ValidationError;
use crate::list::ListManager;
use crate::render::{Renderer, StdinPrompt, TerminalView};
use crate::store::StoreKey;
use crate::surface::Confirmed;
use crate::widgets::expenses::{SUMMARY_REGION, parse_amount};
use crate::widgets::goals::PROGRESS_REGION;
use crate::widgets::parse_date;
use crate::widgets::pomodoro::POMODORO_REGION;
use crate::widgets::projects::ProjectStatus;
use crate::widgets::quotes::{QUOTE_REGION, QUOTES};
use crate::widgets::short_id;
use crate::widgets::time_tracker::TIMER_REGION;
use crate::widgets::todos::Priority;
use crate::widgets::weather::{OpenMeteo, WEATHER_REGION, Weather};

const POMODORO_POLL: StdDuration = StdDuration::from_millis(200);

pub fn known_widget_names() -> &'static [&'static str] {
    &[
        "todo", "expense", "bookmark", "project", "note", "quote", "goal", "water", "track",
        "book", "date", "habit", "pomodoro", "weather", "stats", "help", "version",
    ]
}

pub fn known_actions(widget: &str) -> &'static [&'static str] {
    match widget {
        "todo" | "goal" => &["add", "list", "done", "delete"],
        "expense" => &["add", "list", "delete", "clear"],
        "bookmark" | "note" => &["add", "list", "delete"],
        "project" => &["add", "list", "status", "progress", "task", "delete"],
        "quote" => &["next", "fav", "favs", "unfav"],
        "water" => &["show", "add", "reset", "goal"],
        "track" => &["start", "stop", "status", "list"],
        "book" => &["add", "list", "progress", "delete"],
        "date" => &["add", "list", "delete"],
        "habit" => &["add", "list", "check", "delete"],
        "pomodoro" => &["run"],
        _ => &[],
    }
}

/// Action used when a widget is named without one.
pub fn default_action(widget: &str) -> Option<&'static str> {
    match widget {
        "quote" => Some("next"),
        "water" => Some("show"),
        "track" => Some("status"),
        "pomodoro" => Some("run"),
        other if known_actions(other).contains(&"list") => Some("list"),
        _ => None,
    }
}

/// Exact name, or the single known name `token` is a prefix of.
pub fn expand_command_abbrev<'k>(token: &str, known: &[&'k str]) -> Option<&'k str> {
    if let Some(exact) = known.iter().copied().find(|name| *name == token) {
        return Some(exact);
    }
    if token.is_empty() {
        return None;
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Everything a command needs from the running process.
#[derive(Debug)]
pub struct Session {
    pub dashboard: Dashboard,
    pub view: Rc<TerminalView>,
    pub prompt: StdinPrompt,
    pub renderer: Renderer,
    pub settings: Settings,
}

impl Session {
    /// Redraws `regions` with the focus set so only they reach the terminal.
    fn show<F>(&self, regions: &[&str], draw: F)
    where
        F: FnOnce(&Dashboard),
    {
        self.view.show(regions);
        draw(&self.dashboard);
        self.view.hide_all();
    }

    fn confirm(&self, what: &str) -> Option<Confirmed> {
        let confirmed = Confirmed::ask(&self.prompt, &format!("Delete this {what}?"));
        if confirmed.is_none() {
            println!("Cancelled.");
        }
        confirmed
    }
}

#[instrument(skip(session, inv), fields(widget = %inv.widget, action = ?inv.action))]
pub fn dispatch(session: &mut Session, inv: Invocation) -> anyhow::Result<()> {
    debug!(args = ?inv.args, "dispatching command");
    let action = inv.action.as_deref().unwrap_or("");
    let args = inv.args.as_slice();

    match inv.widget.as_str() {
        "todo" => cmd_todo(session, action, args),
        "expense" => cmd_expense(session, action, args),
        "bookmark" => cmd_bookmark(session, action, args),
        "project" => cmd_project(session, action, args),
        "note" => cmd_note(session, action, args),
        "quote" => cmd_quote(session, action, args),
        "goal" => cmd_goal(session, action, args),
        "water" => cmd_water(session, action, args),
        "track" => cmd_track(session, action, args),
        "book" => cmd_book(session, action, args),
        "date" => cmd_date(session, action, args),
        "habit" => cmd_habit(session, action, args),
        "pomodoro" => cmd_pomodoro(session, args),
        "weather" => cmd_weather(session, args),
        "stats" => cmd_stats(session),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn cmd_todo(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    let todos = &mut session.dashboard.todos;
    match action {
        "add" => {
            let mut words = args.to_vec();
            let priority = match take_modifier(&mut words, &["priority", "pri"]) {
                Some(raw) => raw.parse::<Priority>().map_err(invalid)?,
                None => Priority::default(),
            };
            let id = todos.add(&words.join(" "), priority)?;
            println!("Created task {}.", short_id(&id));
        }
        "list" => {
            let filter = args.first().map(String::as_str).unwrap_or("all");
            session.view.show(&[StoreKey::Todos.as_str()]);
            session.dashboard.todos.list_mut().set_filter(filter);
            session.view.hide_all();
            println!("{}", session.dashboard.todos.summary());
        }
        "done" => {
            let id = resolve(todos.list(), required(args, 0, "task id")?)?;
            todos.toggle(&id);
            let done = todos.list().get(&id).is_some_and(|t| t.data.completed);
            println!(
                "Marked task {} as {}.",
                short_id(&id),
                if done { "completed" } else { "active" }
            );
        }
        "delete" => {
            let id = resolve(todos.list(), required(args, 0, "task id")?)?;
            if let Some(confirmed) = session.confirm("task") {
                session.dashboard.todos.delete(&id, confirmed);
                println!("Deleted task {}.", short_id(&id));
            }
        }
        other => return Err(unknown_action("todo", other)),
    }
    Ok(())
}

fn cmd_expense(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    match action {
        "add" => {
            let name = required(args, 0, "expense name")?;
            let raw_amount = required(args, 1, "amount")?;
            let amount =
                parse_amount(raw_amount).ok_or_else(|| anyhow!("invalid amount: {raw_amount}"))?;
            let category = args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
            let id = session.dashboard.expenses.add(name, amount, &category)?;
            println!("Recorded expense {}.", short_id(&id));
            session.show(&[SUMMARY_REGION], |d| {
                d.expenses.render();
            });
        }
        "list" => session.show(&[StoreKey::Expenses.as_str(), SUMMARY_REGION], |d| {
            d.expenses.render();
        }),
        "delete" => {
            let id = resolve(
                session.dashboard.expenses.list(),
                required(args, 0, "expense id")?,
            )?;
            if let Some(confirmed) = session.confirm("expense") {
                session.dashboard.expenses.delete(&id, confirmed);
                println!("Deleted expense {}.", short_id(&id));
            }
        }
        "clear" => {
            let confirmed = Confirmed::ask(&session.prompt, "Clear all expenses?");
            match confirmed {
                Some(confirmed) => {
                    let removed = session.dashboard.expenses.clear_all(confirmed);
                    println!("Cleared {removed} expenses.");
                }
                None => println!("Cancelled."),
            }
        }
        other => return Err(unknown_action("expense", other)),
    }
    Ok(())
}

fn cmd_bookmark(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    match action {
        "add" => {
            let title = required(args, 0, "title")?;
            let url = args.get(1).map(String::as_str).unwrap_or("");
            let category = args.get(2..).map(|rest| rest.join(" ")).unwrap_or_default();
            let id = session.dashboard.bookmarks.add(title, url, &category)?;
            println!("Saved bookmark {}.", short_id(&id));
        }
        "list" => session.show(&[StoreKey::Bookmarks.as_str()], |d| {
            d.bookmarks.list().render();
        }),
        "delete" => {
            let id = resolve(
                session.dashboard.bookmarks.list(),
                required(args, 0, "bookmark id")?,
            )?;
            if let Some(confirmed) = session.confirm("bookmark") {
                session.dashboard.bookmarks.delete(&id, confirmed);
                println!("Deleted bookmark {}.", short_id(&id));
            }
        }
        other => return Err(unknown_action("bookmark", other)),
    }
    Ok(())
}

fn cmd_project(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    match action {
        "add" => {
            let mut words = args.to_vec();
            let status = match take_modifier(&mut words, &["status"]) {
                Some(raw) => raw.parse::<ProjectStatus>().map_err(invalid)?,
                None => ProjectStatus::default(),
            };
            let deadline = take_modifier(&mut words, &["due", "deadline"])
                .map(|raw| parse_date(&raw))
                .transpose()
                .map_err(invalid)?;
            let name = words.first().cloned().unwrap_or_default();
            let description = words.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
            let id = session
                .dashboard
                .projects
                .add(&name, &description, status, deadline)?;
            println!("Created project {}.", short_id(&id));
        }
        "list" => {
            let filter = args.join(" ");
            let filter = if filter.is_empty() { "all" } else { filter.as_str() };
            session.view.show(&[StoreKey::Projects.as_str()]);
            session.dashboard.projects.list_mut().set_filter(filter);
            session.view.hide_all();
        }
        "status" => {
            let id = resolve(
                session.dashboard.projects.list(),
                required(args, 0, "project id")?,
            )?;
            let status = args[1..]
                .join(" ")
                .parse::<ProjectStatus>()
                .map_err(invalid)?;
            session.dashboard.projects.set_status(&id, status);
            println!("Project {} is now {status}.", short_id(&id));
        }
        "progress" => {
            let id = resolve(
                session.dashboard.projects.list(),
                required(args, 0, "project id")?,
            )?;
            let progress = parse_number(required(args, 1, "progress")?)?;
            session.dashboard.projects.set_progress(&id, progress);
            println!("Updated project {}.", short_id(&id));
        }
        "task" => {
            let id = resolve(
                session.dashboard.projects.list(),
                required(args, 0, "project id")?,
            )?;
            let text = args[1..].join(" ");
            if !session.dashboard.projects.add_task(&id, &text) {
                return Err(anyhow!("missing task text"));
            }
            println!("Added task to project {}.", short_id(&id));
        }
        "delete" => {
            let id = resolve(
                session.dashboard.projects.list(),
                required(args, 0, "project id")?,
            )?;
            if let Some(confirmed) = session.confirm("project") {
                session.dashboard.projects.delete(&id, confirmed);
                println!("Deleted project {}.", short_id(&id));
            }
        }
        other => return Err(unknown_action("project", other)),
    }
    Ok(())
}

fn cmd_note(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    match action {
        "add" => {
            let title = args.first().map(String::as_str).unwrap_or("");
            let content = args.get(1..).map(|rest| rest.join(" ")).unwrap_or_default();
            session.dashboard.notes.add(title, &content)?;
        }
        "list" => session.show(&[StoreKey::Notes.as_str()], |d| {
            d.notes.list().render();
        }),
        "delete" => {
            let id = resolve(session.dashboard.notes.list(), required(args, 0, "note id")?)?;
            if let Some(confirmed) = session.confirm("note") {
                session.dashboard.notes.delete(&id, confirmed);
            }
        }
        other => return Err(unknown_action("note", other)),
    }
    Ok(())
}

fn cmd_quote(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    let quotes = &mut session.dashboard.quotes;
    match action {
        "next" => {
            session.view.show(&[QUOTE_REGION]);
            let (idx, _) = quotes.next_quote();
            session.view.hide_all();
            println!("(quote #{}; `desk quote fav {}` to keep it)", idx + 1, idx + 1);
        }
        "fav" => {
            let idx = quote_index(required(args, 0, "quote number")?)?;
            quotes.show_quote(idx);
            quotes.favorite_current()?;
        }
        "favs" => session.show(&[StoreKey::FavoriteQuotes.as_str()], |d| {
            d.quotes.favorites().render();
        }),
        "unfav" => {
            let id = resolve(quotes.favorites(), required(args, 0, "favorite id")?)?;
            if let Some(confirmed) = session.confirm("favorite") {
                session.dashboard.quotes.remove_favorite(&id, confirmed);
                println!("Removed favorite {}.", short_id(&id));
            }
        }
        other => return Err(unknown_action("quote", other)),
    }
    Ok(())
}

fn cmd_goal(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    match action {
        "add" => {
            let id = session.dashboard.goals.add(&args.join(" "))?;
            println!("Created goal {}.", short_id(&id));
        }
        "list" => session.show(&[StoreKey::Goals.as_str(), PROGRESS_REGION], |d| {
            d.goals.render();
        }),
        "done" => {
            let id = resolve(session.dashboard.goals.list(), required(args, 0, "goal id")?)?;
            session.dashboard.goals.toggle(&id);
            println!("Goals {}% complete.", session.dashboard.goals.progress_percent());
        }
        "delete" => {
            let id = resolve(session.dashboard.goals.list(), required(args, 0, "goal id")?)?;
            if let Some(confirmed) = session.confirm("goal") {
                session.dashboard.goals.delete(&id, confirmed);
                println!("Deleted goal {}.", short_id(&id));
            }
        }
        other => return Err(unknown_action("goal", other)),
    }
    Ok(())
}

fn cmd_water(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    let water = &mut session.dashboard.water;
    match action {
        "show" => {}
        "add" => {
            if !water.add_cup() {
                println!("Daily goal already reached.");
            }
        }
        "reset" => water.reset(),
        "goal" => {
            let goal = parse_number(required(args, 0, "daily goal")?)?;
            water.set_goal(goal)?;
        }
        other => return Err(unknown_action("water", other)),
    }
    session.show(&[StoreKey::WaterIntake.as_str()], |d| {
        d.water.render();
    });
    Ok(())
}

fn cmd_track(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    let tracker = &mut session.dashboard.tracker;
    match action {
        "start" => {
            tracker.start(&args.join(" "))?;
            session.show(&[TIMER_REGION], |d| {
                d.tracker.render();
            });
        }
        "stop" => match tracker.stop() {
            Some(id) => {
                let recorded = tracker.list().get(&id).map(|a| a.data.name.clone());
                println!("Recorded {}.", recorded.unwrap_or_default());
            }
            None => println!("No activity running."),
        },
        "status" => session.show(&[TIMER_REGION], |d| {
            d.tracker.render();
        }),
        "list" => session.show(&[StoreKey::TimeTracking.as_str()], |d| {
            d.tracker.list().render();
        }),
        other => return Err(unknown_action("track", other)),
    }
    Ok(())
}

fn cmd_book(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    match action {
        "add" => {
            let mut words = args.to_vec();
            let author = take_modifier(&mut words, &["author", "by"]).unwrap_or_default();
            let id = session.dashboard.reading.add(&words.join(" "), &author)?;
            debug!(id = %id, "book added");
        }
        "list" => session.show(&[StoreKey::ReadingList.as_str()], |d| {
            d.reading.list().render();
        }),
        "progress" => {
            let id = resolve(session.dashboard.reading.list(), required(args, 0, "book id")?)?;
            let progress = parse_number(required(args, 1, "progress")?)?;
            session.dashboard.reading.set_progress(&id, progress);
            session.show(&[StoreKey::ReadingList.as_str()], |d| {
                d.reading.list().render();
            });
        }
        "delete" => {
            let id = resolve(session.dashboard.reading.list(), required(args, 0, "book id")?)?;
            if let Some(confirmed) = session.confirm("book") {
                session.dashboard.reading.delete(&id, confirmed);
                println!("Removed book {}.", short_id(&id));
            }
        }
        other => return Err(unknown_action("book", other)),
    }
    Ok(())
}

fn cmd_date(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    match action {
        "add" => {
            let (date, name) = args.split_last().unzip();
            let name = name.map(|words| words.join(" ")).unwrap_or_default();
            let date = date.map(String::as_str).unwrap_or("");
            session.dashboard.dates.add(&name, date)?;
        }
        "list" => session.show(&[StoreKey::ImportantDates.as_str()], |d| {
            d.dates.list().render();
        }),
        "delete" => {
            let id = resolve(session.dashboard.dates.list(), required(args, 0, "date id")?)?;
            if let Some(confirmed) = session.confirm("date") {
                session.dashboard.dates.delete(&id, confirmed);
                println!("Deleted date {}.", short_id(&id));
            }
        }
        other => return Err(unknown_action("date", other)),
    }
    Ok(())
}

fn cmd_habit(session: &mut Session, action: &str, args: &[String]) -> anyhow::Result<()> {
    match action {
        "add" => {
            let id = session.dashboard.habits.add(&args.join(" "))?;
            println!("Created habit {}.", short_id(&id));
        }
        "list" => session.show(&[StoreKey::Habits.as_str()], |d| {
            d.habits.list().render();
        }),
        "check" => {
            let id = resolve(session.dashboard.habits.list(), required(args, 0, "habit id")?)?;
            session.dashboard.habits.check_in(&id);
            session.show(&[StoreKey::Habits.as_str()], |d| {
                d.habits.list().render();
            });
        }
        "delete" => {
            let id = resolve(session.dashboard.habits.list(), required(args, 0, "habit id")?)?;
            if let Some(confirmed) = session.confirm("habit") {
                session.dashboard.habits.delete(&id, confirmed);
                println!("Deleted habit {}.", short_id(&id));
            }
        }
        other => return Err(unknown_action("habit", other)),
    }
    Ok(())
}

/// Counts down in the foreground until `sessions` work sessions finish.
#[instrument(skip(session, args))]
fn cmd_pomodoro(session: &mut Session, args: &[String]) -> anyhow::Result<()> {
    let sessions = match args.first() {
        Some(raw) => u64::try_from(parse_number(raw)?)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| anyhow!("session count must be positive"))?,
        None => 1,
    };
    let clock = SystemClock;
    let pomodoro = &mut session.dashboard.pomodoro;
    let target = pomodoro.sessions_completed() + sessions;
    info!(sessions, target, "running pomodoro");

    pomodoro.start(clock.now());
    let mut last_line = String::new();
    while pomodoro.sessions_completed() < target {
        thread::sleep(POMODORO_POLL);
        pomodoro.poll(clock.now());
        let line = pomodoro.render().lines().join("  ");
        if line != last_line {
            print!("\r{line}   ");
            std::io::Write::flush(&mut std::io::stdout()).context("failed to flush stdout")?;
            last_line = line;
        }
    }
    pomodoro.pause();
    println!();
    session.show(&[POMODORO_REGION], |d| {
        d.pomodoro.render();
    });
    Ok(())
}

fn cmd_weather(session: &mut Session, args: &[String]) -> anyhow::Result<()> {
    let mut weather = Weather::new(
        session.dashboard.services.clone(),
        Box::new(OpenMeteo::new()),
        &session.settings.weather_city,
    );
    session.view.show(&[WEATHER_REGION]);
    let loaded = if args.is_empty() {
        weather.load_here()
    } else {
        weather.load_city(&args.join(" "))?
    };
    session.view.hide_all();
    if !loaded {
        debug!("weather lookup failed");
    }
    Ok(())
}

fn cmd_stats(session: &mut Session) -> anyhow::Result<()> {
    session.dashboard.refresh_stats();
    let stats = session.dashboard.stats();
    session
        .renderer
        .print_table(["Stat", "Value"], stats.rows(&session.settings.currency))?;
    debug!(region = STATS_REGION, "printed stats");
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("usage: desk [options] <widget> [action] [args]");
    for widget in known_widget_names() {
        let actions = known_actions(widget);
        if actions.is_empty() {
            println!("  {widget}");
        } else {
            println!("  {widget:<9} {}", actions.join(" | "));
        }
    }
    println!("Names may be shortened to any unique prefix; so may record ids.");
    Ok(())
}

/// Zero-based index of a 1-based built-in quote number.
fn quote_index(raw: &str) -> anyhow::Result<usize> {
    parse_number(raw)?
        .checked_sub(1)
        .and_then(|idx| usize::try_from(idx).ok())
        .filter(|idx| *idx < QUOTES.len())
        .ok_or_else(|| anyhow!("quote number must be 1-{}", QUOTES.len()))
}

fn resolve<T>(list: &ListManager<T>, prefix: &str) -> anyhow::Result<String>
where
    T: Serialize + DeserializeOwned + 'static,
{
    list.resolve_prefix(prefix)
        .ok_or_else(|| anyhow!("no single {} entry matches id {prefix}", list.key()))
}

fn required<'a>(args: &'a [String], idx: usize, what: &str) -> anyhow::Result<&'a str> {
    args.get(idx)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing {what}"))
}

fn parse_number(raw: &str) -> anyhow::Result<i64> {
    raw.trim()
        .parse()
        .with_context(|| format!("expected a whole number, got {raw}"))
}

/// Removes the first `name:value` word for any of `names` and returns its
/// value.
fn take_modifier(words: &mut Vec<String>, names: &[&str]) -> Option<String> {
    let idx = words.iter().position(|word| {
        word.split_once(':')
            .is_some_and(|(name, _)| names.contains(&name))
    })?;
    let word = words.remove(idx);
    word.split_once(':').map(|(_, value)| value.to_string())
}

/// Argument errors the widgets never saw, so nothing reported them yet.
fn invalid(err: ValidationError) -> anyhow::Error {
    anyhow!("{err}")
}

fn unknown_action(widget: &str, action: &str) -> anyhow::Error {
    anyhow!("unknown {widget} action: {action}")
}
