use std::cell::RefCell;
use std::io::{self, BufRead, IsTerminal, Write};

use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::surface::{Frame, Level, Notifier, Prompt, View};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    #[tracing::instrument(skip(self, rows))]
    pub fn print_table(&self, headers: [&str; 2], rows: Vec<(String, String)>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let headers = headers.iter().map(|h| self.paint(h, "1")).collect();
        let rows = rows
            .into_iter()
            .map(|(label, value)| vec![label, self.paint(&value, "33")])
            .collect();
        write_table(&mut out, headers, rows)
    }

    pub fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Prints frames for the regions the current command asked to see and
/// drops the rest.
#[derive(Debug)]
pub struct TerminalView {
    renderer: Renderer,
    focus: RefCell<Vec<String>>,
}

impl TerminalView {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            focus: RefCell::new(Vec::new()),
        }
    }

    pub fn show(&self, regions: &[&str]) {
        *self.focus.borrow_mut() = regions.iter().map(|r| r.to_string()).collect();
    }

    pub fn hide_all(&self) {
        self.focus.borrow_mut().clear();
    }

    fn write_frame(&self, frame: &Frame) -> io::Result<()> {
        let mut out = io::stdout().lock();
        match frame {
            Frame::Empty(message) => writeln!(out, "{}", self.renderer.paint(message, "2")),
            Frame::Lines(lines) => {
                for line in lines {
                    writeln!(out, "{line}")?;
                }
                Ok(())
            }
        }
    }
}

impl View for TerminalView {
    fn draw(&self, region: &str, frame: &Frame) {
        if !self.focus.borrow().iter().any(|r| r == region) {
            return;
        }
        if let Err(err) = self.write_frame(frame) {
            warn!(region, error = %err, "failed to write frame");
        }
    }
}

#[derive(Debug)]
pub struct TerminalNotifier {
    renderer: Renderer,
}

impl TerminalNotifier {
    pub fn new(renderer: Renderer) -> Self {
        Self { renderer }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, level: Level, message: &str) {
        let result = match level {
            Level::Info => writeln!(io::stdout(), "{message}"),
            Level::Success => writeln!(io::stdout(), "{}", self.renderer.paint(message, "32")),
            Level::Warning => writeln!(io::stderr(), "{}", self.renderer.paint(message, "33")),
            Level::Error => writeln!(io::stderr(), "{}", self.renderer.paint(message, "31")),
        };
        if let Err(err) = result {
            warn!(error = %err, "failed to write notification");
        }
    }
}

/// Asks on stdin; `assume_yes` skips the question.
#[derive(Debug, Clone, Copy)]
pub struct StdinPrompt {
    assume_yes: bool,
}

impl StdinPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompt for StdinPrompt {
    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{message} (yes/no) ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(err) => {
                warn!(error = %err, "failed to read confirmation");
                false
            }
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(header).as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    write_row(&mut writer, &headers, &widths)?;
    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in &rows {
        write_row(&mut writer, row, &widths)?;
    }

    Ok(())
}

fn write_row<W: Write>(writer: &mut W, cells: &[String], widths: &[usize]) -> anyhow::Result<()> {
    for (cell, width) in cells.iter().zip(widths) {
        let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
        let padding = width.saturating_sub(visible_width);
        write!(writer, "{}{} ", cell, " ".repeat(padding))?;
    }
    writeln!(writer)?;
    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::{is_yes, strip_ansi, write_table};

    #[test]
    fn table_pads_by_visible_width() {
        let mut out = Vec::new();
        write_table(
            &mut out,
            vec!["Stat".to_string(), "Value".to_string()],
            vec![
                vec!["Total spent".to_string(), "\x1b[33m₹3.46\x1b[0m".to_string()],
                vec!["Habits".to_string(), "2".to_string()],
            ],
        )
        .expect("written");

        let text = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Stat        Value ");
        assert_eq!(lines[1], "----------- ----- ");
        assert_eq!(strip_ansi(lines[2]), "Total spent ₹3.46 ");
        assert_eq!(lines[3], "Habits      2     ");
    }

    #[test]
    fn confirmation_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("nope"));
        assert!(!is_yes(""));
    }
}
