//! Seams between the dashboard logic and whatever front end shows it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// What a widget wants shown in its region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Empty(String),
    Lines(Vec<String>),
}

impl Frame {
    pub fn lines(&self) -> &[String] {
        match self {
            Frame::Empty(_) => &[],
            Frame::Lines(lines) => lines,
        }
    }
}

pub trait View: Debug {
    fn draw(&self, region: &str, frame: &Frame);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Debug {
    fn notify(&self, level: Level, message: &str);
}

pub trait Prompt: Debug {
    fn confirm(&self, message: &str) -> bool;
}

/// Proof that the user agreed to a destructive operation.
#[derive(Debug)]
pub struct Confirmed(());

impl Confirmed {
    pub fn ask(prompt: &dyn Prompt, message: &str) -> Option<Self> {
        prompt.confirm(message).then_some(Confirmed(()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullView;

impl View for NullView {
    fn draw(&self, _region: &str, _frame: &Frame) {}
}

/// Keeps the latest frame per region and how many draws happened.
#[derive(Debug, Default)]
pub struct RecordingView {
    frames: RefCell<BTreeMap<String, Frame>>,
    draws: RefCell<usize>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&self, region: &str) -> Option<Frame> {
        self.frames.borrow().get(region).cloned()
    }

    pub fn draw_count(&self) -> usize {
        *self.draws.borrow()
    }
}

impl View for RecordingView {
    fn draw(&self, region: &str, frame: &Frame) {
        self.frames
            .borrow_mut()
            .insert(region.to_string(), frame.clone());
        *self.draws.borrow_mut() += 1;
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: RefCell<Vec<(Level, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }

    pub fn last(&self) -> Option<(Level, String)> {
        self.messages.borrow().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: Level, message: &str) {
        self.messages
            .borrow_mut()
            .push((level, message.to_string()));
    }
}

/// Answers every confirmation the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrompt(pub bool);

impl Prompt for FixedPrompt {
    fn confirm(&self, _message: &str) -> bool {
        self.0
    }
}
