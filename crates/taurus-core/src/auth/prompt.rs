//! Interactive input used by credential setup.
//!
//! The store never reads the terminal itself; front ends pass an implementation
//! of [`Prompt`] so setup can be driven from stdin, a GUI, or a test script.

use std::collections::VecDeque;
use std::io;

pub trait Prompt {
    /// Ask a yes/no question. `Ok(false)` means the user declined.
    fn confirm(&mut self, message: &str) -> io::Result<bool>;

    /// Ask for the value of a credential field.
    ///
    /// `label` is human readable (`app id`), `secret` marks values that
    /// should not be echoed.
    fn ask(&mut self, label: &str, secret: bool) -> io::Result<String>;
}

/// Prompt that replays canned answers, for scripted setup and tests.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    confirmations: VecDeque<bool>,
    answers: VecDeque<String>,
    /// Labels asked for, in order
    pub asked: Vec<String>,
    /// Confirmation messages shown, in order
    pub confirmed: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirmation(mut self, answer: bool) -> Self {
        self.confirmations.push_back(answer);
        self
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answers.push_back(answer.into());
        self
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&mut self, message: &str) -> io::Result<bool> {
        self.confirmed.push(message.to_string());
        self.confirmations.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted confirmation left")
        })
    }

    fn ask(&mut self, label: &str, _secret: bool) -> io::Result<String> {
        self.asked.push(label.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left"))
    }
}
