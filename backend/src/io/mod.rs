//! # I/O Capabilities
//!
//! Things the ledger needs from whoever presents it: asking the user a yes/no
//! question and drawing charts. The backend never builds UI itself; a desktop
//! shell, a web view or a test harness implements these traits and injects them.

use async_trait::async_trait;
use shared::ChartSeries;
use std::sync::Mutex;

/// Ask the user to confirm an action
#[async_trait]
pub trait ConfirmPrompt: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Receives chart data whenever the charts should be redrawn
pub trait ChartRenderer: Send + Sync {
    fn render(&self, series: &ChartSeries);
}

/// Gives the same answer to every question, and remembers what was asked.
/// Used for headless runs and tests.
#[derive(Debug, Default)]
pub struct FixedAnswer {
    answer: bool,
    asked: Mutex<Vec<String>>,
}

impl FixedAnswer {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn yes() -> Self {
        Self::new(true)
    }

    pub fn no() -> Self {
        Self::new(false)
    }

    /// Every message asked so far, oldest first
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .map(|asked| asked.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConfirmPrompt for FixedAnswer {
    async fn confirm(&self, message: &str) -> bool {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(message.to_string());
        }
        self.answer
    }
}

/// Keeps every rendered series in memory
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    rendered: Mutex<Vec<ChartSeries>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> Vec<ChartSeries> {
        self.rendered
            .lock()
            .map(|rendered| rendered.clone())
            .unwrap_or_default()
    }
}

impl ChartRenderer for RecordingRenderer {
    fn render(&self, series: &ChartSeries) {
        if let Ok(mut rendered) = self.rendered.lock() {
            rendered.push(series.clone());
        }
    }
}
