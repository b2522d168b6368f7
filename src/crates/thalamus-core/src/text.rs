//! Text signal contract.

use std::cell::{Ref, RefCell};
use std::time::Duration;

use crate::clock;

/// Borrowed text view, valid until the producer's next `ready`.
pub type TextSpan<'a> = Ref<'a, str>;

pub trait TextNode {
    fn text(&self) -> TextSpan<'_>;

    fn time(&self) -> Duration;

    fn has_text_data(&self) -> bool {
        true
    }
}

struct TextData {
    text: String,
    time: Duration,
}

/// Shared text output buffer.
pub struct TextOutput {
    inner: RefCell<TextData>,
}

impl Default for TextOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl TextOutput {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(TextData {
                text: String::new(),
                time: Duration::ZERO,
            }),
        }
    }

    pub fn publish(&self, text: String) {
        self.publish_at(text, clock::steady_now());
    }

    pub fn publish_at(&self, text: String, time: Duration) {
        let mut inner = self.inner.borrow_mut();
        inner.text = text;
        inner.time = time;
    }

    pub fn text(&self) -> TextSpan<'_> {
        Ref::map(self.inner.borrow(), |d| d.text.as_str())
    }

    pub fn time(&self) -> Duration {
        self.inner.borrow().time
    }
}
