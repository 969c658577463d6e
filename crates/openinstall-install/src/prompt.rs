//! Interactive confirmation

use dialoguer::Confirm;

/// Yes/no confirmation at decision points in a guided run
pub trait Prompter: Send + Sync {
    /// Ask the user; a read failure (no tty) counts as a decline.
    fn confirm(&self, message: &str) -> bool;
}

/// Terminal prompter backed by dialoguer
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn confirm(&self, message: &str) -> bool {
        Confirm::new()
            .with_prompt(message)
            .default(true)
            .interact()
            .unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Prompter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted prompter returning a fixed answer, counting calls
    pub struct FixedPrompter {
        answer: bool,
        calls: AtomicUsize,
    }

    impl FixedPrompter {
        pub fn new(answer: bool) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Prompter for FixedPrompter {
        fn confirm(&self, _message: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }
}
