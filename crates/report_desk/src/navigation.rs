use parking_lot::Mutex;
use session::Navigator;
use tracing::debug;

/// In-process location history.
///
/// `navigate_to` pushes, `redirect_to` replaces the current entry so a denied
/// view never stays in the history.
#[derive(Debug)]
pub struct HistoryNavigator {
    entries: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            entries: Mutex::new(vec![start.into()]),
        }
    }

    pub fn current(&self) -> String {
        self.entries.lock().last().cloned().unwrap_or_default()
    }

    pub fn history(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl Navigator for HistoryNavigator {
    fn redirect_to(&self, path: &str) {
        debug!(%path, "redirect");
        let mut entries = self.entries.lock();
        entries.pop();
        entries.push(path.to_owned());
    }

    fn navigate_to(&self, path: &str) {
        debug!(%path, "navigate");
        self.entries.lock().push(path.to_owned());
    }
}
