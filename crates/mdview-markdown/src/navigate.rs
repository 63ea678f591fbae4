//! Following links between and within documents.
//!
//! [`NavigationHandler`] owns no document state. Everything it needs from the document view is
//! reached through [`NavigationHost`], which the view implements. It never touches the layout
//! tree: it reads anchor offsets and asks the host to scroll or load.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use crate::assets;
use crate::assets::AssetSource;
use crate::error::ViewerError;
use crate::history::SharedHistory;

/// The document view a [`NavigationHandler`] acts on.
pub trait NavigationHost {
    /// Path of the document currently shown. Relative targets resolve against it.
    fn document_path(&self) -> Option<&Path>;

    /// Content row of the anchor `id` in the current document.
    fn find_anchor(&mut self, id: &str) -> Option<u32>;

    fn scroll_to(&mut self, y: u32);

    /// Replaces the current document with `path`.
    ///
    /// On error the current document must stay as it was.
    fn load_document(&mut self, path: &Path) -> Result<(), ViewerError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// Scrolled to an anchor in the current document.
    Scrolled(u32),
    /// The anchor does not exist; nothing changed.
    AnchorMissing(String),
    /// A URL the host should hand to the system (browser, mail client, ...).
    External(String),
    /// Another document was loaded.
    Opened(PathBuf),
}

/// Resolves link targets and walks the shared history.
#[derive(Clone)]
pub struct NavigationHandler {
    history: SharedHistory,
    assets: Arc<dyn AssetSource>,
}

impl NavigationHandler {
    pub fn new(history: SharedHistory, assets: Arc<dyn AssetSource>) -> Self {
        Self { history, assets }
    }

    pub fn history(&self) -> &SharedHistory {
        &self.history
    }

    /// Follows a link `target` as found in the current document.
    ///
    /// A document is loaded before history records it, so a failed load leaves both the view
    /// and the history untouched.
    pub fn follow(
        &self,
        target: &str,
        host: &mut dyn NavigationHost,
    ) -> Result<Navigation, ViewerError> {
        let target = target.trim();
        if let Some(id) = target.strip_prefix('#') {
            return Ok(scroll_to_anchor(id, host));
        }
        if assets::has_scheme(target) {
            tracing::debug!(target, "external link");
            return Ok(Navigation::External(target.to_string()));
        }

        let (path_part, fragment) = match target.split_once('#') {
            Some((path, id)) => (path, Some(id)),
            None => (target, None),
        };
        let base = host
            .document_path()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let path = self
            .assets
            .resolve(&base, path_part)
            .ok_or_else(|| ViewerError::Unresolvable {
                target: target.to_string(),
            })?;

        host.load_document(&path)?;
        self.history.borrow_mut().on_open(path.clone());
        tracing::debug!(path = %path.display(), "followed link");

        if let Some(id) = fragment.filter(|id| !id.is_empty()) {
            scroll_to_anchor(id, host);
        }
        Ok(Navigation::Opened(path))
    }

    /// Loads the previous history entry without recording a new one.
    pub fn back(&self, host: &mut dyn NavigationHost) -> Result<Navigation, ViewerError> {
        let path = self
            .history
            .borrow()
            .peek_back()
            .map(Path::to_path_buf)
            .ok_or(ViewerError::History("back"))?;
        host.load_document(&path)?;
        self.history.borrow_mut().back();
        tracing::debug!(path = %path.display(), "history back");
        Ok(Navigation::Opened(path))
    }

    /// Loads the next history entry without recording a new one.
    pub fn forward(&self, host: &mut dyn NavigationHost) -> Result<Navigation, ViewerError> {
        let path = self
            .history
            .borrow()
            .peek_forward()
            .map(Path::to_path_buf)
            .ok_or(ViewerError::History("forward"))?;
        host.load_document(&path)?;
        self.history.borrow_mut().forward();
        tracing::debug!(path = %path.display(), "history forward");
        Ok(Navigation::Opened(path))
    }
}

fn scroll_to_anchor(id: &str, host: &mut dyn NavigationHost) -> Navigation {
    match host.find_anchor(id) {
        Some(y) => {
            host.scroll_to(y);
            Navigation::Scrolled(y)
        }
        None => {
            tracing::debug!(id, "anchor not found");
            Navigation::AnchorMissing(id.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;

    use super::*;
    use crate::assets::MemoryAssets;
    use crate::history::History;

    #[derive(Default)]
    struct FakeHost {
        path: Option<PathBuf>,
        anchors: HashMap<String, u32>,
        scroll: Option<u32>,
        loads: Vec<PathBuf>,
        missing: Vec<PathBuf>,
    }

    impl NavigationHost for FakeHost {
        fn document_path(&self) -> Option<&Path> {
            self.path.as_deref()
        }

        fn find_anchor(&mut self, id: &str) -> Option<u32> {
            self.anchors.get(id).copied()
        }

        fn scroll_to(&mut self, y: u32) {
            self.scroll = Some(y);
        }

        fn load_document(&mut self, path: &Path) -> Result<(), ViewerError> {
            if self.missing.iter().any(|p| p == path) {
                return Err(ViewerError::Read {
                    path: path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::NotFound, "missing"),
                });
            }
            self.path = Some(path.to_path_buf());
            self.loads.push(path.to_path_buf());
            Ok(())
        }
    }

    fn handler() -> NavigationHandler {
        let history = History::new().shared();
        history.borrow_mut().on_open("/docs/a.md");
        NavigationHandler::new(history, Arc::new(MemoryAssets::new()))
    }

    fn host() -> FakeHost {
        FakeHost {
            path: Some(PathBuf::from("/docs/a.md")),
            ..FakeHost::default()
        }
    }

    #[test]
    fn anchors_scroll_without_history() {
        let nav = handler();
        let mut host = host();
        host.anchors.insert("usage".to_string(), 12);
        assert_eq!(nav.follow("#usage", &mut host).unwrap(), Navigation::Scrolled(12));
        assert_eq!(host.scroll, Some(12));
        assert_eq!(
            nav.follow("#nope", &mut host).unwrap(),
            Navigation::AnchorMissing("nope".to_string())
        );
        assert_eq!(nav.history().borrow().len(), 1);
    }

    #[test]
    fn urls_are_external() {
        let nav = handler();
        let mut host = host();
        assert_eq!(
            nav.follow("https://example.com", &mut host).unwrap(),
            Navigation::External("https://example.com".to_string())
        );
        assert!(host.loads.is_empty());
    }

    #[test]
    fn relative_links_load_then_record() {
        let nav = handler();
        let mut host = host();
        host.anchors.insert("top".to_string(), 3);
        let result = nav.follow("../guide/b.md#top", &mut host).unwrap();
        assert_eq!(result, Navigation::Opened(PathBuf::from("/guide/b.md")));
        assert_eq!(host.scroll, Some(3));
        let history = nav.history().borrow();
        assert_eq!(history.current(), Some(Path::new("/guide/b.md")));
        assert!(history.can_back());
    }

    #[test]
    fn failed_loads_leave_history_alone() {
        let nav = handler();
        let mut host = host();
        host.missing.push(PathBuf::from("/docs/gone.md"));
        assert!(matches!(
            nav.follow("gone.md", &mut host),
            Err(ViewerError::Read { .. })
        ));
        assert_eq!(nav.history().borrow().len(), 1);
        assert_eq!(host.path, Some(PathBuf::from("/docs/a.md")));
    }

    #[test]
    fn back_and_forward_do_not_push() {
        let nav = handler();
        let mut host = host();
        nav.follow("b.md", &mut host).unwrap();
        assert_eq!(
            nav.back(&mut host).unwrap(),
            Navigation::Opened(PathBuf::from("/docs/a.md"))
        );
        assert!(matches!(nav.back(&mut host), Err(ViewerError::History("back"))));
        assert_eq!(
            nav.forward(&mut host).unwrap(),
            Navigation::Opened(PathBuf::from("/docs/b.md"))
        );
        assert_eq!(nav.history().borrow().len(), 2);
        assert_eq!(host.loads.len(), 3);
    }
}
