//! Keeps the live tree in step with the filesystem and with persisted view
//! state.
//!
//! [`TreeSync`] is either unbound or bound to one root directory. While
//! bound it owns the [`TreeState`] for that root and a set of
//! non-recursive directory watches: the root, every directory within
//! `watch_depth` levels of it, and any deeper directory the user has
//! expanded. Change notifications do not reload anything directly; they
//! schedule a refresh on [`Channel::DirectoryRefresh`] so a burst of
//! events costs a single reload.
//!
//! Expansion state is captured into the preference store before the tree
//! for a root is torn down (rebind, refresh, rename, delete) and restored
//! afterwards. Restoration after a rebind is deferred through
//! [`Channel::ExpansionRestore`] and dropped if the root changed in the
//! meantime.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{AppError, Result};
use crate::fs::operations;
use crate::fs::path_key::{entry_key, normalize_path};
use crate::fs::tree::{NodeType, TreeFilter, TreeState};
use crate::fs::watcher::{should_ignore, WatchBackend, DEFAULT_IGNORE_PATTERNS};
use crate::prefs::PreferenceStore;
use crate::scheduler::{Action, Channel, Scheduler};

/// Default depth of eagerly watched subdirectories below the root.
pub const DEFAULT_WATCH_DEPTH: usize = 3;
/// Default quiet period before an external change reloads the tree.
pub const DEFAULT_REFRESH_DELAY_MS: u64 = 300;
/// Default delay between binding a root and restoring its expansion set.
pub const DEFAULT_RESTORE_DELAY_MS: u64 = 100;

/// Tuning for [`TreeSync`].
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub watch_depth: usize,
    pub refresh_delay: Duration,
    pub restore_delay: Duration,
    pub ignore: Vec<String>,
    pub filter: TreeFilter,
    pub show_hidden: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            watch_depth: DEFAULT_WATCH_DEPTH,
            refresh_delay: Duration::from_millis(DEFAULT_REFRESH_DELAY_MS),
            restore_delay: Duration::from_millis(DEFAULT_RESTORE_DELAY_MS),
            ignore: DEFAULT_IGNORE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            filter: TreeFilter::default(),
            show_hidden: false,
        }
    }
}

struct Bound {
    /// Normalized root key; also the root path of `tree`.
    key: String,
    tree: TreeState,
}

/// A deferred restoration waiting for its timer.
struct PendingRestore {
    root: String,
    paths: Vec<String>,
}

/// Tree view-state synchronizer.
pub struct TreeSync {
    backend: Option<Box<dyn WatchBackend>>,
    options: SyncOptions,
    bound: Option<Bound>,
    watched: BTreeSet<PathBuf>,
    pending_restore: Option<PendingRestore>,
}

impl TreeSync {
    /// Create an unbound synchronizer. Without a backend nothing is watched
    /// and the tree only reloads on explicit refreshes.
    pub fn new(options: SyncOptions, backend: Option<Box<dyn WatchBackend>>) -> Self {
        Self {
            backend,
            options,
            bound: None,
            watched: BTreeSet::new(),
            pending_restore: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.is_some()
    }

    /// Normalized key of the bound root.
    pub fn root_key(&self) -> Option<&str> {
        self.bound.as_ref().map(|b| b.key.as_str())
    }

    pub fn root_path(&self) -> Option<&Path> {
        self.bound.as_ref().map(|b| b.tree.root.path.as_path())
    }

    pub fn tree(&self) -> Option<&TreeState> {
        self.bound.as_ref().map(|b| &b.tree)
    }

    pub fn tree_mut(&mut self) -> Option<&mut TreeState> {
        self.bound.as_mut().map(|b| &mut b.tree)
    }

    /// Directories currently registered with the backend.
    pub fn watched(&self) -> &BTreeSet<PathBuf> {
        &self.watched
    }

    #[cfg(test)]
    pub fn has_pending_restore(&self) -> bool {
        self.pending_restore.is_some()
    }

    /// Whether `path` lies inside the bound root.
    pub fn contains(&self, path: &Path) -> bool {
        self.root_path().is_some_and(|root| path.starts_with(root))
    }

    /// Bind the tree to `path`.
    ///
    /// Does nothing and returns `false` when `path` is not a directory. The
    /// expansion state of the previous root is persisted before the switch;
    /// the saved expansion set of the new root is scheduled for
    /// restoration.
    pub fn set_root(
        &mut self,
        path: &Path,
        prefs: &mut PreferenceStore,
        scheduler: &mut Scheduler,
        now: Instant,
    ) -> bool {
        if !path.is_dir() {
            tracing::debug!(path = %path.display(), "ignoring root that is not a directory");
            return false;
        }

        if self.bound.is_some() {
            self.capture(prefs);
            prefs.save_if_dirty();
        }

        let key = normalize_path(path);
        let tree = match TreeState::new(
            Path::new(&key),
            self.options.filter.clone(),
            self.options.show_hidden,
        ) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(root = %key, "failed to read root: {e}");
                return false;
            }
        };

        scheduler.cancel(Channel::ExpansionRestore);
        self.pending_restore = None;
        self.bound = Some(Bound {
            key: key.clone(),
            tree,
        });
        self.sync_watches();

        let saved = prefs.expanded_paths(&key);
        if !saved.is_empty() {
            self.pending_restore = Some(PendingRestore {
                root: key.clone(),
                paths: saved,
            });
            scheduler.schedule(
                Channel::ExpansionRestore,
                self.options.restore_delay,
                Action::RestoreExpansion { root: key.clone() },
                now,
            );
        }
        tracing::info!(root = %key, watched = self.watched.len(), "root bound");
        true
    }

    /// Expansion set that should survive a teardown right now. While a
    /// restoration is still pending that is the pending set, not the
    /// half-restored live tree.
    fn expansion_snapshot(&self) -> Vec<String> {
        match (&self.bound, &self.pending_restore) {
            (Some(bound), Some(pending)) if pending.root == bound.key => pending.paths.clone(),
            (Some(bound), _) => bound.tree.collect_expanded(),
            (None, _) => Vec::new(),
        }
    }

    /// Persist the current expansion set under the bound root's key.
    pub fn capture(&self, prefs: &mut PreferenceStore) {
        if let Some(bound) = &self.bound {
            prefs.set_expanded_paths(&bound.key, self.expansion_snapshot());
        }
    }

    /// Run a deferred restoration. Returns `false` when it no longer
    /// applies because the root was rebound or a refresh already restored.
    pub fn apply_restore(&mut self, root: &str) -> bool {
        let applies = matches!(
            (&self.bound, &self.pending_restore),
            (Some(bound), Some(pending)) if bound.key == root && pending.root == root
        );
        if !applies {
            tracing::debug!(root, "stale expansion restore dropped");
            return false;
        }
        let Some(pending) = self.pending_restore.take() else {
            return false;
        };
        let targets: HashSet<String> = pending.paths.into_iter().collect();
        if let Some(bound) = self.bound.as_mut() {
            let expanded = bound.tree.restore_expanded(&targets);
            tracing::debug!(root, restored = expanded.len(), "expansion restored");
        }
        self.sync_watches();
        true
    }

    /// Whether a change at `path` should refresh the tree: it lies inside
    /// the bound root and no component below the root is ignored.
    fn is_relevant(&self, path: &Path) -> bool {
        self.root_path()
            .and_then(|root| path.strip_prefix(root).ok())
            .is_some_and(|rel| !should_ignore(rel, &self.options.ignore))
    }

    /// React to changed paths reported by the watcher. Schedules a refresh
    /// if any of them is relevant to the bound root.
    pub fn handle_fs_change(&self, paths: &[PathBuf], scheduler: &mut Scheduler, now: Instant) -> bool {
        if !paths.iter().any(|p| self.is_relevant(p)) {
            return false;
        }
        scheduler.schedule(
            Channel::DirectoryRefresh,
            self.options.refresh_delay,
            Action::RefreshTree,
            now,
        );
        true
    }

    /// Capture expansion state, reload the tree and restore it.
    pub fn refresh(&mut self, prefs: &mut PreferenceStore, scheduler: &mut Scheduler) {
        if self.bound.is_none() {
            return;
        }
        self.capture(prefs);
        prefs.save_if_dirty();
        self.reload(prefs, scheduler);
    }

    /// Rebuild the tree from disk and apply the persisted expansion set
    /// immediately. Selection and hidden-file visibility survive.
    fn reload(&mut self, prefs: &mut PreferenceStore, scheduler: &mut Scheduler) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        scheduler.cancel(Channel::ExpansionRestore);
        self.pending_restore = None;

        let selected = bound.tree.selected().map(|item| item.path.clone());
        let show_hidden = bound.tree.show_hidden;
        let root = bound.tree.root.path.clone();
        match TreeState::new(&root, self.options.filter.clone(), show_hidden) {
            Ok(tree) => bound.tree = tree,
            Err(e) => {
                // Root vanished: keep it bound with no children.
                tracing::debug!(root = %bound.key, "root unreadable on reload: {e}");
                bound.tree.root.children = Some(Vec::new());
                bound.tree.selected_index = 0;
                bound.tree.flatten();
            }
        }

        let targets: HashSet<String> = prefs.expanded_paths(&bound.key).into_iter().collect();
        bound.tree.restore_expanded(&targets);
        if let Some(idx) = selected.and_then(|p| bound.tree.find_index_by_path(&p)) {
            bound.tree.selected_index = idx;
        }
        tracing::debug!(root = %bound.key, items = bound.tree.flat_items.len(), "tree reloaded");
        self.sync_watches();
    }

    /// Expand the selected directory, watching it if it lies deeper than
    /// the eager watch depth.
    pub fn expand_selected(&mut self) {
        let expanded = self.tree_mut().and_then(|tree| tree.expand_selected());
        if expanded.is_some() {
            self.sync_watches();
        }
    }

    pub fn collapse_selected(&mut self) {
        if let Some(tree) = self.tree_mut() {
            tree.collapse_selected();
            self.sync_watches();
        }
    }

    pub fn toggle_hidden(&mut self) {
        if let Some(tree) = self.tree_mut() {
            tree.toggle_hidden();
        }
    }

    /// Expand ancestors of `path` and select it.
    pub fn reveal(&mut self, path: &Path) -> bool {
        let revealed = self.tree_mut().is_some_and(|tree| tree.reveal(path));
        if revealed {
            self.sync_watches();
        }
        revealed
    }

    fn ensure_not_root(&self, path: &Path) -> Result<()> {
        if self.root_path() == Some(path) {
            return Err(AppError::InvalidPath("the root folder cannot be changed here".into()));
        }
        Ok(())
    }

    /// Rename `path` to `new_name` and carry its marks, scroll offsets and
    /// expansion entries (including every descendant's) to the new path.
    pub fn rename(
        &mut self,
        path: &Path,
        new_name: &str,
        prefs: &mut PreferenceStore,
        scheduler: &mut Scheduler,
    ) -> Result<PathBuf> {
        self.ensure_not_root(path)?;
        let old_key = entry_key(path);
        self.capture(prefs);

        let new_path = operations::rename(path, new_name)?;
        let new_key = entry_key(&new_path);
        if new_key != old_key {
            prefs.marks().relocate(&old_key, &new_key);
            prefs.relocate_scroll_positions(&old_key, &new_key);
            prefs.relocate_expanded_paths(&old_key, &new_key);
        }
        tracing::info!(from = %old_key, to = %new_key, "renamed");

        self.reload(prefs, scheduler);
        self.reveal(&new_path);
        prefs.save_if_dirty();
        Ok(new_path)
    }

    /// Delete `path` and drop marks and scroll offsets for it and anything
    /// beneath it.
    pub fn delete(
        &mut self,
        path: &Path,
        prefs: &mut PreferenceStore,
        scheduler: &mut Scheduler,
    ) -> Result<()> {
        self.ensure_not_root(path)?;
        let key = entry_key(path);
        self.capture(prefs);

        operations::delete(path)?;
        prefs.marks().forget(&key);
        prefs.forget_scroll_positions(&key);
        tracing::info!(path = %key, "deleted");

        self.reload(prefs, scheduler);
        prefs.save_if_dirty();
        Ok(())
    }

    /// Create a markdown file in `parent` and select it.
    pub fn create_file(
        &mut self,
        parent: &Path,
        name: &str,
        prefs: &mut PreferenceStore,
        scheduler: &mut Scheduler,
    ) -> Result<PathBuf> {
        let path = operations::create_file(parent, name)?;
        self.refresh(prefs, scheduler);
        self.reveal(&path);
        Ok(path)
    }

    /// Create a directory in `parent` and select it.
    pub fn create_dir(
        &mut self,
        parent: &Path,
        name: &str,
        prefs: &mut PreferenceStore,
        scheduler: &mut Scheduler,
    ) -> Result<PathBuf> {
        let path = operations::create_dir(parent, name)?;
        self.refresh(prefs, scheduler);
        self.reveal(&path);
        Ok(path)
    }

    /// Reconcile backend registrations with the directories that should be
    /// watched now.
    fn sync_watches(&mut self) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let mut desired = BTreeSet::new();
        if let Some(bound) = &self.bound {
            collect_watch_targets(
                &bound.tree.root.path,
                self.options.watch_depth,
                &self.options.ignore,
                &mut desired,
            );
            desired.extend(bound.tree.expanded_dirs());
        }

        let stale: Vec<PathBuf> = self.watched.difference(&desired).cloned().collect();
        for dir in stale {
            backend.unwatch(&dir);
            self.watched.remove(&dir);
        }
        for dir in desired {
            if self.watched.contains(&dir) {
                continue;
            }
            match backend.watch(&dir) {
                Ok(()) => {
                    self.watched.insert(dir);
                }
                Err(e) => tracing::debug!(dir = %dir.display(), "watch failed: {e}"),
            }
        }
    }

    /// Release every watch. The tree stays bound.
    pub fn shutdown(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            for dir in std::mem::take(&mut self.watched) {
                backend.unwatch(&dir);
            }
        }
    }
}

/// `dir` plus every subdirectory at most `depth` levels below it, skipping
/// ignored names and unreadable directories. Symlinked directories are not
/// followed.
fn collect_watch_targets(dir: &Path, depth: usize, ignore: &[String], out: &mut BTreeSet<PathBuf>) {
    out.insert(dir.to_path_buf());
    if depth == 0 {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let path = entry.path();
        let ignored = path
            .file_name()
            .is_some_and(|name| should_ignore(Path::new(name), ignore));
        if is_dir && !ignored {
            collect_watch_targets(&path, depth - 1, ignore, out);
        }
    }
}

/// Whether the selected tree item is a directory.
pub fn selected_is_dir(tree: &TreeState) -> bool {
    tree.selected()
        .is_some_and(|item| item.node_type == NodeType::Directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::Mark;
    use std::cell::RefCell;
    use std::fs::File;
    use std::rc::Rc;
    use tempfile::TempDir;

    /// Backend double that records registered directories.
    #[derive(Default, Clone)]
    struct Recorder {
        watched: Rc<RefCell<BTreeSet<PathBuf>>>,
        calls: Rc<RefCell<usize>>,
    }

    impl WatchBackend for Recorder {
        fn watch(&mut self, dir: &Path) -> Result<()> {
            *self.calls.borrow_mut() += 1;
            self.watched.borrow_mut().insert(dir.to_path_buf());
            Ok(())
        }

        fn unwatch(&mut self, dir: &Path) {
            self.watched.borrow_mut().remove(dir);
        }
    }

    struct Fixture {
        dir: TempDir,
        root: PathBuf,
        prefs: PreferenceStore,
        scheduler: Scheduler,
        recorder: Recorder,
        sync: TreeSync,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("notes/A/B/C/D/E")).unwrap();
        fs::create_dir_all(dir.path().join("notes/A/F")).unwrap();
        fs::create_dir_all(dir.path().join("notes/.git/objects")).unwrap();
        File::create(dir.path().join("notes/A/B/x.md")).unwrap();
        File::create(dir.path().join("notes/readme.md")).unwrap();
        let root = dir.path().join("notes").canonicalize().unwrap();
        let prefs = PreferenceStore::load(dir.path().join("app.json"));
        let recorder = Recorder::default();
        let sync = TreeSync::new(SyncOptions::default(), Some(Box::new(recorder.clone())));
        Fixture {
            dir,
            root,
            prefs,
            scheduler: Scheduler::new(),
            recorder,
            sync,
        }
    }

    impl Fixture {
        fn bind(&mut self, path: &Path, now: Instant) -> bool {
            self.sync
                .set_root(path, &mut self.prefs, &mut self.scheduler, now)
        }

        fn expand(&mut self, path: &Path) {
            let tree = self.sync.tree_mut().unwrap();
            tree.selected_index = tree.find_index_by_path(path).unwrap();
            self.sync.expand_selected();
        }

        fn run_ready(&mut self, now: Instant) {
            for action in self.scheduler.take_ready(now) {
                match action {
                    Action::RestoreExpansion { root } => {
                        self.sync.apply_restore(&root);
                    }
                    Action::RefreshTree => self.sync.refresh(&mut self.prefs, &mut self.scheduler),
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn non_directory_root_is_a_no_op() {
        let mut f = fixture();
        let file = f.root.join("readme.md");
        assert!(!f.bind(&file, Instant::now()));
        assert!(!f.bind(&f.root.join("missing"), Instant::now()));
        assert!(!f.sync.is_bound());
    }

    #[test]
    fn watches_are_depth_bounded_and_skip_ignored() {
        let mut f = fixture();
        let root = f.root.clone();
        assert!(f.bind(&root, Instant::now()));
        let watched = f.recorder.watched.borrow().clone();
        assert!(watched.contains(&root));
        assert!(watched.contains(&root.join("A/B/C")));
        assert!(!watched.contains(&root.join("A/B/C/D")));
        assert!(!watched.contains(&root.join(".git")));
        assert_eq!(&watched, f.sync.watched());
    }

    #[test]
    fn expanding_beyond_depth_adds_a_lazy_watch() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        for p in ["A", "A/B", "A/B/C", "A/B/C/D"] {
            f.expand(&root.join(p));
        }
        assert!(f.recorder.watched.borrow().contains(&root.join("A/B/C/D")));
        let tree = f.sync.tree_mut().unwrap();
        tree.selected_index = tree.find_index_by_path(&root.join("A")).unwrap();
        f.sync.collapse_selected();
        assert!(!f.recorder.watched.borrow().contains(&root.join("A/B/C/D")));
    }

    #[test]
    fn rebinding_persists_old_expansion_and_restores_later() {
        let mut f = fixture();
        let root = f.root.clone();
        let t0 = Instant::now();
        f.bind(&root, t0);
        f.expand(&root.join("A"));
        f.expand(&root.join("A/B"));

        let other = f.dir.path().join("other");
        fs::create_dir(&other).unwrap();
        f.bind(&other, t0);
        let key = normalize_path(&root);
        assert_eq!(
            f.prefs.expanded_paths(&key),
            vec![normalize_path(&root.join("A")), normalize_path(&root.join("A/B"))]
        );
        // Old root's watches are released.
        assert!(!f.recorder.watched.borrow().contains(&root));

        let t1 = t0 + Duration::from_secs(1);
        f.bind(&root, t1);
        assert!(f.sync.tree().unwrap().collect_expanded().is_empty());
        f.run_ready(t1 + Duration::from_millis(99));
        assert!(f.sync.has_pending_restore());
        f.run_ready(t1 + Duration::from_millis(100));
        let expanded = f.sync.tree().unwrap().collect_expanded();
        assert_eq!(expanded.len(), 2);
        let idx = f.sync.tree().unwrap().find_index_by_path(&root.join("A/F")).unwrap();
        assert!(!f.sync.tree().unwrap().flat_items[idx].is_expanded);
    }

    #[test]
    fn restore_for_a_replaced_root_is_dropped() {
        let mut f = fixture();
        let root = f.root.clone();
        let key = normalize_path(&root);
        f.prefs
            .set_expanded_paths(&key, vec![normalize_path(&root.join("A"))]);
        let t0 = Instant::now();
        f.bind(&root, t0);
        assert!(f.sync.has_pending_restore());
        assert!(!f.sync.apply_restore("/some/other/root"));

        let other = f.dir.path().join("other");
        fs::create_dir(&other).unwrap();
        f.bind(&other, t0);
        assert!(!f.scheduler.is_pending(Channel::ExpansionRestore));
        assert!(!f.sync.apply_restore(&key));
    }

    #[test]
    fn change_burst_schedules_one_refresh() {
        let mut f = fixture();
        let root = f.root.clone();
        let t0 = Instant::now();
        f.bind(&root, t0);
        for i in 0..10 {
            assert!(f.sync.handle_fs_change(
                &[root.join(format!("n{i}.md"))],
                &mut f.scheduler,
                t0 + Duration::from_millis(i * 20),
            ));
        }
        assert!(!f
            .sync
            .handle_fs_change(&[PathBuf::from("/elsewhere/x.md")], &mut f.scheduler, t0));
        let last = t0 + Duration::from_millis(180);
        assert!(f.scheduler.take_ready(last + Duration::from_millis(299)).is_empty());
        assert_eq!(
            f.scheduler.take_ready(last + Duration::from_millis(300)),
            vec![Action::RefreshTree]
        );
    }

    #[test]
    fn ignore_patterns_apply_only_below_the_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("target/notes/.git")).unwrap();
        let root = dir.path().join("target/notes").canonicalize().unwrap();
        let mut prefs = PreferenceStore::load(dir.path().join("app.json"));
        let mut scheduler = Scheduler::new();
        let mut sync = TreeSync::new(SyncOptions::default(), None);
        let t0 = Instant::now();
        assert!(sync.set_root(&root, &mut prefs, &mut scheduler, t0));
        scheduler.drain();

        assert!(!sync.handle_fs_change(&[root.join(".git/index")], &mut scheduler, t0));
        assert!(scheduler.drain().is_empty());
        assert!(sync.handle_fs_change(&[root.join("a.md")], &mut scheduler, t0));
        assert_eq!(scheduler.drain(), vec![Action::RefreshTree]);
    }

    #[test]
    fn refresh_picks_up_new_files_and_keeps_expansion() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        f.expand(&root.join("A"));
        File::create(root.join("A/new.md")).unwrap();
        f.sync.refresh(&mut f.prefs, &mut f.scheduler);
        let tree = f.sync.tree().unwrap();
        assert!(tree.find_index_by_path(&root.join("A/new.md")).is_some());
        assert_eq!(tree.collect_expanded(), vec![normalize_path(&root.join("A"))]);
    }

    #[test]
    fn refresh_during_pending_restore_keeps_the_pending_set() {
        let mut f = fixture();
        let root = f.root.clone();
        let key = normalize_path(&root);
        let wanted = vec![normalize_path(&root.join("A")), normalize_path(&root.join("A/B"))];
        f.prefs.set_expanded_paths(&key, wanted.clone());
        f.bind(&root, Instant::now());
        f.sync.refresh(&mut f.prefs, &mut f.scheduler);
        assert_eq!(f.prefs.expanded_paths(&key), wanted);
        assert_eq!(f.sync.tree().unwrap().collect_expanded(), wanted);
        assert!(!f.sync.has_pending_restore());
    }

    #[test]
    fn refresh_of_vanished_root_leaves_an_empty_tree() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        fs::remove_dir_all(&root).unwrap();
        f.sync.refresh(&mut f.prefs, &mut f.scheduler);
        assert_eq!(f.sync.tree().unwrap().flat_items.len(), 1);
    }

    #[test]
    fn rename_moves_marks_scroll_and_expansion() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        f.expand(&root.join("A"));
        f.expand(&root.join("A/B"));
        let doc = root.join("A/B/x.md");
        f.prefs.marks().set(&doc.to_string_lossy(), Some(Mark::Red));
        f.prefs.set_scroll_position(&doc.to_string_lossy(), 42);

        let renamed = f
            .sync
            .rename(&root.join("A"), "Z", &mut f.prefs, &mut f.scheduler)
            .unwrap();
        assert_eq!(renamed, root.join("Z"));
        let moved = root.join("Z/B/x.md");
        let moved_str = moved.to_string_lossy().to_string();
        assert_eq!(f.prefs.marks().get(&moved_str), Some(Mark::Red));
        assert_eq!(f.prefs.scroll_position(&moved_str), 42);
        assert_eq!(f.prefs.marks().get(&doc.to_string_lossy()), None);
        assert_eq!(
            f.sync.tree().unwrap().collect_expanded(),
            vec![normalize_path(&root.join("Z")), normalize_path(&root.join("Z/B"))]
        );
        assert!(!f.prefs.is_dirty());
    }

    #[test]
    fn rename_collision_changes_nothing() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        let doc = root.join("readme.md");
        f.prefs.marks().set(&doc.to_string_lossy(), Some(Mark::Green));
        let err = f
            .sync
            .rename(&doc, "A", &mut f.prefs, &mut f.scheduler)
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
        assert_eq!(f.prefs.marks().get(&doc.to_string_lossy()), Some(Mark::Green));
    }

    #[test]
    fn delete_forgets_descendant_state() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        let doc = root.join("A/B/x.md").to_string_lossy().to_string();
        let top = root.join("readme.md").to_string_lossy().to_string();
        f.prefs.marks().set(&doc, Some(Mark::Green));
        f.prefs.marks().set(&top, Some(Mark::Red));
        f.prefs.set_scroll_position(&doc, 7);

        f.sync
            .delete(&root.join("A"), &mut f.prefs, &mut f.scheduler)
            .unwrap();
        assert!(!root.join("A").exists());
        assert_eq!(f.prefs.marks().len(), 1);
        assert_eq!(f.prefs.scroll_position(&doc), 0);
        assert!(f.sync.tree().unwrap().find_index_by_path(&root.join("A")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn deleting_a_link_keeps_the_target_state() {
        let mut f = fixture();
        let root = f.root.clone();
        let real = root.join("readme.md");
        let alias = root.join("alias.md");
        std::os::unix::fs::symlink(&real, &alias).unwrap();
        f.bind(&root, Instant::now());
        let real_str = real.to_string_lossy().to_string();
        f.prefs.marks().set(&real_str, Some(Mark::Green));
        f.prefs.set_scroll_position(&real_str, 9);

        f.sync.delete(&alias, &mut f.prefs, &mut f.scheduler).unwrap();
        assert!(real.exists());
        assert_eq!(f.prefs.marks().get(&real_str), Some(Mark::Green));
        assert_eq!(f.prefs.scroll_position(&real_str), 9);
    }

    #[cfg(unix)]
    #[test]
    fn renaming_a_link_leaves_the_target_mark_alone() {
        let mut f = fixture();
        let root = f.root.clone();
        let real = root.join("readme.md");
        std::os::unix::fs::symlink(&real, root.join("alias.md")).unwrap();
        f.bind(&root, Instant::now());
        let real_str = real.to_string_lossy().to_string();
        f.prefs.marks().set(&real_str, Some(Mark::Red));

        f.sync
            .rename(&root.join("alias.md"), "other.md", &mut f.prefs, &mut f.scheduler)
            .unwrap();
        assert_eq!(f.prefs.marks().get(&real_str), Some(Mark::Red));
        assert_eq!(f.prefs.marks().len(), 1);
    }

    #[test]
    fn root_cannot_be_renamed_or_deleted() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        assert!(f.sync.delete(&root, &mut f.prefs, &mut f.scheduler).is_err());
        assert!(root.exists());
    }

    #[test]
    fn create_file_selects_new_document() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        let created = f
            .sync
            .create_file(&root.join("A"), "draft", &mut f.prefs, &mut f.scheduler)
            .unwrap();
        assert_eq!(created, root.join("A/draft.md"));
        assert_eq!(f.sync.tree().unwrap().selected().unwrap().path, created);
    }

    #[test]
    fn shutdown_releases_every_watch() {
        let mut f = fixture();
        let root = f.root.clone();
        f.bind(&root, Instant::now());
        assert!(*f.recorder.calls.borrow() > 0);
        f.sync.shutdown();
        assert!(f.recorder.watched.borrow().is_empty());
        assert!(f.sync.watched().is_empty());
    }
}
