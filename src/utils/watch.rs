use crate::core::session::BuildSession;
use crate::utils::{Logger, Result, TabaError};
use dashmap::DashMap;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Long-lived incremental rebuild loop for one entry file.
///
/// Tracks reverse dependencies so a change to one file also invalidates the
/// dependency edges of everything that imports it, keeps the file-system
/// watch list in sync with the currently-reachable file set, and funnels all
/// change notifications through a single consumer so only one rebuild is in
/// flight at a time; events arriving mid-rebuild are drained and coalesced
/// into the next one. A failed rebuild is logged and leaves the previous
/// bundle on disk.
pub struct WatchController {
    session: Arc<BuildSession>,
    entry: PathBuf,
    dependents: DashMap<PathBuf, HashSet<PathBuf>>,
    watched: Mutex<HashSet<PathBuf>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl WatchController {
    pub fn new(session: Arc<BuildSession>, entry: PathBuf) -> Self {
        Self {
            session,
            entry,
            dependents: DashMap::new(),
            watched: Mutex::new(HashSet::new()),
            watcher: Mutex::new(None),
        }
    }

    /// Build once, then keep rebuilding on change notifications until the
    /// watch channel closes or Ctrl+C arrives. The initial build failure is
    /// fatal; later failures are logged and awaited out.
    pub async fn run(&self) -> Result<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<PathBuf>();

        let watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                if let Ok(event) = result {
                    // The notifier's change/removal classification is not
                    // trustworthy; both kinds are handled identically.
                    if matches!(
                        event.kind,
                        EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Create(_)
                    ) {
                        for path in event.paths {
                            let _ = tx.send(path);
                        }
                    }
                }
            },
            Config::default(),
        )?;
        *self.watcher.lock() = Some(watcher);

        Logger::watch_started(&self.entry);
        self.rebuild().await?;

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    Logger::watch_stopped();
                    break;
                }
                received = rx.recv() => {
                    let Some(first) = received else { break };
                    let mut changed = vec![first];
                    while let Ok(more) = rx.try_recv() {
                        changed.push(more);
                    }
                    changed.sort();
                    changed.dedup();

                    let changed: Vec<PathBuf> = changed
                        .into_iter()
                        .map(|path| path.canonicalize().unwrap_or(path))
                        .filter(|path| self.watched.lock().contains(path))
                        .collect();
                    if changed.is_empty() {
                        continue;
                    }

                    let start = Instant::now();
                    for path in &changed {
                        Logger::file_changed(path);
                        self.apply_change(path);
                    }
                    match self.rebuild().await {
                        Ok(()) => Logger::incremental_done(start.elapsed()),
                        Err(err) => Logger::rebuild_failed(&err),
                    }
                }
            }
        }
        Ok(())
    }

    /// Evict everything the session knows about a changed or removed file.
    /// Dependents lose only their dependency edges, since the changed file's
    /// identity or location may have shifted under them. The file drops out
    /// of the watch list; the next rebuild re-adds it if still reachable.
    pub fn apply_change(&self, file: &Path) {
        self.session.forget(file);
        if let Some((_, dependents)) = self.dependents.remove(file) {
            for dependent in dependents {
                self.session.forget_dependencies(&dependent);
            }
        }
        let mut watched = self.watched.lock();
        if watched.remove(file) {
            if let Some(watcher) = self.watcher.lock().as_mut() {
                let _ = watcher.unwatch(file);
            }
        }
    }

    /// One full pipeline pass: graph, bookkeeping, compile, assemble, write.
    /// The bundle is written only after the whole pass succeeded.
    pub async fn rebuild(&self) -> Result<()> {
        Logger::build_start(&self.entry);
        let entry_abs = self.session.resolve_entry(&self.entry).await?;
        let files = self.session.collect_modules(&entry_abs).await?;
        Logger::graph_resolved(files.len());

        self.track(&files).await?;

        let bundle = self.session.emit_bundle(&files, &entry_abs).await?;
        let file_name = self.entry.file_name().ok_or_else(|| {
            TabaError::build(format!("entry has no file name: {}", self.entry.display()))
        })?;
        let out_path = self.session.options.out_dir.join(file_name);
        self.session
            .file_system()
            .write_file(&out_path, &bundle)
            .await?;
        Logger::bundle_written(&out_path, bundle.len());
        Ok(())
    }

    /// Record reverse-dependency edges for the resolved file set (additive;
    /// entries for files not in this set are left alone) and diff the watch
    /// list against it.
    pub async fn track(&self, files: &[PathBuf]) -> Result<()> {
        for file in files {
            let edges = self.session.dependencies(file).await?;
            for edge in edges {
                self.dependents
                    .entry(edge.path)
                    .or_default()
                    .insert(file.clone());
            }
        }

        let next: HashSet<PathBuf> = files.iter().cloned().collect();
        let mut watched = self.watched.lock();
        let mut watcher = self.watcher.lock();
        if let Some(watcher) = watcher.as_mut() {
            for removed in watched.difference(&next) {
                let _ = watcher.unwatch(removed);
            }
            for added in next.difference(&*watched) {
                let _ = watcher.watch(added, RecursiveMode::NonRecursive);
            }
        }
        *watched = next;
        Ok(())
    }

    #[cfg(test)]
    fn dependents_of(&self, file: &Path) -> HashSet<PathBuf> {
        self.dependents
            .get(file)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    #[cfg(test)]
    fn is_watched(&self, file: &Path) -> bool {
        self.watched.lock().contains(file)
    }
}
