use crate::core::session::BuildSession;
use crate::utils::Result;
use futures::future::{try_join_all, BoxFuture};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Expand the complete, deduplicated, cycle-safe set of files reachable from
/// `entry`.
///
/// Two passes: a concurrent expansion that races into sibling dependencies
/// (the seen list's check-then-insert is mutex-guarded, so every path is
/// visited at most once even under fan-out), then a cheap sequential walk
/// over the now-memoized edge caches that fixes the returned order. File ids
/// are assigned from that order, so repeated builds over unchanged input
/// produce identical bundles.
pub(crate) async fn collect_modules(
    session: &BuildSession,
    entry: &Path,
) -> Result<Vec<PathBuf>> {
    let seen = Mutex::new(Vec::new());
    expand(session, entry.to_path_buf(), &seen).await?;

    let mut ordered = Vec::with_capacity(seen.lock().len());
    order(session, entry.to_path_buf(), &mut ordered).await?;
    Ok(ordered)
}

fn expand<'a>(
    session: &'a BuildSession,
    file: PathBuf,
    seen: &'a Mutex<Vec<PathBuf>>,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        {
            let mut guard = seen.lock();
            if guard.contains(&file) {
                return Ok(());
            }
            guard.push(file.clone());
        }
        let edges = session.dependencies(&file).await?;
        try_join_all(
            edges
                .into_iter()
                .map(|edge| expand(session, edge.path, seen)),
        )
        .await?;
        Ok(())
    })
}

fn order<'a>(
    session: &'a BuildSession,
    file: PathBuf,
    ordered: &'a mut Vec<PathBuf>,
) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        if ordered.contains(&file) {
            return Ok(());
        }
        ordered.push(file.clone());
        let edges = session.dependencies(&file).await?;
        for edge in edges {
            order(session, edge.path, &mut *ordered).await?;
        }
        Ok(())
    })
}
