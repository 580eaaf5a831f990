use crate::core::models::{BundleOptions, MapMode, StylePolicy};
use crate::core::session::BuildSession;
use crate::utils::{Logger, Result, WatchController};
use clap::Parser;
use futures::future::try_join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "taba")]
#[command(about = "taba - a small module bundler with incremental watch mode")]
pub struct Cli {
    /// Absolute root folder from which files can be required
    #[arg(long, value_name = "DIR")]
    pub source_root: Option<PathBuf>,

    /// Folder used as the basedir for the runtime __dirname
    #[arg(long, value_name = "DIR")]
    pub bundle_root: Option<PathBuf>,

    /// Output directory; each entry lands at <DIR>/<basename(entry)>
    #[arg(long, value_name = "DIR", default_value = "out")]
    pub out_dir: PathBuf,

    /// Rebuild incrementally when files change
    #[arg(short, long)]
    pub watch: bool,

    /// Emit one flattened standard source map instead of a sectioned one
    #[arg(long)]
    pub source_map_compat: bool,

    /// Fail the build on stylesheet errors instead of stubbing them out
    #[arg(long)]
    pub strict_styles: bool,

    /// Entry files to bundle
    #[arg(required = true, value_name = "ENTRY")]
    pub entries: Vec<PathBuf>,
}

pub struct CliHandler;

impl CliHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self) -> Result<()> {
        Logger::init();

        let cli = Cli::parse();
        self.execute(cli).await
    }

    async fn execute(&self, cli: Cli) -> Result<()> {
        let source_root = match cli.source_root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let source_root = tokio::fs::canonicalize(&source_root).await?;
        let bundle_root = match cli.bundle_root {
            Some(root) => tokio::fs::canonicalize(&root).await?,
            None => source_root.clone(),
        };

        let options = BundleOptions {
            source_root,
            bundle_root,
            out_dir: cli.out_dir,
            map_mode: if cli.source_map_compat {
                MapMode::Compat
            } else {
                MapMode::Fast
            },
            style_policy: if cli.strict_styles {
                StylePolicy::Strict
            } else {
                StylePolicy::Stub
            },
        };

        let session = Arc::new(BuildSession::new(options));
        let start = Instant::now();

        if cli.watch {
            let watchers = cli.entries.iter().map(|entry| {
                let session = session.clone();
                let entry = entry.clone();
                async move {
                    let controller = WatchController::new(session, entry);
                    controller.run().await
                }
            });
            try_join_all(watchers).await?;
        } else {
            try_join_all(cli.entries.iter().map(|entry| session.build_entry(entry))).await?;
        }

        Logger::run_complete(session.compiled_count(), start.elapsed());
        Ok(())
    }
}

impl Default for CliHandler {
    fn default() -> Self {
        Self::new()
    }
}
