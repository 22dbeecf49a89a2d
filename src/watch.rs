// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Incremental rebuilds on file changes

use claypack_graph::GraphBuilder;
use notify::{Config, Event, EventKind, RecursiveMode, Watcher};
use owo_colors::OwoColorize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::warn;

/// Quiet period before a batch of changes is rebuilt
const DEBOUNCE: Duration = Duration::from_millis(150);

const WATCHED_EXTENSIONS: &[&str] = &["js", "vue", "json", "hbs", "handlebars"];

/// Watch the project root until the process is interrupted.
///
/// A failed rebuild is reported and watching continues.
pub async fn run(builder: &mut GraphBuilder) -> anyhow::Result<()> {
    let root = builder.config().project_root.clone();
    let output_dir = builder.config().output_dir.clone();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    if let Err(err) =
        watcher.configure(Config::default().with_poll_interval(Duration::from_millis(200)))
    {
        warn!(error = %err, "could not configure file watcher, using defaults");
    }
    watcher.watch(&root, RecursiveMode::Recursive)?;

    println!(
        "{} {} for changes. Press Ctrl+C to stop…",
        "Watching".cyan().bold(),
        root.display()
    );

    while let Some(first) = rx.recv().await {
        let mut changed = BTreeSet::new();
        collect(first, &output_dir, &mut changed);
        while let Ok(Some(next)) = timeout(DEBOUNCE, rx.recv()).await {
            collect(next, &output_dir, &mut changed);
        }
        if changed.is_empty() {
            continue;
        }

        let paths: Vec<PathBuf> = changed.into_iter().collect();
        match builder.rebuild(&paths).await {
            Ok(report) => crate::print_report(&report),
            Err(err) => eprintln!("{}: {}", "Error".red().bold(), err),
        }
    }
    Ok(())
}

fn collect(event: notify::Result<Event>, output_dir: &Path, changed: &mut BTreeSet<PathBuf>) {
    match event {
        Ok(event)
            if matches!(
                event.kind,
                EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
            ) =>
        {
            changed.extend(event.paths.into_iter().filter(|p| is_watched(p, output_dir)));
        }
        Ok(_) => {}
        Err(err) => warn!(error = %err, "watch error"),
    }
}

/// Source files outside `node_modules` and the output directory
fn is_watched(path: &Path, output_dir: &Path) -> bool {
    let source_file = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| WATCHED_EXTENSIONS.contains(&e));
    source_file
        && !path.starts_with(output_dir)
        && !path.components().any(|c| c.as_os_str() == "node_modules")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_watched() {
        let out = Path::new("/project/public/js");
        assert!(is_watched(Path::new("/project/components/a/client.js"), out));
        assert!(is_watched(Path::new("/project/components/a/template.hbs"), out));
        assert!(!is_watched(Path::new("/project/public/js/a.client.js"), out));
        assert!(!is_watched(Path::new("/project/node_modules/x/index.js"), out));
        assert!(!is_watched(Path::new("/project/styles/site.css"), out));
    }

    #[test]
    fn test_collect_filters_event_kinds() {
        let out = Path::new("/project/public/js");
        let mut changed = BTreeSet::new();
        let modify = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/project/components/a/client.js"));
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/project/components/b/client.js"));

        collect(Ok(modify), out, &mut changed);
        collect(Ok(access), out, &mut changed);
        assert_eq!(
            changed.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/project/components/a/client.js")]
        );
    }
}
