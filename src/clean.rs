//! Removing build output and toolchain leftovers.
//!
//! [`clean`] runs before a build and brings the checkout to a known starting
//! state: no output tree, and no transient artifact left behind by an earlier
//! run that was interrupted. [`remove_auxiliary`] runs after a build, on both
//! the success and the failure path. Absent targets are never an error.

use crate::config::SiteConfig;
use crate::files;
use crate::layout::{self, PostLayout, SiteLayout};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Remove the output tree, root auxiliary files and stale post transients.
/// Returns what was actually removed.
pub fn clean(layout: &SiteLayout, config: &SiteConfig) -> io::Result<Vec<PathBuf>> {
    let mut targets = vec![layout.output_dir()];
    targets.extend(root_auxiliary(layout, config));
    if layout.posts_dir().is_dir() {
        for slug in layout::discover_posts(layout)? {
            targets.extend(post_transients(&layout.post(&slug), config)?);
        }
    }
    remove_all(targets)
}

/// Remove the renderer side file and LaTeX aux directories at the site root.
pub fn remove_auxiliary(layout: &SiteLayout, config: &SiteConfig) -> io::Result<Vec<PathBuf>> {
    remove_all(root_auxiliary(layout, config))
}

fn root_auxiliary(layout: &SiteLayout, config: &SiteConfig) -> Vec<PathBuf> {
    let mut paths = vec![layout.renderer_side_file()];
    paths.extend(config.cleanup.aux_dirs.iter().map(|d| layout.root().join(d)));
    paths
}

/// Every transient a post build can leave inside the post directory.
fn post_transients(post: &PostLayout, config: &SiteConfig) -> io::Result<Vec<PathBuf>> {
    let mut paths = vec![
        post.render_dir(),
        post.wrapped_page(),
        post.renderer_side_file(),
    ];
    paths.extend(config.cleanup.aux_dirs.iter().map(|d| post.dir().join(d)));
    paths.extend(prefixed_dirs(post.dir().to_path_buf(), layout::PDF_WORK_PREFIX)?);

    let algos = post.algos_dir();
    if algos.is_dir() {
        paths.extend(layout::DIAGRAM_STYLES.iter().map(|name| algos.join(name)));
        paths.extend(prefixed_dirs(algos, layout::DIAGRAM_WORK_PREFIX)?);
    }
    Ok(paths)
}

fn prefixed_dirs(dir: PathBuf, prefix: &str) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && entry.file_name().to_string_lossy().starts_with(prefix) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

fn remove_all(targets: Vec<PathBuf>) -> io::Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in targets {
        if files::remove_path(&path)? {
            removed.push(path);
        }
    }
    Ok(removed)
}
