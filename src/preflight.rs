//! Preflight check: the fixed manifest of inputs a build needs.
//!
//! Runs before anything is deleted or written. The first absent entry aborts
//! the build with its exact path, so a checkout with a missing template never
//! loses its previous output tree.

use crate::layout::{self, SiteLayout};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("Required {kind} does not exist: {}", path.display())]
    Missing { kind: EntryKind, path: PathBuf },
    #[error("Cannot list posts in {}: {source}", path.display())]
    Posts {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
        }
    }
}

/// One entry of the preflight manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub kind: EntryKind,
    pub path: PathBuf,
}

impl Requirement {
    fn file(path: PathBuf) -> Self {
        Self {
            kind: EntryKind::File,
            path,
        }
    }

    fn dir(path: PathBuf) -> Self {
        Self {
            kind: EntryKind::Directory,
            path,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        match self.kind {
            EntryKind::File => self.path.is_file(),
            EntryKind::Directory => self.path.is_dir(),
        }
    }
}

/// The fixed site-level manifest: root document, posts root, template dir,
/// every template file, and the renderer package stubs.
pub fn required_paths(layout: &SiteLayout) -> Vec<Requirement> {
    let mut manifest = vec![
        Requirement::file(layout.root_document()),
        Requirement::dir(layout.posts_dir()),
        Requirement::dir(layout.template_dir()),
    ];
    manifest.extend(
        layout::TEMPLATE_FILES
            .iter()
            .map(|name| Requirement::file(layout.template_file(name))),
    );
    manifest.push(Requirement::dir(layout.packages_dir()));
    manifest
}

/// Per-post requirements: the source document and the metadata record.
pub fn post_requirements(layout: &SiteLayout, slug: &str) -> Vec<Requirement> {
    let post = layout.post(slug);
    vec![
        Requirement::file(post.source()),
        Requirement::file(post.metadata()),
    ]
}

fn first_missing(manifest: impl IntoIterator<Item = Requirement>) -> Result<(), PreflightError> {
    match manifest.into_iter().find(|r| !r.is_satisfied()) {
        Some(Requirement { kind, path }) => Err(PreflightError::Missing { kind, path }),
        None => Ok(()),
    }
}

/// Verify the whole manifest, site-level entries first, then every post in
/// slug order. Returns the discovered post slugs on success.
pub fn check(layout: &SiteLayout) -> Result<Vec<String>, PreflightError> {
    first_missing(required_paths(layout))?;

    let posts_dir = layout.posts_dir();
    let slugs = layout::discover_posts(layout).map_err(|source| PreflightError::Posts {
        path: posts_dir.clone(),
        source,
    })?;
    for slug in &slugs {
        first_missing(post_requirements(layout, slug))?;
    }
    Ok(slugs)
}
