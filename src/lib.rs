//! # commgroup
//!
//! Build pipeline for the commutative.group blog. Posts are written in LaTeX;
//! this crate drives the external toolchain that turns them into a static
//! site and assembles the output tree.
//!
//! # Architecture: Sequential Pipeline
//!
//! ```text
//! 1. Preflight   required inputs exist           (read-only)
//! 2. Clean       gen/ and stale transients gone
//! 3. Main site   main.tex → gen/*.html, styles/, js/
//! 4. Posts       per post: diagrams → fragment → page → PDF → gen/posts/
//! 5. Cleanup     renderer and LaTeX leftovers at the root
//! ```
//!
//! Every real transformation (LaTeX parsing, HTML generation, PDF building,
//! rasterization) is delegated to external programs. The crate owns the
//! layout, the argument lists, the line-level HTML edits, and the guarantee
//! that transient artifacts do not outlive the stage that created them.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`layout`] | Fixed on-disk layout derived from one site root |
//! | [`preflight`] | Manifest of required inputs, checked before any mutation |
//! | [`tools`] | Structured invocations of the external programs, `ToolRunner` seam |
//! | [`site`] | Main-site stage: root document, page titles, static assets |
//! | [`diagrams`] | Algorithm diagrams: LaTeX → PDF → crop → PNG |
//! | [`post`] | Per-post stage: fragment, wrapped page, PDF, publish, cleanup |
//! | [`html`] | Title rewriting and post page assembly |
//! | [`meta`] | Post metadata (`meta.json`) |
//! | [`clean`] | Output and leftover removal |
//! | [`pipeline`] | Stage sequencing, events, the aggregate error type |
//! | [`config`] | Optional `site.toml` loading, merging, and validation |
//! | [`files`] | Filesystem helpers and the scratch-artifact guard |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## No Working-Directory Changes
//!
//! Every subprocess receives its working directory in its [`tools::Invocation`].
//! The process's own current directory is never touched, so an early failure
//! can't leave the build running from the wrong place. Because tools run in
//! subdirectories of the site, the root is made absolute up front
//! ([`layout::SiteLayout::resolve`]).
//!
//! ## Exit Status and Output Both Count
//!
//! A tool call fails if the program exits unsuccessfully *or* if its
//! documented output file is missing afterward. Captured stderr is attached
//! to the error.
//!
//! ## Guaranteed Cleanup
//!
//! Transient files and directories are registered with a [`files::Scratch`]
//! guard or created as `tempfile` directories before any tool runs, so they
//! are removed on the error path as well.

pub mod clean;
pub mod config;
pub mod diagrams;
pub mod files;
pub mod html;
pub mod layout;
pub mod meta;
pub mod output;
pub mod pipeline;
pub mod post;
pub mod preflight;
pub mod site;
pub mod tools;

#[cfg(test)]
pub(crate) mod test_helpers;
