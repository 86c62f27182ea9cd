//! CLI output formatting for the build pipeline.
//!
//! # Information-First Display
//!
//! Posts are shown by positional index and title, with slugs and paths as
//! indented context lines. Tool command lines are echoed with a `$` prefix
//! right before the tool's own output streams to the terminal.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! ==> Preflight check
//!     2 posts, all inputs present
//! ==> Cleaning previous output
//!     removed gen
//! ==> Rendering main site
//!     $ plastex --theme=default ... -- /srv/blog/main.tex
//!     gen/index.html: title set
//!     theme-commgroup.css → styles/
//! ==> Building posts
//! 001 demo
//!     $ plastex --theme=fragment ... -- /srv/blog/posts/demo/main.tex
//!     Published Hello World → posts/demo.html (+pdf)
//! ==> Final cleanup
//!     removed main.paux
//! ==> Build complete: 2 posts → gen
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 Hello World
//!     Source: posts/demo/
//! 002 Sorting in Place
//!     Source: posts/sorting/
//!     Diagrams: 1
//! ```
//!
//! # Architecture
//!
//! Each format function returns `Vec<String>` for testability, and a `print_*`
//! wrapper writes to stdout. Format functions are pure: no I/O, no side
//! effects.

use crate::pipeline::{BuildEvent, BuildSummary, PostEntry, PublishedPost, Stage};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Preflight => "Preflight check",
        Stage::Clean => "Cleaning previous output",
        Stage::MainSite => "Rendering main site",
        Stage::Posts => "Building posts",
        Stage::Cleanup => "Final cleanup",
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// `Published <title> → posts/<slug>.html`, plus what came along with it.
fn published_line(post: &PublishedPost) -> String {
    let mut extras = Vec::new();
    if post.diagrams > 0 {
        extras.push(plural(post.diagrams, "diagram"));
    }
    if post.images {
        extras.push("+images".to_string());
    }
    if post.pdf {
        extras.push("+pdf".to_string());
    }
    let mut line = format!("Published {} \u{2192} posts/{}.html", post.title, post.slug);
    if !extras.is_empty() {
        line.push_str(&format!(" ({})", extras.join(", ")));
    }
    line
}

// ============================================================================
// Build events
// ============================================================================

/// Format one pipeline event as display lines.
pub fn format_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::StageStarted(stage) => vec![format!("==> {}", stage_label(*stage))],
        BuildEvent::PreflightPassed { posts } => {
            vec![format!("    {}, all inputs present", plural(*posts, "post"))]
        }
        BuildEvent::Removed { path } => vec![format!("    removed {}", path.display())],
        BuildEvent::Tool { command } => vec![format!("    $ {command}")],
        BuildEvent::PageRetitled { page } => vec![format!("    {}: title set", page.display())],
        BuildEvent::AssetCopied { name, dir } => {
            vec![format!("    {name} \u{2192} {}/", dir.name())]
        }
        BuildEvent::PostStarted { index, slug, .. } => {
            vec![format!("{} {slug}", format_index(*index))]
        }
        BuildEvent::DiagramRendered { source, image } => vec![format!(
            "    {} \u{2192} {}",
            source.display(),
            image.display()
        )],
        BuildEvent::PostPublished(post) => vec![format!("    {}", published_line(post))],
    }
}

pub fn print_event(event: &BuildEvent) {
    for line in format_event(event) {
        println!("{}", line);
    }
}

/// Closing line of a successful build.
pub fn format_summary(summary: &BuildSummary, output_dir: &Path) -> Vec<String> {
    let pdfs = summary.posts.iter().filter(|p| p.pdf).count();
    let mut lines = vec![format!(
        "==> Build complete: {} \u{2192} {}",
        plural(summary.posts.len(), "post"),
        output_dir.display()
    )];
    if pdfs > 0 {
        lines.push(format!("    {} published", plural(pdfs, "PDF")));
    }
    lines
}

pub fn print_summary(summary: &BuildSummary, output_dir: &Path) {
    for line in format_summary(summary, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Post inventory shown by `check`.
pub fn format_check_output(entries: &[PostEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), entry.title));
        lines.push(format!("    Source: posts/{}/", entry.slug));
        if entry.diagrams > 0 {
            lines.push(format!("    Diagrams: {}", entry.diagrams));
        }
    }
    if entries.is_empty() {
        lines.push("No posts".to_string());
    }
    lines
}

pub fn print_check_output(entries: &[PostEntry]) {
    for line in format_check_output(entries) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
