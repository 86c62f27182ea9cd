//! Shared test utilities for the commgroup test suite.
//!
//! Provides the fixture site, a [`FakeRunner`] standing in for the external
//! tools, and helpers for asserting on directory contents.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let layout = SiteLayout::new(tmp.path());
//! let runner = FakeRunner::new().silent("pdfcrop");
//!
//! let err = build(&layout, &SiteConfig::default(), &runner, None).unwrap_err();
//! assert_eq!(dir_names(&layout.post("demo").dir()), vec!["main.tex", "meta.json"]);
//! ```

use crate::files::copy_dir_recursive;
use crate::tools::{self, Invocation, ToolError, ToolRunner};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use walkdir::WalkDir;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

// =========================================================================
// Directory assertions
// =========================================================================

/// Sorted entry names directly inside `dir`.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// SHA-256 of every file under `root`, keyed by relative path. Directories
/// are listed too, so an empty leftover directory changes the digest.
pub fn tree_digest(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
            let digest = if entry.file_type().is_dir() {
                "dir".to_string()
            } else {
                let bytes = fs::read(entry.path()).unwrap();
                format!("{:x}", Sha256::digest(&bytes))
            };
            (relative, digest)
        })
        .collect()
}

// =========================================================================
// Fake external tools
// =========================================================================

/// Stands in for the renderer, LaTeX build tool, cropper and rasterizer.
///
/// Each program is simulated by its documented file effects, derived from
/// the invocation's own arguments, so tests also catch wrong flags. Uses a
/// Mutex so the runner can be shared by reference across stages.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    /// Programs that cannot be launched.
    unavailable: HashSet<String>,
    /// Programs that exit successfully without writing anything.
    silent: HashSet<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable(mut self, program: &str) -> Self {
        self.unavailable.insert(program.to_string());
        self
    }

    pub fn silent(mut self, program: &str) -> Self {
        self.silent.insert(program.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.program).collect()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ToolError> {
        self.calls.lock().unwrap().push(invocation.clone());

        if self.unavailable.contains(&invocation.program) {
            return Err(ToolError::Spawn {
                program: invocation.program.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "not installed"),
            });
        }
        if self.silent.contains(&invocation.program) {
            return Ok(());
        }

        match invocation.program.as_str() {
            "plastex" => fake_renderer(invocation),
            "latexmk" => fake_latex(invocation),
            "pdfcrop" => fake_crop(invocation),
            "pdftoppm" => fake_rasterizer(invocation),
            other => panic!("unexpected program {other}"),
        }
        Ok(())
    }
}

/// A path argument as the child process would see it: relative paths are
/// taken from the invocation's working directory, not the test's.
fn resolve(invocation: &Invocation, arg: impl AsRef<OsStr>) -> PathBuf {
    invocation.cwd.join(arg.as_ref())
}

fn flag_path(invocation: &Invocation, name: &str) -> PathBuf {
    resolve(invocation, invocation.flag_value(name).unwrap())
}

fn last_arg(invocation: &Invocation) -> PathBuf {
    resolve(invocation, invocation.args.last().unwrap())
}

/// Writes a side file beside the document, then either a fragment (plus an
/// images folder when the source includes graphics) or the site pages with
/// their asset directories.
fn fake_renderer(invocation: &Invocation) {
    let document = last_arg(invocation);
    let source = fs::read_to_string(&document).unwrap();
    let dir = flag_path(invocation, "dir");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        invocation.cwd.join(tools::file_stem(&document)).with_extension("paux"),
        "side",
    )
    .unwrap();

    if invocation.flag_value("theme") == Some(OsStr::new("fragment")) {
        let slug = invocation.flag_value("filename").unwrap().to_string_lossy().into_owned();
        fs::write(
            dir.join(format!("{slug}.html")),
            format!(
                "<html>\n<head>\n<title>{slug}</title>\n</head>\n<body>\n\
                 <link rel=\"stylesheet\" href=\"styles/theme-commgroup.css\">\n\
                 <p>{}</p>\n</body>\n</html>\n",
                source.trim()
            ),
        )
        .unwrap();
        if source.contains("\\includegraphics") {
            let images = dir.join(format!("{slug}-images"));
            fs::create_dir_all(&images).unwrap();
            fs::write(images.join("1.png"), "image 1").unwrap();
        }
    } else {
        for page in ["index", "about", "posts"] {
            fs::write(
                dir.join(format!("{page}.html")),
                format!("<html>\n<head>\n<title>Untitled</title>\n</head>\n<body>{page}</body>\n</html>\n"),
            )
            .unwrap();
        }
        fs::create_dir_all(dir.join("styles")).unwrap();
        fs::create_dir_all(dir.join("js")).unwrap();
    }
}

/// "Compiles" by copying the source into `<outdir>/<stem>.pdf`. Sources using
/// minted leave `_minted-<stem>` in the working directory, as the real
/// toolchain does.
fn fake_latex(invocation: &Invocation) {
    let source = last_arg(invocation);
    let stem = tools::file_stem(&source);
    let outdir = flag_path(invocation, "outdir");
    fs::create_dir_all(&outdir).unwrap();
    fs::copy(&source, outdir.join(format!("{stem}.pdf"))).unwrap();
    fs::write(outdir.join(format!("{stem}.log")), "log").unwrap();
    if fs::read_to_string(&source).unwrap().contains("{minted}") {
        fs::create_dir_all(invocation.cwd.join(format!("_minted-{stem}"))).unwrap();
    }
}

fn fake_crop(invocation: &Invocation) {
    let pdf = last_arg(invocation);
    fs::copy(&pdf, tools::pdf_crop_output(&pdf)).unwrap();
}

/// One PNG per page; pages are separated by `\newpage` in the source.
fn fake_rasterizer(invocation: &Invocation) {
    let n = invocation.args.len();
    let pdf = resolve(invocation, &invocation.args[n - 2]);
    let prefix = resolve(invocation, &invocation.args[n - 1]);
    let pages = fs::read_to_string(&pdf).unwrap().matches("\\newpage").count() + 1;
    let stem = tools::file_stem(&pdf);
    for page in 1..=pages {
        let name = format!("{}-{page}.png", prefix.display());
        fs::write(name, format!("page {page} of {stem}")).unwrap();
    }
}
