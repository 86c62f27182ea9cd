//! External tool invocation.
//!
//! Four collaborators do all the real work: a LaTeX-to-HTML renderer
//! (plasTeX), a LaTeX build tool (latexmk), a PDF cropper (pdfcrop) and a PDF
//! rasterizer (pdftoppm). Each call is an [`Invocation`]: a program, a list of
//! discrete argument tokens, and a working directory. Nothing goes through a
//! shell, and the process working directory is never changed.
//!
//! The [`ToolRunner`] trait is the seam between stages and processes:
//! [`SystemRunner`] spawns real programs; tests substitute a runner that
//! simulates the documented file effects of each tool.
//!
//! A call succeeds only when the tool exits successfully *and* its documented
//! output file exists afterward ([`run_expecting`]).

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

/// Diagram raster resolution.
pub const RASTER_DPI: u32 = 300;

/// Suffix pdfcrop appends to the input stem.
pub const CROP_SUFFIX: &str = "-crop";

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` exited with {status}{}", format_stderr(stderr))]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("`{command}` did not produce {}", path.display())]
    MissingOutput { command: String, path: PathBuf },
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}

/// A single external-command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Append `--name=<path>` as a single token.
    pub fn path_flag(self, name: &str, path: &Path) -> Self {
        let mut token = OsString::from(format!("--{name}="));
        token.push(path.as_os_str());
        self.arg(token)
    }

    /// Argument value following a `--name=` or `-name=` token, if present.
    pub fn flag_value(&self, name: &str) -> Option<&OsStr> {
        self.args.iter().find_map(|a| {
            let s = a.to_str()?;
            let rest = s.strip_prefix("--").or_else(|| s.strip_prefix('-'))?;
            rest.strip_prefix(name)?
                .strip_prefix('=')
                .map(OsStr::new)
        })
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Executes invocations. Implementations report failure of the process
/// itself; the caller checks the produced files.
pub trait ToolRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ToolError>;
}

/// Runs real programs via [`std::process::Command`].
///
/// Stdout streams to the terminal unless `quiet`. Stderr is captured so it can
/// be attached to a failure, and echoed after the tool exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner {
    pub quiet: bool,
}

impl SystemRunner {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), ToolError> {
        let stdout = if self.quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        };
        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ToolError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ToolError::Failed {
                command: invocation.to_string(),
                status: output.status,
                stderr,
            });
        }
        if !self.quiet && !stderr.trim().is_empty() {
            eprint!("{stderr}");
        }
        Ok(())
    }
}

/// Run an invocation and verify it produced `expected`.
pub fn run_expecting(
    runner: &impl ToolRunner,
    invocation: &Invocation,
    expected: &Path,
) -> Result<(), ToolError> {
    runner.run(invocation)?;
    if expected.exists() {
        Ok(())
    } else {
        Err(ToolError::MissingOutput {
            command: invocation.to_string(),
            path: expected.to_path_buf(),
        })
    }
}

/// Renderer run over the root document, writing the top-level pages into `output_dir`.
pub fn render_site(
    program: &str,
    theme: &str,
    document: &Path,
    output_dir: &Path,
    packages_dir: &Path,
) -> Invocation {
    let cwd = document.parent().unwrap_or(Path::new("."));
    Invocation::new(program, cwd)
        .arg(format!("--theme={theme}"))
        .args([
            "--extra-css=theme-commgroup.css",
            "--no-theme-css",
            "--no-display-toc",
            "--split-level=-1",
            "--filename=index [$title]",
        ])
        .path_flag("packages-dir", packages_dir)
        .path_flag("dir", output_dir)
        .arg("--")
        .arg(document)
}

/// Renderer run over a post, writing `<work_dir>/<slug>.html` with images under
/// `<work_dir>/<slug>-images/`.
pub fn render_fragment(
    program: &str,
    document: &Path,
    work_dir: &Path,
    slug: &str,
    packages_dir: &Path,
) -> Invocation {
    let cwd = document.parent().unwrap_or(Path::new("."));
    Invocation::new(program, cwd)
        .args(["--theme=fragment", "--split-level=-1"])
        .path_flag("dir", work_dir)
        .arg(format!("--image-filenames={slug}-images/$num"))
        .arg(format!("--filename={slug}"))
        .path_flag("packages-dir", packages_dir)
        .arg("--")
        .arg(document)
}

/// LaTeX build tool producing `<outdir>/<stem>.pdf` from `<cwd>/<file_name>`.
///
/// Runs inside the source's own directory so style files placed beside it
/// are found.
pub fn latex_pdf(program: &str, source: &Path, outdir: &Path, quiet: bool) -> Invocation {
    let cwd = source.parent().unwrap_or(Path::new("."));
    let file_name = source.file_name().unwrap_or(source.as_os_str());
    let mut invocation = Invocation::new(program, cwd).args(["-pdf", "-interaction=nonstopmode"]);
    if quiet {
        invocation = invocation.arg("-quiet");
    }
    let mut outdir_flag = OsString::from("-outdir=");
    outdir_flag.push(outdir.as_os_str());
    invocation.arg(outdir_flag).arg(file_name)
}

/// Where the LaTeX build tool leaves the PDF for `source`.
pub fn latex_pdf_output(source: &Path, outdir: &Path) -> PathBuf {
    outdir.join(file_stem(source)).with_extension("pdf")
}

/// PDF cropper writing a sibling `<stem>-crop.pdf`.
pub fn pdf_crop(program: &str, pdf: &Path) -> Invocation {
    let cwd = pdf.parent().unwrap_or(Path::new("."));
    Invocation::new(program, cwd).arg(pdf)
}

pub fn pdf_crop_output(pdf: &Path) -> PathBuf {
    pdf.with_file_name(format!("{}{CROP_SUFFIX}.pdf", file_stem(pdf)))
}

/// Rasterizer writing `<prefix>-<page>.png` for every page at [`RASTER_DPI`].
pub fn rasterize(program: &str, pdf: &Path, prefix: &Path) -> Invocation {
    let cwd = pdf.parent().unwrap_or(Path::new("."));
    Invocation::new(program, cwd)
        .args(["-r", &RASTER_DPI.to_string(), "-png"])
        .arg(pdf)
        .arg(prefix)
}

/// Page rasters written for `prefix`, in page order.
///
/// Page numbers are zero-padded by the rasterizer when a document has ten or
/// more pages, so ordering is numeric rather than lexical.
pub fn raster_pages(prefix: &Path) -> io::Result<Vec<PathBuf>> {
    let dir = prefix.parent().unwrap_or(Path::new("."));
    let stem = prefix
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let page = name
                .strip_prefix(&stem)?
                .strip_prefix('-')?
                .strip_suffix(".png")?
                .parse::<u32>()
                .ok()?;
            Some((page, e.path()))
        })
        .collect();
    pages.sort_by_key(|(page, _)| *page);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
