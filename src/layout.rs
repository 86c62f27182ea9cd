//! Fixed on-disk layout of a site checkout.
//!
//! Every path the pipeline touches is derived here from one explicit site
//! root. Nothing in the crate reads or changes the process working directory;
//! subprocesses receive their working directory per invocation instead.
//!
//! ```text
//! <root>/
//! ├── main.tex                     # Root document → home, about, post index
//! ├── site.toml                    # Build config (optional)
//! ├── posts/
//! │   └── <slug>/
//! │       ├── main.tex             # Post source
//! │       ├── meta.json            # {"title": "..."}
//! │       └── algos/               # Algorithm diagrams (optional)
//! │           └── sort.tex
//! ├── template/                    # Author-maintained shared assets
//! └── gen/                         # Output tree, recreated every run
//!     ├── styles/
//!     ├── js/
//!     └── posts/
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const ROOT_DOCUMENT: &str = "main";
pub const TEX_EXTENSION: &str = "tex";
pub const OUTPUT_DIR: &str = "gen";
pub const POSTS_DIR: &str = "posts";
pub const TEMPLATE_DIR: &str = "template";
pub const STYLES_DIR: &str = "styles";
pub const SCRIPTS_DIR: &str = "js";
pub const POST_METADATA: &str = "meta.json";
pub const ALGOS_DIR: &str = "algos";

// Renderer-owned names.
pub const RENDERER_WORK_DIR: &str = "main";
pub const RENDERER_SIDE_FILE_EXTENSION: &str = "paux";

// Prefixes of the scratch directories LaTeX builds run in.
pub const DIAGRAM_WORK_PREFIX: &str = "temp-";
pub const PDF_WORK_PREFIX: &str = "pdf-build-";

// Template manifest.
pub const SITE_STYLESHEET: &str = "theme-commgroup.css";
pub const POST_STYLESHEET: &str = "posts-commgroup.css";
pub const POST_HEADER: &str = "posts-start.html";
pub const POST_FOOTER: &str = "posts-end.html";
pub const SITE_HEADER: &str = "site-header.html";
pub const SITE_SCRIPTS: &str = "site-scripts.html";
pub const SITE_SCRIPT: &str = "commgroup.js";
pub const SVG_SYMBOLS: &str = "symbols.svg";
pub const PACKAGES_DIR: &str = "pkgs";
pub const DIAGRAM_STYLES: [&str; 3] = ["algorithm.sty", "algorithmicx.sty", "algpseudocode.sty"];

/// Every file the template directory must provide, in preflight order.
pub const TEMPLATE_FILES: [&str; 11] = [
    SITE_STYLESHEET,
    POST_STYLESHEET,
    POST_HEADER,
    POST_FOOTER,
    SITE_HEADER,
    SITE_SCRIPTS,
    SITE_SCRIPT,
    SVG_SYMBOLS,
    DIAGRAM_STYLES[0],
    DIAGRAM_STYLES[1],
    DIAGRAM_STYLES[2],
];

/// Where a template-owned static asset lands in the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetDir {
    Styles,
    Scripts,
}

impl AssetDir {
    pub fn name(self) -> &'static str {
        match self {
            AssetDir::Styles => STYLES_DIR,
            AssetDir::Scripts => SCRIPTS_DIR,
        }
    }
}

/// Template files copied verbatim into the output tree by the main-site stage.
pub const STATIC_ASSETS: [(&str, AssetDir); 4] = [
    (SITE_STYLESHEET, AssetDir::Styles),
    (POST_STYLESHEET, AssetDir::Styles),
    (SVG_SYMBOLS, AssetDir::Styles),
    (SITE_SCRIPT, AssetDir::Scripts),
];

/// Paths of one site checkout, all rooted at `root`.
#[derive(Debug, Clone)]
pub struct SiteLayout {
    root: PathBuf,
}

impl SiteLayout {
    /// Layout over `root` as given. Tools run in subdirectories of the root,
    /// so callers holding a relative path should use [`SiteLayout::resolve`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout over `root` made absolute against the current directory.
    pub fn resolve(root: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(std::path::absolute(root)?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `main.tex`
    pub fn root_document(&self) -> PathBuf {
        self.root
            .join(ROOT_DOCUMENT)
            .with_extension(TEX_EXTENSION)
    }

    /// `main.paux`, written by the renderer beside the document it was run from.
    pub fn renderer_side_file(&self) -> PathBuf {
        self.root
            .join(ROOT_DOCUMENT)
            .with_extension(RENDERER_SIDE_FILE_EXTENSION)
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.root.join(POSTS_DIR)
    }

    pub fn template_dir(&self) -> PathBuf {
        self.root.join(TEMPLATE_DIR)
    }

    pub fn template_file(&self, name: &str) -> PathBuf {
        self.template_dir().join(name)
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.template_dir().join(PACKAGES_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn output_asset_dir(&self, dir: AssetDir) -> PathBuf {
        self.output_dir().join(dir.name())
    }

    pub fn output_posts_dir(&self) -> PathBuf {
        self.output_dir().join(POSTS_DIR)
    }

    pub fn post(&self, slug: &str) -> PostLayout {
        PostLayout {
            slug: slug.to_string(),
            dir: self.posts_dir().join(slug),
            output_dir: self.output_posts_dir(),
        }
    }
}

/// Paths belonging to a single post. The slug is the post's directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLayout {
    slug: String,
    dir: PathBuf,
    output_dir: PathBuf,
}

impl PostLayout {
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn source(&self) -> PathBuf {
        self.dir.join(ROOT_DOCUMENT).with_extension(TEX_EXTENSION)
    }

    pub fn metadata(&self) -> PathBuf {
        self.dir.join(POST_METADATA)
    }

    pub fn algos_dir(&self) -> PathBuf {
        self.dir.join(ALGOS_DIR)
    }

    /// Renderer side file written beside the post source.
    pub fn renderer_side_file(&self) -> PathBuf {
        self.dir
            .join(ROOT_DOCUMENT)
            .with_extension(RENDERER_SIDE_FILE_EXTENSION)
    }

    /// Directory the renderer writes the fragment into.
    pub fn render_dir(&self) -> PathBuf {
        self.dir.join(RENDERER_WORK_DIR)
    }

    /// `<slug>-images`, the image folder name used both by the renderer and the output tree.
    pub fn images_dir_name(&self) -> String {
        format!("{}-images", self.slug)
    }

    pub fn fragment(&self) -> PathBuf {
        self.render_dir().join(format!("{}.html", self.slug))
    }

    pub fn rendered_images(&self) -> PathBuf {
        self.render_dir().join(self.images_dir_name())
    }

    /// The wrapped page before it is copied into the output tree.
    pub fn wrapped_page(&self) -> PathBuf {
        self.dir.join(format!("{}-templated.html", self.slug))
    }

    pub fn output_page(&self) -> PathBuf {
        self.output_dir.join(format!("{}.html", self.slug))
    }

    pub fn output_images(&self) -> PathBuf {
        self.output_dir.join(self.images_dir_name())
    }

    pub fn output_pdf(&self) -> PathBuf {
        self.output_dir.join(format!("{}.pdf", self.slug))
    }
}

/// List post slugs: every non-hidden immediate subdirectory of the posts root,
/// sorted by name so builds are reproducible.
pub fn discover_posts(layout: &SiteLayout) -> io::Result<Vec<String>> {
    let mut slugs: Vec<String> = fs::read_dir(layout.posts_dir())?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    slugs.sort();
    Ok(slugs)
}

/// List the diagram sources directly inside an `algos` directory, sorted.
pub fn discover_diagrams(algos_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut sources: Vec<PathBuf> = fs::read_dir(algos_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e == TEX_EXTENSION)
                    .unwrap_or(false)
        })
        .collect();
    sources.sort();
    Ok(sources)
}
