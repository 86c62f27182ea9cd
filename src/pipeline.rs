//! The build pipeline: preflight → clean → main site → posts → cleanup.
//!
//! Stages run strictly in sequence and the first failure aborts the run. A
//! failure inside a post is wrapped with the post's slug. Once preflight has
//! passed, the global cleanup runs whether the later stages succeed or not.
//!
//! Progress is reported as [`BuildEvent`]s over an optional channel; the
//! pipeline itself never prints. See [`crate::output`] for the display side.

use crate::clean;
use crate::config::SiteConfig;
use crate::html::PostTemplates;
use crate::layout::{self, AssetDir, SiteLayout};
use crate::meta::{MetaError, PostMeta};
use crate::post;
use crate::preflight::{self, PreflightError};
use crate::site;
use crate::tools::{self, Invocation, ToolError, ToolRunner};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Preflight(#[from] PreflightError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Meta(#[from] MetaError),
    #[error("Renderer did not create directory {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("Cannot {action} {}: {source}", path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Post `{slug}`: {source}")]
    Post {
        slug: String,
        #[source]
        source: Box<BuildError>,
    },
}

/// Attach the operation and path to a filesystem error.
pub(crate) fn at(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> BuildError {
    let path = path.to_path_buf();
    move |source| BuildError::File {
        action,
        path,
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preflight,
    Clean,
    MainSite,
    Posts,
    Cleanup,
}

/// Progress reported while a build runs. Paths are relative to the site root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildEvent {
    StageStarted(Stage),
    PreflightPassed {
        posts: usize,
    },
    Removed {
        path: PathBuf,
    },
    Tool {
        command: String,
    },
    PageRetitled {
        page: PathBuf,
    },
    AssetCopied {
        name: &'static str,
        dir: AssetDir,
    },
    PostStarted {
        index: usize,
        total: usize,
        slug: String,
    },
    DiagramRendered {
        source: PathBuf,
        image: PathBuf,
    },
    PostPublished(PublishedPost),
}

/// A post that made it into the output tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    pub slug: String,
    pub title: String,
    pub diagrams: usize,
    pub images: bool,
    pub pdf: bool,
}

#[derive(Debug, Default)]
pub struct BuildSummary {
    pub posts: Vec<PublishedPost>,
}

/// Everything a stage needs: where the site is, how it is configured, how
/// tools are run, and where progress goes.
pub struct Context<'a, R: ToolRunner> {
    pub layout: &'a SiteLayout,
    pub config: &'a SiteConfig,
    pub runner: &'a R,
    events: Option<Sender<BuildEvent>>,
}

impl<'a, R: ToolRunner> Context<'a, R> {
    pub fn new(
        layout: &'a SiteLayout,
        config: &'a SiteConfig,
        runner: &'a R,
        events: Option<Sender<BuildEvent>>,
    ) -> Self {
        Self {
            layout,
            config,
            runner,
            events,
        }
    }

    pub fn emit(&self, event: BuildEvent) {
        if let Some(tx) = &self.events {
            // A closed receiver only means nobody is listening.
            let _ = tx.send(event);
        }
    }

    /// Run a tool whose outputs the caller verifies itself.
    pub fn invoke(&self, invocation: &Invocation) -> Result<(), ToolError> {
        self.emit(BuildEvent::Tool {
            command: invocation.to_string(),
        });
        self.runner.run(invocation)
    }

    /// Run a tool and require that `expected` exists afterward.
    pub fn run_tool(&self, invocation: &Invocation, expected: &Path) -> Result<(), ToolError> {
        self.emit(BuildEvent::Tool {
            command: invocation.to_string(),
        });
        tools::run_expecting(self.runner, invocation, expected)
    }

    /// Display form of a path under the site root.
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(self.layout.root())
            .unwrap_or(path)
            .to_path_buf()
    }

    pub(crate) fn removed(&self, paths: Vec<PathBuf>) {
        for path in paths {
            self.emit(BuildEvent::Removed {
                path: self.relative(&path),
            });
        }
    }
}

/// Run the whole build.
pub fn build<R: ToolRunner>(
    layout: &SiteLayout,
    config: &SiteConfig,
    runner: &R,
    events: Option<Sender<BuildEvent>>,
) -> Result<BuildSummary, BuildError> {
    let ctx = Context::new(layout, config, runner, events);

    ctx.emit(BuildEvent::StageStarted(Stage::Preflight));
    let slugs = preflight::check(layout)?;
    ctx.emit(BuildEvent::PreflightPassed { posts: slugs.len() });

    let outcome = run_stages(&ctx, &slugs);

    ctx.emit(BuildEvent::StageStarted(Stage::Cleanup));
    let cleaned = clean::remove_auxiliary(layout, config);
    let summary = outcome?;
    ctx.removed(cleaned.map_err(at("clean up", layout.root()))?);
    Ok(summary)
}

fn run_stages<R: ToolRunner>(
    ctx: &Context<'_, R>,
    slugs: &[String],
) -> Result<BuildSummary, BuildError> {
    ctx.emit(BuildEvent::StageStarted(Stage::Clean));
    let removed = clean::clean(ctx.layout, ctx.config).map_err(at("clean", ctx.layout.root()))?;
    ctx.removed(removed);

    ctx.emit(BuildEvent::StageStarted(Stage::MainSite));
    site::render(ctx)?;

    ctx.emit(BuildEvent::StageStarted(Stage::Posts));
    let template_dir = ctx.layout.template_dir();
    let templates = PostTemplates::load(ctx.layout).map_err(at("read templates in", &template_dir))?;

    let mut summary = BuildSummary::default();
    for (i, slug) in slugs.iter().enumerate() {
        ctx.emit(BuildEvent::PostStarted {
            index: i + 1,
            total: slugs.len(),
            slug: slug.clone(),
        });
        let published = post::build_post(ctx, &templates, slug).map_err(|e| BuildError::Post {
            slug: slug.clone(),
            source: Box::new(e),
        })?;
        ctx.emit(BuildEvent::PostPublished(published.clone()));
        summary.posts.push(published);
    }
    Ok(summary)
}

/// What `check` reports for each post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostEntry {
    pub slug: String,
    pub title: String,
    pub diagrams: usize,
}

/// Preflight plus a read-only inventory of the posts. Never writes.
pub fn check(layout: &SiteLayout) -> Result<Vec<PostEntry>, BuildError> {
    let slugs = preflight::check(layout)?;
    slugs
        .into_iter()
        .map(|slug| -> Result<PostEntry, BuildError> {
            let post = layout.post(&slug);
            let meta = PostMeta::load(&post.metadata())?;
            let algos = post.algos_dir();
            let diagrams = if algos.is_dir() {
                layout::discover_diagrams(&algos)
                    .map_err(at("list", &algos))?
                    .len()
            } else {
                0
            };
            Ok(PostEntry {
                slug,
                title: meta.title,
                diagrams,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use std::fs;
    use std::sync::mpsc;

    fn build_fixture(runner: &FakeRunner) -> (tempfile::TempDir, Result<BuildSummary, BuildError>) {
        let tmp = setup_fixtures();
        let layout = SiteLayout::new(tmp.path());
        let result = build(&layout, &SiteConfig::default(), runner, None);
        (tmp, result)
    }

    #[test]
    fn demo_post_is_published_with_its_title() {
        let runner = FakeRunner::new();
        let (tmp, result) = build_fixture(&runner);
        let summary = result.unwrap();

        let page = fs::read_to_string(tmp.path().join("gen/posts/demo.html")).unwrap();
        assert!(page.contains("<title>Hello World</title>"));
        assert!(page.contains("<header class=\"site-header\">"));
        assert!(page.contains("href=\"../styles/theme-commgroup.css\""));
        assert!(tmp.path().join("gen/posts/demo.pdf").is_file());

        let demo = &summary.posts[0];
        assert_eq!(demo.slug, "demo");
        assert_eq!(demo.title, "Hello World");
        assert!(demo.pdf && !demo.images);
    }

    #[test]
    fn post_directories_return_to_their_original_shape() {
        let runner = FakeRunner::new();
        let (tmp, result) = build_fixture(&runner);
        result.unwrap();

        assert_eq!(dir_names(&tmp.path().join("posts/demo")), vec!["main.tex", "meta.json"]);
        assert_eq!(
            dir_names(&tmp.path().join("posts/sorting")),
            vec!["algos", "main.tex", "meta.json", "sort.png"]
        );
        assert_eq!(dir_names(&tmp.path().join("posts/sorting/algos")), vec!["sort.tex"]);
        assert!(!tmp.path().join("main.paux").exists());
    }

    #[test]
    fn diagram_keeps_last_page_and_reaches_output() {
        let runner = FakeRunner::new();
        let (tmp, result) = build_fixture(&runner);
        let summary = result.unwrap();

        let image = fs::read_to_string(tmp.path().join("posts/sorting/sort.png")).unwrap();
        assert_eq!(image, "page 2 of sort-crop");
        assert!(tmp.path().join("gen/posts/sorting-images").is_dir());

        let sorting = &summary.posts[1];
        assert_eq!(sorting.diagrams, 1);
        assert!(sorting.images);
    }

    #[test]
    fn site_pages_and_assets_are_in_place() {
        let runner = FakeRunner::new();
        let (tmp, result) = build_fixture(&runner);
        result.unwrap();

        let gen_dir = tmp.path().join("gen");
        for page in ["index.html", "about.html", "posts.html"] {
            let html = fs::read_to_string(gen_dir.join(page)).unwrap();
            assert!(html.contains("<title>commutative.group</title>"), "{page}");
        }
        for asset in ["styles/theme-commgroup.css", "styles/posts-commgroup.css", "styles/symbols.svg", "js/commgroup.js"] {
            assert!(gen_dir.join(asset).is_file(), "{asset}");
        }
    }

    #[test]
    fn rebuild_is_byte_identical_and_drops_stale_output() {
        let tmp = setup_fixtures();
        let layout = SiteLayout::new(tmp.path());
        let config = SiteConfig::default();
        let runner = FakeRunner::new();

        build(&layout, &config, &runner, None).unwrap();
        let first = tree_digest(&layout.output_dir());
        fs::write(layout.output_dir().join("stale.html"), "old").unwrap();

        build(&layout, &config, &runner, None).unwrap();
        assert_eq!(tree_digest(&layout.output_dir()), first);
    }

    #[test]
    fn builds_without_a_previous_output_tree() {
        let tmp = setup_fixtures();
        let layout = SiteLayout::new(tmp.path());
        assert!(!layout.output_dir().exists());
        build(&layout, &SiteConfig::default(), &FakeRunner::new(), None).unwrap();
        assert!(layout.output_posts_dir().join("demo.html").is_file());
    }

    #[test]
    fn preflight_failure_mutates_nothing() {
        let tmp = setup_fixtures();
        let layout = SiteLayout::new(tmp.path());
        let missing = layout.template_file(layout::POST_FOOTER);
        fs::remove_file(&missing).unwrap();
        fs::create_dir_all(layout.output_dir()).unwrap();
        fs::write(layout.output_dir().join("keep.html"), "previous").unwrap();
        fs::write(layout.renderer_side_file(), "").unwrap();

        let runner = FakeRunner::new();
        let err = build(&layout, &SiteConfig::default(), &runner, None).unwrap_err();

        assert!(matches!(err, BuildError::Preflight(PreflightError::Missing { ref path, .. }) if *path == missing));
        assert!(layout.output_dir().join("keep.html").exists());
        assert!(layout.renderer_side_file().exists());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn post_failure_names_slug_and_still_cleans_up() {
        let tmp = setup_fixtures();
        let layout = SiteLayout::new(tmp.path());
        let runner = FakeRunner::new().silent("pdfcrop");

        let err = build(&layout, &SiteConfig::default(), &runner, None).unwrap_err();

        match &err {
            BuildError::Post { slug, source } => {
                assert_eq!(slug, "sorting");
                assert!(matches!(**source, BuildError::Tool(ToolError::MissingOutput { .. })));
            }
            other => panic!("expected post failure, got {other:?}"),
        }
        assert!(err.to_string().starts_with("Post `sorting`: `pdfcrop"));
        assert_eq!(dir_names(&tmp.path().join("posts/sorting/algos")), vec!["sort.tex"]);
        assert_eq!(
            dir_names(&tmp.path().join("posts/sorting")),
            vec!["algos", "main.tex", "meta.json"]
        );
        assert!(!layout.renderer_side_file().exists());
        // Posts before the failing one are already published.
        assert!(layout.output_posts_dir().join("demo.html").is_file());
    }

    #[test]
    fn unavailable_renderer_fails_main_site() {
        let runner = FakeRunner::new().unavailable("plastex");
        let (tmp, result) = build_fixture(&runner);
        let err = result.unwrap_err();
        assert!(matches!(err, BuildError::Tool(ToolError::Spawn { .. })));
        assert!(!tmp.path().join("gen/posts").exists());
    }

    #[test]
    fn pdf_stage_can_be_disabled() {
        let tmp = setup_fixtures();
        let layout = SiteLayout::new(tmp.path());
        let mut config = SiteConfig::default();
        config.pdf.enabled = false;
        let runner = FakeRunner::new();

        let summary = build(&layout, &config, &runner, None).unwrap();

        assert!(summary.posts.iter().all(|p| !p.pdf));
        assert!(!layout.output_posts_dir().join("demo.pdf").exists());
        // Only the diagram goes through the LaTeX build tool.
        assert_eq!(runner.programs().iter().filter(|p| *p == "latexmk").count(), 1);
    }

    #[test]
    fn tools_run_in_stage_order() {
        let runner = FakeRunner::new();
        let (_tmp, result) = build_fixture(&runner);
        result.unwrap();
        assert_eq!(
            runner.programs(),
            vec![
                "plastex", // site
                "plastex", "latexmk", // demo
                "latexmk", "pdfcrop", "pdftoppm", "plastex", "latexmk", // sorting
            ]
        );
    }

    #[test]
    fn events_follow_stage_order() {
        let tmp = setup_fixtures();
        let layout = SiteLayout::new(tmp.path());
        let (tx, rx) = mpsc::channel();
        build(&layout, &SiteConfig::default(), &FakeRunner::new(), Some(tx)).unwrap();
        let events: Vec<BuildEvent> = rx.iter().collect();

        let stages: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                BuildEvent::StageStarted(stage) => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![Stage::Preflight, Stage::Clean, Stage::MainSite, Stage::Posts, Stage::Cleanup]
        );
        assert!(events.contains(&BuildEvent::PreflightPassed { posts: 2 }));
        assert!(events.contains(&BuildEvent::DiagramRendered {
            source: PathBuf::from("posts/sorting/algos/sort.tex"),
            image: PathBuf::from("posts/sorting/sort.png"),
        }));
        assert!(events.contains(&BuildEvent::PostStarted {
            index: 2,
            total: 2,
            slug: "sorting".to_string(),
        }));
    }

    #[test]
    fn check_lists_posts_without_writing() {
        let tmp = setup_fixtures();
        let layout = SiteLayout::new(tmp.path());
        let before = tree_digest(tmp.path());

        let entries = check(&layout).unwrap();

        assert_eq!(
            entries,
            vec![
                PostEntry {
                    slug: "demo".to_string(),
                    title: "Hello World".to_string(),
                    diagrams: 0,
                },
                PostEntry {
                    slug: "sorting".to_string(),
                    title: "Sorting in Place".to_string(),
                    diagrams: 1,
                },
            ]
        );
        assert_eq!(tree_digest(tmp.path()), before);
    }

    #[test]
    fn check_reports_bad_metadata() {
        let tmp = setup_fixtures();
        fs::write(tmp.path().join("posts/demo/meta.json"), r#"{"date": "2023"}"#).unwrap();
        let err = check(&SiteLayout::new(tmp.path())).unwrap_err();
        assert!(matches!(err, BuildError::Meta(MetaError::MissingTitle(_))));
    }
}
