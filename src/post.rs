//! One post, start to finish: diagrams, fragment, page, PDF, publish.
//!
//! Everything created inside the post directory is tracked from the start,
//! so the directory is back to its authored shape when the post is done,
//! whether it was published or failed halfway. Diagram PNGs are the one
//! exception: they are durable, and the post source includes them.

use crate::diagrams;
use crate::files::{self, Scratch};
use crate::html::{self, PostTemplates};
use crate::layout::{self, PostLayout};
use crate::meta::PostMeta;
use crate::pipeline::{BuildError, Context, PublishedPost, at};
use crate::tools::{self, ToolRunner};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub fn build_post<R: ToolRunner>(
    ctx: &Context<'_, R>,
    templates: &PostTemplates,
    slug: &str,
) -> Result<PublishedPost, BuildError> {
    let post = ctx.layout.post(slug);
    let mut scratch = Scratch::new();
    scratch.track(post.render_dir());
    scratch.track(post.wrapped_page());
    scratch.track(post.renderer_side_file());
    for name in &ctx.config.cleanup.aux_dirs {
        scratch.track(post.dir().join(name));
    }

    let diagrams = if post.algos_dir().is_dir() {
        diagrams::render_diagrams(ctx, &post)?.len()
    } else {
        0
    };

    let fragment_path = post.fragment();
    ctx.run_tool(
        &tools::render_fragment(
            &ctx.config.tools.renderer,
            &post.source(),
            &post.render_dir(),
            slug,
            &ctx.layout.packages_dir(),
        ),
        &fragment_path,
    )?;

    let meta = PostMeta::load(&post.metadata())?;
    let fragment = fs::read_to_string(&fragment_path).map_err(at("read", &fragment_path))?;
    let wrapped = post.wrapped_page();
    fs::write(&wrapped, html::wrap_post(templates, &fragment, &meta.title))
        .map_err(at("write", &wrapped))?;

    let pdf = if ctx.config.pdf.enabled {
        Some(compile_pdf(ctx, &post)?)
    } else {
        None
    };

    let output_page = post.output_page();
    fs::copy(&wrapped, &output_page).map_err(at("copy", &wrapped))?;

    let rendered_images = post.rendered_images();
    let images = rendered_images.is_dir();
    if images {
        files::copy_dir_recursive(&rendered_images, &post.output_images())
            .map_err(at("copy", &rendered_images))?;
    }

    if let Some((work, pdf_path)) = pdf {
        fs::copy(&pdf_path, post.output_pdf()).map_err(at("copy", &pdf_path))?;
        let work_path = work.path().to_path_buf();
        work.close().map_err(at("remove", &work_path))?;
    }

    let removed = scratch.clear().map_err(at("clean", post.dir()))?;
    ctx.removed(removed);

    Ok(PublishedPost {
        slug: slug.to_string(),
        title: meta.title,
        diagrams,
        images,
        pdf: ctx.config.pdf.enabled,
    })
}

/// Build the post's companion PDF in a scratch directory beside the source.
/// The directory is returned so the PDF lives until it has been copied out.
fn compile_pdf<R: ToolRunner>(
    ctx: &Context<'_, R>,
    post: &PostLayout,
) -> Result<(TempDir, PathBuf), BuildError> {
    let work = tempfile::Builder::new()
        .prefix(layout::PDF_WORK_PREFIX)
        .tempdir_in(post.dir())
        .map_err(at("create a work directory in", post.dir()))?;
    let source = post.source();
    let pdf = tools::latex_pdf_output(&source, work.path());
    ctx.run_tool(
        &tools::latex_pdf(&ctx.config.tools.latex, &source, work.path(), true),
        &pdf,
    )?;
    Ok((work, pdf))
}
