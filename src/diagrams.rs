//! Algorithm diagrams: `algos/*.tex` → PDF → cropped PDF → PNG.
//!
//! The three algorithm style files are copied into `algos/` for the LaTeX
//! build and always removed again, even when a diagram fails. Each diagram is
//! built in its own scratch directory; the only thing that survives is
//! `<post>/<stem>.png`, which the post source then includes.
//!
//! The rasterizer writes one PNG per page. A multi-page source keeps only
//! its last page.

use crate::files::Scratch;
use crate::layout::{self, PostLayout};
use crate::pipeline::{BuildError, BuildEvent, Context, at};
use crate::tools::{self, ToolError, ToolRunner};
use std::fs;
use std::path::{Path, PathBuf};

/// Render every diagram of a post, returning the images in source order.
pub fn render_diagrams<R: ToolRunner>(
    ctx: &Context<'_, R>,
    post: &PostLayout,
) -> Result<Vec<PathBuf>, BuildError> {
    let algos = post.algos_dir();

    let mut styles = Scratch::new();
    for name in layout::DIAGRAM_STYLES {
        let source = ctx.layout.template_file(name);
        let target = algos.join(name);
        styles.track(&target);
        fs::copy(&source, &target).map_err(at("copy", &source))?;
    }

    let sources = layout::discover_diagrams(&algos).map_err(at("list", &algos))?;
    let mut images = Vec::with_capacity(sources.len());
    for source in &sources {
        let image = render_one(ctx, post, source)?;
        ctx.emit(BuildEvent::DiagramRendered {
            source: ctx.relative(source),
            image: ctx.relative(&image),
        });
        images.push(image);
    }

    styles.clear().map_err(at("remove style files from", &algos))?;
    Ok(images)
}

fn render_one<R: ToolRunner>(
    ctx: &Context<'_, R>,
    post: &PostLayout,
    source: &Path,
) -> Result<PathBuf, BuildError> {
    let tools_config = &ctx.config.tools;
    let algos = source.parent().unwrap_or(post.dir());
    let work = tempfile::Builder::new()
        .prefix(layout::DIAGRAM_WORK_PREFIX)
        .tempdir_in(algos)
        .map_err(at("create a work directory in", algos))?;

    let pdf = tools::latex_pdf_output(source, work.path());
    ctx.run_tool(
        &tools::latex_pdf(&tools_config.latex, source, work.path(), false),
        &pdf,
    )?;

    let cropped = tools::pdf_crop_output(&pdf);
    ctx.run_tool(&tools::pdf_crop(&tools_config.pdf_crop, &pdf), &cropped)?;

    let stem = tools::file_stem(source);
    let prefix = work.path().join(&stem);
    let rasterize = tools::rasterize(&tools_config.rasterizer, &cropped, &prefix);
    ctx.invoke(&rasterize)?;
    let pages = tools::raster_pages(&prefix).map_err(at("list pages in", work.path()))?;
    let Some(last_page) = pages.last() else {
        return Err(ToolError::MissingOutput {
            command: rasterize.to_string(),
            path: work.path().join(format!("{stem}-1.png")),
        }
        .into());
    };

    let image = post.dir().join(format!("{stem}.png"));
    fs::rename(last_page, &image).map_err(at("move", last_page))?;
    let work_path = work.path().to_path_buf();
    work.close().map_err(at("remove", &work_path))?;
    Ok(image)
}
