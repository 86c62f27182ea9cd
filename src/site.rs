//! Main-site stage: render the root document into the output tree.
//!
//! The renderer writes the top-level pages plus `styles/` and `js/`. Each
//! configured page then gets the site title, and the template-owned assets
//! are copied next to the renderer's own.

use crate::html;
use crate::layout;
use crate::pipeline::{BuildError, BuildEvent, Context, at};
use crate::tools::{self, ToolError, ToolRunner};
use std::fs;

pub fn render<R: ToolRunner>(ctx: &Context<'_, R>) -> Result<(), BuildError> {
    let layout = ctx.layout;
    let config = ctx.config;
    let output_dir = layout.output_dir();

    let invocation = tools::render_site(
        &config.tools.renderer,
        &config.site.theme,
        &layout.root_document(),
        &output_dir,
        &layout.packages_dir(),
    );
    ctx.invoke(&invocation)?;

    for page in &config.site.pages {
        let path = output_dir.join(page);
        if !path.is_file() {
            return Err(ToolError::MissingOutput {
                command: invocation.to_string(),
                path,
            }
            .into());
        }
        html::rewrite_title_in_place(&path, &config.site.title).map_err(at("rewrite", &path))?;
        ctx.emit(BuildEvent::PageRetitled {
            page: ctx.relative(&path),
        });
    }

    for (name, dir) in layout::STATIC_ASSETS {
        let target_dir = layout.output_asset_dir(dir);
        if !target_dir.is_dir() {
            return Err(BuildError::MissingDirectory(target_dir));
        }
        let source = layout.template_file(name);
        fs::copy(&source, target_dir.join(name)).map_err(at("copy", &source))?;
        ctx.emit(BuildEvent::AssetCopied { name, dir });
    }

    let posts_dir = layout.output_posts_dir();
    fs::create_dir_all(&posts_dir).map_err(at("create", &posts_dir))?;
    Ok(())
}
