//! Line-level rewriting of renderer output and post page assembly.
//!
//! The renderer's HTML is treated as text, never parsed: the only edits are
//! the `<title>` line, two insertion points around `<body>`/`</body>`, and
//! stylesheet hrefs in post fragments. Every other byte passes through
//! unchanged.

use crate::layout::{self, SiteLayout};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const TITLE_OPEN: &str = "<title>";
const TITLE_CLOSE: &str = "</title>";

/// Escape text for use inside an HTML element.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Rewrite one line holding `<title>`: keeps whatever precedes the open tag and
/// follows the close tag, including the line ending.
fn retitle_line(line: &str, escaped_title: &str) -> Option<String> {
    let open = line.find(TITLE_OPEN)?;
    let content_start = open + TITLE_OPEN.len();
    let tail = match line[content_start..].find(TITLE_CLOSE) {
        Some(close) => &line[content_start + close..],
        // Unterminated on this line: keep only the line ending.
        None => {
            let body = line.trim_end_matches(['\n', '\r']);
            &line[body.len()..]
        }
    };
    let tail = if tail.starts_with(TITLE_CLOSE) {
        tail.to_string()
    } else {
        format!("{TITLE_CLOSE}{tail}")
    };
    Some(format!("{}{escaped_title}{tail}", &line[..content_start]))
}

/// Replace the content of the first `<title>` element with `title`.
///
/// Only the first line containing `<title>` is touched, so inline SVG titles
/// further down a page survive. Input without a title line is returned as-is.
pub fn replace_title(html: &str, title: &str) -> String {
    let escaped = escape_text(title);
    let mut out = String::with_capacity(html.len() + title.len());
    let mut done = false;
    for line in html.split_inclusive('\n') {
        match (done, retitle_line(line, &escaped)) {
            (false, Some(rewritten)) => {
                out.push_str(&rewritten);
                done = true;
            }
            _ => out.push_str(line),
        }
    }
    out
}

/// Rewrite the title of an HTML file in place.
///
/// The new content goes to a temp file in the same directory which then
/// replaces the original by rename; readers see either the old or the new file.
pub fn rewrite_title_in_place(path: &Path, title: &str) -> io::Result<()> {
    let original = fs::read_to_string(path)?;
    let rewritten = replace_title(&original, title);
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(rewritten.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Content between `<body ...>` and `</body>`, or the whole input for a bare fragment.
pub fn body_content(html: &str) -> &str {
    let Some(open) = html.find("<body") else {
        return html;
    };
    let Some(open_end) = html[open..].find('>') else {
        return html;
    };
    let start = open + open_end + 1;
    let start = if html[start..].starts_with("\r\n") {
        start + 2
    } else if html[start..].starts_with('\n') {
        start + 1
    } else {
        start
    };
    match html[start..].rfind("</body>") {
        Some(end) => &html[start..start + end],
        None => &html[start..],
    }
}

/// Prefix relative `href`s on stylesheet link lines with `../`, since posts
/// live one directory below the pages the renderer wrote them for.
pub fn lift_stylesheet_links(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    for line in html.split_inclusive('\n') {
        if line.contains("rel=\"stylesheet\"") {
            out.push_str(&lift_hrefs(line));
        } else {
            out.push_str(line);
        }
    }
    out
}

fn lift_hrefs(line: &str) -> String {
    const HREF: &str = "href=\"";
    let mut out = String::with_capacity(line.len() + 3);
    let mut rest = line;
    while let Some(pos) = rest.find(HREF) {
        let value_start = pos + HREF.len();
        out.push_str(&rest[..value_start]);
        rest = &rest[value_start..];
        if is_relative_href(rest) {
            out.push_str("../");
        }
    }
    out.push_str(rest);
    out
}

fn is_relative_href(value: &str) -> bool {
    !(value.starts_with('/')
        || value.starts_with("../")
        || value.starts_with('#')
        || value.starts_with('"')
        || value.starts_with("data:")
        || value.split(['"', '/']).next().is_some_and(|s| s.ends_with(':')))
}

/// Shared template pieces every post page is built from.
#[derive(Debug, Clone, Default)]
pub struct PostTemplates {
    /// Page opening: doctype, `<head>`, and usually `<body>`.
    pub header: String,
    /// Page closing, usually holding `</body>`.
    pub footer: String,
    /// Site header block inserted right after the `<body>` line.
    pub site_header: String,
    /// Shared `<script>` tags inserted right before `</body>`.
    pub site_scripts: String,
}

impl PostTemplates {
    /// Read the four template files from the template directory.
    pub fn load(layout: &SiteLayout) -> io::Result<Self> {
        Ok(Self {
            header: fs::read_to_string(layout.template_file(layout::POST_HEADER))?,
            footer: fs::read_to_string(layout.template_file(layout::POST_FOOTER))?,
            site_header: fs::read_to_string(layout.template_file(layout::SITE_HEADER))?,
            site_scripts: fs::read_to_string(layout.template_file(layout::SITE_SCRIPTS))?,
        })
    }
}

/// Insertion state shared by the header and footer passes, so each block is
/// inserted at most once per page.
struct Chrome<'a> {
    templates: &'a PostTemplates,
    escaped_title: String,
    title_written: bool,
    header_inserted: bool,
    scripts_inserted: bool,
}

impl Chrome<'_> {
    fn push_block(out: &mut String, block: &str) {
        out.push_str(block);
        if !block.is_empty() && !block.ends_with('\n') {
            out.push('\n');
        }
    }

    fn apply(&mut self, template: &str, out: &mut String, allow_title: bool) {
        for line in template.split_inclusive('\n') {
            if allow_title && !self.title_written {
                if let Some(rewritten) = retitle_line(line, &self.escaped_title) {
                    out.push_str(&rewritten);
                    self.title_written = true;
                    continue;
                }
                if line.contains("</head>") {
                    out.push_str(&format!(
                        "<title>{}</title>\n",
                        self.escaped_title
                    ));
                    self.title_written = true;
                }
            }
            if !self.scripts_inserted && line.contains("</body>") {
                Self::push_block(out, &self.templates.site_scripts);
                self.scripts_inserted = true;
            }
            out.push_str(line);
            if !self.header_inserted && line.contains("<body") {
                if !line.ends_with('\n') {
                    out.push('\n');
                }
                Self::push_block(out, &self.templates.site_header);
                self.header_inserted = true;
            }
        }
    }
}

/// Build a complete post page: header template, fragment body, footer template.
pub fn wrap_post(templates: &PostTemplates, fragment: &str, title: &str) -> String {
    let body = lift_stylesheet_links(body_content(fragment));
    let mut chrome = Chrome {
        templates,
        escaped_title: escape_text(title),
        title_written: false,
        header_inserted: false,
        scripts_inserted: false,
    };

    let mut page = String::with_capacity(
        templates.header.len() + body.len() + templates.footer.len() + 256,
    );
    chrome.apply(&templates.header, &mut page, true);
    page.push('\n');
    page.push_str(&body);
    page.push('\n');
    chrome.apply(&templates.footer, &mut page, false);
    page.push('\n');
    page
}
