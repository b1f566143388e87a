use crate::{context::ReleaseContext, error::ReleaseError};
use anyhow::Result;
use handlebars::Handlebars;
use lazy_regex::regex;
use log::debug;
use std::borrow::Cow;

/// Renders the release name template against the context. Unknown fields are an error rather than
/// an empty string.
pub(crate) fn render_release_name(ctx: &ReleaseContext) -> Result<String> {
    render(ctx.name_template(), ctx)
}

pub(crate) fn render(template: &str, ctx: &ReleaseContext) -> Result<String> {
    let normalized = strip_leading_dots(template);

    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_escape_fn(handlebars::no_escape);

    let rendered = hb
        .render_template(&normalized, ctx)
        .map_err(|e| ReleaseError::TemplateError {
            template: template.to_string(),
            message: e.to_string(),
        })?;
    debug!("rendered `{template}` as `{rendered}`");

    Ok(rendered)
}

// `{{ .Version }}` -> `{{ Version }}`
fn strip_leading_dots(template: &str) -> Cow<'_, str> {
    regex!(r"\{\{(~?)\s*\.([A-Za-z_])").replace_all(template, "{{${1} ${2}")
}
