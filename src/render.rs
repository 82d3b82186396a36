//! Expansion of `{% template <slug> key: "value" ... %}` tags.
//!
//! Each tag is replaced with the named template's body, rendered with the
//! tag's variables. Tags may span lines and may appear inside embedded
//! bodies. Problems never abort rendering; they leave an HTML comment in the
//! output instead.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tera::{Context, Tera};

use crate::models::TemplateLookup;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%-?\s*template\s+(?P<markup>.*?)\s*-?%\}").expect("tag pattern is valid")
});

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+):\s+"([^"]*)""#).expect("variable pattern is valid"));

/// Leading identifier of every `{{ ... }}` expression in a body.
static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{-?\s*(?P<name>[A-Za-z_]\w*)").expect("expression pattern is valid")
});

const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTag {
    pub slug: String,
    pub variables: BTreeMap<String, String>,
}

impl TemplateTag {
    /// Parse the markup after the tag name: a slug, then `key: "value"` pairs.
    pub fn parse(markup: &str) -> Self {
        let mut tokens = markup.split_whitespace();
        let slug = tokens.next().unwrap_or_default().to_string();
        let rest = tokens.collect::<Vec<_>>().join(" ");

        let variables = VARIABLE
            .captures_iter(&rest)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect();

        Self { slug, variables }
    }

    /// Render the named template's body with this tag's variables.
    ///
    /// Variables the tag does not supply render as empty. Tags inside the
    /// body are expanded too, each with only its own variables.
    pub fn render(&self, lookup: &impl TemplateLookup) -> String {
        self.render_within(lookup, &mut Vec::new())
    }

    fn render_within(&self, lookup: &impl TemplateLookup, stack: &mut Vec<String>) -> String {
        if stack.contains(&self.slug) {
            tracing::warn!(slug = %self.slug, "template embeds itself");
            return format!("<!-- render error: template \"{}\" embeds itself -->", self.slug);
        }
        if stack.len() >= MAX_DEPTH {
            tracing::warn!(slug = %self.slug, depth = stack.len(), "template nesting too deep");
            return format!("<!-- render error: template \"{}\" is nested too deeply -->", self.slug);
        }

        let template = match lookup.find_by_slug(&self.slug) {
            Ok(Some(template)) => template,
            Ok(None) => return format!("<!-- render error: missing template \"{}\" -->", self.slug),
            Err(e) => {
                tracing::warn!(slug = %self.slug, error = %e, "template lookup failed");
                return format!("<!-- render error: lookup failed for \"{}\" -->", self.slug);
            }
        };

        let mut context = Context::new();
        for (key, value) in &self.variables {
            context.insert(key, value);
        }

        stack.push(self.slug.clone());
        let body = embed_nested(&template.body, lookup, stack, &mut context);
        stack.pop();

        for caps in EXPRESSION.captures_iter(&body) {
            let name = &caps["name"];
            if !context.contains_key(name) {
                context.insert(name, "");
            }
        }

        Tera::default()
            .render_str(&body, &context)
            .unwrap_or_else(|e| {
                tracing::warn!(slug = %self.slug, error = %e, "template body failed to render");
                format!("<!-- render error: template \"{}\" failed to render -->", self.slug)
            })
    }
}

/// Render each nested tag up front and leave a context placeholder where it
/// stood, so surrounding control flow still applies to the output.
fn embed_nested(
    body: &str,
    lookup: &impl TemplateLookup,
    stack: &mut Vec<String>,
    context: &mut Context,
) -> String {
    let mut index = 0;
    TAG.replace_all(body, |caps: &Captures<'_>| {
        let key = format!("__landable_embed_{index}");
        index += 1;
        let rendered = TemplateTag::parse(&caps["markup"]).render_within(lookup, stack);
        context.insert(&key, &rendered);
        format!("{{{{ {key} }}}}")
    })
    .into_owned()
}

/// Replace every template tag in `source`.
pub fn render_tags(source: &str, lookup: &impl TemplateLookup) -> String {
    TAG.replace_all(source, |caps: &Captures<'_>| {
        TemplateTag::parse(&caps["markup"]).render(lookup)
    })
    .into_owned()
}
