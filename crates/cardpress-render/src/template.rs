//! Card and target templating.
//!
//! Both card templates (`cards/<type>.html`) and target templates
//! (`targets/<target>.html`) are MiniJinja templates held by one
//! [`TemplateEngine`]. Auto-escaping is disabled: field values are already
//! HTML produced by the [`MacroExpander`].
//!
//! # Template Data
//!
//! Card templates see one variable per column header plus the `md`
//! function:
//!
//! ```html
//! <div class="name">{{ Name }}</div>
//! <div class="effect">{{ Effect }}</div>
//! <div class="note">{{ md("see {tap}") }}</div>
//! ```
//!
//! Target templates receive a [`TargetContext`]:
//!
//! | Variable | Content |
//! |----------|---------|
//! | `name` | card type name |
//! | `cards` | rendered card fragments for this page |
//! | `cardtypecss` | contents of `cards/<type>.css` |
//! | `globaltargetcss` | contents of `targets/global.css` |
//! | `scripts` | contents of every `scripts/*.js` |

use std::sync::Arc;

use cardpress_table::Record;
use minijinja::{AutoEscape, Environment, Value};
use serde::Serialize;

use crate::error::RenderError;
use crate::markup::MacroExpander;

/// Name of the markdown function available to every template.
pub const MD_FUNCTION: &str = "md";

/// Compiled templates sharing one environment.
///
/// Templates are compiled when added, so syntax errors surface before any
/// card is rendered.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Creates an engine whose `md` function expands through `expander`.
    pub fn new(expander: Arc<MacroExpander>) -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_function(MD_FUNCTION, move |text: Option<Value>| -> String {
            match text {
                Some(value) if !value.is_undefined() && !value.is_none() => {
                    expander.parse(&value.to_string())
                }
                _ => String::new(),
            }
        });
        Self { env }
    }

    /// Compiles and registers a template.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<(), RenderError> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())?;
        Ok(())
    }

    /// Checks if a template with the given name exists.
    pub fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    /// Renders a card template with one record's context.
    pub fn render_card(&self, name: &str, context: &CardContext) -> Result<String, RenderError> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(context.to_value())?)
    }

    /// Renders any template with serialisable data.
    pub fn render<S: Serialize>(&self, name: &str, data: &S) -> Result<String, RenderError> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(Value::from_serialize(data))?)
    }
}

/// Ordered variables for one card.
///
/// Keys keep their first-insertion position; inserting an existing key
/// replaces its value. The `md` name is reserved for the markdown function.
#[derive(Debug, Clone, Default)]
pub struct CardContext {
    entries: Vec<(String, Value)>,
}

impl CardContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands every field of `record` and binds it under its header name.
    pub fn from_record(record: &Record, expander: &MacroExpander) -> Self {
        let mut context = Self::new();
        for (name, raw) in record.iter() {
            context.insert(name, expander.parse(raw));
        }
        context
    }

    /// Binds `key`; returns `false` if the key is reserved.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if key == MD_FUNCTION {
            tracing::warn!(field = %key, "field name is reserved for the markdown function, ignoring");
            return false;
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts to a MiniJinja map value.
    pub fn to_value(&self) -> Value {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Data handed to a target template for one output page.
#[derive(Debug, Clone, Serialize)]
pub struct TargetContext<'a> {
    pub name: &'a str,
    pub cards: Vec<&'a str>,
    pub cardtypecss: &'a str,
    pub globaltargetcss: &'a str,
    pub scripts: &'a [String],
}

/// Data for the overview page listing every produced page.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewContext<'a> {
    pub target: &'a str,
    pub decks: &'a [String],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::AssetResolver;

    fn engine() -> (TemplateEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let resolver = AssetResolver::new(
            dir.path().join("icons"),
            dir.path().join("images"),
            dir.path().join("out"),
        );
        (TemplateEngine::new(Arc::new(MacroExpander::new(resolver))), dir)
    }

    #[test]
    fn fields_are_not_escaped() {
        let (mut engine, _dir) = engine();
        engine.add_template("card", "<div>{{ Effect }}</div>").unwrap();
        let mut ctx = CardContext::new();
        ctx.insert("Effect", "<strong>x</strong>");
        assert_eq!(
            engine.render_card("card", &ctx).unwrap(),
            "<div><strong>x</strong></div>"
        );
    }

    #[test]
    fn md_function_renders_markdown() {
        let (mut engine, _dir) = engine();
        engine
            .add_template("card", "{{ md('*hi*') }}|{{ md(missing) }}|")
            .unwrap();
        insta::assert_snapshot!(
            engine.render_card("card", &CardContext::new()).unwrap(),
            @"<em>hi</em>||"
        );
    }

    #[test]
    fn md_is_reserved() {
        let mut ctx = CardContext::new();
        assert!(!ctx.insert("md", "x"));
        assert!(ctx.is_empty());
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut ctx = CardContext::new();
        ctx.insert("A", "1");
        ctx.insert("B", "2");
        ctx.insert("A", "3");
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(ctx.get("A").map(|v| v.to_string()), Some("3".to_string()));
    }

    #[test]
    fn from_record_expands_fields() {
        let (_, dir) = engine();
        let expander = MacroExpander::new(AssetResolver::new(
            dir.path().join("icons"),
            dir.path().join("images"),
            dir.path().join("out"),
        ));
        let record = Record::from_row(
            &["Name".to_string(), "Effect".to_string()],
            &["Go".to_string(), "**now** {x}".to_string()],
        );
        let ctx = CardContext::from_record(&record, &expander);
        assert_eq!(
            ctx.get("Effect").map(|v| v.to_string()).as_deref(),
            Some(r#"<strong>now</strong> <em class="icon">x</em>"#)
        );
    }

    #[test]
    fn syntax_errors_surface_on_add() {
        let (mut engine, _dir) = engine();
        assert!(matches!(
            engine.add_template("bad", "{% for %}"),
            Err(RenderError::TemplateError(_))
        ));
        assert!(!engine.has_template("bad"));
    }

    #[test]
    fn target_context_serialises_for_templates() {
        let (mut engine, _dir) = engine();
        engine
            .add_template(
                "target",
                "<div class=\"{{ name }}\">{% for card in cards %}[{{ card }}]{% endfor %}</div><style>{{ globaltargetcss }}{{ cardtypecss }}</style>{{ scripts | length }}",
            )
            .unwrap();
        let scripts = vec!["a()".to_string()];
        let ctx = TargetContext {
            name: "actions",
            cards: vec!["<p>1</p>", "<p>2</p>"],
            cardtypecss: ".a{}",
            globaltargetcss: ".g{}",
            scripts: &scripts,
        };
        insta::assert_snapshot!(
            engine.render("target", &ctx).unwrap(),
            @r#"<div class="actions">[<p>1</p>][<p>2</p>]</div><style>.g{}.a{}</style>1"#
        );
    }
}
