use std::collections::HashMap;

use super::options::WidgetOptions;
use super::template::TagTemplate;
use crate::error::StatusError;
use crate::status::Content;
use crate::theme::Theme;

/// Local mirror of the subscribed bus properties.
///
/// Tags keep the order they were given in; templates are built once here and
/// only the cached content changes afterwards.
#[derive(Debug, Clone)]
pub struct WidgetRenderer {
    opts: WidgetOptions,
    ordered: Vec<String>,
    templates: HashMap<String, TagTemplate>,
    cache: HashMap<String, Content>,
}

impl WidgetRenderer {
    /// Build a renderer for `tags`. Tags without a palette entry are skipped
    /// and returned alongside so the caller can report them.
    pub fn new(
        tags: &[String],
        opts: WidgetOptions,
        theme: &Theme,
    ) -> Result<(Self, Vec<String>), StatusError> {
        opts.validate()?;
        let mut ordered = Vec::with_capacity(tags.len());
        let mut templates = HashMap::with_capacity(tags.len());
        let mut skipped = Vec::new();

        for tag in tags {
            if templates.contains_key(tag) {
                continue;
            }
            match theme.color(tag) {
                Some(color) => {
                    templates.insert(tag.clone(), TagTemplate::new(&opts, color));
                    ordered.push(tag.clone());
                }
                None => skipped.push(tag.clone()),
            }
        }

        if ordered.is_empty() {
            return Err(StatusError::NoRenderableTag(tags.to_vec()));
        }

        let cache = ordered
            .iter()
            .map(|tag| (tag.clone(), Content::default()))
            .collect();
        Ok((
            Self {
                opts,
                ordered,
                templates,
                cache,
            },
            skipped,
        ))
    }

    pub fn tags(&self) -> &[String] {
        &self.ordered
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.cache.contains_key(tag)
    }

    pub fn content(&self, tag: &str) -> Option<&Content> {
        self.cache.get(tag)
    }

    /// Update one tag. Returns true only when a subscribed tag's content
    /// actually changed.
    pub fn apply_change(&mut self, tag: &str, value: Content) -> bool {
        match self.cache.get_mut(tag) {
            Some(current) if *current != value => {
                *current = value;
                true
            }
            _ => false,
        }
    }

    /// Apply a whole notification batch. Every change is applied before the
    /// result is known; the return value says whether a redraw is due.
    pub fn apply_batch<I>(&mut self, changes: I) -> bool
    where
        I: IntoIterator<Item = (String, Content)>,
    {
        changes
            .into_iter()
            .fold(false, |changed, (tag, value)| {
                self.apply_change(&tag, value) | changed
            })
    }

    /// Apply a batch and call `draw` with the new text at most once.
    pub fn process_batch<I, F>(&mut self, changes: I, mut draw: F) -> bool
    where
        I: IntoIterator<Item = (String, Content)>,
        F: FnMut(&str),
    {
        let changed = self.apply_batch(changes);
        if changed {
            draw(&self.render());
        }
        changed
    }

    pub fn render(&self) -> String {
        let items: Vec<String> = self
            .ordered
            .iter()
            .filter_map(|tag| {
                let template = self.templates.get(tag)?;
                let content = self.cache.get(tag)?;
                Some(template.render(&self.opts, content))
            })
            .collect();
        items.join(&self.opts.gap())
    }
}
