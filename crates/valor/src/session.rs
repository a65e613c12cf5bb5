use anyhow::{Result, anyhow};
use change_tracker::{ChangeTracker, TrackerConfig};
use html::{Document, NodeKey, Viewport, parse_html};
use log::{debug, info};

use crate::script::EditStep;

/// One loaded page and the tracker watching it.
#[derive(Debug)]
pub struct Session {
    /// The live document edits are applied to.
    pub document: Document,
    /// History and reporting for the document.
    pub tracker: ChangeTracker,
}

impl Session {
    pub const fn new(document: Document, tracker: ChangeTracker) -> Self {
        Self { document, tracker }
    }

    /// Parse `source` and attach a fresh tracker.
    ///
    /// # Errors
    /// Returns an error when the page cannot be parsed.
    pub fn load(source: &str, config: TrackerConfig) -> Result<Self> {
        let document = parse_html(source)?;
        Ok(Self::new(document, ChangeTracker::new(config)))
    }

    fn select_one(&self, selector: &str) -> Result<NodeKey> {
        self.document
            .query_selector(selector)?
            .ok_or_else(|| anyhow!("no element matches {selector:?}"))
    }

    fn select_all(&self, selector: &str) -> Result<Vec<NodeKey>> {
        let elements = self.document.query_selector_all(selector)?;
        if elements.is_empty() {
            return Err(anyhow!("no element matches {selector:?}"));
        }
        Ok(elements)
    }

    /// Apply one step, then deliver the mutations it caused.
    ///
    /// # Errors
    /// Returns an error when a selector matches nothing or a DOM write fails.
    /// Undo and redo with nothing to replay are not errors.
    pub fn apply(&mut self, step: &EditStep) -> Result<()> {
        debug!("applying {}", step.name());
        match step {
            EditStep::Observe { selector } => {
                let elements = self.select_all(selector)?;
                self.tracker.observe(&mut self.document, elements);
            }
            EditStep::Unobserve { selector } => {
                let elements = self.select_all(selector)?;
                self.tracker.unobserve(&mut self.document, elements);
            }
            EditStep::SetAttribute {
                selector,
                name,
                value,
            } => {
                let element = self.select_one(selector)?;
                self.document.set_attribute(element, name, value)?;
            }
            EditStep::RemoveAttribute { selector, name } => {
                let element = self.select_one(selector)?;
                self.document.remove_attribute(element, name)?;
            }
            EditStep::SetStyle { selector, value } => {
                let element = self.select_one(selector)?;
                self.document.set_attribute(element, "style", value)?;
            }
            EditStep::SetText { selector, text } => {
                let element = self.select_one(selector)?;
                self.set_text(element, text)?;
            }
            EditStep::Undo => {
                if self.tracker.undo(&mut self.document).is_none() {
                    info!("undo: nothing to show");
                }
            }
            EditStep::Redo => {
                if self.tracker.redo(&mut self.document).is_none() {
                    info!("redo: nothing to show");
                }
            }
            EditStep::Viewport {
                width,
                height,
                device_pixel_ratio,
            } => {
                self.document
                    .set_viewport(Viewport::new(*width, *height, *device_pixel_ratio));
            }
        }
        self.tracker.process_mutations(&mut self.document);
        Ok(())
    }

    /// In-place editing touches the character data of a lone text child.
    /// Anything else replaces the children, which is not a tracked change.
    fn set_text(&mut self, element: NodeKey, text: &str) -> Result<()> {
        let children = self.document.children(element);
        if let [only] = children
            && !self.document.is_element(*only)
        {
            let only = *only;
            self.document.set_character_data(only, text)?;
        } else {
            self.document.set_text_content(element, text)?;
        }
        Ok(())
    }

    /// Apply every step in order, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the failing step's error, annotated with its position.
    pub fn run(&mut self, steps: &[EditStep]) -> Result<()> {
        for (index, step) in steps.iter().enumerate() {
            self.apply(step)
                .map_err(|err| anyhow!("step {} ({}): {err}", index + 1, step.name()))?;
        }
        info!(
            "replayed {} steps, {} edits committed",
            steps.len(),
            self.tracker.status().count
        );
        Ok(())
    }
}
