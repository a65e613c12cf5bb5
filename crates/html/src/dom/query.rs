//! Selector queries over a [`Document`].

use css_selectors::{
    ElementAdapter, SelectorError, SelectorList, matches_selector_list, parse_selector_list,
};

use super::{Document, NodeKey};

impl ElementAdapter for Document {
    type Handle = NodeKey;

    fn parent(&self, element: NodeKey) -> Option<NodeKey> {
        self.parent_element(element)
    }

    fn previous_sibling_element(&self, element: NodeKey) -> Option<NodeKey> {
        self.previous_element_sibling(element)
    }

    fn tag_name(&self, element: NodeKey) -> &str {
        Self::tag_name(self, element).unwrap_or_default()
    }

    fn element_id(&self, element: NodeKey) -> Option<&str> {
        self.element(element)?.id()
    }

    fn has_class(&self, element: NodeKey, class: &str) -> bool {
        self.element(element)
            .is_some_and(|data| data.has_class(class))
    }

    fn attr(&self, element: NodeKey, name: &str) -> Option<&str> {
        self.get_attribute(element, name)
    }
}

impl Document {
    /// Connected elements matching `selector`, in tree order.
    ///
    /// # Errors
    /// Returns a [`SelectorError`] when `selector` does not parse.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeKey>, SelectorError> {
        let list = parse_selector_list(selector)?;
        Ok(self.query_parsed(&list))
    }

    /// First connected element matching `selector`.
    ///
    /// # Errors
    /// Returns a [`SelectorError`] when `selector` does not parse.
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeKey>, SelectorError> {
        let list = parse_selector_list(selector)?;
        Ok(self
            .elements()
            .into_iter()
            .find(|key| matches_selector_list(self, *key, &list)))
    }

    /// Connected elements matching an already parsed list.
    #[must_use]
    pub fn query_parsed(&self, list: &SelectorList) -> Vec<NodeKey> {
        self.elements()
            .into_iter()
            .filter(|key| matches_selector_list(self, *key, list))
            .collect()
    }

    /// Whether `element` matches `selector`.
    ///
    /// # Errors
    /// Returns a [`SelectorError`] when `selector` does not parse.
    pub fn matches(&self, element: NodeKey, selector: &str) -> Result<bool, SelectorError> {
        let list = parse_selector_list(selector)?;
        Ok(self.is_element(element) && matches_selector_list(self, element, &list))
    }
}
