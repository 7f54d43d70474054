//! DOM tree data structures, selector queries and typed events.

mod event;
mod selector;

pub use event::Event;
pub use event::EventKind;
pub use event::EventListeners;
pub use event::ListenerId;
pub use selector::SelectorList;

use pe_core::EnhancerError;
use pe_core::EnhancerResult;

/// ID used to address nodes in the DOM arena.
pub type NodeId = usize;

/// Payload of a single arena node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

/// Element name, attributes and form-control state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercased tag name.
    pub tag: String,
    /// Attributes in source order; names are lowercased.
    pub attrs: Vec<(String, String)>,
    dirty_value: Option<String>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            dirty_value: None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.attr("class").is_some_and(|value| {
            value
                .split_ascii_whitespace()
                .any(|candidate| candidate == class_name)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed mutable document.
///
/// Node `0` is always the document node. Removed nodes stay in the arena in a
/// detached state so that late callbacks holding their id keep working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn empty() -> Self {
        Self {
            title: String::new(),
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn has_root(&self) -> bool {
        self.document_element().is_some()
    }

    /// First element child of the document node (normally `<html>`).
    pub fn document_element(&self) -> Option<NodeId> {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .find(|child| self.element(*child).is_some())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|node| &node.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|node| node.parent)
    }

    /// Parent only when it is an element (the document node is skipped).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.element(*parent).is_some())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// True when the node is reachable from the document node.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == 0 {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Descendants of `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// The target followed by its ancestors, innermost first.
    pub fn event_path(&self, target: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = self.contains(target).then_some(target);
        while let Some(current) = cursor {
            path.push(current);
            cursor = self.parent(current);
        }
        path
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_owned()))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Appends `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> EnhancerResult<()> {
        self.check_insertion(parent, child)?;
        self.detach(child);
        self.nodes[parent].children.push(child);
        self.nodes[child].parent = Some(parent);
        Ok(())
    }

    /// Inserts `node` right after `reference` among its siblings.
    ///
    /// A parentless `reference` leaves the tree untouched.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> EnhancerResult<()> {
        self.require(reference)?;
        let Some(parent) = self.parent(reference) else {
            return Ok(());
        };
        self.check_insertion(parent, node)?;
        self.detach(node);
        let siblings = &mut self.nodes[parent].children;
        let index = siblings
            .iter()
            .position(|sibling| *sibling == reference)
            .map(|position| position + 1)
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.nodes[node].parent = Some(parent);
        Ok(())
    }

    /// Detaches the node from its parent. Removing a detached node is a no-op.
    pub fn remove(&mut self, id: NodeId) -> EnhancerResult<()> {
        self.require(id)?;
        self.detach(id);
        Ok(())
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes[id].parent.take() else {
            return;
        };
        self.nodes[parent].children.retain(|child| *child != id);
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> EnhancerResult<()> {
        self.require(parent)?;
        self.require(child)?;
        if matches!(self.nodes[parent].kind, NodeKind::Text(_)) {
            return Err(EnhancerError::new(
                "dom.hierarchy",
                format!("text node {parent} cannot have children"),
            ));
        }
        if child == 0 {
            return Err(EnhancerError::new(
                "dom.hierarchy",
                "the document node cannot be inserted",
            ));
        }

        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(EnhancerError::new(
                    "dom.hierarchy",
                    format!("node {child} is an ancestor of node {parent}"),
                ));
            }
            cursor = self.parent(current);
        }
        Ok(())
    }

    fn require(&self, id: NodeId) -> EnhancerResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(EnhancerError::new(
                "dom.unknown_node",
                format!("node {id} does not exist"),
            ))
        }
    }

    fn element_mut(&mut self, id: NodeId) -> EnhancerResult<&mut ElementData> {
        self.require(id)?;
        match &mut self.nodes[id].kind {
            NodeKind::Element(data) => Ok(data),
            _ => Err(EnhancerError::new(
                "dom.not_an_element",
                format!("node {id} is not an element"),
            )),
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|data| data.attr(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> EnhancerResult<()> {
        let data = self.element_mut(id)?;
        let name = name.to_ascii_lowercase();
        match data.attrs.iter().position(|(key, _)| *key == name) {
            Some(index) => data.attrs[index].1 = value.to_owned(),
            None => data.attrs.push((name, value.to_owned())),
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> EnhancerResult<()> {
        let data = self.element_mut(id)?;
        data.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class_name: &str) -> bool {
        self.element(id)
            .is_some_and(|data| data.has_class(class_name))
    }

    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(0)
            .into_iter()
            .find(|id| self.get_attribute(*id, "id") == Some(element_id))
    }

    /// Concatenated text of the node and all of its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.clone(),
            Some(_) => self
                .descendants(id)
                .into_iter()
                .filter_map(|node| match self.kind(node) {
                    Some(NodeKind::Text(text)) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            None => String::new(),
        }
    }

    /// Replaces all children with a single text node (none for empty text).
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> EnhancerResult<()> {
        self.require(id)?;
        if let NodeKind::Text(existing) = &mut self.nodes[id].kind {
            *existing = text.to_owned();
            return Ok(());
        }

        for child in std::mem::take(&mut self.nodes[id].children) {
            self.nodes[child].parent = None;
        }
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node)?;
        }
        Ok(())
    }

    /// Current value of a form control.
    ///
    /// A value assigned through [`Document::set_value`] wins; otherwise
    /// textareas report their text with line breaks normalized, selects their
    /// selected option, checkboxes and radios without a `value` attribute
    /// report `on` and every other element its `value` attribute.
    pub fn value(&self, id: NodeId) -> String {
        let Some(data) = self.element(id) else {
            return String::new();
        };
        if let Some(value) = &data.dirty_value {
            return value.clone();
        }

        match data.tag.as_str() {
            "textarea" => normalize_line_breaks(&self.text_content(id)),
            "select" => self.selected_option_value(id),
            "option" => data
                .attr("value")
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| self.text_content(id).trim().to_owned()),
            "input" if data.attr("value").is_none() && is_checkable(data) => "on".to_owned(),
            _ => data.attr("value").unwrap_or_default().to_owned(),
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> EnhancerResult<()> {
        let data = self.element_mut(id)?;
        let value = if data.tag == "textarea" {
            normalize_line_breaks(value)
        } else {
            value.to_owned()
        };
        data.dirty_value = Some(value);
        Ok(())
    }

    fn selected_option_value(&self, select: NodeId) -> String {
        let options = self
            .descendants(select)
            .into_iter()
            .filter(|id| self.tag_name(*id) == Some("option"))
            .collect::<Vec<_>>();
        options
            .iter()
            .copied()
            .find(|id| self.has_attribute(*id, "selected"))
            .or_else(|| options.first().copied())
            .map(|option| self.value(option))
            .unwrap_or_default()
    }

    /// Reads one inline style property from the `style` attribute.
    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        let raw = self.get_attribute(id, "style")?;
        parse_inline_style(raw)
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(property))
            .map(|(_, value)| value)
    }

    /// Writes one inline style property; an empty value removes it.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> EnhancerResult<()> {
        let property = property.trim().to_ascii_lowercase();
        let mut declarations = self
            .get_attribute(id, "style")
            .map(parse_inline_style)
            .unwrap_or_default();

        let value = value.trim();
        let position = declarations.iter().position(|(name, _)| *name == property);
        match (position, value.is_empty()) {
            (Some(index), true) => {
                declarations.remove(index);
            }
            (Some(index), false) => declarations[index].1 = value.to_owned(),
            (None, true) => {}
            (None, false) => declarations.push((property, value.to_owned())),
        }

        if declarations.is_empty() {
            return self.remove_attribute(id, "style");
        }
        let serialized = declarations
            .iter()
            .map(|(name, value)| format!("{name}: {value};"))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(id, "style", &serialized)
    }

    /// Parses `selector` and returns every match under the document.
    pub fn query_selector_all(&self, selector: &str) -> EnhancerResult<Vec<NodeId>> {
        self.query_selector_all_in(0, selector)
    }

    /// Like [`Document::query_selector_all`] but limited to descendants of `scope`.
    pub fn query_selector_all_in(
        &self,
        scope: NodeId,
        selector: &str,
    ) -> EnhancerResult<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self.select_in(scope, &list))
    }

    pub fn query_selector(&self, selector: &str) -> EnhancerResult<Option<NodeId>> {
        self.query_selector_in(0, selector)
    }

    pub fn query_selector_in(
        &self,
        scope: NodeId,
        selector: &str,
    ) -> EnhancerResult<Option<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .find(|id| list.matches(self, *id)))
    }

    /// Matches a pre-parsed selector list against descendants of `scope`.
    pub fn select_in(&self, scope: NodeId, list: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| list.matches(self, *id))
            .collect()
    }

    pub fn matches(&self, id: NodeId, selector: &str) -> EnhancerResult<bool> {
        let list = SelectorList::parse(selector)?;
        Ok(list.matches(self, id))
    }
}

fn normalize_line_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn is_checkable(data: &ElementData) -> bool {
    data.attr("type").is_some_and(|kind| {
        kind.trim().eq_ignore_ascii_case("checkbox") || kind.trim().eq_ignore_ascii_case("radio")
    })
}

fn parse_inline_style(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name, value.to_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::Document;
    use super::NodeKind;

    fn sample() -> (Document, usize, usize, usize) {
        let mut doc = Document::empty();
        let html = doc.create_element("HTML");
        let body = doc.create_element("body");
        let form = doc.create_element("form");
        let _ = doc.append_child(doc.root(), html);
        let _ = doc.append_child(html, body);
        let _ = doc.append_child(body, form);
        (doc, html, body, form)
    }

    #[test]
    fn builds_tree_with_lowercased_tags() {
        let (doc, html, body, form) = sample();
        assert_eq!(doc.document_element(), Some(html));
        assert_eq!(doc.tag_name(html), Some("html"));
        assert_eq!(doc.children(body), &[form]);
        assert_eq!(doc.parent_element(html), None);
        assert!(doc.is_connected(form));
        assert_eq!(doc.event_path(form), vec![form, body, html, 0]);
    }

    #[test]
    fn removal_is_idempotent_and_detaches() {
        let (mut doc, _, body, form) = sample();
        assert!(doc.remove(form).is_ok());
        assert!(doc.remove(form).is_ok());
        assert!(!doc.is_connected(form));
        assert!(doc.children(body).is_empty());
        assert!(doc.set_style(form, "opacity", "0").is_ok());
    }

    #[test]
    fn rejects_unknown_nodes_and_cycles() {
        let (mut doc, html, body, _) = sample();
        let error = doc.remove(99).err();
        assert_eq!(error.map(|e| e.code), Some("dom.unknown_node"));
        let cycle = doc.append_child(body, html).err();
        assert_eq!(cycle.map(|e| e.code), Some("dom.hierarchy"));
    }

    #[test]
    fn inserts_after_reference_sibling() {
        let (mut doc, _, body, form) = sample();
        let footer = doc.create_element("footer");
        let _ = doc.append_child(body, footer);
        let button = doc.create_element("button");
        assert!(doc.insert_after(form, button).is_ok());
        assert_eq!(doc.children(body), &[form, button, footer]);

        let orphan = doc.create_element("input");
        let other = doc.create_element("button");
        assert!(doc.insert_after(orphan, other).is_ok());
        assert_eq!(doc.parent(other), None);
    }

    #[test]
    fn text_content_roundtrips_through_children() {
        let (mut doc, _, body, form) = sample();
        let label = doc.create_text("Guardar ");
        let strong = doc.create_element("strong");
        let inner = doc.create_text("cambios");
        let _ = doc.append_child(form, label);
        let _ = doc.append_child(form, strong);
        let _ = doc.append_child(strong, inner);
        assert_eq!(doc.text_content(body), "Guardar cambios");

        assert!(doc.set_text_content(form, "Enviando...").is_ok());
        assert_eq!(doc.text_content(form), "Enviando...");
        assert_eq!(doc.children(form).len(), 1);
        assert!(!doc.is_connected(strong));
    }

    #[test]
    fn inline_style_updates_style_attribute() {
        let (mut doc, _, _, form) = sample();
        let _ = doc.set_attribute(form, "style", "color: blue");
        assert!(doc.set_style(form, "border-color", "red").is_ok());
        assert_eq!(
            doc.get_attribute(form, "style"),
            Some("color: blue; border-color: red;")
        );
        assert!(doc.set_style(form, "border-color", "#ddd").is_ok());
        assert_eq!(doc.style(form, "border-color").as_deref(), Some("#ddd"));
        assert!(doc.set_style(form, "color", "").is_ok());
        assert_eq!(doc.get_attribute(form, "style"), Some("border-color: #ddd;"));
    }

    #[test]
    fn values_follow_control_kind() {
        let (mut doc, _, _, form) = sample();
        let input = doc.create_element("input");
        let _ = doc.set_attribute(input, "value", "ana");
        let area = doc.create_element("textarea");
        let text = doc.create_text("hola");
        let _ = doc.append_child(area, text);
        let select = doc.create_element("select");
        for (value, selected) in [("", false), ("medium", true)] {
            let option = doc.create_element("option");
            let _ = doc.set_attribute(option, "value", value);
            if selected {
                let _ = doc.set_attribute(option, "selected", "");
            }
            let _ = doc.append_child(select, option);
        }
        for node in [input, area, select] {
            let _ = doc.append_child(form, node);
        }

        assert_eq!(doc.value(input), "ana");
        assert_eq!(doc.value(area), "hola");
        assert_eq!(doc.value(select), "medium");
        assert!(doc.set_value(area, "adiós").is_ok());
        assert_eq!(doc.value(area), "adiós");
        assert!(matches!(doc.kind(text), Some(NodeKind::Text(_))));
    }

    #[test]
    fn checkable_inputs_default_to_on_and_textareas_normalize_breaks() {
        let (mut doc, _, _, form) = sample();
        let checkbox = doc.create_element("input");
        let _ = doc.set_attribute(checkbox, "type", "checkbox");
        let radio = doc.create_element("input");
        let _ = doc.set_attribute(radio, "type", "Radio");
        let _ = doc.set_attribute(radio, "value", "b");
        let plain = doc.create_element("input");
        let area = doc.create_element("textarea");
        let text = doc.create_text("uno\r\ndos\rtres");
        let _ = doc.append_child(area, text);
        for node in [checkbox, radio, plain, area] {
            let _ = doc.append_child(form, node);
        }

        assert_eq!(doc.value(checkbox), "on");
        assert_eq!(doc.value(radio), "b");
        assert_eq!(doc.value(plain), "");
        assert_eq!(doc.value(area), "uno\ndos\ntres");
        assert!(doc.set_value(area, "a\r\nb").is_ok());
        assert_eq!(doc.value(area), "a\nb");
    }

    #[test]
    fn finds_elements_by_id_in_document_order() {
        let (mut doc, _, body, form) = sample();
        let _ = doc.set_attribute(form, "id", "activityForm");
        let detached = doc.create_element("div");
        let _ = doc.set_attribute(detached, "id", "ghost");
        assert_eq!(doc.get_element_by_id("activityForm"), Some(form));
        assert_eq!(doc.get_element_by_id("ghost"), None);
        assert_eq!(doc.query_selector_all("form").ok(), Some(vec![form]));
        assert_eq!(doc.query_selector_in(body, "#activityForm").ok(), Some(Some(form)));
    }
}
