//! In-memory model of the host page.
//!
//! The tree is a `scraper::Html`, mutated through `ego_tree`. Structural
//! changes are reported to subscribers as [`MutationRecord`]s, the same way a
//! page's mutation observer would see them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::node::{Node, Text};
use scraper::{ElementRef, Html, Selector};
use tokio::sync::mpsc;

pub type ActivationHandler = Rc<dyn Fn(NodeId)>;

/// One structural change: children added to or removed from `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Insertion point inside a text node. `offset` is a byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: NodeId,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy)]
enum Position {
    First,
    Last,
}

pub struct Document {
    html: Html,
    focused: Option<NodeId>,
    caret: Option<Caret>,
    listeners: HashMap<NodeId, ActivationHandler>,
    observers: Vec<mpsc::UnboundedSender<MutationRecord>>,
}

impl Document {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
            focused: None,
            caret: None,
            listeners: HashMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::parse("<html><head></head><body></body></html>")
    }

    /// The `<html>` element.
    pub fn root(&self) -> NodeId {
        self.html.root_element().id()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.html
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")
            .map(|el| el.id())
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.value().attr(name)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .map(|el| el.value().classes().any(|c| c == class))
            .unwrap_or(false)
    }

    /// True while `id` is attached to the live tree.
    pub fn contains(&self, id: NodeId) -> bool {
        let Some(node) = self.html.tree.get(id) else {
            return false;
        };
        let top = node.ancestors().last().map_or(node.id(), |n| n.id());
        top == self.html.tree.root().id()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.html.tree.get(id)?.parent().map(|p| p.id())
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| node.children().map(|child| child.id()).collect())
            .unwrap_or_default()
    }

    /// Text nodes under `id`, in document order.
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(id)
            .map(|node| {
                node.descendants()
                    .filter(|n| n.value().is_text())
                    .map(|n| n.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First element matching `selector`, testing `scope` itself before its
    /// descendants in document order.
    pub fn select_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        let scope = self.element(scope)?;
        if selector.matches(&scope) {
            return Some(scope.id());
        }
        scope.select(selector).next().map(|el| el.id())
    }

    pub fn select_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let Some(scope) = self.element(scope) else {
            return Vec::new();
        };
        let mut found = Vec::new();
        if selector.matches(&scope) {
            found.push(scope.id());
        }
        found.extend(scope.select(selector).map(|el| el.id()));
        found
    }

    /// Roughly what a browser reports as `innerText`, trimmed.
    pub fn rendered_text(&self, id: NodeId) -> String {
        let Some(node) = self.html.tree.get(id) else {
            return String::new();
        };
        let mut collector = TextCollector::default();
        collector.visit(node);
        collector.finish()
    }

    /// Serialized markup of the whole document.
    pub fn html(&self) -> String {
        self.html.root_element().html()
    }

    pub fn inner_html(&self, id: NodeId) -> Option<String> {
        self.element(id).map(|el| el.inner_html())
    }

    pub fn observe(&mut self) -> mpsc::UnboundedReceiver<MutationRecord> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn append_markup(&mut self, parent: NodeId, markup: &str) -> Vec<NodeId> {
        self.insert_markup(parent, markup, Position::Last)
    }

    pub fn prepend_markup(&mut self, parent: NodeId, markup: &str) -> Vec<NodeId> {
        self.insert_markup(parent, markup, Position::First)
    }

    /// Detaches `id` and its subtree. Listeners, focus and caret inside the
    /// subtree go with it.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(node) = self.html.tree.get(id) else {
            return false;
        };
        let Some(parent) = node.parent().map(|p| p.id()) else {
            return false;
        };
        let subtree: Vec<NodeId> = node.descendants().map(|n| n.id()).collect();

        if let Some(mut node) = self.html.tree.get_mut(id) {
            node.detach();
        }
        for gone in &subtree {
            self.listeners.remove(gone);
        }
        if self.focused.is_some_and(|f| subtree.contains(&f)) {
            self.focused = None;
        }
        if self.caret.is_some_and(|c| subtree.contains(&c.node)) {
            self.caret = None;
        }

        self.record(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![id],
        });
        true
    }

    /// Replaces every child of `id` with a single text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> bool {
        if self.element(id).is_none() {
            return false;
        }
        let old = self.children(id);
        for child in &old {
            if let Some(mut node) = self.html.tree.get_mut(*child) {
                node.detach();
            }
        }
        if self.caret.is_some_and(|c| old.contains(&c.node)) {
            self.caret = None;
        }

        let Some(mut node) = self.html.tree.get_mut(id) else {
            return false;
        };
        let added = node
            .append(Node::Text(Text { text: text.into() }))
            .id();

        self.record(MutationRecord {
            target: id,
            added: vec![added],
            removed: old,
        });
        true
    }

    /// Sets (`Some`) or removes (`None`) an attribute, keeping attribute order.
    ///
    /// The element is rebuilt from a `<tag ...></tag>` fragment, so this only
    /// suits elements that parse outside a context (not `tr`, `td` and the
    /// like) and loses namespaced attributes. The injected control is a `div`.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: Option<&str>) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };
        let tag = element.value().name().to_string();
        let mut attrs: Vec<(String, String)> = Vec::new();
        let mut replaced = false;
        for (key, current) in element.value().attrs() {
            if key == name {
                replaced = true;
                if let Some(value) = value {
                    attrs.push((key.to_string(), value.to_string()));
                }
            } else {
                attrs.push((key.to_string(), current.to_string()));
            }
        }
        if !replaced {
            if let Some(value) = value {
                attrs.push((name.to_string(), value.to_string()));
            }
        }

        let rendered: String = attrs
            .iter()
            .map(|(key, value)| format!(" {key}=\"{}\"", escape_attr(value)))
            .collect();
        let fragment = Html::parse_fragment(&format!("<{tag}{rendered}></{tag}>"));
        let Some(rebuilt) = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .map(|el| el.value().clone())
        else {
            return false;
        };

        match self.html.tree.get_mut(id) {
            Some(mut node) => {
                *node.value() = Node::Element(rebuilt);
                true
            }
            None => false,
        }
    }

    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.attribute(id, "aria-disabled") == Some("true")
            || self.attribute(id, "disabled").is_some()
    }

    pub fn add_activation_listener(&mut self, id: NodeId, handler: ActivationHandler) {
        self.listeners.insert(id, handler);
    }

    fn activation_handler(&self, id: NodeId) -> Option<ActivationHandler> {
        if !self.contains(id) || self.is_disabled(id) {
            return None;
        }
        self.listeners.get(&id).cloned()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn caret(&self) -> Option<Caret> {
        self.caret
    }

    /// Gives `id` input focus. A caret already inside `id` is kept, otherwise
    /// it collapses to the end of the element's content.
    pub fn focus(&mut self, id: NodeId) -> bool {
        if !self.contains(id) || self.element(id).is_none() {
            return false;
        }
        self.focused = Some(id);
        let keep = self.caret.is_some_and(|c| self.is_within(c.node, id));
        if !keep {
            self.caret = self.end_caret(id);
        }
        true
    }

    /// Places the caret inside a text node, clamped to its length.
    pub fn set_caret(&mut self, node: NodeId, offset: usize) -> bool {
        let Some(len) = self.text_len(node) else {
            return false;
        };
        self.caret = Some(Caret {
            node,
            offset: offset.min(len),
        });
        true
    }

    /// Inserts `text` at the caret of the focused element, leaving the rest
    /// of its content alone and moving the caret past the insertion.
    pub fn insert_text(&mut self, text: &str) -> bool {
        let Some(focused) = self.focused else {
            return false;
        };
        if !self.contains(focused) {
            return false;
        }

        let caret = self.caret.filter(|c| self.is_within(c.node, focused));
        match caret {
            Some(caret) => {
                let Some(mut node) = self.html.tree.get_mut(caret.node) else {
                    return false;
                };
                let Node::Text(existing) = node.value() else {
                    return false;
                };
                let current = existing.text.to_string();
                let mut offset = caret.offset.min(current.len());
                while !current.is_char_boundary(offset) {
                    offset -= 1;
                }
                let mut updated = String::with_capacity(current.len() + text.len());
                updated.push_str(&current[..offset]);
                updated.push_str(text);
                updated.push_str(&current[offset..]);
                existing.text = updated.as_str().into();

                self.caret = Some(Caret {
                    node: caret.node,
                    offset: offset + text.len(),
                });
            }
            None => {
                let Some(mut node) = self.html.tree.get_mut(focused) else {
                    return false;
                };
                let added = node.append(Node::Text(Text { text: text.into() })).id();
                self.caret = Some(Caret {
                    node: added,
                    offset: text.len(),
                });
                self.record(MutationRecord {
                    target: focused,
                    added: vec![added],
                    removed: Vec::new(),
                });
            }
        }
        true
    }

    fn insert_markup(&mut self, parent: NodeId, markup: &str, at: Position) -> Vec<NodeId> {
        if self.element(parent).is_none() {
            return Vec::new();
        }
        let fragment = Html::parse_fragment(markup);
        let added: Vec<NodeId> = fragment
            .root_element()
            .children()
            .map(|source| graft(&mut self.html.tree, source))
            .collect();

        let Some(mut parent_node) = self.html.tree.get_mut(parent) else {
            return Vec::new();
        };
        match at {
            Position::Last => {
                for id in &added {
                    parent_node.append_id(*id);
                }
            }
            Position::First => {
                for id in added.iter().rev() {
                    parent_node.prepend_id(*id);
                }
            }
        }

        if !added.is_empty() {
            self.record(MutationRecord {
                target: parent,
                added: added.clone(),
                removed: Vec::new(),
            });
        }
        added
    }

    fn record(&mut self, record: MutationRecord) {
        self.observers.retain(|tx| tx.send(record.clone()).is_ok());
    }

    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        node == ancestor
            || self
                .html
                .tree
                .get(node)
                .is_some_and(|n| n.ancestors().any(|a| a.id() == ancestor))
    }

    fn end_caret(&self, id: NodeId) -> Option<Caret> {
        let last = *self.text_nodes(id).last()?;
        let offset = self.text_len(last)?;
        Some(Caret { node: last, offset })
    }

    fn text_len(&self, id: NodeId) -> Option<usize> {
        match self.html.tree.get(id)?.value() {
            Node::Text(text) => Some(text.text.len()),
            _ => None,
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

/// Runs the activation handler bound to `id`, if the control is attached and
/// enabled. The document is not borrowed while the handler runs.
pub fn dispatch_activation(document: &RefCell<Document>, id: NodeId) -> bool {
    let handler = document.borrow().activation_handler(id);
    match handler {
        Some(handler) => {
            handler(id);
            true
        }
        None => false,
    }
}

/// Copies `source` and its subtree into `tree` as a detached node.
fn graft(tree: &mut Tree<Node>, source: NodeRef<'_, Node>) -> NodeId {
    let id = tree.orphan(source.value().clone()).id();
    for child in source.children() {
        let child_id = graft(tree, child);
        if let Some(mut node) = tree.get_mut(id) {
            node.append_id(child_id);
        }
    }
    id
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[derive(Default)]
struct TextCollector {
    builder: String,
    last_char: Option<char>,
}

impl TextCollector {
    fn visit(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => self.append_text(&text.text),
            Node::Element(element) => match element.name() {
                "br" => self.hard_break(),
                "script" | "style" | "noscript" | "template" | "head" => {}
                "p" | "div" | "section" | "article" | "header" | "footer" | "blockquote"
                | "li" | "ul" | "ol" | "tr" | "table" | "h1" | "h2" | "h3" | "h4" | "h5"
                | "h6" | "pre" => {
                    self.ensure_newline();
                    self.visit_children(node);
                    self.ensure_newline();
                }
                _ => self.visit_children(node),
            },
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: NodeRef<'_, Node>) {
        for child in node.children() {
            self.visit(child);
        }
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if matches!(self.last_char, Some(' ') | Some('\n') | None) {
                    continue;
                }
                self.push_char(' ');
            } else {
                self.push_char(ch);
            }
        }
    }

    fn ensure_newline(&mut self) {
        if self.last_char == Some('\n') || self.builder.is_empty() {
            return;
        }
        if self.last_char == Some(' ') {
            self.builder.pop();
        }
        self.push_char('\n');
    }

    fn hard_break(&mut self) {
        if self.last_char == Some(' ') {
            self.builder.pop();
        }
        self.push_char('\n');
    }

    fn push_char(&mut self, ch: char) {
        self.builder.push(ch);
        self.last_char = Some(ch);
    }

    fn finish(self) -> String {
        self.builder.trim().to_string()
    }
}
