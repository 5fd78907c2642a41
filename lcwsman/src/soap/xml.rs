//! Small xmltree helpers shared by the builder and the parser.

use xmltree::{Element, XMLNode};

/// Element with the given prefixed name and a single text child.
pub(crate) fn text_element(name: &str, text: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(text.to_string()));
    elem
}

pub(crate) fn push_element(parent: &mut Element, child: Element) {
    parent.children.push(XMLNode::Element(child));
}

/// Child elements, skipping text, comments and processing instructions.
pub(crate) fn child_elements(parent: &Element) -> impl Iterator<Item = &Element> {
    parent.children.iter().filter_map(|node| node.as_element())
}

fn matches(elem: &Element, namespace: &str, local_name: &str) -> bool {
    elem.name == local_name && elem.namespace.as_deref() == Some(namespace)
}

/// First child `{namespace}local_name`.
pub(crate) fn find_child<'a>(
    parent: &'a Element,
    namespace: &str,
    local_name: &str,
) -> Option<&'a Element> {
    child_elements(parent).find(|elem| matches(elem, namespace, local_name))
}

/// Every child `{namespace}local_name`, in document order.
pub(crate) fn find_children<'a>(
    parent: &'a Element,
    namespace: &'a str,
    local_name: &'a str,
) -> impl Iterator<Item = &'a Element> {
    child_elements(parent).filter(move |elem| matches(elem, namespace, local_name))
}

/// Every descendant `{namespace}local_name`, depth first.
pub(crate) fn find_descendants<'a>(
    parent: &'a Element,
    namespace: &str,
    local_name: &str,
    found: &mut Vec<&'a Element>,
) {
    for child in child_elements(parent) {
        if matches(child, namespace, local_name) {
            found.push(child);
        }
        find_descendants(child, namespace, local_name, found);
    }
}

/// Mutable child whose (prefixed) name is exactly `name`. Used on templates
/// built by this crate, where names carry their prefix.
pub(crate) fn find_child_mut<'a>(parent: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    parent.children.iter_mut().find_map(|node| match node {
        XMLNode::Element(elem) if elem.name == name => Some(elem),
        _ => None,
    })
}

/// Element text, empty for `<x/>` and nil values.
pub(crate) fn text_of(elem: &Element) -> String {
    elem.get_text().map(|t| t.into_owned()).unwrap_or_default()
}
