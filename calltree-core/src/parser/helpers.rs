//! Helper functions for tree-sitter AST navigation.

use tree_sitter::Node;

/// Get the text content of a node.
pub fn get_node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    slice(source, node.start_byte(), node.end_byte())
}

/// Byte-range slice that degrades to "" on out-of-range or non-boundary offsets.
pub fn slice(source: &str, start: usize, end: usize) -> &str {
    if start <= end {
        source.get(start..end).unwrap_or("")
    } else {
        ""
    }
}

/// Find the first child of a specific type.
#[allow(clippy::manual_find)]
pub fn find_child_by_type<'a>(node: &Node<'a>, type_name: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == type_name {
            return Some(child);
        }
    }
    None
}

/// Locate the first error or missing node in pre-order.
pub fn first_error<'a>(node: &Node<'a>) -> Option<Node<'a>> {
    if node.is_error() || node.is_missing() {
        return Some(*node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(&child) {
            return Some(found);
        }
    }
    None
}

/// Get line number (1-indexed) from a node.
pub fn get_start_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Get end line number (1-indexed) from a node.
pub fn get_end_line(node: &Node) -> u32 {
    node.end_position().row as u32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_bounds() {
        assert_eq!(slice("hello", 1, 3), "el");
        assert_eq!(slice("hello", 3, 1), "");
        assert_eq!(slice("hello", 2, 99), "");
        // Offset 1 falls inside the two-byte 'é'
        assert_eq!(slice("é", 1, 2), "");
    }
}
