// Region hierarchy: code-prefix containment and parent/child indexes

use std::collections::HashMap;
use uuid::Uuid;

/// Decides whether `candidate` lies inside the region named by `ancestor`.
///
/// Region codes are hierarchical: children extend their parent's code with
/// a `-suffix` segment (`DE` > `DE-BE` > `DE-BE-1`). Containment therefore
/// reduces to a prefix test, no tree walk required:
///
/// - `code_contains("DE-BE", "DE-BE")` is true
/// - `code_contains("DE-BE", "DE-BE-1")` is true
/// - `code_contains("DE", "DE-BE-1")` is true (transitive via prefix)
/// - `code_contains("DE-BE", "DE-B")` is false
pub fn code_contains(ancestor: &str, candidate: &str) -> bool {
    candidate == ancestor || is_extension_of(ancestor, candidate)
}

/// True when `child` is a strict prefix-extension of `parent`
/// (`parent` + `-` + at least one more character).
///
/// The importer uses this to reject a subdivision or organizational unit
/// whose stated parent's code is not a true prefix of its own code.
pub fn is_extension_of(parent: &str, child: &str) -> bool {
    child.len() > parent.len() + 1
        && child.as_bytes()[parent.len()] == b'-'
        && child.starts_with(parent)
}

/// Parent/child index for entities that carry an explicit parent reference
/// (legacy subdivision data whose hierarchy is not encoded in the code).
///
/// Built once after import; read-only afterwards. Child lists preserve
/// insertion order.
#[derive(Debug, Default)]
pub struct RegionIndex {
    children: HashMap<Uuid, Vec<Uuid>>,
}

impl RegionIndex {
    /// Builds the index from `(id, parent_id)` pairs in entity order.
    pub fn build<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, Option<Uuid>)>,
    {
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (id, parent_id) in nodes {
            if let Some(parent_id) = parent_id {
                children.entry(parent_id).or_default().push(id);
            }
        }
        RegionIndex { children }
    }

    /// Direct children of a node, in insertion order.
    pub fn children(&self, id: Uuid) -> &[Uuid] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Transitive closure of [`RegionIndex::children`].
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut result = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            for &child in self.children(next) {
                result.push(child);
                pending.push(child);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_contains_itself() {
        assert!(code_contains("DE-BE", "DE-BE"));
        assert!(code_contains("DE", "DE"));
    }

    #[test]
    fn code_contains_direct_child() {
        assert!(code_contains("DE-BE", "DE-BE-1"));
    }

    #[test]
    fn code_contains_transitive_descendant() {
        assert!(code_contains("DE", "DE-BE-1"));
    }

    #[test]
    fn code_does_not_contain_string_prefix_without_separator() {
        // "DE-B" is a prefix of "DE-BE" as a string but not as a region
        assert!(!code_contains("DE-BE", "DE-B"));
        assert!(!code_contains("DE-B", "DE-BE"));
    }

    #[test]
    fn code_does_not_contain_sibling_or_parent() {
        assert!(!code_contains("DE-BE", "DE-BB"));
        assert!(!code_contains("DE-BE-1", "DE-BE"));
    }

    #[test]
    fn extension_requires_nonempty_suffix() {
        assert!(is_extension_of("DE", "DE-BE"));
        assert!(!is_extension_of("DE", "DE"));
        assert!(!is_extension_of("DE", "DE-"));
        assert!(!is_extension_of("FR", "DE-BE"));
    }

    #[test]
    fn index_children_and_descendants() {
        let root = Uuid::new_v4();
        let child_a = Uuid::new_v4();
        let child_b = Uuid::new_v4();
        let grandchild = Uuid::new_v4();

        let index = RegionIndex::build([
            (root, None),
            (child_a, Some(root)),
            (child_b, Some(root)),
            (grandchild, Some(child_a)),
        ]);

        assert_eq!(index.children(root), &[child_a, child_b]);
        assert_eq!(index.children(grandchild), &[] as &[Uuid]);

        let mut descendants = index.descendants(root);
        descendants.sort();
        let mut expected = vec![child_a, child_b, grandchild];
        expected.sort();
        assert_eq!(descendants, expected);
    }
}
