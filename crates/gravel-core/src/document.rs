//! Document root: document-wide attributes, end-of-parse validation, base
//! directory resolution and the output context.

use crate::attribute::{is_unsigned_integer, parse_release_number};
use crate::id::NodeId;
use crate::node::*;
use crate::tree::{DocumentError, ResourceTree};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument, warn};

const ROOT_ATTRIBUTES: [&str; 6] = [
    ATTR_BASE_DIR,
    ATTR_SOURCE_LANG_ID,
    ATTR_LATEST_PUBLIC_RELEASE,
    ATTR_CURRENT_RELEASE,
    ATTR_ENC_CHECK,
    ATTR_TC_PROJECT,
];

/// Attribute check applied when the root is assigned `name = value`.
pub(crate) fn validate_root_attribute(name: &str, value: &str) -> Result<(), DocumentError> {
    if !ROOT_ATTRIBUTES.contains(&name) {
        return Err(DocumentError::UnexpectedAttribute {
            node: NodeKind::Root,
            attribute: name.to_string(),
        });
    }
    if (name == ATTR_LATEST_PUBLIC_RELEASE || name == ATTR_CURRENT_RELEASE)
        && !is_unsigned_integer(value)
    {
        return Err(DocumentError::InvalidAttribute {
            node: NodeKind::Root,
            attribute: name.to_string(),
            value: value.to_string(),
            reason: "release numbers must be non-negative integers".to_string(),
        });
    }
    Ok(())
}

/// Lexically join `rel` onto `dir` and collapse `.` and `..` segments.
/// A `..` above a filesystem root is dropped; above a relative start it is
/// kept. Nothing touches the filesystem.
pub fn normalize_join(dir: &Path, rel: &str) -> PathBuf {
    let joined = dir.join(rel);
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

impl ResourceTree {
    // -----------------------------------------------------------------------
    // End of parse
    // -----------------------------------------------------------------------

    /// Document-wide validation run when the root ends: encoding sentinel,
    /// release ordering, then textual id uniqueness.
    #[instrument(level = "debug", skip(self))]
    pub(crate) fn end_of_parse(&mut self) -> Result<(), DocumentError> {
        let root = self.require_root()?;

        let fill_enc_check = match self.attribute(root, ATTR_ENC_CHECK) {
            None | Some("") => true,
            Some(ENCODING_CHECK) => false,
            Some(found) => {
                return Err(DocumentError::EncodingCheck {
                    found: found.to_string(),
                });
            }
        };
        if fill_enc_check {
            self.nodes[root]
                .attrs
                .insert(ATTR_ENC_CHECK.to_string(), ENCODING_CHECK.to_string());
        }

        let latest = self.latest_public_release()?;
        let current = self.current_release()?;
        if latest > current {
            return Err(DocumentError::ReleaseOrder { latest, current });
        }

        self.validate_unique_ids()?;
        debug!(nodes = self.nodes.len(), "end of parse complete");
        Ok(())
    }

    /// Check that every textual id in the document is unique.
    ///
    /// Placeholders are skipped and system identifiers may repeat. An id on
    /// a node whose immediate parent is a conditional is never reported
    /// itself, but it still counts as seen, so a later unconditional use of
    /// the same id is reported. All offenders are collected before failing.
    pub fn validate_unique_ids(&self) -> Result<(), DocumentError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut flagged: HashSet<&str> = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();

        for id in self.iter() {
            let node = &self.nodes[id];
            if node.kind().is_placeholder() {
                continue;
            }
            for textual_id in node.textual_ids() {
                if self.system_ids.is_system_identifier(textual_id) {
                    continue;
                }
                if seen.contains(textual_id)
                    && !flagged.contains(textual_id)
                    && !self.is_direct_child_of_conditional(id)
                {
                    warn!(id = textual_id, kind = node.kind().tag(), "duplicate textual id");
                    flagged.insert(textual_id);
                    duplicates.push(textual_id.to_string());
                }
                seen.insert(textual_id);
            }
        }

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(DocumentError::DuplicateKey(duplicates))
        }
    }

    // -----------------------------------------------------------------------
    // Root attributes
    // -----------------------------------------------------------------------

    fn root_attribute(&self, name: &str) -> Option<&str> {
        self.root.and_then(|root| self.attribute(root, name))
    }

    fn root_release_number(&self, name: &'static str) -> Result<u32, DocumentError> {
        let raw = self
            .root_attribute(name)
            .ok_or(DocumentError::MissingMandatoryAttribute {
                node: NodeKind::Root,
                attribute: name,
            })?;
        parse_release_number(raw).ok_or_else(|| DocumentError::InvalidAttribute {
            node: NodeKind::Root,
            attribute: name.to_string(),
            value: raw.to_string(),
            reason: "not a representable release number".to_string(),
        })
    }

    /// The release currently under development.
    pub fn current_release(&self) -> Result<u32, DocumentError> {
        self.root_release_number(ATTR_CURRENT_RELEASE)
    }

    /// The most recent release that shipped.
    pub fn latest_public_release(&self) -> Result<u32, DocumentError> {
        self.root_release_number(ATTR_LATEST_PUBLIC_RELEASE)
    }

    /// Locale code of the source language (`en` unless overridden).
    pub fn source_language(&self) -> &str {
        self.root_attribute(ATTR_SOURCE_LANG_ID).unwrap_or("en")
    }

    /// Translation-console project label.
    pub fn tc_project(&self) -> &str {
        self.root_attribute(ATTR_TC_PROJECT)
            .unwrap_or(TC_PROJECT_UNSET)
    }

    pub fn encoding_check(&self) -> Option<&str> {
        self.root_attribute(ATTR_ENC_CHECK)
    }

    // -----------------------------------------------------------------------
    // Base directory
    // -----------------------------------------------------------------------

    /// Record the directory the document lives in and resolve `base_dir`
    /// against it. May be called once, including on a sealed tree.
    pub fn set_own_dir(&mut self, dir: impl AsRef<Path>) -> Result<(), DocumentError> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(DocumentError::EmptyOwnDir);
        }
        if self.resolved_base_dir.is_some() {
            return Err(DocumentError::OwnDirAlreadySet);
        }
        let resolved = normalize_join(dir, self.original_base_dir());
        debug!(own_dir = %dir.display(), base_dir = %resolved.display(), "base directory resolved");
        self.resolved_base_dir = Some(resolved);
        Ok(())
    }

    /// The resolved base directory, or the raw attribute before
    /// [`set_own_dir`](Self::set_own_dir) has run.
    pub fn base_dir(&self) -> &Path {
        match &self.resolved_base_dir {
            Some(resolved) => resolved.as_path(),
            None => Path::new(self.original_base_dir()),
        }
    }

    /// The `base_dir` attribute exactly as the document wrote it.
    pub fn original_base_dir(&self) -> &str {
        self.root_attribute(ATTR_BASE_DIR).unwrap_or(".")
    }

    // -----------------------------------------------------------------------
    // Sections
    // -----------------------------------------------------------------------

    /// The `<output>` children of the root's `<outputs>` section.
    pub fn get_output_files(&self) -> Result<&[NodeId], DocumentError> {
        let root = self.require_root()?;
        self.children(root)
            .iter()
            .find(|child| self.kind(**child) == Some(NodeKind::Outputs))
            .map(|outputs| self.children(*outputs))
            .ok_or(DocumentError::MissingElement(NodeKind::Outputs))
    }

    // -----------------------------------------------------------------------
    // Output context
    // -----------------------------------------------------------------------

    /// Set the language being generated and the active defines.
    pub fn set_output_context(
        &mut self,
        output_language: impl Into<String>,
        defines: IndexMap<String, String>,
    ) {
        self.output_language = output_language.into();
        self.defines = defines;
    }

    pub fn set_defines(&mut self, defines: IndexMap<String, String>) {
        self.defines = defines;
    }

    pub fn output_language(&self) -> &str {
        &self.output_language
    }

    pub fn defines(&self) -> &IndexMap<String, String> {
        &self.defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::tree::ErrorCategory;

    fn finish(tree: &mut ResourceTree, root: NodeId) -> Result<(), DocumentError> {
        tree.end_node(root)
    }

    // -----------------------------------------------------------------------
    // Root attributes
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_root_attribute_rejected() {
        let mut tree = ResourceTree::new();
        let root = tree.start_node(NodeKind::Root, None).unwrap();
        let err = tree.handle_attribute(root, "version", "2").unwrap_err();
        assert!(matches!(err, DocumentError::UnexpectedAttribute { .. }));
        assert_eq!(err.category(), ErrorCategory::Attribute);
    }

    #[test]
    fn non_numeric_release_rejected() {
        let mut tree = ResourceTree::new();
        let root = tree.start_node(NodeKind::Root, None).unwrap();
        for bad in ["", "-1", "1.5", "x"] {
            let err = tree
                .handle_attribute(root, ATTR_CURRENT_RELEASE, bad)
                .unwrap_err();
            assert!(matches!(err, DocumentError::InvalidAttribute { .. }), "{bad}");
        }
        assert!(tree.attribute(root, ATTR_CURRENT_RELEASE).is_none());
    }

    #[test]
    fn root_defaults() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "3");
        finish(&mut tree, root).unwrap();
        assert_eq!(tree.source_language(), "en");
        assert_eq!(tree.tc_project(), TC_PROJECT_UNSET);
        assert_eq!(tree.original_base_dir(), ".");
        assert_eq!(tree.current_release().unwrap(), 3);
        assert_eq!(tree.latest_public_release().unwrap(), 1);
    }

    #[test]
    fn release_numbers_require_root() {
        let tree = ResourceTree::new();
        assert!(matches!(
            tree.current_release(),
            Err(DocumentError::MissingMandatoryAttribute { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // Release ordering
    // -----------------------------------------------------------------------

    #[test]
    fn latest_greater_than_current_fails() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "5", "4");
        let err = finish(&mut tree, root).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::ReleaseOrder {
                latest: 5,
                current: 4
            }
        ));
        assert_eq!(err.category(), ErrorCategory::Validation);
        let msg = err.to_string();
        assert!(msg.contains('5') && msg.contains('4'));
        assert!(!tree.is_sealed());
    }

    #[test]
    fn equal_releases_are_valid() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "4", "4");
        assert!(finish(&mut tree, root).is_ok());
    }

    // -----------------------------------------------------------------------
    // Encoding check
    // -----------------------------------------------------------------------

    #[test]
    fn absent_enc_check_is_injected() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        finish(&mut tree, root).unwrap();
        assert_eq!(tree.encoding_check(), Some(ENCODING_CHECK));
    }

    #[test]
    fn empty_enc_check_is_replaced() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        tree.handle_attribute(root, ATTR_ENC_CHECK, "").unwrap();
        finish(&mut tree, root).unwrap();
        assert_eq!(tree.encoding_check(), Some(ENCODING_CHECK));
    }

    #[test]
    fn correct_enc_check_is_kept() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        tree.handle_attribute(root, ATTR_ENC_CHECK, ENCODING_CHECK)
            .unwrap();
        assert!(finish(&mut tree, root).is_ok());
    }

    #[test]
    fn wrong_enc_check_fails() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        // UTF-8 bytes of the sentinel decoded as Latin-1.
        tree.handle_attribute(root, ATTR_ENC_CHECK, "m\u{c3}\u{b6}l")
            .unwrap();
        let err = finish(&mut tree, root).unwrap_err();
        assert!(matches!(err, DocumentError::EncodingCheck { .. }));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    // -----------------------------------------------------------------------
    // Unique ids
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_identifiers_fail() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let ids = tree.start_node(NodeKind::Identifiers, Some(root)).unwrap();
        add_identifier(&mut tree, ids, "IDS_A");
        add_identifier(&mut tree, ids, "IDS_B");
        add_identifier(&mut tree, ids, "IDS_A");
        add_identifier(&mut tree, ids, "IDS_B");
        add_identifier(&mut tree, ids, "IDS_A");
        tree.end_node(ids).unwrap();
        let err = finish(&mut tree, root).unwrap_err();
        match err {
            DocumentError::DuplicateKey(names) => assert_eq!(names, vec!["IDS_A", "IDS_B"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicates_across_sibling_conditionals_pass() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let release = start_release(&mut tree, root, "1");
        let messages = tree.start_node(NodeKind::Messages, Some(release)).unwrap();
        for expr in ["lang == 'en'", "lang != 'en'"] {
            let cond = start_conditional(&mut tree, messages, expr);
            add_message(&mut tree, cond, "IDS_TITLE");
            tree.end_node(cond).unwrap();
        }
        tree.end_node(messages).unwrap();
        tree.end_node(release).unwrap();
        assert!(finish(&mut tree, root).is_ok());
    }

    #[test]
    fn unconditional_use_after_conditional_is_flagged() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let release = start_release(&mut tree, root, "1");
        let messages = tree.start_node(NodeKind::Messages, Some(release)).unwrap();
        let cond = start_conditional(&mut tree, messages, "True");
        add_message(&mut tree, cond, "IDS_TITLE");
        tree.end_node(cond).unwrap();
        add_message(&mut tree, messages, "IDS_TITLE");
        tree.end_node(messages).unwrap();
        tree.end_node(release).unwrap();
        let err = finish(&mut tree, root).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateKey(ref ids) if ids == &["IDS_TITLE"]));
    }

    #[test]
    fn conditional_use_after_unconditional_is_exempt() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let release = start_release(&mut tree, root, "1");
        let messages = tree.start_node(NodeKind::Messages, Some(release)).unwrap();
        add_message(&mut tree, messages, "IDS_TITLE");
        let cond = start_conditional(&mut tree, messages, "True");
        add_message(&mut tree, cond, "IDS_TITLE");
        tree.end_node(cond).unwrap();
        tree.end_node(messages).unwrap();
        tree.end_node(release).unwrap();
        assert!(finish(&mut tree, root).is_ok());
    }

    #[test]
    fn system_identifiers_repeat_freely() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let ids = tree.start_node(NodeKind::Identifiers, Some(root)).unwrap();
        for _ in 0..3 {
            add_identifier(&mut tree, ids, "IDOK");
            add_identifier(&mut tree, ids, "IDC_STATIC");
        }
        tree.end_node(ids).unwrap();
        assert!(finish(&mut tree, root).is_ok());
    }

    #[test]
    fn injected_predicate_replaces_default() {
        let mut tree = ResourceTree::new()
            .with_system_identifiers(|id: &str| id.starts_with("SHARED_"));
        let root = start_root(&mut tree, "1", "1");
        let ids = tree.start_node(NodeKind::Identifiers, Some(root)).unwrap();
        add_identifier(&mut tree, ids, "SHARED_X");
        add_identifier(&mut tree, ids, "SHARED_X");
        add_identifier(&mut tree, ids, "IDOK");
        add_identifier(&mut tree, ids, "IDOK");
        tree.end_node(ids).unwrap();
        let err = finish(&mut tree, root).unwrap_err();
        assert!(matches!(err, DocumentError::DuplicateKey(ref ids) if ids == &["IDOK"]));
    }

    #[test]
    fn placeholder_names_ignored() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let release = start_release(&mut tree, root, "1");
        let messages = tree.start_node(NodeKind::Messages, Some(release)).unwrap();
        for name in ["IDS_A", "IDS_B"] {
            let msg = tree.start_node(NodeKind::Message, Some(messages)).unwrap();
            tree.handle_attribute(msg, ATTR_NAME, name).unwrap();
            let ph = tree.start_node(NodeKind::Placeholder, Some(msg)).unwrap();
            tree.handle_attribute(ph, ATTR_NAME, "USER").unwrap();
            tree.end_node(ph).unwrap();
            tree.end_node(msg).unwrap();
        }
        tree.end_node(messages).unwrap();
        tree.end_node(release).unwrap();
        assert!(finish(&mut tree, root).is_ok());
    }

    // -----------------------------------------------------------------------
    // Base directory
    // -----------------------------------------------------------------------

    #[test]
    fn base_dir_before_own_dir_is_raw() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        tree.handle_attribute(root, ATTR_BASE_DIR, "../res/./x").unwrap();
        assert_eq!(tree.base_dir(), Path::new("../res/./x"));
        assert_eq!(tree.original_base_dir(), "../res/./x");
    }

    #[test]
    fn base_dir_unset_reads_as_dot() {
        let tree = ResourceTree::new();
        assert_eq!(tree.base_dir(), Path::new("."));
    }

    #[test]
    fn own_dir_joins_and_normalizes() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        tree.handle_attribute(root, ATTR_BASE_DIR, "res").unwrap();
        finish(&mut tree, root).unwrap();
        tree.set_own_dir("/proj/src").unwrap();
        assert_eq!(tree.base_dir(), Path::new("/proj/src/res"));
        assert_eq!(tree.original_base_dir(), "res");
    }

    #[test]
    fn own_dir_rejects_empty_and_repeat() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        finish(&mut tree, root).unwrap();
        assert!(matches!(tree.set_own_dir(""), Err(DocumentError::EmptyOwnDir)));
        tree.set_own_dir("/proj").unwrap();
        assert_eq!(tree.base_dir(), Path::new("/proj"));
        assert!(matches!(
            tree.set_own_dir("/other"),
            Err(DocumentError::OwnDirAlreadySet)
        ));
    }

    #[test]
    fn normalize_join_cases() {
        assert_eq!(normalize_join(Path::new("/a/b"), "../c"), PathBuf::from("/a/c"));
        assert_eq!(normalize_join(Path::new("/a/b"), "./c/./d"), PathBuf::from("/a/b/c/d"));
        assert_eq!(normalize_join(Path::new("/a"), "../../x"), PathBuf::from("/x"));
        assert_eq!(normalize_join(Path::new("a"), "../../x"), PathBuf::from("../x"));
        assert_eq!(normalize_join(Path::new("a"), ".."), PathBuf::from("."));
        assert_eq!(normalize_join(Path::new("/a/b"), "/abs"), PathBuf::from("/abs"));
    }

    // -----------------------------------------------------------------------
    // Sections and context
    // -----------------------------------------------------------------------

    #[test]
    fn output_files_in_order() {
        let mut tree = ResourceTree::new();
        let root = start_root(&mut tree, "1", "1");
        let outputs = tree.start_node(NodeKind::Outputs, Some(root)).unwrap();
        let a = add_output(&mut tree, outputs, "a.h", "header");
        let b = add_output(&mut tree, outputs, "a.pak", "data-package");
        tree.end_node(outputs).unwrap();
        assert_eq!(tree.get_output_files().unwrap(), &[a, b]);
    }

    #[test]
    fn output_files_missing_section() {
        let mut tree = ResourceTree::new();
        start_root(&mut tree, "1", "1");
        let err = tree.get_output_files().unwrap_err();
        assert!(matches!(err, DocumentError::MissingElement(NodeKind::Outputs)));
        assert_eq!(err.category(), ErrorCategory::MissingElement);
    }

    #[test]
    fn output_context_setters() {
        let mut tree = ResourceTree::new();
        let mut defines = IndexMap::new();
        defines.insert("_chromium".to_string(), "1".to_string());
        tree.set_output_context("fr", defines.clone());
        assert_eq!(tree.output_language(), "fr");
        assert_eq!(tree.defines(), &defines);
        tree.set_defines(IndexMap::new());
        assert!(tree.defines().is_empty());
        assert_eq!(tree.output_language(), "fr");
    }
}
