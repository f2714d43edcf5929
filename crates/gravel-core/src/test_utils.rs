//! Shared test helpers for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. Helpers panic
//! on protocol errors so tests can stay focused on the behavior under test.

use crate::id::NodeId;
use crate::node::*;
use crate::tree::ResourceTree;

// ===========================================================================
// Single-node builders
// ===========================================================================

/// Start the root and set both release numbers. The root is left open.
pub fn start_root(tree: &mut ResourceTree, latest: &str, current: &str) -> NodeId {
    let root = tree.start_node(NodeKind::Root, None).unwrap();
    tree.handle_attribute(root, ATTR_LATEST_PUBLIC_RELEASE, latest)
        .unwrap();
    tree.handle_attribute(root, ATTR_CURRENT_RELEASE, current)
        .unwrap();
    root
}

/// Start a `<release seq=...>` under `root`. Left open.
pub fn start_release(tree: &mut ResourceTree, root: NodeId, seq: &str) -> NodeId {
    let release = tree.start_node(NodeKind::Release, Some(root)).unwrap();
    tree.handle_attribute(release, ATTR_SEQ, seq).unwrap();
    release
}

/// Start an `<if expr=...>` under `parent`. Left open.
pub fn start_conditional(tree: &mut ResourceTree, parent: NodeId, expr: &str) -> NodeId {
    let cond = tree.start_node(NodeKind::Conditional, Some(parent)).unwrap();
    tree.handle_attribute(cond, ATTR_EXPR, expr).unwrap();
    cond
}

/// Add a complete `<identifier name=...>`.
pub fn add_identifier(tree: &mut ResourceTree, parent: NodeId, name: &str) -> NodeId {
    add_named(tree, NodeKind::Identifier, parent, name)
}

/// Add a complete `<message name=...>` with no placeholders.
pub fn add_message(tree: &mut ResourceTree, parent: NodeId, name: &str) -> NodeId {
    add_named(tree, NodeKind::Message, parent, name)
}

/// Add a complete `<include name=... type=... file=...>`.
pub fn add_include(tree: &mut ResourceTree, parent: NodeId, name: &str, file: &str) -> NodeId {
    let include = tree.start_node(NodeKind::Include, Some(parent)).unwrap();
    tree.handle_attribute(include, ATTR_NAME, name).unwrap();
    tree.handle_attribute(include, "type", "BINDATA").unwrap();
    tree.handle_attribute(include, "file", file).unwrap();
    tree.end_node(include).unwrap();
    include
}

/// Add a complete `<output filename=... type=...>`.
pub fn add_output(tree: &mut ResourceTree, parent: NodeId, filename: &str, kind: &str) -> NodeId {
    let output = tree.start_node(NodeKind::Output, Some(parent)).unwrap();
    tree.handle_attribute(output, "filename", filename).unwrap();
    tree.handle_attribute(output, "type", kind).unwrap();
    tree.end_node(output).unwrap();
    output
}

fn add_named(tree: &mut ResourceTree, kind: NodeKind, parent: NodeId, name: &str) -> NodeId {
    let node = tree.start_node(kind, Some(parent)).unwrap();
    tree.handle_attribute(node, ATTR_NAME, name).unwrap();
    tree.end_node(node).unwrap();
    node
}

// ===========================================================================
// Whole documents
// ===========================================================================

/// Handles into the document built by [`sample_document`].
#[derive(Debug, Clone, Copy)]
pub struct SampleDocument {
    pub root: NodeId,
    pub release: NodeId,
    pub messages: NodeId,
    pub title: NodeId,
    pub french: NodeId,
    pub french_message: NodeId,
    pub other: NodeId,
    pub other_message: NodeId,
    pub identifier: NodeId,
    pub header_output: NodeId,
    pub pak_output: NodeId,
}

/// Build and seal a representative document:
///
/// ```text
/// <grit latest_public_release="1" current_release="2">
///   <release seq="1">
///     <includes><include name="IDR_LOGO" .../></includes>
///     <messages>
///       <message name="IDS_TITLE"><ph name="USER"/></message>
///       <if expr="lang == 'fr'"><message name="IDS_GREETING"/></if>
///       <if expr="lang != 'fr'"><message name="IDS_GREETING"/></if>
///     </messages>
///   </release>
///   <identifiers><identifier name="IDC_MAIN" id="100"/></identifiers>
///   <translations><file path="fr.xtb" lang="fr"/></translations>
///   <outputs>
///     <output filename="res.h" type="header"/>
///     <output filename="res.pak" type="data-package"/>
///   </outputs>
/// </grit>
/// ```
pub fn sample_document(tree: &mut ResourceTree) -> SampleDocument {
    let root = start_root(tree, "1", "2");
    let release = start_release(tree, root, "1");

    let includes = tree.start_node(NodeKind::Includes, Some(release)).unwrap();
    add_include(tree, includes, "IDR_LOGO", "logo.png");
    tree.end_node(includes).unwrap();

    let messages = tree.start_node(NodeKind::Messages, Some(release)).unwrap();
    let title = tree.start_node(NodeKind::Message, Some(messages)).unwrap();
    tree.handle_attribute(title, ATTR_NAME, "IDS_TITLE").unwrap();
    let ph = tree.start_node(NodeKind::Placeholder, Some(title)).unwrap();
    tree.handle_attribute(ph, ATTR_NAME, "USER").unwrap();
    tree.end_node(ph).unwrap();
    tree.end_node(title).unwrap();

    let french = start_conditional(tree, messages, "lang == 'fr'");
    let french_message = add_message(tree, french, "IDS_GREETING");
    tree.end_node(french).unwrap();
    let other = start_conditional(tree, messages, "lang != 'fr'");
    let other_message = add_message(tree, other, "IDS_GREETING");
    tree.end_node(other).unwrap();
    tree.end_node(messages).unwrap();
    tree.end_node(release).unwrap();

    let identifiers = tree.start_node(NodeKind::Identifiers, Some(root)).unwrap();
    let identifier = tree
        .construct_identifier(identifiers, "IDC_MAIN", "100", "")
        .unwrap();
    tree.end_node(identifiers).unwrap();

    let translations = tree.start_node(NodeKind::Translations, Some(root)).unwrap();
    let file = tree
        .start_node(NodeKind::TranslationFile, Some(translations))
        .unwrap();
    tree.handle_attribute(file, "path", "fr.xtb").unwrap();
    tree.handle_attribute(file, "lang", "fr").unwrap();
    tree.end_node(file).unwrap();
    tree.end_node(translations).unwrap();

    let outputs = tree.start_node(NodeKind::Outputs, Some(root)).unwrap();
    let header_output = add_output(tree, outputs, "res.h", "header");
    let pak_output = add_output(tree, outputs, "res.pak", "data-package");
    tree.end_node(outputs).unwrap();

    tree.end_node(root).unwrap();

    SampleDocument {
        root,
        release,
        messages,
        title,
        french,
        french_message,
        other,
        other_message,
        identifier,
        header_output,
        pak_output,
    }
}
