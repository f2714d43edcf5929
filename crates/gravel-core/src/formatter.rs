//! Output-kind dispatch.
//!
//! Generating a build output asks each node which emitter handles a given
//! [`OutputKind`]. The answer comes from a [`FormatterRegistry`] keyed by
//! `(NodeKind, OutputKind)`; a missing entry resolves to
//! [`Dispatch::Inherited`], leaving the decision to the caller's default
//! resolution. Emitters themselves live outside this crate.

use crate::id::NodeId;
use crate::node::NodeKind;
use crate::tree::{DocumentError, ResourceTree};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;
use tracing::{debug, warn};

/// A kind of build output, as named on an `<output type=...>` node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputKind {
    Header,
    AllResources,
    TranslatableResources,
    NonTranslatableResources,
    ResourceMapHeader,
    ResourceMapSource,
    ResourceFileMapSource,
    DataPackage,
    JsMap,
    /// Any name not listed above.
    Other(String),
}

impl OutputKind {
    pub fn from_name(name: &str) -> OutputKind {
        match name {
            "header" => OutputKind::Header,
            "all-resources" => OutputKind::AllResources,
            "translatable-resources" => OutputKind::TranslatableResources,
            "non-translatable-resources" => OutputKind::NonTranslatableResources,
            "resource-map-header" => OutputKind::ResourceMapHeader,
            "resource-map-source" => OutputKind::ResourceMapSource,
            "resource-file-map-source" => OutputKind::ResourceFileMapSource,
            "data-package" => OutputKind::DataPackage,
            "js-map" => OutputKind::JsMap,
            other => OutputKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OutputKind::Header => "header",
            OutputKind::AllResources => "all-resources",
            OutputKind::TranslatableResources => "translatable-resources",
            OutputKind::NonTranslatableResources => "non-translatable-resources",
            OutputKind::ResourceMapHeader => "resource-map-header",
            OutputKind::ResourceMapSource => "resource-map-source",
            OutputKind::ResourceFileMapSource => "resource-file-map-source",
            OutputKind::DataPackage => "data-package",
            OutputKind::JsMap => "js-map",
            OutputKind::Other(name) => name,
        }
    }
}

impl FromStr for OutputKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(OutputKind::from_name(s))
    }
}

impl From<String> for OutputKind {
    fn from(name: String) -> Self {
        OutputKind::from_name(&name)
    }
}

impl From<OutputKind> for String {
    fn from(kind: OutputKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque name of the emitter responsible for an output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmitterHandle {
    HeaderTopLevel,
    HeaderItem,
    ResourceScriptTopLevel,
    ResourceMapHeader,
    ResourceMapSource,
    JsMapTopLevel,
    DataPack,
    Custom(String),
}

/// Result of asking a node for its emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Emitter(EmitterHandle),
    /// No entry for this node kind; use the default resolution.
    Inherited,
}

/// Table of `(NodeKind, OutputKind) -> EmitterHandle`.
#[derive(Debug, Clone, Default)]
pub struct FormatterRegistry {
    entries: HashMap<(NodeKind, OutputKind), EmitterHandle>,
}

impl FormatterRegistry {
    /// A registry with no entries; every lookup is inherited.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard table for root, release and identifier nodes.
    pub fn builtin() -> Self {
        use EmitterHandle as E;
        use NodeKind::{Identifier, Release, Root};
        use OutputKind as O;

        let mut registry = Self::empty();
        registry.register(Root, O::Header, E::HeaderTopLevel);
        for kind in [
            O::AllResources,
            O::TranslatableResources,
            O::NonTranslatableResources,
        ] {
            registry.register(Root, kind, E::ResourceScriptTopLevel);
        }
        registry.register(Root, O::ResourceMapHeader, E::ResourceMapHeader);
        registry.register(Root, O::ResourceMapSource, E::ResourceMapSource);
        registry.register(Root, O::ResourceFileMapSource, E::ResourceMapSource);
        registry.register(Root, O::JsMap, E::JsMapTopLevel);
        registry.register(Release, O::DataPackage, E::DataPack);
        registry.register(Identifier, O::Header, E::HeaderItem);
        registry
    }

    /// Add or replace an entry. Returns the handle it replaced.
    pub fn register(
        &mut self,
        node: NodeKind,
        output: OutputKind,
        handle: EmitterHandle,
    ) -> Option<EmitterHandle> {
        self.entries.insert((node, output), handle)
    }

    pub fn dispatch(&self, node: NodeKind, output: &OutputKind) -> Dispatch {
        self.entries
            .get(&(node, output.clone()))
            .cloned()
            .map_or(Dispatch::Inherited, Dispatch::Emitter)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceTree {
    /// The emitter the document root uses for `output`.
    pub fn dispatch_output_formatter(&self, output: &OutputKind) -> Result<Dispatch, DocumentError> {
        let root = self.require_root()?;
        self.dispatch_for(root, output)
    }

    /// The emitter `node` uses for `output`. Never fails for an unknown
    /// output kind.
    pub fn dispatch_for(&self, node: NodeId, output: &OutputKind) -> Result<Dispatch, DocumentError> {
        let kind = self.node(node)?.kind();
        if let OutputKind::Other(name) = output {
            warn!(output = %name, "unrecognized output kind");
        }
        let dispatch = self.formatters.dispatch(kind, output);
        if dispatch == Dispatch::Inherited {
            debug!(node = kind.tag(), output = output.as_str(), "formatter inherited");
        }
        Ok(dispatch)
    }

    pub fn formatters(&self) -> &FormatterRegistry {
        &self.formatters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    const NAMES: [&str; 9] = [
        "header",
        "all-resources",
        "translatable-resources",
        "non-translatable-resources",
        "resource-map-header",
        "resource-map-source",
        "resource-file-map-source",
        "data-package",
        "js-map",
    ];

    // -----------------------------------------------------------------------
    // OutputKind
    // -----------------------------------------------------------------------

    #[test]
    fn output_kind_names_round_trip() {
        for name in NAMES {
            let kind: OutputKind = name.parse().unwrap();
            assert!(!matches!(kind, OutputKind::Other(_)), "{name}");
            assert_eq!(kind.as_str(), name);
        }
    }

    #[test]
    fn unknown_output_kind_is_other() {
        assert_eq!(
            OutputKind::from_name("rc_all"),
            OutputKind::Other("rc_all".to_string())
        );
    }

    #[test]
    fn output_kind_serde_uses_names() {
        let json = serde_json::to_string(&OutputKind::DataPackage).unwrap();
        assert_eq!(json, "\"data-package\"");
        let back: OutputKind = serde_json::from_str("\"js-map\"").unwrap();
        assert_eq!(back, OutputKind::JsMap);
    }

    // -----------------------------------------------------------------------
    // Registry
    // -----------------------------------------------------------------------

    #[test]
    fn builtin_root_entries() {
        let registry = FormatterRegistry::builtin();
        let expect = [
            (OutputKind::Header, EmitterHandle::HeaderTopLevel),
            (OutputKind::AllResources, EmitterHandle::ResourceScriptTopLevel),
            (OutputKind::TranslatableResources, EmitterHandle::ResourceScriptTopLevel),
            (OutputKind::NonTranslatableResources, EmitterHandle::ResourceScriptTopLevel),
            (OutputKind::ResourceMapHeader, EmitterHandle::ResourceMapHeader),
            (OutputKind::ResourceMapSource, EmitterHandle::ResourceMapSource),
            (OutputKind::ResourceFileMapSource, EmitterHandle::ResourceMapSource),
            (OutputKind::JsMap, EmitterHandle::JsMapTopLevel),
        ];
        for (output, handle) in expect {
            assert_eq!(
                registry.dispatch(NodeKind::Root, &output),
                Dispatch::Emitter(handle),
                "{output}"
            );
        }
        assert_eq!(
            registry.dispatch(NodeKind::Root, &OutputKind::DataPackage),
            Dispatch::Inherited
        );
    }

    #[test]
    fn builtin_release_and_identifier_entries() {
        let registry = FormatterRegistry::builtin();
        assert_eq!(
            registry.dispatch(NodeKind::Release, &OutputKind::DataPackage),
            Dispatch::Emitter(EmitterHandle::DataPack)
        );
        assert_eq!(
            registry.dispatch(NodeKind::Identifier, &OutputKind::Header),
            Dispatch::Emitter(EmitterHandle::HeaderItem)
        );
        assert_eq!(
            registry.dispatch(NodeKind::Message, &OutputKind::Header),
            Dispatch::Inherited
        );
    }

    #[test]
    fn custom_registration_overrides() {
        let mut registry = FormatterRegistry::builtin();
        let previous = registry.register(
            NodeKind::Root,
            OutputKind::Header,
            EmitterHandle::Custom("bare-header".into()),
        );
        assert_eq!(previous, Some(EmitterHandle::HeaderTopLevel));
        registry.register(
            NodeKind::Root,
            OutputKind::Other("policy-templates".into()),
            EmitterHandle::Custom("policy".into()),
        );
        assert_eq!(
            registry.dispatch(NodeKind::Root, &OutputKind::from_name("policy-templates")),
            Dispatch::Emitter(EmitterHandle::Custom("policy".into()))
        );
        assert!(FormatterRegistry::empty().is_empty());
    }

    // -----------------------------------------------------------------------
    // Tree dispatch
    // -----------------------------------------------------------------------

    #[test]
    fn root_dispatch_falls_through_for_unknown_kind() {
        let mut tree = ResourceTree::new();
        start_root(&mut tree, "1", "1");
        assert_eq!(
            tree.dispatch_output_formatter(&OutputKind::Header).unwrap(),
            Dispatch::Emitter(EmitterHandle::HeaderTopLevel)
        );
        assert_eq!(
            tree.dispatch_output_formatter(&OutputKind::from_name("chrome_messages_json"))
                .unwrap(),
            Dispatch::Inherited
        );
    }

    #[test]
    fn dispatch_without_root_fails() {
        let tree = ResourceTree::new();
        assert!(matches!(
            tree.dispatch_output_formatter(&OutputKind::Header),
            Err(DocumentError::NoRoot)
        ));
    }

    #[test]
    fn tree_uses_injected_registry() {
        let mut tree = ResourceTree::new().with_formatters(FormatterRegistry::empty());
        let root = start_root(&mut tree, "1", "1");
        assert_eq!(
            tree.dispatch_for(root, &OutputKind::Header).unwrap(),
            Dispatch::Inherited
        );
        assert!(tree.formatters().is_empty());
    }
}
