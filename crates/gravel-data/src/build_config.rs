//! Resolved build configuration: the output context a tree is evaluated in.

use crate::schema::{BuildConfigData, FlagValue};
use gravel_core::expr::{EvalContext, Value, host_platform};
use gravel_core::tree::ResourceTree;
use indexmap::IndexMap;

/// Output language, defines, platform and extra expression bindings for a
/// single build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub output_language: String,
    pub defines: IndexMap<String, String>,
    pub platform: String,
    pub flags: IndexMap<String, Value>,
}

impl From<BuildConfigData> for BuildConfig {
    fn from(data: BuildConfigData) -> Self {
        let flags = data
            .flags
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    FlagValue::Bool(b) => Value::Bool(b),
                    FlagValue::Int(i) => Value::Int(i),
                    FlagValue::Str(s) => Value::Str(s),
                };
                (name, value)
            })
            .collect();
        Self {
            output_language: data.output_language,
            defines: data.defines,
            platform: data
                .platform
                .unwrap_or_else(|| host_platform().to_string()),
            flags,
        }
    }
}

impl BuildConfig {
    /// Config for `output_language` on the host platform with no defines.
    pub fn new(output_language: impl Into<String>) -> Self {
        Self {
            output_language: output_language.into(),
            defines: IndexMap::new(),
            platform: host_platform().to_string(),
            flags: IndexMap::new(),
        }
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defines.insert(name.into(), value.into());
        self
    }

    /// Install the output language and defines on `tree`.
    pub fn apply_to(&self, tree: &mut ResourceTree) {
        tree.set_output_context(self.output_language.clone(), self.defines.clone());
    }

    /// Bindings for condition evaluation. Flags are bound first; `lang`,
    /// `defs` and `os` always take their configured values.
    pub fn eval_context(&self) -> EvalContext {
        let mut ctx = EvalContext::new();
        for (name, value) in &self.flags {
            ctx.bind(name.clone(), value.clone());
        }
        ctx.with("lang", self.output_language.as_str())
            .with("defs", &self.defines)
            .with("os", self.platform.as_str())
    }
}
