//! External-collaborator interfaces (spec §6): entry-point provider and assembly
//! resolver provider. The metadata reader itself is represented structurally by
//! `crate::cil::Module`; these two traits are the pluggable policy hooks around it.

use crate::cil::MethodDef;

/// `is_entry_point` / `known_entry_point_names` (spec §6). The default implementation is
/// deliberately loose (Unity-like lifecycle names); production deployments targeting a
/// specific host framework (BepInEx, MelonLoader) should supply their own.
pub trait EntryPointProvider: Send + Sync {
    fn is_entry_point(&self, method: &MethodDef) -> bool;
    fn known_entry_point_names(&self) -> Vec<&'static str>;
}

const DEFAULT_ENTRY_POINT_NAMES: &[&str] = &[
    "Awake",
    "Start",
    "Update",
    "OnEnable",
    "OnDestroy",
    "OnApplicationQuit",
    ".cctor",
];

/// Unity-lifecycle + `On*`-prefix + `.cctor` default, per spec §4.5/§6.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEntryPointProvider;

impl EntryPointProvider for DefaultEntryPointProvider {
    fn is_entry_point(&self, method: &MethodDef) -> bool {
        let name = method.name.as_str();
        DEFAULT_ENTRY_POINT_NAMES.contains(&name) || name.starts_with("On")
    }

    fn known_entry_point_names(&self) -> Vec<&'static str> {
        DEFAULT_ENTRY_POINT_NAMES.to_vec()
    }
}

/// Produces a resolver handle the metadata reader uses to resolve external assembly
/// references. Resolution failures never fail a scan — they only degrade reference
/// quality, so this trait has no fallible surface of its own.
pub trait AssemblyResolverProvider: Send + Sync {
    fn resolve_hint(&self, assembly_scope: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullAssemblyResolverProvider;

impl AssemblyResolverProvider for NullAssemblyResolverProvider {
    fn resolve_hint(&self, _assembly_scope: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cil::MethodDef;

    fn method_named(name: &str) -> MethodDef {
        MethodDef {
            name: name.to_string(),
            declaring_type: "Plugin".to_string(),
            namespace: "Mod".to_string(),
            is_static: false,
            instructions: Vec::new(),
            locals: Vec::new(),
            exception_handlers: Vec::new(),
        }
    }

    #[test]
    fn default_provider_matches_unity_lifecycle_and_on_prefix() {
        let p = DefaultEntryPointProvider;
        assert!(p.is_entry_point(&method_named("Awake")));
        assert!(p.is_entry_point(&method_named("OnCollisionEnter")));
        assert!(p.is_entry_point(&method_named(".cctor")));
        assert!(!p.is_entry_point(&method_named("HelperMethod")));
    }
}
