//! Property-accessor and event-handler scanning (spec §2 step 4: "property accessors,
//! event handlers"). Accessor/add/remove bodies are ordinary method bodies and get the
//! same treatment as any other method — this module only adapts the `TypeDef` shapes
//! into a flat method list in declaration order, gated by `analyze_property_accessors`.

use modscan_core::cil::{MethodDef, TypeDef};
use modscan_core::ScanConfig;

/// Every method body reachable through a type's property and event declarations, in
/// declaration order (properties first, then events; getter before setter; add before
/// remove) so callers get the same determinism as the ordinary method list.
pub fn accessor_methods<'a>(type_def: &'a TypeDef, config: &ScanConfig) -> Vec<&'a MethodDef> {
    if !config.analyze_property_accessors {
        return Vec::new();
    }
    let mut methods = Vec::new();
    for property in &type_def.properties {
        methods.push(&property.method);
    }
    for event in &type_def.events {
        if let Some(add) = &event.add_method {
            methods.push(add);
        }
        if let Some(remove) = &event.remove_method {
            methods.push(remove);
        }
    }
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::cil::{EventHandler, PropertyAccessor, PropertyAccessorKind};
    use modscan_core::testkit::{MethodBuilder, TypeBuilder};

    fn method(name: &str) -> MethodDef {
        TypeBuilder::new("N", "T").method(MethodBuilder::new(name).ret()).build().methods.into_iter().next().unwrap()
    }

    #[test]
    fn collects_getter_setter_and_event_methods_in_order() {
        let mut type_def = TypeBuilder::new("N", "T").build();
        type_def.properties.push(PropertyAccessor { property_name: "X".into(), kind: PropertyAccessorKind::Getter, method: method("get_X") });
        type_def.properties.push(PropertyAccessor { property_name: "X".into(), kind: PropertyAccessorKind::Setter, method: method("set_X") });
        type_def.events.push(EventHandler { event_name: "E".into(), add_method: Some(method("add_E")), remove_method: Some(method("remove_E")) });

        let config = ScanConfig::default();
        let methods = accessor_methods(&type_def, &config);
        let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["get_X", "set_X", "add_E", "remove_E"]);
    }

    #[test]
    fn disabled_by_config_yields_nothing() {
        let mut type_def = TypeBuilder::new("N", "T").build();
        type_def.properties.push(PropertyAccessor { property_name: "X".into(), kind: PropertyAccessorKind::Getter, method: method("get_X") });
        let mut config = ScanConfig::default();
        config.analyze_property_accessors = false;
        assert!(accessor_methods(&type_def, &config).is_empty());
    }
}
