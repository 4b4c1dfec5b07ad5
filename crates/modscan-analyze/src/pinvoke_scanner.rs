//! P/Invoke declaration registration (spec §2 control-flow step 3: "register P/Invoke
//! declarations without emitting findings yet"). A thin named step so the control flow in
//! [`crate::scanner`] reads the same way the pipeline in spec §2 is numbered; the actual
//! bookkeeping lives in [`crate::call_graph::CallGraphBuilder`].

use modscan_core::cil::Module;

use crate::call_graph::CallGraphBuilder;

pub fn register_pinvoke_declarations(module: &Module, call_graph: &mut CallGraphBuilder) {
    call_graph.register_pinvoke_declarations(module);
}
