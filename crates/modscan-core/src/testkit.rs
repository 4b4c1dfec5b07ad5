//! Synthetic assembly builder used by the scenario test suite (spec §8: "each uses a
//! synthetic assembly built by the test harness; inputs are IL sequences"). Nothing here
//! is exercised by production code — it exists so tests never need a real `.dll` on disk.

use crate::cil::{
    CustomAttribute, ExceptionHandler, Instruction, LocalVariable, ManifestResource, MethodDef,
    Opcode, Operand, PInvokeDeclaration, TypeDef,
};

pub use crate::cil::Module;

const DEFAULT_ASSEMBLY_SCOPE: &str = "UserMod";

#[derive(Debug, Clone)]
pub struct MethodBuilder {
    name: String,
    is_static: bool,
    instructions: Vec<Instruction>,
    next_offset: u32,
    locals: Vec<LocalVariable>,
    exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_static: true,
            instructions: Vec::new(),
            next_offset: 0,
            locals: Vec::new(),
            exception_handlers: Vec::new(),
        }
    }

    pub fn instance(mut self) -> Self {
        self.is_static = false;
        self
    }

    fn push(mut self, opcode: Opcode, operand: Operand) -> Self {
        let offset = self.next_offset;
        self.instructions.push(Instruction::new(offset, opcode, operand));
        self.next_offset += 1;
        self
    }

    pub fn ldstr(self, s: impl Into<String>) -> Self {
        self.push(Opcode::Ldstr, Operand::String(s.into()))
    }

    pub fn ldc_i4(self, v: i32) -> Self {
        self.push(Opcode::LdcI4, Operand::Int32(v))
    }

    pub fn ldc_i8(self, v: i64) -> Self {
        self.push(Opcode::LdcI8, Operand::Int64(v))
    }

    pub fn call(self, declaring_type: impl Into<String>, method: impl Into<String>, assembly_scope: impl Into<String>) -> Self {
        self.push(
            Opcode::Call,
            Operand::Method(crate::cil::MethodRef::new(declaring_type, method, assembly_scope)),
        )
    }

    pub fn callvirt(self, declaring_type: impl Into<String>, method: impl Into<String>, assembly_scope: impl Into<String>) -> Self {
        self.push(
            Opcode::Callvirt,
            Operand::Method(crate::cil::MethodRef::new(declaring_type, method, assembly_scope)),
        )
    }

    pub fn newobj(self, declaring_type: impl Into<String>, method: impl Into<String>, assembly_scope: impl Into<String>) -> Self {
        self.push(
            Opcode::Newobj,
            Operand::Method(crate::cil::MethodRef::new(declaring_type, method, assembly_scope)),
        )
    }

    pub fn conv_u2(self) -> Self {
        self.push(Opcode::ConvU2, Operand::None)
    }

    pub fn ldloc(self, index: u16) -> Self {
        self.push(Opcode::Ldloc, Operand::Local(index))
    }

    pub fn stloc(self, index: u16) -> Self {
        self.push(Opcode::Stloc, Operand::Local(index))
    }

    pub fn ldarg(self, index: u16) -> Self {
        self.push(Opcode::Ldarg, Operand::Arg(index))
    }

    pub fn other(self, mnemonic: impl Into<String>) -> Self {
        self.push(Opcode::Other(mnemonic.into()), Operand::None)
    }

    pub fn ret(self) -> Self {
        self.push(Opcode::Ret, Operand::None)
    }

    pub fn local(mut self, type_name: impl Into<String>) -> Self {
        let index = self.locals.len() as u16;
        self.locals.push(LocalVariable {
            index,
            type_name: type_name.into(),
            name: None,
        });
        self
    }

    pub fn exception_handler(mut self, handler: ExceptionHandler) -> Self {
        self.exception_handlers.push(handler);
        self
    }
}

#[derive(Debug, Clone)]
pub struct TypeBuilder {
    namespace: String,
    name: String,
    assembly_scope: String,
    methods: Vec<MethodDef>,
}

impl TypeBuilder {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            assembly_scope: DEFAULT_ASSEMBLY_SCOPE.to_string(),
            methods: Vec::new(),
        }
    }

    pub fn assembly_scope(mut self, scope: impl Into<String>) -> Self {
        self.assembly_scope = scope.into();
        self
    }

    pub fn method(mut self, builder: MethodBuilder) -> Self {
        self.methods.push(MethodDef {
            name: builder.name,
            declaring_type: self.name.clone(),
            namespace: self.namespace.clone(),
            is_static: builder.is_static,
            instructions: builder.instructions,
            locals: builder.locals,
            exception_handlers: builder.exception_handlers,
        });
        self
    }

    pub fn build(self) -> TypeDef {
        TypeDef {
            name: self.name,
            namespace: self.namespace,
            assembly_scope: self.assembly_scope,
            methods: self.methods,
            properties: Vec::new(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModuleBuilderKit {
    module: Module,
}

impl ModuleBuilderKit {
    pub fn new(assembly_name: impl Into<String>) -> Self {
        Self {
            module: Module::new(assembly_name),
        }
    }

    pub fn with_type(mut self, type_def: TypeDef) -> Self {
        self.module.types.push(type_def);
        self
    }

    pub fn with_assembly_attribute(mut self, type_name: impl Into<String>, string_args: Vec<String>) -> Self {
        self.module.custom_attributes.push(CustomAttribute {
            type_name: type_name.into(),
            string_args,
        });
        self
    }

    pub fn with_manifest_resource(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.module.manifest_resources.push(ManifestResource {
            name: name.into(),
            data,
        });
        self
    }

    pub fn with_pinvoke(
        mut self,
        declaring_type: impl Into<String>,
        method: impl Into<String>,
        native_library: impl Into<String>,
        entry_point: impl Into<String>,
    ) -> Self {
        self.module.pinvoke_declarations.push(PInvokeDeclaration {
            method: crate::cil::MethodRef::new(declaring_type, method, DEFAULT_ASSEMBLY_SCOPE),
            native_library: native_library.into(),
            entry_point: entry_point.into(),
        });
        self
    }

    pub fn with_assembly_reference(mut self, assembly_name: impl Into<String>) -> Self {
        self.module.assembly_references.push(assembly_name.into());
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}
