//! Read-only view of CIL metadata and instructions.
//!
//! This is the shape the "metadata reader" external collaborator (spec §6) hands to the
//! analysis core: modules containing types containing methods containing instructions,
//! plus assembly-level attributes, manifest resources, and P/Invoke declarations. The
//! scanner never mutates these structures — every field here is read during analysis and
//! never written back.

use serde::{Deserialize, Serialize};

/// A resolvable reference to a method, either defined in the scanned module or imported
/// from another assembly. `assembly_scope` is the *assembly scope name* the metadata
/// reader resolved the declaring type to — this is what system-assembly suppression
/// (spec §4.2) keys off, never the namespace string, since a mod can freely declare a
/// type named `System.Diagnostics.Process` in its own assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub declaring_type: String,
    pub name: String,
    pub assembly_scope: String,
}

impl MethodRef {
    pub fn new(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        assembly_scope: impl Into<String>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            assembly_scope: assembly_scope.into(),
        }
    }

    /// `Namespace.Type::Method` as used in the classification table and in finding
    /// descriptions.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.declaring_type, self.name)
    }
}

/// The operand resolved for an instruction, or `Unresolved` when the literal-resolution
/// walk (spec §4.2 "windowing and literal resolution") could not pin it down. Rules must
/// treat `Unresolved` as `<unknown/non-literal>` in descriptions, never guess a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    None,
    Int32(i32),
    Int64(i64),
    String(String),
    Method(MethodRef),
    Type(String),
    /// Index of a local variable slot (`ldloc`/`stloc` family).
    Local(u16),
    /// Index of an incoming argument (`ldarg` family).
    Arg(u16),
    Unresolved,
}

/// A coarse opcode classification sufficient for the rule catalogue in spec §4.3. Real
/// CIL has hundreds of opcodes; everything not named here collapses into `Other`, carried
/// so code-snippet rendering can still show the mnemonic the metadata reader reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Opcode {
    Nop,
    Ldstr,
    LdcI4,
    LdcI8,
    Ldloc,
    Stloc,
    Ldarg,
    Starg,
    Call,
    Callvirt,
    Newobj,
    ConvU2,
    ConvI4,
    Box,
    Castclass,
    Isinst,
    Ldfld,
    Stfld,
    Ldsfld,
    Stsfld,
    Pop,
    Dup,
    Ret,
    Br,
    Brtrue,
    Brfalse,
    Leave,
    Throw,
    Other(String),
}

impl Opcode {
    pub fn mnemonic(&self) -> &str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Ldstr => "ldstr",
            Opcode::LdcI4 => "ldc.i4",
            Opcode::LdcI8 => "ldc.i8",
            Opcode::Ldloc => "ldloc",
            Opcode::Stloc => "stloc",
            Opcode::Ldarg => "ldarg",
            Opcode::Starg => "starg",
            Opcode::Call => "call",
            Opcode::Callvirt => "callvirt",
            Opcode::Newobj => "newobj",
            Opcode::ConvU2 => "conv.u2",
            Opcode::ConvI4 => "conv.i4",
            Opcode::Box => "box",
            Opcode::Castclass => "castclass",
            Opcode::Isinst => "isinst",
            Opcode::Ldfld => "ldfld",
            Opcode::Stfld => "stfld",
            Opcode::Ldsfld => "ldsfld",
            Opcode::Stsfld => "stsfld",
            Opcode::Pop => "pop",
            Opcode::Dup => "dup",
            Opcode::Ret => "ret",
            Opcode::Br => "br",
            Opcode::Brtrue => "brtrue",
            Opcode::Brfalse => "brfalse",
            Opcode::Leave => "leave",
            Opcode::Throw => "throw",
            Opcode::Other(s) => s.as_str(),
        }
    }

    pub fn is_call_like(&self) -> bool {
        matches!(self, Opcode::Call | Opcode::Callvirt | Opcode::Newobj)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: Opcode,
    pub operand: Operand,
}

impl Instruction {
    pub fn new(offset: u32, opcode: Opcode, operand: Operand) -> Self {
        Self {
            offset,
            opcode,
            operand,
        }
    }

    pub fn is_string_load(&self) -> bool {
        matches!(self.opcode, Opcode::Ldstr)
    }

    pub fn as_method_ref(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_string_literal(&self) -> Option<&str> {
        match &self.operand {
            Operand::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int32(&self) -> Option<i32> {
        match &self.operand {
            Operand::Int32(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExceptionHandlerKind {
    Catch,
    Finally,
    Fault,
    Filter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionHandler {
    pub kind: ExceptionHandlerKind,
    pub try_start: u32,
    pub try_end: u32,
    pub handler_start: u32,
    pub handler_end: u32,
    pub catch_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalVariable {
    pub index: u16,
    pub type_name: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub declaring_type: String,
    pub namespace: String,
    pub is_static: bool,
    pub instructions: Vec<Instruction>,
    pub locals: Vec<LocalVariable>,
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodDef {
    /// `Namespace.Type.Method` — the location prefix used in every `Finding`.
    pub fn method_key(&self) -> String {
        format!("{}.{}.{}", self.namespace, self.declaring_type, self.name)
    }

    pub fn max_offset(&self) -> u32 {
        self.instructions.iter().map(|i| i.offset).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyAccessorKind {
    Getter,
    Setter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyAccessor {
    pub property_name: String,
    pub kind: PropertyAccessorKind,
    pub method: MethodDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHandler {
    pub event_name: String,
    pub add_method: Option<MethodDef>,
    pub remove_method: Option<MethodDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PInvokeDeclaration {
    pub method: MethodRef,
    pub native_library: String,
    pub entry_point: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomAttribute {
    pub type_name: String,
    pub string_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestResource {
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub namespace: String,
    pub assembly_scope: String,
    pub methods: Vec<MethodDef>,
    pub properties: Vec<PropertyAccessor>,
    pub events: Vec<EventHandler>,
}

impl TypeDef {
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub assembly_name: String,
    pub display_path: Option<String>,
    pub types: Vec<TypeDef>,
    pub custom_attributes: Vec<CustomAttribute>,
    pub manifest_resources: Vec<ManifestResource>,
    pub pinvoke_declarations: Vec<PInvokeDeclaration>,
    pub assembly_references: Vec<String>,
}

impl Module {
    pub fn new(assembly_name: impl Into<String>) -> Self {
        Self {
            assembly_name: assembly_name.into(),
            display_path: None,
            types: Vec::new(),
            custom_attributes: Vec::new(),
            manifest_resources: Vec::new(),
            pinvoke_declarations: Vec::new(),
            assembly_references: Vec::new(),
        }
    }
}
