use crate::core::indices::{FuncIdx, GlobalIdx, IndexSpace};
use crate::core::sections::{DataMode, Elem, ElemInit, ElemMode, ExportDesc, ImportDesc, count};
use crate::core::types::{MemType, ValType};
use crate::core::{Expr, Module};
use crate::validate::{FuncContext, ValidationError};
use log::debug;
use std::collections::HashSet;

fn check_memory(mem: &MemType) -> Result<(), ValidationError> {
    match mem.oversized_bound() {
        Some(pages) => Err(ValidationError::MemoryTooLarge(pages)),
        None => Ok(()),
    }
}

fn check_constant(
    module: &Module,
    globals: u32,
    expr: &Expr,
    expected: ValType,
) -> Result<(), ValidationError> {
    FuncContext::constant(module, globals).check_stack(expr, &[], &[expected])
}

impl Module {
    /// Type checks every function body, initializer and segment of the
    /// module, along with the module-level rules on imports, exports and the
    /// start function.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.codes.len() != self.functions.len() {
            return Err(ValidationError::CodeCountMismatch {
                codes: self.codes.len(),
                functions: self.functions.len(),
            });
        }

        for import in &self.imports {
            match &import.desc {
                ImportDesc::Func(t) => {
                    self.types.resolve(*t)?;
                }
                ImportDesc::Mem(m) => check_memory(m)?,
                ImportDesc::Table(_) | ImportDesc::Global(_) => {}
            }
        }
        for t in &self.functions {
            self.types.resolve(*t)?;
        }
        for m in &self.memories {
            check_memory(m)?;
        }

        let imported_globals = self.imports.count(IndexSpace::Global);
        for (i, global) in self.globals.iter().enumerate() {
            let idx = imported_globals + count(i);
            check_constant(self, idx, &global.init, global.r#type.valtype()).map_err(|e| {
                ValidationError::InGlobal {
                    global: GlobalIdx(idx),
                    source: Box::new(e),
                }
            })?;
        }

        // segment expressions only see imported globals
        for (segment, elem) in self.elements.iter().enumerate() {
            self.validate_elem(imported_globals, elem)
                .map_err(|e| ValidationError::InElement {
                    segment,
                    source: Box::new(e),
                })?;
        }
        for (segment, data) in self.datas.iter().enumerate() {
            if let DataMode::Active { memory, offset } = &data.mode {
                self.memory_type(*memory)
                    .map_err(ValidationError::from)
                    .and_then(|_| check_constant(self, imported_globals, offset, ValType::I32))
                    .map_err(|e| ValidationError::InData {
                        segment,
                        source: Box::new(e),
                    })?;
            }
        }

        let imported_funcs = self.imports.count(IndexSpace::Func);
        for i in 0..self.codes.len() {
            let func = FuncIdx(imported_funcs + count(i));
            self.validate_function(func)
                .map_err(|e| ValidationError::InFunction {
                    func,
                    source: Box::new(e),
                })?;
        }
        debug!("validated {} function bodies", self.codes.len());

        if let Some(start) = self.start.function {
            let ft = self.func_type(start)?;
            if !ft.parameters.is_empty() || !ft.results.is_empty() {
                return Err(ValidationError::StartFunctionType(ft.clone()));
            }
        }

        let mut names = HashSet::new();
        for export in &self.exports {
            if !names.insert(export.name.as_str()) {
                return Err(ValidationError::DuplicateExport(export.name.clone()));
            }
            match export.desc {
                ExportDesc::Func(f) => self.func_type(f).map(drop),
                ExportDesc::Table(t) => self.table_type(t).map(drop),
                ExportDesc::Mem(m) => self.memory_type(m).map(drop),
                ExportDesc::Global(g) => self.global_type(g).map(drop),
            }?;
        }

        Ok(())
    }

    fn validate_function(&self, func: FuncIdx) -> Result<(), ValidationError> {
        let ctx = FuncContext::for_function(self, func)?;
        let ft = self.func_type(func)?;
        let imported = self.imports.count(IndexSpace::Func);
        let code = self
            .codes
            .get((func.0 - imported) as usize)
            .ok_or(ValidationError::NoBody(func))?;
        ctx.check_stack(&code.body, &[], &ft.results)
    }

    fn validate_elem(&self, globals: u32, elem: &Elem) -> Result<(), ValidationError> {
        let expected = ValType::from(elem.r#type);
        match &elem.init {
            ElemInit::Functions(funcs) => {
                if expected != ValType::FuncRef {
                    return Err(ValidationError::ElementTypeMismatch {
                        expected,
                        actual: ValType::FuncRef,
                    });
                }
                for f in funcs {
                    self.func_type(*f)?;
                }
            }
            ElemInit::Expressions(exprs) => {
                for expr in exprs {
                    check_constant(self, globals, expr, expected)?;
                }
            }
        }

        if let ElemMode::Active { table, offset } = &elem.mode {
            let actual = self.table_type(*table)?.elem_type();
            if actual != expected {
                return Err(ValidationError::ElementTypeMismatch { expected, actual });
            }
            check_constant(self, globals, offset, ValType::I32)?;
        }

        Ok(())
    }
}
