//! Operand-stack type checking for instruction sequences and modules.
//!
//! <https://www.w3.org/TR/wasm-core-2/#validation>
mod edits;
mod module;

pub use edits::{StackEdit, StackInput, StackOutput, evaluate};

use crate::core::Module;
use crate::core::indices::{
    FuncIdx, GlobalIdx, IndexSpace, LabelIdx, LocalIdx, ReferenceError, TableIdx,
};
use crate::core::instruction::{BlockType, Instruction, Opcode};
use crate::core::sections::{Local, count};
use crate::core::types::{FuncType, RefType, ValType};
use edits::{OperandStack, fixed_edit, memory_access};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("stack underflow: {needed} operands needed; {available} available")]
    StackUnderflow { needed: usize, available: usize },

    #[error("type mismatch: expected [{}]; got {actual:?}", join(.expected))]
    TypeMismatch {
        expected: Vec<StackInput>,
        actual: Vec<ValType>,
    },

    #[error("result mismatch: expected {expected:?}; got {actual:?}")]
    ResultMismatch {
        expected: Vec<ValType>,
        actual: Vec<ValType>,
    },

    #[error("output refers to unbound wildcard {0}")]
    UnboundWildcard(usize),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("global {0} is immutable")]
    ImmutableGlobal(GlobalIdx),

    #[error("constant expression reads mutable global {0}")]
    MutableGlobalInConstant(GlobalIdx),

    #[error("instruction {0} is not constant")]
    NonConstant(Opcode),

    #[error("br_table targets disagree: expected {expected:?}; got {actual:?}")]
    BrTableArity {
        expected: Vec<ValType>,
        actual: Vec<ValType>,
    },

    #[error("return outside of a function body")]
    ReturnOutsideFunction,

    #[error("element type mismatch: expected {expected}; got {actual}")]
    ElementTypeMismatch { expected: ValType, actual: ValType },

    #[error("alignment 2^{align} is invalid for an access of natural alignment 2^{natural}")]
    InvalidAlignment { align: u32, natural: u32 },

    #[error("function {0} is imported and has no body")]
    NoBody(FuncIdx),

    #[error("{codes} code entries for {functions} declared functions")]
    CodeCountMismatch { codes: usize, functions: usize },

    #[error("memory of {0} pages exceeds the 65536 page limit")]
    MemoryTooLarge(u32),

    #[error("start function must have type [] -> []; got {0}")]
    StartFunctionType(FuncType),

    #[error("duplicate export name {0:?}")]
    DuplicateExport(String),

    #[error("invalid function {func}")]
    InFunction {
        func: FuncIdx,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("invalid initializer of global {global}")]
    InGlobal {
        global: GlobalIdx,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("invalid element segment {segment}")]
    InElement {
        segment: usize,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("invalid data segment {segment}")]
    InData {
        segment: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

fn join(patterns: &[StackInput]) -> String {
    patterns
        .iter()
        .map(StackInput::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Operand types left by an instruction sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeStack {
    /// Operands of unknown type, left by unreachable code, are omitted.
    pub types: Vec<ValType>,
    /// Set once control left the sequence unconditionally. The remaining
    /// instructions were checked against a polymorphic stack.
    pub unreachable: bool,
}

impl TypeStack {
    fn of(stack: OperandStack) -> Self {
        let unreachable = stack.is_polymorphic();
        Self {
            types: stack.into_types(),
            unreachable,
        }
    }
}

#[derive(PartialEq, Eq)]
enum Flow {
    Continue,
    Unreachable,
}

/// Everything the edit of a context-dependent instruction depends on.
#[derive(Debug, Clone)]
pub struct FuncContext<'m> {
    module: &'m Module,
    /// Parameters and declared locals, as runs of one type.
    locals: Vec<Local>,
    /// `None` outside a function body.
    results: Option<Vec<ValType>>,
    /// Globals a constant expression may read; `None` for function bodies.
    constant: Option<u32>,
}

impl<'m> FuncContext<'m> {
    pub fn new(module: &'m Module, locals: Vec<ValType>, results: Vec<ValType>) -> Self {
        Self {
            module,
            locals: locals.into_iter().map(|t| Local { count: 1, t }).collect(),
            results: Some(results),
            constant: None,
        }
    }

    /// Context of a function defined by `module`: parameters followed by the
    /// declared locals.
    pub fn for_function(module: &'m Module, func: FuncIdx) -> Result<Self, ValidationError> {
        let ft = module.func_type(func)?;
        let imported = module.imports.count(IndexSpace::Func);
        let code = func
            .0
            .checked_sub(imported)
            .and_then(|i| module.codes.get(i as usize))
            .ok_or(ValidationError::NoBody(func))?;

        let mut ctx = Self::new(module, ft.parameters.clone(), ft.results.clone());
        ctx.locals.extend_from_slice(&code.locals);
        Ok(ctx)
    }

    /// Context of a constant expression that may read the first `globals`
    /// globals.
    pub fn constant(module: &'m Module, globals: u32) -> Self {
        Self {
            module,
            locals: Vec::new(),
            results: None,
            constant: Some(globals),
        }
    }

    fn base_labels(&self) -> Vec<Vec<ValType>> {
        self.results.iter().cloned().collect()
    }

    fn local(&self, l: LocalIdx) -> Result<ValType, ValidationError> {
        let mut end = 0u64;
        for run in &self.locals {
            end += u64::from(run.count);
            if u64::from(l.0) < end {
                return Ok(run.t);
            }
        }
        Err(ReferenceError {
            space: IndexSpace::Local,
            index: l.0,
            len: u32::try_from(end).unwrap_or(u32::MAX),
        }
        .into())
    }

    /// Applies one instruction to `stack`, as the first instruction of the
    /// function body.
    pub fn evaluate(
        &self,
        stack: &[ValType],
        instr: &Instruction,
    ) -> Result<TypeStack, ValidationError> {
        let mut operands = OperandStack::new(stack);
        if self.step(instr, &mut operands, &mut self.base_labels())? == Flow::Unreachable {
            operands.set_unreachable();
        }
        Ok(TypeStack::of(operands))
    }

    /// Folds [`Self::evaluate`] over `instrs`, stopping at the first error.
    pub fn resolve_stack(
        &self,
        instrs: &[Instruction],
        initial: Vec<ValType>,
    ) -> Result<TypeStack, ValidationError> {
        self.run(instrs, &initial, &mut self.base_labels()).map(TypeStack::of)
    }

    /// Checks that `instrs` turns `params` into exactly `results`. After an
    /// unconditional branch the missing bottom operands count as matching.
    pub fn check_stack(
        &self,
        instrs: &[Instruction],
        params: &[ValType],
        results: &[ValType],
    ) -> Result<(), ValidationError> {
        self.check(instrs, params, results, &mut self.base_labels())
    }

    /// Like [`Self::resolve_stack`], discarding the error.
    pub fn probe_stack(&self, instrs: &[Instruction], initial: Vec<ValType>) -> Option<TypeStack> {
        self.resolve_stack(instrs, initial).ok()
    }

    fn run(
        &self,
        instrs: &[Instruction],
        initial: &[ValType],
        labels: &mut Vec<Vec<ValType>>,
    ) -> Result<OperandStack, ValidationError> {
        let mut operands = OperandStack::new(initial);
        for instr in instrs {
            if self.step(instr, &mut operands, labels)? == Flow::Unreachable {
                operands.set_unreachable();
            }
        }
        Ok(operands)
    }

    fn check(
        &self,
        instrs: &[Instruction],
        params: &[ValType],
        results: &[ValType],
        labels: &mut Vec<Vec<ValType>>,
    ) -> Result<(), ValidationError> {
        self.run(instrs, params, labels)?.finish(results)
    }

    /// Checks a nested body under one more label.
    fn enter(
        &self,
        body: &[Instruction],
        sig: &FuncType,
        label: &[ValType],
        labels: &mut Vec<Vec<ValType>>,
    ) -> Result<(), ValidationError> {
        labels.push(label.to_vec());
        let checked = self.check(body, &sig.parameters, &sig.results, labels);
        labels.pop();
        checked
    }

    fn label(&self, l: LabelIdx, labels: &[Vec<ValType>]) -> Result<Vec<ValType>, ValidationError> {
        let depth = l.resolve(count(labels.len()))?;
        Ok(labels[labels.len() - 1 - depth].clone())
    }

    fn table_elem(&self, table: TableIdx) -> Result<ValType, ValidationError> {
        Ok(self.module.table_type(table)?.elem_type())
    }

    fn step(
        &self,
        instr: &Instruction,
        stack: &mut OperandStack,
        labels: &mut Vec<Vec<ValType>>,
    ) -> Result<Flow, ValidationError> {
        use Instruction::*;
        use ValType::I32;

        if self.constant.is_some() && !instr.is_constant() {
            return Err(ValidationError::NonConstant(instr.opcode()));
        }

        if let (Some((edit, natural)), Some(memarg)) = (memory_access(instr), instr.memarg()) {
            self.module.memory_type(memarg.memory)?;
            let atomic = matches!(instr.opcode(), Opcode::Atomic(_));
            if memarg.align > natural || (atomic && memarg.align != natural) {
                return Err(ValidationError::InvalidAlignment {
                    align: memarg.align,
                    natural,
                });
            }
            edit.apply_to(stack)?;
            return Ok(Flow::Continue);
        }

        if let Some(edit) = fixed_edit(instr) {
            edit.apply_to(stack)?;
            return Ok(Flow::Continue);
        }

        let edit = match instr {
            Unreachable => return Ok(Flow::Unreachable),

            Block(bt, body) => {
                let sig = self.module.block_signature(*bt)?;
                StackEdit::fixed(&sig.parameters, &[]).apply_to(stack)?;
                self.enter(body, &sig, &sig.results, labels)?;
                StackEdit::fixed(&[], &sig.results)
            }
            Loop(bt, body) => {
                let sig = self.module.block_signature(*bt)?;
                StackEdit::fixed(&sig.parameters, &[]).apply_to(stack)?;
                self.enter(body, &sig, &sig.parameters, labels)?;
                StackEdit::fixed(&[], &sig.results)
            }
            If(bt, then, els) => {
                let sig = self.module.block_signature(*bt)?;
                let mut inputs = sig.parameters.clone();
                inputs.push(I32);
                StackEdit::fixed(&inputs, &[]).apply_to(stack)?;
                self.enter(then, &sig, &sig.results, labels)?;
                match els {
                    Some(els) => self.enter(els, &sig, &sig.results, labels)?,
                    None if sig.parameters != sig.results => {
                        return Err(ValidationError::ResultMismatch {
                            expected: sig.results.clone(),
                            actual: sig.parameters.clone(),
                        });
                    }
                    None => {}
                }
                StackEdit::fixed(&[], &sig.results)
            }

            Br(l) => {
                let types = self.label(*l, labels)?;
                StackEdit::fixed(&types, &[]).apply_to(stack)?;
                return Ok(Flow::Unreachable);
            }
            BrIf(l) => {
                let types = self.label(*l, labels)?;
                let mut inputs = types.clone();
                inputs.push(I32);
                StackEdit::fixed(&inputs, &types)
            }
            BrTable(ls, default) => {
                let expected = self.label(*default, labels)?;
                for l in ls {
                    let actual = self.label(*l, labels)?;
                    if actual != expected {
                        return Err(ValidationError::BrTableArity { expected, actual });
                    }
                }
                let mut inputs = expected;
                inputs.push(I32);
                StackEdit::fixed(&inputs, &[]).apply_to(stack)?;
                return Ok(Flow::Unreachable);
            }
            Return => {
                let results = self
                    .results
                    .as_ref()
                    .ok_or(ValidationError::ReturnOutsideFunction)?;
                StackEdit::fixed(results, &[]).apply_to(stack)?;
                return Ok(Flow::Unreachable);
            }

            Call(f) => {
                let ft = self.module.func_type(*f)?;
                StackEdit::fixed(&ft.parameters, &ft.results)
            }
            CallIndirect(t, table) => {
                let elem = self.table_elem(*table)?;
                if elem != ValType::FuncRef {
                    return Err(ValidationError::ElementTypeMismatch {
                        expected: ValType::FuncRef,
                        actual: elem,
                    });
                }
                let ft = self.module.types.resolve(*t)?;
                let mut inputs = ft.parameters.clone();
                inputs.push(I32);
                StackEdit::fixed(&inputs, &ft.results)
            }
            RefFunc(f) => {
                self.module.func_type(*f)?;
                StackEdit::fixed(&[], &[RefType::Func.into()])
            }

            LocalGet(l) | LocalSet(l) | LocalTee(l) => {
                let t = self.local(*l)?;
                match instr {
                    LocalGet(_) => StackEdit::fixed(&[], &[t]),
                    LocalSet(_) => StackEdit::fixed(&[t], &[]),
                    _ => StackEdit::fixed(&[t], &[t]),
                }
            }
            GlobalGet(g) => {
                let gt = self.module.global_type(*g)?;
                if let Some(visible) = self.constant {
                    g.resolve(visible)?;
                    if gt.is_mutable() {
                        return Err(ValidationError::MutableGlobalInConstant(*g));
                    }
                }
                StackEdit::fixed(&[], &[gt.valtype()])
            }
            GlobalSet(g) => {
                let gt = self.module.global_type(*g)?;
                if !gt.is_mutable() {
                    return Err(ValidationError::ImmutableGlobal(*g));
                }
                StackEdit::fixed(&[gt.valtype()], &[])
            }

            TableGet(t) => StackEdit::fixed(&[I32], &[self.table_elem(*t)?]),
            TableSet(t) => StackEdit::fixed(&[I32, self.table_elem(*t)?], &[]),
            TableSize(t) => {
                self.table_elem(*t)?;
                StackEdit::fixed(&[], &[I32])
            }
            TableGrow(t) => StackEdit::fixed(&[self.table_elem(*t)?, I32], &[I32]),
            TableFill(t) => StackEdit::fixed(&[I32, self.table_elem(*t)?, I32], &[]),
            TableInit(t, e) => {
                let expected = self.table_elem(*t)?;
                let actual = self.module.elem_type(*e)?;
                if expected != actual {
                    return Err(ValidationError::ElementTypeMismatch { expected, actual });
                }
                StackEdit::fixed(&[I32, I32, I32], &[])
            }
            TableCopy(dst, src) => {
                let expected = self.table_elem(*dst)?;
                let actual = self.table_elem(*src)?;
                if expected != actual {
                    return Err(ValidationError::ElementTypeMismatch { expected, actual });
                }
                StackEdit::fixed(&[I32, I32, I32], &[])
            }
            ElemDrop(e) => {
                self.module.elem_type(*e)?;
                StackEdit::default()
            }

            MemorySize(m) => {
                self.module.memory_type(*m)?;
                StackEdit::fixed(&[], &[I32])
            }
            MemoryGrow(m) => {
                self.module.memory_type(*m)?;
                StackEdit::fixed(&[I32], &[I32])
            }
            MemoryFill(m) => {
                self.module.memory_type(*m)?;
                StackEdit::fixed(&[I32, I32, I32], &[])
            }
            MemoryCopy(dst, src) => {
                self.module.memory_type(*dst)?;
                self.module.memory_type(*src)?;
                StackEdit::fixed(&[I32, I32, I32], &[])
            }
            MemoryInit(m, d) => {
                self.module.memory_type(*m)?;
                d.resolve(count(self.module.datas.len()))?;
                StackEdit::fixed(&[I32, I32, I32], &[])
            }
            DataDrop(d) => {
                d.resolve(count(self.module.datas.len()))?;
                StackEdit::default()
            }

            // every remaining instruction has a fixed edit or a memarg
            other => return Err(ValidationError::NonConstant(other.opcode())),
        };

        edit.apply_to(stack)?;
        Ok(Flow::Continue)
    }
}

/// The block type under which `body`, starting from an empty stack, is
/// valid as a block inside a function with the given locals and results.
///
/// More than one result interns a signature in the Type section of
/// `module`. Branches to the block itself are taken to carry no values.
/// Returns `None` if the body does not type-check or leaves an operand of
/// unknown type.
pub fn infer_block_type(
    module: &mut Module,
    locals: &[ValType],
    results: &[ValType],
    body: &[Instruction],
) -> Option<BlockType> {
    let end = {
        let ctx = FuncContext::new(module, locals.to_vec(), results.to_vec());
        let mut labels = ctx.base_labels();
        labels.push(Vec::new());
        ctx.run(body, &[], &mut labels).ok()?.known_types()?
    };

    Some(match end.as_slice() {
        [] => BlockType::Empty,
        [t] => BlockType::Value(*t),
        many => BlockType::Type(module.add_type(&FuncType::new([], many.iter().copied()))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::{LocalIdx, TypeIdx};
    use crate::core::instruction::Ieee64;
    use crate::core::types::{GlobalType, Limits, Mut, TableType};
    use pretty_assertions::assert_eq;
    use ValType::*;

    fn module() -> Module {
        let mut module = Module::new();
        module.add_global(GlobalType(Mut::Const, I32), vec![Instruction::I32Const(1)]);
        module
    }

    #[test]
    fn resolve_stack_folds_instructions() {
        let module = module();
        let ctx = FuncContext::new(&module, vec![I64], vec![]);
        let end = ctx
            .resolve_stack(
                &[
                    Instruction::LocalGet(LocalIdx(0)),
                    Instruction::I32WrapI64,
                    Instruction::GlobalGet(GlobalIdx(0)),
                    Instruction::I32Add,
                ],
                vec![],
            )
            .unwrap();
        assert_eq!(end.types, vec![I32]);
        assert!(!end.unreachable);
    }

    #[test]
    fn block_results_must_match() {
        let module = module();
        let ctx = FuncContext::new(&module, vec![], vec![I32]);

        let body = [Instruction::Block(
            BlockType::Value(I32),
            vec![Instruction::I64Const(1)],
        )];
        match ctx.check_stack(&body, &[], &[I32]).unwrap_err() {
            ValidationError::ResultMismatch { expected, actual } => {
                assert_eq!(expected, vec![I32]);
                assert_eq!(actual, vec![I64]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let body = [Instruction::Block(
            BlockType::Value(I32),
            vec![Instruction::I32Const(1)],
        )];
        ctx.check_stack(&body, &[], &[I32]).unwrap();
    }

    #[test]
    fn unreachable_code_pops_unknown_operands() {
        let module = module();
        let ctx = FuncContext::new(&module, vec![], vec![I32]);

        let body = [Instruction::Unreachable, Instruction::I32Add];
        ctx.check_stack(&body, &[], &[I32]).unwrap();

        let body = [Instruction::Unreachable, Instruction::Select(None)];
        ctx.check_stack(&body, &[], &[I32]).unwrap();
        let end = ctx.probe_stack(&body, vec![]).unwrap();
        assert!(end.unreachable);
        assert!(end.types.is_empty());

        let body = [
            Instruction::Unreachable,
            Instruction::I64Const(1),
            Instruction::I32Const(0),
            Instruction::Select(None),
        ];
        match ctx.check_stack(&body, &[], &[I32]).unwrap_err() {
            ValidationError::ResultMismatch { actual, .. } => assert_eq!(actual, vec![I64]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unreachable_code_is_still_type_checked() {
        let module = module();
        let ctx = FuncContext::new(&module, vec![], vec![I32]);

        let body = [
            Instruction::Unreachable,
            Instruction::I64Const(0),
            Instruction::I32Add,
        ];
        match ctx.check_stack(&body, &[], &[I32]).unwrap_err() {
            ValidationError::TypeMismatch { actual, .. } => assert_eq!(actual, vec![I64]),
            other => panic!("unexpected error: {other:?}"),
        }

        let body = [
            Instruction::I32Const(7),
            Instruction::Return,
            Instruction::F32Add,
        ];
        match ctx.check_stack(&body, &[], &[I32]).unwrap_err() {
            ValidationError::ResultMismatch { actual, .. } => assert_eq!(actual, vec![F32]),
            other => panic!("unexpected error: {other:?}"),
        }

        let body = [
            Instruction::I32Const(0),
            Instruction::Br(LabelIdx(0)),
            Instruction::I32Const(1),
            Instruction::I32Const(2),
        ];
        assert!(matches!(
            ctx.check_stack(&body, &[], &[I32]),
            Err(ValidationError::ResultMismatch { .. })
        ));
    }

    #[test]
    fn unreachable_blocks_leave_the_outer_stack_alone() {
        let module = module();
        let ctx = FuncContext::new(&module, vec![], vec![I32]);
        let body = [
            Instruction::Block(BlockType::Empty, vec![Instruction::Unreachable]),
            Instruction::I32Add,
        ];
        assert_eq!(
            ctx.check_stack(&body, &[], &[I32]),
            Err(ValidationError::StackUnderflow {
                needed: 2,
                available: 0
            })
        );
    }

    #[test]
    fn locals_are_looked_up_through_their_runs() {
        let mut module = module();
        let t = module.add_type(&FuncType::new([F32], []));
        let f = module
            .add_function(
                t,
                vec![Local {
                    count: u32::MAX,
                    t: I64,
                }],
                vec![
                    Instruction::LocalGet(LocalIdx(u32::MAX)),
                    Instruction::LocalGet(LocalIdx(0)),
                    Instruction::Drop,
                    Instruction::Drop,
                ],
            )
            .unwrap();
        let ctx = FuncContext::for_function(&module, f).unwrap();
        assert_eq!(
            ctx.resolve_stack(&[Instruction::LocalGet(LocalIdx(u32::MAX))], vec![])
                .unwrap()
                .types,
            vec![I64]
        );
        module.validate().unwrap();

        let ctx = FuncContext::new(&module, vec![I32], vec![]);
        assert_eq!(
            ctx.evaluate(&[], &Instruction::LocalGet(LocalIdx(1))),
            Err(ValidationError::Reference(ReferenceError {
                space: IndexSpace::Local,
                index: 1,
                len: 1
            }))
        );
    }

    #[test]
    fn branches_carry_label_types() {
        let module = module();
        let ctx = FuncContext::new(&module, vec![], vec![]);
        let body = [Instruction::Block(
            BlockType::Value(I64),
            vec![
                Instruction::I64Const(1),
                Instruction::I32Const(0),
                Instruction::BrIf(LabelIdx(0)),
            ],
        )];
        assert_eq!(ctx.resolve_stack(&body, vec![]).unwrap().types, vec![I64]);

        let body = [Instruction::Br(LabelIdx(1))];
        assert!(matches!(
            ctx.resolve_stack(&body, vec![]),
            Err(ValidationError::Reference(_))
        ));
    }

    #[test]
    fn if_without_else_must_not_change_the_stack_type() {
        let module = module();
        let ctx = FuncContext::new(&module, vec![], vec![]);
        let body = [
            Instruction::I32Const(1),
            Instruction::If(BlockType::Value(I32), vec![Instruction::I32Const(2)], None),
        ];
        assert!(matches!(
            ctx.resolve_stack(&body, vec![]),
            Err(ValidationError::ResultMismatch { .. })
        ));
    }

    #[test]
    fn immutable_globals_cannot_be_set() {
        let module = module();
        let ctx = FuncContext::new(&module, vec![], vec![]);
        assert_eq!(
            ctx.evaluate(&[I32], &Instruction::GlobalSet(GlobalIdx(0))),
            Err(ValidationError::ImmutableGlobal(GlobalIdx(0)))
        );
    }

    #[test]
    fn constant_context_rejects_other_instructions() {
        let module = module();
        let ctx = FuncContext::constant(&module, 1);
        assert_eq!(
            ctx.resolve_stack(&[Instruction::GlobalGet(GlobalIdx(0))], vec![])
                .unwrap()
                .types,
            vec![I32]
        );
        assert!(matches!(
            ctx.resolve_stack(
                &[Instruction::I32Const(1), Instruction::I32Const(1), Instruction::I32Add],
                vec![]
            ),
            Err(ValidationError::NonConstant(_))
        ));

        let ctx = FuncContext::constant(&module, 0);
        assert!(matches!(
            ctx.resolve_stack(&[Instruction::GlobalGet(GlobalIdx(0))], vec![]),
            Err(ValidationError::Reference(_))
        ));
    }

    #[test]
    fn call_indirect_needs_a_funcref_table() {
        let mut module = module();
        let t = module.add_type(&FuncType::new([], []));
        module.add_table(TableType {
            reftype: RefType::Extern,
            limits: Limits::at_least(1),
        });
        let ctx = FuncContext::new(&module, vec![], vec![]);
        assert_eq!(
            ctx.evaluate(&[I32], &Instruction::CallIndirect(t, TableIdx(0))),
            Err(ValidationError::ElementTypeMismatch {
                expected: FuncRef,
                actual: ExternRef
            })
        );
    }

    #[test]
    fn block_types_are_inferred_from_the_body() {
        let mut module = module();
        let body = [Instruction::I32Const(1)];
        assert_eq!(
            infer_block_type(&mut module, &[], &[], &body),
            Some(BlockType::Value(I32))
        );
        assert_eq!(
            infer_block_type(&mut module, &[], &[], &[]),
            Some(BlockType::Empty)
        );

        let body = [Instruction::I32Const(1), Instruction::F64Const(Ieee64::from(2.0))];
        let inferred = infer_block_type(&mut module, &[], &[], &body);
        assert_eq!(inferred, Some(BlockType::Type(TypeIdx(0))));
        assert_eq!(module.types.entries(), [FuncType::new([], [I32, F64])]);

        assert_eq!(
            infer_block_type(&mut module, &[], &[], &[Instruction::I32Add]),
            None
        );
    }
}
