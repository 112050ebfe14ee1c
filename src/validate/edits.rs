//! Stack edits: the operand types an instruction pops and pushes.
use crate::core::instruction::Instruction;
use crate::core::types::ValType;
use crate::validate::ValidationError;
use std::cmp::Ordering;
use std::fmt;

/// Pattern for one popped operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackInput {
    Type(ValType),
    /// Any type; captured for later reference.
    Wildcard,
    /// Any reference type; captured like [`StackInput::Wildcard`].
    AnyRef,
    /// Same type as the given capture.
    SameAs(usize),
}

impl fmt::Display for StackInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackInput::Type(t) => t.fmt(f),
            StackInput::Wildcard => f.write_str("_"),
            StackInput::AnyRef => f.write_str("ref"),
            StackInput::SameAs(i) => write!(f, "${i}"),
        }
    }
}

/// Pattern for one pushed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackOutput {
    Type(ValType),
    /// The type bound by the given capture.
    WildcardRef(usize),
}

/// The `(inputs, outputs)` contract of one instruction. The last input
/// matches the top of the stack.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackEdit {
    pub inputs: Vec<StackInput>,
    pub outputs: Vec<StackOutput>,
}

impl StackEdit {
    /// An edit over concrete types only.
    pub fn fixed(inputs: &[ValType], outputs: &[ValType]) -> Self {
        Self {
            inputs: inputs.iter().copied().map(StackInput::Type).collect(),
            outputs: outputs.iter().copied().map(StackOutput::Type).collect(),
        }
    }

    /// Pops the inputs off `stack`, matching them left to right, and pushes
    /// the outputs.
    pub fn apply(&self, stack: &mut Vec<ValType>) -> Result<(), ValidationError> {
        let mut operands = OperandStack::new(stack);
        self.apply_to(&mut operands)?;
        *stack = operands.into_types();
        Ok(())
    }

    pub(crate) fn apply_to(&self, stack: &mut OperandStack) -> Result<(), ValidationError> {
        let needed = self.inputs.len();
        let available = stack.slots.len();
        if available < needed && !stack.polymorphic {
            return Err(ValidationError::StackUnderflow { needed, available });
        }

        // operands popped from below an unreachable frame are unknown
        let base = available.saturating_sub(needed);
        let mut popped = vec![None; needed - (available - base)];
        popped.extend(stack.slots.drain(base..));

        let mut captured: Vec<Option<ValType>> = Vec::new();
        for (pattern, &actual) in self.inputs.iter().zip(&popped) {
            let matched = match pattern {
                StackInput::Type(t) => actual.is_none_or(|a| a == *t),
                StackInput::Wildcard => {
                    captured.push(actual);
                    true
                }
                StackInput::AnyRef => {
                    captured.push(actual);
                    actual.is_none_or(ValType::is_ref)
                }
                StackInput::SameAs(i) => match captured.get_mut(*i) {
                    Some(bound @ None) => {
                        *bound = actual;
                        true
                    }
                    Some(Some(bound)) => actual.is_none_or(|a| a == *bound),
                    None => false,
                },
            };
            if !matched {
                return Err(ValidationError::TypeMismatch {
                    expected: self.inputs.clone(),
                    actual: popped.iter().flatten().copied().collect(),
                });
            }
        }

        for output in &self.outputs {
            let slot = match output {
                StackOutput::Type(t) => Some(*t),
                StackOutput::WildcardRef(i) => *captured
                    .get(*i)
                    .ok_or(ValidationError::UnboundWildcard(*i))?,
            };
            stack.slots.push(slot);
        }

        Ok(())
    }
}

/// Operands of one instruction sequence under validation.
///
/// Once control leaves the sequence unconditionally the stack turns
/// polymorphic: popping past its bottom yields operands of unknown type,
/// held as `None`, which match any pattern.
#[derive(Debug, Clone)]
pub(crate) struct OperandStack {
    slots: Vec<Option<ValType>>,
    polymorphic: bool,
}

impl OperandStack {
    pub(crate) fn new(types: &[ValType]) -> Self {
        Self {
            slots: types.iter().copied().map(Some).collect(),
            polymorphic: false,
        }
    }

    pub(crate) fn is_polymorphic(&self) -> bool {
        self.polymorphic
    }

    /// Drops every operand; the rest of the sequence is unreachable.
    pub(crate) fn set_unreachable(&mut self) {
        self.slots.clear();
        self.polymorphic = true;
    }

    /// The operand types, if none is unknown.
    pub(crate) fn known_types(&self) -> Option<Vec<ValType>> {
        self.slots.iter().copied().collect()
    }

    /// The operand types, leaving out unknown ones.
    pub(crate) fn into_types(self) -> Vec<ValType> {
        self.slots.into_iter().flatten().collect()
    }

    /// Checks that the stack holds exactly `results`. A polymorphic stack
    /// may hold fewer, standing in for the missing bottom operands.
    pub(crate) fn finish(self, results: &[ValType]) -> Result<(), ValidationError> {
        let height = self.slots.len();
        let fits = match height.cmp(&results.len()) {
            Ordering::Equal => true,
            Ordering::Less => self.polymorphic,
            Ordering::Greater => false,
        };
        if fits
            && self
                .slots
                .iter()
                .zip(&results[results.len() - height.min(results.len())..])
                .all(|(slot, t)| slot.is_none_or(|s| s == *t))
        {
            Ok(())
        } else {
            Err(ValidationError::ResultMismatch {
                expected: results.to_vec(),
                actual: self.into_types(),
            })
        }
    }
}

/// Evaluates `edit` on a copy of `stack`.
pub fn evaluate(stack: &[ValType], edit: &StackEdit) -> Result<Vec<ValType>, ValidationError> {
    let mut next = stack.to_vec();
    edit.apply(&mut next)?;
    Ok(next)
}

/// The edit of an instruction whose operand types do not depend on the
/// module or the enclosing function.
pub(crate) fn fixed_edit(instr: &Instruction) -> Option<StackEdit> {
    use Instruction::*;
    use ValType::*;

    let unop = |t: ValType| StackEdit::fixed(&[t], &[t]);
    let binop = |t: ValType| StackEdit::fixed(&[t, t], &[t]);
    let relop = |t: ValType| StackEdit::fixed(&[t, t], &[I32]);
    let cvtop = |from: ValType, to: ValType| StackEdit::fixed(&[from], &[to]);

    Some(match instr {
        Nop => StackEdit::default(),

        Drop => StackEdit {
            inputs: vec![StackInput::Wildcard],
            outputs: vec![],
        },
        Select(None) => StackEdit {
            inputs: vec![
                StackInput::Wildcard,
                StackInput::SameAs(0),
                StackInput::Type(I32),
            ],
            outputs: vec![StackOutput::WildcardRef(0)],
        },
        Select(Some(t)) => StackEdit::fixed(&[*t, *t, I32], &[*t]),

        RefNull(t) => StackEdit::fixed(&[], &[ValType::from(*t)]),
        RefIsNull => StackEdit {
            inputs: vec![StackInput::AnyRef],
            outputs: vec![StackOutput::Type(I32)],
        },

        I32Const(_) => StackEdit::fixed(&[], &[I32]),
        I64Const(_) => StackEdit::fixed(&[], &[I64]),
        F32Const(_) => StackEdit::fixed(&[], &[F32]),
        F64Const(_) => StackEdit::fixed(&[], &[F64]),

        I32Eqz => cvtop(I32, I32),
        I64Eqz => cvtop(I64, I32),
        I32Eq | I32Ne | I32LtS | I32LtU | I32GtS | I32GtU | I32LeS | I32LeU | I32GeS | I32GeU => {
            relop(I32)
        }
        I64Eq | I64Ne | I64LtS | I64LtU | I64GtS | I64GtU | I64LeS | I64LeU | I64GeS | I64GeU => {
            relop(I64)
        }
        F32Eq | F32Ne | F32Lt | F32Gt | F32Le | F32Ge => relop(F32),
        F64Eq | F64Ne | F64Lt | F64Gt | F64Le | F64Ge => relop(F64),

        I32Clz | I32Ctz | I32Popcnt | I32Extend8S | I32Extend16S => unop(I32),
        I64Clz | I64Ctz | I64Popcnt | I64Extend8S | I64Extend16S | I64Extend32S => unop(I64),
        F32Abs | F32Neg | F32Ceil | F32Floor | F32Trunc | F32Nearest | F32Sqrt => unop(F32),
        F64Abs | F64Neg | F64Ceil | F64Floor | F64Trunc | F64Nearest | F64Sqrt => unop(F64),

        I32Add | I32Sub | I32Mul | I32DivS | I32DivU | I32RemS | I32RemU | I32And | I32Or
        | I32Xor | I32Shl | I32ShrS | I32ShrU | I32Rotl | I32Rotr => binop(I32),
        I64Add | I64Sub | I64Mul | I64DivS | I64DivU | I64RemS | I64RemU | I64And | I64Or
        | I64Xor | I64Shl | I64ShrS | I64ShrU | I64Rotl | I64Rotr => binop(I64),
        F32Add | F32Sub | F32Mul | F32Div | F32Min | F32Max | F32Copysign => binop(F32),
        F64Add | F64Sub | F64Mul | F64Div | F64Min | F64Max | F64Copysign => binop(F64),

        I32WrapI64 => cvtop(I64, I32),
        I32TruncF32S | I32TruncF32U | I32TruncSatF32S | I32TruncSatF32U | I32ReinterpretF32 => {
            cvtop(F32, I32)
        }
        I32TruncF64S | I32TruncF64U | I32TruncSatF64S | I32TruncSatF64U => cvtop(F64, I32),
        I64ExtendI32S | I64ExtendI32U => cvtop(I32, I64),
        I64TruncF32S | I64TruncF32U | I64TruncSatF32S | I64TruncSatF32U => cvtop(F32, I64),
        I64TruncF64S | I64TruncF64U | I64TruncSatF64S | I64TruncSatF64U | I64ReinterpretF64 => {
            cvtop(F64, I64)
        }
        F32ConvertI32S | F32ConvertI32U | F32ReinterpretI32 => cvtop(I32, F32),
        F32ConvertI64S | F32ConvertI64U => cvtop(I64, F32),
        F32DemoteF64 => cvtop(F64, F32),
        F64ConvertI32S | F64ConvertI32U => cvtop(I32, F64),
        F64ConvertI64S | F64ConvertI64U | F64ReinterpretI64 => cvtop(I64, F64),
        F64PromoteF32 => cvtop(F32, F64),

        AtomicFence => StackEdit::default(),

        _ => return memory_access(instr).map(|(edit, _)| edit),
    })
}

/// The edit and natural alignment exponent of a load, store or atomic
/// access.
pub(crate) fn memory_access(instr: &Instruction) -> Option<(StackEdit, u32)> {
    use Instruction::*;
    use ValType::*;

    let load = |t: ValType, align: u32| (StackEdit::fixed(&[I32], &[t]), align);
    let store = |t: ValType, align: u32| (StackEdit::fixed(&[I32, t], &[]), align);
    let rmw = |t: ValType, align: u32| (StackEdit::fixed(&[I32, t], &[t]), align);
    let cmpxchg = |t: ValType, align: u32| (StackEdit::fixed(&[I32, t, t], &[t]), align);

    Some(match instr {
        I32Load(_) | I32AtomicLoad(_) => load(I32, 2),
        I64Load(_) | I64AtomicLoad(_) => load(I64, 3),
        F32Load(_) => load(F32, 2),
        F64Load(_) => load(F64, 3),
        I32Load8s(_) | I32Load8u(_) | I32AtomicLoad8u(_) => load(I32, 0),
        I32Load16s(_) | I32Load16u(_) | I32AtomicLoad16u(_) => load(I32, 1),
        I64Load8s(_) | I64Load8u(_) | I64AtomicLoad8u(_) => load(I64, 0),
        I64Load16s(_) | I64Load16u(_) | I64AtomicLoad16u(_) => load(I64, 1),
        I64Load32s(_) | I64Load32u(_) | I64AtomicLoad32u(_) => load(I64, 2),

        I32Store(_) | I32AtomicStore(_) => store(I32, 2),
        I64Store(_) | I64AtomicStore(_) => store(I64, 3),
        F32Store(_) => store(F32, 2),
        F64Store(_) => store(F64, 3),
        I32Store8(_) | I32AtomicStore8(_) => store(I32, 0),
        I32Store16(_) | I32AtomicStore16(_) => store(I32, 1),
        I64Store8(_) | I64AtomicStore8(_) => store(I64, 0),
        I64Store16(_) | I64AtomicStore16(_) => store(I64, 1),
        I64Store32(_) | I64AtomicStore32(_) => store(I64, 2),

        MemoryAtomicNotify(_) => (StackEdit::fixed(&[I32, I32], &[I32]), 2),
        MemoryAtomicWait32(_) => (StackEdit::fixed(&[I32, I32, I64], &[I32]), 2),
        MemoryAtomicWait64(_) => (StackEdit::fixed(&[I32, I64, I64], &[I32]), 3),

        I32AtomicRmwAdd(_) | I32AtomicRmwSub(_) | I32AtomicRmwAnd(_) | I32AtomicRmwOr(_)
        | I32AtomicRmwXor(_) | I32AtomicRmwXchg(_) => rmw(I32, 2),
        I64AtomicRmwAdd(_) | I64AtomicRmwSub(_) | I64AtomicRmwAnd(_) | I64AtomicRmwOr(_)
        | I64AtomicRmwXor(_) | I64AtomicRmwXchg(_) => rmw(I64, 3),
        I32AtomicRmwCmpxchg(_) => cmpxchg(I32, 2),
        I64AtomicRmwCmpxchg(_) => cmpxchg(I64, 3),

        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::indices::{FuncIdx, LabelIdx, LocalIdx, MemIdx};
    use crate::core::instruction::Memarg;
    use pretty_assertions::assert_eq;
    use ValType::*;

    fn edit(i: Instruction) -> StackEdit {
        fixed_edit(&i).unwrap()
    }

    #[test]
    fn add_consumes_two_operands() {
        let add = edit(Instruction::I32Add);
        assert_eq!(evaluate(&[I32, I32], &add).unwrap(), vec![I32]);
        assert_eq!(evaluate(&[F64, I32, I32], &add).unwrap(), vec![F64, I32]);

        match evaluate(&[I32], &add).unwrap_err() {
            ValidationError::StackUnderflow { needed, available } => {
                assert_eq!((needed, available), (2, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        match evaluate(&[I32, I64], &add).unwrap_err() {
            ValidationError::TypeMismatch { actual, .. } => assert_eq!(actual, vec![I32, I64]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn select_echoes_the_captured_type() {
        let select = edit(Instruction::Select(None));
        assert_eq!(evaluate(&[I32, I32, I32], &select).unwrap(), vec![I32]);
        assert_eq!(evaluate(&[F32, F32, I32], &select).unwrap(), vec![F32]);
        assert!(evaluate(&[F32, F64, I32], &select).is_err());
        assert!(evaluate(&[F32, F32, I64], &select).is_err());
    }

    #[test]
    fn drop_accepts_anything() {
        let drop = edit(Instruction::Drop);
        assert!(evaluate(&[FuncRef], &drop).unwrap().is_empty());
        assert!(evaluate(&[], &drop).is_err());
    }

    #[test]
    fn polymorphic_stacks_supply_unknown_operands() {
        let mut stack = OperandStack::new(&[I32]);
        stack.set_unreachable();
        edit(Instruction::F64Add).apply_to(&mut stack).unwrap();
        assert_eq!(stack.known_types(), Some(vec![F64]));

        let mut stack = OperandStack::new(&[]);
        stack.set_unreachable();
        edit(Instruction::Select(None)).apply_to(&mut stack).unwrap();
        assert_eq!(stack.known_types(), None);
        stack.clone().finish(&[I64]).unwrap();
        assert!(stack.finish(&[]).is_err());

        let mut stack = OperandStack::new(&[]);
        assert_eq!(
            edit(Instruction::I32Add).apply_to(&mut stack),
            Err(ValidationError::StackUnderflow {
                needed: 2,
                available: 0
            })
        );
    }

    #[test]
    fn ref_is_null_requires_a_reference() {
        let is_null = edit(Instruction::RefIsNull);
        assert_eq!(evaluate(&[ExternRef], &is_null).unwrap(), vec![I32]);
        assert!(evaluate(&[I32], &is_null).is_err());
    }

    #[test]
    fn memory_accesses_know_their_natural_alignment() {
        let (edit, align) = memory_access(&Instruction::I64Store32(Memarg::ZERO)).unwrap();
        assert_eq!(edit, StackEdit::fixed(&[I32, I64], &[]));
        assert_eq!(align, 2);

        let (edit, align) =
            memory_access(&Instruction::I64AtomicRmwCmpxchg(Memarg::ZERO)).unwrap();
        assert_eq!(evaluate(&[I32, I64, I64], &edit).unwrap(), vec![I64]);
        assert_eq!(align, 3);

        assert!(memory_access(&Instruction::MemorySize(MemIdx(0))).is_none());
    }

    #[test]
    fn context_dependent_instructions_have_no_fixed_edit() {
        assert!(fixed_edit(&Instruction::LocalGet(LocalIdx(0))).is_none());
        assert!(fixed_edit(&Instruction::Br(LabelIdx(0))).is_none());
        assert!(fixed_edit(&Instruction::Call(FuncIdx(0))).is_none());
    }
}
