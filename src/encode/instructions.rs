//! WebAssembly instruction encoding.
use crate::core::Expr;
use crate::core::instruction::{ATOMIC_PREFIX, ELSE, END, Instruction, MISC_PREFIX, Memarg, Opcode};
use crate::encode::helpers::{LengthOverflowError, encode_f32, encode_f64, encode_vector};
use crate::encode::integer::{Relaxation, encode_i32, encode_i64, encode_u32};

fn index(out: &mut Vec<u8>, idx: u32) {
    encode_u32(out, idx, Relaxation::Canonical);
}

impl Opcode {
    pub fn encode(&self, out: &mut Vec<u8>) {
        match *self {
            Opcode::Primary(op) => out.push(op),
            Opcode::Misc(code) => {
                out.push(MISC_PREFIX);
                encode_u32(out, code, Relaxation::Canonical);
            }
            Opcode::Atomic(code) => {
                out.push(ATOMIC_PREFIX);
                encode_u32(out, code, Relaxation::Canonical);
            }
        }
    }
}

impl Memarg {
    pub fn encode(&self, out: &mut Vec<u8>) {
        if self.memory.0 == 0 {
            encode_u32(out, self.align, Relaxation::Canonical);
        } else {
            encode_u32(out, self.align | Self::MEMORY_FLAG, Relaxation::Canonical);
            index(out, self.memory.0);
        }
        encode_u32(out, self.offset, Relaxation::Canonical);
    }
}

impl Instruction {
    /// Writes the opcode, the immediates and, for structured instructions,
    /// the nested bodies with their `else`/`end` delimiters.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), LengthOverflowError> {
        use Instruction::*;

        self.opcode().encode(out);

        if let Some(memarg) = self.memarg() {
            memarg.encode(out);
            return Ok(());
        }

        match self {
            Block(bt, body) | Loop(bt, body) => {
                bt.encode(out);
                encode_expr(out, body)?;
            }
            If(bt, then, els) => {
                bt.encode(out);
                for i in then {
                    i.encode(out)?;
                }
                if let Some(els) = els {
                    out.push(ELSE);
                    for i in els {
                        i.encode(out)?;
                    }
                }
                out.push(END);
            }
            Br(l) | BrIf(l) => index(out, l.0),
            BrTable(ls, l) => {
                encode_vector(out, ls, |out, l| {
                    index(out, l.0);
                    Ok::<_, LengthOverflowError>(())
                })?;
                index(out, l.0);
            }
            Call(f) | RefFunc(f) => index(out, f.0),
            CallIndirect(t, table) => {
                index(out, t.0);
                index(out, table.0);
            }

            RefNull(t) => t.encode(out),
            Select(Some(t)) => {
                index(out, 1);
                t.encode(out);
            }

            LocalGet(l) | LocalSet(l) | LocalTee(l) => index(out, l.0),
            GlobalGet(g) | GlobalSet(g) => index(out, g.0),

            TableGet(t) | TableSet(t) | TableGrow(t) | TableSize(t) | TableFill(t) => {
                index(out, t.0)
            }
            TableInit(t, e) => {
                index(out, e.0);
                index(out, t.0);
            }
            ElemDrop(e) => index(out, e.0),
            TableCopy(dst, src) => {
                index(out, dst.0);
                index(out, src.0);
            }

            MemorySize(m) | MemoryGrow(m) | MemoryFill(m) => index(out, m.0),
            MemoryInit(m, d) => {
                index(out, d.0);
                index(out, m.0);
            }
            DataDrop(d) => index(out, d.0),
            MemoryCopy(dst, src) => {
                index(out, dst.0);
                index(out, src.0);
            }
            AtomicFence => out.push(0x00),

            I32Const(v) => encode_i32(out, *v, Relaxation::Canonical),
            I64Const(v) => encode_i64(out, *v, Relaxation::Canonical),
            F32Const(v) => encode_f32(out, *v),
            F64Const(v) => encode_f64(out, *v),

            _ => {}
        }

        Ok(())
    }
}

/// Writes an instruction sequence followed by `end`.
pub fn encode_expr(out: &mut Vec<u8>, expr: &Expr) -> Result<(), LengthOverflowError> {
    for i in expr {
        i.encode(out)?;
    }
    out.push(END);
    Ok(())
}
