/// Prototype listings (luac -l style output).
use std::fmt;

use crate::opcode::{is_rk_constant, Instruction, OpCode, BITRK};
use crate::proto::{Constant, Proto};

/// Disassemble a complete Proto into a human-readable string.
pub fn disassemble(proto: &Proto) -> String {
    Listing(proto).to_string()
}

/// Display adapter printing a prototype and its children.
pub struct Listing<'a>(pub &'a Proto);

impl fmt::Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_proto(f, self.0, 0)
    }
}

fn write_proto(f: &mut fmt::Formatter<'_>, proto: &Proto, level: usize) -> fmt::Result {
    let indent = "  ".repeat(level);

    let vararg = if proto.is_vararg { "+" } else { "" };
    writeln!(
        f,
        "{indent}function <{}> ({} instructions)",
        proto.source.as_deref().unwrap_or("?"),
        proto.code.len(),
    )?;
    writeln!(
        f,
        "{indent}{}{vararg} params, {} slots, {} upvalues, {} constants, {} functions",
        proto.num_params,
        proto.max_stack_size,
        proto.upvalues.len(),
        proto.constants.len(),
        proto.protos.len(),
    )?;

    for (pc, inst) in proto.code.iter().enumerate() {
        write!(f, "{indent}\t{}\t", pc + 1)?;
        write_instruction(f, pc, inst, proto)?;
        writeln!(f)?;
    }

    if !proto.constants.is_empty() {
        writeln!(f, "{indent}constants ({}):", proto.constants.len())?;
        for (i, k) in proto.constants.iter().enumerate() {
            write!(f, "{indent}\t{i}\t")?;
            write_constant(f, k)?;
            writeln!(f)?;
        }
    }

    if !proto.upvalues.is_empty() {
        writeln!(f, "{indent}upvalues ({}):", proto.upvalues.len())?;
        for (i, up) in proto.upvalues.iter().enumerate() {
            writeln!(
                f,
                "{indent}\t{i}\t{}\t{}\t{}",
                up.name, up.in_stack as u8, up.index
            )?;
        }
    }

    for (i, p) in proto.protos.iter().enumerate() {
        writeln!(f, "{indent}function [{i}]:")?;
        write_proto(f, p, level + 1)?;
    }
    Ok(())
}

/// One instruction: mnemonic, operands with RK constants shown as `-k-1`,
/// then a comment naming constants and jump targets.
fn write_instruction(
    f: &mut fmt::Formatter<'_>,
    pc: usize,
    inst: &Instruction,
    proto: &Proto,
) -> fmt::Result {
    let op = inst.opcode();
    write!(f, "{:<12}", op.name())?;

    match *inst {
        Instruction::Abc { a, b, c, .. } => {
            write!(f, "{a} {} {}", rk_display(op, b), rk_display(op, c))?;
            let constants: Vec<u32> = [b, c]
                .into_iter()
                .filter(|&x| op.takes_rk() && is_rk_constant(x))
                .map(|x| x & !BITRK)
                .collect();
            if !constants.is_empty() {
                write!(f, "\t;")?;
                for k in constants {
                    write!(f, " ")?;
                    match proto.constants.get(k) {
                        Some(constant) => write_constant(f, constant)?,
                        None => write!(f, "?")?,
                    }
                }
            }
        }
        Instruction::Abx { a, bx, .. } => {
            write!(f, "{a} {bx}")?;
            match op {
                OpCode::LoadK => {
                    if let Some(k) = proto.constants.get(bx) {
                        write!(f, "\t; ")?;
                        write_constant(f, k)?;
                    }
                }
                OpCode::Closure => write!(f, "\t; function [{bx}]")?,
                _ => {}
            }
        }
        Instruction::AsBx { a, sbx, .. } => {
            let target = pc as i64 + 2 + sbx as i64;
            write!(f, "{a} {sbx}\t; to {target}")?;
        }
        Instruction::Ax { ax, .. } => write!(f, "{ax}")?,
    }
    Ok(())
}

fn rk_display(op: OpCode, operand: u32) -> i64 {
    if op.takes_rk() && is_rk_constant(operand) {
        -((operand & !BITRK) as i64) - 1
    } else {
        operand as i64
    }
}

fn write_constant(f: &mut fmt::Formatter<'_>, k: &Constant) -> fmt::Result {
    match k {
        Constant::Nil => write!(f, "nil"),
        Constant::Boolean(b) => write!(f, "{b}"),
        Constant::Integer(i) => write!(f, "{i}"),
        Constant::Float(x) => write!(f, "{x:?}"),
        Constant::Str(s) => write!(f, "{s:?}"),
    }
}
