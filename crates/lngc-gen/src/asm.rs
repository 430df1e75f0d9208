//! Instruction decoding and human-readable disassembly.
//!
//! `lang asm <file>` prints the output of [`disassemble`]; the decoder
//! is also what the code generator's own tests use to inspect emitted
//! streams.

use std::fmt::Write as _;

use lngc_bc::{OpCode, OperandKind, ProgramImage};

/// A decoded inline operand.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Operand {
    /// 32-bit signed integer (immediates, indices, addresses).
    Int(i32),
    /// 64-bit float immediate.
    Float(f64),
}

/// One decoded instruction.
#[derive(Clone, Debug)]
pub struct DecodedInstruction {
    /// Code-section offset of the opcode byte.
    pub address: usize,
    /// The raw opcode byte.
    pub raw: u8,
    /// The decoded opcode, or `None` for an unknown byte.
    pub opcode: Option<OpCode>,
    /// Inline operands, in order.
    pub operands: Vec<Operand>,
}

impl DecodedInstruction {
    /// The `index`-th operand as an integer, if present.
    pub fn int_operand(&self, index: usize) -> Option<i32> {
        match self.operands.get(index) {
            Some(Operand::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// The `index`-th operand as a float, if present.
    pub fn float_operand(&self, index: usize) -> Option<f64> {
        match self.operands.get(index) {
            Some(Operand::Float(value)) => Some(*value),
            _ => None,
        }
    }
}

/// Decode a code section into instructions.
///
/// An unknown opcode byte becomes an instruction with `opcode: None`
/// and decoding continues at the next byte; a truncated operand ends
/// decoding.
pub fn decode(code: &[u8]) -> Vec<DecodedInstruction> {
    let mut instructions = Vec::new();
    let mut offset = 0;

    while offset < code.len() {
        let address = offset;
        let raw = code[offset];
        offset += 1;

        let Ok(opcode) = OpCode::try_from(raw) else {
            instructions.push(DecodedInstruction {
                address,
                raw,
                opcode: None,
                operands: Vec::new(),
            });
            continue;
        };

        let mut operands = Vec::new();
        let mut truncated = false;

        for kind in opcode.operands() {
            match kind {
                OperandKind::F64 => {
                    let Some(bytes) = code.get(offset..offset + 8) else {
                        truncated = true;
                        break;
                    };
                    let mut buffer = [0u8; 8];
                    buffer.copy_from_slice(bytes);
                    operands.push(Operand::Float(f64::from_be_bytes(buffer)));
                    offset += 8;
                },
                OperandKind::I32 | OperandKind::Data | OperandKind::Addr => {
                    let Some(bytes) = code.get(offset..offset + 4) else {
                        truncated = true;
                        break;
                    };
                    let mut buffer = [0u8; 4];
                    buffer.copy_from_slice(bytes);
                    operands.push(Operand::Int(i32::from_be_bytes(buffer)));
                    offset += 4;
                },
            }
        }

        instructions.push(DecodedInstruction {
            address,
            raw,
            opcode: Some(opcode),
            operands,
        });

        if truncated {
            break;
        }
    }

    instructions
}

/// Render an image as disassembly text: the data pool, then one line
/// per instruction with pool references annotated.
pub fn disassemble(image: &ProgramImage) -> String {
    let mut out = String::new();

    if !image.data.is_empty() {
        out.push_str("DATA\n");
        for (index, entry) in image.data.iter().enumerate() {
            let _ = writeln!(out, " {:>4}  {}", index, entry.escape_default());
        }
        out.push('\n');
    }

    out.push_str("CODE\n");
    for instruction in decode(&image.code) {
        let _ = write!(out, " {:>4}  ", instruction.address);

        let Some(opcode) = instruction.opcode else {
            let _ = writeln!(out, "???   // unknown instruction {}", instruction.raw);
            continue;
        };

        match opcode {
            OpCode::Lds => {
                let index = instruction.int_operand(0).unwrap_or(-1);
                let entry = data_entry(image, index);
                let _ = writeln!(
                    out,
                    "{:<4} {:>5}  // string \"{}\"",
                    opcode.mnemonic(),
                    index,
                    entry.escape_default(),
                );
            },
            OpCode::Sto | OpCode::Ldv | OpCode::Let => {
                let index = instruction.int_operand(0).unwrap_or(-1);
                let _ = writeln!(
                    out,
                    "{:<4} {:>5}  // variable {}",
                    opcode.mnemonic(),
                    index,
                    data_entry(image, index),
                );
            },
            OpCode::Pos => {
                let file = data_entry(image, instruction.int_operand(0).unwrap_or(-1));
                let line = instruction.int_operand(1).unwrap_or(0);
                let name_index = instruction.int_operand(2).unwrap_or(-1);
                if name_index >= 0 {
                    let _ = writeln!(
                        out,
                        "{:<4} // {}:{}, call {}",
                        opcode.mnemonic(),
                        file,
                        line,
                        data_entry(image, name_index),
                    );
                } else {
                    let _ = writeln!(out, "{:<4} // {}:{}", opcode.mnemonic(), file, line);
                }
            },
            OpCode::Ldf => {
                let value = instruction.float_operand(0).unwrap_or(0.0);
                let _ = writeln!(out, "{:<4} {:>5}", opcode.mnemonic(), value);
            },
            OpCode::Ldi | OpCode::Jmp | OpCode::Jpt | OpCode::Jpf | OpCode::Cal | OpCode::Ldl => {
                let value = instruction.int_operand(0).unwrap_or(0);
                let _ = writeln!(out, "{:<4} {:>5}", opcode.mnemonic(), value);
            },
            _ => {
                let _ = writeln!(out, "{}", opcode.mnemonic());
            },
        }
    }

    out
}

fn data_entry(image: &ProgramImage, index: i32) -> &str {
    usize::try_from(index)
        .ok()
        .and_then(|i| image.data.get(i))
        .map(String::as_str)
        .unwrap_or("?")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    #[test]
    fn test_decode_simple_stream() {
        // LDI 7; WRT; HLT
        let code = vec![1, 0, 0, 0, 7, 13, 0];
        let instructions = decode(&code);
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].opcode, Some(OpCode::Ldi));
        assert_eq!(instructions[0].int_operand(0), Some(7));
        assert_eq!(instructions[1].address, 5);
        assert_eq!(instructions[1].opcode, Some(OpCode::Wrt));
        assert_eq!(instructions[2].opcode, Some(OpCode::Hlt));
    }

    #[test]
    fn test_decode_float_operand() {
        let mut code = vec![2];
        code.extend_from_slice(&2.5f64.to_be_bytes());
        let instructions = decode(&code);
        assert_eq!(instructions[0].float_operand(0), Some(2.5));
    }

    #[test]
    fn test_decode_unknown_byte() {
        let code = vec![12, 200, 12];
        let instructions = decode(&code);
        assert_eq!(instructions[1].opcode, None);
        assert_eq!(instructions[1].raw, 200);
        // Decoding resumes after the unknown byte.
        assert_eq!(instructions[2].opcode, Some(OpCode::Nop));
    }

    #[test]
    fn test_decode_truncated_operand_stops() {
        let code = vec![1, 0, 0];
        let instructions = decode(&code);
        assert_eq!(instructions.len(), 1);
        assert!(instructions[0].operands.is_empty());
    }

    #[test]
    fn test_disassembly_sections() {
        let image = compile("fn main() { write(\"hi\"); return 0; }");
        let text = disassemble(&image);

        assert!(text.contains("DATA"));
        assert!(text.contains("CODE"));
        assert!(text.contains("// string \"hi\""));
        assert!(text.contains("cal"));
        assert!(text.contains("ext"));
    }

    #[test]
    fn test_disassembly_annotates_variables() {
        let image = compile("fn main() { let count = 1; write(count); return 0; }");
        let text = disassemble(&image);
        assert!(text.contains("// variable count"));
    }

    #[test]
    fn test_disassembly_reproduces_instruction_sequence() {
        let image = compile("fn main() { write(1 + 2 * 3); return 0; }");
        let decoded = decode(&image.code);
        let text = disassemble(&image);

        // Every decoded instruction appears as a line, in order.
        let lines: Vec<&str> = text.lines().skip_while(|l| *l != "CODE").skip(1).collect();
        assert_eq!(lines.len(), decoded.len());
        for (line, instruction) in lines.iter().zip(&decoded) {
            let mnemonic = instruction
                .opcode
                .map(|o| o.mnemonic())
                .unwrap_or("???");
            assert!(
                line.contains(mnemonic),
                "line {:?} does not match {:?}",
                line,
                mnemonic,
            );
        }
    }
}
