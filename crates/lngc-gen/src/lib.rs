//! lngc-gen - Bytecode generation for the lng language.
//!
//! Translates a validated AST into a [`ProgramImage`]: a data pool of
//! interned strings and names plus a linear instruction stream. Forward
//! calls are back-patched in a single pass at the end of generation;
//! there are no cycles because every patch edge points from a call site
//! to a function address.
//!
//! Generation is deterministic: the data pool and function table keep
//! insertion order, so compiling the same source twice produces
//! byte-identical images.

pub mod asm;

pub use asm::{decode, disassemble, DecodedInstruction};

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use lngc_bc::{built_in, OpCode, ProgramImage};
use lngc_par::{Ast, BinaryOp, Node, NodeKind, UnaryOp};

/// Internal generation failures.
///
/// These indicate an AST that did not pass semantic analysis (a call to
/// a function that is never defined); they cannot occur in the normal
/// pipeline.
#[derive(Debug, Error)]
pub enum GenError {
    /// A call target that never got an address.
    #[error("call to undefined function {0}")]
    UnresolvedFunction(String),
}

/// The bytecode generator.
pub struct CodeGenerator {
    /// Interned data-pool entries, in first-use order.
    pool: IndexSet<String>,
    /// The code section being built.
    code: Vec<u8>,
    /// Function name to code address, filled as definitions are met.
    functions: IndexMap<String, i32>,
    /// (operand offset, target name) pairs awaiting a function address.
    patches: Vec<(usize, String)>,
    /// Data-pool index of the source file name, used by `POS`.
    file_index: i32,
    /// The opcode most recently emitted, for the implicit-return check.
    last_op: Option<OpCode>,
}

impl CodeGenerator {
    /// Create a generator for a program compiled from `file_name`.
    ///
    /// The file name becomes the first data-pool entry; `POS`
    /// annotations reference it.
    pub fn new(file_name: &str) -> Self {
        let mut pool = IndexSet::new();
        pool.insert(file_name.to_string());

        Self {
            pool,
            code: Vec::new(),
            functions: IndexMap::new(),
            patches: Vec::new(),
            file_index: 0,
            last_op: None,
        }
    }

    /// Generate the program image for `ast`.
    ///
    /// Emits every top-level declaration, then the entry sequence
    /// `CAL main; EXT`, then resolves all back-patches.
    pub fn generate(mut self, ast: &Ast) -> Result<ProgramImage, GenError> {
        for declaration in ast {
            self.node(declaration, false)?;
        }

        // Call the entry point; its return value becomes the exit code.
        let main_index = self.intern("main");
        self.emit_pos(0, main_index);
        let main_address = self
            .functions
            .get("main")
            .copied()
            .ok_or_else(|| GenError::UnresolvedFunction("main".to_string()))?;
        self.emit_op(OpCode::Cal);
        self.emit_i32(main_address);
        self.emit_op(OpCode::Ext);

        self.link_addresses()?;

        Ok(ProgramImage {
            data: self.pool.into_iter().collect(),
            code: self.code,
        })
    }

    /// Generate one node.
    ///
    /// `keep_result` is false in statement position: a bare call that
    /// pushes a result gets a trailing `POP` so statements stay
    /// stack-neutral.
    fn node(&mut self, node: &Node, keep_result: bool) -> Result<(), GenError> {
        match &node.kind {
            NodeKind::Int(value) => {
                self.emit_op(OpCode::Ldi);
                self.emit_i32(*value as i32);
            },

            NodeKind::Float(value) => {
                self.emit_op(OpCode::Ldf);
                self.emit_f64(*value);
            },

            NodeKind::Str(value) => {
                let index = self.intern(value);
                self.emit_op(OpCode::Lds);
                self.emit_i32(index);
            },

            NodeKind::Nil => self.emit_op(OpCode::Ldn),

            NodeKind::Identifier(name) => {
                let index = self.intern(name);
                self.emit_op(OpCode::Ldv);
                self.emit_i32(index);
            },

            NodeKind::Unary { op, operand } => {
                self.node(operand, true)?;
                match op {
                    // +e is e.
                    UnaryOp::Plus => {},
                    UnaryOp::Neg => self.emit_op(OpCode::Neg),
                    UnaryOp::Not => self.emit_op(OpCode::Not),
                    UnaryOp::BitNot => self.emit_op(OpCode::Bnt),
                }
            },

            NodeKind::Binary { op, left, right } => {
                self.node(left, true)?;
                self.node(right, true)?;
                self.emit_op(binary_opcode(*op));
            },

            NodeKind::Let { name, value } => {
                let index = self.intern(name);
                self.emit_op(OpCode::Let);
                self.emit_i32(index);

                match value {
                    Some(value) => self.node(value, true)?,
                    None => self.emit_op(OpCode::Ldn),
                }

                self.emit_op(OpCode::Sto);
                self.emit_i32(index);
            },

            NodeKind::Assign { name, value } => {
                let index = self.intern(name);
                self.node(value, true)?;
                self.emit_op(OpCode::Sto);
                self.emit_i32(index);
            },

            NodeKind::Block(statements) => {
                for statement in statements {
                    self.emit_pos(statement.position.line, -1);
                    self.node(statement, false)?;
                }
            },

            NodeKind::If {
                condition,
                then_body,
                else_body,
            } => {
                self.node(condition, true)?;

                self.emit_op(OpCode::Jpf);
                let jump_false = self.reserve_i32();

                self.node(then_body, false)?;

                match else_body {
                    Some(else_body) => {
                        self.emit_op(OpCode::Jmp);
                        let jump_end = self.reserve_i32();

                        self.patch_i32(jump_false, self.address());
                        self.node(else_body, false)?;
                        self.patch_i32(jump_end, self.address());
                    },
                    None => self.patch_i32(jump_false, self.address()),
                }
            },

            NodeKind::While { condition, body } => {
                let condition_address = self.address();

                self.node(condition, true)?;
                self.emit_op(OpCode::Jpf);
                let jump_end = self.reserve_i32();

                self.node(body, false)?;
                self.emit_op(OpCode::Jmp);
                self.emit_i32(condition_address);

                self.patch_i32(jump_end, self.address());
            },

            NodeKind::DoWhile { condition, body } => {
                let body_address = self.address();

                self.node(body, false)?;
                self.node(condition, true)?;

                self.emit_op(OpCode::Jpt);
                self.emit_i32(body_address);
            },

            NodeKind::Fn { name, params, body } => {
                self.emit_op(OpCode::Jmp);
                let jump_over = self.reserve_i32();

                self.functions.insert(name.clone(), self.address());

                // Prologue: bind each parameter in declaration order.
                // Arguments were pushed in reverse, so the first pop is
                // the first parameter.
                for param in params {
                    let index = self.intern(&param.name);
                    self.emit_op(OpCode::Let);
                    self.emit_i32(index);
                    self.emit_op(OpCode::Sto);
                    self.emit_i32(index);
                }

                self.node(body, false)?;

                // Fall off the end: return nil.
                if self.last_op != Some(OpCode::Ret) {
                    self.emit_op(OpCode::Ldn);
                    self.emit_op(OpCode::Ret);
                }

                self.patch_i32(jump_over, self.address());
            },

            NodeKind::Call { name, args } => {
                // Reverse source order, so the callee pops them in
                // declaration order.
                for arg in args.iter().rev() {
                    self.node(arg, true)?;
                }

                if let Some(built_in) = built_in(name) {
                    self.emit_op(built_in.opcode);
                    if !keep_result && built_in.returns_value {
                        self.emit_op(OpCode::Pop);
                    }
                    return Ok(());
                }

                let name_index = self.intern(name);
                self.emit_pos(node.position.line, name_index);

                self.emit_op(OpCode::Cal);
                match self.functions.get(name) {
                    Some(&address) => self.emit_i32(address),
                    None => {
                        let offset = self.reserve_i32();
                        self.patches.push((offset, name.clone()));
                    },
                }

                if !keep_result {
                    self.emit_op(OpCode::Pop);
                }
            },

            NodeKind::Return(value) => {
                self.node(value, true)?;
                self.emit_op(OpCode::Ret);
            },

            NodeKind::List(values) => {
                // Reversed, so the VM can rebuild source order by
                // popping.
                for value in values.iter().rev() {
                    self.node(value, true)?;
                }
                self.emit_op(OpCode::Ldl);
                self.emit_i32(values.len() as i32);
            },

            NodeKind::ListAccess { list, index } => {
                self.node(list, true)?;
                self.node(index, true)?;
                self.emit_op(OpCode::Get);
            },
        }

        Ok(())
    }

    /// Resolve every recorded forward call.
    fn link_addresses(&mut self) -> Result<(), GenError> {
        let patches = std::mem::take(&mut self.patches);
        for (offset, name) in patches {
            let address = self
                .functions
                .get(&name)
                .copied()
                .ok_or_else(|| GenError::UnresolvedFunction(name.clone()))?;
            self.patch_i32(offset, address);
        }
        Ok(())
    }

    /// Intern a string into the data pool, returning its index.
    fn intern(&mut self, value: &str) -> i32 {
        let (index, _) = self.pool.insert_full(value.to_string());
        index as i32
    }

    /// Emit a `POS` annotation: source file, line, callee name index
    /// (-1 when the annotation is not attached to a call).
    fn emit_pos(&mut self, line: u32, name_index: i32) {
        self.emit_op(OpCode::Pos);
        self.emit_i32(self.file_index);
        self.emit_i32(line as i32);
        self.emit_i32(name_index);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.code.push(op.into());
        self.last_op = Some(op);
    }

    fn emit_i32(&mut self, value: i32) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    fn emit_f64(&mut self, value: f64) {
        self.code.extend_from_slice(&value.to_be_bytes());
    }

    /// Emit a placeholder i32 operand, returning its offset for a later
    /// [`Self::patch_i32`].
    fn reserve_i32(&mut self) -> usize {
        let offset = self.code.len();
        self.emit_i32(0);
        offset
    }

    fn patch_i32(&mut self, offset: usize, value: i32) {
        self.code[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// The current code address.
    fn address(&self) -> i32 {
        self.code.len() as i32
    }
}

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Eq => OpCode::Eq,
        BinaryOp::Ne => OpCode::Ne,
        BinaryOp::Lt => OpCode::Lt,
        BinaryOp::Le => OpCode::Le,
        BinaryOp::Gt => OpCode::Gt,
        BinaryOp::Ge => OpCode::Ge,
        BinaryOp::And => OpCode::And,
        BinaryOp::Or => OpCode::Or,
        BinaryOp::BitAnd => OpCode::Bnd,
        BinaryOp::BitOr => OpCode::Bor,
        BinaryOp::BitXor => OpCode::Xor,
        BinaryOp::Shl => OpCode::Shl,
        BinaryOp::Shr => OpCode::Shr,
    }
}

#[cfg(test)]
pub(crate) fn compile(source: &str) -> ProgramImage {
    let tokens = lngc_lex::Lexer::new("test.lng", source)
        .lex()
        .expect("lexing failed");
    let ast = lngc_par::Parser::new(tokens).parse().expect("parsing failed");
    CodeGenerator::new("test.lng")
        .generate(&ast)
        .expect("generation failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lngc_bc::SIGNATURE;

    #[test]
    fn test_hello_world_image() {
        let image = compile("fn main() { write(\"hi\"); return 0; }");

        let bytes = image.to_bytes();
        assert_eq!(&bytes[..5], &SIGNATURE);

        assert!(image.data.iter().any(|d| d == "hi"));
        assert!(image.data.iter().any(|d| d == "main"));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let source = "fn fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }
                      fn main() { write(fact(5)); return 0; }";
        let first = compile(source).to_bytes();
        let second = compile(source).to_bytes();
        assert_eq!(first, second);
    }

    #[test]
    fn test_strings_are_interned_once() {
        let image = compile("fn main() { write(\"x\"); write(\"x\"); return 0; }");
        let count = image.data.iter().filter(|d| d.as_str() == "x").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_image_ends_with_call_main_exit() {
        let image = compile("fn main() { return 0; }");
        let instructions = decode(&image.code);

        let last = &instructions[instructions.len() - 1];
        assert_eq!(last.opcode, Some(OpCode::Ext));

        let call = &instructions[instructions.len() - 2];
        assert_eq!(call.opcode, Some(OpCode::Cal));
        let target = call.int_operand(0).expect("cal operand");
        assert_eq!(target, self::function_address(&image, "main"));
    }

    /// Find the address a `CAL` in the trailer jumps to by decoding the
    /// leading `JMP` of each definition.
    fn function_address(image: &lngc_bc::ProgramImage, _name: &str) -> i32 {
        // The first instruction of a single-function image is the JMP
        // over the body; the body starts right after it.
        let instructions = decode(&image.code);
        assert_eq!(instructions[0].opcode, Some(OpCode::Jmp));
        (instructions[0].address + 5) as i32
    }

    #[test]
    fn test_jump_targets_lie_in_code_section() {
        let image = compile(
            "fn fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }
             fn main() {
                 let i = 0;
                 while (i < 3) { write(i); i += 1; }
                 do { i -= 1; } while (i > 0);
                 if (i == 0) { write(fact(5)); } else { write(0); }
                 return 0;
             }",
        );

        for instruction in decode(&image.code) {
            if matches!(
                instruction.opcode,
                Some(OpCode::Jmp) | Some(OpCode::Jpt) | Some(OpCode::Jpf) | Some(OpCode::Cal)
            ) {
                let target = instruction.int_operand(0).expect("missing operand");
                assert!(
                    target >= 0 && (target as usize) <= image.code.len(),
                    "target {} outside code section ({} bytes)",
                    target,
                    image.code.len(),
                );
            }
        }
    }

    #[test]
    fn test_forward_call_is_backpatched() {
        let image = compile(
            "fn main() { write(later(1)); return 0; }
             fn later(x) { return x; }",
        );

        // No CAL operand may remain a zero placeholder: address 0 is the
        // JMP over main's own body, never a function start here.
        for instruction in decode(&image.code) {
            if instruction.opcode == Some(OpCode::Cal) {
                let target = instruction.int_operand(0).expect("cal operand");
                assert_ne!(target, 0, "unpatched CAL at {}", instruction.address);
            }
        }
    }

    #[test]
    fn test_function_prologue_binds_parameters() {
        let image = compile("fn two(a, b) { return a; } fn main() { write(two(1, 2)); return 0; }");
        let instructions = decode(&image.code);

        // Body of `two` starts after the initial JMP: LET a, STO a,
        // LET b, STO b.
        assert_eq!(instructions[1].opcode, Some(OpCode::Let));
        assert_eq!(instructions[2].opcode, Some(OpCode::Sto));
        assert_eq!(instructions[1].int_operand(0), instructions[2].int_operand(0));
        assert_eq!(instructions[3].opcode, Some(OpCode::Let));
        assert_eq!(instructions[4].opcode, Some(OpCode::Sto));
    }

    #[test]
    fn test_function_without_return_gets_nil_return() {
        let image = compile("fn quiet() { } fn main() { quiet(); return 0; }");
        let instructions = decode(&image.code);

        // quiet's body is the two-instruction epilogue LDN; RET.
        assert_eq!(instructions[1].opcode, Some(OpCode::Ldn));
        assert_eq!(instructions[2].opcode, Some(OpCode::Ret));
    }

    #[test]
    fn test_implicit_return_not_fooled_by_operand_bytes() {
        // The literal 10 equals the RET opcode byte; the generator must
        // still append the epilogue.
        let image = compile("fn f() { write(10); } fn main() { f(); return 0; }");
        let instructions = decode(&image.code);

        let mut found_epilogue = false;
        for window in instructions.windows(2) {
            if window[0].opcode == Some(OpCode::Ldn) && window[1].opcode == Some(OpCode::Ret) {
                found_epilogue = true;
            }
        }
        assert!(found_epilogue);
    }

    #[test]
    fn test_bare_call_of_returning_built_in_is_popped() {
        let image = compile("fn main() { let xs = []; length(xs); return 0; }");
        let instructions = decode(&image.code);

        let len_index = instructions
            .iter()
            .position(|i| i.opcode == Some(OpCode::Len))
            .expect("no LEN emitted");
        assert_eq!(instructions[len_index + 1].opcode, Some(OpCode::Pop));
    }

    #[test]
    fn test_bare_write_is_not_popped() {
        let image = compile("fn main() { write(1); return 0; }");
        let instructions = decode(&image.code);

        let wrt_index = instructions
            .iter()
            .position(|i| i.opcode == Some(OpCode::Wrt))
            .expect("no WRT emitted");
        assert_ne!(instructions[wrt_index + 1].opcode, Some(OpCode::Pop));
    }

    #[test]
    fn test_list_literal_emits_reversed_then_ldl() {
        let image = compile("fn main() { let xs = [1, 2]; return 0; }");
        let instructions = decode(&image.code);

        let ldl_index = instructions
            .iter()
            .position(|i| i.opcode == Some(OpCode::Ldl))
            .expect("no LDL emitted");
        assert_eq!(instructions[ldl_index].int_operand(0), Some(2));
        // The two LDIs before it push 2 first, then 1.
        assert_eq!(instructions[ldl_index - 2].int_operand(0), Some(2));
        assert_eq!(instructions[ldl_index - 1].int_operand(0), Some(1));
    }

    #[test]
    fn test_unary_plus_emits_nothing() {
        let with_plus = compile("fn main() { write(+1); return 0; }");
        let without = compile("fn main() { write(1); return 0; }");
        assert_eq!(with_plus.code, without.code);
    }

    #[test]
    fn test_i32_operands_are_big_endian_signed() {
        let mut generator = CodeGenerator::new("test.lng");
        generator.emit_i32(-2);
        generator.emit_i32(0x0102_0304);
        assert_eq!(
            generator.code,
            vec![0xFF, 0xFF, 0xFF, 0xFE, 0x01, 0x02, 0x03, 0x04],
        );
    }

    #[test]
    fn test_call_pos_annotation_precedes_cal() {
        let image = compile("fn main() { return 0; }");
        let instructions = decode(&image.code);

        let cal_index = instructions
            .iter()
            .position(|i| i.opcode == Some(OpCode::Cal))
            .expect("no CAL emitted");
        assert_eq!(instructions[cal_index - 1].opcode, Some(OpCode::Pos));
        // The annotation names `main` in the data pool.
        let name_index = instructions[cal_index - 1].int_operand(2).expect("name operand");
        assert_eq!(image.data[name_index as usize], "main");
    }
}
