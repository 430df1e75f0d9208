//! lngc-vm - The stack virtual machine.
//!
//! Executes a [`ProgramImage`] with a single-threaded fetch/decode loop.
//! Runtime state is one value stack, one call stack of activation
//! frames, a stack of scope dictionaries mapping name indices to slot
//! addresses, and a fixed-size slot store for variable values.
//!
//! Call discipline: `CAL` duplicates the top scope dictionary (the
//! callee sees enclosing names, but its bindings die with it), saves the
//! return address and the pre-call stack depth, and jumps. `RET` frees
//! the slots the frame allocated, truncates the value stack back to the
//! saved depth, and pushes the return value.
//!
//! Execution ends at `HLT`/`EXT` with an exit code, or with a
//! [`VmPanic`] that the runner reports before exiting with code 1.

pub mod error;
pub mod memory;
pub mod value;

pub use error::VmPanic;
pub use memory::{Memory, MEMORY_SIZE};
pub use value::{FileHandle, FileState, Value};

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Write};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use lngc_bc::{OpCode, ProgramImage};

/// A runtime scope: name index to slot address, plus the slots this
/// scope allocated (and must free on return).
struct Scope {
    bindings: FxHashMap<i32, usize>,
    owned: Vec<usize>,
}

/// One call-stack record.
struct Frame {
    /// Where `RET` resumes.
    return_pc: usize,
    /// Value-stack depth saved at `CAL`.
    stack_depth: usize,
    /// Debug info from the `POS` annotation preceding the `CAL`.
    call: Option<CallInfo>,
}

/// Debug fields of a frame, as data-pool indices.
#[derive(Clone, Copy)]
struct CallInfo {
    file: i32,
    line: i32,
    name: i32,
}

/// The virtual machine.
pub struct Vm<'out> {
    data: Vec<String>,
    code: Vec<u8>,
    pc: usize,
    stack: Vec<Value>,
    call_stack: Vec<Frame>,
    scopes: Vec<Scope>,
    memory: Memory,
    /// Current source position from the last `POS`: (file index, line).
    position: Option<(i32, i32)>,
    /// Call annotation waiting for the next `CAL`.
    pending_call: Option<CallInfo>,
    output: Box<dyn Write + 'out>,
}

impl Vm<'static> {
    /// Create a VM writing to standard output.
    pub fn new(image: ProgramImage) -> Self {
        Self::with_output(image, Box::new(std::io::stdout()))
    }
}

impl<'out> Vm<'out> {
    /// Create a VM writing `write()` output to `output`.
    pub fn with_output(image: ProgramImage, output: Box<dyn Write + 'out>) -> Self {
        Self {
            data: image.data,
            code: image.code,
            pc: 0,
            stack: Vec::new(),
            call_stack: Vec::new(),
            scopes: vec![Scope {
                bindings: FxHashMap::default(),
                owned: Vec::new(),
            }],
            memory: Memory::new(),
            position: None,
            pending_call: None,
            output,
        }
    }

    /// Run to completion, returning the process exit code.
    pub fn run(&mut self) -> Result<i32, VmPanic> {
        loop {
            let byte = self.fetch_byte()?;
            let opcode =
                OpCode::try_from(byte).map_err(|_| VmPanic::UnknownInstruction(byte))?;

            match opcode {
                OpCode::Hlt => {
                    self.flush();
                    return Ok(0);
                },

                OpCode::Ext => {
                    let code = match self.pop()? {
                        Value::Int(value) => value as i32,
                        _ => 0,
                    };
                    self.flush();
                    return Ok(code);
                },

                OpCode::Nop => {},

                OpCode::Ldi => {
                    let value = self.fetch_i32()?;
                    self.stack.push(Value::Int(value as i64));
                },

                OpCode::Ldf => {
                    let value = self.fetch_f64()?;
                    self.stack.push(Value::Float(value));
                },

                OpCode::Lds => {
                    let index = self.fetch_i32()?;
                    let value = self.data_str(index)?.to_string();
                    self.stack.push(Value::string(value));
                },

                OpCode::Ldn => self.stack.push(Value::Nil),

                OpCode::Ldv => {
                    let index = self.fetch_i32()?;
                    let address = self.lookup(index)?;
                    self.stack.push(self.memory.load(address));
                },

                OpCode::Sto => {
                    let index = self.fetch_i32()?;
                    let address = self.lookup(index)?;
                    let value = self.pop()?;
                    self.memory.store(address, value);
                },

                OpCode::Let => {
                    let index = self.fetch_i32()?;
                    let address = self.memory.allocate().ok_or(VmPanic::MemoryOverflow)?;
                    let scope = self.top_scope_mut();
                    scope.bindings.insert(index, address);
                    scope.owned.push(address);
                },

                OpCode::Jmp => {
                    let target = self.fetch_i32()?;
                    self.jump(target)?;
                },

                OpCode::Jpt => {
                    let target = self.fetch_i32()?;
                    if self.pop()?.is_truthy() {
                        self.jump(target)?;
                    }
                },

                OpCode::Jpf => {
                    let target = self.fetch_i32()?;
                    if !self.pop()?.is_truthy() {
                        self.jump(target)?;
                    }
                },

                OpCode::Cal => {
                    let target = self.fetch_i32()?;

                    let snapshot = self.top_scope().bindings.clone();
                    self.scopes.push(Scope {
                        bindings: snapshot,
                        owned: Vec::new(),
                    });

                    self.call_stack.push(Frame {
                        return_pc: self.pc,
                        stack_depth: self.stack.len(),
                        call: self.pending_call.take(),
                    });

                    self.jump(target)?;
                },

                OpCode::Ret => {
                    let Some(frame) = self.call_stack.pop() else {
                        return Err(VmPanic::CallStackUnderflow);
                    };

                    if self.scopes.len() > 1 {
                        if let Some(scope) = self.scopes.pop() {
                            for address in scope.owned {
                                self.memory.free(address);
                            }
                        }
                    }

                    let value = self.stack.pop().unwrap_or(Value::Nil);
                    self.stack.truncate(frame.stack_depth);
                    self.pc = frame.return_pc;
                    self.stack.push(value);
                },

                OpCode::Wrt => {
                    let value = self.pop()?;
                    writeln!(self.output, "{}", value)
                        .map_err(|e| VmPanic::Io(e.to_string()))?;
                },

                OpCode::Pop => {
                    self.pop()?;
                },

                OpCode::Dup => {
                    let top = self
                        .stack
                        .last()
                        .cloned()
                        .ok_or(VmPanic::StackUnderflow)?;
                    self.stack.push(top);
                },

                OpCode::Inc => self.step_top(1)?,
                OpCode::Dec => self.step_top(-1)?,

                OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Eq
                | OpCode::Ne
                | OpCode::Lt
                | OpCode::Le
                | OpCode::Gt
                | OpCode::Ge
                | OpCode::And
                | OpCode::Or
                | OpCode::Xor
                | OpCode::Bor
                | OpCode::Bnd
                | OpCode::Shl
                | OpCode::Shr => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    let result = apply_binary(opcode, left, right)?;
                    self.stack.push(result);
                },

                OpCode::Not => {
                    let value = self.pop()?;
                    self.stack.push(Value::Int(i64::from(!value.is_truthy())));
                },

                OpCode::Neg => {
                    let value = self.pop()?;
                    let result = match value {
                        Value::Int(v) => Value::Int(v.wrapping_neg()),
                        Value::Float(v) => Value::Float(-v),
                        other => {
                            return Err(VmPanic::IllegalUnaryOperation(other.type_name()));
                        },
                    };
                    self.stack.push(result);
                },

                OpCode::Bnt => {
                    let value = self.pop()?;
                    let result = match value {
                        Value::Int(v) => Value::Int(!v),
                        other => {
                            return Err(VmPanic::IllegalUnaryOperation(other.type_name()));
                        },
                    };
                    self.stack.push(result);
                },

                OpCode::Ldl => {
                    let count = self.fetch_i32()?;
                    let count = usize::try_from(count).map_err(|_| VmPanic::InvalidIndex)?;
                    // Values were pushed in reverse source order, so
                    // popping restores source order.
                    let mut values = Vec::with_capacity(count);
                    for _ in 0..count {
                        values.push(self.pop()?);
                    }
                    self.stack.push(Value::list(values));
                },

                OpCode::Get => {
                    let index = self.pop()?;
                    let list = self.pop()?;
                    let Value::List(values) = list else {
                        return Err(VmPanic::NotSubscriptable);
                    };
                    let Value::Int(index) = index else {
                        return Err(VmPanic::InvalidIndex);
                    };
                    let values = values.borrow();
                    let index = list_index(values.len(), index)?;
                    let element = values[index].clone();
                    drop(values);
                    self.stack.push(element);
                },

                OpCode::Set => {
                    let list = self.pop()?;
                    let index = self.pop()?;
                    let value = self.pop()?;
                    let Value::List(values) = list else {
                        return Err(VmPanic::NotSubscriptable);
                    };
                    let Value::Int(index) = index else {
                        return Err(VmPanic::InvalidIndex);
                    };
                    let mut values = values.borrow_mut();
                    let index = list_index(values.len(), index)?;
                    values[index] = value;
                },

                OpCode::Apd => {
                    let list = self.pop()?;
                    let value = self.pop()?;
                    let Value::List(values) = list else {
                        return Err(VmPanic::NotSubscriptable);
                    };
                    values.borrow_mut().push(value);
                },

                OpCode::Lpp => {
                    let list = self.pop()?;
                    let index = self.pop()?;
                    let Value::List(values) = list else {
                        return Err(VmPanic::NotSubscriptable);
                    };
                    let Value::Int(index) = index else {
                        return Err(VmPanic::InvalidIndex);
                    };
                    let mut values = values.borrow_mut();
                    let index = list_index(values.len(), index)?;
                    values.remove(index);
                },

                OpCode::Len => {
                    let value = self.pop()?;
                    let length = match &value {
                        Value::List(values) => values.borrow().len(),
                        Value::Str(value) => value.chars().count(),
                        _ => return Err(VmPanic::NoLength),
                    };
                    self.stack.push(Value::Int(length as i64));
                },

                OpCode::Cpy => {
                    let value = self.pop()?;
                    let copy = match &value {
                        Value::List(values) => Value::list(values.borrow().clone()),
                        other => other.clone(),
                    };
                    self.stack.push(copy);
                },

                OpCode::Typ => {
                    let value = self.pop()?;
                    self.stack.push(Value::string(value.type_name()));
                },

                OpCode::Fop => self.file_open()?,
                OpCode::Fwt => self.file_write()?,
                OpCode::Frd => self.file_read()?,
                OpCode::Frl => self.file_read_line()?,
                OpCode::Fcl => self.file_close()?,

                OpCode::Pos => {
                    let file = self.fetch_i32()?;
                    let line = self.fetch_i32()?;
                    let name = self.fetch_i32()?;
                    self.position = Some((file, line));
                    if name >= 0 {
                        self.pending_call = Some(CallInfo { file, line, name });
                    }
                },
            }
        }
    }

    /// The current `<file>:<line>` prefix for panic messages, when the
    /// image carried position annotations.
    pub fn position_string(&self) -> Option<String> {
        let (file, line) = self.position?;
        let file = self.data.get(usize::try_from(file).ok()?)?;
        Some(format!("{}:{}", file, line))
    }

    /// The call-stack trace, innermost call first. Frames without debug
    /// info are skipped.
    pub fn backtrace(&self) -> Vec<String> {
        self.call_stack
            .iter()
            .rev()
            .filter_map(|frame| {
                let info = frame.call?;
                let file = self.data.get(usize::try_from(info.file).ok()?)?;
                let name = self.data.get(usize::try_from(info.name).ok()?)?;
                Some(format!("{}:{}: call function {}", file, info.line, name))
            })
            .collect()
    }

    fn fetch_byte(&mut self) -> Result<u8, VmPanic> {
        let byte = self.code.get(self.pc).copied().ok_or(VmPanic::UnexpectedEnd)?;
        self.pc += 1;
        Ok(byte)
    }

    fn fetch_i32(&mut self) -> Result<i32, VmPanic> {
        let bytes = self
            .code
            .get(self.pc..self.pc + 4)
            .ok_or(VmPanic::UnexpectedEnd)?;
        let mut buffer = [0u8; 4];
        buffer.copy_from_slice(bytes);
        self.pc += 4;
        Ok(i32::from_be_bytes(buffer))
    }

    fn fetch_f64(&mut self) -> Result<f64, VmPanic> {
        let bytes = self
            .code
            .get(self.pc..self.pc + 8)
            .ok_or(VmPanic::UnexpectedEnd)?;
        let mut buffer = [0u8; 8];
        buffer.copy_from_slice(bytes);
        self.pc += 8;
        Ok(f64::from_be_bytes(buffer))
    }

    fn jump(&mut self, target: i32) -> Result<(), VmPanic> {
        let target_usize =
            usize::try_from(target).map_err(|_| VmPanic::InvalidAddress(target))?;
        if target_usize > self.code.len() {
            return Err(VmPanic::InvalidAddress(target));
        }
        self.pc = target_usize;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, VmPanic> {
        self.stack.pop().ok_or(VmPanic::StackUnderflow)
    }

    fn top_scope(&self) -> &Scope {
        self.scopes.last().expect("scope stack is never empty")
    }

    fn top_scope_mut(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack is never empty")
    }

    fn lookup(&self, index: i32) -> Result<usize, VmPanic> {
        match self.top_scope().bindings.get(&index) {
            Some(&address) => Ok(address),
            None => {
                let name = self.data_str(index).unwrap_or("?").to_string();
                Err(VmPanic::UndefinedVariable(name))
            },
        }
    }

    fn data_str(&self, index: i32) -> Result<&str, VmPanic> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.data.get(i))
            .map(String::as_str)
            .ok_or(VmPanic::InvalidDataIndex(index))
    }

    fn step_top(&mut self, delta: i64) -> Result<(), VmPanic> {
        let top = self.stack.last_mut().ok_or(VmPanic::StackUnderflow)?;
        match top {
            Value::Int(value) => *value = value.wrapping_add(delta),
            Value::Float(value) => *value += delta as f64,
            other => return Err(VmPanic::IllegalUnaryOperation(other.type_name())),
        }
        Ok(())
    }

    fn flush(&mut self) {
        let _ = self.output.flush();
    }

    fn file_open(&mut self) -> Result<(), VmPanic> {
        let path = self.pop()?;
        let mode = self.pop()?;

        let Value::Str(path) = path else {
            return Err(VmPanic::Io("fopen path must be a string".to_string()));
        };
        let Value::Str(mode) = mode else {
            return Err(VmPanic::InvalidFileMode(mode.to_string()));
        };

        let state = match mode.as_str() {
            "r" => File::open(path.as_str()).map(|f| FileState::Read(BufReader::new(f))),
            "w" => File::create(path.as_str()).map(FileState::Write),
            "a" => OpenOptions::new()
                .append(true)
                .create(true)
                .open(path.as_str())
                .map(FileState::Write),
            other => return Err(VmPanic::InvalidFileMode(other.to_string())),
        };

        match state {
            // A file that cannot be opened yields nil, not a panic.
            Err(_) => self.stack.push(Value::Nil),
            Ok(state) => self.stack.push(Value::File(Rc::new(FileHandle::new(
                path.to_string(),
                state,
            )))),
        }

        Ok(())
    }

    fn file_write(&mut self) -> Result<(), VmPanic> {
        let file = self.pop()?;
        let text = self.pop()?;

        let Value::File(handle) = file else {
            return Err(VmPanic::NotWritable);
        };
        let mut state = handle.state().borrow_mut();
        let FileState::Write(file) = &mut *state else {
            return Err(VmPanic::NotWritable);
        };

        file.write_all(text.to_string().as_bytes())
            .map_err(|e| VmPanic::Io(e.to_string()))
    }

    fn file_read(&mut self) -> Result<(), VmPanic> {
        let file = self.pop()?;

        let Value::File(handle) = file else {
            return Err(VmPanic::NotReadable);
        };
        let mut state = handle.state().borrow_mut();
        let FileState::Read(reader) = &mut *state else {
            return Err(VmPanic::NotReadable);
        };

        let mut content = String::new();
        reader
            .read_to_string(&mut content)
            .map_err(|e| VmPanic::Io(e.to_string()))?;
        drop(state);

        self.stack.push(Value::string(content));
        Ok(())
    }

    fn file_read_line(&mut self) -> Result<(), VmPanic> {
        let file = self.pop()?;

        let Value::File(handle) = file else {
            return Err(VmPanic::NotReadable);
        };
        let mut state = handle.state().borrow_mut();
        let FileState::Read(reader) = &mut *state else {
            return Err(VmPanic::NotReadable);
        };

        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .map_err(|e| VmPanic::Io(e.to_string()))?;
        drop(state);

        if read == 0 {
            self.stack.push(Value::Nil);
        } else {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            self.stack.push(Value::string(line));
        }
        Ok(())
    }

    fn file_close(&mut self) -> Result<(), VmPanic> {
        let file = self.pop()?;
        let Value::File(handle) = file else {
            return Err(VmPanic::NotReadable);
        };
        *handle.state().borrow_mut() = FileState::Closed;
        Ok(())
    }
}

/// Normalize a (possibly negative) subscript against a list length.
fn list_index(len: usize, index: i64) -> Result<usize, VmPanic> {
    let normalized = if index < 0 { index + len as i64 } else { index };
    if normalized < 0 || normalized >= len as i64 {
        Err(VmPanic::IndexOutOfRange)
    } else {
        Ok(normalized as usize)
    }
}

/// Apply a binary operator to two popped values.
fn apply_binary(op: OpCode, left: Value, right: Value) -> Result<Value, VmPanic> {
    use Value::{Float, Int, List, Str};

    let illegal = |left: &Value, right: &Value| VmPanic::IllegalOperation {
        left: left.type_name(),
        right: right.type_name(),
    };

    Ok(match op {
        OpCode::Add => match (&left, &right) {
            (Int(a), Int(b)) => Int(a.wrapping_add(*b)),
            (Float(a), Float(b)) => Float(a + b),
            (Int(a), Float(b)) => Float(*a as f64 + b),
            (Float(a), Int(b)) => Float(a + *b as f64),
            (Str(a), Str(b)) => Value::string(format!("{}{}", a, b)),
            (List(a), List(b)) => {
                let mut values = a.borrow().clone();
                values.extend(b.borrow().iter().cloned());
                Value::list(values)
            },
            _ => return Err(illegal(&left, &right)),
        },

        OpCode::Sub => match (&left, &right) {
            (Int(a), Int(b)) => Int(a.wrapping_sub(*b)),
            (Float(a), Float(b)) => Float(a - b),
            (Int(a), Float(b)) => Float(*a as f64 - b),
            (Float(a), Int(b)) => Float(a - *b as f64),
            _ => return Err(illegal(&left, &right)),
        },

        OpCode::Mul => match (&left, &right) {
            (Int(a), Int(b)) => Int(a.wrapping_mul(*b)),
            (Float(a), Float(b)) => Float(a * b),
            (Int(a), Float(b)) => Float(*a as f64 * b),
            (Float(a), Int(b)) => Float(a * *b as f64),
            _ => return Err(illegal(&left, &right)),
        },

        // True division: numeric operands produce a float.
        OpCode::Div => {
            let (a, b) = match (&left, &right) {
                (Int(a), Int(b)) => (*a as f64, *b as f64),
                (Float(a), Float(b)) => (*a, *b),
                (Int(a), Float(b)) => (*a as f64, *b),
                (Float(a), Int(b)) => (*a, *b as f64),
                _ => return Err(illegal(&left, &right)),
            };
            if b == 0.0 {
                return Err(VmPanic::DivisionByZero);
            }
            Float(a / b)
        },

        OpCode::Eq => Int(i64::from(left.loose_eq(&right))),
        OpCode::Ne => Int(i64::from(!left.loose_eq(&right))),

        OpCode::Lt | OpCode::Le | OpCode::Gt | OpCode::Ge => {
            let ordering = match (&left, &right) {
                (Int(a), Int(b)) => a.partial_cmp(b),
                (Float(a), Float(b)) => a.partial_cmp(b),
                (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
                (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
                (Str(a), Str(b)) => a.partial_cmp(b),
                _ => return Err(illegal(&left, &right)),
            };
            let Some(ordering) = ordering else {
                // NaN comparisons are simply false.
                return Ok(Int(0));
            };
            let holds = match op {
                OpCode::Lt => ordering.is_lt(),
                OpCode::Le => ordering.is_le(),
                OpCode::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            Int(i64::from(holds))
        },

        OpCode::And => Int(i64::from(left.is_truthy() && right.is_truthy())),
        OpCode::Or => Int(i64::from(left.is_truthy() || right.is_truthy())),

        OpCode::Xor | OpCode::Bor | OpCode::Bnd => match (&left, &right) {
            (Int(a), Int(b)) => match op {
                OpCode::Xor => Int(a ^ b),
                OpCode::Bor => Int(a | b),
                _ => Int(a & b),
            },
            _ => return Err(illegal(&left, &right)),
        },

        OpCode::Shl | OpCode::Shr => match (&left, &right) {
            (Int(a), Int(b)) => {
                if *b < 0 {
                    return Err(VmPanic::NegativeShift);
                }
                if op == OpCode::Shl {
                    if *b >= 64 {
                        Int(0)
                    } else {
                        Int(a.wrapping_shl(*b as u32))
                    }
                } else if *b >= 64 {
                    Int(a >> 63)
                } else {
                    Int(a >> b)
                }
            },
            _ => return Err(illegal(&left, &right)),
        },

        _ => unreachable!("not a binary opcode: {:?}", op),
    })
}
