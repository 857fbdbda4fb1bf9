//! Stack-based bytecode VM for submitted strategies.
//!
//! A program is a data-described decision procedure: the same bytes are
//! interpreted identically on every worker, so a strategy can be shipped
//! anywhere as plain data. Programs are at most 256 bytes, run on a fixed
//! 16-slot `u32` stack and only jump forward, so every execution ends after
//! at most one pass over the bytecode.
//!
//! Runtime errors are reported as [`StrategyFault`]s, never coerced into a move.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::random::SeededRng;
use crate::strategy::{Decide, Decision, Move, StrategyFault};

// ── Constants ────────────────────────────────────────────────────────

/// Maximum bytecode program length in bytes.
pub const MAX_BYTECODE_LEN: usize = 256;

/// Stack depth (fixed array, no heap).
const STACK_SIZE: usize = 16;

// ── Opcodes ──────────────────────────────────────────────────────────

pub mod op {
    pub const COOP: u8 = 0x00;
    pub const PUSH: u8 = 0x01;
    pub const OPP_LAST: u8 = 0x02;
    pub const MY_LAST: u8 = 0x03;
    pub const OPP_N: u8 = 0x04;
    pub const MY_N: u8 = 0x05;
    pub const OPP_DEFECTS: u8 = 0x06;
    pub const MY_DEFECTS: u8 = 0x07;
    pub const ROUND: u8 = 0x08;
    pub const RAND: u8 = 0x09;
    pub const ADD: u8 = 0x0A;
    pub const SUB: u8 = 0x0B;
    pub const MUL: u8 = 0x0C;
    pub const GT: u8 = 0x0D;
    pub const LT: u8 = 0x0E;
    pub const EQ: u8 = 0x0F;
    pub const NOT: u8 = 0x10;
    pub const AND: u8 = 0x11;
    pub const OR: u8 = 0x12;
    pub const DUP: u8 = 0x13;
    pub const JMP_FWD: u8 = 0x14;
    pub const JMP_FWD_IF: u8 = 0x15;
    pub const DEFECT: u8 = 0x16;
    pub const XOR: u8 = 0x17;
    pub const RETURN: u8 = 0x18;
    pub const PLAN: u8 = 0x19;
    pub const FAULT: u8 = 0x1A;
    pub const APPEND_MY: u8 = 0x1B;
    pub const APPEND_OPP: u8 = 0x1C;
}

/// Mnemonic table used by the assembler.
const MNEMONICS: &[(&str, u8)] = &[
    ("COOP", op::COOP),
    ("PUSH", op::PUSH),
    ("OPP_LAST", op::OPP_LAST),
    ("MY_LAST", op::MY_LAST),
    ("OPP_N", op::OPP_N),
    ("MY_N", op::MY_N),
    ("OPP_DEFECTS", op::OPP_DEFECTS),
    ("MY_DEFECTS", op::MY_DEFECTS),
    ("ROUND", op::ROUND),
    ("RAND", op::RAND),
    ("ADD", op::ADD),
    ("SUB", op::SUB),
    ("MUL", op::MUL),
    ("GT", op::GT),
    ("LT", op::LT),
    ("EQ", op::EQ),
    ("NOT", op::NOT),
    ("AND", op::AND),
    ("OR", op::OR),
    ("DUP", op::DUP),
    ("JMP_FWD", op::JMP_FWD),
    ("JMP_FWD_IF", op::JMP_FWD_IF),
    ("DEFECT", op::DEFECT),
    ("XOR", op::XOR),
    ("RETURN", op::RETURN),
    ("PLAN", op::PLAN),
    ("FAULT", op::FAULT),
    ("APPEND_MY", op::APPEND_MY),
    ("APPEND_OPP", op::APPEND_OPP),
];

fn has_immediate(opcode: u8) -> bool {
    matches!(opcode, op::PUSH | op::JMP_FWD | op::JMP_FWD_IF)
}

// ── Validation ───────────────────────────────────────────────────────

/// Errors that can occur during bytecode validation.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BytecodeError {
    #[error("bytecode is empty")]
    Empty,
    #[error("bytecode exceeds {} bytes", MAX_BYTECODE_LEN)]
    TooLong,
    #[error("unknown opcode 0x{opcode:02X} at offset {offset}")]
    UnknownOpcode { offset: usize, opcode: u8 },
    #[error("truncated immediate at offset {offset}")]
    TruncatedImmediate { offset: usize },
    #[error("forward jump out of bounds at offset {offset}")]
    JumpOutOfBounds { offset: usize },
    #[error("no terminal instruction (COOP/DEFECT/RETURN/PLAN/FAULT)")]
    NoTerminal,
}

/// Validate bytecode before it is admitted.
///
/// Checks:
/// - Non-empty, at most `MAX_BYTECODE_LEN` bytes
/// - All opcodes are known
/// - All immediates are present (not truncated)
/// - All forward jumps land within bounds
/// - At least one terminal instruction exists
pub fn validate_bytecode(bytecode: &[u8]) -> Result<(), BytecodeError> {
    if bytecode.is_empty() {
        return Err(BytecodeError::Empty);
    }
    if bytecode.len() > MAX_BYTECODE_LEN {
        return Err(BytecodeError::TooLong);
    }

    let mut pc = 0usize;
    let mut has_terminal = false;

    while pc < bytecode.len() {
        let opcode = bytecode[pc];
        match opcode {
            op::COOP | op::DEFECT | op::RETURN | op::PLAN | op::FAULT => {
                has_terminal = true;
                pc += 1;
            }
            op::PUSH => {
                if pc + 1 >= bytecode.len() {
                    return Err(BytecodeError::TruncatedImmediate { offset: pc });
                }
                pc += 2;
            }
            op::JMP_FWD | op::JMP_FWD_IF => {
                if pc + 1 >= bytecode.len() {
                    return Err(BytecodeError::TruncatedImmediate { offset: pc });
                }
                let offset = bytecode[pc + 1] as usize;
                let target = pc + 2 + offset;
                if target > bytecode.len() {
                    return Err(BytecodeError::JumpOutOfBounds { offset: pc });
                }
                pc += 2;
            }
            op::OPP_LAST | op::MY_LAST | op::OPP_N | op::MY_N |
            op::OPP_DEFECTS | op::MY_DEFECTS | op::ROUND | op::RAND |
            op::ADD | op::SUB | op::MUL | op::GT | op::LT | op::EQ |
            op::NOT | op::AND | op::OR | op::XOR | op::DUP |
            op::APPEND_MY | op::APPEND_OPP => {
                pc += 1;
            }
            _ => {
                return Err(BytecodeError::UnknownOpcode { offset: pc, opcode });
            }
        }
    }

    if !has_terminal {
        return Err(BytecodeError::NoTerminal);
    }

    Ok(())
}

// ── Programs ─────────────────────────────────────────────────────────

/// Errors from [`Program::assemble`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("unknown mnemonic `{token}`")]
    UnknownMnemonic { token: String },
    #[error("`{mnemonic}` expects an immediate operand")]
    MissingImmediate { mnemonic: String },
    #[error("`{token}` is not an immediate in 0..=255")]
    BadImmediate { token: String },
    #[error(transparent)]
    Invalid(#[from] BytecodeError),
}

/// A bytecode strategy program
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program(Vec<u8>);

impl Program {
    /// Validated program
    pub fn new(bytecode: Vec<u8>) -> Result<Self, BytecodeError> {
        validate_bytecode(&bytecode)?;
        Ok(Self(bytecode))
    }

    /// Unchecked program; callers run [`Program::validate`] before trusting it.
    pub fn from_raw(bytecode: Vec<u8>) -> Self {
        Self(bytecode)
    }

    /// Assemble whitespace-separated mnemonics, e.g. `"OPP_LAST RETURN"`.
    ///
    /// `PUSH`, `JMP_FWD` and `JMP_FWD_IF` take a decimal byte operand.
    /// `#` starts a comment that runs to the end of the line.
    pub fn assemble(source: &str) -> Result<Self, AssembleError> {
        let mut bytecode = Vec::new();
        let mut tokens = source
            .lines()
            .map(|line| line.split('#').next().unwrap_or(""))
            .flat_map(str::split_whitespace);

        while let Some(token) = tokens.next() {
            let upper = token.to_ascii_uppercase();
            let opcode = MNEMONICS
                .iter()
                .find(|(name, _)| *name == upper)
                .map(|(_, opcode)| *opcode)
                .ok_or_else(|| AssembleError::UnknownMnemonic { token: token.to_string() })?;
            bytecode.push(opcode);

            if has_immediate(opcode) {
                let operand = tokens
                    .next()
                    .ok_or_else(|| AssembleError::MissingImmediate { mnemonic: upper.clone() })?;
                let value = operand
                    .parse::<u8>()
                    .map_err(|_| AssembleError::BadImmediate { token: operand.to_string() })?;
                bytecode.push(value);
            }
        }

        Ok(Self::new(bytecode)?)
    }

    pub fn bytecode(&self) -> &[u8] {
        &self.0
    }

    pub fn validate(&self) -> Result<(), BytecodeError> {
        validate_bytecode(&self.0)
    }
}

impl Decide for Program {
    fn decide(
        &self,
        own: &mut Vec<Move>,
        opponent: &mut Vec<Move>,
        round: u32,
        rng: &mut SeededRng,
    ) -> Result<Decision, StrategyFault> {
        execute_bytecode(&self.0, own, opponent, round, rng)
    }
}

// ── Execution ────────────────────────────────────────────────────────

/// Execute a bytecode program and return its decision.
///
/// `APPEND_MY` / `APPEND_OPP` write into the supplied histories; the caller
/// is expected to hand over scratch copies and check them afterwards.
pub fn execute_bytecode(
    bytecode: &[u8],
    my_history: &mut Vec<Move>,
    opponent_history: &mut Vec<Move>,
    round: u32,
    rng: &mut SeededRng,
) -> Result<Decision, StrategyFault> {
    let mut stack = [0u32; STACK_SIZE];
    let mut sp: usize = 0; // stack pointer (next empty slot)
    let mut pc: usize = 0;

    while pc < bytecode.len() {
        let opcode = bytecode[pc];
        let at = pc;
        match opcode {
            op::COOP => return Ok(Decision::Move(Move::Cooperate)),
            op::DEFECT => return Ok(Decision::Move(Move::Defect)),

            op::RETURN => {
                let v = pop(&mut stack, &mut sp, at)?;
                return Ok(Decision::Move(to_move(v)?));
            }

            op::PLAN => {
                // plan length is checked by `Decision::checked`
                let n = pop(&mut stack, &mut sp, at)? as usize;
                if n > sp {
                    return Err(StrategyFault::StackUnderflow { offset: at });
                }
                // values were pushed in play order
                let moves = stack[sp - n..sp]
                    .iter()
                    .map(|&v| to_move(v))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(Decision::Plan(moves));
            }

            op::FAULT => {
                return Err(StrategyFault::Raised {
                    message: format!("FAULT at offset {}", at),
                });
            }

            op::PUSH => {
                let imm = *bytecode
                    .get(pc + 1)
                    .ok_or(StrategyFault::NoDecision)?;
                push(&mut stack, &mut sp, u32::from(imm), at)?;
                pc += 2;
            }

            op::OPP_LAST => {
                push(&mut stack, &mut sp, history_n_ago(opponent_history, 0), at)?;
                pc += 1;
            }

            op::MY_LAST => {
                push(&mut stack, &mut sp, history_n_ago(my_history, 0), at)?;
                pc += 1;
            }

            op::OPP_N => {
                let n = pop(&mut stack, &mut sp, at)? as usize;
                push(&mut stack, &mut sp, history_n_ago(opponent_history, n), at)?;
                pc += 1;
            }

            op::MY_N => {
                let n = pop(&mut stack, &mut sp, at)? as usize;
                push(&mut stack, &mut sp, history_n_ago(my_history, n), at)?;
                pc += 1;
            }

            op::OPP_DEFECTS => {
                push(&mut stack, &mut sp, count_defects(opponent_history), at)?;
                pc += 1;
            }

            op::MY_DEFECTS => {
                push(&mut stack, &mut sp, count_defects(my_history), at)?;
                pc += 1;
            }

            op::ROUND => {
                push(&mut stack, &mut sp, round, at)?;
                pc += 1;
            }

            op::RAND => {
                let v = u32::from(rng.next_percent());
                push(&mut stack, &mut sp, v, at)?;
                pc += 1;
            }

            op::ADD | op::SUB | op::MUL | op::GT | op::LT | op::EQ |
            op::AND | op::OR | op::XOR => {
                let b = pop(&mut stack, &mut sp, at)?;
                let a = pop(&mut stack, &mut sp, at)?;
                push(&mut stack, &mut sp, binary(opcode, a, b), at)?;
                pc += 1;
            }

            op::NOT => {
                let a = pop(&mut stack, &mut sp, at)?;
                push(&mut stack, &mut sp, u32::from(a == 0), at)?;
                pc += 1;
            }

            op::DUP => {
                let a = pop(&mut stack, &mut sp, at)?;
                push(&mut stack, &mut sp, a, at)?;
                push(&mut stack, &mut sp, a, at)?;
                pc += 1;
            }

            op::JMP_FWD => {
                let offset = *bytecode.get(pc + 1).ok_or(StrategyFault::NoDecision)? as usize;
                pc = pc + 2 + offset;
            }

            op::JMP_FWD_IF => {
                let cond = pop(&mut stack, &mut sp, at)?;
                let offset = *bytecode.get(pc + 1).ok_or(StrategyFault::NoDecision)? as usize;
                if cond != 0 {
                    pc = pc + 2 + offset;
                } else {
                    pc += 2;
                }
            }

            op::APPEND_MY => {
                let m = to_move(pop(&mut stack, &mut sp, at)?)?;
                my_history.push(m);
                pc += 1;
            }

            op::APPEND_OPP => {
                let m = to_move(pop(&mut stack, &mut sp, at)?)?;
                opponent_history.push(m);
                pc += 1;
            }

            _ => return Err(StrategyFault::UnknownOpcode { offset: at, opcode }),
        }
    }

    // Fell off the end without a terminal
    Err(StrategyFault::NoDecision)
}

fn binary(opcode: u8, a: u32, b: u32) -> u32 {
    match opcode {
        op::ADD => a.saturating_add(b),
        op::SUB => a.saturating_sub(b),
        op::MUL => a.saturating_mul(b),
        op::GT => u32::from(a > b),
        op::LT => u32::from(a < b),
        op::EQ => u32::from(a == b),
        op::AND => u32::from(a != 0 && b != 0),
        op::OR => u32::from(a != 0 || b != 0),
        _ => u32::from((a != 0) != (b != 0)), // XOR
    }
}

// ── Stack helpers ────────────────────────────────────────────────────

#[inline]
fn push(
    stack: &mut [u32; STACK_SIZE],
    sp: &mut usize,
    val: u32,
    offset: usize,
) -> Result<(), StrategyFault> {
    if *sp >= STACK_SIZE {
        return Err(StrategyFault::StackOverflow { offset });
    }
    stack[*sp] = val;
    *sp += 1;
    Ok(())
}

#[inline]
fn pop(stack: &mut [u32; STACK_SIZE], sp: &mut usize, offset: usize) -> Result<u32, StrategyFault> {
    if *sp == 0 {
        return Err(StrategyFault::StackUnderflow { offset });
    }
    *sp -= 1;
    Ok(stack[*sp])
}

#[inline]
fn to_move(value: u32) -> Result<Move, StrategyFault> {
    match value {
        0 => Ok(Move::Cooperate),
        1 => Ok(Move::Defect),
        value => Err(StrategyFault::NonBoolean { value }),
    }
}

// ── History helpers ──────────────────────────────────────────────────

/// 1 if the move `n` rounds back was a defection; 0 when there is no such move.
#[inline]
fn history_n_ago(history: &[Move], n: usize) -> u32 {
    if n >= history.len() {
        return 0;
    }
    u32::from(history[history.len() - 1 - n].is_defect())
}

#[inline]
fn count_defects(history: &[Move]) -> u32 {
    let count = history.iter().filter(|m| m.is_defect()).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

// ── Tests ────────────────────────────────────────────────────────────
