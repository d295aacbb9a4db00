//! Bytecode converter (C6): rewrites raw EVM bytes into the fixed-width
//! `Instruction` stream the dispatch loop (C8) runs, resolving PUSH
//! immediates, static jump targets, and (optionally) fusing peephole
//! super-instruction windows (§4.1).
//!
//! The teacher has no equivalent pass: `instruction_table.rs` dispatches
//! directly off raw bytecode bytes, and `instructions::control::jump`
//! validates targets against a `jumpdest` bitmap computed once per call.
//! This module is new, grounded in §4.1's algorithm outline and the
//! `jumpdest`-bitmap idea the teacher's `control.rs`/`interpreter.rs` already
//! uses (generalized here into a byte-offset-to-stream-index table so a
//! resolved JUMP can skip the bitmap check entirely).

use crate::opcode::OpCode;

/// Pseudo-tags outside the raw opcode byte range (0..=255).
pub mod tag {
    pub const DATA: u16 = 0x100;
    pub const NOOP: u16 = 0x101;
    pub const JUMP_RESOLVED: u16 = 0x102;
    pub const JUMPI_RESOLVED: u16 = 0x103;

    pub const PUSH1_ADD: u16 = 0x110;
    pub const PUSH1_SHL: u16 = 0x111;
    pub const POP_JUMP: u16 = 0x112;
    pub const AND_SWAP1_POP_SWAP2_SWAP1: u16 = 0x113;
    pub const PUSH1_PUSH1_PUSH1_SHL_SUB: u16 = 0x114;
    pub const SWAP2_SWAP1_POP_JUMP: u16 = 0x115;
    pub const PUSH1_PUSH4_DUP3: u16 = 0x116;
    pub const SWAP1_POP_SWAP2_SWAP1: u16 = 0x117;
    pub const ISZERO_PUSH2_JUMPI: u16 = 0x118;
}

/// One slot of the converted stream: `opcode_tag` selects the handler,
/// `arg16` carries an immediate (PUSH literal half, resolved jump target, or
/// a super-instruction parameter) per §3's "Converted code" data model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub tag: u16,
    pub arg16: u16,
}

impl Instruction {
    const fn new(tag: u16, arg16: u16) -> Self {
        Self { tag, arg16 }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("code length {0} exceeds the maximum representable converted stream")]
    CodeTooLarge(usize),
}

/// The immutable result of converting one contract's bytecode (§3's
/// "Converted code").
#[derive(Clone, Debug)]
pub struct ConvertedCode {
    pub instructions: Vec<Instruction>,
    /// `byte_offset_to_stream_index[b]` is the stream index for the
    /// instruction starting at original byte `b`, if `b` is a `JUMPDEST`;
    /// `None` otherwise (including mid-PUSH-literal bytes and non-JUMPDEST
    /// opcodes) — only JUMPDESTs are ever legal jump targets (§3).
    pub byte_offset_to_stream_index: Vec<Option<u32>>,
    /// `stream_index_to_byte_offset[s]` is the original bytecode byte offset
    /// the instruction at stream index `s` started at, needed to reconstruct
    /// `PC`'s answer (§3's "Converted code" carries no byte offsets itself,
    /// but `PC` pushes the *original* program counter, not the stream index).
    pub stream_index_to_byte_offset: Vec<u32>,
}

impl ConvertedCode {
    /// Resolve a dynamic JUMP/JUMPI target (a popped stack word, already
    /// range-checked by the caller against `usize`) to a stream index, or
    /// `None` if it does not land on a JUMPDEST.
    pub fn resolve_dynamic_target(&self, byte_offset: usize) -> Option<u32> {
        self.byte_offset_to_stream_index.get(byte_offset).copied().flatten()
    }
}

struct Window<'a> {
    tags: &'a [u16],
    fused: u16,
}

const MAX_WINDOW: usize = 5;

fn windows() -> [Window<'static>; 9] {
    [
        Window { tags: &[OpCode::PUSH1.to_u8() as u16, OpCode::ADD.to_u8() as u16], fused: tag::PUSH1_ADD },
        Window { tags: &[OpCode::PUSH1.to_u8() as u16, OpCode::SHL.to_u8() as u16], fused: tag::PUSH1_SHL },
        Window { tags: &[OpCode::POP.to_u8() as u16, OpCode::JUMP.to_u8() as u16], fused: tag::POP_JUMP },
        Window {
            tags: &[
                OpCode::AND.to_u8() as u16,
                OpCode::SWAP1.to_u8() as u16,
                OpCode::POP.to_u8() as u16,
                OpCode::SWAP2.to_u8() as u16,
                OpCode::SWAP1.to_u8() as u16,
            ],
            fused: tag::AND_SWAP1_POP_SWAP2_SWAP1,
        },
        Window {
            tags: &[
                OpCode::PUSH1.to_u8() as u16,
                OpCode::PUSH1.to_u8() as u16,
                OpCode::PUSH1.to_u8() as u16,
                OpCode::SHL.to_u8() as u16,
                OpCode::SUB.to_u8() as u16,
            ],
            fused: tag::PUSH1_PUSH1_PUSH1_SHL_SUB,
        },
        Window {
            tags: &[
                OpCode::SWAP2.to_u8() as u16,
                OpCode::SWAP1.to_u8() as u16,
                OpCode::POP.to_u8() as u16,
                OpCode::JUMP.to_u8() as u16,
            ],
            fused: tag::SWAP2_SWAP1_POP_JUMP,
        },
        Window {
            tags: &[OpCode::PUSH1.to_u8() as u16, OpCode::PUSH4.to_u8() as u16, OpCode::DUP3.to_u8() as u16],
            fused: tag::PUSH1_PUSH4_DUP3,
        },
        Window {
            tags: &[
                OpCode::SWAP1.to_u8() as u16,
                OpCode::POP.to_u8() as u16,
                OpCode::SWAP2.to_u8() as u16,
                OpCode::SWAP1.to_u8() as u16,
            ],
            fused: tag::SWAP1_POP_SWAP2_SWAP1,
        },
        Window {
            tags: &[OpCode::ISZERO.to_u8() as u16, OpCode::PUSH2.to_u8() as u16, OpCode::JUMPI.to_u8() as u16],
            fused: tag::ISZERO_PUSH2_JUMPI,
        },
    ]
}

/// Convert raw bytecode into its internal instruction stream (§4.1).
pub fn convert(code: &[u8], enable_super_instructions: bool) -> Result<ConvertedCode, ConversionError> {
    if code.len() > u32::MAX as usize {
        return Err(ConversionError::CodeTooLarge(code.len()));
    }

    let mut instructions = Vec::with_capacity(code.len());
    let mut byte_offset_to_stream_index = vec![None; code.len() + 1];
    let mut stream_index_to_byte_offset = Vec::with_capacity(code.len());

    // Step 1-2: linear scan, packing PUSH literals and recording JUMPDESTs.
    let mut i = 0usize;
    while i < code.len() {
        let stream_index = instructions.len() as u32;
        let op = OpCode::from(code[i]);

        if op == OpCode::JUMPDEST {
            byte_offset_to_stream_index[i] = Some(stream_index);
        }

        if op.is_push() {
            let n = op.push_size();
            let lit = read_push_literal(code, i + 1, n);
            // Left-pad with a zero byte when `n` is odd so the literal splits
            // evenly into 16-bit big-endian chunks with no value shift: the
            // padding always lands at the literal's most-significant end,
            // never between real bytes.
            let padded: Vec<u8> = if n % 2 == 1 {
                let mut v = Vec::with_capacity(n + 1);
                v.push(0);
                v.extend_from_slice(&lit);
                v
            } else {
                lit
            };
            let mut chunks = padded.chunks(2);
            instructions.push(Instruction::new(op.to_u8() as u16, pack_be16(chunks.next().unwrap_or(&[]))));
            stream_index_to_byte_offset.push(i as u32);
            for chunk in chunks {
                instructions.push(Instruction::new(tag::DATA, pack_be16(chunk)));
                stream_index_to_byte_offset.push(i as u32);
            }
            i += 1 + n;
            continue;
        }

        instructions.push(Instruction::new(op.to_u8() as u16, 0));
        stream_index_to_byte_offset.push(i as u32);
        i += 1;
    }

    // Step 4: resolve statically-determinable jump targets (PUSH<=2 bytes
    // immediately followed by JUMP/JUMPI, with nothing else in between).
    let mut idx = 0usize;
    while idx < instructions.len() {
        let op = OpCode(instructions[idx].tag as u8);
        if instructions[idx].tag <= 0xff && op.is_push() && op.push_size() <= 2 {
            let next = idx + 1;
            if next < instructions.len() {
                let next_tag = instructions[next].tag;
                let target_offset = instructions[idx].arg16 as usize;
                let resolved = byte_offset_to_stream_index
                    .get(target_offset)
                    .copied()
                    .flatten()
                    .and_then(|stream_idx| u16::try_from(stream_idx).ok());
                if let Some(resolved_idx) = resolved {
                    if next_tag == OpCode::JUMP.to_u8() as u16 {
                        instructions[next] = Instruction::new(tag::JUMP_RESOLVED, resolved_idx);
                    } else if next_tag == OpCode::JUMPI.to_u8() as u16 {
                        instructions[next] = Instruction::new(tag::JUMPI_RESOLVED, resolved_idx);
                    }
                }
            }
        }
        idx += 1;
    }

    // Step 5: optional super-instruction peephole fusion.
    if enable_super_instructions {
        fuse_super_instructions(&mut instructions, &byte_offset_to_stream_index);
    }

    Ok(ConvertedCode { instructions, byte_offset_to_stream_index, stream_index_to_byte_offset })
}

fn read_push_literal(code: &[u8], start: usize, n: usize) -> Vec<u8> {
    let mut lit = vec![0u8; n];
    let available = code.len().saturating_sub(start).min(n);
    lit[..available].copy_from_slice(&code[start..start + available]);
    lit
}

fn pack_be16(bytes: &[u8]) -> u16 {
    match bytes.len() {
        0 => 0,
        1 => u16::from_be_bytes([bytes[0], 0]),
        _ => u16::from_be_bytes([bytes[0], bytes[1]]),
    }
}

/// Window slot count a fused pattern occupies in the *converted stream*
/// (accounting for PUSH opcodes whose literal spilled into trailing `DATA`
/// slots), given the window's raw opcode tags.
fn window_stream_len(tags: &[u16]) -> usize {
    tags.iter()
        .map(|&t| {
            if t <= 0xff {
                let op = OpCode(t as u8);
                if op.is_push() {
                    return (op.push_size() + 1) / 2;
                }
            }
            1
        })
        .sum()
}

fn fuse_super_instructions(instructions: &mut [Instruction], jumpdests: &[Option<u32>]) {
    let patterns = windows();
    let mut pc = 0usize;
    'outer: while pc < instructions.len() {
        for window in &patterns {
            let len = window_stream_len(window.tags);
            if len > MAX_WINDOW + 1 || pc + window.tags.len() > instructions.len() {
                continue;
            }
            if !matches_window(instructions, pc, window.tags) {
                continue;
            }
            // Defensive per §9: never fuse across a JUMPDEST that a dynamic
            // jump could target other than the window's own first slot.
            if interior_has_jumpdest(pc, len, jumpdests) {
                continue;
            }
            let first_arg = instructions[pc].arg16;
            instructions[pc] = Instruction::new(window.fused, first_arg);
            pc += len;
            continue 'outer;
        }
        pc += instruction_stream_len(instructions, pc);
    }
}

fn matches_window(instructions: &[Instruction], start: usize, tags: &[u16]) -> bool {
    let mut i = start;
    for &want in tags {
        if i >= instructions.len() || instructions[i].tag != want {
            return false;
        }
        i += instruction_stream_len(instructions, i);
    }
    true
}

fn instruction_stream_len(instructions: &[Instruction], idx: usize) -> usize {
    let tag = instructions[idx].tag;
    if tag <= 0xff {
        let op = OpCode(tag as u8);
        if op.is_push() {
            return (op.push_size() + 1) / 2;
        }
    }
    1
}

fn interior_has_jumpdest(pc: usize, len: usize, jumpdests: &[Option<u32>]) -> bool {
    jumpdests.iter().flatten().any(|&j| {
        let j = j as usize;
        j > pc && j < pc + len
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push1_push0_sload_add_push0_sstore_stop_converts_one_to_one() {
        // PUSH1 1, PUSH1 0, SLOAD, ADD, PUSH1 0, SSTORE, STOP.
        let code = [0x60, 0x01, 0x60, 0x00, 0x54, 0x01, 0x60, 0x00, 0x55, 0x00];
        let converted = convert(&code, false).unwrap();
        assert_eq!(converted.instructions.len(), 7);
        assert_eq!(converted.instructions[0].tag, OpCode::PUSH1.to_u8() as u16);
        assert_eq!(converted.instructions[0].arg16, 1);
        assert_eq!(converted.instructions[6].tag, OpCode::STOP.to_u8() as u16);
    }

    #[test]
    fn push32_emits_one_push_plus_fifteen_data_slots() {
        let mut code = vec![0x7f]; // PUSH32
        code.extend_from_slice(&[0xAAu8; 32]);
        let converted = convert(&code, false).unwrap();
        assert_eq!(converted.instructions.len(), 16);
        assert!(converted.instructions[1..].iter().all(|i| i.tag == tag::DATA));
    }

    #[test]
    fn truncated_push_zero_pads() {
        let code = [0x61, 0x01]; // PUSH2 with only one literal byte present
        let converted = convert(&code, false).unwrap();
        assert_eq!(converted.instructions[0].arg16, 0x0100);
    }

    #[test]
    fn jumpdest_recorded_and_static_jump_resolved() {
        // PUSH1 4, JUMP, INVALID, JUMPDEST, STOP
        let code = [0x60, 0x04, 0x56, 0xfe, 0x5b, 0x00];
        let converted = convert(&code, false).unwrap();
        assert_eq!(converted.byte_offset_to_stream_index[4], Some(3));
        assert_eq!(converted.instructions[1].tag, tag::JUMP_RESOLVED);
        assert_eq!(converted.instructions[1].arg16, 3);
    }

    #[test]
    fn bad_jump_target_is_left_dynamic_and_unresolved() {
        // PUSH1 200, JUMP with code shorter than 200: not resolved statically.
        let code = [0x60, 0xC8, 0x56];
        let converted = convert(&code, false).unwrap();
        assert_eq!(converted.instructions[1].tag, OpCode::JUMP.to_u8() as u16);
    }

    #[test]
    fn super_instruction_fusion_collapses_push1_add() {
        // The window's first slot is retagged in place; its remaining slots
        // stay in the stream untouched so byte-offset-to-stream-index stays
        // valid, and the fused handler's pc skips over them (§9).
        let code = [0x60, 0x05, 0x01]; // PUSH1 5, ADD
        let converted = convert(&code, true).unwrap();
        assert_eq!(converted.instructions.len(), 2);
        assert_eq!(converted.instructions[0].tag, tag::PUSH1_ADD);
        assert_eq!(converted.instructions[0].arg16, 5);
        assert_eq!(converted.instructions[1].tag, OpCode::ADD.to_u8() as u16);
    }

    #[test]
    fn fusion_disabled_keeps_instructions_separate() {
        let code = [0x60, 0x05, 0x01];
        let converted = convert(&code, false).unwrap();
        assert_eq!(converted.instructions.len(), 2);
    }
}
