//! Baseline per-revision instruction table: static gas cost and stack-height
//! requirements for every raw opcode, indexed by [`OpCode`]. The dispatch
//! loop (C8) looks this up once per instruction for the pre-check in §4.2
//! rule 4, then applies any dynamic surcharge on top (memory expansion,
//! cold-access, copy cost, ...).
//!
//! Grounded on the teacher's `instructions/instruction_table.rs`
//! (`InstructionTableEntry`, `InstructionTables`, `OnceBox`-backed lazy
//! build), narrowed from ten revisions to three.

use once_cell::race::OnceBox;

use crate::{common::Revision, instructions::properties};

#[derive(Clone, Copy, Debug)]
pub struct InstructionTableEntry {
    pub gas_cost: u16,
    pub stack_height_required: u8,
    pub can_overflow_stack: bool,
}

pub type InstructionTable = [Option<InstructionTableEntry>; 256];
type InstructionTables = [InstructionTable; 3];

static INSTRUCTION_TABLES: OnceBox<InstructionTables> = OnceBox::new();

fn revision_index(revision: Revision) -> usize {
    match revision {
        Revision::Istanbul => 0,
        Revision::Berlin => 1,
        Revision::London => 2,
    }
}

/// The baseline (pre-dynamic-surcharge) instruction table for `revision`,
/// built once on first use and cached for the life of the process.
pub fn get_baseline_instruction_table(revision: Revision) -> &'static InstructionTable {
    let tables = INSTRUCTION_TABLES.get_or_init(|| {
        let mut table: InstructionTables = [[None; 256]; 3];

        for revision in Revision::iter() {
            for (opcode, &cost) in properties::gas_costs(revision).iter().enumerate() {
                if let Some(cost) = cost {
                    let props = properties::PROPERTIES[opcode].unwrap();

                    // Any instruction can increase stack height by at most 1, so
                    // overflow can only happen when the stack is already at the limit.
                    assert!(props.stack_height_change <= 1);

                    table[revision_index(revision)][opcode] = Some(InstructionTableEntry {
                        gas_cost: cost,
                        stack_height_required: props.stack_height_required,
                        can_overflow_stack: props.stack_height_change > 0,
                    });
                }
            }
        }
        Box::new(table)
    });
    &tables[revision_index(revision)]
}
