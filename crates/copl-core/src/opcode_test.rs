// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::{Opcode, UnknownOpcode};

#[test]
fn round_trips_through_i32() {
    for op in [Opcode::Add, Opcode::Call, Opcode::Halt, Opcode::LoadModule] {
        let word: i32 = op.into();
        assert_eq!(Opcode::try_from(word).unwrap(), op);
    }
}

#[test]
fn unknown_opcode_is_rejected() {
    let err = Opcode::try_from(999).unwrap_err();
    assert!(matches!(err, UnknownOpcode(999)));
}

#[test]
fn operand_counts_match_the_instructions_that_use_them() {
    assert_eq!(Opcode::Nop.operand_count(), 0);
    assert_eq!(Opcode::Add.operand_count(), 0);
    assert_eq!(Opcode::LoadConst.operand_count(), 1);
    assert_eq!(Opcode::Call.operand_count(), 1);
    assert_eq!(Opcode::Halt.operand_count(), 0);
}
