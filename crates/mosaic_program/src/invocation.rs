//! Function invocations.
//!
//! An invocation is a call into a shader library function. Features tag each
//! invocation with their execution order as `group` and a per-feature
//! `internal_order`; the program sorts by `(group, internal_order, sequence)`,
//! where `sequence` is the insertion counter assigned by the owning
//! [`Function`](crate::Function). The emitted order therefore never depends on
//! map iteration order.

use mosaic_core::interner::{self, Symbol};
use smallvec::SmallVec;

use crate::operand::{Operand, OperandDirection, OperandMask};
use crate::parameter::ParameterId;

/// A call of a library function with bound operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionInvocation {
    function: Symbol,
    group: i32,
    internal_order: i32,
    sequence: u32,
    operands: SmallVec<[Operand; 4]>,
}

impl FunctionInvocation {
    #[must_use]
    pub fn new(function: &str, group: i32, internal_order: i32) -> Self {
        Self {
            function: interner::intern(function),
            group,
            internal_order,
            sequence: 0,
            operands: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn input(self, parameter: ParameterId) -> Self {
        self.operand(Operand::new(parameter, OperandDirection::In))
    }

    #[must_use]
    pub fn input_masked(self, parameter: ParameterId, mask: OperandMask) -> Self {
        self.operand(Operand::new(parameter, OperandDirection::In).with_mask(mask))
    }

    #[must_use]
    pub fn output(self, parameter: ParameterId) -> Self {
        self.operand(Operand::new(parameter, OperandDirection::Out))
    }

    #[must_use]
    pub fn output_masked(self, parameter: ParameterId, mask: OperandMask) -> Self {
        self.operand(Operand::new(parameter, OperandDirection::Out).with_mask(mask))
    }

    #[must_use]
    pub fn inout(self, parameter: ParameterId) -> Self {
        self.operand(Operand::new(parameter, OperandDirection::InOut))
    }

    #[must_use]
    pub fn inout_masked(self, parameter: ParameterId, mask: OperandMask) -> Self {
        self.operand(Operand::new(parameter, OperandDirection::InOut).with_mask(mask))
    }

    /// Indexes the previous operand with one component of `parameter`,
    /// rendered as `previous[int(parameter.c)]`.
    #[must_use]
    pub fn index(self, parameter: ParameterId, mask: OperandMask) -> Self {
        let mut op = Operand::new(parameter, OperandDirection::In).with_mask(mask);
        op.indirection = 1;
        self.operand(op)
    }

    #[must_use]
    pub fn operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    #[inline]
    #[must_use]
    pub fn function_name(&self) -> &'static str {
        interner::resolve(self.function)
    }

    #[inline]
    #[must_use]
    pub fn function(&self) -> Symbol {
        self.function
    }

    #[inline]
    #[must_use]
    pub fn group(&self) -> i32 {
        self.group
    }

    #[inline]
    #[must_use]
    pub fn internal_order(&self) -> i32 {
        self.internal_order
    }

    #[inline]
    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[inline]
    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    #[inline]
    #[must_use]
    pub fn sort_key(&self) -> (i32, i32, u32) {
        (self.group, self.internal_order, self.sequence)
    }

    pub(crate) fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }
}

/// Hands out consecutive `internal_order` values within one feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderCounter {
    next: i32,
}

impl OrderCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> i32 {
        let value = self.next;
        self.next += 1;
        value
    }
}
