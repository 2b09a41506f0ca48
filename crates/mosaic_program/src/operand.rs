//! Operands of a function invocation.

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::parameter::ParameterId;

/// Data flow direction of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandDirection {
    In,
    Out,
    InOut,
}

impl OperandDirection {
    #[inline]
    #[must_use]
    pub fn reads(self) -> bool {
        matches!(self, Self::In | Self::InOut)
    }

    #[inline]
    #[must_use]
    pub fn writes(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

bitflags! {
    /// Component selection of an operand.
    ///
    /// The empty mask selects the whole parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OperandMask: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
        const W = 1 << 3;
    }
}

impl OperandMask {
    /// Mask selecting a single component, `index` in `0..4`.
    #[must_use]
    pub fn component(index: usize) -> Self {
        match index {
            0 => Self::X,
            1 => Self::Y,
            2 => Self::Z,
            _ => Self::W,
        }
    }

    /// Swizzle suffix including the dot, empty for the full mask.
    #[must_use]
    pub fn swizzle(self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut s = String::with_capacity(5);
        s.push('.');
        for (flag, c) in [(Self::X, 'x'), (Self::Y, 'y'), (Self::Z, 'z'), (Self::W, 'w')] {
            if self.contains(flag) {
                s.push(c);
            }
        }
        s
    }

    /// Selected component indices, ascending. Empty for the full mask.
    #[must_use]
    pub fn components(self) -> SmallVec<[usize; 4]> {
        [Self::X, Self::Y, Self::Z, Self::W]
            .iter()
            .enumerate()
            .filter(|(_, flag)| self.contains(**flag))
            .map(|(i, _)| i)
            .collect()
    }
}

/// One argument of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operand {
    pub parameter: ParameterId,
    pub direction: OperandDirection,
    pub mask: OperandMask,
    /// Non-zero when this operand indexes the preceding (array) operand
    /// instead of being passed on its own.
    pub indirection: u8,
}

impl Operand {
    #[must_use]
    pub fn new(parameter: ParameterId, direction: OperandDirection) -> Self {
        Self {
            parameter,
            direction,
            mask: OperandMask::empty(),
            indirection: 0,
        }
    }

    #[must_use]
    pub fn with_mask(mut self, mask: OperandMask) -> Self {
        self.mask = mask;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_index(&self) -> bool {
        self.indirection > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swizzle() {
        assert_eq!(OperandMask::empty().swizzle(), "");
        assert_eq!((OperandMask::X | OperandMask::Y | OperandMask::Z).swizzle(), ".xyz");
        assert_eq!(OperandMask::component(3).swizzle(), ".w");
    }

    #[test]
    fn test_components() {
        assert!(OperandMask::empty().components().is_empty());
        assert_eq!((OperandMask::Y | OperandMask::W).components().as_slice(), &[1, 3]);
    }
}
