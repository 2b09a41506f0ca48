//! Program entry point.

use crate::invocation::FunctionInvocation;

/// The entry function of a program: an ordered list of invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    name: String,
    invocations: Vec<FunctionInvocation>,
    next_sequence: u32,
}

impl Function {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            invocations: Vec::new(),
            next_sequence: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invocations in insertion order.
    #[inline]
    #[must_use]
    pub fn invocations(&self) -> &[FunctionInvocation] {
        &self.invocations
    }

    /// Invocations in emission order.
    #[must_use]
    pub fn sorted_invocations(&self) -> Vec<&FunctionInvocation> {
        let mut sorted: Vec<_> = self.invocations.iter().collect();
        sorted.sort_by_key(|inv| inv.sort_key());
        sorted
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }

    pub(crate) fn push(&mut self, mut invocation: FunctionInvocation) {
        invocation.set_sequence(self.next_sequence);
        self.next_sequence += 1;
        self.invocations.push(invocation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_group_then_order_then_sequence() {
        let mut f = Function::new("main");
        f.push(FunctionInvocation::new("C", 500, 0));
        f.push(FunctionInvocation::new("B", 100, 1));
        f.push(FunctionInvocation::new("A", 100, 0));
        f.push(FunctionInvocation::new("A2", 100, 0));

        let names: Vec<_> = f.sorted_invocations().iter().map(|i| i.function_name()).collect();
        assert_eq!(names, ["A", "A2", "B", "C"]);
    }
}
