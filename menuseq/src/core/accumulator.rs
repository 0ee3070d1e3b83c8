//! Per-step accumulators of scheduled build actions.

/// A composable, order-preserving container of build actions for one step.
///
/// `merge` must be associative and keep `other`'s actions after `self`'s.
pub trait Accumulator {
    type Action;

    fn append(&mut self, action: Self::Action);

    fn merge(&mut self, other: Self);

    fn is_empty(&self) -> bool;
}

impl<T> Accumulator for Vec<T> {
    type Action = T;

    fn append(&mut self, action: T) {
        self.push(action);
    }

    fn merge(&mut self, mut other: Self) {
        Vec::append(self, &mut other);
    }

    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_order_and_is_associative() {
        let a = vec![1, 2];
        let b = vec![3];
        let c = vec![4, 5];

        let mut left = a.clone();
        Accumulator::merge(&mut left, b.clone());
        Accumulator::merge(&mut left, c.clone());

        let mut tail = b;
        Accumulator::merge(&mut tail, c);
        let mut right = a;
        Accumulator::merge(&mut right, tail);

        assert_eq!(left, vec![1, 2, 3, 4, 5]);
        assert_eq!(left, right);
    }
}
