//! The cardinality lattice (spec.md §3.3, §4.5): `{AT_MOST_ONE, ONE, MANY,
//! AT_LEAST_ONE}`, totally ordered `AT_MOST_ONE ≤ ONE ≤ AT_LEAST_ONE ≤
//! MANY`, with a join (least upper bound) and a product operation.
//!
//! Every cardinality is equivalent to a pair of booleans: `required`
//! (guaranteed non-empty — `ONE` or `AT_LEAST_ONE`) and `bounded`
//! (guaranteed at most one — `ONE` or `AT_MOST_ONE`). The product rule
//! spec.md §4.5 states for path steps (`ONE · Many = Many`, `AT_MOST_ONE ·
//! X = weaken(X)`) falls out of a plain boolean AND on that pair, which is
//! how [`Cardinality::product`] is implemented below.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cardinality {
    AtMostOne,
    One,
    AtLeastOne,
    Many,
}

impl Cardinality {
    fn as_pair(self) -> (bool, bool) {
        match self {
            Cardinality::AtMostOne => (false, true),
            Cardinality::One => (true, true),
            Cardinality::AtLeastOne => (true, false),
            Cardinality::Many => (false, false),
        }
    }

    fn from_pair(required: bool, bounded: bool) -> Self {
        match (required, bounded) {
            (true, true) => Cardinality::One,
            (true, false) => Cardinality::AtLeastOne,
            (false, true) => Cardinality::AtMostOne,
            (false, false) => Cardinality::Many,
        }
    }

    pub fn is_required(self) -> bool {
        self.as_pair().0
    }

    pub fn is_bounded(self) -> bool {
        self.as_pair().1
    }

    pub fn is_singleton(self) -> bool {
        matches!(self, Cardinality::One)
    }

    /// `base.card · ptr.card` (spec.md §4.5's path-step product rule).
    pub fn product(self, other: Cardinality) -> Cardinality {
        let (r1, b1) = self.as_pair();
        let (r2, b2) = other.as_pair();
        Cardinality::from_pair(r1 && r2, b1 && b2)
    }

    /// "AT_MOST_ONE · X", used wherever a type-intersection or optional
    /// context only knows the weaker of two cardinalities is guaranteed.
    pub fn weaken(self) -> Cardinality {
        Cardinality::AtMostOne.product(self)
    }

    /// Least upper bound in the lattice; since the lattice here is a total
    /// order this is simply the greater of the two.
    pub fn join(self, other: Cardinality) -> Cardinality {
        self.max(other)
    }

    /// True if `self` is the same or a stricter cardinality than `other`
    /// (spec.md I2: "replacing a subexpression with one of equal-or-
    /// stricter cardinality does not weaken the parent's cardinality").
    pub fn at_least_as_strict_as(self, other: Cardinality) -> bool {
        self <= other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_matches_spec_examples() {
        assert_eq!(Cardinality::One.product(Cardinality::Many), Cardinality::Many);
        assert_eq!(Cardinality::AtMostOne.product(Cardinality::One), Cardinality::AtMostOne);
        assert_eq!(Cardinality::AtMostOne.product(Cardinality::Many), Cardinality::Many);
        assert_eq!(Cardinality::AtMostOne.product(Cardinality::AtLeastOne), Cardinality::Many);
    }

    #[test]
    fn weaken_matches_product_with_at_most_one() {
        for c in [Cardinality::AtMostOne, Cardinality::One, Cardinality::AtLeastOne, Cardinality::Many] {
            assert_eq!(c.weaken(), Cardinality::AtMostOne.product(c));
        }
    }

    #[test]
    fn join_is_total_order_max() {
        assert_eq!(Cardinality::One.join(Cardinality::AtLeastOne), Cardinality::AtLeastOne);
        assert_eq!(Cardinality::AtMostOne.join(Cardinality::Many), Cardinality::Many);
    }

    #[test]
    fn monotone_product_does_not_weaken_with_stricter_operand() {
        // I2: substituting ONE (stricter) for AT_LEAST_ONE should never
        // produce a *weaker* (higher-ranked) product than the original.
        let stricter = Cardinality::One;
        let original = Cardinality::AtLeastOne;
        assert!(stricter.at_least_as_strict_as(original));
        for other in [Cardinality::AtMostOne, Cardinality::One, Cardinality::AtLeastOne, Cardinality::Many] {
            assert!(stricter.product(other) <= original.product(other));
        }
    }
}
