// This macro generates a newtype struct wrapping a small unsigned integer. The grammar guarantees
// that all of these can be losslessly widened to usize.

use std::mem::size_of;

use num_traits::{self, PrimInt, Unsigned};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $n<T>(pub T);

        impl<T: PrimInt + Unsigned> From<$n<T>> for usize {
            fn from(idx: $n<T>) -> Self {
                debug_assert!(size_of::<usize>() >= size_of::<T>());
                num_traits::cast(idx.0).unwrap()
            }
        }

        impl<T: PrimInt + Unsigned> $n<T> {
            pub fn as_storaget(&self) -> T {
                self.0
            }
        }
    }
}

IdxNewtype!(
    /// A type specifically for non-terminal (i.e. rule head) indices.
    RIdx
);
IdxNewtype!(
    /// A type specifically for terminal indices. Index 0 is always the empty string ("epsilon").
    TIdx
);
IdxNewtype!(
    /// A type specifically for production indices: each non-terminal derives one or more
    /// productions, and each production is an intersection of one or more conjuncts.
    PIdx
);
IdxNewtype!(
    /// A type specifically for conjunct indices. Conjuncts are stored in a single arena so that
    /// parsing tables can reference them by stable index.
    CIdx
);
