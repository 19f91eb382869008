#![forbid(unsafe_code)]

//! Build LL(k) parsing tables from BBNF grammars.

use num_traits::{AsPrimitive, PrimInt, Unsigned};

mod lltable;

pub use crate::lltable::{Conflicts, LLkTable};

use bbnfgrammar::bbnf::{BBNFFirsts, BBNFFollows, BBNFGrammar, FirstsError};

/// Compute the PFIRST and PFOLLOW sets of `grm` for lookahead length `k` (`k ≥ 1`) and build the
/// LL(k) parsing table from them. The sets are returned alongside the table so that callers can
/// report them without recomputation.
pub fn from_bbnf<StorageT: 'static + PrimInt + Unsigned>(
    grm: &BBNFGrammar<StorageT>,
    k: usize,
) -> Result<
    (
        BBNFFirsts<StorageT>,
        BBNFFollows<StorageT>,
        LLkTable<StorageT>,
    ),
    FirstsError<StorageT>,
>
where
    usize: AsPrimitive<StorageT>,
{
    let firsts = BBNFFirsts::new(grm, k)?;
    let follows = BBNFFollows::new(grm, &firsts, k);
    let table = LLkTable::new(grm, &firsts, &follows, k);
    Ok((firsts, follows, table))
}
