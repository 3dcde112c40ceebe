//! Protocol parameters
//!
//! Fixed arities and sizes of the join-split statement. Every transaction
//! consumes exactly [`JS_INPUTS`] notes and creates exactly [`JS_OUTPUTS`].

/// Number of input notes per join-split
pub const JS_INPUTS: usize = 2;

/// Number of output notes per join-split
pub const JS_OUTPUTS: usize = 2;

/// Default depth of the commitment tree (2^32 leaves)
pub const TREE_DEPTH: usize = 32;

/// Size of every digest (commitments, nullifiers, h_sig, rho, phi)
pub const DIGEST_LENGTH: usize = 32;

/// Bits of a digest that fit into one BN254 scalar
pub const FIELD_CAPACITY: usize = 253;

/// Bits of a digest that do not fit into one scalar
pub const DIGEST_RESIDUAL_BITS: usize = DIGEST_LENGTH * 8 - FIELD_CAPACITY;

/// Width of the public values `v_in` / `v_out`
pub const PUBLIC_VALUE_BITS: usize = 64;

/// Ledger base units per public unit (10^12, so 10^6 public units per 10^18)
///
/// Notes and `v_in` / `v_out` are denominated in public units; the value
/// moved on the ledger is `v * PUBLIC_UNIT_VALUE`.
pub const PUBLIC_UNIT_VALUE: u128 = 1_000_000_000_000;

/// Public units in a ledger amount, rounding down. `None` if the result does
/// not fit in [`PUBLIC_VALUE_BITS`].
pub fn to_public_units(ledger_value: u128) -> Option<u64> {
    u64::try_from(ledger_value / PUBLIC_UNIT_VALUE).ok()
}

/// Ledger amount of `units` public units
pub fn from_public_units(units: u64) -> u128 {
    units as u128 * PUBLIC_UNIT_VALUE
}

/// Note trapdoor size (384 bits)
pub const TRAPDOOR_LENGTH: usize = 48;

/// Binary note size: `a_pk ‖ value ‖ rho ‖ trapdoor`
pub const NOTE_LENGTH: usize = DIGEST_LENGTH + 8 + DIGEST_LENGTH + TRAPDOOR_LENGTH;

/// Number of bits needed to encode an output index
pub const fn output_index_bits() -> usize {
    let mut bits = 0;
    while (1usize << bits) < JS_OUTPUTS {
        bits += 1;
    }
    bits
}
