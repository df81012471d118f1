//! Randomized splitting of a packet total into shares.
//!
//! Shares are produced in a single left-to-right pass. Each share is drawn
//! from a shrinking envelope: the upper bound is a fraction (`r_max`) of the
//! money left over once every remaining share has been reserved one unit.
//! Exact conservation comes from the two terminal branches, not from the
//! random draw: the last share receives everything that is left, and once the
//! money left equals the shares left, every remaining share receives exactly
//! one unit.

use crate::{
    error::{Error, Result},
    types::Amount,
};
use rand::Rng;

/// Largest number of shares a single packet may be split into.
pub const MAX_SHARE_COUNT: usize = 1_000_000;

/// Returns the envelope fraction for a packet with `share_count` shares.
///
/// Fewer shares allow more variance between them.
pub fn envelope_ratio(share_count: usize) -> f64 {
    if share_count > 1000 {
        0.01
    } else if share_count >= 100 {
        0.1
    } else if share_count >= 10 {
        0.3
    } else {
        0.55
    }
}

/// Checks that `total_amount` can be split into `share_count` shares of at
/// least one minor unit each.
///
/// # Errors
///
/// Returns [`Error::InvalidRequest`] if `share_count` is zero, exceeds
/// [`MAX_SHARE_COUNT`], or exceeds `total_amount`.
pub fn validate(total_amount: Amount, share_count: usize) -> Result<()> {
    if share_count == 0 {
        return Err(Error::invalid("Share count must be greater than 0"));
    }
    if share_count > MAX_SHARE_COUNT {
        return Err(Error::invalid(format!(
            "Share count {share_count} exceeds the limit of {MAX_SHARE_COUNT}"
        )));
    }
    if total_amount < share_count as Amount {
        return Err(Error::invalid(format!(
            "Amount {total_amount} cannot cover {share_count} shares of at least 1 unit"
        )));
    }
    Ok(())
}

/// Splits `total_amount` into `share_count` positive shares using the
/// thread-local RNG.
///
/// # Errors
///
/// See [`validate`].
pub fn split(total_amount: Amount, share_count: usize) -> Result<Vec<Amount>> {
    split_with(&mut rand::rng(), total_amount, share_count)
}

/// Splits `total_amount` into `share_count` positive shares drawing from
/// `rng`.
///
/// The returned vector has exactly `share_count` elements, each `>= 1`, and
/// sums to `total_amount`.
///
/// # Errors
///
/// See [`validate`].
pub fn split_with<R>(rng: &mut R, total_amount: Amount, share_count: usize) -> Result<Vec<Amount>>
where
    R: Rng + ?Sized,
{
    validate(total_amount, share_count)?;

    let r_max = envelope_ratio(share_count);
    let mut shares = Vec::with_capacity(share_count);
    let mut left_money = total_amount;
    let mut left_count = share_count;

    while left_count > 0 {
        if left_count == 1 {
            shares.push(left_money);
            break;
        }

        // e.g. 4 cents left for 4 shares
        if left_money == left_count as Amount {
            shares.resize(share_count, 1);
            break;
        }

        let spare = left_money - left_count as Amount;
        let candidate_max = (spare as f64 * r_max) as Amount;
        let share = if candidate_max > 1 {
            rng.random_range(1..candidate_max)
        } else {
            1
        };

        shares.push(share);
        left_money -= share;
        left_count -= 1;
    }

    debug_assert_eq!(shares.len(), share_count);
    Ok(shares)
}
