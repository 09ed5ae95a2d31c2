//! Combining confidence from independent detectors

/// Both sources must exceed this before corroboration counts
pub const CORROBORATION_THRESHOLD: u8 = 70;
/// Bonus for a bill seen by both email and transaction detection
pub const CORROBORATION_BONUS: u32 = 15;

/// Combine an email score and a transaction score for the same bill.
///
/// When both exceed 70 and the bill was seen through multiple sources, the
/// result is their rounded average plus a 15-point bonus, capped at 100.
/// Otherwise the stronger of the two wins.
pub fn calculate_confidence_score(
    email_confidence: u8,
    transaction_confidence: u8,
    has_multiple_sources: bool,
) -> u8 {
    let email = email_confidence.min(100);
    let transaction = transaction_confidence.min(100);

    if has_multiple_sources
        && email > CORROBORATION_THRESHOLD
        && transaction > CORROBORATION_THRESHOLD
    {
        let sum = email as u32 + transaction as u32;
        let average = (sum + 1) / 2;
        return (average + CORROBORATION_BONUS).min(100) as u8;
    }

    email.max(transaction)
}
