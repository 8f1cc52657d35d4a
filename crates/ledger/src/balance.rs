//! Balance folding - the authoritative balance is the signed sum of entries

use crate::entry::{LedgerEntry, LedgerKind};
use rust_decimal::Decimal;
use taskpay_core::Amount;

/// Signed effect of an entry of `kind` carrying `amount`
pub fn signed_delta(kind: LedgerKind, amount: Amount) -> Decimal {
    amount.value() * Decimal::from(kind.sign())
}

/// Sum entries into a balance
pub fn fold_balance<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Decimal {
    entries
        .into_iter()
        .map(|e| signed_delta(e.kind, e.amount))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LedgerEntryDraft;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn entry(kind: LedgerKind, amount: Decimal) -> LedgerEntry {
        LedgerEntryDraft::new("ACC-1", kind, amount, "test")
            .unwrap()
            .commit("LED", Utc::now())
    }

    #[test]
    fn test_fold_withdrawal_lifecycle() {
        // credit 200, hold 150, settle 150 -> 50
        let entries = vec![
            entry(LedgerKind::Credit, dec!(200)),
            entry(LedgerKind::WithdrawalPending, dec!(150)),
            entry(LedgerKind::Withdrawal, dec!(150)),
        ];
        assert_eq!(fold_balance(&entries), dec!(50));
    }

    #[test]
    fn test_fold_refund_restores() {
        let entries = vec![
            entry(LedgerKind::Credit, dec!(200)),
            entry(LedgerKind::WithdrawalPending, dec!(150)),
            entry(LedgerKind::Refund, dec!(150)),
        ];
        assert_eq!(fold_balance(&entries), dec!(200));
    }

    #[test]
    fn test_delta_follows_kind_sign() {
        let amount = Amount::new(dec!(150)).unwrap();
        for kind in [
            LedgerKind::Credit,
            LedgerKind::Debit,
            LedgerKind::TaskReward,
            LedgerKind::Withdrawal,
            LedgerKind::WithdrawalPending,
            LedgerKind::Refund,
        ] {
            assert_eq!(signed_delta(kind, amount), dec!(150) * Decimal::from(kind.sign()));
        }
        assert_eq!(signed_delta(LedgerKind::Withdrawal, amount), Decimal::ZERO);
        assert_eq!(signed_delta(LedgerKind::WithdrawalPending, amount), dec!(-150));
    }

    #[test]
    fn test_fold_empty_is_zero() {
        assert_eq!(fold_balance(&Vec::<LedgerEntry>::new()), Decimal::ZERO);
    }
}
