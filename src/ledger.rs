//! Wallet ledger.
//!
//! The single authority for balance mutation. Every account's balances live
//! behind that account's own mutex, so concurrent mutations on one wallet
//! serialize while different wallets proceed independently. Debits are
//! checked before any effect is applied; a fill's debit and credit settle
//! under one lock acquisition so the pair is all-or-nothing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::types::{Quote, Wallet};

type Balances = HashMap<String, Decimal>;

#[derive(Debug)]
pub struct WalletLedger {
    accounts: RwLock<HashMap<Wallet, Arc<Mutex<Balances>>>>,
    seed_balances: Vec<(String, Decimal)>,
}

/// One leg of a balance mutation: which asset, and how much.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub asset: String,
    pub amount: Quote,
}

impl Entry {
    pub fn new(asset: impl Into<String>, amount: Quote) -> Self {
        Self {
            asset: asset.into(),
            amount,
        }
    }
}

impl WalletLedger {
    pub fn new(seed_balances: Vec<(String, Decimal)>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            seed_balances,
        }
    }

    // accounts are created on first touch, pre-funded with the seed balances
    async fn account(&self, wallet: &Wallet) -> Arc<Mutex<Balances>> {
        if let Some(account) = self.accounts.read().await.get(wallet) {
            return Arc::clone(account);
        }

        let mut accounts = self.accounts.write().await;
        Arc::clone(accounts.entry(wallet.clone()).or_insert_with(|| {
            let seeded: Balances = self.seed_balances.iter().cloned().collect();
            Arc::new(Mutex::new(seeded))
        }))
    }

    pub async fn balance(&self, wallet: &Wallet, asset: &str) -> Quote {
        let account = self.account(wallet).await;
        let balances = account.lock().await;
        Quote::new(balances.get(asset).copied().unwrap_or(Decimal::ZERO))
    }

    pub async fn balances(&self, wallet: &Wallet) -> Vec<Entry> {
        let account = self.account(wallet).await;
        let balances = account.lock().await;
        let mut entries: Vec<Entry> = balances
            .iter()
            .map(|(asset, value)| Entry::new(asset.clone(), Quote::new(*value)))
            .collect();
        entries.sort_by(|a, b| a.asset.cmp(&b.asset));
        entries
    }

    /// Add `amount` to the wallet's balance of `asset`. Returns the new balance.
    pub async fn credit(
        &self,
        wallet: &Wallet,
        asset: &str,
        amount: Quote,
    ) -> Result<Quote, LedgerError> {
        check_non_negative(amount)?;
        let account = self.account(wallet).await;
        let mut balances = account.lock().await;
        Ok(apply_credit(&mut balances, asset, amount))
    }

    /// Remove `amount` from the wallet's balance of `asset`. Fails before any
    /// effect if the balance would go negative. Returns the new balance.
    pub async fn debit(
        &self,
        wallet: &Wallet,
        asset: &str,
        amount: Quote,
    ) -> Result<Quote, LedgerError> {
        check_non_negative(amount)?;
        let account = self.account(wallet).await;
        let mut balances = account.lock().await;
        apply_debit(&mut balances, asset, amount)
    }

    /// Settle a fill: debit one asset and credit another for the same wallet,
    /// atomically. If the debit would overdraw, nothing is applied.
    pub async fn apply_fill(
        &self,
        wallet: &Wallet,
        debit: Entry,
        credit: Entry,
    ) -> Result<(), LedgerError> {
        check_non_negative(debit.amount)?;
        check_non_negative(credit.amount)?;
        let account = self.account(wallet).await;
        let mut balances = account.lock().await;
        apply_debit(&mut balances, &debit.asset, debit.amount)?;
        apply_credit(&mut balances, &credit.asset, credit.amount);
        Ok(())
    }
}

fn check_non_negative(amount: Quote) -> Result<(), LedgerError> {
    if amount.is_negative() {
        return Err(LedgerError::NegativeAmount { amount });
    }
    Ok(())
}

fn apply_credit(balances: &mut Balances, asset: &str, amount: Quote) -> Quote {
    let balance = balances.entry(asset.to_string()).or_insert(Decimal::ZERO);
    *balance += amount.value();
    Quote::new(*balance)
}

fn apply_debit(balances: &mut Balances, asset: &str, amount: Quote) -> Result<Quote, LedgerError> {
    let available = balances.get(asset).copied().unwrap_or(Decimal::ZERO);
    if amount.value() > available {
        return Err(LedgerError::InsufficientFunds {
            asset: asset.to_string(),
            requested: amount,
            available: Quote::new(available),
        });
    }
    let balance = balances.entry(asset.to_string()).or_insert(Decimal::ZERO);
    *balance -= amount.value();
    Ok(Quote::new(*balance))
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger amounts must be non-negative, got {amount}")]
    NegativeAmount { amount: Quote },

    #[error("insufficient funds: requested {requested} {asset}, available {available}")]
    InsufficientFunds {
        asset: String,
        requested: Quote,
        available: Quote,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ledger() -> WalletLedger {
        WalletLedger::new(vec![("USDT".to_string(), dec!(10_000))])
    }

    fn wallet() -> Wallet {
        Wallet::new("inj1testwallet")
    }

    #[tokio::test]
    async fn seeds_on_first_touch() {
        let ledger = ledger();
        let balance = ledger.balance(&wallet(), "USDT").await;
        assert_eq!(balance.value(), dec!(10_000));
    }

    #[tokio::test]
    async fn credit_and_debit() {
        let ledger = ledger();
        let w = wallet();

        let after = ledger.credit(&w, "USDT", Quote::new(dec!(500))).await.unwrap();
        assert_eq!(after.value(), dec!(10_500));

        let after = ledger.debit(&w, "USDT", Quote::new(dec!(300))).await.unwrap();
        assert_eq!(after.value(), dec!(10_200));
    }

    #[tokio::test]
    async fn debit_rejects_overdraw() {
        let ledger = ledger();
        let w = wallet();

        let result = ledger.debit(&w, "USDT", Quote::new(dec!(20_000))).await;
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { .. })
        ));

        // nothing applied
        assert_eq!(ledger.balance(&w, "USDT").await.value(), dec!(10_000));
    }

    #[tokio::test]
    async fn negative_amounts_rejected() {
        let ledger = ledger();
        let w = wallet();

        assert!(matches!(
            ledger.credit(&w, "USDT", Quote::new(dec!(-1))).await,
            Err(LedgerError::NegativeAmount { .. })
        ));
        assert!(matches!(
            ledger.debit(&w, "USDT", Quote::new(dec!(-1))).await,
            Err(LedgerError::NegativeAmount { .. })
        ));
    }

    #[tokio::test]
    async fn fill_settles_both_legs() {
        let ledger = ledger();
        let w = wallet();

        ledger
            .apply_fill(
                &w,
                Entry::new("USDT", Quote::new(dec!(1_000))),
                Entry::new("PEPE", Quote::new(dec!(1_000))),
            )
            .await
            .unwrap();

        assert_eq!(ledger.balance(&w, "USDT").await.value(), dec!(9_000));
        assert_eq!(ledger.balance(&w, "PEPE").await.value(), dec!(1_000));
    }

    #[tokio::test]
    async fn fill_is_all_or_nothing() {
        let ledger = ledger();
        let w = wallet();

        let result = ledger
            .apply_fill(
                &w,
                Entry::new("USDT", Quote::new(dec!(50_000))),
                Entry::new("PEPE", Quote::new(dec!(50_000))),
            )
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.balance(&w, "USDT").await.value(), dec!(10_000));
        assert_eq!(ledger.balance(&w, "PEPE").await.value(), dec!(0));
    }

    #[tokio::test]
    async fn concurrent_debits_serialize() {
        let ledger = Arc::new(WalletLedger::new(vec![("USDT".to_string(), dec!(100))]));
        let w = wallet();

        let mut tasks = Vec::new();
        for _ in 0..10 {
            let ledger = Arc::clone(&ledger);
            let w = w.clone();
            tasks.push(tokio::spawn(async move {
                ledger.debit(&w, "USDT", Quote::new(dec!(30))).await.is_ok()
            }));
        }

        let mut succeeded = 0;
        for task in tasks {
            if task.await.unwrap() {
                succeeded += 1;
            }
        }

        // 100 / 30 → exactly three debits can fit, never a negative balance
        assert_eq!(succeeded, 3);
        assert_eq!(ledger.balance(&w, "USDT").await.value(), dec!(10));
    }
}
