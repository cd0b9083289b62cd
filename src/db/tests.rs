#![allow(clippy::unwrap_used)]

use super::*;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn sale(wallet: WalletId, amount: Decimal, created_at: NaiveDateTime) -> Transaction {
    Transaction::new(TxType::Revenue, TxKind::Sale, wallet, amount, created_at)
}

fn expense(wallet: WalletId, amount: Decimal, created_at: NaiveDateTime) -> Transaction {
    Transaction::new(TxType::Expense, TxKind::Expense, wallet, amount, created_at)
}

fn insert(db: &mut Database, txn: &Transaction) -> i64 {
    db.with_tx(|tx| tx.insert(txn)).unwrap()
}

// ── Schema ────────────────────────────────────────────────────

#[test]
fn test_wallet_balances_seeded_at_zero() {
    let db = Database::open_in_memory().unwrap();
    let balances = db.get_balances().unwrap();
    assert_eq!(balances.len(), WalletId::all().len());
    assert!(balances.values().all(|b| b.is_zero()));
}

#[test]
fn test_open_file_database_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cashdesk.db");
    {
        let mut db = Database::open(&path).unwrap();
        insert(&mut db, &sale(WalletId::Cash, dec!(12.50), at(1, 9)));
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_transaction_count().unwrap(), 1);
    assert_eq!(db.get_balances().unwrap()[&WalletId::Cash], dec!(12.50));
}

// ── Insert / read ─────────────────────────────────────────────

#[test]
fn test_insert_and_get_round_trips_fields() {
    let mut db = Database::open_in_memory().unwrap();
    let txn = sale(WalletId::Bank, dec!(45.00), at(2, 14))
        .with_cost_total(dec!(30.25))
        .with_method("Carte")
        .with_description("phone case")
        .with_user(Some("amine"));
    let id = insert(&mut db, &txn);

    let fetched = db.get_transaction(id).unwrap().unwrap();
    assert_eq!(fetched.id, Some(id));
    assert_eq!(fetched.tx_type, TxType::Revenue);
    assert_eq!(fetched.kind, TxKind::Sale);
    assert_eq!(fetched.amount, dec!(45.00));
    assert_eq!(fetched.cost_total, Some(dec!(30.25)));
    assert_eq!(fetched.wallet, Some(WalletId::Bank));
    assert_eq!(fetched.method.as_deref(), Some("Carte"));
    assert_eq!(fetched.user_id.as_deref(), Some("amine"));
    assert_eq!(fetched.created_at, at(2, 14));
    assert!(!fetched.is_internal);
}

#[test]
fn test_get_transaction_not_found() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.get_transaction(99999).unwrap().is_none());
}

#[test]
fn test_insert_without_wallet_is_rejected() {
    let mut db = Database::open_in_memory().unwrap();
    let mut txn = sale(WalletId::Cash, dec!(5), at(1, 9));
    txn.wallet = None;
    let result = db.with_tx(|tx| tx.insert(&txn));
    assert!(result.is_err());
    assert_eq!(db.get_transaction_count().unwrap(), 0);
}

#[test]
fn test_insert_updates_snapshot() {
    let mut db = Database::open_in_memory().unwrap();
    insert(&mut db, &sale(WalletId::Cash, dec!(100), at(1, 9)));
    insert(&mut db, &expense(WalletId::Cash, dec!(30.50), at(1, 10)));
    let closure = Transaction::new(TxType::Closure, TxKind::Closure, WalletId::Cash, dec!(69.50), at(1, 20));
    insert(&mut db, &closure);

    let balances = db.get_balances().unwrap();
    assert_eq!(balances[&WalletId::Cash], dec!(69.50));
    assert_eq!(balances[&WalletId::Bank], dec!(0));
}

#[test]
fn test_failed_closure_rolls_back() {
    let mut db = Database::open_in_memory().unwrap();
    let result: Result<()> = db.with_tx(|tx| {
        tx.insert(&sale(WalletId::Cash, dec!(20), at(1, 9)))?;
        anyhow::bail!("abort");
    });
    assert!(result.is_err());
    assert_eq!(db.get_transaction_count().unwrap(), 0);
    assert_eq!(db.get_balances().unwrap()[&WalletId::Cash], dec!(0));
}

// ── Filters ───────────────────────────────────────────────────

fn seed(db: &mut Database) {
    insert(db, &sale(WalletId::Cash, dec!(10), at(1, 12)));
    insert(db, &sale(WalletId::Cash, dec!(20), at(1, 9)));
    insert(db, &sale(WalletId::Bank, dec!(30), at(2, 9)).with_description("screen repair"));
    insert(db, &expense(WalletId::Cash, dec!(5), at(3, 18)));
}

#[test]
fn test_ordering_by_created_at_then_id() {
    let mut db = Database::open_in_memory().unwrap();
    seed(&mut db);
    insert(&mut db, &sale(WalletId::Safe, dec!(1), at(1, 9)));

    let all = db.get_transactions(&TxFilter::all()).unwrap();
    let amounts: Vec<Decimal> = all.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![dec!(20), dec!(1), dec!(10), dec!(30), dec!(5)]);

    let newest = TxFilter {
        newest_first: true,
        limit: Some(2),
        ..TxFilter::all()
    };
    let latest = db.get_transactions(&newest).unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0].amount, dec!(5));
}

#[test]
fn test_day_filter_is_half_open() {
    let mut db = Database::open_in_memory().unwrap();
    seed(&mut db);
    insert(
        &mut db,
        &sale(WalletId::Cash, dec!(7), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap().and_hms_opt(0, 0, 0).unwrap()),
    );

    let day1 = db
        .get_transactions(&TxFilter::day(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()))
        .unwrap();
    assert_eq!(day1.len(), 2);

    let day2 = db
        .get_transactions(&TxFilter::day(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()))
        .unwrap();
    assert_eq!(day2.len(), 2);
}

#[test]
fn test_wallet_kind_and_search_filters() {
    let mut db = Database::open_in_memory().unwrap();
    seed(&mut db);

    let cash = db
        .get_transactions(&TxFilter::all().with_wallet(WalletId::Cash))
        .unwrap();
    assert_eq!(cash.len(), 3);

    let expenses = db
        .get_transactions(&TxFilter::all().with_kinds(&[TxKind::Expense]))
        .unwrap();
    assert_eq!(expenses.len(), 1);

    let search = TxFilter {
        search: Some("repair".into()),
        ..TxFilter::all()
    };
    let found = db.get_transactions(&search).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].wallet, Some(WalletId::Bank));
}

// ── Update / delete ───────────────────────────────────────────

#[test]
fn test_update_moves_snapshot() {
    let mut db = Database::open_in_memory().unwrap();
    let id = insert(&mut db, &sale(WalletId::Cash, dec!(40), at(1, 9)));

    let mut edited = db.get_transaction(id).unwrap().unwrap();
    edited.amount = dec!(25);
    edited.wallet = Some(WalletId::Bank);
    db.with_tx(|tx| tx.update(id, &edited)).unwrap();

    let balances = db.get_balances().unwrap();
    assert_eq!(balances[&WalletId::Cash], dec!(0));
    assert_eq!(balances[&WalletId::Bank], dec!(25));
    assert_eq!(db.get_transaction(id).unwrap().unwrap().amount, dec!(25));
}

#[test]
fn test_update_missing_row_fails() {
    let mut db = Database::open_in_memory().unwrap();
    let txn = sale(WalletId::Cash, dec!(1), at(1, 9));
    assert!(db.with_tx(|tx| tx.update(42, &txn)).is_err());
}

#[test]
fn test_delete_reverts_snapshot() {
    let mut db = Database::open_in_memory().unwrap();
    insert(&mut db, &sale(WalletId::Cash, dec!(40), at(1, 9)));
    let id = insert(&mut db, &expense(WalletId::Cash, dec!(15), at(1, 10)));

    let removed = db.with_tx(|tx| tx.delete(id)).unwrap();
    assert_eq!(removed.unwrap().amount, dec!(15));
    assert_eq!(db.get_balances().unwrap()[&WalletId::Cash], dec!(40));
    assert!(db.with_tx(|tx| tx.delete(id)).unwrap().is_none());
}

// ── Import batches ────────────────────────────────────────────

#[test]
fn test_imported_batch_dedupes_by_hash() {
    let mut db = Database::open_in_memory().unwrap();
    let mut a = sale(WalletId::Cash, dec!(10), at(1, 9));
    a.import_hash = "h1".into();
    let mut b = sale(WalletId::Safe, dec!(20), at(1, 10));
    b.import_hash = "h2".into();

    assert_eq!(db.insert_imported_batch(&[a.clone(), b.clone()]).unwrap(), 2);
    assert_eq!(db.insert_imported_batch(&[a, b]).unwrap(), 0);
    assert_eq!(db.get_transaction_count().unwrap(), 2);
    assert_eq!(db.get_balances().unwrap()[&WalletId::Safe], dec!(20));
}

#[test]
fn test_replace_balances() {
    let mut db = Database::open_in_memory().unwrap();
    let mut balances = BTreeMap::new();
    balances.insert(WalletId::Safe, dec!(123.45));
    db.replace_balances(&balances).unwrap();

    let stored = db.get_balances().unwrap();
    assert_eq!(stored[&WalletId::Safe], dec!(123.45));
    assert_eq!(stored[&WalletId::Cash], dec!(0));
}
