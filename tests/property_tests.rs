//! Property-based tests for the stock ledger.
//!
//! Movements are generated as (direction, quantity) pairs and run through the
//! local and remote ledgers; the stored stock must always reconcile with the
//! recorded history.

use std::sync::Arc;

use chrono::Utc;
use proptest::prelude::*;

use inventory_ledger::{
    forms::{FormState, LoginForm, ProductForm, RegistrationForm},
    ledger::{self, LocalLedger, RemoteLedger, StockPolicy},
    events::EventSender,
    logging::StockAudit,
    models::{InventoryItem, LocalInventoryItem, LocalTransaction, TransactionType},
    store::{DocumentStore, InMemoryDocumentStore, InMemoryKeyValueStore, IntoDocument},
};

fn kind_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![Just(TransactionType::Incoming), Just(TransactionType::Outgoing)]
}

fn movements_strategy() -> impl Strategy<Value = Vec<(TransactionType, i64)>> {
    prop::collection::vec((kind_strategy(), 1i64..500), 0..40)
}

fn local_ledger(policy: StockPolicy) -> LocalLedger {
    LocalLedger::new(Arc::new(InMemoryKeyValueStore::new()), policy, StockAudit::discard())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// Property: stock reconciles with the history of accepted movements
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn accepted_movements_reconcile(opening in 0i64..1_000, moves in movements_strategy()) {
        let ledger = local_ledger(StockPolicy::RejectNegative);
        let item = LocalInventoryItem::new("Pen", "", 1.0, "x", opening);
        ledger.catalog().add(item.clone()).unwrap();

        let mut expected = opening;
        for (kind, quantity) in moves {
            let before = ledger.catalog().get(&item.id).unwrap().stock;
            let history_len = ledger.history(&item.id).unwrap().len();
            match ledger.record(&item.id, kind, quantity, Utc::now()) {
                Ok(entry) => {
                    expected += kind.signed(quantity);
                    prop_assert_eq!(entry.new_stock, expected);
                }
                Err(_) => {
                    // only an overdraw may be refused, and it changes nothing
                    prop_assert_eq!(kind, TransactionType::Outgoing);
                    prop_assert!(quantity > before);
                    prop_assert_eq!(ledger.catalog().get(&item.id).unwrap().stock, before);
                    prop_assert_eq!(ledger.history(&item.id).unwrap().len(), history_len);
                }
            }
        }

        let history = ledger.history(&item.id).unwrap();
        let stored = ledger.catalog().get(&item.id).unwrap().stock;
        prop_assert_eq!(stored, expected);
        prop_assert_eq!(stored, opening + ledger::net_movement(&history).unwrap());
        prop_assert!(stored >= 0);
        prop_assert_eq!(ledger::replay(opening, &history, StockPolicy::RejectNegative).unwrap(), stored);
    }

    #[test]
    fn allow_negative_accepts_everything(opening in 0i64..100, moves in movements_strategy()) {
        let ledger = local_ledger(StockPolicy::AllowNegative);
        let item = LocalInventoryItem::new("Pen", "", 1.0, "x", opening);
        ledger.catalog().add(item.clone()).unwrap();

        for (kind, quantity) in &moves {
            ledger.record(&item.id, *kind, *quantity, Utc::now()).unwrap();
        }
        let expected = opening + moves.iter().map(|(k, q)| k.signed(*q)).sum::<i64>();
        prop_assert_eq!(ledger.catalog().get(&item.id).unwrap().stock, expected);
        prop_assert_eq!(ledger.history(&item.id).unwrap().len(), moves.len());
    }

    #[test]
    fn remote_allow_negative_always_appends(opening in 0i64..100, moves in movements_strategy()) {
        let rt = runtime();
        let (stored, count, expected) = rt.block_on(async {
            let store = Arc::new(InMemoryDocumentStore::new());
            let (events, _rx) = EventSender::channel(1024);
            let ledger = RemoteLedger::new(store.clone(), StockPolicy::AllowNegative, StockAudit::discard(), events);
            let mut item = InventoryItem {
                id: "item".into(),
                name: "Pen".into(),
                category: "x".into(),
                description: String::new(),
                price: 1.0,
                image_urls: vec![],
                stock: opening,
                supplier_id: "s".into(),
                supplier_name: "S".into(),
                user_id: "u".into(),
            };
            store.set("inventory", &item.id, item.to_document()).await.unwrap();

            for (kind, quantity) in &moves {
                let entry = ledger.add_transaction(&item, *kind, *quantity, Utc::now()).await.unwrap();
                item.stock = entry.new_stock;
            }
            let stored = ledger.current_stock(&item.id).await.unwrap();
            let count = ledger.transactions(&item.id).await.unwrap().len();
            (stored, count, opening + moves.iter().map(|(k, q)| k.signed(*q)).sum::<i64>())
        });
        prop_assert_eq!(stored, expected);
        prop_assert_eq!(count, moves.len());
    }
}

// Property: local JSON survives a write and read unchanged
proptest! {
    #[test]
    fn local_lists_round_trip(
        names in prop::collection::vec("[A-Za-z ]{1,12}", 0..8),
        image in prop::option::of(prop::collection::vec(any::<u8>(), 0..32)),
    ) {
        let items: Vec<LocalInventoryItem> = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut item = LocalInventoryItem::new(name.clone(), "d", 1.5 + i as f64, "c", i as i64);
                item.image_data = image.clone();
                item
            })
            .collect();
        let encoded = serde_json::to_vec(&items).unwrap();
        let decoded: Vec<LocalInventoryItem> = serde_json::from_slice(&encoded).unwrap();
        prop_assert_eq!(decoded, items);

        let history: Vec<LocalTransaction> = (1..=names.len() as i64)
            .map(|q| LocalTransaction::new(TransactionType::Incoming, q, Utc::now()))
            .collect();
        let encoded = serde_json::to_string(&history).unwrap();
        let decoded: Vec<LocalTransaction> = serde_json::from_str(&encoded).unwrap();
        prop_assert_eq!(decoded, history);
    }
}

// Property: form validity matches the stated rules
proptest! {
    #[test]
    fn product_form_truth_table(
        name in "[a-z]{0,3}",
        price in -10.0f64..10.0,
        stock in -5i64..5,
    ) {
        let form = ProductForm {
            name: name.clone(),
            price: price.to_string(),
            stock: stock.to_string(),
            ..ProductForm::default()
        };
        prop_assert_eq!(form.is_valid(), !name.is_empty() && price > 0.0 && stock >= 0);
    }

    #[test]
    fn registration_truth_table(
        email in "[a-z@.]{0,8}",
        password in "[a-z0-9]{0,8}",
        confirm_same in any::<bool>(),
        name_empty in any::<bool>(),
        phone_empty in any::<bool>(),
    ) {
        let form = RegistrationForm {
            email: email.clone(),
            full_name: if name_empty { String::new() } else { "Ari".into() },
            phone: if phone_empty { String::new() } else { "0812".into() },
            password: password.clone(),
            confirm_password: if confirm_same { password.clone() } else { format!("{}x", password) },
        };
        let expected = email.contains('@')
            && password.len() > 5
            && confirm_same
            && !name_empty
            && !phone_empty;
        prop_assert_eq!(form.is_valid(), expected);

        let login = LoginForm::new(email.clone(), password.clone());
        prop_assert_eq!(login.is_valid(), email.contains('@') && password.len() > 5);
    }
}
