//! Database tests

use super::*;
use crate::error::Error;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(name: &str, quantity: f64, price: f64) -> NewItem {
        NewItem {
            name: name.to_string(),
            quantity,
            price,
        }
    }

    fn aldi_receipt() -> NewReceipt {
        NewReceipt {
            store_name: "ALDI".into(),
            bought_date: "2024-01-15".into(),
            discounts: Some(0.50),
            items: vec![item("Milk", 2.0, 0.92), item("Bread", 1.0, 1.20)],
        }
    }

    fn table_count(db: &Database, table: &str) -> i64 {
        let conn = db.conn().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        assert!(db.list_stores().unwrap().is_empty());
        assert!(db.list_receipts(Page::default()).unwrap().is_empty());
    }

    #[test]
    fn test_schema_columns() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let result: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('receipts') WHERE name IN ('id', 'store_id', 'discounts', 'receipt_hash', 'bought_date')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(result, 5, "receipts table should have the expected columns");

        let result: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('items') WHERE name IN ('id', 'receipt_id', 'product_id', 'quantity', 'price_paid')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(result, 5, "items table should have the expected columns");
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = Database::in_memory().unwrap();
        db.upsert_store("ALDI").unwrap();

        let reopened = Database::new(db.path()).unwrap();
        assert_eq!(reopened.list_stores().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_store_same_name_returns_same_id() {
        let db = Database::in_memory().unwrap();

        let id = db.upsert_store("ALDI").unwrap();
        assert!(id > 0);

        // Upsert same store returns same ID
        let id2 = db.upsert_store("ALDI").unwrap();
        assert_eq!(id, id2);
        assert_eq!(table_count(&db, "stores"), 1);

        let other = db.upsert_store("CARREFOUR").unwrap();
        assert_ne!(id, other);

        let stores = db.list_stores().unwrap();
        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].name, "ALDI");
        assert_eq!(db.get_store(other).unwrap().name, "CARREFOUR");
        assert_eq!(db.find_store_by_name("ALDI").unwrap().unwrap().id, id);
        assert!(db.find_store_by_name("LIDL").unwrap().is_none());
    }

    #[test]
    fn test_upsert_product_scoped_to_store() {
        let db = Database::in_memory().unwrap();
        let aldi = db.upsert_store("ALDI").unwrap();
        let carrefour = db.upsert_store("CARREFOUR").unwrap();

        let milk_aldi = db.upsert_product("Milk", aldi).unwrap();
        assert_eq!(db.upsert_product("Milk", aldi).unwrap(), milk_aldi);

        let milk_carrefour = db.upsert_product("Milk", carrefour).unwrap();
        assert_ne!(milk_aldi, milk_carrefour);

        assert_eq!(table_count(&db, "products"), 2);
        let product = db.get_product(milk_carrefour).unwrap();
        assert_eq!(product.store_id, carrefour);
        assert_eq!(db.list_products_by_store(aldi).unwrap().len(), 1);
    }

    #[test]
    fn test_get_missing_store_and_product() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(db.get_store(99), Err(Error::NotFound(_))));
        assert!(matches!(db.get_product(99), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_create_and_get_receipt() {
        let db = Database::in_memory().unwrap();

        let id = db.create_receipt(&aldi_receipt()).unwrap();
        let receipt = db.get_receipt(id).unwrap();

        assert_eq!(receipt.store.name, "ALDI");
        assert_eq!(receipt.bought_date, date("2024-01-15"));
        assert_eq!(receipt.receipt_hash.len(), 64);
        assert!((receipt.discounts - 0.5).abs() < 1e-9);

        // Items come back ordered by product name
        let names: Vec<&str> = receipt.items.iter().map(|i| i.product_name.as_str()).collect();
        assert_eq!(names, vec!["Bread", "Milk"]);

        assert!((receipt.subtotal() - 3.04).abs() < 1e-9);
        assert!((receipt.total() - 2.54).abs() < 1e-9);

        // Every item's product belongs to the receipt's store
        for item in &receipt.items {
            assert_eq!(db.get_product(item.product_id).unwrap().store_id, receipt.store.id);
        }
    }

    #[test]
    fn test_receipt_without_discounts_reads_zero() {
        let db = Database::in_memory().unwrap();
        let mut receipt = aldi_receipt();
        receipt.discounts = None;

        let id = db.create_receipt(&receipt).unwrap();
        let stored = db.get_receipt(id).unwrap();
        assert_eq!(stored.discounts, 0.0);

        let conn = db.conn().unwrap();
        let raw: Option<f64> = conn
            .query_row("SELECT discounts FROM receipts WHERE id = ?", [id], |row| row.get(0))
            .unwrap();
        assert!(raw.is_none());
    }

    #[test]
    fn test_duplicate_receipt_rejected() {
        let db = Database::in_memory().unwrap();

        let first = db.create_receipt(&aldi_receipt()).unwrap();

        // Same content in a different item order is still a duplicate
        let mut again = aldi_receipt();
        again.items.reverse();
        match db.create_receipt(&again) {
            Err(Error::Duplicate { existing_id }) => assert_eq!(existing_id, first),
            other => panic!("expected duplicate error, got {:?}", other),
        }

        assert_eq!(table_count(&db, "receipts"), 1);
        assert_eq!(table_count(&db, "items"), 2);
    }

    #[test]
    fn test_invalid_date_writes_nothing() {
        let db = Database::in_memory().unwrap();
        let mut receipt = aldi_receipt();
        receipt.bought_date = "2024/13/40".into();

        let result = db.create_receipt(&receipt);
        assert!(matches!(result, Err(Error::Validation(_))));

        for table in ["stores", "products", "receipts", "items"] {
            assert_eq!(table_count(&db, table), 0, "{} should be empty", table);
        }
    }

    #[test]
    fn test_invalid_item_values_rejected() {
        let db = Database::in_memory().unwrap();

        let mut zero_quantity = aldi_receipt();
        zero_quantity.items[0].quantity = 0.0;
        assert!(matches!(
            db.create_receipt(&zero_quantity),
            Err(Error::Validation(_))
        ));

        let mut negative_price = aldi_receipt();
        negative_price.items[1].price = -1.0;
        assert!(matches!(
            db.create_receipt(&negative_price),
            Err(Error::Validation(_))
        ));

        let mut blank_store = aldi_receipt();
        blank_store.store_name = "   ".into();
        assert!(matches!(
            db.create_receipt(&blank_store),
            Err(Error::Validation(_))
        ));

        let mut negative_discount = aldi_receipt();
        negative_discount.discounts = Some(-0.1);
        assert!(matches!(
            db.create_receipt(&negative_discount),
            Err(Error::Validation(_))
        ));

        assert_eq!(table_count(&db, "stores"), 0);
    }

    #[test]
    fn test_failed_item_insert_rolls_back() {
        let db = Database::in_memory().unwrap();
        {
            let conn = db.conn().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER reject_bread BEFORE INSERT ON items
                 WHEN (SELECT name FROM products WHERE id = NEW.product_id) = 'Bread'
                 BEGIN SELECT RAISE(ABORT, 'bread rejected'); END;",
            )
            .unwrap();
        }

        let result = db.create_receipt(&aldi_receipt());
        assert!(matches!(result, Err(Error::Database(_))));

        for table in ["stores", "products", "receipts", "items"] {
            assert_eq!(table_count(&db, table), 0, "{} should be rolled back", table);
        }
    }

    #[test]
    fn test_list_receipts_pagination_and_totals() {
        let db = Database::in_memory().unwrap();

        for day in 1..=15 {
            let store = if day % 2 == 0 { "ALDI" } else { "CARREFOUR" };
            let receipt = NewReceipt {
                store_name: store.into(),
                bought_date: format!("2024-03-{:02}", day),
                discounts: Some(day as f64 * 0.1),
                items: vec![item("Milk", 2.0, 0.92), item("Eggs", day as f64, 0.25)],
            };
            db.create_receipt(&receipt).unwrap();
        }

        let page = db.list_receipts(Page::new(10, 0)).unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0].bought_date, date("2024-03-15"));
        assert!(page
            .windows(2)
            .all(|w| w[0].bought_date >= w[1].bought_date));

        for summary in &page {
            assert_eq!(summary.item_count, 2);
            let receipt = db.get_receipt(summary.id).unwrap();
            assert!((summary.subtotal - receipt.subtotal()).abs() < 1e-9);
            assert!((summary.total - (summary.subtotal - summary.discounts)).abs() < 1e-9);
        }

        let rest = db.list_receipts(Page::new(10, 10)).unwrap();
        assert_eq!(rest.len(), 5);
        assert_eq!(rest[4].bought_date, date("2024-03-01"));

        let stores: std::collections::HashSet<_> =
            page.iter().map(|s| s.store_name.clone()).collect();
        assert_eq!(stores.len(), 2);
    }

    #[test]
    fn test_list_receipts_ties_break_on_newest_id() {
        let db = Database::in_memory().unwrap();
        let first = db.create_receipt(&aldi_receipt()).unwrap();
        let mut other = aldi_receipt();
        other.items.push(item("Butter", 1.0, 2.10));
        let second = db.create_receipt(&other).unwrap();

        let list = db.list_receipts(Page::default()).unwrap();
        let ids: Vec<i64> = list.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_list_receipts_rejects_negative_page() {
        let db = Database::in_memory().unwrap();
        assert!(matches!(
            db.list_receipts(Page::new(-1, 0)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.list_receipts(Page::new(10, -5)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_receipt_without_items_aggregates_to_zero() {
        let db = Database::in_memory().unwrap();
        let id = db
            .create_receipt(&NewReceipt {
                store_name: "ALDI".into(),
                bought_date: "2024-01-15".into(),
                discounts: None,
                items: vec![],
            })
            .unwrap();

        let list = db.list_receipts(Page::default()).unwrap();
        assert_eq!(list[0].id, id);
        assert_eq!(list[0].item_count, 0);
        assert_eq!(list[0].subtotal, 0.0);
        assert_eq!(list[0].total, 0.0);
    }

    #[test]
    fn test_list_receipts_by_date_range() {
        let db = Database::in_memory().unwrap();
        for day in ["2024-01-10", "2024-01-20", "2024-02-05"] {
            let mut receipt = aldi_receipt();
            receipt.bought_date = day.into();
            db.create_receipt(&receipt).unwrap();
        }

        let january = db
            .list_receipts_by_date_range(date("2024-01-01"), date("2024-01-31"), Page::default())
            .unwrap();
        assert_eq!(january.len(), 2);
        assert_eq!(january[0].bought_date, date("2024-01-20"));

        // Bounds are inclusive
        let single = db
            .list_receipts_by_date_range(date("2024-02-05"), date("2024-02-05"), Page::default())
            .unwrap();
        assert_eq!(single.len(), 1);

        assert!(matches!(
            db.list_receipts_by_date_range(date("2024-02-01"), date("2024-01-01"), Page::default()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_receipts_by_store() {
        let db = Database::in_memory().unwrap();
        db.create_receipt(&aldi_receipt()).unwrap();
        let mut carrefour = aldi_receipt();
        carrefour.store_name = "CARREFOUR".into();
        db.create_receipt(&carrefour).unwrap();

        let store = db.find_store_by_name("CARREFOUR").unwrap().unwrap();
        let receipts = db.receipts_by_store(store.id, Page::default()).unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].store_name, "CARREFOUR");

        assert!(db.receipts_by_store(999, Page::default()).unwrap().is_empty());
    }

    #[test]
    fn test_delete_receipt_cascades_to_items_only() {
        let db = Database::in_memory().unwrap();
        let id = db.create_receipt(&aldi_receipt()).unwrap();

        db.delete_receipt(id).unwrap();

        assert_eq!(table_count(&db, "items"), 0);
        assert_eq!(table_count(&db, "stores"), 1);
        assert_eq!(table_count(&db, "products"), 2);
        assert!(matches!(db.get_receipt(id), Err(Error::NotFound(_))));
        assert!(matches!(db.delete_receipt(id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_deleted_receipt_can_be_stored_again() {
        let db = Database::in_memory().unwrap();
        let id = db.create_receipt(&aldi_receipt()).unwrap();
        db.delete_receipt(id).unwrap();

        let new_id = db.create_receipt(&aldi_receipt()).unwrap();
        assert_ne!(id, new_id);
    }

    #[test]
    fn test_deleted_ids_are_never_reused() {
        let db = Database::in_memory().unwrap();
        let aldi = db.create_receipt(&aldi_receipt()).unwrap();
        let stale_item = db.get_receipt(aldi).unwrap().items[0].id;
        db.delete_receipt(aldi).unwrap();

        let lidl = db
            .create_receipt(&NewReceipt {
                store_name: "LIDL".into(),
                bought_date: "2024-02-01".into(),
                discounts: None,
                items: vec![item("Eggs", 1.0, 2.49), item("Rice", 1.0, 1.19)],
            })
            .unwrap();
        assert!(lidl > aldi);

        assert!(matches!(db.get_receipt(aldi), Err(Error::NotFound(_))));
        assert!(matches!(db.get_item(stale_item), Err(Error::NotFound(_))));
        assert!(matches!(
            db.update_item(stale_item, 5.0, 9.99),
            Err(Error::NotFound(_))
        ));

        // The new receipt's lines were untouched by the stale update
        let stored = db.get_receipt(lidl).unwrap();
        assert!(stored.items.iter().all(|i| i.id > stale_item));
        assert!((stored.subtotal() - 3.68).abs() < 1e-9);
    }

    #[test]
    fn test_get_receipt_after_delete_is_not_found_not_empty() {
        let db = Database::in_memory().unwrap();
        let id = db.create_receipt(&aldi_receipt()).unwrap();

        let before = db.get_receipt(id).unwrap();
        assert_eq!(before.items.len(), 2);

        db.delete_receipt(id).unwrap();
        assert!(matches!(db.get_receipt(id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_item_names_with_delimiters_are_distinct_receipts() {
        let db = Database::in_memory().unwrap();
        let receipt = |items| NewReceipt {
            store_name: "S".into(),
            bought_date: "2024-01-15".into(),
            discounts: None,
            items,
        };

        let joined = db
            .create_receipt(&receipt(vec![item("A:1.000:1.00|B", 1.0, 1.0)]))
            .unwrap();
        let split = db
            .create_receipt(&receipt(vec![item("A", 1.0, 1.0), item("B", 1.0, 1.0)]))
            .unwrap();

        assert_ne!(joined, split);
        assert_eq!(table_count(&db, "receipts"), 2);
    }

    #[test]
    fn test_negative_zero_price_is_same_receipt_as_zero() {
        let db = Database::in_memory().unwrap();
        let mut free_bag = aldi_receipt();
        free_bag.items.push(item("Bag", 1.0, 0.0));
        let first = db.create_receipt(&free_bag).unwrap();

        let mut neg_zero = aldi_receipt();
        neg_zero.items.push(item("Bag", 1.0, -0.0));
        match db.create_receipt(&neg_zero) {
            Err(Error::Duplicate { existing_id }) => assert_eq!(existing_id, first),
            other => panic!("expected duplicate error, got {:?}", other),
        }

        // Stored values never keep the sign of zero
        let mut zero_discount = aldi_receipt();
        zero_discount.store_name = "LIDL".into();
        zero_discount.discounts = Some(-0.0);
        zero_discount.items.push(item("Bag", 1.0, -0.0));
        let id = db.create_receipt(&zero_discount).unwrap();
        let stored = db.get_receipt(id).unwrap();
        assert!(stored.discounts.is_sign_positive());
        assert!(stored.items.iter().all(|i| i.price_paid.is_sign_positive()));
    }

    #[test]
    fn test_update_item() {
        let db = Database::in_memory().unwrap();
        let id = db.create_receipt(&aldi_receipt()).unwrap();
        let receipt = db.get_receipt(id).unwrap();
        let milk = receipt.items.iter().find(|i| i.product_name == "Milk").unwrap();

        db.update_item(milk.id, 3.0, 1.00).unwrap();

        let updated = db.get_item(milk.id).unwrap();
        assert_eq!(updated.quantity, 3.0);
        assert_eq!(updated.price_paid, 1.0);

        // Aggregates follow the edited rows, the fingerprint does not
        let after = db.get_receipt(id).unwrap();
        assert!((after.subtotal() - 4.20).abs() < 1e-9);
        assert_eq!(after.receipt_hash, receipt.receipt_hash);
        let summary = &db.list_receipts(Page::default()).unwrap()[0];
        assert!((summary.total - 3.70).abs() < 1e-9);
    }

    #[test]
    fn test_update_missing_item_changes_nothing() {
        let db = Database::in_memory().unwrap();
        let id = db.create_receipt(&aldi_receipt()).unwrap();
        let before = db.get_receipt(id).unwrap();

        assert!(matches!(
            db.update_item(9999, 1.0, 1.0),
            Err(Error::NotFound(_))
        ));

        let after = db.get_receipt(id).unwrap();
        for (a, b) in before.items.iter().zip(after.items.iter()) {
            assert_eq!(a.quantity, b.quantity);
            assert_eq!(a.price_paid, b.price_paid);
        }
    }

    #[test]
    fn test_update_item_validates_values() {
        let db = Database::in_memory().unwrap();
        let id = db.create_receipt(&aldi_receipt()).unwrap();
        let item_id = db.get_receipt(id).unwrap().items[0].id;

        assert!(matches!(
            db.update_item(item_id, 0.0, 1.0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            db.update_item(item_id, 1.0, -0.01),
            Err(Error::Validation(_))
        ));

        db.update_item(item_id, 1.0, -0.0).unwrap();
        assert!(db.get_item(item_id).unwrap().price_paid.is_sign_positive());
    }

    #[test]
    fn test_concurrent_duplicate_submissions_store_one_receipt() {
        let db = Database::in_memory().unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.create_receipt(&aldi_receipt()))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let stored = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(Error::Duplicate { .. })))
            .count();

        assert_eq!(stored, 1);
        assert_eq!(duplicates, 3);
        assert_eq!(table_count(&db, "receipts"), 1);
    }
}
