//! Concurrent-writer behavior: settlement racing over shared stock, and
//! order numbering under parallel creation.

use cafeflow::db::init_db;
use cafeflow::db::repo::ItemRequest;
use cafeflow::domain::{Money, OrderType, PaymentMethod, Qty};
use cafeflow::error::AppError;
use cafeflow::Repository;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

async fn setup_repo() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

#[tokio::test]
async fn test_racing_settlements_never_oversell_stock() {
    let (repo, _temp) = setup_repo().await;

    // 10 kg of sugar; each order needs 6 kg. Only one settlement can win.
    let tea = repo
        .create_product(
            "Tea",
            Money::from_str("10").unwrap(),
            Money::from_str("5").unwrap(),
        )
        .await
        .unwrap();
    let sugar = repo
        .create_ingredient("SUGAR", "kg", Qty::from_str("10").unwrap(), Qty::zero(), None)
        .await
        .unwrap();
    repo.set_recipe(tea.id, sugar.id, Qty::from_str("0.010").unwrap())
        .await
        .unwrap();

    let mut order_ids: Vec<Uuid> = Vec::new();
    for i in 0..2 {
        let order = repo
            .create_order(
                OrderType::Takeaway,
                None,
                Some("Asha"),
                Some(&format!("987654321{}", i)),
            )
            .await
            .unwrap();
        repo.replace_items(
            order.id,
            &[ItemRequest {
                product_id: Some(tea.id),
                combo_id: None,
                quantity: 600,
            }],
            None,
        )
        .await
        .unwrap();
        order_ids.push(order.id);
    }

    let mut handles = Vec::new();
    for order_id in order_ids {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.settle_order(order_id, PaymentMethod::Cash, None).await
        }));
    }

    let mut successes = 0;
    let mut stock_failures = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::InsufficientStock(_)) => stock_failures += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(stock_failures, 1);

    let sugar = repo.get_ingredient(sugar.id).await.unwrap().unwrap();
    assert_eq!(sugar.current_stock.to_canonical_string(), "4.000");
    assert!(!sugar.current_stock.is_negative());
}

#[tokio::test]
async fn test_parallel_order_creation_yields_distinct_sequential_numbers() {
    let (repo, _temp) = setup_repo().await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_order(
                OrderType::Takeaway,
                None,
                Some("Asha"),
                Some(&format!("90000000{:02}", i)),
            )
            .await
        }));
    }

    let mut numbers: Vec<i64> = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap().unwrap().order_number);
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (1..=10).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_double_pay_race_records_single_payment() {
    let (repo, _temp) = setup_repo().await;

    let tea = repo
        .create_product(
            "Tea",
            Money::from_str("10").unwrap(),
            Money::from_str("5").unwrap(),
        )
        .await
        .unwrap();
    let sugar = repo
        .create_ingredient("SUGAR", "kg", Qty::from_str("10").unwrap(), Qty::zero(), None)
        .await
        .unwrap();
    repo.set_recipe(tea.id, sugar.id, Qty::from_str("0.010").unwrap())
        .await
        .unwrap();

    let order = repo
        .create_order(OrderType::Takeaway, None, Some("Asha"), Some("9876543210"))
        .await
        .unwrap();
    repo.replace_items(
        order.id,
        &[ItemRequest {
            product_id: Some(tea.id),
            combo_id: None,
            quantity: 10,
        }],
        None,
    )
    .await
    .unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let repo = repo.clone();
        let order_id = order.id;
        handles.push(tokio::spawn(async move {
            repo.settle_order(order_id, PaymentMethod::Cash, None).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(repo.count_payments(order.id).await.unwrap(), 1);

    // Stock was deducted exactly once.
    let sugar = repo.get_ingredient(sugar.id).await.unwrap().unwrap();
    assert_eq!(sugar.current_stock.to_canonical_string(), "9.900");
}
