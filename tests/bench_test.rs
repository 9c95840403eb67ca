//! Benchmark tests for critical operations
//!
//! Run with: cargo test --release bench -- --ignored --nocapture

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use tempfile::NamedTempFile;

use coupons::database::init_db;
use coupons::model::{CouponInput, DiscountType, UserRestrictions};
use coupons::service::CouponService;
use coupons::store::RedbCouponStore;

/// Benchmark helper to measure execution time
fn benchmark<F>(name: &str, iterations: usize, mut f: F)
where
    F: FnMut(usize),
{
    let start = Instant::now();

    for i in 0..iterations {
        f(i);
    }

    let duration = start.elapsed();
    let avg_ms = duration.as_millis() as f64 / iterations as f64;
    let ops_per_sec = (iterations as f64 / duration.as_secs_f64()) as u64;

    println!("  {} ({} iterations)", name, iterations);
    println!("    Total time: {:?}", duration);
    println!("    Avg time: {:.3}ms", avg_ms);
    println!("    Throughput: {} ops/sec\n", ops_per_sec);
}

fn setup_service() -> (CouponService, NamedTempFile) {
    let temp_db = NamedTempFile::new().unwrap();
    let db = init_db(temp_db.path().to_str().unwrap()).unwrap();
    let service = CouponService::new(Arc::new(RedbCouponStore::new(Arc::new(db))));
    (service, temp_db)
}

fn input(code: String) -> CouponInput {
    CouponInput {
        title: format!("{code} offer"),
        code,
        discount_type: DiscountType::Percentage,
        discount_value: 10.0,
        max_discount: Some(500.0),
        min_order_value: 0.0,
        valid_from: Utc::now() - Duration::days(1),
        valid_until: Utc::now() + Duration::days(1),
        usage_limit: None,
        user_usage_limit: 1,
        payment_methods: Vec::new(),
        user_restrictions: UserRestrictions::default(),
        is_active: true,
        priority: 0,
    }
}

#[test]
#[ignore] // Run explicitly with: cargo test bench --release -- --ignored --nocapture
fn bench_create_coupons() {
    println!("\n=== Benchmark: Create Coupons ===\n");

    let (service, _temp_db) = setup_service();

    benchmark("Create", 1000, |i| {
        service.create(input(format!("BENCH{i}")), Utc::now()).unwrap();
    });
}

#[test]
#[ignore]
fn bench_validate_and_apply() {
    println!("\n=== Benchmark: Validate & Apply ===\n");

    let (service, _temp_db) = setup_service();
    service.create(input("HOT".to_string()), Utc::now()).unwrap();

    benchmark("Validate", 5000, |i| {
        let _ = service
            .validate("HOT", 2000.0, &format!("user{i}"), None, Utc::now())
            .unwrap();
    });

    // Redemption log grows with every apply, so later writes are larger
    benchmark("Apply", 1000, |i| {
        service
            .apply("HOT", &format!("user{i}"), 2000.0, 200.0, Utc::now())
            .unwrap();
    });
}

#[test]
#[ignore]
fn bench_list_active() {
    println!("\n=== Benchmark: List Active ===\n");

    let (service, _temp_db) = setup_service();
    for i in 0..500 {
        service.create(input(format!("LIST{i}")), Utc::now()).unwrap();
    }

    benchmark("List 500 active coupons", 100, |_| {
        let coupons = service.list_active(Utc::now()).unwrap();
        assert_eq!(coupons.len(), 500);
    });
}
