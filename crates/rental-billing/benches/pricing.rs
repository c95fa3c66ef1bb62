//! Pricing and proration benchmarks

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rental_billing::{
    BillingEngine, BillingInterval, Plan, PlanLimits, Subscription, SubscriptionStatus,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn pricing_benchmark(c: &mut Criterion) {
    let engine = BillingEngine::default();
    let plan = Plan::new("pro", "Pro", dec!(29.99)).with_limits(PlanLimits::unlimited());

    let mut group = c.benchmark_group("pricing_breakdown");
    for interval in BillingInterval::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(interval), &interval, |b, &interval| {
            b.iter(|| engine.pricing.get_pricing_breakdown(black_box(&plan), interval))
        });
    }
    group.finish();
}

fn proration_benchmark(c: &mut Criterion) {
    let engine = BillingEngine::default();
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let sub = Subscription {
        id: Uuid::new_v4(),
        merchant_id: Uuid::new_v4(),
        plan_id: "basic".into(),
        status: SubscriptionStatus::Active,
        billing_interval: BillingInterval::Month,
        amount: dec!(29.99),
        currency: "USD".into(),
        current_period_start: start,
        current_period_end: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        trial_start: None,
        trial_end: None,
        cancel_at_period_end: false,
        cancelled_at: None,
        cancel_reason: None,
        paused_at: None,
        created_at: start,
        updated_at: start,
    };
    let change_date = Some(Utc.with_ymd_and_hms(2024, 1, 16, 0, 0, 0).unwrap());

    c.bench_function("proration_upgrade", |b| {
        b.iter(|| {
            engine
                .proration
                .calculate_proration(black_box(&sub), black_box(dec!(59.99)), change_date)
        })
    });
}

criterion_group!(benches, pricing_benchmark, proration_benchmark);
criterion_main!(benches);
