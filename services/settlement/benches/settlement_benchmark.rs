use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use settlement::{
    claim_amounts, plan_purchase, plan_resolution, EventSnapshot, EventStatus, OptionSnapshot,
    PurchaseRequest,
};

fn event(status: EventStatus, sold: i32) -> EventSnapshot {
    EventSnapshot {
        id: 1,
        status,
        ticket_price: Decimal::new(25, 2),
        max_tickets: 1_000_000,
        tickets_sold: sold,
        pool_amount: Decimal::new(25, 2) * Decimal::from(sold),
        lock_time: Utc::now() + Duration::days(1),
        resolved_at: None,
    }
}

fn option() -> OptionSnapshot {
    OptionSnapshot {
        id: 1,
        event_id: 1,
        ticket_limit: Some(500_000),
        tickets_sold: 0,
        pool_amount: Decimal::ZERO,
    }
}

fn bench_purchase(c: &mut Criterion) {
    let event = event(EventStatus::Open, 1_000);
    let option = option();
    let now = Utc::now();

    c.bench_function("plan_purchase", |b| {
        b.iter(|| {
            let request = PurchaseRequest {
                option_id: 1,
                quantity: black_box(10),
                wallet_address: "Buyer11111111111111111111111111111111111111",
                signature_used: false,
            };
            plan_purchase(&event, &option, &request, "Treasury", now)
        })
    });
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_resolution");
    for winners in [1i64, 1_000, 100_000] {
        let event = event(EventStatus::Locked, 200_000);
        let option = option();
        group.bench_with_input(BenchmarkId::from_parameter(winners), &winners, |b, &w| {
            b.iter(|| plan_resolution(&event, &option, black_box(w), 250))
        });
    }
    group.finish();
}

fn bench_claim(c: &mut Criterion) {
    c.bench_function("claim_amounts", |b| {
        b.iter(|| claim_amounts(black_box(Decimal::new(3_333_333_333, 9))))
    });
}

criterion_group!(benches, bench_purchase, bench_resolution, bench_claim);
criterion_main!(benches);
