use std::collections::BTreeMap;

use common::UserId;
use criterion::{Criterion, criterion_group, criterion_main};
use document_store::InMemoryDocumentStore;
use domain::catalog::NewProduct;
use domain::order::{LineRequest, ShippingAddress};
use domain::validation::{is_valid_card_number, is_valid_email, validate_registration};
use domain::{
    CatalogService, Category, Money, OrderService, PaymentMethod, PlaceOrder, Product, Variant,
};

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "1 Bench St".to_string(),
        city: "Benchville".to_string(),
        state: "CA".to_string(),
        zip_code: "90210".to_string(),
        country: "US".to_string(),
    }
}

async fn seed(catalog: &CatalogService<InMemoryDocumentStore>, variants: u32) -> Product {
    let variants = (0..variants)
        .map(|i| Variant {
            color: format!("color-{i}"),
            size: "standard".to_string(),
            stock: 1_000_000,
            price: Money::from_cents(1000 + i64::from(i)),
            sku: format!("BENCH-{i:03}"),
        })
        .collect();
    catalog
        .create_product(NewProduct {
            name: "Bench Console".to_string(),
            description: "Benchmark product".to_string(),
            category: Category::Console,
            brand: "Bench".to_string(),
            images: vec!["https://img.test/bench.png".to_string()],
            features: vec![],
            specifications: BTreeMap::new(),
            variants,
        })
        .await
        .unwrap()
}

fn bench_validators(c: &mut Criterion) {
    c.bench_function("domain/luhn_16_digits", |b| {
        b.iter(|| is_valid_card_number(std::hint::black_box("4111 1111 1111 1111")));
    });

    c.bench_function("domain/email_shape", |b| {
        b.iter(|| is_valid_email(std::hint::black_box("jane.doe@example.com")));
    });

    c.bench_function("domain/validate_registration", |b| {
        b.iter(|| validate_registration("jane.doe@example.com", "secret1", "Jane Doe"));
    });
}

fn bench_place_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    let catalog = CatalogService::new(store.clone());
    let orders = OrderService::new(store);
    let product = rt.block_on(seed(&catalog, 1));

    c.bench_function("domain/place_order_single_line", |b| {
        b.iter(|| {
            rt.block_on(async {
                let cmd = PlaceOrder::new(
                    UserId::new(),
                    vec![LineRequest::new(product.id, "color-0", "standard", 1)],
                    address(),
                    PaymentMethod::Paypal,
                );
                orders.place_order(cmd).await.unwrap();
            });
        });
    });
}

fn bench_place_order_ten_lines(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryDocumentStore::new();
    let catalog = CatalogService::new(store.clone());
    let orders = OrderService::new(store);
    let product = rt.block_on(seed(&catalog, 10));

    c.bench_function("domain/place_order_ten_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                let lines = (0..10)
                    .map(|i| LineRequest::new(product.id, format!("color-{i}"), "standard", 1))
                    .collect();
                let cmd = PlaceOrder::new(UserId::new(), lines, address(), PaymentMethod::Paypal);
                orders.place_order(cmd).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_validators,
    bench_place_order,
    bench_place_order_ten_lines,
);
criterion_main!(benches);
