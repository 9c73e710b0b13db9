//! Two guests race for the last unit. Row locks make exactly one of them
//! win; the other is bounced back to a cart without the product. Stock
//! never goes negative.
//!
//! DB-backed test. Skips if MJ_DATABASE_URL is not set.

use mj_catalog::{Category, ProductDraft, Section};
use mj_checkout::{
    AddressParts, CartAdjustment, CheckoutRequest, PaymentMethod, ShippingOption, ShippingPolicy,
};
use mj_db::{CartOwner, PlaceOrderOutcome};
use uuid::Uuid;

#[tokio::test]
async fn last_unit_is_sold_once() -> anyhow::Result<()> {
    let url = match std::env::var(mj_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: MJ_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await?;

    mj_db::migrate(&pool).await?;

    let tag = Uuid::new_v4().simple().to_string();
    let mower = mj_db::insert_product(
        &pool,
        &ProductDraft {
            name: format!("Cortacésped {tag}"),
            description: "último en stock".to_string(),
            department: "Maquinaria".to_string(),
            section: Section::MaquinariaDeJardin,
            manufacturer: "Honda".to_string(),
            category: Category::CortacespedesYDesbrozadoras,
            price_cents: 39_900,
            stock: 1,
            image_url: None,
            sold_out: false,
            featured: true,
        },
    )
    .await?;

    let a = CartOwner::Guest(Uuid::new_v4());
    let b = CartOwner::Guest(Uuid::new_v4());
    mj_db::add_to_cart(&pool, a, mower.id, 1).await?;
    mj_db::add_to_cart(&pool, b, mower.id, 1).await?;

    let req = CheckoutRequest {
        shipping: ShippingOption::StorePickup,
        payment: PaymentMethod::Gateway,
        email: format!("{tag}@example.com"),
        phone: String::new(),
        address: AddressParts::default(),
    };
    let policy = ShippingPolicy::default();

    let (ra, rb) = tokio::join!(
        mj_db::place_order(&pool, a, &req, &policy),
        mj_db::place_order(&pool, b, &req, &policy),
    );
    let outcomes = [ra?, rb?];

    let placed = outcomes
        .iter()
        .filter(|o| matches!(o, PlaceOrderOutcome::Placed(_)))
        .count();
    assert_eq!(placed, 1, "outcomes: {outcomes:?}");

    let bounced: Vec<&Vec<CartAdjustment>> = outcomes
        .iter()
        .filter_map(|o| match o {
            PlaceOrderOutcome::CartAdjusted { adjustments } => Some(adjustments),
            _ => None,
        })
        .collect();
    assert_eq!(bounced.len(), 1);
    assert_eq!(
        bounced[0],
        &vec![CartAdjustment::Removed {
            product_id: mower.id,
            name: mower.name.clone(),
        }]
    );

    let after = mj_db::fetch_product(&pool, mower.id).await?.unwrap();
    assert_eq!(after.stock, 0);
    assert!(after.sold_out);

    Ok(())
}
