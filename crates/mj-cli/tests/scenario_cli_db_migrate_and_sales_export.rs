use mj_catalog::{Category, ProductDraft, Section};
use mj_checkout::{CheckoutRequest, OrderStatus, PaymentMethod, ShippingOption, ShippingPolicy};
use mj_db::{CartOwner, CreateCustomerOutcome, NewCustomer, PlaceOrderOutcome};
use predicates::prelude::*;
use uuid::Uuid;

/// `mj db migrate` must refuse while undelivered orders exist unless --yes;
/// once the order is delivered `mj sales export` writes it to CSV.
///
/// DB-backed test, skipped if MJ_DATABASE_URL is not set.
#[allow(deprecated)]
#[tokio::test]
async fn cli_migrate_guard_and_sales_export() -> anyhow::Result<()> {
    let url = match std::env::var(mj_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: MJ_DATABASE_URL not set");
            return Ok(());
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("SKIP: cannot connect to DB: {e}");
            return Ok(());
        }
    };
    mj_db::migrate(&pool).await?;

    // A customer with one undelivered order.
    let tag = Uuid::new_v4().simple().to_string();
    let customer = match mj_db::insert_customer(
        &pool,
        &NewCustomer {
            full_name: format!("Operador {tag}"),
            email: format!("{tag}@example.com"),
            phone: String::new(),
            address: String::new(),
        },
    )
    .await?
    {
        CreateCustomerOutcome::Created(c) => c,
        CreateCustomerOutcome::EmailTaken => panic!("fresh email was taken"),
    };
    let pots = mj_db::insert_product(
        &pool,
        &ProductDraft {
            name: format!("Maceta 30cm {tag}"),
            description: String::new(),
            department: String::new(),
            section: Section::CultivoYHuerto,
            manufacturer: "Nortene".to_string(),
            category: Category::MacetasEInvernaderos,
            price_cents: 1_450,
            stock: 10,
            image_url: None,
            sold_out: false,
            featured: false,
        },
    )
    .await?;

    let owner = CartOwner::Customer(customer.id);
    mj_db::add_to_cart(&pool, owner, pots.id, 3).await?;
    let req = CheckoutRequest {
        shipping: ShippingOption::StorePickup,
        payment: PaymentMethod::CashOnDelivery,
        email: customer.email.clone(),
        phone: String::new(),
        address: Default::default(),
    };
    let placed = match mj_db::place_order(&pool, owner, &req, &ShippingPolicy::default()).await? {
        PlaceOrderOutcome::Placed(p) => p,
        other => panic!("expected Placed, got {other:?}"),
    };

    // Without --yes => must fail with refusal message.
    let mut cmd = assert_cmd::Command::cargo_bin("mj")?;
    cmd.env(mj_db::ENV_DB_URL, &url).args(["db", "migrate"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("REFUSING MIGRATE"));

    // With --yes => should succeed.
    let mut cmd2 = assert_cmd::Command::cargo_bin("mj")?;
    cmd2.env(mj_db::ENV_DB_URL, &url)
        .args(["db", "migrate", "--yes"]);
    cmd2.assert()
        .success()
        .stdout(predicate::str::contains("migrations_applied=true"));

    // Deliver through the CLI; COD becomes paid.
    let order_id = placed.order_id.to_string();
    let mut deliver = assert_cmd::Command::cargo_bin("mj")?;
    deliver.env(mj_db::ENV_DB_URL, &url).args([
        "orders",
        "set-status",
        "--order-id",
        &order_id,
        "--status",
        "DELIVERED",
        "--notes",
        "collected",
    ]);
    deliver
        .assert()
        .success()
        .stdout(predicate::str::contains("changed=true"))
        .stdout(predicate::str::contains("paid=true"));

    let order = mj_db::fetch_order(&pool, placed.order_id).await?.unwrap();
    assert_eq!(order.status, OrderStatus::Delivered);

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("sales.csv");
    let out_str = out.to_string_lossy().to_string();
    let customer_id = customer.id.to_string();

    let mut export = assert_cmd::Command::cargo_bin("mj")?;
    export.env(mj_db::ENV_DB_URL, &url).args([
        "sales",
        "export",
        "--out",
        &out_str,
        "--customer-id",
        &customer_id,
    ]);
    export
        .assert()
        .success()
        .stdout(predicate::str::contains("orders=1"))
        .stdout(predicate::str::contains("revenue_cents=4350"));

    let csv = std::fs::read_to_string(&out)?;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3, "{csv}");
    assert!(lines[1].starts_with(&format!("{},", placed.order_id)));
    assert!(lines[1].ends_with(",CASH_ON_DELIVERY,43.50"));
    assert_eq!(lines[2], "TOTAL,,,,,1 orders,43.50");

    Ok(())
}
