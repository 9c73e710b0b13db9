use mj_catalog::{validate_draft, Category, ProductDraft, Section};

fn draft() -> ProductDraft {
    ProductDraft {
        name: "Podadora telescópica".to_string(),
        description: "Pértiga de poda".to_string(),
        department: "JARDINERIA".to_string(),
        section: Section::HerramientasManuales,
        manufacturer: "Bellota".to_string(),
        category: Category::CorteYPoda,
        price_cents: 4_599,
        stock: 5,
        image_url: None,
        sold_out: false,
        featured: false,
    }
}

#[test]
fn valid_draft_passes() {
    assert!(validate_draft(&draft()).is_ok());
}

#[test]
fn sold_out_with_stock_is_rejected() {
    let mut d = draft();
    d.sold_out = true;

    let errs = validate_draft(&d).unwrap_err();
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].field, "sold_out");
}

#[test]
fn zero_stock_must_be_marked_sold_out() {
    let mut d = draft();
    d.stock = 0;
    let errs = validate_draft(&d).unwrap_err();
    assert_eq!(errs[0].field, "sold_out");

    d.sold_out = true;
    assert!(validate_draft(&d).is_ok());
}

#[test]
fn category_outside_section_is_rejected() {
    let mut d = draft();
    d.category = Category::Mangueras;

    let errs = validate_draft(&d).unwrap_err();
    assert_eq!(errs.len(), 1);
    assert_eq!(errs[0].field, "category");
    assert!(errs[0].message.contains("CORTE_Y_PODA"));
}

#[test]
fn all_violations_are_collected() {
    let mut d = draft();
    d.name = "   ".to_string();
    d.price_cents = -1;
    d.stock = 3;
    d.sold_out = true;
    d.category = Category::GafasYCascos;

    let fields: Vec<String> = validate_draft(&d)
        .unwrap_err()
        .into_iter()
        .map(|v| v.field)
        .collect();
    assert_eq!(fields, vec!["name", "price_cents", "sold_out", "category"]);
}
