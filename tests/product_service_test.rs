mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;

use common::TestApp;
use inventory_ledger::{
    errors::ServiceError,
    forms::ProductForm,
    models::TransactionType,
    store::{self, DocumentStore},
};

#[tokio::test]
async fn create_uploads_images_and_writes_the_product() {
    let app = TestApp::new();
    let session = app.sign_up("owner@example.com").await;
    let supplier = app.supplier("Acme").await;

    let mut form = TestApp::product_form("Pen", 10, &supplier);
    form.new_images.push(vec![1, 2, 3]);
    let item = app.state.products.create_product(&form).await.unwrap();

    assert_eq!(item.user_id, session.user_id());
    assert_eq!(item.supplier_name, "Acme");
    assert_eq!(item.image_urls.len(), 2);
    for url in &item.image_urls {
        let path = url.strip_prefix("https://blobs.test/").unwrap();
        assert!(path.starts_with("images/") && path.ends_with(".jpg"));
        assert_eq!(app.blobs.content_type(path).as_deref(), Some("image/jpeg"));
    }
    assert_eq!(app.blobs.len(), 2);

    let stored = app.state.products.get_product(&item.id).await.unwrap();
    assert_eq!(stored, item);
}

#[tokio::test]
async fn failed_upload_writes_no_document() {
    let app = TestApp::new();
    app.sign_up("owner@example.com").await;
    let supplier = app.supplier("Acme").await;

    app.blobs.set_offline(true);
    let result = app
        .state
        .products
        .create_product(&TestApp::product_form("Pen", 10, &supplier))
        .await;
    assert_matches!(result, Err(ServiceError::ExternalServiceError(_)));
    assert_eq!(app.store.count("inventory").await.unwrap(), 0);

    // one good image and one the store refuses
    app.blobs.set_offline(false);
    let mut form = TestApp::product_form("Pen", 10, &supplier);
    form.new_images.push(Vec::new());
    let result = app.state.products.create_product(&form).await;
    assert_matches!(result, Err(ServiceError::ExternalServiceError(_)));
    assert_eq!(app.store.count("inventory").await.unwrap(), 0);
}

#[tokio::test]
async fn create_requires_session_supplier_and_images() {
    let app = TestApp::new();
    let supplier = app.supplier("Acme").await;
    let form = TestApp::product_form("Pen", 1, &supplier);
    assert_matches!(
        app.state.products.create_product(&form).await,
        Err(ServiceError::Unauthorized(_))
    );

    app.sign_up("owner@example.com").await;
    let mut no_supplier = form.clone();
    no_supplier.supplier = None;
    let err = app.state.products.create_product(&no_supplier).await.unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Please select a supplier");

    let mut no_images = form.clone();
    no_images.new_images.clear();
    let err = app.state.products.create_product(&no_images).await.unwrap_err();
    assert_eq!(err.to_string(), "Validation error: Images data is missing");

    let mut bad_price = form;
    bad_price.price = "free".into();
    assert_matches!(
        app.state.products.create_product(&bad_price).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_eq!(app.blobs.len(), 0);
}

#[tokio::test]
async fn listing_is_scoped_to_the_user_and_skips_bad_documents() {
    let app = TestApp::new();
    let mine = app.seeded_product(3).await;

    app.store
        .set(
            "inventory",
            "someone-else",
            store::object(json!({
                "name": "Other", "category": "", "description": "", "price": 1.0,
                "stock": 1, "supplierId": "s", "supplierName": "S", "userId": "other-user"
            })),
        )
        .await
        .unwrap();
    app.store
        .set(
            "inventory",
            "broken",
            store::object(json!({ "name": "No stock", "userId": mine.user_id })),
        )
        .await
        .unwrap();

    let listed = app.state.products.list_products().await.unwrap();
    assert_eq!(listed, vec![mine]);
}

#[tokio::test]
async fn edit_keeps_stock_and_appends_new_images() {
    let app = TestApp::new();
    let item = app.seeded_product(8).await;
    app.state
        .ledger
        .add_transaction(&item, TransactionType::Outgoing, 3, Utc::now())
        .await
        .unwrap();

    let supplier = app.supplier("Globex").await;
    let mut form = ProductForm::from_item(&item, Some(supplier.clone()));
    form.name = "Gel pen".into();
    form.stock = "999".into();
    form.new_images = vec![vec![7, 7, 7]];

    let updated = app.state.products.update_product(&item.id, &form).await.unwrap();
    assert_eq!(updated.name, "Gel pen");
    assert_eq!(updated.supplier_id, supplier.id);
    assert_eq!(updated.image_urls.len(), 2);
    assert_eq!(updated.image_urls[0], item.image_urls[0]);

    let stored = app.state.products.get_product(&item.id).await.unwrap();
    assert_eq!(stored.stock, 5);
    assert_eq!(stored.name, "Gel pen");
}

#[tokio::test]
async fn delete_removes_the_product_and_its_transactions() {
    let app = TestApp::new();
    let item = app.seeded_product(8).await;
    app.state
        .ledger
        .add_transaction(&item, TransactionType::Incoming, 1, Utc::now())
        .await
        .unwrap();

    app.state.products.delete_product(&item.id).await.unwrap();
    assert_matches!(
        app.state.products.get_product(&item.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert!(app.state.ledger.transactions(&item.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn dashboard_and_supplier_listing() {
    let app = TestApp::new();
    assert_matches!(
        app.state.dashboard.summary().await,
        Err(ServiceError::Unauthorized(_))
    );

    app.seeded_product(1).await;
    app.supplier("beta").await;
    app.supplier("Alpha").await;

    let summary = app.state.dashboard.summary().await.unwrap();
    assert_eq!((summary.products, summary.suppliers), (1, 3));

    let names: Vec<String> = app
        .state
        .suppliers
        .list_suppliers()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["Acme", "Alpha", "beta"]);
}

#[tokio::test]
async fn detail_loads_supplier_or_leaves_it_empty() {
    let app = TestApp::new();
    let item = app.seeded_product(1).await;
    let detail = app.state.open_product(item.clone()).await.unwrap();
    assert_eq!(detail.supplier().map(|s| s.name.as_str()), Some("Acme"));
    drop(detail);

    app.store.delete("suppliers", &item.supplier_id).await.unwrap();
    let detail = app.state.open_product(item).await.unwrap();
    assert!(detail.supplier().is_none());
}
