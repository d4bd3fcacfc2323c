//! Integration tests for the scan-to-product flow.
//!
//! The recognition fake answers with whatever the test scripts, the
//! catalog is served by the fake backend transport, and the assertions
//! follow the product all the way into the recents list and the cart.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;

use scancart_integration_tests::{init_tracing, ok_with, product_json, rejected, TestEngine};

use scancart_client::catalog::LookupError;
use scancart_client::models::Product;
use scancart_client::recognition::{CapturedImage, RecognitionError, RecognitionResponse};
use scancart_core::ProductId;

fn small_frame() -> CapturedImage {
    CapturedImage::jpeg(vec![0u8; 10_000])
}

fn inline_product(id: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Inline {id}"),
        price: Decimal::from(5),
        stock_quantity: 3,
        images: Vec::new(),
        description: None,
    }
}

// =============================================================================
// Resolution Paths
// =============================================================================

#[tokio::test]
async fn test_barcode_scan_resolves_through_catalog() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        barcode: Some("5901234123457".to_string()),
        ..RecognitionResponse::default()
    });
    engine.http.respond(
        "GET /products/barcode/5901234123457",
        ok_with(product_json("p1", "Milk", "3.49")),
    );

    let product = engine.state.recognition().resolve(small_frame()).await.unwrap();

    assert_eq!(product.id.as_str(), "p1");
    assert_eq!(product.price, Decimal::new(349, 2));
    let recents = engine.state.recent().list();
    assert_eq!(recents.len(), 1);
    assert_eq!(recents.first().unwrap().id.as_str(), "p1");
}

#[tokio::test]
async fn test_barcode_beats_inline_product() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        barcode: Some("5901234123457".to_string()),
        product: Some(inline_product("inline")),
        ..RecognitionResponse::default()
    });
    engine.http.respond(
        "GET /products/barcode/5901234123457",
        ok_with(product_json("from-catalog", "Milk", "3.49")),
    );

    let product = engine.state.recognition().resolve(small_frame()).await.unwrap();

    // The catalog answer wins; the inline product is only a fallback.
    assert_eq!(product.id.as_str(), "from-catalog");
    let paths: Vec<_> = engine.http.requests().into_iter().map(|r| r.path).collect();
    assert!(paths.contains(&"/products/barcode/5901234123457".to_string()));
}

#[tokio::test]
async fn test_product_reference_resolves_by_id() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        product_id: Some(ProductId::new("p7")),
        ..RecognitionResponse::default()
    });
    engine.http.respond(
        "GET /products/p7",
        ok_with(product_json("p7", "Oats", "2.10")),
    );

    let product = engine.state.recognition().resolve(small_frame()).await.unwrap();

    assert_eq!(product.name, "Oats");
}

#[tokio::test]
async fn test_inline_product_skips_catalog() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        product: Some(inline_product("p3")),
        ..RecognitionResponse::default()
    });

    let product = engine.state.recognition().resolve(small_frame()).await.unwrap();

    assert_eq!(product.id.as_str(), "p3");
    assert!(engine.http.requests().is_empty());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_unrecognized_frame_records_nothing() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    // The default scripted response recognizes nothing.

    let err = engine
        .state
        .recognition()
        .resolve(small_frame())
        .await
        .unwrap_err();

    assert!(matches!(err, RecognitionError::NotRecognized));
    assert!(engine.state.recent().list().is_empty());
}

#[tokio::test]
async fn test_recognized_but_unknown_product_is_lookup_failure() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        barcode: Some("0000000000000".to_string()),
        ..RecognitionResponse::default()
    });
    engine.http.respond(
        "GET /products/barcode/0000000000000",
        rejected("Product not found"),
    );

    let err = engine
        .state
        .recognition()
        .resolve(small_frame())
        .await
        .unwrap_err();

    assert!(matches!(err, RecognitionError::Lookup(LookupError::NotFound)));
    assert!(engine.state.recent().list().is_empty());
}

#[tokio::test]
async fn test_recognizer_failure_carries_reason() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        error: Some("model unavailable".to_string()),
        ..RecognitionResponse::default()
    });

    let err = engine
        .state
        .recognition()
        .resolve(small_frame())
        .await
        .unwrap_err();

    match err {
        RecognitionError::Transport(reason) => assert_eq!(reason, "model unavailable"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

// =============================================================================
// Upload Compression
// =============================================================================

#[tokio::test]
async fn test_oversized_frame_compressed_before_upload() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        product: Some(inline_product("p3")),
        ..RecognitionResponse::default()
    });

    engine
        .state
        .recognition()
        .resolve(CapturedImage::jpeg(vec![0u8; 1_200_000]))
        .await
        .unwrap();

    assert_eq!(engine.transcoder.qualities(), vec![0.5]);
    assert_eq!(engine.recognition.uploads(), vec![600_000]);
}

#[tokio::test]
async fn test_small_frame_uploads_untouched() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        product: Some(inline_product("p3")),
        ..RecognitionResponse::default()
    });

    engine
        .state
        .recognition()
        .resolve(CapturedImage::jpeg(vec![0u8; 10_000]))
        .await
        .unwrap();

    assert!(engine.transcoder.qualities().is_empty());
    assert_eq!(engine.recognition.uploads(), vec![10_000]);
}

// =============================================================================
// Scan Into Cart
// =============================================================================

#[tokio::test]
async fn test_scanned_product_lands_in_cart_with_totals() {
    init_tracing();
    let engine = TestEngine::new();
    engine.state.initialize().await;
    engine.recognition.set_response(RecognitionResponse {
        barcode: Some("5901234123457".to_string()),
        ..RecognitionResponse::default()
    });
    engine.http.respond(
        "GET /products/barcode/5901234123457",
        ok_with(product_json("p1", "Milk", "100")),
    );

    let product = engine.state.recognition().resolve(small_frame()).await.unwrap();
    engine.state.cart().add_item(&product, 2).await;

    let totals = engine.state.cart().totals().await;
    assert_eq!(totals.subtotal, Decimal::from(200));
    assert_eq!(totals.tax, Decimal::from(34));
    assert_eq!(totals.total, Decimal::from(234));
    assert_eq!(totals.item_count, 2);
}
