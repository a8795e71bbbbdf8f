//! Cart rules and the signed cart cookie, through the public APIs.

#![allow(clippy::unwrap_used)]

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use maison_core::{Cart, CartLine, DEFAULT_VARIANT, ProductId};
use maison_integration_tests::TEST_SESSION_SECRET;
use maison_storefront::services::CartCodec;

fn line(id: i32, qty: u32, color: &str, length: &str) -> CartLine {
    CartLine::new(ProductId::new(id), qty, color, length)
}

fn codec() -> CartCodec {
    CartCodec::new(TEST_SESSION_SECRET.as_bytes()).unwrap()
}

#[test]
fn test_same_variant_merges_and_caps_at_stock() {
    let mut cart = Cart::new();
    cart.add(line(1, 2, "Black", "18"), 5);
    cart.add(line(1, 2, "Black", "18"), 5);
    cart.add(line(1, 4, "Black", "18"), 5);
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.item_count(), 5);

    cart.add(line(1, 1, "Brown", "18"), 5);
    assert_eq!(cart.len(), 2);
}

#[test]
fn test_update_and_remove_by_index() {
    let mut cart = Cart::from_lines([line(1, 1, "Black", "18"), line(2, 3, "Brown", "20")]);
    cart.update(1, 1, Some(10));
    assert_eq!(cart.item_count(), 2);

    cart.remove(0);
    assert_eq!(cart.lines(), &[line(2, 1, "Brown", "20")]);

    cart.remove(7);
    assert_eq!(cart.len(), 1);
}

#[test]
fn test_cookie_round_trip_through_headers() {
    let codec = codec();
    let cart = Cart::from_lines([line(3, 2, DEFAULT_VARIANT, DEFAULT_VARIANT)]);
    let cookie = codec.cookie(&cart, false);

    let mut headers = HeaderMap::new();
    headers.insert(
        COOKIE,
        format!("{}={}", cookie.name(), cookie.value()).parse().unwrap(),
    );
    assert_eq!(codec.read(&headers), cart);
}

#[test]
fn test_token_from_another_key_is_empty() {
    let other = CartCodec::new(b"Zp8Wn3Bc6Yh1Jd5Fs0Gak9Vq2xLm7Rt4").unwrap();
    let token = other.encode(&Cart::from_lines([line(1, 1, "Black", "18")]));
    assert!(codec().decode(&token).is_empty());
}

#[test]
fn test_garbage_tokens_are_empty() {
    let codec = codec();
    for token in ["", "abc", "a.b", "...."] {
        assert!(codec.decode(token).is_empty());
    }
}
