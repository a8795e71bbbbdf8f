//! Signed cart cookie codec.
//!
//! The cart lives entirely in the `cart_payload` cookie as
//! `base64url(json) "." base64url(hmac_sha256(base64url(json)))`. The payload is
//! readable by the client but cannot be altered without the server key.
//!
//! Decoding never fails: a missing, tampered or malformed token is an empty
//! cart, and individual lines that do not validate are dropped.

use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tower_sessions::cookie::time::Duration;
use tower_sessions::cookie::{Cookie, SameSite};

use maison_core::{Cart, CartLine, DEFAULT_VARIANT, ProductId};

use crate::state::AppState;

/// Name of the cookie holding the cart token.
pub const CART_COOKIE_NAME: &str = "cart_payload";

/// Cart cookie lifetime in days.
const CART_COOKIE_DAYS: i64 = 30;

type HmacSha256 = Hmac<Sha256>;

/// The signing key was rejected by HMAC.
#[derive(Debug, thiserror::Error)]
#[error("invalid cart signing key")]
pub struct InvalidCartKey;

/// Encodes carts into signed tokens and back.
#[derive(Clone)]
pub struct CartCodec {
    mac: HmacSha256,
}

impl CartCodec {
    /// Create a codec keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key cannot initialize HMAC.
    pub fn new(secret: &[u8]) -> Result<Self, InvalidCartKey> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret).map_err(|_| InvalidCartKey)?,
        })
    }

    /// Serialize and sign a cart.
    #[must_use]
    pub fn encode(&self, cart: &Cart) -> String {
        let json = serde_json::to_vec(cart).unwrap_or_else(|_| b"[]".to_vec());
        let payload = URL_SAFE_NO_PAD.encode(json);
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload));
        format!("{payload}.{signature}")
    }

    /// Verify and parse a token. Anything invalid yields an empty cart.
    #[must_use]
    pub fn decode(&self, token: &str) -> Cart {
        self.try_decode(token).unwrap_or_default()
    }

    fn try_decode(&self, token: &str) -> Option<Cart> {
        let (payload, signature) = token.trim().split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let Value::Array(items) = serde_json::from_slice::<Value>(&json).ok()? else {
            return None;
        };

        Some(Cart::from_lines(items.iter().filter_map(parse_line)))
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Cart token from the request's `Cookie` headers.
    #[must_use]
    pub fn read(&self, headers: &HeaderMap) -> Cart {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == CART_COOKIE_NAME)
            .map_or_else(Cart::new, |(_, value)| self.decode(value))
    }

    /// The `cart_payload` cookie carrying `cart`.
    #[must_use]
    pub fn cookie(&self, cart: &Cart, secure: bool) -> Cookie<'static> {
        Cookie::build((CART_COOKIE_NAME, self.encode(cart)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .max_age(Duration::days(CART_COOKIE_DAYS))
            .build()
    }

    /// A `Set-Cookie` response part storing `cart`.
    #[must_use]
    pub fn set_cookie(&self, cart: &Cart, secure: bool) -> [(HeaderName, String); 1] {
        [(SET_COOKIE, self.cookie(cart, secure).to_string())]
    }
}

/// Accept a positive integer given as a JSON number or a numeric string.
fn positive_int(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (n > 0).then_some(n)
}

fn variant(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => DEFAULT_VARIANT.to_string(),
    }
}

fn parse_line(value: &Value) -> Option<CartLine> {
    let object = value.as_object()?;
    let product_id = i32::try_from(positive_int(object.get("productId")?)?).ok()?;
    let quantity = u32::try_from(positive_int(object.get("quantity")?)?).ok()?;
    Some(CartLine::new(
        ProductId::new(product_id),
        quantity,
        &variant(object.get("color")),
        &variant(object.get("length")),
    ))
}

/// The shopper's cart, decoded from the request cookie.
///
/// Never rejects: an absent or invalid cookie is an empty cart.
pub struct CurrentCart(pub Cart);

impl FromRequestParts<AppState> for CurrentCart {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.cart_codec().read(&parts.headers)))
    }
}
