//! Build script for storefront crate.
//!
//! Generates content-based hashes for the stylesheets to enable immutable
//! caching. Each `static/css/{name}.css` is copied to
//! `static/css/derived/{name}.{hash}.css` and its hash exported as
//! `{NAME}_CSS_HASH`.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

const STYLESHEETS: [&str; 2] = ["main", "admin"];

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let css_dir = Path::new(&manifest_dir).join("static/css");

    for name in STYLESHEETS {
        hash_stylesheet(&css_dir, name);
    }
}

/// Hash one stylesheet and copy it into `derived/` with the hash in its name.
fn hash_stylesheet(css_dir: &Path, name: &str) {
    let css_path = css_dir.join(format!("{name}.css"));
    let env_name = format!("{}_CSS_HASH", name.to_uppercase());

    println!("cargo:rerun-if-changed={}", css_path.display());

    let content = match fs::read(&css_path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read {name}.css: {e}");
            println!("cargo:rustc-env={env_name}=");
            return;
        }
    };

    // First 8 hex chars of SHA-256
    let hash = format!("{:x}", Sha256::digest(&content));
    let short_hash = hash.get(..8).unwrap_or(&hash);

    println!("cargo:rustc-env={env_name}={short_hash}");

    let derived_dir = css_dir.join("derived");
    fs::create_dir_all(&derived_dir).expect("Failed to create derived CSS directory");
    fs::copy(&css_path, derived_dir.join(format!("{name}.{short_hash}.css")))
        .expect("Failed to copy CSS to derived directory");
}
