//! Admin product management: create, edit and delete catalog entries.
//!
//! The product form is multipart so media can be uploaded with it. Text
//! fields are validated before anything is uploaded, and uploads are removed
//! again if the database write fails.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maison_core::{MediaItem, MediaKind, ProductId, Slug, parse_csv_list};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use super::AdminPage;
use crate::db::RepositoryError;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Product};
use crate::routes::SelectOption;
use crate::routes::multipart::MultipartForm;
use crate::routes::shop::LACE_TYPES;
use crate::services::storage::{Bucket, ObjectStorage, StorageError, Upload, path_from_public_url};
use crate::state::AppState;

/// Most images one submission may carry.
pub const MAX_IMAGES: usize = 8;

const CAP_SIZES: [&str; 3] = ["Small", "Medium", "Large"];
const DEFAULT_CATEGORY: &str = "Straight";
const DEFAULT_LACE_TYPE: &str = "Closure";
const DEFAULT_DENSITY: &str = "180%";
const DEFAULT_CAP_SIZE: &str = "Medium";
const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 2;

const REQUIRED_MESSAGE: &str = "Name, SKU, and slug are required.";
const SLUG_TAKEN_MESSAGE: &str = "A product with this slug already exists.";

// =============================================================================
// Form Values
// =============================================================================

/// Raw form values, echoed back into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub stock_qty: String,
    pub low_stock_threshold: String,
    pub lace_type: String,
    pub density: String,
    pub cap_size: String,
    pub colors: String,
    pub lengths: String,
}

impl ProductFields {
    /// Blank form for a new product.
    fn defaults() -> Self {
        Self {
            category: DEFAULT_CATEGORY.to_string(),
            stock_qty: "0".to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD.to_string(),
            lace_type: DEFAULT_LACE_TYPE.to_string(),
            density: DEFAULT_DENSITY.to_string(),
            cap_size: DEFAULT_CAP_SIZE.to_string(),
            ..Self::default()
        }
    }

    fn from_form(form: &MultipartForm) -> Self {
        let text = |name: &str| form.text(name).to_string();
        Self {
            name: text("name"),
            slug: text("slug"),
            sku: text("sku"),
            description: text("description"),
            category: text("category"),
            price: text("price"),
            stock_qty: text("stockQty"),
            low_stock_threshold: text("lowStockThreshold"),
            lace_type: text("laceType"),
            density: text("density"),
            cap_size: text("capSize"),
            colors: text("colors"),
            lengths: text("lengths"),
        }
    }
}

impl From<&Product> for ProductFields {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            slug: product.slug.clone(),
            sku: product.sku.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: product.price.to_string(),
            stock_qty: product.stock_qty.to_string(),
            low_stock_threshold: product.low_stock_threshold.to_string(),
            lace_type: product.lace_type.clone(),
            density: product.density.clone(),
            cap_size: product.cap_size.clone(),
            colors: product.colors.join(", "),
            lengths: product.lengths.join(", "),
        }
    }
}

/// Options for a select, keeping a current value that is not in `choices`.
fn options<'a>(choices: impl IntoIterator<Item = &'a str>, current: &str) -> Vec<SelectOption> {
    let mut options: Vec<SelectOption> = choices
        .into_iter()
        .map(|c| SelectOption::new(c, c, current))
        .collect();
    if !current.is_empty() && !options.iter().any(|o| o.selected) {
        options.push(SelectOption::new(current, current, current));
    }
    options
}

fn whole_number(value: &str, default: i32, label: &str) -> Result<i32, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(default);
    }
    let n: i32 = value
        .parse()
        .map_err(|_| format!("{label} must be a whole number."))?;
    if n < 0 {
        return Err(format!("{label} cannot be negative."));
    }
    Ok(n)
}

/// Validate submitted fields into a product with `media`.
///
/// # Errors
///
/// Returns the message to show above the form.
pub fn product_input(form: &MultipartForm, media: Vec<MediaItem>) -> Result<NewProduct, String> {
    let (Some(name), Some(sku)) = (form.non_blank("name"), form.non_blank("sku")) else {
        return Err(REQUIRED_MESSAGE.to_string());
    };
    let slug = Slug::from_title(form.non_blank("slug").unwrap_or(name))
        .map_err(|_| REQUIRED_MESSAGE.to_string())?;

    let price = match form.non_blank("price") {
        None => Decimal::ZERO,
        Some(value) => value
            .parse::<Decimal>()
            .map_err(|_| "Price must be a number.".to_string())?,
    };
    if price.is_sign_negative() {
        return Err("Price cannot be negative.".to_string());
    }

    let or_default = |field: &str, default: &str| form.non_blank(field).unwrap_or(default).to_string();

    Ok(NewProduct {
        name: name.to_string(),
        slug: slug.into_inner(),
        sku: sku.to_string(),
        description: form.text("description").trim().to_string(),
        category: or_default("category", DEFAULT_CATEGORY),
        price: price.round_dp(2),
        stock_qty: whole_number(form.text("stockQty"), 0, "Stock")?,
        low_stock_threshold: whole_number(
            form.text("lowStockThreshold"),
            DEFAULT_LOW_STOCK_THRESHOLD,
            "Low stock threshold",
        )?,
        lace_type: or_default("laceType", DEFAULT_LACE_TYPE),
        density: or_default("density", DEFAULT_DENSITY),
        cap_size: or_default("capSize", DEFAULT_CAP_SIZE),
        colors: parse_csv_list(form.text("colors")),
        lengths: parse_csv_list(form.text("lengths")),
        media,
    })
}

/// Files attached to the form, tagged with the kind of media they become.
///
/// # Errors
///
/// Returns the message to show when more than [`MAX_IMAGES`] images are sent.
pub fn media_uploads(form: &MultipartForm) -> Result<Vec<(MediaKind, &Upload)>, String> {
    let images: Vec<_> = form.files("images").collect();
    if images.len() > MAX_IMAGES {
        return Err(format!("You can upload up to {MAX_IMAGES} images."));
    }

    Ok(images
        .into_iter()
        .map(|upload| (MediaKind::Image, upload))
        .chain(form.file("video").map(|upload| (MediaKind::Video, upload)))
        .chain(form.file("model").map(|upload| (MediaKind::Model, upload)))
        .collect())
}

/// Text fields first, then the attached files.
fn validate(form: &MultipartForm) -> Result<(NewProduct, Vec<(MediaKind, &Upload)>), String> {
    let input = product_input(form, Vec::new())?;
    Ok((input, media_uploads(form)?))
}

// =============================================================================
// Media Uploads
// =============================================================================

/// Media stored for one submission.
#[derive(Debug, Default)]
pub struct UploadedMedia {
    pub items: Vec<MediaItem>,
    paths: Vec<String>,
}

impl UploadedMedia {
    /// Remove everything this submission stored.
    pub async fn discard<S: ObjectStorage>(&self, storage: &S) {
        for path in &self.paths {
            if let Err(e) = storage.remove(Bucket::Products, path).await {
                warn!(error = %e, path = %path, "Failed to remove orphaned upload");
            }
        }
    }
}

/// Upload every file into the products bucket, in order.
///
/// # Errors
///
/// Returns the first storage error. Files stored before it are removed.
pub async fn upload_media<S: ObjectStorage>(
    storage: &S,
    uploads: &[(MediaKind, &Upload)],
    alt: &str,
) -> Result<UploadedMedia, StorageError> {
    let mut uploaded = UploadedMedia::default();

    for (kind, upload) in uploads {
        match storage.upload(Bucket::Products, kind.folder(), upload).await {
            Ok(stored) => {
                uploaded.items.push(MediaItem {
                    kind: *kind,
                    path: stored.public_url,
                    alt: kind_alt(*kind, alt),
                });
                uploaded.paths.push(stored.path);
            }
            Err(e) => {
                uploaded.discard(storage).await;
                return Err(e);
            }
        }
    }

    Ok(uploaded)
}

fn kind_alt(kind: MediaKind, alt: &str) -> Option<String> {
    (kind == MediaKind::Image).then(|| {
        if alt.trim().is_empty() {
            "Product image".to_string()
        } else {
            alt.trim().to_string()
        }
    })
}

/// Media a product carries after an edit, and what it no longer references.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaChange {
    pub media: Vec<MediaItem>,
    pub dropped: Vec<MediaItem>,
}

/// Combine current media with this submission's uploads.
///
/// Without new uploads the current media is left alone. Otherwise uploads are
/// appended when `keep_existing` is set and replace the current media when not.
#[must_use]
pub fn merge_media(current: &[MediaItem], uploaded: &[MediaItem], keep_existing: bool) -> MediaChange {
    if uploaded.is_empty() {
        return MediaChange {
            media: current.to_vec(),
            dropped: Vec::new(),
        };
    }
    if keep_existing {
        MediaChange {
            media: current.iter().chain(uploaded).cloned().collect(),
            dropped: Vec::new(),
        }
    } else {
        MediaChange {
            media: uploaded.to_vec(),
            dropped: current.to_vec(),
        }
    }
}

/// Best-effort removal of media that is no longer referenced.
async fn remove_media<S: ObjectStorage>(storage: &S, bucket_name: &str, media: &[MediaItem]) {
    for item in media {
        let Some(path) = path_from_public_url(&item.path, bucket_name) else {
            continue;
        };
        if let Err(e) = storage.remove(Bucket::Products, path).await {
            warn!(error = %e, path = %path, "Failed to remove product media");
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub page: AdminPage,
    pub heading: &'static str,
    pub action: String,
    pub editing: bool,
    pub fields: ProductFields,
    pub categories: Vec<SelectOption>,
    pub lace_types: Vec<SelectOption>,
    pub cap_sizes: Vec<SelectOption>,
    pub media: Vec<MediaItem>,
    pub max_images: usize,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn new(
        state: &AppState,
        product: Option<&Product>,
        fields: ProductFields,
        error: Option<String>,
    ) -> Self {
        let (heading, action) = product.map_or_else(
            || ("New Product", "/admin/products".to_string()),
            |p| ("Edit Product", format!("/admin/products/{}", p.id)),
        );
        Self {
            page: AdminPage::new(state, heading, true),
            heading,
            action,
            editing: product.is_some(),
            categories: options(
                state.config().brand.categories.iter().map(String::as_str),
                &fields.category,
            ),
            lace_types: options(LACE_TYPES, &fields.lace_type),
            cap_sizes: options(CAP_SIZES, &fields.cap_size),
            fields,
            media: product.map(|p| p.media.clone()).unwrap_or_default(),
            max_images: MAX_IMAGES,
            error,
        }
    }

    fn rejected(
        state: &AppState,
        product: Option<&Product>,
        form: &MultipartForm,
        message: String,
    ) -> Response {
        let page = Self::new(state, product, ProductFields::from_form(form), Some(message));
        (StatusCode::BAD_REQUEST, page).into_response()
    }
}

async fn read_form(multipart: Multipart) -> Result<MultipartForm, AppError> {
    MultipartForm::read(multipart)
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid product form: {e}")))
}

async fn find(state: &AppState, id: ProductId) -> Result<Product, AppError> {
    state
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the empty product form.
#[instrument(skip_all)]
pub async fn new_product(_admin: RequireAdmin, State(state): State<AppState>) -> impl IntoResponse {
    ProductFormTemplate::new(&state, None, ProductFields::defaults(), None)
}

/// Create a product with its uploaded media.
#[instrument(skip_all)]
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;

    let (mut input, uploads) = match validate(&form) {
        Ok(valid) => valid,
        Err(message) => return Ok(ProductFormTemplate::rejected(&state, None, &form, message)),
    };

    let uploaded = upload_media(state.storage(), &uploads, &input.name).await?;
    input.media.clone_from(&uploaded.items);

    match state.products().create(&input).await {
        Ok(product) => {
            info!(product_id = %product.id, slug = %product.slug, "Product created");
            Ok(Redirect::to("/admin").into_response())
        }
        Err(e) => {
            uploaded.discard(state.storage()).await;
            match e {
                RepositoryError::Conflict(_) => Ok(ProductFormTemplate::rejected(
                    &state,
                    None,
                    &form,
                    SLUG_TAKEN_MESSAGE.to_string(),
                )),
                e => Err(e.into()),
            }
        }
    }
}

/// Display the edit form for a product.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn edit(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let product = find(&state, id).await?;
    let fields = ProductFields::from(&product);
    Ok(ProductFormTemplate::new(&state, Some(&product), fields, None))
}

/// Update a product.
///
/// Media follows [`merge_media`]; replaced objects are removed once the row
/// is saved.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let product = find(&state, id).await?;
    let form = read_form(multipart).await?;

    let (mut input, uploads) = match validate(&form) {
        Ok(valid) => valid,
        Err(message) => {
            return Ok(ProductFormTemplate::rejected(&state, Some(&product), &form, message));
        }
    };

    let uploaded = upload_media(state.storage(), &uploads, &input.name).await?;
    let change = merge_media(
        &product.media,
        &uploaded.items,
        form.checked("keepExistingMedia"),
    );
    input.media = change.media;

    match state.products().update(id, &input).await {
        Ok(updated) => {
            remove_media(
                state.storage(),
                &state.config().storage.products_bucket,
                &change.dropped,
            )
            .await;
            info!(product_id = %updated.id, slug = %updated.slug, "Product updated");
            Ok(Redirect::to("/admin").into_response())
        }
        Err(e) => {
            uploaded.discard(state.storage()).await;
            match e {
                RepositoryError::Conflict(_) => Ok(ProductFormTemplate::rejected(
                    &state,
                    Some(&product),
                    &form,
                    SLUG_TAKEN_MESSAGE.to_string(),
                )),
                RepositoryError::NotFound => Err(AppError::NotFound(format!("product {id}"))),
                e => Err(e.into()),
            }
        }
    }
}

/// Delete a product and its stored media.
#[instrument(skip_all, fields(product_id = %id))]
pub async fn delete(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Response, AppError> {
    let product = find(&state, id).await?;

    match state.products().delete(id).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => {
            return Err(AppError::NotFound(format!("product {id}")));
        }
        Err(e) => return Err(e.into()),
    }

    remove_media(
        state.storage(),
        &state.config().storage.products_bucket,
        &product.media,
    )
    .await;
    info!(product_id = %id, slug = %product.slug, "Product deleted");

    Ok(Redirect::to("/admin").into_response())
}
