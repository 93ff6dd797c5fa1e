//! Book records and their HTTP surface: create with a cover upload, fetch,
//! list, top-rated, field updates, delete.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, guard::AuthUser, images::ImageStore, ratings::Rating, state::AppState};

pub const TOP_RATED_COUNT: usize = 3;

/// A catalog entry. `ratings` keeps submission order; `average_rating` is
/// recomputed from scratch on every rating mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    /// Owner identity, set once from the verified token at creation.
    pub user_id: String,
    pub title: String,
    pub author: String,
    pub year: i32,
    pub genre: String,
    pub image_url: String,
    pub ratings: Vec<Rating>,
    pub average_rating: f64,
}

/// The client-suppliable fields. Anything else in the payload (`ratings`,
/// `averageRating`, `userId`, ...) is dropped on the floor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPayload {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub genre: String,
}

impl BookPayload {
    fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }

        if self.author.trim().is_empty() {
            return Err(AppError::Validation("author is required".to_string()));
        }

        Ok(())
    }
}

impl Book {
    /// Fresh record owned by `owner`. Rating state always starts empty,
    /// whatever the client sent alongside the payload.
    pub fn create(owner: &str, payload: BookPayload, image_url: String) -> Book {
        Book {
            id: Uuid::new_v4().to_string(),
            user_id: owner.to_string(),
            title: payload.title,
            author: payload.author,
            year: payload.year,
            genre: payload.genre,
            image_url,
            ratings: Vec::new(),
            average_rating: 0.0,
        }
    }

    /// Field replacement for PUT. Ownership and rating state are not
    /// reachable through this path.
    pub fn apply_update(&mut self, payload: BookPayload, new_image_url: Option<String>) {
        self.title = payload.title;
        self.author = payload.author;
        self.year = payload.year;
        self.genre = payload.genre;

        if let Some(url) = new_image_url {
            self.image_url = url;
        }
    }
}

/// Stable sort, so equal averages keep the store's order.
pub fn top_rated(mut books: Vec<Book>, count: usize) -> Vec<Book> {
    books.sort_by(|a, b| {
        b.average_rating
            .partial_cmp(&a.average_rating)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    books.truncate(count);
    books
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.store.fetch_all_books().await?))
}

pub async fn best_rating(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>, AppError> {
    let books = state.store.fetch_all_books().await?;
    Ok(Json(top_rated(books, TOP_RATED_COUNT)))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    state
        .store
        .fetch_book(&id)
        .await?
        .map(Json)
        .ok_or(AppError::BookNotFound)
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let (payload, image) = read_book_form(multipart).await?;
    payload.validate()?;

    let image =
        image.ok_or_else(|| AppError::Validation("an image file is required".to_string()))?;
    let image_url = store_image(&state.images, &image).await?;

    let book = Book::create(&user.user_id, payload, image_url);
    state.store.save_book(&book).await?;

    info!("created book {} for user {}", book.id, book.user_id);

    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<Book>, AppError> {
    let (payload, image) = read_update(request).await?;
    payload.validate()?;

    let mut book = state
        .store
        .fetch_book(&id)
        .await?
        .ok_or(AppError::BookNotFound)?;

    let new_image_url = match &image {
        Some(image) => Some(store_image(&state.images, image).await?),
        None => None,
    };

    book.apply_update(payload, new_image_url);
    state.store.save_book(&book).await?;

    Ok(Json(book))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let book = state
        .store
        .fetch_book(&id)
        .await?
        .ok_or(AppError::BookNotFound)?;

    state.store.delete_book(&id).await?;

    // The cover file stays on disk; name it so operators can sweep.
    info!("deleted book {id}, image left behind at {}", book.image_url);

    Ok(Json(json!({ "message": "book deleted" })))
}

struct UploadedImage {
    filename: String,
    bytes: Vec<u8>,
}

async fn store_image(images: &ImageStore, image: &UploadedImage) -> Result<String, AppError> {
    images.save(&image.filename, &image.bytes).await
}

/// Multipart contract shared by POST and PUT: a `book` part holding the
/// JSON payload, an `image` file part. Unknown parts are skipped.
async fn read_book_form(
    mut multipart: Multipart,
) -> Result<(BookPayload, Option<UploadedImage>), AppError> {
    let mut payload: Option<BookPayload> = None;
    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Validation("malformed multipart body".to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "book" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|_| AppError::Validation("unreadable book payload".to_string()))?;

                payload = Some(serde_json::from_str(&raw).map_err(|_| {
                    AppError::Validation("malformed book payload".to_string())
                })?);
            }
            "image" => {
                let filename = field.file_name().unwrap_or("image").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::Validation("unreadable image upload".to_string()))?;

                image = Some(UploadedImage {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let payload =
        payload.ok_or_else(|| AppError::Validation("missing book payload".to_string()))?;

    Ok((payload, image))
}

/// PUT accepts either the multipart form (new cover) or a bare JSON body
/// (fields only), mirroring what the upload widget sends.
async fn read_update(request: Request) -> Result<(BookPayload, Option<UploadedImage>), AppError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| AppError::Validation("malformed multipart body".to_string()))?;

        return read_book_form(multipart).await;
    }

    let bytes = Bytes::from_request(request, &())
        .await
        .map_err(|_| AppError::Validation("unreadable request body".to_string()))?;

    let payload = serde_json::from_slice(&bytes)
        .map_err(|_| AppError::Validation("malformed book payload".to_string()))?;

    Ok((payload, None))
}
