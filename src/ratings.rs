//! Rating aggregation: one grade per user per book, mean recomputed from
//! every stored grade on each append (never drifted incrementally).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{books::Book, error::AppError, guard::AuthUser, state::AppState};

pub const MAX_GRADE: u8 = 5;

/// One user's grade on one book. Permanent once submitted; there is no
/// update or removal path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: String,
    pub grade: u8,
}

#[derive(Deserialize)]
pub struct RatingPayload {
    pub rating: i64,
}

impl Book {
    /// Appends `rater`'s grade and recomputes the mean over all grades.
    /// Rejections leave the record untouched.
    pub fn apply_rating(&mut self, rater: &str, grade: u8) -> Result<(), AppError> {
        if grade > MAX_GRADE {
            return Err(AppError::GradeOutOfRange);
        }

        if self.ratings.iter().any(|rating| rating.user_id == rater) {
            return Err(AppError::DuplicateRating);
        }

        self.ratings.push(Rating {
            user_id: rater.to_string(),
            grade,
        });

        let total: f64 = self.ratings.iter().map(|rating| rating.grade as f64).sum();
        self.average_rating = total / self.ratings.len() as f64;

        Ok(())
    }
}

pub async fn rate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<RatingPayload>,
) -> Result<Json<Book>, AppError> {
    let grade = u8::try_from(payload.rating).map_err(|_| AppError::GradeOutOfRange)?;

    let mut book = state
        .store
        .fetch_book(&id)
        .await?
        .ok_or(AppError::BookNotFound)?;

    book.apply_rating(&user.user_id, grade)?;
    state.store.save_book(&book).await?;

    Ok(Json(book))
}
