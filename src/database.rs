//! Document storage for user and book records.
//!
//! Two backends behind one handle: a redis instance for deployments (two
//! hashes, `users` keyed by email and `books` keyed by id, JSON documents)
//! and an in-process map used when `REDIS_URL` is unset and by tests.
//! Email uniqueness rides on `HSETNX`; everything else is plain
//! read/write/delete of whole documents.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::warn;

use crate::{auth::User, books::Book, error::AppError};

const USERS_KEY: &str = "users";
const BOOKS_KEY: &str = "books";

#[derive(Clone)]
pub enum Store {
    Redis(ConnectionManager),
    Memory(Arc<Mutex<Memory>>),
}

#[derive(Default)]
pub struct Memory {
    users: BTreeMap<String, User>,
    books: BTreeMap<String, Book>,
}

async fn init_redis(redis_url: &str) -> ConnectionManager {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url).expect("Invalid REDIS_URL");

    client
        .get_connection_manager_with_config(config)
        .await
        .expect("Failed to connect to redis")
}

impl Store {
    pub async fn connect(redis_url: Option<&str>) -> Store {
        match redis_url {
            Some(url) => Store::Redis(init_redis(url).await),
            None => {
                warn!("REDIS_URL not set, falling back to in-memory storage");
                Store::memory()
            }
        }
    }

    pub fn memory() -> Store {
        Store::Memory(Arc::new(Mutex::new(Memory::default())))
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self {
            Store::Redis(manager) => {
                let mut conn = manager.clone();
                let document = serde_json::to_string(user)?;
                let created: bool = conn.hset_nx(USERS_KEY, &user.email, document).await?;

                if created {
                    Ok(())
                } else {
                    Err(AppError::DuplicateEmail)
                }
            }
            Store::Memory(memory) => {
                let mut memory = memory.lock().expect("store mutex poisoned");

                if memory.users.contains_key(&user.email) {
                    return Err(AppError::DuplicateEmail);
                }

                memory.users.insert(user.email.clone(), user.clone());
                Ok(())
            }
        }
    }

    pub async fn find_user(&self, email: &str) -> Result<Option<User>, AppError> {
        match self {
            Store::Redis(manager) => {
                let mut conn = manager.clone();
                let document: Option<String> = conn.hget(USERS_KEY, email).await?;

                document
                    .map(|raw| serde_json::from_str(&raw))
                    .transpose()
                    .map_err(AppError::from)
            }
            Store::Memory(memory) => {
                let memory = memory.lock().expect("store mutex poisoned");
                Ok(memory.users.get(email).cloned())
            }
        }
    }

    /// Upsert: used for creation, field updates and rating appends alike.
    pub async fn save_book(&self, book: &Book) -> Result<(), AppError> {
        match self {
            Store::Redis(manager) => {
                let mut conn = manager.clone();
                let document = serde_json::to_string(book)?;
                let _: () = conn.hset(BOOKS_KEY, &book.id, document).await?;
                Ok(())
            }
            Store::Memory(memory) => {
                let mut memory = memory.lock().expect("store mutex poisoned");
                memory.books.insert(book.id.clone(), book.clone());
                Ok(())
            }
        }
    }

    pub async fn fetch_book(&self, id: &str) -> Result<Option<Book>, AppError> {
        match self {
            Store::Redis(manager) => {
                let mut conn = manager.clone();
                let document: Option<String> = conn.hget(BOOKS_KEY, id).await?;

                document
                    .map(|raw| serde_json::from_str(&raw))
                    .transpose()
                    .map_err(AppError::from)
            }
            Store::Memory(memory) => {
                let memory = memory.lock().expect("store mutex poisoned");
                Ok(memory.books.get(id).cloned())
            }
        }
    }

    pub async fn fetch_all_books(&self) -> Result<Vec<Book>, AppError> {
        match self {
            Store::Redis(manager) => {
                let mut conn = manager.clone();
                let documents: Vec<String> = conn.hvals(BOOKS_KEY).await?;

                documents
                    .iter()
                    .map(|raw| serde_json::from_str(raw))
                    .collect::<Result<Vec<Book>, _>>()
                    .map_err(AppError::from)
            }
            Store::Memory(memory) => {
                let memory = memory.lock().expect("store mutex poisoned");
                Ok(memory.books.values().cloned().collect())
            }
        }
    }

    pub async fn delete_book(&self, id: &str) -> Result<(), AppError> {
        match self {
            Store::Redis(manager) => {
                let mut conn = manager.clone();
                let removed: i64 = conn.hdel(BOOKS_KEY, id).await?;

                if removed == 0 {
                    Err(AppError::BookNotFound)
                } else {
                    Ok(())
                }
            }
            Store::Memory(memory) => {
                let mut memory = memory.lock().expect("store mutex poisoned");
                memory
                    .books
                    .remove(id)
                    .map(|_| ())
                    .ok_or(AppError::BookNotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::{auth::User, books::Book, error::AppError};

    fn user(email: &str) -> User {
        User {
            id: format!("id-{email}"),
            email: email.to_string(),
            password_hash: "$2b$12$fakefakefakefakefakefake".to_string(),
        }
    }

    fn book(id: &str, average: f64) -> Book {
        Book {
            id: id.to_string(),
            user_id: "owner".to_string(),
            title: "Title".to_string(),
            author: "Author".to_string(),
            year: 1963,
            genre: "novel".to_string(),
            image_url: format!("http://localhost:4000/images/{id}.png"),
            ratings: Vec::new(),
            average_rating: average,
        }
    }

    #[tokio::test]
    async fn test_insert_user_rejects_duplicate_email() {
        let store = Store::memory();

        store.insert_user(&user("a@b.c")).await.unwrap();
        let err = store.insert_user(&user("a@b.c")).await.unwrap_err();

        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_find_user_by_email() {
        let store = Store::memory();
        store.insert_user(&user("a@b.c")).await.unwrap();

        let found = store.find_user("a@b.c").await.unwrap().unwrap();
        assert_eq!(found.id, "id-a@b.c");

        assert!(store.find_user("missing@b.c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_sensitive() {
        let store = Store::memory();
        store.insert_user(&user("A@b.c")).await.unwrap();

        assert!(store.find_user("a@b.c").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_book_save_fetch_delete() {
        let store = Store::memory();
        store.save_book(&book("b1", 0.0)).await.unwrap();

        let fetched = store.fetch_book("b1").await.unwrap().unwrap();
        assert_eq!(fetched.title, "Title");

        store.delete_book("b1").await.unwrap();
        assert!(store.fetch_book("b1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_book_is_not_found() {
        let store = Store::memory();
        let err = store.delete_book("nope").await.unwrap_err();

        assert!(matches!(err, AppError::BookNotFound));
    }

    #[tokio::test]
    async fn test_fetch_all_is_deterministic() {
        let store = Store::memory();
        store.save_book(&book("b2", 1.0)).await.unwrap();
        store.save_book(&book("b1", 2.0)).await.unwrap();
        store.save_book(&book("b3", 3.0)).await.unwrap();

        let ids: Vec<String> = store
            .fetch_all_books()
            .await
            .unwrap()
            .into_iter()
            .map(|book| book.id)
            .collect();

        assert_eq!(ids, vec!["b1", "b2", "b3"]);
    }
}
