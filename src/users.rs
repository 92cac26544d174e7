use crate::errors::{CoderoomError, CoderoomErrorType, Result};

use ciborium::{from_reader, into_writer};
use serde::{Deserialize, Serialize};
use sled::Db;
use std::path::PathBuf;
use uuid::Uuid;

/// Stored account record. Never leaves this module with its password.
#[derive(Serialize, Deserialize)]
struct DbUser {
    id: String,
    username: String,
    email: String,
    password: String,
    created: String,
}

/// What handlers see and serialize back to clients.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) created: String,
}

impl From<&DbUser> for User {
    fn from(record: &DbUser) -> User {
        User {
            id: record.id.clone(),
            username: record.username.clone(),
            email: record.email.clone(),
            created: record.created.clone(),
        }
    }
}

pub(crate) struct UserStore {
    db: Db,
}

impl UserStore {
    pub(crate) fn open(path: PathBuf) -> Result<UserStore> {
        let db = sled::open(path)?;
        Ok(UserStore { db })
    }

    pub(crate) fn signup(&self, username: &str, email: &str, password: &str) -> Result<User> {
        if username.is_empty() {
            return Err(CoderoomError::new(
                CoderoomErrorType::InvalidPath,
                "Username must not be empty".to_string(),
            ));
        }
        if self.db.contains_key(username.as_bytes())? {
            return Err(CoderoomError::new(
                CoderoomErrorType::AlreadyExists,
                format!("User {} already exists", username),
            ));
        }
        let record = DbUser {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            created: chrono::Utc::now().to_rfc3339(),
        };
        let mut bytes = Vec::new();
        into_writer(&record, &mut bytes).map_err(|e| {
            CoderoomError::new(
                CoderoomErrorType::InternalError,
                format!("Could not serialize user {}: {}", username, e),
            )
        })?;
        self.db.insert(username.as_bytes(), bytes)?;
        Ok(User::from(&record))
    }

    /// Guest account minted for each raw websocket connection.
    pub(crate) fn create_random(&self) -> Result<User> {
        let username = random_tag();
        let password = random_tag();
        let email = format!("{}@gmail.com", random_tag());
        self.signup(&username, &email, &password)
    }

    pub(crate) fn list(&self) -> Result<Vec<User>> {
        let mut users = Vec::new();
        for entry in self.db.iter() {
            let (_, value) = entry?;
            let record: DbUser = from_reader(value.as_ref()).map_err(|e| {
                CoderoomError::new(
                    CoderoomErrorType::InternalError,
                    format!("Corrupt user record: {}", e),
                )
            })?;
            users.push(User::from(&record));
        }
        Ok(users)
    }
}

fn random_tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
