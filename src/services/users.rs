//! User profile service

use crate::{
    error::AppResult,
    models::{Session, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Profile of the authenticated caller
    pub async fn me(&self, session: &Session) -> AppResult<User> {
        self.repository.users.get(session.user_id).await
    }
}
