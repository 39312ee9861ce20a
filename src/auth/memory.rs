//! In-process `UserRepo` used by unit and HTTP tests.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{StoreError, UserRepo};
use super::repo_types::{NewUser, PublicUser, User};

struct Entry {
    user_id: Uuid,
    token: String,
    created_at: OffsetDateTime,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    tokens: Vec<Entry>,
}

#[derive(Default)]
pub struct MemoryUserRepo {
    inner: Mutex<Inner>,
}

impl MemoryUserRepo {
    pub fn token_count(&self, user_id: Uuid) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.tokens.iter().filter(|e| e.user_id == user_id).count()
    }

    pub fn user_count(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }

    pub fn username_of(&self, id: Uuid) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.users.iter().find(|u| u.id == id).map(|u| u.username.clone())
    }

    fn touch(inner: &mut Inner, user_id: Uuid) {
        if let Some(u) = inner.users.iter_mut().find(|u| u.id == user_id) {
            u.updated_at = OffsetDateTime::now_utc();
        }
    }
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|u| u.username == new_user.username) {
            return Err(StoreError::Conflict("username"));
        }
        if inner.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict("email"));
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
        let email = login.to_lowercase();
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.username == login || u.email == email)
            .cloned())
    }

    async fn find_conflicting(&self, username: &str, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn find_public(&self, id: Uuid) -> anyhow::Result<Option<PublicUser>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned().map(PublicUser::from))
    }

    async fn list_public(&self) -> anyhow::Result<Vec<PublicUser>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().cloned().map(PublicUser::from).collect())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        inner.tokens.retain(|e| e.user_id != id);
        Ok(inner.users.len() < before)
    }

    async fn add_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        created_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        anyhow::ensure!(inner.users.iter().any(|u| u.id == user_id), "unknown user {user_id}");
        inner.tokens.push(Entry {
            user_id,
            token: token.to_string(),
            created_at,
        });
        Self::touch(&mut inner, user_id);
        Ok(())
    }

    async fn remove_refresh_token(&self, user_id: Uuid, token: &str) -> anyhow::Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tokens.len();
        inner.tokens.retain(|e| !(e.user_id == user_id && e.token == token));
        let removed = (before - inner.tokens.len()) as u64;
        if removed > 0 {
            Self::touch(&mut inner, user_id);
        }
        Ok(removed)
    }

    async fn clear_refresh_tokens(&self, user_id: Uuid) -> anyhow::Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tokens.len();
        inner.tokens.retain(|e| e.user_id != user_id);
        let removed = (before - inner.tokens.len()) as u64;
        if removed > 0 {
            Self::touch(&mut inner, user_id);
        }
        Ok(removed)
    }

    async fn has_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        not_before: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tokens
            .iter()
            .any(|e| e.user_id == user_id && e.token == token && e.created_at > not_before))
    }

    async fn purge_refresh_tokens(&self, not_before: OffsetDateTime) -> anyhow::Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.tokens.len();
        inner.tokens.retain(|e| e.created_at > not_before);
        Ok((before - inner.tokens.len()) as u64)
    }
}
