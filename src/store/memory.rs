//! In-process state store. Contents are lost on restart.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{Credential, Service, StateStore};
use crate::error::AppError;

#[derive(Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<(Service, String), Credential>>,
    // marker id -> user id
    markers: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_credential(
        &self,
        service: Service,
        user_id: &str,
    ) -> Result<Option<Credential>, AppError> {
        let creds = self.credentials.read().await;
        Ok(creds.get(&(service, user_id.to_string())).cloned())
    }

    async fn put_credential(&self, service: Service, cred: &Credential) -> Result<(), AppError> {
        let mut creds = self.credentials.write().await;
        let key = (service, cred.user_id.clone());
        let refresh_token = cred
            .refresh_token
            .clone()
            .or_else(|| creds.get(&key).and_then(|old| old.refresh_token.clone()));
        creds.insert(
            key,
            Credential {
                refresh_token,
                ..cred.clone()
            },
        );
        Ok(())
    }

    async fn list_users(&self, service: Service) -> Result<Vec<String>, AppError> {
        let creds = self.credentials.read().await;
        let mut users: Vec<String> = creds
            .keys()
            .filter(|(s, _)| *s == service)
            .map(|(_, user)| user.clone())
            .collect();
        users.sort();
        Ok(users)
    }

    async fn put_refresh_marker(&self, user_id: &str, marker_id: &str) -> Result<(), AppError> {
        let mut markers = self.markers.write().await;
        markers.retain(|_, owner| owner != user_id);
        markers.insert(marker_id.to_string(), user_id.to_string());
        Ok(())
    }

    async fn take_refresh_marker(&self, marker_id: &str) -> Result<bool, AppError> {
        Ok(self.markers.write().await.remove(marker_id).is_some())
    }
}
