use std::sync::Arc;

use crate::service::{AccountService, TaskService};
use crate::token::TokenAuthority;

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub tasks: Arc<TaskService>,
    pub tokens: Arc<TokenAuthority>,
}

impl AppState {
    pub fn new(
        accounts: Arc<AccountService>,
        tasks: Arc<TaskService>,
        tokens: Arc<TokenAuthority>,
    ) -> Self {
        Self {
            accounts,
            tasks,
            tokens,
        }
    }
}
