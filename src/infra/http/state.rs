use std::sync::Arc;

use crate::application::accounts::AccountService;
use crate::application::blog::BlogService;
use crate::application::catalog::CatalogService;
use crate::application::repos::HealthRepo;

#[derive(Clone)]
pub struct HttpState {
    pub catalog: Arc<CatalogService>,
    pub blog: Arc<BlogService>,
    pub accounts: Arc<AccountService>,
    pub health: Arc<dyn HealthRepo>,
}
