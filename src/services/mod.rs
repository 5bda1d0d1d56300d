//! Business logic services

pub mod catalog;
pub mod loans;
pub mod users;

use crate::{
    config::{AppConfig, BootstrapConfig},
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub users: users::UsersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), config.loans.clone()),
            repository,
        }
    }

    /// Startup seeding: default administrator and sample catalog
    pub async fn bootstrap(&self, config: &BootstrapConfig) -> AppResult<()> {
        if config.create_default_admin {
            match self.users.create_default_admin().await {
                Ok(Some(_)) => tracing::warn!("Default administrator created; change its password"),
                Ok(None) => tracing::debug!("Default administrator already present"),
                Err(AppError::Validation(message)) => {
                    tracing::warn!("Default administrator not created: {}", message)
                }
                Err(e) => return Err(e),
            }
        }

        if config.seed_sample_books {
            self.catalog.seed_sample_books().await?;
        }

        Ok(())
    }

    /// Database readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
