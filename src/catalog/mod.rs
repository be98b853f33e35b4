use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;
use crate::models::{Program, ProgramId};

/// Read-only program catalog. Consumed, never mutated, by the engine.
#[async_trait]
pub trait ProgramCatalog: Send + Sync {
    async fn get_program(&self, id: &ProgramId) -> Result<Option<Program>, AppError>;
    async fn list_programs(&self) -> Result<Vec<Program>, AppError>;
}

/// Catalog held in memory, seeded from a JSON document. The bundled seed is
/// the default data source; tests construct their own.
pub struct StaticCatalog {
    programs: HashMap<ProgramId, Program>,
    order: Vec<ProgramId>,
}

impl StaticCatalog {
    pub fn new(programs: Vec<Program>) -> Self {
        let order = programs.iter().map(|p| p.id.clone()).collect();
        let programs = programs.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self { programs, order }
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        let programs: Vec<Program> = serde_json::from_str(json)
            .map_err(|e| AppError::Catalog(format!("failed to parse catalog seed: {e}")))?;
        Ok(Self::new(programs))
    }

    pub fn bundled() -> Result<Self, AppError> {
        Self::from_json(include_str!("../../data/programs.json"))
    }
}

#[async_trait]
impl ProgramCatalog for StaticCatalog {
    async fn get_program(&self, id: &ProgramId) -> Result<Option<Program>, AppError> {
        Ok(self.programs.get(id).cloned())
    }

    async fn list_programs(&self) -> Result<Vec<Program>, AppError> {
        Ok(self
            .order
            .iter()
            .filter_map(|id| self.programs.get(id).cloned())
            .collect())
    }
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: String,
}

impl CatalogConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("CATALOG_URL")
            .map_err(|_| AppError::Config("CATALOG_URL is not set".to_string()))?;
        Ok(Self { base_url })
    }
}

/// Catalog served by a remote program directory over HTTP.
pub struct HttpCatalog {
    client: Client,
    config: CatalogConfig,
}

impl HttpCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Catalog(format!("failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ProgramCatalog for HttpCatalog {
    async fn get_program(&self, id: &ProgramId) -> Result<Option<Program>, AppError> {
        let url = format!("{}/programs/{}", self.config.base_url, id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Catalog(format!("catalog request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Catalog(format!("catalog error {status}: {body}")));
        }

        let program = response
            .json::<Program>()
            .await
            .map_err(|e| AppError::Catalog(format!("failed to parse program: {e}")))?;
        Ok(Some(program))
    }

    async fn list_programs(&self) -> Result<Vec<Program>, AppError> {
        let url = format!("{}/programs", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::Catalog(format!("catalog request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Catalog(format!("catalog error {status}: {body}")));
        }

        response
            .json::<Vec<Program>>()
            .await
            .map_err(|e| AppError::Catalog(format!("failed to parse program list: {e}")))
    }
}
