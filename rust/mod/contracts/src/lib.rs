//! Contracts module: maintenance contracts, purchase orders and reporting.
//!
//! # Resources
//!
//! - **Contract**: annual maintenance contract with a vendor
//! - **PurchaseOrder**: order with line items, optionally raised against a contract
//! - **Dashboard**: status counts, expiring contracts, money totals
//!
//! Lists can be exported as CSV with the same filters.

pub mod api;
pub mod model;
pub mod service;

use std::sync::Arc;

use axum::Router;

use amc_core::{Module, ServiceError};
use amc_sql::SQLStore;

use crate::service::ContractsService;

/// Contracts module implementing the Module trait.
pub struct ContractsModule {
    service: Arc<ContractsService>,
}

impl ContractsModule {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        Ok(Self {
            service: ContractsService::new(sql)?,
        })
    }

    pub fn service(&self) -> &Arc<ContractsService> {
        &self.service
    }
}

impl Module for ContractsModule {
    fn name(&self) -> &str {
        "contracts"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}
