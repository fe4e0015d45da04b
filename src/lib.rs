//! Cabdesk core library
//!
//! Client-side core of an inventory and sales management dashboard for a
//! vehicle-and-accessories retailer: typed domain models, per-entity
//! caching repositories with rollback, a customer purchase ledger, a
//! dashboard aggregator, the sell-cab workflow, and a typed client for the
//! REST backend. Rendering and routing live elsewhere; this crate is the
//! state and the rules.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod activity;
pub mod api;
pub mod auth;
pub mod config;
pub mod customers;
pub mod dashboard;
pub mod errors;
pub mod events;
pub mod images;
pub mod inventory;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod sale;
pub mod search;
pub mod users;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::activity::ActivityLogService;
use crate::api::{BackendApi, HttpBackend};
use crate::auth::AuthSession;
use crate::config::AppConfig;
use crate::customers::CustomerService;
use crate::dashboard::DashboardAggregator;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::inventory::InventoryRepository;
use crate::ledger::PurchaseLedger;
use crate::models::{Accessory, Cab, Material, User};
use crate::sale::SaleOrchestrator;
use crate::users::UserService;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Every service the application needs, constructed once at the root and
/// passed by reference from there; there is no ambient global state.
pub struct AppContext {
    pub config: AppConfig,
    pub auth: Arc<AuthSession>,
    pub cabs: Arc<InventoryRepository<Cab>>,
    pub accessories: Arc<InventoryRepository<Accessory>>,
    pub materials: Arc<InventoryRepository<Material>>,
    pub customers: Arc<CustomerService>,
    pub users: Arc<UserService>,
    pub ledger: Arc<PurchaseLedger>,
    pub dashboard: Arc<DashboardAggregator>,
    pub activity: Arc<ActivityLogService>,
    pub sales: Arc<SaleOrchestrator>,
    pub event_sender: EventSender,
}

impl AppContext {
    /// Wires the context against an already-built backend (typically the
    /// in-memory one for tests and demos).
    pub fn new(config: AppConfig, api: Arc<dyn BackendApi>) -> (Self, mpsc::Receiver<Event>) {
        let auth = Arc::new(AuthSession::load(&config.session_state_file));
        Self::assemble(config, api, auth)
    }

    /// Wires the context against the HTTP backend from the configuration.
    pub fn with_http_backend(
        config: AppConfig,
    ) -> Result<(Self, mpsc::Receiver<Event>), ServiceError> {
        let auth = Arc::new(AuthSession::load(&config.session_state_file));
        let api: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(
            &config.backend_url,
            config.request_timeout(),
            auth.clone(),
        )?);
        Ok(Self::assemble(config, api, auth))
    }

    fn assemble(
        config: AppConfig,
        api: Arc<dyn BackendApi>,
        auth: Arc<AuthSession>,
    ) -> (Self, mpsc::Receiver<Event>) {
        let (event_sender, receiver) = events::channel(EVENT_CHANNEL_CAPACITY);

        let cabs = Arc::new(InventoryRepository::new(
            api.clone(),
            Some(event_sender.clone()),
        ));
        let accessories = Arc::new(InventoryRepository::new(
            api.clone(),
            Some(event_sender.clone()),
        ));
        let materials = Arc::new(InventoryRepository::new(
            api.clone(),
            Some(event_sender.clone()),
        ));
        let customers = Arc::new(CustomerService::new(
            api.clone(),
            Some(event_sender.clone()),
        ));
        let users = Arc::new(UserService::new(api.clone(), Some(event_sender.clone())));
        let ledger = Arc::new(PurchaseLedger::new(api.clone()));
        let dashboard = Arc::new(DashboardAggregator::new(config.activity_feed_capacity));
        let activity = Arc::new(ActivityLogService::new(
            api.clone(),
            Some(event_sender.clone()),
        ));
        let sales = Arc::new(SaleOrchestrator::new(
            cabs.clone(),
            accessories.clone(),
            ledger.clone(),
            dashboard.clone(),
            activity.clone(),
            Some(event_sender.clone()),
        ));

        (
            Self {
                config,
                auth,
                cabs,
                accessories,
                materials,
                customers,
                users,
                ledger,
                dashboard,
                activity,
                sales,
                event_sender,
            },
            receiver,
        )
    }

    /// Fetches every repository's rows from the backend. Each repository
    /// keeps its own rows on failure; the first error is returned after all
    /// refreshes were attempted.
    pub async fn initialize_all(&self) -> Result<(), ServiceError> {
        let (cabs, accessories, materials, customers) = tokio::join!(
            self.cabs.initialize(),
            self.accessories.initialize(),
            self.materials.initialize(),
            self.customers.initialize(),
        );
        let result = cabs.and(accessories).and(materials).and(customers);
        self.refresh_dashboard_metrics().await;
        result
    }

    /// Recomputes the dashboard's inventory-derived figures from the
    /// repository caches.
    pub async fn refresh_dashboard_metrics(&self) {
        let total_value = self.cabs.total_value().await
            + self.accessories.total_value().await
            + self.materials.total_value().await;
        let low_stock = (self.cabs.low_stock_count().await
            + self.accessories.low_stock_count().await
            + self.materials.low_stock_count().await) as u64;
        let out_of_stock = (self.cabs.out_of_stock_count().await
            + self.accessories.out_of_stock_count().await
            + self.materials.out_of_stock_count().await) as u64;
        self.dashboard
            .sync_inventory(total_value, low_stock, out_of_stock)
            .await;
    }

    /// Stores the session returned by a successful login and records the
    /// login in the audit trail.
    pub async fn login(&self, token: impl Into<String>, user: User) -> Result<(), ServiceError> {
        self.auth.login(token, user.clone())?;
        match self.activity.record_login(&user.snapshot()).await {
            Ok(entry) => self.dashboard.add_activity(entry).await,
            Err(e) => warn!(error = %e, "Failed to record login activity"),
        }
        Ok(())
    }

    /// Records the logout and clears the persisted session.
    pub async fn logout(&self) {
        if let Some(user) = self.auth.user() {
            match self.activity.record_logout(&user.snapshot()).await {
                Ok(entry) => self.dashboard.add_activity(entry).await,
                Err(e) => warn!(error = %e, "Failed to record logout activity"),
            }
        }
        self.auth.logout();
    }
}
