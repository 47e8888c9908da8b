//! HTTP API managing repository configuration documents.
//!
//! - `POST /api/repos/{user}` creates or patches the configuration of one of
//!   `user`'s repositories, see [`update`].
//! - `GET /api/security/permissions` lists permission targets, see
//!   [`permissions`].

pub mod api;
pub mod config;
pub mod config_file;
pub mod errors;
pub mod form;
pub mod merge;
pub mod metrics_defs;
pub mod permissions;
pub mod update;

use config_store::get_storage;
use errors::RepoApiError;
use permissions::{PermissionsListHandler, StoredPermissions};
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use update::RepoUpdateHandler;

pub async fn run(config: config::Config) -> Result<(), RepoApiError> {
    let ready = Arc::new(AtomicBool::new(false));

    let admin_service = {
        let ready = ready.clone();
        AdminService::new(move || ready.load(Ordering::Relaxed))
    };
    let admin_host = config.admin_listener.host.clone();
    let admin_port = config.admin_listener.port;
    let mut admin_task =
        tokio::spawn(async move { run_http_service(&admin_host, admin_port, admin_service).await });

    let storage = get_storage(&config.storage).await?;
    let state = api::AppState {
        updates: Arc::new(RepoUpdateHandler::new(
            storage.clone(),
            config.serialize_updates,
        )),
        permissions: Arc::new(PermissionsListHandler::new(
            Arc::new(StoredPermissions::new(storage)),
            config.base_url.as_str(),
        )),
    };
    ready.store(true, Ordering::Relaxed);

    let result = tokio::select! {
        res = api::serve(&config.listener, state) => res,
        res = &mut admin_task => match res {
            Ok(res) => res.map_err(RepoApiError::from),
            Err(e) => Err(RepoApiError::Io(std::io::Error::other(e))),
        },
    };

    admin_task.abort();
    result
}
