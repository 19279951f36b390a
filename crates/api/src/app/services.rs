//! Service wiring: the store, photo storage, and token signer behind the
//! routes, constructed once from configuration.

use std::sync::Arc;

use craftmart_auth::Hs256Jwt;
use craftmart_infra::config::AppConfig;
use craftmart_infra::handlers::{ResourceHandlers, ServiceResult};
use craftmart_infra::store::Store;
use craftmart_infra::uploads::FsPhotoStorage;

pub struct AppServices {
    pub resources: ResourceHandlers,
}

pub async fn build_services(config: &AppConfig) -> ServiceResult<AppServices> {
    let jwt = Arc::new(Hs256Jwt::new(
        config.jwt_secret.expose().as_bytes(),
        config.jwt_ttl,
    ));
    let photos = Arc::new(FsPhotoStorage::new(config.upload_dir.clone()));

    let resources = ResourceHandlers::new(Store::in_memory(), photos, config.max_upload_bytes, jwt);

    if let Some(seed) = &config.bootstrap_admin {
        resources.seed_admin(seed).await?;
    }

    Ok(AppServices { resources })
}
