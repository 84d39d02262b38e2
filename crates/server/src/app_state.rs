use catalog_api::CatalogContext;
use shared::domain::Identity;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) catalog: CatalogContext,
    /// Assumed identity for requests that name no owner. `None` when the
    /// auth bypass is off.
    pub(crate) session: Option<Identity>,
}
