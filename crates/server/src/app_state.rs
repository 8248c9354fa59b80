use std::path::PathBuf;

use server_api::ApiContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) assets_dir: PathBuf,
    /// The page never changes after startup, so it is rendered once.
    pub(crate) index_html: String,
}
