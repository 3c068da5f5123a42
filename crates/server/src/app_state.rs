use crate::proxy::ProxyContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) proxy: ProxyContext,
}
