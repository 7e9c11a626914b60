pub mod services_view;

use crate::core::{
    Catalog, IdentityProvider, Page, ProfileStore, Registration, Router, SessionManager,
    SessionSubscription,
};
use crate::domain::model::{FilterCriteria, Identity, ServiceListing};
use crate::utils::error::Result;
pub use services_view::ServicesView;

pub const POPULAR_LIMIT: usize = 6;

/// 應用程式最上層的 context：持有 session、目錄與導覽狀態
///
/// Consumers receive this value explicitly; there is no global
/// "current user". The session listener lives as long as the app.
pub struct App<A: IdentityProvider, P: ProfileStore> {
    session: SessionManager<A, P>,
    catalog: Catalog,
    router: Router,
    services: ServicesView,
    subscription: SessionSubscription,
}

impl<A, P> App<A, P>
where
    A: IdentityProvider + 'static,
    P: ProfileStore + 'static,
{
    /// Subscribe to session changes, then pick up any session that already
    /// exists.
    pub async fn start(session: SessionManager<A, P>, catalog: Catalog) -> Self {
        let subscription = session.subscribe_to_session_changes();
        session.resolve_existing_session().await;

        tracing::info!("🚀 App started with {} services", catalog.len());
        Self {
            services: ServicesView::new(catalog.clone()),
            session,
            catalog,
            router: Router::new(),
            subscription,
        }
    }

    pub fn session(&self) -> &SessionManager<A, P> {
        &self.session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn active_page(&self) -> &Page {
        self.router.active()
    }

    pub fn services(&self) -> &ServicesView {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut ServicesView {
        &mut self.services
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.session.current_identity()
    }

    pub fn filtered_listings(&self, criteria: &FilterCriteria) -> Vec<&ServiceListing> {
        self.catalog.filter(criteria)
    }

    pub fn popular_services(&self) -> Vec<&ServiceListing> {
        self.catalog.popular(POPULAR_LIMIT)
    }

    pub fn navigate(&mut self, page: Page) {
        self.router.navigate_as(page, self.session.state());
    }

    pub fn open_account(&mut self) {
        self.router.open_account(self.session.state());
    }

    /// Open a service's detail page. Unknown ids land on the services list.
    pub fn open_service(&mut self, service_id: &str) -> Option<&ServiceListing> {
        if self.catalog.get(service_id).is_none() {
            tracing::warn!("⚠️ Unknown service id {}", service_id);
            self.router.navigate(Page::Services);
            return None;
        }
        self.router.open_service(service_id);
        self.catalog.get(service_id)
    }

    pub fn go_back(&mut self) {
        self.router.go_back();
    }

    pub fn start_phone_verification(&mut self, phone: &str) {
        self.router.start_phone_verification(phone);
    }

    pub fn complete_verification(&mut self) {
        self.router.complete_verification();
    }

    /// 登入成功後前往儀表板；失敗時停留在原頁面並回傳錯誤
    pub async fn submit_login(&mut self, email: &str, password: &str) -> Result<()> {
        self.session.login(email, password).await?;
        self.router.navigate(Page::Dashboard);
        Ok(())
    }

    pub async fn submit_register(&mut self, registration: &Registration) -> Result<()> {
        self.session.register(registration).await?;
        self.router.navigate(Page::Dashboard);
        Ok(())
    }

    pub async fn logout(&mut self) -> Result<()> {
        let result = self.session.logout().await;
        self.router.navigate(Page::Home);
        result
    }

    /// Release the session listener.
    pub fn shutdown(self) {
        self.subscription.unsubscribe();
        tracing::debug!("App shut down");
    }
}
