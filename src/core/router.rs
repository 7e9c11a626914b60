use crate::core::session::SessionState;

/// Every screen of the app, with the data each one needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Home,
    Services,
    ServiceDetail {
        service_id: String,
    },
    Wallet,
    Login,
    Register,
    ProviderRegister,
    PhoneVerification {
        phone: String,
    },
    ExpertiseVerification,
    About,
    Support,
    Terms,
    Dashboard,
}

impl Page {
    pub fn key(&self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Services => "services",
            Page::ServiceDetail { .. } => "serviceDetail",
            Page::Wallet => "wallet",
            Page::Login => "login",
            Page::Register => "register",
            Page::ProviderRegister => "provider-register",
            Page::PhoneVerification { .. } => "phone-verification",
            Page::ExpertiseVerification => "expertise-verification",
            Page::About => "about",
            Page::Support => "support",
            Page::Terms => "terms",
            Page::Dashboard => "dashboard",
        }
    }

    /// 只解析不帶資料的頁面；未知或需要資料的 key 一律回到首頁
    pub fn from_key(key: &str) -> Page {
        match key {
            "services" => Page::Services,
            "wallet" => Page::Wallet,
            "login" => Page::Login,
            "register" => Page::Register,
            "provider-register" => Page::ProviderRegister,
            "expertise-verification" => Page::ExpertiseVerification,
            "about" => Page::About,
            "support" => Page::Support,
            "terms" => Page::Terms,
            "dashboard" => Page::Dashboard,
            _ => Page::Home,
        }
    }

    pub fn requires_session(&self) -> bool {
        matches!(self, Page::Dashboard)
    }
}

/// In-memory navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    active: Page,
    previous: Page,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            active: Page::Home,
            previous: Page::Services,
        }
    }

    pub fn active(&self) -> &Page {
        &self.active
    }

    pub fn previous(&self) -> &Page {
        &self.previous
    }

    pub fn selected_service(&self) -> Option<&str> {
        match &self.active {
            Page::ServiceDetail { service_id } => Some(service_id),
            _ => None,
        }
    }

    pub fn navigate(&mut self, page: Page) {
        tracing::debug!("Navigate {} -> {}", self.active.key(), page.key());
        self.active = page;
    }

    /// Like [`Router::navigate`], but pages that need a member send
    /// anonymous visitors to the login page instead.
    pub fn navigate_as(&mut self, page: Page, state: SessionState) {
        if page.requires_session() && state == SessionState::Anonymous {
            self.navigate(Page::Login);
        } else {
            self.navigate(page);
        }
    }

    pub fn open_service(&mut self, service_id: impl Into<String>) {
        let current = std::mem::take(&mut self.active);
        self.previous = current;
        self.active = Page::ServiceDetail {
            service_id: service_id.into(),
        };
    }

    /// The selection is not kept: going back never lands on a detail page.
    pub fn go_back(&mut self) {
        self.active = match &self.previous {
            Page::ServiceDetail { .. } => Page::Services,
            other => other.clone(),
        };
    }

    pub fn start_phone_verification(&mut self, phone: impl Into<String>) {
        self.navigate(Page::PhoneVerification {
            phone: phone.into(),
        });
    }

    pub fn complete_verification(&mut self) {
        self.navigate(Page::ExpertiseVerification);
    }

    /// 頁首的帳號按鈕：已登入到儀表板，否則到登入頁
    pub fn open_account(&mut self, state: SessionState) {
        match state {
            SessionState::Authenticated => self.navigate(Page::Dashboard),
            SessionState::Anonymous => self.navigate(Page::Login),
        }
    }
}
