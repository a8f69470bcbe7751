//! Client views and which of them need a signed-in user

/// A navigable view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Signup,
    Logout,
    Products,
    Orders,
    Dashboard,
    Updates,
    Weather,
    AskAi,
}

impl Route {
    pub const ALL: [Route; 10] = [
        Route::Home,
        Route::Login,
        Route::Signup,
        Route::Logout,
        Route::Products,
        Route::Orders,
        Route::Dashboard,
        Route::Updates,
        Route::Weather,
        Route::AskAi,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Logout => "/logout",
            Route::Products => "/products",
            Route::Orders => "/orders",
            Route::Dashboard => "/dashboard",
            Route::Updates => "/updates",
            Route::Weather => "/weather",
            Route::AskAi => "/ask-ai",
        }
    }

    /// Only the public entry points are reachable while signed out
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Home | Route::Login | Route::Signup)
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}
