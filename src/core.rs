use crate::{
    app::AppContext,
    auth::ApiKeyGuard,
    config::Config,
    error::ToolgateError,
    http::{RouteModule, ToolRoutes},
    middleware::MakeRequestUuid,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::time::Duration;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Main application structure for toolgate
pub struct App {
    router: Router<AppContext>,
    config: Config,
    context: AppContext,
}

impl App {
    /// Creates a new App with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new App with the provided configuration and no routes
    pub fn with_config(config: Config) -> Self {
        Self {
            router: Router::new(),
            config,
            context: AppContext::new(),
        }
    }

    /// Builder pattern for constructing an App
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Register a route module with the application
    pub fn register_module<M: RouteModule>(mut self, module: M) -> Self {
        self.router = module.register(self.router);
        self
    }

    /// Set the application context
    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = context;
        self
    }

    /// Get the router with the full middleware stack and state applied
    ///
    /// The returned router can be driven in-process with the
    /// [`crate::testing`] helpers.
    pub fn into_test_router(self) -> Router {
        self.with_middleware()
    }

    /// Apply the middleware stack and state.
    ///
    /// Layers wrap from the inside out, so the order below is innermost
    /// first: API key, panic catching, body limit, request ID, trace.
    fn with_middleware(self) -> Router {
        let guard = ApiKeyGuard::from_config(self.config.auth.api_key.as_ref());

        self.router
            .layer(from_fn_with_state(guard, ApiKeyGuard::middleware))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(DefaultBodyLimit::max(self.config.server.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .with_state(self.context)
    }

    /// Start the application server
    pub async fn serve(self) -> Result<(), std::io::Error> {
        let addr = self
            .config
            .server
            .addr()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        let router = self.with_middleware();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("Server starting on http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for App with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppBuilder {
    config: Config,
    context: AppContext,
    modules: Vec<Router<AppContext>>,
    tool_routes: bool,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            context: AppContext::new(),
            modules: Vec::new(),
            tool_routes: false,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_context(mut self, context: AppContext) -> Self {
        self.context = context;
        self
    }

    pub fn register_module<M: RouteModule>(mut self, module: M) -> Self {
        self.modules.push(module.register(Router::new()));
        self
    }

    /// Mount `/search_web` and `/scrape_url`, limited per the config's
    /// tool settings and sharing the context's limiter registry.
    pub fn with_tool_routes(mut self) -> Self {
        self.tool_routes = true;
        self
    }

    pub fn build(self) -> App {
        let mut app = App::with_config(self.config).with_context(self.context);

        if self.tool_routes {
            let tools = ToolRoutes::new(app.context.registry.clone(), &app.config.tools);
            app = app.register_module(tools);
        }

        for module_router in self.modules {
            app.router = app.router.merge(module_router);
        }

        app
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a handler panic into a 500 `{"detail": ...}` response.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "Internal server error".to_string()
    };

    tracing::error!(detail = %detail, "Handler panicked");
    ToolgateError::internal(detail).into_response()
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give connections a grace period to close
    tokio::time::sleep(Duration::from_secs(1)).await;
    tracing::info!("Shutdown complete");
}
