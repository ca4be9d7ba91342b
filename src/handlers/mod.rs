pub mod cart;
pub mod common;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod returns;
pub mod reviews;
pub mod shipping;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::notifications::Notifier;
use crate::payments::PaymentProvider;
use crate::services::{
    cart::CartService, gateway_settings::GatewaySettingsService, orders::OrderService,
    payments::PaymentService, products::ProductService, returns::ReturnService,
    reviews::ReviewService, shipping::ShippingService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub returns: Arc<ReturnService>,
    pub gateway_settings: Arc<GatewaySettingsService>,
    pub products: Arc<ProductService>,
    pub reviews: Arc<ReviewService>,
    pub cart: Arc<CartService>,
    pub shipping: Arc<ShippingService>,
}

impl AppServices {
    /// Wires every service against one pool, provider, notifier and event channel.
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let gateway_settings = Arc::new(GatewaySettingsService::new(db_pool.clone()));

        let payments = Arc::new(
            PaymentService::new(
                db_pool.clone(),
                provider,
                gateway_settings.clone(),
                event_sender.clone(),
            )
            .with_fallback_webhook_secret(config.stripe_webhook_secret.clone())
            .with_webhook_tolerance(config.webhook_tolerance_secs)
            .with_currency(config.payment_currency.clone()),
        );

        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            notifier,
            event_sender.clone(),
        ));

        let returns = Arc::new(ReturnService::new(
            db_pool.clone(),
            payments.clone(),
            event_sender,
            config.return_window_hours,
        ));

        Self {
            orders,
            payments,
            returns,
            gateway_settings,
            products: Arc::new(ProductService::new(db_pool.clone())),
            reviews: Arc::new(ReviewService::new(db_pool.clone())),
            cart: Arc::new(CartService::new(db_pool.clone())),
            shipping: Arc::new(ShippingService::new(db_pool)),
        }
    }
}
