use chrono::Duration;
use mockall::mock;
use serde_json::Value;
use storefront_engine::{
    api::exchange_objects::ExchangeRate,
    db_types::{
        ActorContext,
        Cart,
        CartItem,
        CartSnapshot,
        DeliveryRequest,
        DeliveryStation,
        NewDeliveryStation,
        NewOrder,
        NewPayment,
        NewShippingZone,
        NewVariant,
        Order,
        OrderItem,
        OrderNumber,
        OrderStatusEvent,
        OrderStatusType,
        Payment,
        PaymentId,
        PaymentMethod,
        PaymentOutcome,
        PaymentSubject,
        ProductVariant,
        ResolvedDelivery,
        ShippingZone,
    },
    traits::{
        CallbackEvent,
        CartError,
        CartItemDetail,
        CartManagement,
        DeliveryError,
        DeliveryPricing,
        ExchangeRateError,
        ExchangeRates,
        GatewayCallResult,
        InventoryError,
        InventoryManagement,
        OrderManagement,
        OrderManagementError,
        OrderPage,
        OutcomeApplied,
        Pagination,
        PaymentManagement,
        PaymentManagementError,
        PushPaymentAccepted,
        PushPaymentClient,
        PushPaymentRequest,
        ReconcileOutcome,
    },
};

mock! {
    pub Store {}
    impl Clone for Store {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for Store {
        fn url(&self) -> &str;
        async fn commit_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderItem>), OrderManagementError>;
        async fn apply_payment_outcome(&self, order_number: &OrderNumber, outcome: &PaymentOutcome, actor: &str) -> Result<OutcomeApplied, OrderManagementError>;
        async fn advance_order_status<'a>(&self, order_number: &OrderNumber, new_status: OrderStatusType, actor: &str, note: Option<&'a str>) -> Result<OutcomeApplied, OrderManagementError>;
        async fn fetch_order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderManagementError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderManagementError>;
        async fn fetch_order_history(&self, order_id: i64) -> Result<Vec<OrderStatusEvent>, OrderManagementError>;
        async fn fetch_orders_for_owner(&self, owner: &ActorContext, page: Pagination) -> Result<OrderPage, OrderManagementError>;
        async fn fetch_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderManagementError>;
        async fn close(&mut self) -> Result<(), OrderManagementError>;
    }
    impl PaymentManagement for Store {
        async fn begin_payment_attempt(&self, payment: NewPayment, supersede: bool) -> Result<Payment, PaymentManagementError>;
        async fn attach_correlation_id(&self, payment_id: &PaymentId, correlation_id: &str, response: Value) -> Result<Payment, PaymentManagementError>;
        async fn fail_payment_attempt(&self, payment_id: &PaymentId, reason: &str, response: Option<Value>) -> Result<Payment, PaymentManagementError>;
        async fn reconcile_payment(&self, event: &CallbackEvent) -> Result<ReconcileOutcome, PaymentManagementError>;
        async fn fetch_payment_by_correlation_id(&self, correlation_id: &str) -> Result<Option<Payment>, PaymentManagementError>;
        async fn fetch_payments_for_subject(&self, subject: PaymentSubject) -> Result<Vec<Payment>, PaymentManagementError>;
        async fn fetch_in_flight_payment(&self, subject: PaymentSubject, method: Option<PaymentMethod>) -> Result<Option<Payment>, PaymentManagementError>;
    }
    impl CartManagement for Store {
        async fn fetch_or_create_cart(&self, owner: &ActorContext) -> Result<Cart, CartError>;
        async fn fetch_cart_items(&self, owner: &ActorContext) -> Result<Vec<CartItemDetail>, CartError>;
        async fn add_cart_item(&self, owner: &ActorContext, variant_id: i64, quantity: i64) -> Result<CartItem, CartError>;
        async fn update_cart_item(&self, owner: &ActorContext, variant_id: i64, quantity: i64) -> Result<CartItem, CartError>;
        async fn remove_cart_item(&self, owner: &ActorContext, variant_id: i64) -> Result<(), CartError>;
        async fn fetch_cart_snapshot(&self, owner: &ActorContext) -> Result<Option<CartSnapshot>, CartError>;
        async fn merge_carts(&self, session_key: &str, user_id: &str) -> Result<Cart, CartError>;
    }
    impl DeliveryPricing for Store {
        async fn fetch_active_stations(&self) -> Result<Vec<DeliveryStation>, DeliveryError>;
        async fn fetch_active_zones(&self) -> Result<Vec<ShippingZone>, DeliveryError>;
        async fn resolve_delivery(&self, request: &DeliveryRequest) -> Result<ResolvedDelivery, DeliveryError>;
        async fn insert_station(&self, station: NewDeliveryStation) -> Result<DeliveryStation, DeliveryError>;
        async fn insert_zone(&self, zone: NewShippingZone) -> Result<ShippingZone, DeliveryError>;
    }
    impl ExchangeRates for Store {
        async fn fetch_last_rate(&self, base: &str, quote: &str) -> Result<ExchangeRate, ExchangeRateError>;
        async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError>;
    }
    impl InventoryManagement for Store {
        async fn insert_variant(&self, variant: NewVariant) -> Result<ProductVariant, InventoryError>;
        async fn fetch_variant(&self, variant_id: i64) -> Result<Option<ProductVariant>, InventoryError>;
        async fn set_stock(&self, variant_id: i64, quantity: i64) -> Result<ProductVariant, InventoryError>;
    }
}

mock! {
    pub PushClient {}
    impl PushPaymentClient for PushClient {
        async fn request_payment(&self, request: PushPaymentRequest) -> GatewayCallResult<PushPaymentAccepted>;
    }
}
