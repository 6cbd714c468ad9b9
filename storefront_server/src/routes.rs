//! Request handler definitions
//!
//! Define each route and it handler here. Handlers only translate HTTP into calls on the engine APIs and back; anything
//! more than a line or two of logic belongs in the engine.
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database and payment provider call is therefore awaited,
//! never run synchronously.
//!
//! Every `/api` handler extracts an [`Identity`], so a request without identity headers is rejected with a 401 before
//! the handler body runs. Back-office routes are additionally wrapped in the ACL middleware via the
//! `where requires [...]` form of the `route!` macro.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use storefront_engine::{
    db_types::{Order, OrderNumber, Role},
    gateways::{PaymentGateway, PushPaymentGateway, PushPaymentParams, RedirectPaymentGateway, RedirectPaymentParams},
    traits::{
        CartManagement,
        DeliveryPricing,
        ExchangeRates,
        InventoryManagement,
        OrderManagement,
        PaymentManagement,
        PushPaymentClient,
        ReconcileOutcome,
        RedirectPaymentClient,
    },
    CartApi,
    ExchangeRateApi,
    InventoryApi,
    OrderFlowApi,
    OrderQueryApi,
    ReconciliationApi,
};

use crate::{
    data_objects::{
        AddCartItemRequest,
        CancelRequest,
        CheckoutRequest,
        ExchangeRateResult,
        ExchangeRateUpdate,
        JsonResponse,
        PageQuery,
        PaymentStarted,
        PushCallbackAck,
        RedirectCancelParams,
        RedirectReturnParams,
        StatusUpdateRequest,
        StockUpdate,
        UpdateCartItemRequest,
    },
    errors::ServerError,
    identity::Identity,
};

pub const CUSTOMER_CANCEL_REASON: &str = "cancelled by customer";
pub const ADMIN_CANCEL_REASON: &str = "cancelled by administrator";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
//
// route!(name => Method "/path");
// route!(name => Method "/path" requires [Role::Admin]);
// route!(name => Method "/path" impl B: Trait1 + Trait2, C: Trait3);
// route!(name => Method "/path" impl B: Trait1 + Trait2 where requires [Role::Staff]);
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
            impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($param:ident: $first:ident $(+ $rest:ident)*),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<$($param,)+>(core::marker::PhantomData<fn() -> ($($param,)+)>);}
        paste::paste! { impl<$($param,)+> [<$name:camel Route>]<$($param,)+> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<$($param,)+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$($param,)+>
        where
            $($param: $first $(+ $rest)* + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<$($param,)+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($param:ident: $first:ident $(+ $rest:ident)*),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<$($param,)+>(core::marker::PhantomData<fn() -> ($($param,)+)>);}
        paste::paste! { impl<$($param,)+> [<$name:camel Route>]<$($param,)+> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData)
            }
        }}
        paste::paste! { impl<$($param,)+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$($param,)+>
        where
            $($param: $first $(+ $rest)* + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<$($param,)+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(cart => Get "/cart" impl B: CartManagement);
pub async fn cart<B: CartManagement>(identity: Identity, api: web::Data<CartApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET cart for {}", identity.actor);
    let view = api.view(&identity.actor).await?;
    Ok(HttpResponse::Ok().json(view))
}

route!(cart_add_item => Post "/cart/items" impl B: CartManagement);
pub async fn cart_add_item<B: CartManagement>(
    identity: Identity,
    body: web::Json<AddCartItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddCartItemRequest { variant_id, quantity } = body.into_inner();
    trace!("💻️ {} is adding {quantity} of variant {variant_id} to their cart", identity.actor);
    let item = api.add_item(&identity.actor, variant_id, quantity).await?;
    Ok(HttpResponse::Ok().json(item))
}

route!(cart_update_item => Patch "/cart/items/{variant_id}" impl B: CartManagement);
pub async fn cart_update_item<B: CartManagement>(
    identity: Identity,
    path: web::Path<i64>,
    body: web::Json<UpdateCartItemRequest>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let variant_id = path.into_inner();
    let item = api.update_item(&identity.actor, variant_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(item))
}

route!(cart_remove_item => Delete "/cart/items/{variant_id}" impl B: CartManagement);
pub async fn cart_remove_item<B: CartManagement>(
    identity: Identity,
    path: web::Path<i64>,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let variant_id = path.into_inner();
    api.remove_item(&identity.actor, variant_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Variant {variant_id} removed from cart"))))
}

route!(cart_merge => Post "/cart/merge" impl B: CartManagement);
/// Carries the guest cart over to the user who just signed in. Both the user and the session headers must be present.
pub async fn cart_merge<B: CartManagement>(
    identity: Identity,
    api: web::Data<CartApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (Some(user_id), Some(session_key)) = (identity.actor.user_id(), identity.session_key.as_deref()) else {
        return Err(ServerError::ValidationError(
            "Merging a cart needs both a signed-in user and the session the cart was built in".to_string(),
        ));
    };
    api.merge_session_cart(session_key, user_id).await?;
    let view = api.view(&identity.actor).await?;
    Ok(HttpResponse::Ok().json(view))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(delivery_options => Get "/delivery/options" impl B: DeliveryPricing);
pub async fn delivery_options<B: DeliveryPricing>(
    identity: Identity,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ {} requested delivery options", identity.actor);
    let options = api.delivery_options().await?;
    Ok(HttpResponse::Ok().json(options))
}

route!(checkout_quote => Post "/checkout/quote" impl B: OrderManagement + CartManagement + DeliveryPricing);
pub async fn checkout_quote<B>(
    identity: Identity,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CartManagement + DeliveryPricing,
{
    let quote = api.quote_delivery(&identity.actor, &body.delivery).await?;
    Ok(HttpResponse::Ok().json(quote))
}

route!(checkout => Post "/checkout" impl B: OrderManagement + CartManagement + DeliveryPricing);
/// Commits the caller's cart as a new `pending` order. Responds with 201 and the order and its items.
pub async fn checkout<B>(
    identity: Identity,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + CartManagement + DeliveryPricing,
{
    let CheckoutRequest { delivery, customer_notes } = body.into_inner();
    debug!("💻️ Checkout requested by {}", identity.actor);
    let committed = api.commit(&identity.actor, &delivery, customer_notes).await.map_err(|e| {
        debug!("💻️ Checkout for {} was turned away. {e}", identity.actor);
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Created().json(committed))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl B: OrderManagement + PaymentManagement);
pub async fn my_orders<B>(
    identity: Identity,
    query: web::Query<PageQuery>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
{
    let page = api.orders_for(&identity.actor, query.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(page))
}

route!(my_order => Get "/orders/{order_number}" impl B: OrderManagement + PaymentManagement);
/// The order, its items, its payments and its tracking steps, for the order's owner only.
pub async fn my_order<B>(
    identity: Identity,
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
{
    let order_number = OrderNumber::from(path.into_inner());
    let detail = api.order_detail(&identity.actor, &order_number).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(cancel_my_order => Post "/orders/{order_number}/cancel" impl B: OrderManagement);
pub async fn cancel_my_order<B: OrderManagement>(
    identity: Identity,
    path: web::Path<String>,
    body: Option<web::Json<CancelRequest>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let reason = body.and_then(|b| b.into_inner().reason).unwrap_or_else(|| CUSTOMER_CANCEL_REASON.to_string());
    info!("💻️ {} asked to cancel order {order_number}", identity.actor);
    let applied = api.cancel_own_order(&identity.actor, &order_number, &reason).await?;
    Ok(HttpResponse::Ok().json(applied))
}

/// Fetches an order for its owner. Orders that belong to someone else are reported as missing.
async fn fetch_own_order<B>(
    api: &OrderQueryApi<B>,
    identity: &Identity,
    order_number: &OrderNumber,
) -> Result<Order, ServerError>
where
    B: OrderManagement + PaymentManagement,
{
    api.fetch_order(order_number)
        .await?
        .filter(|o| o.is_owned_by(&identity.actor))
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_number} does not exist")))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(push_payment => Post "/payments/push/{order_number}" impl B: OrderManagement + PaymentManagement, C: PushPaymentClient);
/// Prompts the customer's phone to pay for the order. The result arrives later on `/callbacks/push`.
pub async fn push_payment<B, C>(
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<PushPaymentParams>,
    orders: web::Data<OrderQueryApi<B>>,
    gateway: web::Data<PushPaymentGateway<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
    C: PushPaymentClient,
{
    let order_number = OrderNumber::from(path.into_inner());
    let order = fetch_own_order(orders.as_ref(), &identity, &order_number).await?;
    debug!("💻️ {} is starting a push payment for order {order_number}", identity.actor);
    let pending = gateway.initiate(&order, body.into_inner()).await?;
    Ok(HttpResponse::Accepted().json(PaymentStarted::from(pending)))
}

route!(redirect_payment => Post "/payments/redirect/{order_number}" impl B: OrderManagement + PaymentManagement + ExchangeRates + Clone, C: RedirectPaymentClient);
/// Creates a hosted-checkout payment and returns the URL to send the customer to.
pub async fn redirect_payment<B, C>(
    identity: Identity,
    path: web::Path<String>,
    body: Option<web::Json<RedirectPaymentParams>>,
    orders: web::Data<OrderQueryApi<B>>,
    gateway: web::Data<RedirectPaymentGateway<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement + ExchangeRates + Clone,
    C: RedirectPaymentClient,
{
    let order_number = OrderNumber::from(path.into_inner());
    let order = fetch_own_order(orders.as_ref(), &identity, &order_number).await?;
    let params = body.map(|b| b.into_inner()).unwrap_or_default();
    debug!("💻️ {} is starting a redirect payment for order {order_number}", identity.actor);
    let pending = gateway.initiate(&order, params).await?;
    Ok(HttpResponse::Ok().json(PaymentStarted::from(pending)))
}

route!(redirect_execute => Get "/payments/redirect/{order_number}/execute" impl B: OrderManagement + PaymentManagement + ExchangeRates + Clone, C: RedirectPaymentClient);
/// The provider's return URL. Executes the approved payment and settles the order.
pub async fn redirect_execute<B, C>(
    identity: Identity,
    path: web::Path<String>,
    query: web::Query<RedirectReturnParams>,
    orders: web::Data<OrderQueryApi<B>>,
    gateway: web::Data<RedirectPaymentGateway<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement + ExchangeRates + Clone,
    C: RedirectPaymentClient,
{
    let order_number = OrderNumber::from(path.into_inner());
    let order = fetch_own_order(orders.as_ref(), &identity, &order_number).await?;
    let RedirectReturnParams { payment_id, payer_id } = query.into_inner();
    let outcome = gateway.execute(&order, &payment_id, &payer_id).await?;
    match &outcome {
        ReconcileOutcome::Conflict { .. } => {
            warn!("💻️ Payment {payment_id} was taken for order {order_number}, but the order had already moved on")
        },
        _ => debug!("💻️ Payment {payment_id} for order {order_number} executed"),
    }
    Ok(HttpResponse::Ok().json(outcome))
}

route!(redirect_cancel => Get "/payments/redirect/{order_number}/cancel" impl B: OrderManagement + PaymentManagement + ExchangeRates + Clone, C: RedirectPaymentClient);
/// The provider's cancel URL. Fails the waiting payment; the order stays `pending` so the customer can try again.
pub async fn redirect_cancel<B, C>(
    identity: Identity,
    path: web::Path<String>,
    query: web::Query<RedirectCancelParams>,
    orders: web::Data<OrderQueryApi<B>>,
    gateway: web::Data<RedirectPaymentGateway<B, C>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement + ExchangeRates + Clone,
    C: RedirectPaymentClient,
{
    let order_number = OrderNumber::from(path.into_inner());
    let order = fetch_own_order(orders.as_ref(), &identity, &order_number).await?;
    let payment = gateway.cancel(&order, query.payment_id.as_deref()).await?;
    Ok(HttpResponse::Ok().json(storefront_engine::api::order_objects::PaymentSummary::from(payment)))
}

//----------------------------------------------   Callbacks  ----------------------------------------------------
route!(push_callback => Post "/push" impl B: PaymentManagement, C: PushPaymentClient);
/// Result notifications from the push payment provider.
///
/// The provider retries anything that is not acknowledged, so this always answers with an acknowledgement, even when
/// the payload cannot be read or matches no payment. Those cases are logged instead.
pub async fn push_callback<B, C>(
    body: web::Bytes,
    gateway: web::Data<PushPaymentGateway<B, C>>,
    api: web::Data<ReconciliationApi<B>>,
) -> HttpResponse
where
    B: PaymentManagement,
    C: PushPaymentClient,
{
    trace!("💻️ Received push payment callback");
    match gateway.translate_callback(&body) {
        Ok(event) => match api.process(event).await {
            Ok(outcome) => trace!("💻️ Push callback processed: {outcome:?}"),
            Err(e) => error!("💻️ Could not process push callback. {e}"),
        },
        Err(e) => warn!("💻️ Ignoring unreadable push callback. {e}. Payload: {}", String::from_utf8_lossy(&body)),
    }
    HttpResponse::Ok().json(PushCallbackAck::accepted())
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(admin_order => Get "/admin/orders/{order_number}" impl B: OrderManagement + PaymentManagement where requires [Role::Staff]);
pub async fn admin_order<B>(
    path: web::Path<String>,
    api: web::Data<OrderQueryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + PaymentManagement,
{
    let order_number = OrderNumber::from(path.into_inner());
    let detail = api.order_detail_admin(&order_number).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(admin_order_status => Post "/admin/orders/{order_number}/status" impl B: OrderManagement where requires [Role::Staff]);
/// Moves a paid order one step along `confirmed → processing → shipped → delivered`.
pub async fn admin_order_status<B: OrderManagement>(
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let StatusUpdateRequest { status, note } = body.into_inner();
    info!("💻️ {} is moving order {order_number} to {status}", identity.actor);
    let applied = api.advance_status(&order_number, status, &identity.actor.to_string(), note.as_deref()).await?;
    Ok(HttpResponse::Ok().json(applied))
}

route!(admin_cancel_order => Post "/admin/orders/{order_number}/cancel" impl B: OrderManagement where requires [Role::Admin]);
pub async fn admin_cancel_order<B: OrderManagement>(
    identity: Identity,
    path: web::Path<String>,
    body: Option<web::Json<CancelRequest>>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_number = OrderNumber::from(path.into_inner());
    let reason = body.and_then(|b| b.into_inner().reason).unwrap_or_else(|| ADMIN_CANCEL_REASON.to_string());
    info!("💻️ {} is cancelling order {order_number}: {reason}", identity.actor);
    let applied = api.cancel_order(&order_number, &identity.actor.to_string(), &reason).await?;
    Ok(HttpResponse::Ok().json(applied))
}

route!(get_exchange_rate => Get "/admin/exchange_rate/{base}/{quote}" impl B: ExchangeRates where requires [Role::Admin]);
pub async fn get_exchange_rate<B: ExchangeRates>(
    path: web::Path<(String, String)>,
    api: web::Data<ExchangeRateApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (base, quote) = path.into_inner();
    let rate = api.fetch_last_rate(&base.to_uppercase(), &quote.to_uppercase()).await?;
    Ok(HttpResponse::Ok().json(ExchangeRateResult::from(rate)))
}

route!(update_exchange_rate => Post "/admin/exchange_rate" impl B: ExchangeRates where requires [Role::Admin]);
pub async fn update_exchange_rate<B: ExchangeRates>(
    identity: Identity,
    body: web::Json<ExchangeRateUpdate>,
    api: web::Data<ExchangeRateApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let ExchangeRateUpdate { base_currency, quote_currency, rate } = body.into_inner();
    let rate = storefront_engine::api::exchange_objects::parse_rate(&rate)?;
    let rate = storefront_engine::api::exchange_objects::ExchangeRate::new(
        base_currency.trim().to_uppercase(),
        quote_currency.trim().to_uppercase(),
        rate,
        None,
    );
    info!("💻️ {} set the exchange rate: {rate}", identity.actor);
    api.set_exchange_rate(&rate).await?;
    Ok(HttpResponse::Ok().json(ExchangeRateResult::from(rate)))
}

route!(set_stock => Post "/admin/stock/{variant_id}" impl B: InventoryManagement where requires [Role::Admin]);
pub async fn set_stock<B: InventoryManagement>(
    identity: Identity,
    path: web::Path<i64>,
    body: web::Json<StockUpdate>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let variant_id = path.into_inner();
    info!("💻️ {} is setting stock for variant {variant_id} to {}", identity.actor, body.quantity);
    let variant = api.set_stock(variant_id, body.quantity).await?;
    Ok(HttpResponse::Ok().json(variant))
}
