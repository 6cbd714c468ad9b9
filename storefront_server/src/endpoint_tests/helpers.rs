use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use serde::Serialize;
use storefront_engine::db_types::{
    DeliveryType,
    Money,
    Order,
    OrderNumber,
    OrderStatusType,
    Payment,
    PaymentId,
    PaymentMethod,
    PaymentStatus,
    PaymentSubject,
};

use crate::identity::{ROLES_HEADER, SESSION_HEADER, USER_HEADER};

/// Who the request claims to come from. An empty caller sends no identity headers at all.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user: Option<&'static str>,
    pub session: Option<&'static str>,
    pub roles: Option<&'static str>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(id: &'static str) -> Self {
        Self { user: Some(id), ..Self::default() }
    }

    pub fn session(key: &'static str) -> Self {
        Self { session: Some(key), ..Self::default() }
    }

    pub fn with_session(mut self, key: &'static str) -> Self {
        self.session = Some(key);
        self
    }

    pub fn with_roles(mut self, roles: &'static str) -> Self {
        self.roles = Some(roles);
        self
    }

    fn apply(&self, mut req: TestRequest) -> TestRequest {
        if let Some(user) = self.user {
            req = req.insert_header((USER_HEADER, user));
        }
        if let Some(session) = self.session {
            req = req.insert_header((SESSION_HEADER, session));
        }
        if let Some(roles) = self.roles {
            req = req.insert_header((ROLES_HEADER, roles));
        }
        req
    }
}

pub async fn get_request(
    caller: &Caller,
    path: &str,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = caller.apply(TestRequest::get().uri(path));
    send(req, configure).await
}

pub async fn post_request<T: Serialize>(
    caller: &Caller,
    path: &str,
    body: &T,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = caller.apply(TestRequest::post().uri(path).set_json(body));
    send(req, configure).await
}

pub async fn post_raw(
    path: &str,
    body: &'static str,
    configure: impl FnOnce(&mut ServiceConfig),
) -> (StatusCode, String) {
    let req = TestRequest::post().uri(path).insert_header(("Content-Type", "application/json")).set_payload(body);
    send(req, configure).await
}

async fn send(req: TestRequest, configure: impl FnOnce(&mut ServiceConfig)) -> (StatusCode, String) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    // Errors raised by middleware arrive as `Err` rather than as a response
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = res.into_body().try_into_bytes().map(|b| String::from_utf8_lossy(&b).into_owned());
            (status, body.unwrap_or_default())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().map(|b| String::from_utf8_lossy(&b).into_owned());
            (status, body.unwrap_or_default())
        },
    }
}

pub fn order_for(user: &str, order_number: &str, status: OrderStatusType) -> Order {
    let created = Utc.with_ymd_and_hms(2024, 10, 2, 9, 15, 0).unwrap();
    Order {
        id: 7,
        order_number: OrderNumber::from(order_number),
        user_id: Some(user.to_string()),
        session_key: None,
        status,
        currency: "KES".to_string(),
        subtotal: Money::from(3_000_00),
        delivery_fee: Money::from(200_00),
        total_amount: Money::from(3_200_00),
        delivery_type: DeliveryType::Domestic,
        delivery_station_id: Some(4),
        shipping_zone_id: None,
        shipping_address: "Westlands, Sarit Centre, Ground Floor".to_string(),
        shipping_phone: "0712345678".to_string(),
        customer_notes: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn processing_payment(order: &Order) -> Payment {
    Payment {
        id: 11,
        payment_id: PaymentId::from("PAY-7-0001".to_string()),
        subject: PaymentSubject::Order(order.id),
        method: PaymentMethod::Push,
        amount: order.total_amount,
        currency: order.currency.clone(),
        settlement_amount: None,
        settlement_currency: None,
        status: PaymentStatus::Processing,
        correlation_id: None,
        payer_reference: Some("254712345678".to_string()),
        receipt: None,
        gateway_response: None,
        failure_reason: None,
        paid_at: None,
        created_at: order.created_at,
        updated_at: order.created_at,
    }
}
