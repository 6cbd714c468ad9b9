use thiserror::Error;

use crate::db_types::{
    DeliveryRequest,
    DeliveryStation,
    DeliveryType,
    NewDeliveryStation,
    NewShippingZone,
    ResolvedDelivery,
    ShippingZone,
};

#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid delivery selection: {0}")]
    InvalidSelection(String),
    #[error("Missing shipping details: {0}")]
    MissingShippingDetails(String),
}

impl From<sqlx::Error> for DeliveryError {
    fn from(e: sqlx::Error) -> Self {
        Self::DatabaseError(e.to_string())
    }
}

/// Delivery options and the fee each one adds to an order.
#[allow(async_fn_in_trait)]
pub trait DeliveryPricing {
    async fn fetch_active_stations(&self) -> Result<Vec<DeliveryStation>, DeliveryError>;

    async fn fetch_active_zones(&self) -> Result<Vec<ShippingZone>, DeliveryError>;

    /// Validates the customer's delivery choice and fixes its fee. Inactive or unknown stations and zones are rejected
    /// with [`DeliveryError::InvalidSelection`].
    async fn resolve_delivery(&self, request: &DeliveryRequest) -> Result<ResolvedDelivery, DeliveryError>;

    async fn insert_station(&self, station: NewDeliveryStation) -> Result<DeliveryStation, DeliveryError>;

    async fn insert_zone(&self, zone: NewShippingZone) -> Result<ShippingZone, DeliveryError>;
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from)
}

/// Domestic delivery goes to the station's address. A contact phone is still required.
pub fn resolve_for_station(station: &DeliveryStation, request: &DeliveryRequest) -> Result<ResolvedDelivery, DeliveryError> {
    if !station.is_active {
        return Err(DeliveryError::InvalidSelection(format!("Delivery station {} is not active", station.id)));
    }
    let shipping_phone = non_blank(request.shipping_phone.as_ref())
        .ok_or_else(|| DeliveryError::MissingShippingDetails("A contact phone number is required".into()))?;
    Ok(ResolvedDelivery {
        delivery_type: DeliveryType::Domestic,
        station_id: Some(station.id),
        zone_id: None,
        fee: station.delivery_fee,
        shipping_address: format!("{}, {}", station.name, station.address),
        shipping_phone,
    })
}

/// International shipping needs both an address and a phone number from the customer.
pub fn resolve_for_zone(zone: &ShippingZone, request: &DeliveryRequest) -> Result<ResolvedDelivery, DeliveryError> {
    if !zone.is_active {
        return Err(DeliveryError::InvalidSelection(format!("Shipping zone {} is not active", zone.id)));
    }
    let shipping_address = non_blank(request.shipping_address.as_ref()).ok_or_else(|| {
        DeliveryError::MissingShippingDetails("A shipping address is required for international delivery".into())
    })?;
    let shipping_phone = non_blank(request.shipping_phone.as_ref())
        .ok_or_else(|| DeliveryError::MissingShippingDetails("A contact phone number is required".into()))?;
    Ok(ResolvedDelivery {
        delivery_type: DeliveryType::International,
        station_id: None,
        zone_id: Some(zone.id),
        fee: zone.shipping_cost,
        shipping_address,
        shipping_phone,
    })
}
