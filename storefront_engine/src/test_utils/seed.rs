use crate::{
    api::exchange_objects::ExchangeRate,
    db_types::{
        ActorContext,
        DeliveryRequest,
        DeliverySelection,
        DeliveryStation,
        Money,
        NewDeliveryStation,
        NewShippingZone,
        NewVariant,
        ProductVariant,
        ShippingZone,
    },
    traits::{CartManagement, DeliveryPricing, ExchangeRates, InventoryManagement},
};

/// A catalogue with one station and one zone, enough to drive a checkout
#[derive(Debug, Clone)]
pub struct SeededStore {
    pub variants: Vec<ProductVariant>,
    pub station: DeliveryStation,
    pub zone: ShippingZone,
}

impl SeededStore {
    pub fn variant(&self, sku: &str) -> &ProductVariant {
        self.variants.iter().find(|v| v.sku == sku).expect("No such SKU in the seeded store")
    }

    pub fn station_delivery(&self) -> DeliveryRequest {
        DeliveryRequest {
            selection: DeliverySelection::Station { station_id: self.station.id },
            shipping_address: None,
            shipping_phone: Some("0712345678".into()),
        }
    }

    pub fn zone_delivery(&self) -> DeliveryRequest {
        DeliveryRequest {
            selection: DeliverySelection::Zone { zone_id: self.zone.id },
            shipping_address: Some("Plot 4, Kampala Road, Kampala".into()),
            shipping_phone: Some("+256700000000".into()),
        }
    }
}

/// Seeds:
/// * `TSHIRT-M` at 1,000.00 with 10 in stock
/// * `MUG` at 500.00 with 1 in stock
/// * `CAP` at 750.00 with 0 in stock
/// * a pickup station charging 200.00 and an international zone charging 2,500.00
pub async fn seed_store<B>(db: &B) -> SeededStore
where B: InventoryManagement + DeliveryPricing {
    let mut variants = Vec::new();
    for (sku, name, price, stock) in
        [("TSHIRT-M", "Logo T-shirt", 1_000, 10), ("MUG", "Enamel mug", 500, 1), ("CAP", "Cap", 750, 0)]
    {
        let variant = NewVariant::new(sku, name, Money::from_major(price), stock);
        variants.push(db.insert_variant(variant).await.expect("Error seeding variant"));
    }
    let station = db
        .insert_station(NewDeliveryStation {
            name: "Westlands".into(),
            county: "Nairobi".into(),
            address: "Sarit Centre, Ground Floor".into(),
            delivery_fee: Money::from_major(200),
            phone_number: Some("0700000001".into()),
        })
        .await
        .expect("Error seeding station");
    let zone = db
        .insert_zone(NewShippingZone {
            name: "East Africa".into(),
            shipping_cost: Money::from_major(2_500),
            estimated_delivery_days: 5,
        })
        .await
        .expect("Error seeding zone");
    SeededStore { variants, station, zone }
}

pub async fn fill_cart<B: CartManagement>(db: &B, owner: &ActorContext, lines: &[(i64, i64)]) {
    for (variant_id, quantity) in lines {
        db.add_cart_item(owner, *variant_id, *quantity).await.expect("Error adding item to cart");
    }
}

/// Stores a KES to USD rate of 0.0078
pub async fn seed_exchange_rate<B: ExchangeRates>(db: &B) -> ExchangeRate {
    let rate = ExchangeRate::new("KES", "USD", 7_800, None);
    db.set_exchange_rate(&rate).await.expect("Error setting exchange rate");
    rate
}
