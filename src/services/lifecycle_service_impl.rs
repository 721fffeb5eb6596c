use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::razorpay::RazorpayClient;
use crate::clients::shiprocket::{
    ReturnOrderRequest, ShipmentLineItem, ShipmentOrderRequest, ShiprocketClient,
};
use crate::db::{ContactInfo, Store};
use crate::domain::TrackingStatus;
use crate::entities::orders::{self, OrderStatus};
use crate::services::booking_service::BookingService;
use crate::services::lifecycle_service::{
    ActivationReport, LifecycleError, LifecycleService, PaymentContact, PaymentIntent,
    ShipmentInfo, TrackingReport,
};

const CURRENCY: &str = "INR";
const PAYMENT_METHOD: &str = "Prepaid";

// The storefront collects one free-text address line; the structured
// region fields carry the warehouse region.
const BILLING_CITY: &str = "Pune";
const BILLING_PINCODE: &str = "411042";
const BILLING_STATE: &str = "Maharashtra";
const BILLING_COUNTRY: &str = "India";

// Flat-folded garment parcel.
const PARCEL_LENGTH_CM: f64 = 10.0;
const PARCEL_BREADTH_CM: f64 = 10.0;
const PARCEL_HEIGHT_CM: f64 = 1.0;
const PARCEL_WEIGHT_KG: f64 = 0.5;

/// SeaORM-backed implementation of the order lifecycle.
pub struct SeaOrmLifecycleService {
    store: Store,
    booking: Arc<dyn BookingService>,
    razorpay: Arc<RazorpayClient>,
    shiprocket: Arc<ShiprocketClient>,
}

impl SeaOrmLifecycleService {
    #[must_use]
    pub const fn new(
        store: Store,
        booking: Arc<dyn BookingService>,
        razorpay: Arc<RazorpayClient>,
        shiprocket: Arc<ShiprocketClient>,
    ) -> Self {
        Self {
            store,
            booking,
            razorpay,
            shiprocket,
        }
    }

    async fn load_order(&self, order_id: i32) -> Result<orders::Model, LifecycleError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound)
    }

    fn contact_of(order: &orders::Model) -> Result<ContactInfo, LifecycleError> {
        match (
            &order.customer_name,
            &order.customer_email,
            &order.customer_phone,
            &order.shipping_address,
        ) {
            (Some(name), Some(email), Some(phone), Some(address)) => Ok(ContactInfo {
                customer_name: name.clone(),
                customer_email: email.clone(),
                customer_phone: phone.clone(),
                shipping_address: address.clone(),
            }),
            _ => Err(LifecycleError::MissingContact),
        }
    }

    /// Sum of security deposits over the order's lines, at current item
    /// values.
    async fn deposit_total(&self, order_id: i32) -> Result<Decimal, LifecycleError> {
        let lines = self.store.order_lines(order_id).await?;
        let ids: Vec<i32> = lines.iter().map(|l| l.item_id).collect();
        let items: HashMap<i32, _> = self
            .store
            .get_items_by_ids(&ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let mut total = Decimal::ZERO;
        for line in &lines {
            let item = items.get(&line.item_id).ok_or_else(|| {
                LifecycleError::Internal(format!("Order line references missing item {}", line.item_id))
            })?;
            total += item.security_deposit * Decimal::from(line.quantity);
        }
        Ok(total)
    }

    async fn shipment_line_items(
        &self,
        order_id: i32,
    ) -> Result<Vec<ShipmentLineItem>, LifecycleError> {
        let lines = self.store.order_lines(order_id).await?;
        let ids: Vec<i32> = lines.iter().map(|l| l.item_id).collect();
        let items: HashMap<i32, _> = self
            .store
            .get_items_by_ids(&ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let mut out = Vec::with_capacity(lines.len());
        for line in &lines {
            let item = items.get(&line.item_id).ok_or_else(|| {
                LifecycleError::Internal(format!("Order line references missing item {}", line.item_id))
            })?;
            out.push(ShipmentLineItem {
                name: item.name.clone(),
                sku: item.id.to_string(),
                units: line.quantity,
                selling_price: item.daily_rate.to_string(),
            });
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl LifecycleService for SeaOrmLifecycleService {
    async fn initiate_payment(
        &self,
        order_id: i32,
        contact: PaymentContact,
    ) -> Result<PaymentIntent, LifecycleError> {
        let order = self.load_order(order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(LifecycleError::NotPending);
        }

        // Rates may have moved since the quote; never charge the stored
        // total.
        let rental_total = self
            .booking
            .recompute_total(order_id)
            .await
            .map_err(|e| LifecycleError::Internal(e.to_string()))?;
        let deposit_total = self.deposit_total(order_id).await?;

        let charge = rental_total + deposit_total;
        let amount_minor = (charge * Decimal::from(100))
            .trunc()
            .to_i64()
            .ok_or_else(|| LifecycleError::Internal(format!("Charge out of range: {charge}")))?;

        let receipt = format!("order_{order_id}");
        let gateway_order = self
            .razorpay
            .create_order(amount_minor, CURRENCY, &receipt)
            .await
            .map_err(|e| LifecycleError::Gateway(e.to_string()))?;

        let contact = ContactInfo {
            customer_name: contact.name,
            customer_email: contact.email,
            customer_phone: contact.phone,
            shipping_address: contact.address,
        };
        self.store
            .set_order_payment_initiated(order_id, &gateway_order.id, &contact, rental_total)
            .await?;

        info!(
            "Payment initiated for order {} ({} {} minor units, gateway order {})",
            order_id, amount_minor, CURRENCY, gateway_order.id
        );

        Ok(PaymentIntent {
            payment_order_id: gateway_order.id,
            amount_minor,
            currency: CURRENCY.to_string(),
            rental_total,
            deposit_total,
        })
    }

    async fn apply_payment_captured(
        &self,
        payment_order_id: &str,
    ) -> Result<ActivationReport, LifecycleError> {
        let order = self
            .store
            .find_order_by_payment_id(payment_order_id)
            .await?
            .ok_or(LifecycleError::OrderNotFound)?;

        let newly_activated = self.store.mark_order_active(order.id).await?;
        if newly_activated {
            info!("Order {} activated by payment capture", order.id);
        } else {
            info!(
                "Payment capture for order {} replayed; order already past pending",
                order.id
            );
        }

        // Shipment failures are reported, never propagated: the activation
        // above must stand, and the shipment endpoint can retry later.
        let shipment_created = match self.create_shipment(order.id).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Shipment creation for order {} deferred: {}", order.id, e);
                false
            }
        };

        Ok(ActivationReport {
            order_id: order.id,
            newly_activated,
            shipment_created,
        })
    }

    async fn create_shipment(&self, order_id: i32) -> Result<ShipmentInfo, LifecycleError> {
        let order = self.load_order(order_id).await?;

        if let (Some(shipping_order_id), Some(shipment_id)) =
            (&order.shipping_order_id, &order.shipment_id)
        {
            return Ok(ShipmentInfo {
                shipping_order_id: shipping_order_id.clone(),
                shipment_id: shipment_id.clone(),
            });
        }

        if order.status != OrderStatus::Active {
            return Err(LifecycleError::NotActive);
        }
        let contact = Self::contact_of(&order)?;
        let order_items = self.shipment_line_items(order_id).await?;

        let request = ShipmentOrderRequest {
            order_id: order.id.to_string(),
            order_date: order.created_at.format("%Y-%m-%d").to_string(),
            pickup_location: self.shiprocket.pickup_location().to_string(),
            billing_customer_name: contact.customer_name,
            billing_last_name: String::new(),
            billing_address: contact.shipping_address,
            billing_city: BILLING_CITY.to_string(),
            billing_pincode: BILLING_PINCODE.to_string(),
            billing_state: BILLING_STATE.to_string(),
            billing_country: BILLING_COUNTRY.to_string(),
            billing_email: contact.customer_email,
            billing_phone: contact.customer_phone,
            shipping_is_billing: true,
            order_items,
            payment_method: PAYMENT_METHOD.to_string(),
            sub_total: order.total_price.to_string(),
            length: PARCEL_LENGTH_CM,
            breadth: PARCEL_BREADTH_CM,
            height: PARCEL_HEIGHT_CM,
            weight: PARCEL_WEIGHT_KG,
        };

        let created = self
            .shiprocket
            .create_order(&request)
            .await
            .map_err(|e| LifecycleError::Shipping(e.to_string()))?;

        let stored = self
            .store
            .set_order_forward_shipment(
                order.id,
                &created.order_id.to_string(),
                &created.shipment_id.to_string(),
            )
            .await?;
        if !stored {
            // Lost a race with a concurrent creation; the first write wins.
            let current = self.load_order(order_id).await?;
            if let (Some(shipping_order_id), Some(shipment_id)) =
                (current.shipping_order_id, current.shipment_id)
            {
                return Ok(ShipmentInfo {
                    shipping_order_id,
                    shipment_id,
                });
            }
            return Err(LifecycleError::Internal(
                "Shipment identifiers vanished after conflicting write".to_string(),
            ));
        }

        info!(
            "Forward shipment {} created for order {}",
            created.shipment_id, order.id
        );
        Ok(ShipmentInfo {
            shipping_order_id: created.order_id.to_string(),
            shipment_id: created.shipment_id.to_string(),
        })
    }

    async fn request_return(&self, order_id: i32) -> Result<ShipmentInfo, LifecycleError> {
        let order = self.load_order(order_id).await?;

        if let (Some(return_order_id), Some(return_shipment_id)) =
            (&order.return_order_id, &order.return_shipment_id)
        {
            return Ok(ShipmentInfo {
                shipping_order_id: return_order_id.clone(),
                shipment_id: return_shipment_id.clone(),
            });
        }

        if order.shipment_id.is_none() {
            return Err(LifecycleError::ShipmentNotReady);
        }
        let contact = Self::contact_of(&order)?;
        let order_items = self.shipment_line_items(order_id).await?;

        // The customer side is the pickup side on a reverse shipment.
        let request = ReturnOrderRequest {
            order_id: format!("{}_return", order.id),
            order_date: Utc::now().format("%Y-%m-%d").to_string(),
            pickup_customer_name: contact.customer_name,
            pickup_last_name: String::new(),
            pickup_address: contact.shipping_address,
            pickup_city: BILLING_CITY.to_string(),
            pickup_pincode: BILLING_PINCODE.to_string(),
            pickup_state: BILLING_STATE.to_string(),
            pickup_country: BILLING_COUNTRY.to_string(),
            pickup_email: contact.customer_email,
            pickup_phone: contact.customer_phone,
            order_items,
            payment_method: PAYMENT_METHOD.to_string(),
            sub_total: order.total_price.to_string(),
            length: PARCEL_LENGTH_CM,
            breadth: PARCEL_BREADTH_CM,
            height: PARCEL_HEIGHT_CM,
            weight: PARCEL_WEIGHT_KG,
        };

        let created = self
            .shiprocket
            .create_return(&request)
            .await
            .map_err(|e| LifecycleError::Shipping(e.to_string()))?;

        let stored = self
            .store
            .set_order_return_shipment(
                order.id,
                &created.order_id.to_string(),
                &created.shipment_id.to_string(),
            )
            .await?;
        if !stored {
            let current = self.load_order(order_id).await?;
            if let (Some(return_order_id), Some(return_shipment_id)) =
                (current.return_order_id, current.return_shipment_id)
            {
                return Ok(ShipmentInfo {
                    shipping_order_id: return_order_id,
                    shipment_id: return_shipment_id,
                });
            }
            return Err(LifecycleError::Internal(
                "Return identifiers vanished after conflicting write".to_string(),
            ));
        }

        info!(
            "Return shipment {} requested for order {}",
            created.shipment_id, order.id
        );
        Ok(ShipmentInfo {
            shipping_order_id: created.order_id.to_string(),
            shipment_id: created.shipment_id.to_string(),
        })
    }

    async fn track(&self, order_id: i32) -> Result<TrackingReport, LifecycleError> {
        let order = self.load_order(order_id).await?;
        let shipment_id = order
            .shipment_id
            .as_deref()
            .ok_or(LifecycleError::ShipmentNotReady)?;

        let snapshot = self
            .shiprocket
            .track(shipment_id)
            .await
            .map_err(|e| LifecycleError::Shipping(e.to_string()))?;

        let status = snapshot
            .status_code
            .map_or(TrackingStatus::Unknown, TrackingStatus::from_provider_code);
        let days_left = snapshot.etd.as_deref().and_then(days_until_etd);

        Ok(TrackingReport {
            status,
            days_left,
            etd: snapshot.etd,
        })
    }

    async fn complete_order(&self, order_id: i32) -> Result<(), LifecycleError> {
        let order = self.load_order(order_id).await?;
        let completed = self.store.mark_order_completed(order.id).await?;
        if !completed {
            return Err(LifecycleError::NotActive);
        }
        info!("Order {} completed", order.id);
        Ok(())
    }
}

/// Whole days between today and the carrier's estimated delivery date.
/// The carrier reports either a datetime or a bare date; anything else is
/// ignored rather than treated as an error.
fn days_until_etd(etd: &str) -> Option<i64> {
    let date = NaiveDateTime::parse_from_str(etd, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(etd, "%Y-%m-%d"))
        .ok()?;
    let today = Utc::now().date_naive();
    Some((date - today).num_days().max(0))
}
