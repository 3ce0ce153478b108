use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::discount::{DiscountId, DiscountRecord, DiscountRegistry, DiscountStatus},
    store::SettingsStore,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Fixed settings key the serialized registry lives under.
pub const DEFAULT_REGISTRY_KEY: &str = "promo_registry:discounts";

/// CRUD + validation facade over the persisted discount registry.
///
/// Every operation is a full load-mutate-store round trip against the
/// settings store. Read-modify-write is NOT atomic here: two concurrent
/// writers can race and silently clobber each other's updates. The original
/// system serialized all mutations through a single request-handling thread,
/// and that limitation is carried over rather than papered over with locking.
#[derive(Clone)]
pub struct DiscountService {
    settings: Arc<dyn SettingsStore>,
    event_sender: Option<EventSender>,
    registry_key: String,
}

impl DiscountService {
    pub fn new(settings: Arc<dyn SettingsStore>, event_sender: Option<EventSender>) -> Self {
        Self {
            settings,
            event_sender,
            registry_key: DEFAULT_REGISTRY_KEY.to_string(),
        }
    }

    /// Override the settings key, e.g. to namespace per tenant.
    pub fn with_registry_key(mut self, registry_key: impl Into<String>) -> Self {
        self.registry_key = registry_key.into();
        self
    }

    /// Ensure the backing key exists. Idempotent; an already-populated
    /// registry is left untouched.
    pub async fn declare(&self) -> Result<(), ServiceError> {
        self.settings.declare(&self.registry_key).await?;
        Ok(())
    }

    async fn load(&self) -> Result<DiscountRegistry, ServiceError> {
        let raw = self.settings.get(&self.registry_key).await?;
        match raw.as_deref() {
            // Absent (or declared-but-empty) key means an empty registry,
            // never an error.
            None | Some("") => Ok(DiscountRegistry::new()),
            Some(json) => serde_json::from_str(json)
                .map_err(|e| ServiceError::SerializationError(e.to_string())),
        }
    }

    async fn save(&self, registry: &DiscountRegistry) -> Result<(), ServiceError> {
        let json = serde_json::to_string(registry)
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;
        self.settings.set(&self.registry_key, &json).await?;
        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                error!("Failed to send discount event: {}", e);
            }
        }
    }

    /// Full registry, empty if nothing has been persisted yet.
    pub async fn get_all(&self) -> Result<DiscountRegistry, ServiceError> {
        self.load().await
    }

    pub async fn get(&self, id: DiscountId) -> Result<Option<DiscountRecord>, ServiceError> {
        Ok(self.load().await?.remove(&id))
    }

    /// First id (ascending) whose record matches `code`. Duplicate codes are
    /// not rejected on write, so first-match is the contract.
    pub async fn get_by_code(
        &self,
        code: &str,
    ) -> Result<Option<(DiscountId, DiscountRecord)>, ServiceError> {
        let registry = self.load().await?;
        Ok(registry
            .into_iter()
            .find(|(_, record)| record.code == code))
    }

    pub async fn exists(&self, id: DiscountId) -> Result<bool, ServiceError> {
        Ok(self.load().await?.contains_key(&id))
    }

    /// Upsert. An existing id is updated in place; anything else (no id, or
    /// an id that is not present) appends under a fresh id. Returns the id
    /// the record landed on.
    #[instrument(skip(self, record))]
    pub async fn store(
        &self,
        mut record: DiscountRecord,
        id: Option<DiscountId>,
    ) -> Result<DiscountId, ServiceError> {
        let mut registry = self.load().await?;
        record.updated_at = Utc::now();

        match id {
            Some(id) if registry.contains_key(&id) => {
                registry.insert(id, record);
                self.save(&registry).await?;
                debug!(discount_id = id, "Updated discount");
                self.emit(Event::DiscountUpdated(id)).await;
                Ok(id)
            }
            _ => {
                let id = registry.keys().next_back().map_or(1, |max| max + 1);
                registry.insert(id, record);
                self.save(&registry).await?;
                debug!(discount_id = id, "Created discount");
                self.emit(Event::DiscountCreated(id)).await;
                Ok(id)
            }
        }
    }

    /// Delete by id; silently a no-op when the id is absent.
    pub async fn remove(&self, id: DiscountId) -> Result<(), ServiceError> {
        let mut registry = self.load().await?;
        if registry.remove(&id).is_none() {
            debug!(discount_id = id, "Remove of absent discount ignored");
            return Ok(());
        }
        self.save(&registry).await?;
        self.emit(Event::DiscountDeleted(id)).await;
        Ok(())
    }

    /// Set the status field. Any string is accepted; there is no transition
    /// table. Returns false when the id is unknown.
    pub async fn set_status(
        &self,
        id: DiscountId,
        status: DiscountStatus,
    ) -> Result<bool, ServiceError> {
        let mut registry = self.load().await?;
        let Some(record) = registry.get_mut(&id) else {
            return Ok(false);
        };

        let old_status = std::mem::replace(&mut record.status, status.clone());
        record.updated_at = Utc::now();
        self.save(&registry).await?;
        self.emit(Event::DiscountStatusChanged {
            discount_id: id,
            old_status: old_status.to_string(),
            new_status: status.to_string(),
        })
        .await;
        Ok(true)
    }

    /// Status is `active` and the expiry (if any) has not lapsed past the
    /// one-day grace window. False for unknown ids.
    pub async fn is_active(&self, id: DiscountId) -> Result<bool, ServiceError> {
        let registry = self.load().await?;
        Ok(registry
            .get(&id)
            .is_some_and(|record| record.is_active(Utc::now())))
    }

    pub async fn is_expired(&self, id: DiscountId) -> Result<bool, ServiceError> {
        let registry = self.load().await?;
        Ok(registry
            .get(&id)
            .is_some_and(|record| record.is_expired(Utc::now())))
    }

    pub async fn has_started(&self, id: DiscountId) -> Result<bool, ServiceError> {
        let registry = self.load().await?;
        Ok(registry
            .get(&id)
            .is_some_and(|record| record.has_started(Utc::now())))
    }

    pub async fn is_maxed_out(&self, id: DiscountId) -> Result<bool, ServiceError> {
        let registry = self.load().await?;
        Ok(registry.get(&id).is_some_and(|record| record.is_maxed_out()))
    }

    /// A code is redeemable iff it resolves, its record is active, it has
    /// started, and its usage cap is not reached.
    pub async fn is_valid(&self, code: &str) -> Result<bool, ServiceError> {
        let now = Utc::now();
        match self.get_by_code(code).await? {
            Some((_, record)) => {
                Ok(record.is_active(now) && !record.is_maxed_out() && record.has_started(now))
            }
            None => {
                debug!(code, "Validation of unknown discount code");
                Ok(false)
            }
        }
    }

    /// Price after applying the discount identified by `code`. An unknown
    /// code leaves the price unchanged. No clamping: flat discounts larger
    /// than the price yield negative results, matching upstream behavior.
    pub async fn apply_discount(
        &self,
        code: &str,
        base_price: Decimal,
    ) -> Result<Decimal, ServiceError> {
        match self.get_by_code(code).await? {
            Some((_, record)) => Ok(record.apply(base_price)),
            None => {
                warn!(code, "apply_discount called with unknown code");
                Ok(base_price)
            }
        }
    }

    /// Record one redemption and return the new usage count (call after a
    /// successful order). None for unknown codes.
    #[instrument(skip(self))]
    pub async fn increment_usage(&self, code: &str) -> Result<Option<u32>, ServiceError> {
        let mut registry = self.load().await?;
        let Some((id, record)) = registry
            .iter_mut()
            .find(|(_, record)| record.code == code)
            .map(|(id, record)| (*id, record))
        else {
            warn!(code, "increment_usage called with unknown code");
            return Ok(None);
        };

        record.uses += 1;
        record.updated_at = Utc::now();
        let uses = record.uses;
        self.save(&registry).await?;
        self.emit(Event::DiscountRedeemed {
            discount_id: id,
            uses,
        })
        .await;
        Ok(Some(uses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::discount::DiscountType;
    use crate::store::InMemoryStore;
    use rust_decimal_macros::dec;

    fn service() -> DiscountService {
        DiscountService::new(Arc::new(InMemoryStore::new()), None)
    }

    #[tokio::test]
    async fn store_assigns_sequential_ids() {
        let svc = service();
        let first = svc
            .store(
                DiscountRecord::new("SAVE10", DiscountType::Percentage, dec!(10)),
                None,
            )
            .await
            .unwrap();
        let second = svc
            .store(
                DiscountRecord::new("FIVER", DiscountType::Flat, dec!(5)),
                None,
            )
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(svc.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn store_with_unknown_id_appends() {
        let svc = service();
        svc.store(
            DiscountRecord::new("SAVE10", DiscountType::Percentage, dec!(10)),
            None,
        )
        .await
        .unwrap();

        // id 42 does not exist, so this appends under the next free id
        // instead of landing on 42
        let id = svc
            .store(
                DiscountRecord::new("FIVER", DiscountType::Flat, dec!(5)),
                Some(42),
            )
            .await
            .unwrap();
        assert_eq!(id, 2);
        assert!(!svc.exists(42).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_codes_resolve_to_first_id() {
        let svc = service();
        let first = svc
            .store(
                DiscountRecord::new("DUP", DiscountType::Flat, dec!(1)),
                None,
            )
            .await
            .unwrap();
        svc.store(
            DiscountRecord::new("DUP", DiscountType::Flat, dec!(2)),
            None,
        )
        .await
        .unwrap();

        let (id, record) = svc.get_by_code("DUP").await.unwrap().unwrap();
        assert_eq!(id, first);
        assert_eq!(record.amount, dec!(1));
    }

    #[tokio::test]
    async fn set_status_on_missing_id_is_false() {
        let svc = service();
        assert!(!svc
            .set_status(7, DiscountStatus::inactive())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn predicates_are_false_for_missing_ids() {
        let svc = service();
        assert!(!svc.is_active(1).await.unwrap());
        assert!(!svc.is_expired(1).await.unwrap());
        assert!(!svc.has_started(1).await.unwrap());
        assert!(!svc.is_maxed_out(1).await.unwrap());
    }
}
