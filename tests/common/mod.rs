//! In-memory stand-ins for the database, object storage and agents

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

use rentwise_server::{
    agents::{Agent, AgentError, AgentName, AgentRegistry},
    config::AppConfig,
    error::{AppError, AppResult},
    models::{
        item::{CreateItem, ItemQuery},
        rental::{RentalQuery, RentalRole, ReturnSettlement},
        session::SessionClaims,
        DamageReport, ImageUpload, Item, NewDamageReport, NewRental, Payment, PaymentStatus, Rental,
        RentalStatus, Session, User,
    },
    repository::{
        DamageReportStore, ItemStore, PaymentStore, RentalStore, Repository, UserStore,
    },
    services::{storage::BlobStore, Services},
    AppState,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn session(user_id: Uuid) -> Session {
    Session {
        user_id,
        email: None,
    }
}

pub fn jpeg(name: &str) -> ImageUpload {
    ImageUpload {
        filename: name.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: Bytes::from_static(b"\xff\xd8\xff\xe0fake"),
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    items: HashMap<Uuid, Item>,
    rentals: HashMap<Uuid, Rental>,
    reports: Vec<DamageReport>,
    payments: Vec<Payment>,
}

#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<Mutex<Tables>>,
    fail_inserts: Arc<AtomicBool>,
}

impl MemoryDb {
    pub fn add_user(&self, name: &str) -> Uuid {
        let user_id = Uuid::new_v4();
        self.tables.lock().unwrap().users.insert(
            user_id,
            User {
                user_id,
                full_name: Some(name.to_string()),
                email: Some(format!("{}@example.com", name.to_lowercase())),
                phone: None,
                address: None,
                profile_pic: None,
                credibility_score: None,
                created_at: Utc::now(),
            },
        );
        user_id
    }

    pub fn add_item(&self, owner: Uuid, price_per_day: i64, image_url: Option<&str>) -> Item {
        let item = Item {
            item_id: Uuid::new_v4(),
            user_id: owner,
            title: "Cordless drill".to_string(),
            description: Some("18V with two batteries".to_string()),
            category: Some("tools".to_string()),
            condition: Some("good".to_string()),
            price_per_day: Decimal::from(price_per_day),
            image_url: image_url.map(str::to_string),
            available: true,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().items.insert(item.item_id, item.clone());
        item
    }

    pub fn item(&self, item_id: Uuid) -> Item {
        self.tables.lock().unwrap().items[&item_id].clone()
    }

    pub fn rental(&self, rental_id: Uuid) -> Rental {
        self.tables.lock().unwrap().rentals[&rental_id].clone()
    }

    pub fn rental_count(&self) -> usize {
        self.tables.lock().unwrap().rentals.len()
    }

    pub fn reports(&self) -> Vec<DamageReport> {
        self.tables.lock().unwrap().reports.clone()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.tables.lock().unwrap().payments.clone()
    }

    pub fn record_payment(&self, rental_id: Uuid, amount: Decimal, status: PaymentStatus) -> Uuid {
        let payment_id = Uuid::new_v4();
        self.tables.lock().unwrap().payments.push(Payment {
            payment_id,
            rental_id,
            status,
            amount,
            created_at: Utc::now(),
        });
        payment_id
    }

    /// Make every later insert fail
    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    fn check_insert(&self) -> AppResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            Err(AppError::Internal("insert refused".to_string()))
        } else {
            Ok(())
        }
    }

    pub fn repository(&self) -> Repository {
        Repository::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn get(&self, user_id: Uuid) -> AppResult<User> {
        self.tables
            .lock()
            .unwrap()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", user_id)))
    }
}

#[async_trait]
impl ItemStore for MemoryDb {
    async fn get(&self, item_id: Uuid) -> AppResult<Item> {
        self.tables
            .lock()
            .unwrap()
            .items
            .get(&item_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))
    }

    async fn list_available(&self, query: &ItemQuery) -> AppResult<Vec<Item>> {
        let needle = query.q.as_ref().map(|q| q.to_lowercase());
        let mut items: Vec<Item> = self
            .tables
            .lock()
            .unwrap()
            .items
            .values()
            .filter(|item| item.available)
            .filter(|item| query.category.is_none() || item.category == query.category)
            .filter(|item| match &needle {
                Some(needle) => {
                    item.title.to_lowercase().contains(needle)
                        || item
                            .description
                            .as_ref()
                            .is_some_and(|d| d.to_lowercase().contains(needle))
                }
                None => true,
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn create(&self, owner_id: Uuid, item: &CreateItem) -> AppResult<Item> {
        self.check_insert()?;
        let created = Item {
            item_id: Uuid::new_v4(),
            user_id: owner_id,
            title: item.title.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            condition: item.condition.clone(),
            price_per_day: item.price_per_day,
            image_url: item.image_url.clone(),
            available: true,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .items
            .insert(created.item_id, created.clone());
        Ok(created)
    }

    async fn claim(&self, item_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables.items.get_mut(&item_id) {
            Some(item) if item.available => {
                item.available = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, item_id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let item = tables
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", item_id)))?;
        item.available = true;
        Ok(())
    }
}

#[async_trait]
impl RentalStore for MemoryDb {
    async fn get(&self, rental_id: Uuid) -> AppResult<Rental> {
        self.tables
            .lock()
            .unwrap()
            .rentals
            .get(&rental_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", rental_id)))
    }

    async fn list_for_user(&self, user_id: Uuid, query: &RentalQuery) -> AppResult<Vec<Rental>> {
        let mut rentals: Vec<Rental> = self
            .tables
            .lock()
            .unwrap()
            .rentals
            .values()
            .filter(|r| match query.role {
                Some(RentalRole::Renter) => r.renter_id == user_id,
                Some(RentalRole::Lender) => r.lender_id == user_id,
                None => r.is_party(user_id),
            })
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        rentals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rentals)
    }

    async fn insert(&self, rental: &NewRental) -> AppResult<Rental> {
        self.check_insert()?;
        let mut tables = self.tables.lock().unwrap();
        let open = tables
            .rentals
            .values()
            .any(|r| r.item_id == rental.item_id && r.status.holds_item());
        if open {
            return Err(AppError::ItemUnavailable(rental.item_id));
        }

        let created = Rental {
            rental_id: Uuid::new_v4(),
            item_id: rental.item_id,
            renter_id: rental.renter_id,
            lender_id: rental.lender_id,
            start_date: rental.start_date,
            end_date: rental.end_date,
            status: RentalStatus::Pending,
            total_cost: rental.total_cost,
            actual_end_date: None,
            actual_total_cost: None,
            returned_at: None,
            created_at: Utc::now(),
        };
        tables.rentals.insert(created.rental_id, created.clone());
        Ok(created)
    }

    async fn transition(
        &self,
        rental_id: Uuid,
        from: &[RentalStatus],
        to: RentalStatus,
    ) -> AppResult<Option<Rental>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(match tables.rentals.get_mut(&rental_id) {
            Some(rental) if from.contains(&rental.status) => {
                rental.status = to;
                Some(rental.clone())
            }
            _ => None,
        })
    }

    async fn mark_returned(
        &self,
        rental_id: Uuid,
        settlement: &ReturnSettlement,
    ) -> AppResult<Option<Rental>> {
        let mut tables = self.tables.lock().unwrap();
        Ok(match tables.rentals.get_mut(&rental_id) {
            Some(rental) if rental.status.holds_item() => {
                rental.status = RentalStatus::Returned;
                rental.actual_end_date = Some(settlement.actual_end_date);
                rental.actual_total_cost = Some(settlement.actual_total_cost);
                rental.returned_at = Some(settlement.returned_at);
                Some(rental.clone())
            }
            _ => None,
        })
    }
}

#[async_trait]
impl DamageReportStore for MemoryDb {
    async fn insert(&self, report: &NewDamageReport) -> AppResult<DamageReport> {
        self.check_insert()?;
        let created = DamageReport {
            report_id: Uuid::new_v4(),
            rental_id: report.rental_id,
            reporter_id: report.reporter_id,
            description: report.description.clone(),
            image_before_url: report.image_before_url.clone(),
            image_after_url: report.image_after_url.clone(),
            damage_heatmap_url: report.damage_heatmap_url.clone(),
            verification_score: report.verification_score,
            verified_by_agent: report.verified_by_agent,
            status: report.status,
            created_at: Utc::now(),
        };
        self.tables.lock().unwrap().reports.push(created.clone());
        Ok(created)
    }

    async fn list_for_rental(&self, rental_id: Uuid) -> AppResult<Vec<DamageReport>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .reports
            .iter()
            .filter(|r| r.rental_id == rental_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentStore for MemoryDb {
    async fn find_completed(&self, rental_id: Uuid) -> AppResult<Option<Payment>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .payments
            .iter()
            .find(|p| p.rental_id == rental_id && p.status == PaymentStatus::Completed)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Object storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryBlobs {
    objects: Mutex<HashMap<String, Bytes>>,
    broken: AtomicBool,
}

impl MemoryBlobs {
    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn break_storage(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn upload(&self, path: &str, bytes: Bytes, _content_type: &str) -> AppResult<String> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(AppError::UploadFailed(format!("{}: storage unavailable", path)));
        }
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
        Ok(format!("https://storage.test/public/{}", path))
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

type Respond = dyn Fn(Value) -> Result<Value, AgentError> + Send + Sync;

/// In-process agent answering with a closure and counting its calls
pub struct StubAgent {
    calls: AtomicUsize,
    respond: Box<Respond>,
}

impl StubAgent {
    pub fn new(
        respond: impl Fn(Value) -> Result<Value, AgentError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for StubAgent {
    async fn call(&self, payload: Value) -> Result<Value, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(payload)
    }
}

/// Wraps an agent so every call takes at least `delay`
pub struct SlowAgent {
    delay: Duration,
    inner: Arc<StubAgent>,
}

impl SlowAgent {
    pub fn new(inner: Arc<StubAgent>, delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay, inner })
    }
}

#[async_trait]
impl Agent for SlowAgent {
    async fn call(&self, payload: Value) -> Result<Value, AgentError> {
        tokio::time::sleep(self.delay).await;
        self.inner.call(payload).await
    }
}

pub fn scoring_verifier(score: f64) -> Arc<StubAgent> {
    StubAgent::new(move |_| {
        Ok(json!({
            "verification_score": score,
            "damage_heatmap_url": "https://storage.test/public/heatmap.png"
        }))
    })
}

pub fn failing_verifier() -> Arc<StubAgent> {
    StubAgent::new(|_| {
        Err(AgentError::ExecutionFailed {
            agent: "verification".to_string(),
            code: Some(1),
            stderr: "boom".to_string(),
        })
    })
}

/// Payout agent that records a completed payment, like the real one
pub fn recording_payout(db: MemoryDb) -> Arc<StubAgent> {
    StubAgent::new(move |payload| {
        let rental_id: Uuid = serde_json::from_value(payload["rental_id"].clone())
            .map_err(|e| AgentError::InvalidResponse {
                agent: "payout".to_string(),
                reason: e.to_string(),
            })?;
        let amount: Decimal = serde_json::from_value(payload["amount"].clone()).unwrap_or_default();
        db.record_payment(rental_id, amount, PaymentStatus::Completed);
        Ok(json!({ "payment_id": "P1", "status": "completed" }))
    })
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub db: MemoryDb,
    pub blobs: Arc<MemoryBlobs>,
    pub verifier: Arc<StubAgent>,
    pub payout: Arc<StubAgent>,
    pub orchestrator: Arc<StubAgent>,
    pub services: Services,
    pub config: AppConfig,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_verifier(scoring_verifier(0.1))
    }

    pub fn with_verifier(verifier: Arc<StubAgent>) -> Self {
        Self::build(verifier.clone(), verifier)
    }

    /// Verifier that takes `delay` to answer, counted through `verifier`
    pub fn with_slow_verifier(verifier: Arc<StubAgent>, delay: Duration) -> Self {
        Self::build(verifier.clone(), SlowAgent::new(verifier, delay))
    }

    fn build(verifier: Arc<StubAgent>, registered: Arc<dyn Agent>) -> Self {
        let db = MemoryDb::default();
        let blobs = Arc::new(MemoryBlobs::default());
        let payout = recording_payout(db.clone());
        let orchestrator = StubAgent::new(|envelope| Ok(json!({ "routed": envelope })));

        let agents = AgentRegistry::new()
            .register(AgentName::Verification, registered)
            .register(AgentName::Payout, payout.clone())
            .register(AgentName::Orchestrator, orchestrator.clone());

        let services = Services::new(db.repository(), agents, blobs.clone());

        Self {
            db,
            blobs,
            verifier,
            payout,
            orchestrator,
            services,
            config: AppConfig::default(),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::new(self.config.clone()),
            services: Arc::new(self.services.clone()),
        }
    }

    /// Bearer token for `user_id`, signed like the auth provider's
    pub fn token(&self, user_id: Uuid) -> String {
        SessionClaims {
            sub: user_id,
            aud: self.config.auth.jwt_audience.clone(),
            email: None,
            exp: (Utc::now() + chrono::Duration::hours(1)).timestamp(),
            iat: Some(Utc::now().timestamp()),
        }
        .create_token(&self.config.auth.jwt_secret)
        .unwrap()
    }
}
