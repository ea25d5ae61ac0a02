//! In-memory collaborators shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        principal::{Principal, Role},
        repo::UserStore,
        repo_types::User,
    },
    cache::InMemoryCache,
    ingredients::{
        model::{Ingredient, IngredientData, Language, SubmissionStatus},
        off::ProductDatabase,
        repo::{AuthorContact, IngredientImage, IngredientStore},
        service::{IngredientService, ServiceSettings},
    },
    mail::{EmailMessage, Mailer},
    storage::StorageClient,
    tasks::TaskQueue,
};

pub fn sample_data() -> IngredientData {
    IngredientData {
        language_id: 1,
        name: "Oat milk".into(),
        common_name: None,
        brand: None,
        energy: 46,
        protein: 1.0,
        carbohydrates: 6.5,
        carbohydrates_sugar: Some(4.0),
        fat: 1.5,
        fat_saturated: Some(0.2),
        fibres: Some(0.8),
        sodium: Some(0.1),
        code: None,
        source_name: None,
        source_url: None,
        last_imported: None,
        license_author: None,
        status: SubmissionStatus::Pending,
    }
}

pub fn sample_ingredient(id: i64) -> Ingredient {
    let data = IngredientData {
        status: SubmissionStatus::Accepted,
        ..sample_data()
    };
    to_ingredient(id, &data, OffsetDateTime::now_utc())
}

fn to_ingredient(id: i64, data: &IngredientData, created: OffsetDateTime) -> Ingredient {
    Ingredient {
        id,
        uuid: Uuid::new_v4(),
        language_id: data.language_id,
        name: data.name.clone(),
        common_name: data.common_name.clone(),
        brand: data.brand.clone(),
        energy: data.energy,
        protein: data.protein,
        carbohydrates: data.carbohydrates,
        carbohydrates_sugar: data.carbohydrates_sugar,
        fat: data.fat,
        fat_saturated: data.fat_saturated,
        fibres: data.fibres,
        sodium: data.sodium,
        code: data.code.clone(),
        source_name: data.source_name.clone(),
        source_url: data.source_url.clone(),
        last_imported: data.last_imported,
        license_author: data.license_author.clone(),
        status: data.status,
        created,
        last_update: created,
    }
}

pub fn manager(username: &str) -> Principal {
    principal(username, Role::Manager)
}

pub fn regular_user(username: &str) -> Principal {
    principal(username, Role::Regular)
}

fn principal(username: &str, role: Role) -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        role,
    }
}

/// Account row as the user store returns it.
pub fn user(username: &str, can_manage_ingredients: bool) -> User {
    User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: String::new(),
        can_manage_ingredients,
        notification_language: "en".into(),
        created_at: OffsetDateTime::now_utc(),
    }
}

pub fn service_with(
    store: MemoryStore,
    mailer: RecordingMailer,
    products: FakeProducts,
) -> IngredientService {
    IngredientService {
        store: Arc::new(store),
        cache: Arc::new(InMemoryCache::new(100)),
        mailer: Arc::new(mailer),
        tasks: Arc::new(FakeTasks::default()),
        products: Arc::new(products),
        storage: Arc::new(FakeStorage),
        settings: ServiceSettings {
            email_from: "noreply@nutriboard.test".into(),
            site_domain: "nutriboard.test".into(),
            use_task_queue: false,
            cache_ttl: Duration::from_secs(60),
        },
    }
}

struct StoreState {
    ingredients: Vec<Ingredient>,
    images: Vec<IngredientImage>,
    users: HashMap<String, AuthorContact>,
    languages: Vec<Language>,
}

/// Ingredient store backed by vectors. Clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let languages = [("en", "English"), ("de", "Deutsch")]
            .iter()
            .zip(1..)
            .map(|((short_name, full_name), id)| Language {
                id,
                short_name: short_name.to_string(),
                full_name: full_name.to_string(),
            })
            .collect();
        Self {
            state: Arc::new(Mutex::new(StoreState {
                ingredients: Vec::new(),
                images: Vec::new(),
                users: HashMap::new(),
                languages,
            })),
        }
    }
}

impl MemoryStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    pub fn len(&self) -> usize {
        self.lock().ingredients.len()
    }

    pub fn add_user(&self, username: &str, email: &str) {
        self.add_user_with_language(username, email, "en");
    }

    pub fn add_user_with_language(&self, username: &str, email: &str, language: &str) {
        self.lock().users.insert(
            username.to_string(),
            AuthorContact {
                email: email.to_string(),
                notification_language: language.to_string(),
            },
        );
    }

    pub fn language_id(&self, short_name: &str) -> i64 {
        self.lock()
            .languages
            .iter()
            .find(|l| l.short_name == short_name)
            .map(|l| l.id)
            .unwrap()
    }
}

#[async_trait]
impl IngredientStore for MemoryStore {
    async fn get(&self, id: i64) -> anyhow::Result<Option<Ingredient>> {
        Ok(self.lock().ingredients.iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> anyhow::Result<Option<Ingredient>> {
        Ok(self
            .lock()
            .ingredients
            .iter()
            .find(|i| i.code.as_deref() == Some(code))
            .cloned())
    }

    async fn insert(&self, data: &IngredientData) -> anyhow::Result<Ingredient> {
        let mut state = self.lock();
        let id = state.ingredients.len() as i64 + 1;
        let ingredient = to_ingredient(id, data, OffsetDateTime::now_utc());
        state.ingredients.push(ingredient.clone());
        Ok(ingredient)
    }

    async fn update(&self, id: i64, data: &IngredientData) -> anyhow::Result<Option<Ingredient>> {
        let mut state = self.lock();
        let Some(slot) = state.ingredients.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        let mut updated = to_ingredient(id, data, slot.created);
        updated.uuid = slot.uuid;
        updated.last_update = OffsetDateTime::now_utc();
        *slot = updated.clone();
        Ok(Some(updated))
    }

    async fn language(&self, short_name: &str) -> anyhow::Result<Option<Language>> {
        Ok(self
            .lock()
            .languages
            .iter()
            .find(|l| l.short_name == short_name)
            .cloned())
    }

    async fn image_for(&self, ingredient_id: i64) -> anyhow::Result<Option<IngredientImage>> {
        Ok(self
            .lock()
            .images
            .iter()
            .find(|i| i.ingredient_id == ingredient_id)
            .cloned())
    }

    async fn insert_image(
        &self,
        ingredient_id: i64,
        s3_key: &str,
        source_url: Option<&str>,
    ) -> anyhow::Result<IngredientImage> {
        let image = IngredientImage {
            id: Uuid::new_v4(),
            ingredient_id,
            s3_key: s3_key.to_string(),
            source_url: source_url.map(String::from),
            created: OffsetDateTime::now_utc(),
        };
        self.lock().images.push(image.clone());
        Ok(image)
    }

    async fn author_contact(&self, username: &str) -> anyhow::Result<Option<AuthorContact>> {
        Ok(self.lock().users.get(username).cloned())
    }
}

#[derive(Clone)]
pub struct FakeStorage;

#[async_trait]
impl StorageClient for FakeStorage {
    async fn put_object(&self, _key: &str, _body: Bytes, _content_type: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn presign_get(&self, key: &str, _seconds: u64) -> anyhow::Result<String> {
        Ok(format!("https://fake.local/{key}"))
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: EmailMessage) -> anyhow::Result<()> {
        Err(anyhow!("smtp down"))
    }
}

/// Keeps every delivered message; `failing()` rejects them all.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    attempts: Arc<AtomicUsize>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("smtp down"));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Canned product lookups keyed by barcode.
#[derive(Clone, Default)]
pub struct FakeProducts {
    products: HashMap<String, Value>,
    unreachable: bool,
}

impl FakeProducts {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with(code: &str, response: Value) -> Self {
        let mut products = HashMap::new();
        products.insert(code.to_string(), response);
        Self {
            products,
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            products: HashMap::new(),
            unreachable: true,
        }
    }
}

#[async_trait]
impl ProductDatabase for FakeProducts {
    async fn get_product(&self, code: &str) -> anyhow::Result<Value> {
        if self.unreachable {
            return Err(anyhow!("connection refused"));
        }
        Ok(self
            .products
            .get(code)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({ "status": 0 })))
    }

    async fn fetch_image(&self, _url: &str) -> anyhow::Result<(Bytes, String)> {
        if self.unreachable {
            return Err(anyhow!("connection refused"));
        }
        Ok((Bytes::from_static(b"\xff\xd8\xff"), "image/jpeg".into()))
    }
}

#[derive(Clone, Default)]
pub struct FakeTasks {
    submitted: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeTasks {
    pub fn submitted(&self) -> Vec<(String, Value)> {
        self.submitted.lock().unwrap().clone()
    }
}

impl TaskQueue for FakeTasks {
    fn submit(&self, task_name: &str, args: Value) -> anyhow::Result<()> {
        self.submitted
            .lock()
            .unwrap()
            .push((task_name.to_string(), args));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryUsers {
    users: Arc<Mutex<Vec<User>>>,
}

impl MemoryUsers {
    pub fn add(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl UserStore for MemoryUsers {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }
}
