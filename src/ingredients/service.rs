use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use super::{
    model::{Ingredient, IngredientData, SubmissionStatus},
    off::{extract_info_from_off, found_product, product_language, ProductDatabase},
    repo::{load_language, IngredientStore},
    validation::IngredientDraft,
};
use crate::{
    auth::principal::Principal,
    cache::{keys::ingredient_key, Cache},
    error::AppError,
    mail::{send_best_effort, EmailMessage, Mailer, Recipients},
    state::AppState,
    storage::StorageClient,
    tasks::TaskQueue,
};

pub const FETCH_IMAGE_TASK: &str = "fetch_ingredient_image";
const IMAGE_URL_TTL_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub email_from: String,
    pub site_domain: String,
    pub use_task_queue: bool,
    pub cache_ttl: Duration,
}

/// Validates, stores and announces ingredients. Every write goes through
/// here so the cached view of a record is dropped after each save.
#[derive(Clone)]
pub struct IngredientService {
    pub(crate) store: Arc<dyn IngredientStore>,
    pub(crate) cache: Arc<dyn Cache>,
    pub(crate) mailer: Arc<dyn Mailer>,
    pub(crate) tasks: Arc<dyn TaskQueue>,
    pub(crate) products: Arc<dyn ProductDatabase>,
    pub(crate) storage: Arc<dyn StorageClient>,
    pub(crate) settings: ServiceSettings,
}

impl FromRef<AppState> for IngredientService {
    fn from_ref(state: &AppState) -> Self {
        Self {
            store: state.ingredients.clone(),
            cache: state.cache.clone(),
            mailer: state.mailer.clone(),
            tasks: state.tasks.clone(),
            products: state.products.clone(),
            storage: state.storage.clone(),
            settings: ServiceSettings {
                email_from: state.config.mail.email_from.clone(),
                site_domain: state.config.site_domain.clone(),
                use_task_queue: state.config.use_task_queue,
                cache_ttl: Duration::from_secs(state.config.cache_ttl_secs),
            },
        }
    }
}

impl IngredientService {
    /// Read-through: cached JSON on hit, store plus cache fill on miss.
    pub async fn get_cached(&self, id: i64) -> Result<Ingredient, AppError> {
        let key = ingredient_key(id);
        if let Some(raw) = self.cache.get(&key).await {
            match serde_json::from_str::<Ingredient>(&raw) {
                Ok(ingredient) => return Ok(ingredient),
                Err(e) => warn!(error = %e, %key, "dropping undecodable cache entry"),
            }
        }

        let ingredient = self.store.get(id).await?.ok_or(AppError::NotFound)?;
        match serde_json::to_string(&ingredient) {
            Ok(raw) => self.cache.set(&key, raw, self.settings.cache_ttl).await,
            Err(e) => warn!(error = %e, %key, "ingredient not cacheable"),
        }
        Ok(ingredient)
    }

    pub async fn save_new(&self, data: &IngredientData) -> Result<Ingredient, AppError> {
        let ingredient = self.store.insert(data).await?;
        self.cache.delete(&ingredient_key(ingredient.id)).await;
        debug!(ingredient_id = ingredient.id, "ingredient inserted");
        Ok(ingredient)
    }

    pub async fn save_existing(
        &self,
        id: i64,
        data: &IngredientData,
    ) -> Result<Ingredient, AppError> {
        let ingredient = self.store.update(id, data).await?.ok_or(AppError::NotFound)?;
        self.cache.delete(&ingredient_key(id)).await;
        debug!(ingredient_id = id, "ingredient updated");
        Ok(ingredient)
    }

    /// New user submission: validate, assign author and status, store,
    /// then tell the administrators about submissions that need review.
    #[instrument(skip(self, draft, principal), fields(user = %principal.username))]
    pub async fn create(
        &self,
        draft: &IngredientDraft,
        principal: &Principal,
        host: &str,
    ) -> Result<Ingredient, AppError> {
        let language = load_language(
            self.store.as_ref(),
            draft.language.as_deref().unwrap_or_default(),
        )
        .await?;
        let mut data = draft.clean(language.id)?;
        let notification = self.set_author(&mut data, principal, host);

        let ingredient = self.save_new(&data).await?;
        info!(ingredient_id = ingredient.id, status = ?ingredient.status, "ingredient created");

        if let Some(message) = notification {
            send_best_effort(self.mailer.as_ref(), message).await;
        }
        Ok(ingredient)
    }

    /// Managers get their submission accepted right away and, lacking an
    /// author, the requesting host as author. Anyone else becomes the author
    /// and the returned admin notification must be sent.
    pub fn set_author(
        &self,
        data: &mut IngredientData,
        principal: &Principal,
        host: &str,
    ) -> Option<EmailMessage> {
        if principal.is_manager() {
            data.status = SubmissionStatus::Accepted;
            if data.license_author.is_none() {
                let domain = host.split(':').next().unwrap_or(host);
                data.license_author = Some(domain.to_string());
            }
            return None;
        }

        if data.license_author.is_none() {
            data.license_author = Some(principal.username.clone());
        }
        Some(EmailMessage {
            subject: "New user submitted ingredient".to_string(),
            body: format!(
                "The user {} submitted a new ingredient \"{}\".",
                principal.username, data.name
            ),
            from: self.settings.email_from.clone(),
            to: Recipients::Admins,
        })
    }

    /// Full replacement of the nutrition values. Provenance and review state
    /// stay with the stored record.
    #[instrument(skip(self, draft, principal), fields(user = %principal.username))]
    pub async fn update(
        &self,
        id: i64,
        draft: &IngredientDraft,
        principal: &Principal,
    ) -> Result<Ingredient, AppError> {
        if !principal.is_manager() {
            return Err(AppError::Forbidden);
        }
        let current = self.store.get(id).await?.ok_or(AppError::NotFound)?;
        let language_id = match draft.language.as_deref() {
            Some(tag) => load_language(self.store.as_ref(), tag).await?.id,
            None => current.language_id,
        };

        let mut data = draft.clean(language_id)?;
        data.code = current.code.clone();
        data.source_name = current.source_name.clone();
        data.last_imported = current.last_imported;
        data.status = current.status;
        if data.license_author.is_none() {
            data.license_author = current.license_author.clone();
        }
        if data.source_url.is_none() {
            data.source_url = current.source_url.clone();
        }

        self.save_existing(id, &data).await
    }

    /// Review decision on a submission. Accepting a pending submission
    /// mails its author.
    #[instrument(skip(self, principal), fields(user = %principal.username))]
    pub async fn set_status(
        &self,
        id: i64,
        status: SubmissionStatus,
        principal: &Principal,
    ) -> Result<Ingredient, AppError> {
        if !principal.is_manager() {
            return Err(AppError::Forbidden);
        }
        let current = self.store.get(id).await?.ok_or(AppError::NotFound)?;
        let previous = current.status;

        let mut data = current.data();
        data.status = status;
        let ingredient = self.save_existing(id, &data).await?;

        if previous == SubmissionStatus::Pending && status == SubmissionStatus::Accepted {
            self.send_acceptance_email(&ingredient).await;
        }
        Ok(ingredient)
    }

    /// Tells the author of a user submitted ingredient that it was added to
    /// the shared database. Skipped when the author is unknown or has no email.
    pub async fn send_acceptance_email(&self, ingredient: &Ingredient) {
        let Some(author) = ingredient.license_author.as_deref() else {
            return;
        };
        let contact = match self.store.author_contact(author).await {
            Ok(Some(contact)) => contact,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, %author, "author lookup failed; no email sent");
                return;
            }
        };
        if contact.email.trim().is_empty() {
            return;
        }

        let site = &self.settings.site_domain;
        let url = format!("https://{site}{}", ingredient.absolute_url());
        let (subject, body) =
            acceptance_message(&contact.notification_language, &ingredient.name, &url, site);
        let message = EmailMessage {
            subject,
            body,
            from: self.settings.email_from.clone(),
            to: Recipients::To(vec![contact.email]),
        };
        send_best_effort(self.mailer.as_ref(), message).await;
    }

    /// Searches Open Food Facts by barcode and stores the product as a new
    /// ingredient. Products that are not found or lack required data give
    /// `Ok(None)`; failing to reach the service is an error.
    #[instrument(skip(self))]
    pub async fn fetch_from_off(&self, code: &str) -> Result<Option<Ingredient>, AppError> {
        let response = self
            .products
            .get_product(code)
            .await
            .map_err(AppError::Upstream)?;
        let Some(product) = found_product(&response) else {
            debug!("product not found");
            return Ok(None);
        };
        let Some(tag) = product_language(product) else {
            debug!("product without language");
            return Ok(None);
        };
        let language = load_language(self.store.as_ref(), tag).await?;

        let Some(data) = extract_info_from_off(product, &language) else {
            debug!("product lacks required nutrition data");
            return Ok(None);
        };
        if data.name.is_empty() || data.common_name.is_none() {
            debug!("product without name or common name");
            return Ok(None);
        }

        let ingredient = self.save_new(&data).await?;
        info!(ingredient_id = ingredient.id, "ingredient imported from open food facts");
        Ok(Some(ingredient))
    }

    /// Local ingredient with this barcode, else an import.
    pub async fn find_or_import(&self, code: &str) -> Result<Option<Ingredient>, AppError> {
        if let Some(ingredient) = self.store.find_by_code(code).await? {
            return Ok(Some(ingredient));
        }
        self.fetch_from_off(code).await
    }

    /// URL of the ingredient image. When there is none yet, signed-in users
    /// trigger a background fetch and get `None` for now.
    pub async fn get_image(
        &self,
        id: i64,
        principal: Option<&Principal>,
    ) -> Result<Option<String>, AppError> {
        let ingredient = self.get_cached(id).await?;
        if let Some(image) = self.store.image_for(ingredient.id).await? {
            let url = self
                .storage
                .presign_get(&image.s3_key, IMAGE_URL_TTL_SECS)
                .await?;
            return Ok(Some(url));
        }

        if principal.is_none() {
            return Ok(None);
        }
        if !self.settings.use_task_queue {
            info!("task queue deactivated, skipping retrieving ingredient image");
            return Ok(None);
        }

        self.tasks
            .submit(FETCH_IMAGE_TASK, json!({ "ingredient_id": ingredient.id }))?;
        Ok(None)
    }
}

/// Subject and body of the acceptance mail in the author's notification
/// language. Languages without a translation get English.
fn acceptance_message(language: &str, name: &str, url: &str, site: &str) -> (String, String) {
    let primary = language.split(['-', '_']).next().unwrap_or_default();
    match primary.to_ascii_lowercase().as_str() {
        "de" => (
            "Zutat wurde erfolgreich in die allgemeine Datenbank aufgenommen".to_string(),
            format!(
                "Deine Zutat \"{name}\" wurde geprüft und in die allgemeine Datenbank \
                 aufgenommen.\n\
                 Du findest sie hier: {url}\n\n\
                 Vielen Dank für deinen Beitrag!\n\
                 -- \n{site}"
            ),
        ),
        _ => (
            "Ingredient was successfully added to the general database".to_string(),
            format!(
                "Your ingredient \"{name}\" was reviewed and added to the general database.\n\
                 You can see it here: {url}\n\n\
                 Thank you for your contribution!\n\
                 -- \n{site}"
            ),
        ),
    }
}
