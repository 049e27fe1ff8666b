//! Typed clients for the fitness service.
//!
//! Every method issues one request through the HTTP capability and hands the
//! decoded [`ApiResult`] to `make_event`. Building the request can fail
//! locally (bad URL, unencodable body); that error comes back synchronously
//! and nothing is sent.

use chrono::NaiveDate;
use crux_http::{Http, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::capabilities::{decode_ack, decode_envelope, ApiConfig, ApiEnvelope, ApiResult};
use crate::event::Event;
use crate::model::{
    BodyMeasurement, BulkFoodRequest, CommunityPost, ExerciseId, FavoriteExercise, FoodEntry,
    FoodEntryId, FoodLogRequest, LeaderboardPage, LeaderboardPeriod, MeasurementId,
    MeasurementRequest, NewPost, NewWeightEntry, PackageId, PackagePage, PackageStatus,
    ProfileUpdate, ReminderPlan, Session, StatusUpdate, Subscription, SubscriptionId, TrainerId,
    UploadedImage, UserId, UserProfile, WeightEntry, WeightEntryId,
};

/// URL builders, one per endpoint.
pub mod routes {
    use super::{ApiConfig, ApiResult, NaiveDate, PackageStatus, Url};
    use crate::model::LeaderboardPeriod;

    pub fn user(config: &ApiConfig, user_id: &str) -> ApiResult<Url> {
        config.endpoint(&["users", user_id])
    }

    pub fn measurements(config: &ApiConfig, user_id: &str) -> ApiResult<Url> {
        config.endpoint_with_query(&["body-measurements"], &[("userId", user_id)])
    }

    pub fn measurement_collection(config: &ApiConfig) -> ApiResult<Url> {
        config.endpoint(&["body-measurements"])
    }

    pub fn measurement(config: &ApiConfig, id: &str) -> ApiResult<Url> {
        config.endpoint(&["body-measurements", id])
    }

    pub fn weights(config: &ApiConfig, user_id: &str) -> ApiResult<Url> {
        config.endpoint_with_query(&["weight-history"], &[("userId", user_id)])
    }

    pub fn weight_collection(config: &ApiConfig) -> ApiResult<Url> {
        config.endpoint(&["weight-history"])
    }

    pub fn weight(config: &ApiConfig, id: &str) -> ApiResult<Url> {
        config.endpoint(&["weight-history", id])
    }

    pub fn food_logs(config: &ApiConfig, user_id: &str, date: NaiveDate) -> ApiResult<Url> {
        let date = date.format("%Y-%m-%d").to_string();
        config.endpoint_with_query(&["food-logs"], &[("userId", user_id), ("date", &date)])
    }

    pub fn food_log_collection(config: &ApiConfig) -> ApiResult<Url> {
        config.endpoint(&["food-logs"])
    }

    pub fn food_log_bulk(config: &ApiConfig) -> ApiResult<Url> {
        config.endpoint(&["food-logs", "bulk"])
    }

    pub fn food_log(config: &ApiConfig, id: &str) -> ApiResult<Url> {
        config.endpoint(&["food-logs", id])
    }

    pub fn subscriptions(config: &ApiConfig, user_id: &str) -> ApiResult<Url> {
        config.endpoint_with_query(&["subscriptions"], &[("userId", user_id)])
    }

    pub fn subscription_renewal(config: &ApiConfig, id: &str) -> ApiResult<Url> {
        config.endpoint(&["subscriptions", id, "renew"])
    }

    pub fn leaderboard(
        config: &ApiConfig,
        page: u32,
        limit: u32,
        period: LeaderboardPeriod,
    ) -> ApiResult<Url> {
        config.endpoint_with_query(
            &["leaderboard"],
            &[
                ("page", &page.to_string()),
                ("limit", &limit.to_string()),
                ("period", period.as_str()),
            ],
        )
    }

    pub fn reminders(config: &ApiConfig, user_id: &str) -> ApiResult<Url> {
        config.endpoint_with_query(&["reminders"], &[("userId", user_id)])
    }

    pub fn reminder_plan(config: &ApiConfig, plan_id: &str) -> ApiResult<Url> {
        config.endpoint(&["reminders", plan_id])
    }

    pub fn trainer_packages(
        config: &ApiConfig,
        trainer_id: &str,
        page: u32,
        limit: u32,
        status: Option<PackageStatus>,
    ) -> ApiResult<Url> {
        let page = page.to_string();
        let limit = limit.to_string();
        let mut query = vec![("page", page.as_str()), ("limit", limit.as_str())];
        if let Some(status) = status {
            query.push(("status", status.as_str()));
        }
        config.endpoint_with_query(&["trainers", trainer_id, "packages"], &query)
    }

    pub fn package_status(config: &ApiConfig, package_id: &str) -> ApiResult<Url> {
        config.endpoint(&["packages", package_id, "status"])
    }

    pub fn favorites(config: &ApiConfig, user_id: &str) -> ApiResult<Url> {
        config.endpoint(&["users", user_id, "favorite-exercises"])
    }

    pub fn favorite(config: &ApiConfig, user_id: &str, exercise_id: &str) -> ApiResult<Url> {
        config.endpoint(&["users", user_id, "favorite-exercises", exercise_id])
    }

    pub fn community_posts(config: &ApiConfig) -> ApiResult<Url> {
        config.endpoint(&["community", "posts"])
    }

    pub fn image_upload(config: &ApiConfig) -> ApiResult<Url> {
        config.endpoint(&["uploads", "images"])
    }
}

pub struct Api<'a> {
    http: &'a Http<Event>,
    config: &'a ApiConfig,
    session: &'a Session,
}

impl<'a> Api<'a> {
    pub fn new(http: &'a Http<Event>, config: &'a ApiConfig, session: &'a Session) -> Self {
        Self {
            http,
            config,
            session,
        }
    }

    fn authorized(&self, builder: RequestBuilder<Event>) -> RequestBuilder<Event> {
        builder
            .header("Authorization", self.session.bearer())
            .header("Accept", "application/json")
    }

    fn json_body<B: Serialize>(
        builder: RequestBuilder<Event>,
        body: &B,
    ) -> ApiResult<RequestBuilder<Event>> {
        let bytes = serde_json::to_vec(body)?;
        // Body first: setting it resets the content type.
        Ok(builder
            .body(bytes)
            .header("Content-Type", "application/json"))
    }

    fn idempotent(builder: RequestBuilder<Event>) -> RequestBuilder<Event> {
        builder.header("Idempotency-Key", Uuid::new_v4().to_string())
    }

    fn send_json<T, F>(&self, builder: RequestBuilder<Event>, make_event: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(ApiResult<T>) -> Event + Send + 'static,
    {
        self.authorized(builder)
            .expect_json::<ApiEnvelope<T>>()
            .send(move |result| make_event(decode_envelope(result)));
    }

    fn send_ack<F>(&self, builder: RequestBuilder<Event>, make_event: F)
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        self.authorized(builder)
            .expect_json::<ApiEnvelope<Value>>()
            .send(move |result| make_event(decode_ack(result)));
    }

    fn get<T, F>(&self, url: &Url, make_event: F)
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(ApiResult<T>) -> Event + Send + 'static,
    {
        debug!(method = "GET", path = url.path(), "request");
        self.send_json(self.http.get(url.as_str()), make_event);
    }

    // --- user profile ---

    pub fn user_profile<F>(&self, user_id: &UserId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<UserProfile>) -> Event + Send + 'static,
    {
        let url = routes::user(self.config, user_id.as_str())?;
        self.get(&url, make_event);
        Ok(())
    }

    pub fn update_profile<F>(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
        make_event: F,
    ) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::user(self.config, user_id.as_str())?;
        let builder = Self::json_body(self.http.put(url.as_str()), update)?;
        self.send_ack(builder, make_event);
        Ok(())
    }

    // --- body measurements ---

    pub fn measurements<F>(&self, user_id: &UserId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<Vec<BodyMeasurement>>) -> Event + Send + 'static,
    {
        let url = routes::measurements(self.config, user_id.as_str())?;
        self.get(&url, make_event);
        Ok(())
    }

    pub fn create_measurement<F>(&self, request: &MeasurementRequest, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::measurement_collection(self.config)?;
        let builder = Self::json_body(Self::idempotent(self.http.post(url.as_str())), request)?;
        self.send_ack(builder, make_event);
        Ok(())
    }

    pub fn update_measurement<F>(
        &self,
        id: &MeasurementId,
        request: &MeasurementRequest,
        make_event: F,
    ) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::measurement(self.config, id.as_str())?;
        let builder = Self::json_body(self.http.put(url.as_str()), request)?;
        self.send_ack(builder, make_event);
        Ok(())
    }

    pub fn delete_measurement<F>(&self, id: &MeasurementId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::measurement(self.config, id.as_str())?;
        self.send_ack(self.http.delete(url.as_str()), make_event);
        Ok(())
    }

    // --- weight history ---

    pub fn weights<F>(&self, user_id: &UserId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<Vec<WeightEntry>>) -> Event + Send + 'static,
    {
        let url = routes::weights(self.config, user_id.as_str())?;
        self.get(&url, make_event);
        Ok(())
    }

    pub fn create_weight<F>(&self, entry: &NewWeightEntry, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::weight_collection(self.config)?;
        let builder = Self::json_body(Self::idempotent(self.http.post(url.as_str())), entry)?;
        self.send_ack(builder, make_event);
        Ok(())
    }

    pub fn delete_weight<F>(&self, id: &WeightEntryId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::weight(self.config, id.as_str())?;
        self.send_ack(self.http.delete(url.as_str()), make_event);
        Ok(())
    }

    // --- food log ---

    pub fn food_logs<F>(&self, user_id: &UserId, date: NaiveDate, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<Vec<FoodEntry>>) -> Event + Send + 'static,
    {
        let url = routes::food_logs(self.config, user_id.as_str(), date)?;
        self.get(&url, make_event);
        Ok(())
    }

    pub fn create_food_log<F>(&self, request: &FoodLogRequest<'_>, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::food_log_collection(self.config)?;
        let builder = Self::json_body(Self::idempotent(self.http.post(url.as_str())), request)?;
        self.send_ack(builder, make_event);
        Ok(())
    }

    pub fn bulk_create_food_logs<F>(
        &self,
        request: &BulkFoodRequest<'_>,
        make_event: F,
    ) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::food_log_bulk(self.config)?;
        let builder = Self::json_body(Self::idempotent(self.http.post(url.as_str())), request)?;
        self.send_ack(builder, make_event);
        Ok(())
    }

    pub fn delete_food_log<F>(&self, id: &FoodEntryId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::food_log(self.config, id.as_str())?;
        self.send_ack(self.http.delete(url.as_str()), make_event);
        Ok(())
    }

    // --- subscriptions ---

    pub fn subscriptions<F>(&self, user_id: &UserId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<Vec<Subscription>>) -> Event + Send + 'static,
    {
        let url = routes::subscriptions(self.config, user_id.as_str())?;
        self.get(&url, make_event);
        Ok(())
    }

    pub fn renew_subscription<F>(&self, id: &SubscriptionId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::subscription_renewal(self.config, id.as_str())?;
        self.send_ack(Self::idempotent(self.http.post(url.as_str())), make_event);
        Ok(())
    }

    // --- leaderboard ---

    pub fn leaderboard<F>(
        &self,
        page: u32,
        limit: u32,
        period: LeaderboardPeriod,
        make_event: F,
    ) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<LeaderboardPage>) -> Event + Send + 'static,
    {
        let url = routes::leaderboard(self.config, page, limit, period)?;
        self.get(&url, make_event);
        Ok(())
    }

    // --- reminders ---

    pub fn reminder_plan<F>(&self, user_id: &UserId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<ReminderPlan>) -> Event + Send + 'static,
    {
        let url = routes::reminders(self.config, user_id.as_str())?;
        self.get(&url, make_event);
        Ok(())
    }

    pub fn update_reminder_plan<F>(&self, plan: &ReminderPlan, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::reminder_plan(self.config, plan.id.as_str())?;
        let builder = Self::json_body(self.http.put(url.as_str()), plan)?;
        self.send_ack(builder, make_event);
        Ok(())
    }

    // --- trainer packages ---

    pub fn trainer_packages<F>(
        &self,
        trainer_id: &TrainerId,
        page: u32,
        limit: u32,
        status: Option<PackageStatus>,
        make_event: F,
    ) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<PackagePage>) -> Event + Send + 'static,
    {
        let url = routes::trainer_packages(self.config, trainer_id.as_str(), page, limit, status)?;
        self.get(&url, make_event);
        Ok(())
    }

    pub fn set_package_status<F>(
        &self,
        package_id: &PackageId,
        status: PackageStatus,
        make_event: F,
    ) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::package_status(self.config, package_id.as_str())?;
        let builder = Self::json_body(self.http.patch(url.as_str()), &StatusUpdate { status })?;
        self.send_ack(builder, make_event);
        Ok(())
    }

    // --- favorites ---

    pub fn favorites<F>(&self, user_id: &UserId, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<Vec<FavoriteExercise>>) -> Event + Send + 'static,
    {
        let url = routes::favorites(self.config, user_id.as_str())?;
        self.get(&url, make_event);
        Ok(())
    }

    pub fn remove_favorite<F>(
        &self,
        user_id: &UserId,
        exercise_id: &ExerciseId,
        make_event: F,
    ) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<()>) -> Event + Send + 'static,
    {
        let url = routes::favorite(self.config, user_id.as_str(), exercise_id.as_str())?;
        self.send_ack(self.http.delete(url.as_str()), make_event);
        Ok(())
    }

    // --- community ---

    pub fn upload_image<F>(&self, jpeg: Vec<u8>, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<UploadedImage>) -> Event + Send + 'static,
    {
        let url = routes::image_upload(self.config)?;
        let builder = Self::idempotent(self.http.post(url.as_str()))
            .body(jpeg)
            .header("Content-Type", crate::image_processing::PreparedImage::CONTENT_TYPE);
        self.send_json(builder, make_event);
        Ok(())
    }

    pub fn create_post<F>(&self, post: &NewPost<'_>, make_event: F) -> ApiResult<()>
    where
        F: FnOnce(ApiResult<CommunityPost>) -> Event + Send + 'static,
    {
        let url = routes::community_posts(self.config)?;
        let builder = Self::json_body(Self::idempotent(self.http.post(url.as_str())), post)?;
        self.send_json(builder, make_event);
        Ok(())
    }
}
