//! Post composer. Nothing here is fetched, so there is no fetch scope: the
//! state is just the draft and the in-flight submission.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{mutation_not_sent, ready_session};
use crate::capabilities::{ApiResult, Capabilities};
use crate::event::{Event, Screen};
use crate::image_processing::{prepare_upload, PreparedImage};
use crate::model::{CommunityPost, Model, NewPost, Session, ToastKind, UploadedImage};
use crate::services::Api;
use crate::{AppError, ValidationError, MAX_POST_LENGTH};

#[derive(Debug, Default)]
pub struct CommunityState {
    pub text: String,
    pub photo: Option<PreparedImage>,
    pub posting: bool,
    /// Inline message under the composer.
    pub validation: Option<String>,
    pub last_post: Option<CommunityPost>,
}

#[derive(Serialize, Deserialize, Debug)]
pub enum CommunityEvent {
    TextChanged(String),
    /// Raw bytes of the picked photo, any supported format.
    PhotoSelected(Vec<u8>),
    PhotoRemoved,
    Submit,

    #[serde(skip)]
    ImageUploaded(ApiResult<UploadedImage>),
    #[serde(skip)]
    Posted(ApiResult<CommunityPost>),
}

impl CommunityEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TextChanged(_) => "community.text_changed",
            Self::PhotoSelected(_) => "community.photo_selected",
            Self::PhotoRemoved => "community.photo_removed",
            Self::Submit => "community.submit",
            Self::ImageUploaded(_) => "community.image_uploaded",
            Self::Posted(_) => "community.posted",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        !matches!(self, Self::ImageUploaded(_) | Self::Posted(_))
    }
}

fn wrap(event: CommunityEvent) -> Event {
    Event::Community(event)
}

pub fn validate_post(text: &str, has_photo: bool) -> Result<(), ValidationError> {
    let text = text.trim();
    if text.is_empty() && !has_photo {
        return Err(ValidationError::EmptyPost);
    }
    let len = text.chars().count();
    if len > MAX_POST_LENGTH {
        return Err(ValidationError::PostTooLong {
            len,
            max: MAX_POST_LENGTH,
        });
    }
    Ok(())
}

fn send_post(model: &mut Model, caps: &Capabilities, session: &Session, image_url: Option<&str>) {
    let post = NewPost {
        content: model.community.text.trim(),
        image_url,
    };
    let sent = Api::new(&caps.http, &model.config, session)
        .create_post(&post, |result| wrap(CommunityEvent::Posted(result)));
    if let Err(e) = sent {
        model.community.posting = false;
        mutation_not_sent(model, "create_post", e);
    }
}

fn fail(model: &mut Model, action: &'static str, error: impl Into<AppError>) {
    let error = error.into();
    warn!(action, code = error.code(), "post not published");
    model.community.posting = false;
    model.show_toast(error.user_facing_message(), ToastKind::Error);
}

pub fn update(event: CommunityEvent, model: &mut Model, caps: &Capabilities) {
    let state = &mut model.community;
    match event {
        CommunityEvent::TextChanged(text) => {
            state.text = text;
            state.validation = None;
        }

        CommunityEvent::PhotoSelected(bytes) => match prepare_upload(&bytes) {
            Ok(photo) => {
                debug!(width = photo.width, height = photo.height, "photo prepared");
                state.photo = Some(photo);
                state.validation = None;
            }
            Err(error) => {
                warn!(%error, "photo rejected");
                state.photo = None;
                state.validation = Some(error.to_string());
            }
        },
        CommunityEvent::PhotoRemoved => state.photo = None,

        CommunityEvent::Submit => {
            if state.posting {
                return;
            }
            if let Err(error) = validate_post(&state.text, state.photo.is_some()) {
                state.validation = Some(error.to_string());
                return;
            }
            let Some(session) = ready_session(model, Screen::Community) else {
                return;
            };
            let state = &mut model.community;
            state.validation = None;
            state.posting = true;

            match state.photo.as_ref().map(|p| p.bytes.clone()) {
                Some(jpeg) => {
                    info!(bytes = jpeg.len(), "uploading post photo");
                    let sent = Api::new(&caps.http, &model.config, &session)
                        .upload_image(jpeg, |result| wrap(CommunityEvent::ImageUploaded(result)));
                    if let Err(e) = sent {
                        fail(model, "upload_image", e);
                    }
                }
                None => send_post(model, caps, &session, None),
            }
        }

        CommunityEvent::ImageUploaded(result) => {
            if !state.posting {
                return;
            }
            match result {
                Ok(image) => match ready_session(model, Screen::Community) {
                    Some(session) => send_post(model, caps, &session, Some(&image.url)),
                    None => model.community.posting = false,
                },
                Err(error) => fail(model, "upload_image", error),
            }
        }

        CommunityEvent::Posted(result) => {
            if !state.posting {
                return;
            }
            match result {
                Ok(post) => {
                    info!("post published");
                    *state = CommunityState {
                        last_post: Some(post),
                        ..CommunityState::default()
                    };
                    model.show_toast("Posted to the community", ToastKind::Success);
                }
                Err(error) => fail(model, "create_post", error),
            }
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CommunityView {
    pub text: String,
    pub characters_left: i64,
    pub has_photo: bool,
    pub photo_width: Option<u32>,
    pub photo_height: Option<u32>,
    pub posting: bool,
    pub can_submit: bool,
    pub validation: Option<String>,
    pub last_post: Option<CommunityPost>,
}

pub fn view(model: &Model) -> CommunityView {
    let state = &model.community;
    let used = i64::try_from(state.text.trim().chars().count()).unwrap_or(i64::MAX);
    let max = i64::try_from(MAX_POST_LENGTH).unwrap_or(i64::MAX);

    CommunityView {
        text: state.text.clone(),
        characters_left: max.saturating_sub(used),
        has_photo: state.photo.is_some(),
        photo_width: state.photo.as_ref().map(|p| p.width),
        photo_height: state.photo.as_ref().map(|p| p.height),
        posting: state.posting,
        can_submit: !state.posting && validate_post(&state.text, state.photo.is_some()).is_ok(),
        validation: state.validation.clone(),
        last_post: state.last_post.clone(),
    }
}
