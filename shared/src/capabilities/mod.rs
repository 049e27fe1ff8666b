mod http;
mod kv;

pub use self::http::{
    decode_ack, decode_envelope, ApiConfig, ApiEnvelope, ApiError, ApiResult, MAX_URL_LENGTH,
};
pub use self::kv::{
    decode_value, encode_value, KeyNamespace, KvError, KvKey, StoredKey, UserScope,
    MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::event::Event;
// The Effect derive resolves the app type by this name.
use crate::App;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
}
