use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{decode, DeviceClient, DeviceError, Record, Result};
use crate::util::now_millis;

const USER_SET_IMAGE: &str = "/user_set_image.fcgi";
const USER_SET_IMAGE_LIST: &str = "/user_set_image_list.fcgi";
const USER_LIST_IMAGES: &str = "/user_list_images.fcgi";
const USER_GET_IMAGE_LIST: &str = "/user_get_image_list.fcgi";
const USER_DESTROY_IMAGE: &str = "/user_destroy_image.fcgi";

/// Where a facial image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    /// Already base64-encoded; sent as is.
    Base64(String),
}

impl ImageSource {
    /// A string naming an existing file is a path; anything else is taken to
    /// be base64 already.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if Path::new(&text).is_file() {
            ImageSource::Path(PathBuf::from(text))
        } else {
            ImageSource::Base64(text)
        }
    }

    pub async fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            ImageSource::Path(path) => read_image(path).await,
            ImageSource::Bytes(bytes) => Ok(bytes),
            ImageSource::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| DeviceError::Validation(format!("image is not valid base64: {e}"))),
        }
    }

    pub async fn into_base64(self) -> Result<String> {
        let bytes = match self {
            ImageSource::Base64(text) => return Ok(text),
            ImageSource::Path(path) => read_image(path).await?,
            ImageSource::Bytes(bytes) => bytes,
        };
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

async fn read_image(path: PathBuf) -> Result<Vec<u8>> {
    tokio::fs::read(&path)
        .await
        .map_err(|source| DeviceError::Io { path, source })
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<&[u8]> for ImageSource {
    fn from(bytes: &[u8]) -> Self {
        ImageSource::Bytes(bytes.to_vec())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

/// One entry of a batch upload.
#[derive(Debug, Clone)]
pub struct UserImage {
    pub user_id: i64,
    /// Milliseconds since the epoch; now when unset.
    pub timestamp: Option<i64>,
    pub image: ImageSource,
}

impl UserImage {
    pub fn new(user_id: i64, image: impl Into<ImageSource>) -> Self {
        Self {
            user_id,
            timestamp: None,
            image: image.into(),
        }
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Serialize)]
struct EncodedImage {
    user_id: i64,
    timestamp: i64,
    image: String,
}

/// Which images a delete applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSelection {
    All,
    User(i64),
    Users(Vec<i64>),
}

impl ImageSelection {
    /// Pick the selection from loose arguments: `all` wins over `user_id`,
    /// which wins over `user_ids`.
    pub fn resolve(user_id: Option<i64>, user_ids: Option<Vec<i64>>, all: bool) -> Result<Self> {
        if all {
            Ok(ImageSelection::All)
        } else if let Some(id) = user_id {
            Ok(ImageSelection::User(id))
        } else if let Some(ids) = user_ids {
            Ok(ImageSelection::Users(ids))
        } else {
            Err(DeviceError::Validation(
                "give user_id, user_ids or all = true".into(),
            ))
        }
    }

    fn payload(&self) -> Value {
        match self {
            ImageSelection::All => json!({ "all": true }),
            ImageSelection::User(id) => json!({ "user_id": id }),
            ImageSelection::Users(ids) => json!({ "user_ids": ids }),
        }
    }
}

impl DeviceClient {
    /// Upload one facial image as the raw request body.
    ///
    /// The reply is usually a JSON object with quality scores; anything else
    /// is returned under a `response` key.
    pub async fn set_user_image(
        &mut self,
        user_id: i64,
        image: impl Into<ImageSource>,
        timestamp: Option<i64>,
        match_faces: bool,
    ) -> Result<Record> {
        let bytes = image.into().into_bytes().await?;
        let timestamp = timestamp.unwrap_or_else(now_millis);

        let query = [
            ("user_id", user_id.to_string()),
            ("timestamp", timestamp.to_string()),
            ("match", u8::from(match_faces).to_string()),
        ];
        let body = self.post_raw(USER_SET_IMAGE, &query, bytes).await?;

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Object(reply)) => Ok(reply),
            Ok(other) => Ok(wrap_response(other)),
            Err(_) => Ok(wrap_response(Value::String(body))),
        }
    }

    /// Upload several images in one JSON request, each base64-encoded.
    pub async fn set_user_image_list(
        &mut self,
        items: Vec<UserImage>,
        match_faces: bool,
    ) -> Result<Value> {
        let mut user_images = Vec::with_capacity(items.len());
        for item in items {
            user_images.push(EncodedImage {
                user_id: item.user_id,
                timestamp: item.timestamp.unwrap_or_else(now_millis),
                image: item.image.into_base64().await?,
            });
        }

        let payload = json!({
            "match": u8::from(match_faces),
            "user_images": user_images,
        });
        self.post_json(USER_SET_IMAGE_LIST, &payload).await
    }

    /// Users with a registered image: plain ids, or `{id, timestamp}` objects
    /// when `include_timestamp` is set.
    pub async fn list_user_images(&mut self, include_timestamp: bool) -> Result<Vec<Value>> {
        #[derive(Deserialize)]
        struct ListResponse {
            #[serde(default)]
            user_ids: Vec<Value>,
        }

        let query = [("get_timestamp", u8::from(include_timestamp).to_string())];
        let data = self.get(USER_LIST_IMAGES, &query).await?;
        let reply: ListResponse = decode(USER_LIST_IMAGES, &data)?;
        Ok(reply.user_ids)
    }

    /// Fetch images as base64 records; all registered images when no ids are given.
    pub async fn get_user_image_list(&mut self, user_ids: Option<&[i64]>) -> Result<Vec<Record>> {
        #[derive(Deserialize)]
        struct ImagesResponse {
            #[serde(default)]
            user_images: Vec<Record>,
        }

        let mut payload = Record::new();
        if let Some(ids) = user_ids.filter(|ids| !ids.is_empty()) {
            payload.insert("user_ids".into(), json!(ids));
        }
        let data = self.post_json(USER_GET_IMAGE_LIST, &payload).await?;
        let reply: ImagesResponse = decode(USER_GET_IMAGE_LIST, &data)?;
        Ok(reply.user_images)
    }

    pub async fn delete_user_image(
        &mut self,
        user_id: Option<i64>,
        user_ids: Option<Vec<i64>>,
        all: bool,
    ) -> Result<()> {
        let selection = ImageSelection::resolve(user_id, user_ids, all)?;
        self.delete_user_images(&selection).await
    }

    pub async fn delete_user_images(&mut self, selection: &ImageSelection) -> Result<()> {
        // Only the HTTP status matters here.
        self.post_json(USER_DESTROY_IMAGE, &selection.payload()).await?;
        Ok(())
    }
}

fn wrap_response(value: Value) -> Record {
    let mut reply = Record::new();
    reply.insert("response".into(), value);
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_priority() {
        assert_eq!(
            ImageSelection::resolve(Some(1), Some(vec![2, 3]), true).unwrap(),
            ImageSelection::All
        );
        assert_eq!(
            ImageSelection::resolve(Some(1), Some(vec![2, 3]), false).unwrap(),
            ImageSelection::User(1)
        );
        assert_eq!(
            ImageSelection::resolve(None, Some(vec![2, 3]), false).unwrap(),
            ImageSelection::Users(vec![2, 3])
        );
    }

    #[test]
    fn test_selection_requires_a_mode() {
        let err = ImageSelection::resolve(None, None, false).unwrap_err();
        assert!(err.is_local());
    }

    #[test]
    fn test_selection_payloads() {
        assert_eq!(ImageSelection::All.payload(), json!({ "all": true }));
        assert_eq!(ImageSelection::User(4).payload(), json!({ "user_id": 4 }));
        assert_eq!(
            ImageSelection::Users(vec![4, 5]).payload(),
            json!({ "user_ids": [4, 5] })
        );
    }

    #[test]
    fn test_text_that_is_not_a_file_is_base64() {
        assert_eq!(
            ImageSource::from_text("/9j/4AAQ"),
            ImageSource::Base64("/9j/4AAQ".into())
        );
    }

    #[test]
    fn test_text_naming_a_file_is_a_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        assert_eq!(
            ImageSource::from_text(path.clone()),
            ImageSource::Path(PathBuf::from(path))
        );
    }

    #[test]
    fn test_conversions_pick_the_variant() {
        assert_eq!(
            ImageSource::from(vec![0xff_u8, 0xd8]),
            ImageSource::Bytes(vec![0xff, 0xd8])
        );
        assert_eq!(
            ImageSource::from(&[0xff_u8][..]),
            ImageSource::Bytes(vec![0xff])
        );
        assert_eq!(
            ImageSource::from(Path::new("/tmp/face.jpg")),
            ImageSource::Path(PathBuf::from("/tmp/face.jpg"))
        );
    }

    #[tokio::test]
    async fn test_invalid_base64_is_validation_error() {
        let err = ImageSource::Base64("not base64!".into())
            .into_bytes()
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_base64_passes_through_verbatim() {
        let encoded = ImageSource::Base64("already-encoded".into())
            .into_base64()
            .await
            .unwrap();
        assert_eq!(encoded, "already-encoded");
    }

    #[tokio::test]
    async fn test_bytes_encode_to_base64() {
        let encoded = ImageSource::Bytes(vec![0xff, 0xd8, 0xff])
            .into_base64()
            .await
            .unwrap();
        assert_eq!(encoded, "/9j/");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let err = ImageSource::Path(PathBuf::from("/nonexistent/face.jpg"))
            .into_bytes()
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Io { .. }));
        assert!(err.is_local());
    }
}
