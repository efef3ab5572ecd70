//! End-user API operations built on the generic primitives.

use std::collections::BTreeMap;

use crate::client::Client;
use crate::models::{Status, User};
use crate::Result;

impl Client {
    /// Post a status, optionally attaching previously uploaded media.
    pub async fn update_status(&self, text: &str, media_ids: &[&str]) -> Result<Status> {
        let mut form = BTreeMap::new();
        form.insert("status".to_owned(), text.to_owned());
        form.insert("media_ids".to_owned(), media_ids.join(","));
        self.post("statuses/update", &form).await
    }

    /// Fetch the authenticated user, including their latest status.
    pub async fn verify_credentials(&self) -> Result<User> {
        self.get("account/verify_credentials", &BTreeMap::new())
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::Endpoints;
    use crate::credentials::{AppCredentials, MemoryTokenStore, TokenStore};

    fn user_client(server: &MockServer) -> Client {
        let store = Arc::new(MemoryTokenStore::new());
        store.set_user_token("tok", "sec");
        Client::with_endpoints(
            AppCredentials::new("ck", "cs", "at", "ats"),
            store,
            Endpoints::with_base(&server.uri()),
        )
    }

    #[tokio::test]
    async fn update_status_posts_strictly_escaped_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1.1/statuses/update.json"))
            .and(body_string("media_ids=1%2C2&status=What%27s%20up%21"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_str": "42",
                "text": "What's up!",
                "created_at": "Tue Mar 03 18:12:01 +0000 2020",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = user_client(&server);
        let status = client
            .update_status("What's up!", &["1", "2"])
            .await
            .unwrap();
        assert_eq!(status.id, "42");
        assert_eq!(status.text, "What's up!");
    }

    #[tokio::test]
    async fn verify_credentials_decodes_user_and_entities() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1.1/account/verify_credentials.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "Ada",
                "screen_name": "ada",
                "profile_image_url_https": "https://pbs.example/ada.jpg",
                "status": {
                    "id_str": "7",
                    "text": "shipping",
                    "created_at": "Wed Aug 27 13:08:45 +0000 2008",
                    "extended_entities": {
                        "media": [{
                            "display_url": "pic.example/x",
                            "type": "video",
                            "video_info": {
                                "variants": [{"content_type": "video/mp4", "url": "https://v.example/x.mp4"}]
                            }
                        }]
                    }
                }
            })))
            .mount(&server)
            .await;

        let client = user_client(&server);
        let user = client.verify_credentials().await.unwrap();
        assert_eq!(user.screen_name, "ada");
        let status = user.status.unwrap();
        let media = &status.extended_entities.unwrap().media[0];
        assert_eq!(media.kind, "video");
        assert_eq!(
            media.video_info.as_ref().unwrap().variants[0].content_type,
            "video/mp4"
        );
    }
}
