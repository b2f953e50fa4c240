//! Title translation over a LibreTranslate-compatible HTTP API.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use titler_core::normalize::Language;
use titler_core::{Config, NormalizationPlan, Translation};

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("no translation endpoint configured (set TITLER_TRANSLATE_URL or translate_url)")]
    NotConfigured,

    #[error("request to translation service failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("translation service returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Clone)]
pub struct HttpTranslator {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: Option<String>,
}

impl HttpTranslator {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model,
        }
    }

    pub async fn translate(
        &self,
        text: &str,
        from: &Language,
        to: &Language,
    ) -> Result<String, TranslateError> {
        let request = TranslateRequest {
            q: text,
            source: from.code(),
            target: to.code(),
            format: "text",
            api_key: self.api_key.as_deref(),
            model: self.model.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body: TranslateResponse = response.json().await?;
        Ok(body.translated_text)
    }
}

/// How titles flagged for translation are handled in this run.
#[derive(Debug, Clone)]
pub enum Translator {
    /// `--no-translate`.
    Disabled,
    /// Translation is wanted but no endpoint is configured.
    Unconfigured,
    Http(HttpTranslator),
}

impl Translator {
    /// Requests that take longer than `translate_timeout_secs` fail, so a
    /// stalled service cannot hold up the batch.
    pub fn from_config(
        config: &Config,
        api_key: Option<String>,
        enabled: bool,
    ) -> Result<Self, TranslateError> {
        if !enabled {
            return Ok(Translator::Disabled);
        }

        let url = match config.translate_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return Ok(Translator::Unconfigured),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.translate_timeout_secs))
            .build()?;

        Ok(Translator::Http(HttpTranslator::new(
            client,
            url,
            api_key,
            config.translation_model.clone(),
        )))
    }

    /// Carry out the translation step of `plan` for `title`.
    pub async fn run(&self, plan: &NormalizationPlan, title: &str) -> Translation {
        let NormalizationPlan::Translate { from, to } = plan else {
            return Translation::Skipped;
        };

        match self {
            Translator::Disabled => Translation::Skipped,
            Translator::Unconfigured => Translation::Failed(TranslateError::NotConfigured.to_string()),
            Translator::Http(http) => match http.translate(title, from, to).await {
                Ok(text) => {
                    log::debug!("translated {:?} -> {:?}", title, text);
                    Translation::Translated(text)
                }
                Err(e) => {
                    log::warn!("translation of {:?} failed: {}", title, e);
                    Translation::Failed(e.to_string())
                }
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn hebrew_plan() -> NormalizationPlan {
        NormalizationPlan::Translate {
            from: Language::new("he"),
            to: Language::new("en"),
        }
    }

    /// Whether `request` holds the full headers and the declared body.
    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                if key.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        request.len() >= end + 4 + length
    }

    /// Answer one HTTP request with `status` and `body`, returning the raw request.
    pub(crate) async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request_complete(&request) {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (format!("http://{addr}/translate"), handle)
    }

    /// Accept one connection and never answer it.
    async fn serve_silence() -> (String, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        });

        (format!("http://{addr}/translate"), handle)
    }

    pub(crate) fn translator(endpoint: String) -> Translator {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        Translator::Http(HttpTranslator::new(
            client,
            endpoint,
            Some("secret".to_string()),
            None,
        ))
    }

    #[test]
    fn test_request_body_shape() {
        let request = TranslateRequest {
            q: "דוח שנתי",
            source: "he",
            target: "en",
            format: "text",
            api_key: None,
            model: Some("m2m100"),
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["q"], "דוח שנתי");
        assert_eq!(json["source"], "he");
        assert_eq!(json["target"], "en");
        assert_eq!(json["format"], "text");
        assert_eq!(json["model"], "m2m100");
        assert!(json.get("api_key").is_none(), "absent key is not sent");
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        assert!(matches!(
            Translator::from_config(&config, None, true),
            Ok(Translator::Unconfigured)
        ));
        assert!(matches!(
            Translator::from_config(&config, None, false),
            Ok(Translator::Disabled)
        ));

        config.translate_url = Some("http://localhost:5000/translate".to_string());
        assert!(matches!(
            Translator::from_config(&config, None, true),
            Ok(Translator::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_and_unconfigured() {
        assert_eq!(
            Translator::Disabled.run(&hebrew_plan(), "דוח").await,
            Translation::Skipped
        );

        match Translator::Unconfigured.run(&hebrew_plan(), "דוח").await {
            Translation::Failed(reason) => assert!(reason.contains("TITLER_TRANSLATE_URL")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_keep_plan_never_calls_service() {
        let plan = NormalizationPlan::Keep {
            language: Language::new("en"),
        };
        let unreachable = translator("http://127.0.0.1:9/translate".to_string());
        assert_eq!(unreachable.run(&plan, "Annual Report").await, Translation::Skipped);
    }

    #[tokio::test]
    async fn test_http_translation() {
        let (endpoint, server) =
            serve_once("200 OK", r#"{"translatedText":"Annual Report for Fiscal Year 2023"}"#).await;

        let translation = translator(endpoint)
            .run(&hebrew_plan(), "דוח שנתי לשנת הכספים 2023")
            .await;
        assert_eq!(
            translation,
            Translation::Translated("Annual Report for Fiscal Year 2023".to_string())
        );

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /translate"));
        assert!(request.contains(r#""source":"he""#));
        assert!(request.contains(r#""api_key":"secret""#));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let (endpoint, server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;

        match translator(endpoint).run(&hebrew_plan(), "דוח").await {
            Translation::Failed(reason) => assert!(reason.contains("500"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_stalled_service_times_out() {
        let (endpoint, server) = serve_silence().await;
        let config = Config {
            translate_url: Some(endpoint),
            translate_timeout_secs: 1,
            ..Config::default()
        };
        let translator = Translator::from_config(&config, None, true).unwrap();

        let translation = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            translator.run(&hebrew_plan(), "דוח שנתי מסכם"),
        )
        .await
        .expect("translation should give up on its own");

        assert!(
            matches!(translation, Translation::Failed(_)),
            "got {translation:?}"
        );
        server.abort();
    }
}
