use crate::report::Report;

use color_eyre::{Result, eyre::eyre};
use log::info;
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct PushResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
}

fn check_response(response: PushResponse) -> Result<()> {
    if response.code == 0 {
        return Ok(());
    }
    Err(eyre!(
        "push rejected (code {}): {}",
        response.code,
        response.message.as_deref().unwrap_or("unknown error")
    ))
}

pub fn send_report(client: &Client, endpoint: &Url, report: &Report) -> Result<()> {
    info!("Pushing report: {}", report.title);
    let response: PushResponse = client
        .post(endpoint.clone())
        .form(&[
            ("title", report.title.as_str()),
            ("desp", report.content.as_str()),
            ("short", report.digest.as_str()),
        ])
        .send()?
        .error_for_status()?
        .json()?;
    check_response(response)?;

    info!("Push delivered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn parse(raw: &str) -> PushResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn zero_code_is_success() {
        assert!(check_response(parse(r#"{"code": 0, "message": "", "data": {}}"#)).is_ok());
    }

    #[test]
    fn nonzero_code_reports_message() {
        let err =
            check_response(parse(r#"{"code": 40001, "message": "bad sendkey"}"#)).unwrap_err();
        assert!(err.to_string().contains("bad sendkey"));
    }

    fn weekly_report() -> Report {
        Report {
            title: "Weekly".into(),
            content: "All good".into(),
            digest: "Online CN 1".into(),
        }
    }

    #[test]
    fn posts_title_body_and_digest_as_form_fields() {
        let (url, server) = serve_once("200 OK", "application/json", r#"{"code": 0}"#);
        let endpoint = url.join("SCTkey.send").unwrap();

        send_report(&Client::new(), &endpoint, &weekly_report()).unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /SCTkey.send "), "{request}");
        assert!(request.contains("application/x-www-form-urlencoded"));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let mut fields: Vec<_> = body.split('&').collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["desp=All+good", "short=Online+CN+1", "title=Weekly"]);
    }

    #[test]
    fn rejected_push_is_an_error() {
        let (url, server) = serve_once(
            "200 OK",
            "application/json",
            r#"{"code": 40001, "message": "bad sendkey"}"#,
        );
        let err = send_report(&Client::new(), &url, &weekly_report()).unwrap_err();
        assert!(err.to_string().contains("bad sendkey"));
        server.join().unwrap();
    }

    #[test]
    fn nonzero_code_without_message() {
        let err = check_response(parse(r#"{"code": 1}"#)).unwrap_err();
        assert!(err.to_string().contains("unknown error"));
    }
}
