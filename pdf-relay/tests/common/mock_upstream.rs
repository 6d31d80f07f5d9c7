// tests/common/mock_upstream.rs

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate, Times};

pub const PDF: &str = "application/pdf";
pub const HTML: &str = "text/html; charset=utf-8";
pub const API_KEY: &str = "test-api-key";

/// 中身がそれっぽいPDFバイト列
pub fn pdf_bytes(label: &str) -> Vec<u8> {
    format!("%PDF-1.4\n% {}\n%%EOF\n", label).into_bytes()
}

/// 大容量ファイルの確認ページ
pub fn interstitial_html(token: &str) -> String {
    format!(
        r#"<html><body><p>Google Drive can't scan this file for viruses.</p>
<a id="uc-download-link" href="/uc?export=download&amp;confirm={}&amp;id=abc">Download anyway</a>
</body></html>"#,
        token
    )
}

pub fn share_link(id: &str) -> String {
    format!("https://drive.google.com/file/d/{}/view?usp=sharing", id)
}

/// PDFを直接返すファイルホスト
pub async fn mount_direct_pdf(
    server: &MockServer,
    id: &str,
    body: Vec<u8>,
    expected_calls: impl Into<Times>,
) {
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("export", "download"))
        .and(query_param("id", id))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, PDF))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// 確認ページ → トークンとCookie付きの再取得でPDF
pub async fn mount_confirm_flow(
    server: &MockServer,
    id: &str,
    token: &str,
    confirmed_body: Vec<u8>,
    confirmed_content_type: &str,
) {
    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", id))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "download_warning_13058=abc; Path=/uc; HttpOnly")
                .set_body_raw(interstitial_html(token), HTML),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uc"))
        .and(query_param("id", id))
        .and(query_param("confirm", token))
        .and(header("cookie", "download_warning_13058=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(confirmed_body, confirmed_content_type))
        .with_priority(1)
        .expect(1)
        .mount(server)
        .await;
}

/// 結合エンジン
pub async fn mount_merge(server: &MockServer, merged: Vec<u8>, expected_calls: impl Into<Times>) {
    Mock::given(method("POST"))
        .and(path("/forms/pdfengines/merge"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(merged, PDF))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub async fn mount_merge_failure(server: &MockServer, status: u16, body: &str) {
    Mock::given(method("POST"))
        .and(path("/forms/pdfengines/merge"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

/// メール配信プロバイダー
pub async fn mount_email(server: &MockServer, expected_calls: impl Into<Times>) {
    Mock::given(method("POST"))
        .and(path("/v3/smtp/email"))
        .and(header("api-key", API_KEY))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "messageId": "<m1@smtp-relay.example>" })),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Content-Length を付けずに chunked で流し続けるファイルホスト
///
/// 最初に `burst_bytes` をまとめて送り、その後は接続が切られるまで少しずつ送る。
/// 戻り値はダウンロードURL。
pub async fn spawn_chunked_pdf_host(burst_bytes: usize) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const CHUNK: usize = 64 * 1024;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                if socket.read(&mut request).await.is_err() {
                    return;
                }

                let head = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: {}\r\ntransfer-encoding: chunked\r\n\r\n",
                    PDF
                );
                if socket.write_all(head.as_bytes()).await.is_err() {
                    return;
                }

                let data = vec![b'x'; CHUNK];
                let mut sent = 0;
                loop {
                    let mut frame = format!("{:x}\r\n", CHUNK).into_bytes();
                    frame.extend_from_slice(&data);
                    frame.extend_from_slice(b"\r\n");
                    if socket.write_all(&frame).await.is_err() {
                        return;
                    }
                    sent += CHUNK;
                    if sent >= burst_bytes {
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                }
            });
        }
    });

    format!("http://{}/uc", addr)
}
